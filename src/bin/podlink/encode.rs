use std::{
    fs::File,
    io::BufReader,
    path::Path,
    time::Duration,
};

use eyre::{
    Result,
    WrapErr,
};

use podlink::message::{
    block::{
        BasalScheduleExtraCommand,
        BeepType,
        BolusExtraCommand,
        CancelDeliveryCommand,
        CancelDeliveryType,
        SetInsulinScheduleCommand,
        TempBasalExtraCommand,
    },
    fragment,
    pod::SECONDS_PER_BOLUS_PULSE,
    BasalSchedule,
    Message,
    MessageBlock,
};

use crate::options::{
    Beeps,
    Envelope,
};

pub fn basal(path: &Path, offset: Duration, beeps: &Beeps, envelope: &Envelope) -> Result<()> {
    let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
    let schedule: BasalSchedule = serde_json::from_reader(BufReader::new(file))
        .wrap_err_with(|| format!("reading schedule from {}", path.display()))?;

    tracing::debug!(entries = schedule.entries().len(), ?offset, "loaded basal schedule");

    let program = SetInsulinScheduleCommand::basal_schedule(envelope.nonce, &schedule, offset)?;
    let extra = BasalScheduleExtraCommand::from_schedule(&schedule, offset, beeps.into())?;

    emit(envelope, vec![program.into(), extra.into()])
}

pub fn temp_basal(rate: f64, duration: Duration, beeps: &Beeps, envelope: &Envelope) -> Result<()> {
    let program = SetInsulinScheduleCommand::temp_basal(envelope.nonce, rate, duration)?;
    let extra = TempBasalExtraCommand::new(rate, duration, beeps.into())?;

    emit(envelope, vec![program.into(), extra.into()])
}

pub fn bolus(
    units: f64,
    extended_units: f64,
    extended_duration: Duration,
    beeps: &Beeps,
    envelope: &Envelope,
) -> Result<()> {
    let time_between_pulses = Duration::from_secs_f64(SECONDS_PER_BOLUS_PULSE);

    let program = SetInsulinScheduleCommand::bolus(
        envelope.nonce,
        units,
        time_between_pulses,
        extended_units,
        extended_duration,
    )?;
    let extra = BolusExtraCommand::new(
        units,
        time_between_pulses,
        extended_units,
        extended_duration,
        beeps.into(),
    );

    emit(envelope, vec![program.into(), extra.into()])
}

pub fn cancel(delivery: CancelDeliveryType, beep: BeepType, envelope: &Envelope) -> Result<()> {
    let cmd = CancelDeliveryCommand::new(envelope.nonce, delivery, beep);

    emit(envelope, vec![cmd.into()])
}

/// Print each block, then the message wrapping them and its radio packets.
fn emit(envelope: &Envelope, blocks: Vec<MessageBlock>) -> Result<()> {
    for block in &blocks {
        println!("{:?}\n\t{}\n\t{block:?}", block.block_type(), hex::encode(block.encode()?));
    }

    let msg = Message::new(envelope.address, blocks, envelope.seq);
    let payload = msg.encode()?;
    println!("MESSAGE\n\t{}", hex::encode(&payload));

    println!("PACKETS");
    for packet in fragment(envelope.address, &payload, envelope.packet_seq) {
        println!("\t{}", hex::encode(packet.encode()?));
    }

    Ok(())
}
