use std::time::Duration;

use podlink::{
    codec::MessageAssembler,
    message::{
        block::{
            BasalScheduleExtraCommand,
            BeepOptions,
            BolusExtraCommand,
            DeliverySchedule,
            ErrorResponse,
            SetInsulinScheduleCommand,
        },
        fragment,
        BasalSchedule,
        Message,
        MessageBlock,
        MessageBlockType,
    },
};

mod common;

const ADDRESS: u32 = 0x1f01482a;

fn hex_blocks(msg: &Message) -> eyre::Result<Vec<String>> {
    msg.blocks
        .iter()
        .map(|block| Ok(hex::encode(block.encode()?)))
        .collect()
}

#[tokio::test]
async fn basal_schedule_over_the_wire() -> eyre::Result<()> {
    common::trace_init();

    let schedule: BasalSchedule = serde_json::from_str(
        r#"{"entries": [
            {"start": 0, "rate": 1.05},
            {"start": 37800, "rate": 0.9},
            {"start": 66600, "rate": 1.0}
        ]}"#,
    )?;

    // 23:15:07
    let offset = Duration::from_secs(83707);
    let beeps = BeepOptions::new(false, true, Duration::ZERO);

    let msg = Message::new(
        ADDRESS,
        vec![
            SetInsulinScheduleCommand::basal_schedule(0x0d6612db, &schedule, offset)?.into(),
            BasalScheduleExtraCommand::from_schedule(&schedule, offset, beeps)?.into(),
        ],
        0,
    );

    let expected = vec![
        "1a140d6612db0003102e1be80005f80a480af009a00a".to_owned(),
        "131a4002009600a7d8c0089d0105944905a001312d00044c0112a880".to_owned(),
    ];
    assert_eq!(expected, hex_blocks(&msg)?);

    let received = common::over_the_wire(&[msg]).await?;

    assert_eq!(1, received.len());
    assert_eq!(ADDRESS, received[0].address);
    assert_eq!(expected, hex_blocks(&received[0])?);

    Ok(())
}

#[test]
fn prime_reassembles_from_packets() -> eyre::Result<()> {
    common::trace_init();

    let tbp = Duration::from_secs(1);
    let msg = Message::new(
        ADDRESS,
        vec![
            SetInsulinScheduleCommand::bolus(0xbed2e16b, 2.6, tbp, 0.0, Duration::ZERO)?.into(),
            BolusExtraCommand::new(2.6, tbp, 0.0, Duration::ZERO, BeepOptions::default()).into(),
        ],
        7,
    );

    let mut assembler = MessageAssembler::new();
    let mut received = None;
    for packet in fragment(ADDRESS, &msg.encode()?, 3) {
        received = assembler.push(packet)?;
    }

    let received = received.ok_or_else(|| eyre::eyre!("message incomplete"))?;
    assert_eq!(7, received.sequence);
    assert_eq!(Some(0xbed2e16b), received.blocks[0].nonce());

    match &received.blocks[0] {
        MessageBlock::SetInsulinSchedule(SetInsulinScheduleCommand {
            schedule: DeliverySchedule::Bolus {
                units,
                ..
            },
            ..
        }) => assert_eq!(2.6, *units),
        other => eyre::bail!("unexpected block {other:?}"),
    }

    assert_eq!(MessageBlockType::BolusExtra, received.blocks[1].block_type());
    assert_eq!(
        vec!["1a0ebed2e16b02010a0101a000340034".to_owned(), "170d000208000186a0000000000000".to_owned()],
        hex_blocks(&received)?
    );

    Ok(())
}

#[tokio::test]
async fn bad_nonce_reaches_the_caller() -> eyre::Result<()> {
    common::trace_init();

    let response = Message::new(ADDRESS, vec![ErrorResponse::decode(&hex::decode("060314a9e4")?)?.into()], 2);
    let received = common::over_the_wire(&[response]).await?;

    match received.as_slice() {
        [msg] => match msg.blocks.as_slice() {
            [MessageBlock::ErrorResponse(err @ ErrorResponse::BadNonce {
                resync_key,
            })] => {
                assert!(err.is_retryable());
                assert_eq!(43492, *resync_key);
            },
            other => eyre::bail!("unexpected blocks {other:?}"),
        },
        other => eyre::bail!("unexpected messages {other:?}"),
    }

    Ok(())
}
