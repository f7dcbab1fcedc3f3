use std::time::Duration;

use byteorder::{
    BigEndian,
    ByteOrder,
};
use bytes::Bytes;
use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::{
    block::{
        frame,
        require,
        BeepOptions,
        MessageBlockType,
    },
    error::MessageBlockError,
    pod::{
        from_hundredths_of_millis,
        hundredths_of_millis,
        PULSE_SIZE,
    },
};

/// Pulse timing that accompanies a bolus [`crate::block::SetInsulinScheduleCommand`].
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BolusExtraCommand {
    pub beep_options:                 BeepOptions,
    pub units:                        f64,
    /// Seconds.
    pub time_between_pulses:          f64,
    pub extended_units:               f64,
    /// Seconds.
    pub time_between_extended_pulses: f64,
}

impl BolusExtraCommand {
    const LEN: usize = 15;

    pub fn new(
        units: f64,
        time_between_pulses: Duration,
        extended_units: f64,
        extended_duration: Duration,
        beep_options: BeepOptions,
    ) -> Self {
        let extended_pulses = extended_units / PULSE_SIZE;
        let time_between_extended_pulses = match extended_pulses {
            p if p > 0.0 => extended_duration.as_secs_f64() / p,
            _ => 0.0,
        };

        Self {
            beep_options,
            units,
            time_between_pulses: if units > 0.0 { time_between_pulses.as_secs_f64() } else { 0.0 },
            extended_units,
            time_between_extended_pulses,
        }
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = [0u8; Self::LEN - 2];

        body[0] = self.beep_options.to_byte()?;
        BigEndian::write_u16(&mut body[1..3], tenths_of_pulses(self.units)?);
        BigEndian::write_u32(&mut body[3..7], hundredths_of_millis(self.time_between_pulses) as u32);
        BigEndian::write_u16(&mut body[7..9], tenths_of_pulses(self.extended_units)?);
        BigEndian::write_u32(&mut body[9..13], hundredths_of_millis(self.time_between_extended_pulses) as u32);

        frame(MessageBlockType::BolusExtra, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::LEN)?;

        Ok(Self {
            beep_options:                 BeepOptions::from_byte(block[2])?,
            units:                        BigEndian::read_u16(&block[3..5]) as f64 / 200.0,
            time_between_pulses:          from_hundredths_of_millis(BigEndian::read_u32(&block[5..9])),
            extended_units:               BigEndian::read_u16(&block[9..11]) as f64 / 200.0,
            time_between_extended_pulses: from_hundredths_of_millis(BigEndian::read_u32(&block[11..15])),
        })
    }
}

fn tenths_of_pulses(units: f64) -> PackingResult<u16> {
    let tenths = (units * 200.0).round();
    if !(0.0..=u16::MAX as f64).contains(&tenths) {
        return Err(PackingError::InvalidValue);
    }

    Ok(tenths as u16)
}
