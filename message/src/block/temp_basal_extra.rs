use std::time::Duration;

use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};
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
    error::{
        MessageBlockError,
        ScheduleError,
    },
    pod::MAX_BASAL_RATE,
    schedule::RateEntry,
};

/// Per-pulse timing that accompanies a temp basal [`crate::block::SetInsulinScheduleCommand`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TempBasalExtraCommand {
    pub beep_options:            BeepOptions,
    pub remaining_pulses:        f64,
    /// Seconds.
    pub delay_until_first_pulse: f64,
    pub rate_entries:            Vec<RateEntry>,
}

impl TempBasalExtraCommand {
    const HEADER_LEN: usize = 10;

    pub fn new(rate: f64, duration: Duration, beep_options: BeepOptions) -> Result<Self, ScheduleError> {
        if !rate.is_finite() || !(0.0..=MAX_BASAL_RATE).contains(&rate) {
            return Err(ScheduleError::InvalidRate(rate));
        }

        let rate_entries = RateEntry::make_entries(rate, duration);
        let first = rate_entries
            .first()
            .copied()
            .ok_or(ScheduleError::InvalidDuration(duration))?;

        Ok(Self {
            beep_options,
            remaining_pulses: first.total_pulses,
            delay_until_first_pulse: first.delay_between_pulses,
            rate_entries,
        })
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = BytesMut::with_capacity(Self::HEADER_LEN - 2 + self.rate_entries.len() * RateEntry::SIZE);

        body.put_u8(self.beep_options.to_byte()?);
        body.put_u8(0);
        body.put_slice(&RateEntry::new(self.remaining_pulses, self.delay_until_first_pulse).encode()?);

        for entry in &self.rate_entries {
            body.put_slice(&entry.encode()?);
        }

        frame(MessageBlockType::TempBasalExtra, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::HEADER_LEN)?;

        let len = block[1] as usize;
        if len < Self::HEADER_LEN - 2 {
            return Err(MessageBlockError::NotEnoughData);
        }
        require(block, len + 2)?;

        let first = RateEntry::decode(&block[4..Self::HEADER_LEN])?;

        let num_entries = (len - (Self::HEADER_LEN - 2)) / RateEntry::SIZE;
        let rate_entries = (0..num_entries)
            .map(|i| RateEntry::decode(&block[Self::HEADER_LEN + i * RateEntry::SIZE..]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            beep_options: BeepOptions::from_byte(block[2])?,
            remaining_pulses: first.total_pulses,
            delay_until_first_pulse: first.delay_between_pulses,
            rate_entries,
        })
    }
}
