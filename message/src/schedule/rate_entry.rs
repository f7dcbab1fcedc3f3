use std::time::Duration;

use byteorder::{
    BigEndian,
    ByteOrder,
};
use packed_struct::PackingError;

use crate::{
    error::MessageBlockError,
    pod::{
        from_hundredths_of_millis,
        hundredths_of_millis,
        round_to_supported_basal_timing_rate,
        MAX_TIME_BETWEEN_PULSES,
        NEAR_ZERO_BASAL_RATE,
        NEAR_ZERO_BASAL_RATE_FLAG,
        PULSES_PER_UNIT,
        PULSE_SIZE,
        SEGMENT_SECONDS,
    },
};

/// One phase of per-pulse timing: `total_pulses` (in tenths of a pulse on the wire) spaced
/// `delay_between_pulses` seconds apart.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RateEntry {
    pub total_pulses:         f64,
    pub delay_between_pulses: f64,
}

impl RateEntry {
    pub const SIZE: usize = 6;

    const MAX_PULSES_PER_ENTRY: f64 = 0xffff as f64 / 10.0;

    #[inline]
    pub fn new(total_pulses: f64, delay_between_pulses: f64) -> Self {
        Self {
            total_pulses,
            delay_between_pulses,
        }
    }

    /// Units per hour, to two decimal places.
    pub fn rate(&self) -> f64 {
        if self.total_pulses == 0.0 {
            return 0.0;
        }

        (3600.0 / self.delay_between_pulses / PULSES_PER_UNIT * 100.0).round() / 100.0
    }

    /// Seconds covered by this entry, to the nearest second. Entries without pulses always
    /// span one half-hour segment.
    pub fn duration(&self) -> f64 {
        if self.total_pulses == 0.0 {
            return SEGMENT_SECONDS;
        }

        (self.delay_between_pulses * self.total_pulses).round()
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.delay_between_pulses)
    }

    /// Pulse count and timer word, the latter flagged when this is a near-zero rate.
    pub(crate) fn words(&self) -> (u16, u32) {
        let mut delay = hundredths_of_millis(self.delay_between_pulses) as u32;
        if self.delay_between_pulses == MAX_TIME_BETWEEN_PULSES && self.total_pulses != 0.0 {
            delay |= NEAR_ZERO_BASAL_RATE_FLAG;
        }

        ((self.total_pulses * 10.0).round() as u16, delay)
    }

    pub fn encode(&self) -> Result<[u8; Self::SIZE], PackingError> {
        if !(0.0..=Self::MAX_PULSES_PER_ENTRY).contains(&self.total_pulses)
            || !(0.0..=MAX_TIME_BETWEEN_PULSES).contains(&self.delay_between_pulses)
        {
            return Err(PackingError::InvalidValue);
        }

        let (pulses, delay) = self.words();

        let mut out = [0u8; Self::SIZE];
        BigEndian::write_u16(&mut out[..2], pulses);
        BigEndian::write_u32(&mut out[2..], delay);

        Ok(out)
    }

    pub fn decode(src: &[u8]) -> Result<Self, MessageBlockError> {
        if src.len() < Self::SIZE {
            return Err(MessageBlockError::NotEnoughData);
        }

        let pulses = BigEndian::read_u16(&src[..2]);
        let delay = BigEndian::read_u32(&src[2..6]) & !NEAR_ZERO_BASAL_RATE_FLAG;

        Ok(Self::new(pulses as f64 / 10.0, from_hundredths_of_millis(delay)))
    }

    /// Timing entries delivering `rate` for `duration`, rounded to whole half hours (at least
    /// one). Zero rates are timed as [`NEAR_ZERO_BASAL_RATE`], which yields a single entry of a
    /// tenth of a pulse per half hour. Other rates are split only where an entry's pulse count
    /// would overflow its field.
    pub fn make_entries(rate: f64, duration: Duration) -> Vec<Self> {
        let rate = round_to_supported_basal_timing_rate(rate);
        let half_hours = ((duration.as_secs_f64() / SEGMENT_SECONDS).round() as u32).max(1);

        if rate == NEAR_ZERO_BASAL_RATE {
            return vec![Self::new(half_hours as f64 / 10.0, MAX_TIME_BETWEEN_PULSES)];
        }

        let pulses_per_segment = (rate / PULSE_SIZE).round() / 2.0;
        let max_segments_per_entry = (Self::MAX_PULSES_PER_ENTRY / pulses_per_segment) as u32;
        let delay = 3600.0 / rate * PULSE_SIZE;

        let mut remaining_segments = half_hours;
        let mut remaining_pulses = rate * half_hours as f64 / 2.0 / PULSE_SIZE;
        let mut entries = vec![];

        while remaining_segments > 0 {
            let segments = max_segments_per_entry
                .min((remaining_pulses / pulses_per_segment).round() as u32)
                .max(1);

            let pulses = pulses_per_segment * segments as f64;
            entries.push(Self::new(pulses, delay));

            remaining_segments = remaining_segments.saturating_sub(segments);
            remaining_pulses -= pulses;
        }

        entries
    }
}
