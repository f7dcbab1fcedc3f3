//! Basal schedules and the compiler that turns them into the pod's delivery tables and
//! per-pulse timers.

use std::time::Duration;

use crate::{
    error::ScheduleError,
    pod::{
        round_to_supported_basal_rate,
        DAY,
        MAX_BASAL_RATE,
    },
};

mod bolus;
mod rate_entry;
mod table;

pub use bolus::BolusDeliveryTable;
pub use rate_entry::RateEntry;
pub use table::{
    BasalDeliveryTable,
    BasalTableEntry,
};

mod serde_secs {
    use std::time::Duration;

    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;

        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// A rate starting at `start` (offset from midnight) and running until the next entry.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasalScheduleEntry {
    #[serde(with = "serde_secs")]
    pub start: Duration,
    /// Units per hour.
    pub rate:  f64,
}

impl BasalScheduleEntry {
    #[inline]
    pub fn new(start: Duration, rate: f64) -> Self {
        Self {
            start,
            rate,
        }
    }
}

/// A validated daily basal schedule. Rates are quantized to the nearest supported rate at
/// construction, so every table and timer derived from it sees the same values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "UncheckedSchedule")]
pub struct BasalSchedule {
    entries: Vec<BasalScheduleEntry>,
}

#[derive(serde::Deserialize)]
struct UncheckedSchedule {
    entries: Vec<BasalScheduleEntry>,
}

impl TryFrom<UncheckedSchedule> for BasalSchedule {
    type Error = ScheduleError;

    fn try_from(value: UncheckedSchedule) -> Result<Self, Self::Error> {
        Self::new(value.entries)
    }
}

impl BasalSchedule {
    pub fn new(entries: impl IntoIterator<Item = BasalScheduleEntry>) -> Result<Self, ScheduleError> {
        let entries = entries.into_iter().collect::<Vec<_>>();

        let first = entries.first().ok_or(ScheduleError::Empty)?;
        if !first.start.is_zero() {
            return Err(ScheduleError::FirstEntryNotMidnight);
        }

        for (i, pair) in entries.windows(2).enumerate() {
            if pair[1].start <= pair[0].start {
                return Err(ScheduleError::Unsorted(i + 1));
            }
        }

        if let Some(last) = entries.last().filter(|e| e.start >= DAY) {
            return Err(ScheduleError::StartOutOfRange(last.start));
        }

        let entries = entries
            .into_iter()
            .map(|entry| {
                if !entry.rate.is_finite() || entry.rate < 0.0 || entry.rate > MAX_BASAL_RATE {
                    return Err(ScheduleError::InvalidRate(entry.rate));
                }

                Ok(BasalScheduleEntry::new(entry.start, round_to_supported_basal_rate(entry.rate)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            entries,
        })
    }

    /// A single rate for the whole day.
    pub fn flat(rate: f64) -> Result<Self, ScheduleError> {
        Self::new([BasalScheduleEntry::new(Duration::ZERO, rate)])
    }

    #[inline]
    pub fn entries(&self) -> &[BasalScheduleEntry] {
        &self.entries
    }

    /// The rate in effect `offset` seconds after midnight.
    pub fn rate_at(&self, offset: f64) -> f64 {
        self.entries
            .iter()
            .take_while(|entry| entry.start.as_secs_f64() <= offset)
            .last()
            .map_or(0.0, |entry| entry.rate)
    }

    /// `(rate, start, duration)` for every entry, in seconds; the last entry runs to midnight.
    pub fn durations(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.entries.iter().enumerate().map(move |(i, entry)| {
            let start = entry.start.as_secs_f64();
            let end = self
                .entries
                .get(i + 1)
                .map_or(DAY.as_secs_f64(), |next| next.start.as_secs_f64());

            (entry.rate, start, end - start)
        })
    }

    /// The same schedule with runs of equal adjacent rates collapsed into their first entry.
    pub fn merged(&self) -> Self {
        let mut entries: Vec<BasalScheduleEntry> = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            match entries.last() {
                Some(last) if last.rate == entry.rate => {},
                _ => entries.push(*entry),
            }
        }

        Self {
            entries,
        }
    }
}
