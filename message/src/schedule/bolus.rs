use std::time::Duration;

use crate::{
    pod::{
        PULSE_SIZE,
        SEGMENT_SECONDS,
    },
    schedule::{
        BasalDeliveryTable,
        BasalTableEntry,
    },
};

/// Delivery table for an immediate bolus, optionally followed by an extended (square wave)
/// portion spread over half-hour segments.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BolusDeliveryTable {
    pub immediate_pulses:  u16,
    pub extended_pulses:   u16,
    /// Seconds, capped at one hour per extended pulse and eight hours overall.
    pub extended_duration: f64,
}

impl BolusDeliveryTable {
    const MAX_EXTENDED_HOURS: u16 = 8;

    pub fn new(units: f64, extended_units: f64, extended_duration: Duration) -> Self {
        let immediate_pulses = (units / PULSE_SIZE).round() as u16;
        let extended_pulses = (extended_units / PULSE_SIZE).round() as u16;

        let max_duration = extended_pulses.min(Self::MAX_EXTENDED_HOURS) as f64 * 3600.0;

        Self {
            immediate_pulses,
            extended_pulses,
            extended_duration: extended_duration.as_secs_f64().min(max_duration),
        }
    }

    pub fn table(&self) -> BasalDeliveryTable {
        let immediate = self.immediate_pulses;
        let extended = self.extended_pulses;

        if extended == 0 || self.extended_duration == 0.0 {
            return BasalDeliveryTable::new(vec![BasalTableEntry::new(1, immediate, false)]);
        }

        let per_segment = extended_pulses_per_segment(extended, self.extended_duration);
        let num_segments = per_segment.len();

        // the immediate pulses take the first slot, which may absorb the first extended segments
        let mut segments = 1u8;
        let mut alternate = false;

        if per_segment[0] as i32 - 1 == immediate as i32 {
            segments += 1;
            alternate = true;
        } else if per_segment[0] == immediate {
            segments += 1;
            if immediate != 0 {
                segments += matching_run(&per_segment, 0, immediate) as u8;
            }
        }

        let mut entries = vec![BasalTableEntry::new(segments, immediate, alternate)];

        let mut remaining = immediate as i64 + extended as i64 - segments as i64 * immediate as i64;
        if alternate {
            remaining -= segments as i64 / 2;
        }

        let mut idx = if alternate { 1 } else { segments as usize - 1 };
        let base = extended / num_segments as u16;

        while idx < num_segments && remaining > 0 {
            let mut segments = 1usize;
            let mut alternate = false;
            let mut pulses = base;

            if idx < num_segments - 1 && per_segment[idx] == pulses && per_segment[idx + 1] == pulses + 1 {
                let pairs = alternating_pairs(&per_segment, idx, pulses);

                alternate = true;
                segments += pairs * 2 - 1;
                idx += pairs * 2 - 1;
                remaining -= segments as i64 / 2;
            } else {
                pulses = per_segment[idx];

                let run = matching_run(&per_segment, idx, pulses);
                segments += run;
                idx += run;
            }

            entries.push(BasalTableEntry::new(segments as u8, pulses, alternate));

            idx += 1;
            remaining -= segments as i64 * pulses as i64;
        }

        BasalDeliveryTable::new(entries)
    }
}

impl From<BolusDeliveryTable> for BasalDeliveryTable {
    #[inline]
    fn from(bolus: BolusDeliveryTable) -> Self {
        bolus.table()
    }
}

/// Spread `pulses` evenly over `duration` seconds and count how many land in each half-hour
/// segment. Pulses lost to rounding go to the final segment.
fn extended_pulses_per_segment(pulses: u16, duration: f64) -> Vec<u16> {
    let num_segments = (duration / SEGMENT_SECONDS).ceil() as usize;
    let interval = duration / pulses as f64;

    let mut counts = vec![0u16; num_segments];
    let mut counted = 0u16;
    let mut t = interval;

    for (segment, count) in counts.iter_mut().enumerate() {
        let start = segment as f64 * SEGMENT_SECONDS;
        let end = (start + SEGMENT_SECONDS).min(duration);

        while t <= end {
            if t > start {
                *count += 1;
                counted += 1;
            }

            t += interval;
        }

        if t > duration {
            break;
        }
    }

    if let Some(last) = counts.last_mut() {
        *last += pulses.saturating_sub(counted);
    }

    counts
}

/// Number of consecutive `[value, value + 1]` pairs starting at `idx`.
fn alternating_pairs(counts: &[u16], idx: usize, value: u16) -> usize {
    counts[idx..]
        .chunks_exact(2)
        .take_while(|pair| pair[0] == value && pair[1] == value + 1)
        .count()
}

/// Number of segments after `idx` that repeat `value`.
fn matching_run(counts: &[u16], idx: usize, value: u16) -> usize {
    counts[idx + 1..].iter().take_while(|&&count| count == value).count()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::test::hours;

    fn table(units: f64, extended_units: f64, duration: Duration) -> Vec<(u8, u16, bool)> {
        BolusDeliveryTable::new(units, extended_units, duration)
            .table()
            .entries
            .into_iter()
            .map(|e| (e.segments, e.pulses, e.alternate_segment_pulse))
            .collect()
    }

    #[test]
    fn immediate_only() {
        assert_eq!(vec![(1, 52, false)], table(2.6, 0.0, Duration::ZERO));
        assert_eq!(vec![(1, 600, false)], table(30.0, 1.0, Duration::ZERO));
    }

    #[test]
    fn extended_distribution() {
        assert_eq!(vec![0, 1, 1, 0, 1, 1, 0, 1, 1, 1], extended_pulses_per_segment(7, hours(5.0).as_secs_f64()));
        assert_eq!(vec![1], extended_pulses_per_segment(1, 1800.0));
    }

    #[test]
    fn extended_only() {
        assert_eq!(vec![(2, 0, true)], table(0.0, 0.05, hours(0.5)));
        assert_eq!(vec![(2, 0, true), (1, 1, false)], table(0.0, 0.10, hours(1.0)));
        assert_eq!(
            vec![(2, 0, false), (2, 1, false), (2, 0, true), (1, 1, false), (2, 0, true), (2, 1, false)],
            table(0.0, 0.35, hours(5.0))
        );
    }

    #[test]
    fn extended_duration_is_capped() {
        let bolus = BolusDeliveryTable::new(0.0, 0.35, hours(12.0));
        assert_eq!(hours(7.0).as_secs_f64(), bolus.extended_duration);

        let bolus = BolusDeliveryTable::new(0.0, 1.0, hours(12.0));
        assert_eq!(hours(8.0).as_secs_f64(), bolus.extended_duration);
    }

    #[test]
    fn extended_pulses_are_all_scheduled() {
        for (units, hours_) in [(0.35, 4.5), (0.35, 5.5), (1.0, 4.5)] {
            let bolus = BolusDeliveryTable::new(0.0, units, hours(hours_));
            let delivered: u32 = bolus.table().entries.iter().map(BasalTableEntry::total_pulses).sum();

            assert_eq!(bolus.extended_pulses as u32, delivered, "{units} U over {hours_} h");
        }
    }
}
