use std::time::Duration;

use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::{
    error::MessageBlockError,
    pod::{
        MAX_SEGMENTS_PER_ENTRY,
        PULSE_SIZE,
        SEGMENTS_PER_DAY,
        SEGMENT_SECONDS,
    },
    schedule::BasalSchedule,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "2", endian = "msb")]
struct EntryBits {
    #[packed_field(bits = "0..=3")]
    segments_less_one: Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "4")]
    alternate:         bool,
    #[packed_field(bits = "5")]
    _reserved:         ReservedZero<packed_bits::Bits<1>>,
    #[packed_field(bits = "6..=15")]
    pulses:            Integer<u16, packed_bits::Bits<10>>,
}

/// `segments` consecutive half-hour slots each delivering `pulses`. When
/// `alternate_segment_pulse` is set, every second slot delivers one extra pulse.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BasalTableEntry {
    pub segments:                u8,
    pub pulses:                  u16,
    pub alternate_segment_pulse: bool,
}

impl BasalTableEntry {
    pub const SIZE: usize = 2;

    const MAX_PULSES: u16 = 0x3ff;

    #[inline]
    pub fn new(segments: u8, pulses: u16, alternate_segment_pulse: bool) -> Self {
        Self {
            segments,
            pulses,
            alternate_segment_pulse,
        }
    }

    pub fn checksum(&self) -> u16 {
        let segments = self.segments as u16;
        let per_segment = (self.pulses & 0xff) + (self.pulses >> 8);
        let alternate = if self.alternate_segment_pulse { segments / 2 } else { 0 };

        per_segment.wrapping_mul(segments).wrapping_add(alternate)
    }

    /// Pulses delivered over the whole entry.
    pub fn total_pulses(&self) -> u32 {
        let alternate = if self.alternate_segment_pulse { self.segments as u32 / 2 } else { 0 };

        self.pulses as u32 * self.segments as u32 + alternate
    }

    pub fn encode(&self) -> PackingResult<[u8; Self::SIZE]> {
        if !(1..=MAX_SEGMENTS_PER_ENTRY).contains(&self.segments) || self.pulses > Self::MAX_PULSES {
            return Err(PackingError::InvalidValue);
        }

        EntryBits {
            segments_less_one: (self.segments - 1).into(),
            alternate:         self.alternate_segment_pulse,
            _reserved:         Default::default(),
            pulses:            self.pulses.into(),
        }
        .pack()
    }

    pub fn decode(src: &[u8]) -> Result<Self, MessageBlockError> {
        if src.len() < Self::SIZE {
            return Err(MessageBlockError::NotEnoughData);
        }

        let bits = EntryBits::unpack_from_slice(&src[..Self::SIZE])?;

        Ok(Self {
            segments:                *bits.segments_less_one + 1,
            pulses:                  *bits.pulses,
            alternate_segment_pulse: bits.alternate,
        })
    }
}

/// Run-length encoded half-hour delivery table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BasalDeliveryTable {
    pub entries: Vec<BasalTableEntry>,
}

impl BasalDeliveryTable {
    #[inline]
    pub fn new(entries: Vec<BasalTableEntry>) -> Self {
        Self {
            entries,
        }
    }

    /// Compile a full day. Odd pulse-per-hour rates carry a half pulse from one slot into the
    /// next, and runs of equal or alternating slots are merged into entries of at most
    /// [`MAX_SEGMENTS_PER_ENTRY`] slots.
    pub fn from_schedule(schedule: &BasalSchedule) -> Self {
        let mut half_pulse_remainder = false;

        let slots = (0..SEGMENTS_PER_DAY).map(|i| {
            let rate = schedule.rate_at(i as f64 * SEGMENT_SECONDS);
            let pulses_per_hour = (rate / PULSE_SIZE).round() as u16;
            let half_pulse = pulses_per_hour & 1 != 0;

            let pulses = (pulses_per_hour >> 1) + (half_pulse_remainder && half_pulse) as u16;
            half_pulse_remainder ^= half_pulse;

            pulses
        });

        let mut entries = vec![];
        let mut alternate = false;
        let mut run: Option<(u16, u8)> = None;

        for pulses in slots {
            let (first, len) = match run {
                None => {
                    run = Some((pulses, 1));
                    continue;
                },
                Some(run) => run,
            };

            let delta = pulses as i32 - first as i32;
            if len == 1 {
                alternate = delta == 1;
            }

            let expected = if alternate { (len % 2) as i32 } else { 0 };

            run = if delta != expected || len == MAX_SEGMENTS_PER_ENTRY {
                entries.push(BasalTableEntry::new(len, first, alternate));
                Some((pulses, 1))
            } else {
                Some((first, len + 1))
            };
        }

        // the flag from the last comparison carries into the final run
        if let Some((first, len)) = run {
            entries.push(BasalTableEntry::new(len, first, alternate));
        }

        Self::new(entries)
    }

    /// Table for a flat temporary rate. `rate` must already be a supported rate.
    pub fn temp_basal(rate: f64, duration: Duration) -> Self {
        let pulses_per_hour = (rate / PULSE_SIZE).round() as u16;
        let pulses_per_segment = pulses_per_hour >> 1;
        let alternate = pulses_per_hour & 1 != 0;

        let mut remaining = (duration.as_secs_f64() / SEGMENT_SECONDS).round() as u32;
        let mut entries = vec![];

        while remaining > 0 {
            let segments = remaining.min(MAX_SEGMENTS_PER_ENTRY as u32) as u8;
            entries.push(BasalTableEntry::new(segments, pulses_per_segment, alternate && segments > 1));
            remaining -= segments as u32;
        }

        Self::new(entries)
    }

    pub fn num_segments(&self) -> usize {
        self.entries.iter().map(|e| e.segments as usize).sum()
    }
}
