use std::time::Duration;

use byteorder::{
    BigEndian,
    ByteOrder,
};
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
    schedule::{
        BasalSchedule,
        RateEntry,
    },
};

/// Per-pulse timing that accompanies a basal [`crate::block::SetInsulinScheduleCommand`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BasalScheduleExtraCommand {
    pub beep_options:                    BeepOptions,
    /// Index into `rate_entries` of the entry in effect.
    pub current_entry_index:             u8,
    pub remaining_pulses:                f64,
    /// Seconds.
    pub delay_until_next_tenth_of_pulse: f64,
    pub rate_entries:                    Vec<RateEntry>,
}

impl BasalScheduleExtraCommand {
    const HEADER_LEN: usize = 10;

    pub fn from_schedule(
        schedule: &BasalSchedule,
        offset: Duration,
        beep_options: BeepOptions,
    ) -> Result<Self, ScheduleError> {
        let rate_entries = schedule
            .merged()
            .durations()
            .flat_map(|(rate, _, duration)| RateEntry::make_entries(rate, Duration::from_secs_f64(duration)))
            .collect::<Vec<_>>();

        let secs = offset.as_secs_f64().round();

        let mut start = 0.0;
        for (idx, entry) in rate_entries.iter().enumerate() {
            let duration = entry.duration();

            if secs >= start && secs <= start + duration {
                let remaining = start + duration - secs;
                let pulses = entry.total_pulses * (remaining / duration);

                let remaining_pulses = match pulses {
                    p if p == 0.0 => 0.1,
                    p => (p * 10.0).ceil() / 10.0,
                };

                let current_entry_index =
                    u8::try_from(idx).map_err(|_| ScheduleError::OffsetOutOfRange(offset))?;

                return Ok(Self {
                    beep_options,
                    current_entry_index,
                    remaining_pulses,
                    delay_until_next_tenth_of_pulse: remaining % (entry.delay_between_pulses / 10.0),
                    rate_entries,
                });
            }

            start += duration;
        }

        Err(ScheduleError::OffsetOutOfRange(offset))
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = BytesMut::with_capacity(Self::HEADER_LEN - 2 + self.rate_entries.len() * RateEntry::SIZE);

        body.put_u8(self.beep_options.to_byte()?);
        body.put_u8(self.current_entry_index);
        body.put_u16((self.remaining_pulses * 10.0).round() as u16);
        body.put_u32((self.delay_until_next_tenth_of_pulse * 1_000_000.0).round() as u32);

        for entry in &self.rate_entries {
            body.put_slice(&entry.encode()?);
        }

        frame(MessageBlockType::BasalScheduleExtra, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::HEADER_LEN)?;

        let len = block[1] as usize;
        if len < Self::HEADER_LEN - 2 {
            return Err(MessageBlockError::NotEnoughData);
        }
        require(block, len + 2)?;

        let num_entries = (len - (Self::HEADER_LEN - 2)) / RateEntry::SIZE;
        let rate_entries = (0..num_entries)
            .map(|i| RateEntry::decode(&block[Self::HEADER_LEN + i * RateEntry::SIZE..]))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            beep_options: BeepOptions::from_byte(block[2])?,
            current_entry_index: block[3],
            remaining_pulses: BigEndian::read_u16(&block[4..6]) as f64 / 10.0,
            delay_until_next_tenth_of_pulse: BigEndian::read_u32(&block[6..10]) as f64 / 1_000_000.0,
            rate_entries,
        })
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        block::{
            beep::test::beep_options,
            insulin_schedule::test::offset,
        },
        schedule::test::{
            hours,
            rate_entry,
            schedule,
        },
    };

    fn extra(
        entries: &[(f64, f64)],
        offset: Duration,
        completion_beep: bool,
    ) -> eyre::Result<BasalScheduleExtraCommand> {
        let beeps = BeepOptions::new(false, completion_beep, Duration::ZERO);
        Ok(BasalScheduleExtraCommand::from_schedule(&schedule(entries), offset, beeps)?)
    }

    /// Hex with the timer word masked: it depends on sub-second timing of the capture.
    fn blurred(hex: &str) -> String {
        format!("{}........{}", &hex[..12], &hex[20..])
    }

    #[test]
    fn exact_captures() -> eyre::Result<()> {
        let cases: &[(&[(f64, f64)], u16, u16, bool, &str)] = &[
            (
                &[(0.0, 1.05), (10.5, 0.9), (18.5, 1.0)],
                0x2e,
                0x1be8,
                true,
                "131a4002009600a7d8c0089d0105944905a001312d00044c0112a880",
            ),
            (&[(0.0, 24.0)], 0x01, 0x2dc8, true, "13144000f2020003d090fd20000b71b0c4e0000b71b0"),
            (
                &[(0.0, 30.0)],
                0x0c,
                0x1a00,
                true,
                "131a4000632b00061a80f618000927c0f618000927c04650000927c0",
            ),
            (
                &[(0.0, 0.0), (0.5, 0.03), (1.5, 0.075), (3.5, 0.0), (4.0, 0.25), (6.0, 0.725), (7.5, 0.78)],
                0x2f,
                0x0ac0,
                false,
                "132c0005000f007a12000003eb49d200001415752a000001eb49d2000064044aa20000d201885e6d09ab016e3600",
            ),
        ];

        for (entries, segment, remaining, completion, expected) in cases {
            let cmd = extra(entries, offset(*segment, *remaining), *completion)?;
            assert_eq!(*expected, hex::encode(cmd.encode()?));
        }

        Ok(())
    }

    #[test]
    fn sub_second_offset() -> eyre::Result<()> {
        let at = offset(0x2b, 0x1b38) + Duration::from_millis(456);
        let cmd = extra(&[(0.0, 1.0)], at, true)?;

        assert_eq!("130e400001c1006acfc012c00112a880", hex::encode(cmd.encode()?));
        assert_eq!(0, cmd.current_entry_index);
        assert_eq!(44.9, cmd.remaining_pulses);

        Ok(())
    }

    #[test]
    fn captures_up_to_timer() -> eyre::Result<()> {
        let thirteen = [
            (0.0, 1.3),
            (0.5, 0.05),
            (2.0, 1.7),
            (2.5, 0.85),
            (3.0, 1.0),
            (7.5, 0.65),
            (8.5, 0.5),
            (9.5, 0.65),
            (10.5, 0.6),
            (11.5, 0.65),
            (14.0, 1.65),
            (15.5, 0.15),
            (16.5, 0.85),
        ];

        let cases: &[(&[(f64, f64)], u16, u16, &str)] = &[
            (
                &[(0.0, 0.8), (3.0, 0.9), (5.0, 0.85), (7.5, 0.85), (12.5, 0.85), (15.0, 0.7), (18.0, 0.9), (20.0, 1.1)],
                0x2a,
                0x1e50,
                "132c4005026200455b9c01e0015752a0016801312d0006a40143209601a401885e6d016801312d00037000f9b074",
            ),
            (
                &thirteen,
                0x27,
                0x1518,
                "1356400c02c8011abc64008200d34689000f15752a0000aa00a1904b00550143209603840112a880008201a68d13006402255100008201a68d13007801c9c380014501a68d1301ef00a675a2001e07270e0004fb01432096",
            ),
            (&[(0.0, 1.05)], 0x20, 0x33c0, "130e40000688009cf29113b001059449"),
            (&[(0.0, 1.05)], 0x23, 0x17a0, "130e40000519001a286513b001059449"),
        ];

        for (entries, segment, remaining, expected) in cases {
            let cmd = extra(entries, offset(*segment, *remaining), true)?;
            assert_eq!(blurred(expected), blurred(&hex::encode(cmd.encode()?)));
        }

        Ok(())
    }

    #[test]
    fn decode_capture() -> eyre::Result<()> {
        let src = hex::decode("131a4002009600a7d8c0089d0105944905a001312d00044c0112a880")?;
        let cmd = BasalScheduleExtraCommand::decode(&src)?;

        assert!(cmd.beep_options.completion_beep);
        assert!(!cmd.beep_options.acknowledgement_beep);
        assert_eq!(2, cmd.current_entry_index);
        assert_eq!(15.0, cmd.remaining_pulses);
        assert_eq!(11.0, cmd.delay_until_next_tenth_of_pulse);
        assert_eq!(3, cmd.rate_entries.len());
        assert_eq!(vec![1.05, 0.9, 1.0], cmd.rate_entries.iter().map(RateEntry::rate).collect::<Vec<_>>());

        assert_eq!(src, cmd.encode()?.to_vec());

        Ok(())
    }

    #[test]
    fn offset_past_schedule() {
        assert_eq!(
            Err(ScheduleError::OffsetOutOfRange(hours(25.0))),
            BasalScheduleExtraCommand::from_schedule(&schedule(&[(0.0, 1.0)]), hours(25.0), BeepOptions::default())
        );
    }

    prop_compose! {
        fn basal_extra()(
            beep_options in beep_options(),
            current_entry_index in any::<u8>(),
            tenths in any::<u16>(),
            micros in any::<u32>(),
            rate_entries in proptest::collection::vec(rate_entry(), 1..=40),
        ) -> BasalScheduleExtraCommand {
            BasalScheduleExtraCommand {
                beep_options,
                current_entry_index,
                remaining_pulses: tenths as f64 / 10.0,
                delay_until_next_tenth_of_pulse: micros as f64 / 1_000_000.0,
                rate_entries,
            }
        }
    }

    proptest! {
        #[test]
        fn commands_survive_decoding(cmd in basal_extra()) {
            let encoded = cmd.encode().unwrap();
            prop_assert_eq!(encoded.len(), encoded[1] as usize + 2);
            prop_assert_eq!(cmd, BasalScheduleExtraCommand::decode(&encoded).unwrap());
        }
    }
}
