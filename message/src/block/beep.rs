use std::{
    str::FromStr,
    time::Duration,
};

use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::error::MessageBlockError;

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Default,
    PrimitiveEnum_u8,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "snake_case")]
pub enum BeepType {
    #[default]
    NoBeepCancel                 = 0x0,
    BeepBeepBeepBeep             = 0x1,
    BipBeepBipBeepBipBeepBipBeep = 0x2,
    BipBip                       = 0x3,
    Beep                         = 0x4,
    BeepBeepBeep                 = 0x5,
    Beeeeeep                     = 0x6,
    BipBipBipbipBipBip           = 0x7,
    BeeepBeeep                   = 0x8,
    NoBeepNonCancel              = 0xf,
}

impl BeepType {
    const NAMES: &'static [(&'static str, BeepType)] = &[
        ("no_beep_cancel", BeepType::NoBeepCancel),
        ("beep_beep_beep_beep", BeepType::BeepBeepBeepBeep),
        ("bip_beep_bip_beep_bip_beep_bip_beep", BeepType::BipBeepBipBeepBipBeepBipBeep),
        ("bip_bip", BeepType::BipBip),
        ("beep", BeepType::Beep),
        ("beep_beep_beep", BeepType::BeepBeepBeep),
        ("beeeeeep", BeepType::Beeeeeep),
        ("bip_bip_bipbip_bip_bip", BeepType::BipBipBipbipBipBip),
        ("beeep_beeep", BeepType::BeeepBeeep),
        ("no_beep_non_cancel", BeepType::NoBeepNonCancel),
    ];

    #[inline]
    pub(crate) fn decode(nibble: u8) -> Result<Self, MessageBlockError> {
        Self::from_primitive(nibble).ok_or_else(|| MessageBlockError::unknown(nibble, "BeepType"))
    }
}

impl FromStr for BeepType {
    type Err = MessageBlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_").to_lowercase();

        Self::NAMES
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|&(_, ty)| ty)
            .ok_or_else(|| MessageBlockError::ValidationFailed(format!("unknown beep type '{s}'")))
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
struct BeepOptionBits {
    #[packed_field(bits = "0")]
    acknowledgement: bool,
    #[packed_field(bits = "1")]
    completion:      bool,
    #[packed_field(bits = "2..=7")]
    reminder:        Integer<u8, packed_bits::Bits<6>>,
}

/// Beep flags and program reminder carried in the first body byte of the `*Extra` commands.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BeepOptions {
    pub acknowledgement_beep: bool,
    pub completion_beep:      bool,
    reminder_minutes:         u8,
}

impl BeepOptions {
    pub const MAX_REMINDER_MINUTES: u8 = 0x3f;

    /// The reminder interval is truncated to whole minutes and saturates at
    /// [`Self::MAX_REMINDER_MINUTES`].
    pub fn new(acknowledgement_beep: bool, completion_beep: bool, program_reminder: Duration) -> Self {
        let minutes = (program_reminder.as_secs() / 60).min(Self::MAX_REMINDER_MINUTES as u64);

        Self {
            acknowledgement_beep,
            completion_beep,
            reminder_minutes: minutes as u8,
        }
    }

    #[inline]
    pub fn program_reminder(&self) -> Duration {
        Duration::from_secs(self.reminder_minutes as u64 * 60)
    }

    pub fn to_byte(&self) -> PackingResult<u8> {
        let bits = BeepOptionBits {
            acknowledgement: self.acknowledgement_beep,
            completion:      self.completion_beep,
            reminder:        (self.reminder_minutes & Self::MAX_REMINDER_MINUTES).into(),
        };

        Ok(bits.pack()?[0])
    }

    pub fn from_byte(b: u8) -> PackingResult<Self> {
        let bits = BeepOptionBits::unpack(&[b])?;

        Ok(Self {
            acknowledgement_beep: bits.acknowledgement,
            completion_beep:      bits.completion,
            reminder_minutes:     *bits.reminder,
        })
    }
}
