use std::time::Duration;

use bytes::Bytes;
use packed_struct::PackingError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    #[error("buffer too short to carry a checksum")]
    TooShort,

    #[error("checksum mismatch (received 0x{expected}, computed 0x{computed})")]
    Mismatch {
        expected: String,
        computed: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    #[error("insufficient data for a radio packet")]
    InsufficientData,

    #[error("radio packet failed crc check")]
    InvalidCrc,

    #[error("unknown packet type {0:#05b}")]
    UnknownPacketType(u8),
}

impl From<ChecksumError> for PacketError {
    #[inline]
    fn from(e: ChecksumError) -> Self {
        match e {
            ChecksumError::TooShort => PacketError::InsufficientData,
            ChecksumError::Mismatch {
                ..
            } => PacketError::InvalidCrc,
        }
    }
}

/// Failure decoding or validating a single message block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageBlockError {
    #[error("not enough data")]
    NotEnoughData,

    #[error("unknown block type {0:#04x}")]
    UnknownBlockType(u8),

    #[error("unknown value {value:#04x} for {type_description}")]
    UnknownValue {
        value:            u8,
        type_description: &'static str,
    },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Packing(#[from] PackingError),
}

impl MessageBlockError {
    #[inline]
    pub(crate) fn unknown(value: u8, type_description: &'static str) -> Self {
        Self::UnknownValue {
            value,
            type_description,
        }
    }
}

/// Failure decoding a [`crate::Message`] envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    /// The buffer ends before the envelope does. A reassembler should wait for the next
    /// continuation packet.
    #[error("not enough data")]
    NotEnoughData,

    #[error("message failed crc check")]
    InvalidCrc,

    #[error("unexpected message sequence (expected {expected}, received {received})")]
    InvalidSequence { expected: u8, received: u8 },

    #[error("unexpected message address {0:#010x}")]
    InvalidAddress(u32),

    #[error("failed to parse block at offset {offset} (0x{}): {source}", hex::encode(.data))]
    Parsing {
        offset: usize,
        data:   Bytes,
        source: MessageBlockError,
    },
}

impl From<ChecksumError> for MessageError {
    #[inline]
    fn from(e: ChecksumError) -> Self {
        match e {
            ChecksumError::TooShort => MessageError::NotEnoughData,
            ChecksumError::Mismatch {
                ..
            } => MessageError::InvalidCrc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("basal schedule has no entries")]
    Empty,

    #[error("first basal schedule entry must start at midnight")]
    FirstEntryNotMidnight,

    #[error("basal schedule entry {0} does not start after its predecessor")]
    Unsorted(usize),

    #[error("basal schedule entry starts past the end of the day ({0:?})")]
    StartOutOfRange(Duration),

    #[error("invalid rate {0} U/h")]
    InvalidRate(f64),

    #[error("invalid duration {0:?}")]
    InvalidDuration(Duration),

    #[error("invalid insulin amount {0} U")]
    InvalidUnits(f64),

    #[error("offset {0:?} does not fall within the schedule")]
    OffsetOutOfRange(Duration),
}
