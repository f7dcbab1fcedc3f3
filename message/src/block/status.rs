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
        require,
        MessageBlockType,
    },
    error::MessageBlockError,
    pod::{
        AlertSet,
        DeliveryStatus,
        PodProgressStatus,
        PULSES_PER_UNIT,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9", endian = "msb")]
struct StatusBits {
    #[packed_field(bits = "0..=3")]
    delivery_status:    Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "4..=7")]
    progress_status:    Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "8..=11")]
    _reserved0:         ReservedZero<packed_bits::Bits<4>>,
    #[packed_field(bits = "12..=24")]
    pulses_delivered:   Integer<u16, packed_bits::Bits<13>>,
    #[packed_field(bits = "25..=28")]
    last_sequence:      Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "29")]
    _reserved1:         ReservedZero<packed_bits::Bits<1>>,
    #[packed_field(bits = "30..=39")]
    pulses_not_bolused: Integer<u16, packed_bits::Bits<10>>,
    #[packed_field(bits = "40")]
    _reserved2:         ReservedZero<packed_bits::Bits<1>>,
    #[packed_field(bits = "41..=48")]
    alerts:             Integer<u8, packed_bits::Bits<8>>,
    #[packed_field(bits = "49..=61")]
    minutes_active:     Integer<u16, packed_bits::Bits<13>>,
    #[packed_field(bits = "62..=71")]
    reservoir_pulses:   Integer<u16, packed_bits::Bits<10>>,
}

/// The pod's regular reply to most commands. Unlike other blocks it carries no length byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct StatusResponse {
    pub delivery_status:            DeliveryStatus,
    pub pod_progress_status:        PodProgressStatus,
    pub pulses_delivered:           u16,
    pub last_programming_sequence:  u8,
    pub bolus_pulses_not_delivered: u16,
    pub alerts:                     AlertSet,
    pub minutes_active:             u16,
    pub reservoir_pulses:           u16,
}

impl StatusResponse {
    pub const SIZE: usize = 10;

    #[inline]
    pub fn insulin_delivered(&self) -> f64 {
        self.pulses_delivered as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn bolus_not_delivered(&self) -> f64 {
        self.bolus_pulses_not_delivered as f64 / PULSES_PER_UNIT
    }

    /// Reservoir level in units. Above fifty units the pod reports
    /// [`crate::pod::RESERVOIR_LEVEL_ABOVE_THRESHOLD`].
    #[inline]
    pub fn reservoir_level(&self) -> f64 {
        self.reservoir_pulses as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn time_active(&self) -> Duration {
        Duration::from_secs(self.minutes_active as u64 * 60)
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let bits = StatusBits {
            delivery_status:    self.delivery_status.to_primitive().into(),
            progress_status:    self.pod_progress_status.to_primitive().into(),
            _reserved0:         Default::default(),
            pulses_delivered:   self.pulses_delivered.into(),
            last_sequence:      self.last_programming_sequence.into(),
            _reserved1:         Default::default(),
            pulses_not_bolused: self.bolus_pulses_not_delivered.into(),
            _reserved2:         Default::default(),
            alerts:             self.alerts.0.into(),
            minutes_active:     self.minutes_active.into(),
            reservoir_pulses:   self.reservoir_pulses.into(),
        };

        let mut out = BytesMut::with_capacity(Self::SIZE);
        out.put_u8(MessageBlockType::StatusResponse.to_primitive());
        out.put_slice(&bits.pack()?);

        Ok(out.freeze())
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::SIZE)?;

        let bits = StatusBits::unpack_from_slice(&block[1..Self::SIZE])?;

        let delivery = *bits.delivery_status;
        let progress = *bits.progress_status;

        Ok(Self {
            delivery_status:            DeliveryStatus::from_primitive(delivery)
                .ok_or_else(|| MessageBlockError::unknown(delivery, "DeliveryStatus"))?,
            pod_progress_status:        PodProgressStatus::from_primitive(progress)
                .ok_or_else(|| MessageBlockError::unknown(progress, "PodProgressStatus"))?,
            pulses_delivered:           *bits.pulses_delivered,
            last_programming_sequence:  *bits.last_sequence,
            bolus_pulses_not_delivered: *bits.pulses_not_bolused,
            alerts:                     AlertSet(*bits.alerts),
            minutes_active:             *bits.minutes_active,
            reservoir_pulses:           *bits.reservoir_pulses,
        })
    }
}
