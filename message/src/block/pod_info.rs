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
        MessageBlockType,
        PodInfoType,
    },
    error::MessageBlockError,
    pod::{
        AlertSet,
        DeliveryStatus,
        FaultEventCode,
        PodProgressStatus,
        PULSES_PER_UNIT,
    },
};

/// Fault context byte of a [`DetailedStatus`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "1")]
pub struct ErrorEventInfo {
    #[packed_field(bits = "0")]
    pub insulin_state_table_corruption: bool,
    #[packed_field(bits = "1..=2")]
    occlusion:                          Integer<u8, packed_bits::Bits<2>>,
    #[packed_field(bits = "3")]
    pub immediate_bolus_in_progress:    bool,
    #[packed_field(bits = "4..=7", ty = "enum")]
    pub pod_progress_status:            PodProgressStatus,
}

impl ErrorEventInfo {
    #[inline]
    pub fn occlusion_type(&self) -> u8 {
        *self.occlusion
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DetailedStatus {
    pub pod_progress_status:            PodProgressStatus,
    pub delivery_status:                DeliveryStatus,
    pub bolus_pulses_not_delivered:     u16,
    pub last_programming_sequence:      u8,
    pub pulses_delivered:               u16,
    pub fault_event_code:               FaultEventCode,
    /// Minutes after activation at which the fault occurred.
    pub fault_event_time:               Option<u16>,
    pub reservoir_pulses:               u16,
    pub minutes_active:                 u16,
    pub unacknowledged_alerts:          AlertSet,
    pub fault_accessing_tables:         bool,
    pub error_event_info:               Option<ErrorEventInfo>,
    pub receiver_low_gain:              u8,
    pub radio_rssi:                     u8,
    pub possible_fault_calling_address: Option<u16>,
    data:                               Bytes,
}

impl DetailedStatus {
    const MIN_LEN: usize = 22;

    /// Decode from the pod info payload, which starts at the subtype byte.
    pub fn decode(data: &[u8]) -> Result<Self, MessageBlockError> {
        require(data, Self::MIN_LEN)?;

        let fault_event_code = FaultEventCode(data[8]);
        let fault_minutes = BigEndian::read_u16(&data[9..11]);

        let error_event_info = match data[17] {
            0 => None,
            b => Some(ErrorEventInfo::unpack(&[b])?),
        };

        let delivery = data[2] & 0x0f;

        Ok(Self {
            pod_progress_status: PodProgressStatus::from_primitive(data[1])
                .ok_or_else(|| MessageBlockError::unknown(data[1], "PodProgressStatus"))?,
            delivery_status: DeliveryStatus::from_primitive(delivery)
                .ok_or_else(|| MessageBlockError::unknown(delivery, "DeliveryStatus"))?,
            bolus_pulses_not_delivered: ((data[3] as u16 & 0x3) << 8) | data[4] as u16,
            last_programming_sequence: data[5],
            pulses_delivered: BigEndian::read_u16(&data[6..8]),
            fault_event_code,
            fault_event_time: (fault_minutes != 0xffff).then_some(fault_minutes),
            reservoir_pulses: ((data[11] as u16 & 0x3) << 8) | data[12] as u16,
            minutes_active: BigEndian::read_u16(&data[13..15]),
            unacknowledged_alerts: AlertSet(data[15]),
            fault_accessing_tables: data[16] & 0x2 != 0,
            error_event_info,
            receiver_low_gain: data[18] >> 6,
            radio_rssi: data[18] & 0x3f,
            possible_fault_calling_address: fault_event_code
                .is_fault()
                .then(|| BigEndian::read_u16(&data[20..22])),
            data: Bytes::copy_from_slice(data),
        })
    }

    #[inline]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[inline]
    pub fn total_insulin_delivered(&self) -> f64 {
        self.pulses_delivered as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn bolus_not_delivered(&self) -> f64 {
        self.bolus_pulses_not_delivered as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn reservoir_level(&self) -> f64 {
        self.reservoir_pulses as f64 / PULSES_PER_UNIT
    }

    #[inline]
    pub fn time_active(&self) -> Duration {
        Duration::from_secs(self.minutes_active as u64 * 60)
    }

    pub fn is_faulted(&self) -> bool {
        self.fault_event_code.is_fault()
            || self.pod_progress_status == PodProgressStatus::ActivationTimeExceeded
    }

    /// Progress status before the fault, when a fault was recorded.
    #[inline]
    pub fn previous_pod_progress_status(&self) -> Option<PodProgressStatus> {
        self.error_event_info.map(|info| info.pod_progress_status)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PodInfo {
    DetailedStatus(DetailedStatus),
    /// A subtype kept as raw bytes, subtype byte included.
    Other { info_type: u8, data: Bytes },
}

impl PodInfo {
    pub fn info_type(&self) -> u8 {
        match self {
            PodInfo::DetailedStatus(_) => PodInfoType::DetailedStatus.to_primitive(),
            PodInfo::Other {
                info_type,
                ..
            } => *info_type,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PodInfoResponse {
    pub info: PodInfo,
}

impl PodInfoResponse {
    pub fn encode(&self) -> PackingResult<Bytes> {
        let data = match &self.info {
            PodInfo::DetailedStatus(status) => status.data(),
            PodInfo::Other {
                data,
                ..
            } => data,
        };

        frame(MessageBlockType::PodInfoResponse, data)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, 3)?;

        let data = &block[2..];
        let info = match PodInfoType::from_primitive(data[0]) {
            Some(PodInfoType::DetailedStatus) => PodInfo::DetailedStatus(DetailedStatus::decode(data)?),
            _ => PodInfo::Other {
                info_type: data[0],
                data:      Bytes::copy_from_slice(data),
            },
        };

        Ok(Self {
            info,
        })
    }
}
