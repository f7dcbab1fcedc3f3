use byteorder::{
    BigEndian,
    ByteOrder,
};
use bytes::Bytes;
use chrono::{
    Datelike,
    NaiveDate,
    NaiveDateTime,
    Timelike,
};
use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::{
    block::{
        frame,
        require,
        MessageBlockType,
    },
    error::MessageBlockError,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct AssignAddressCommand {
    pub address: u32,
}

impl AssignAddressCommand {
    pub fn encode(&self) -> PackingResult<Bytes> {
        frame(MessageBlockType::AssignAddress, &self.address.to_be_bytes())
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, 6)?;

        Ok(Self {
            address: BigEndian::read_u32(&block[2..6]),
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SetupPodCommand {
    pub address:              u32,
    pub date_time:            NaiveDateTime,
    pub lot:                  u32,
    pub tid:                  u32,
    pub packet_timeout_limit: u8,
}

impl SetupPodCommand {
    const LEN: usize = 21;
    const MARKER: u8 = 0x14;

    pub const DEFAULT_PACKET_TIMEOUT_LIMIT: u8 = 4;

    pub fn new(address: u32, date_time: NaiveDateTime, lot: u32, tid: u32) -> Self {
        Self {
            address,
            date_time,
            lot,
            tid,
            packet_timeout_limit: Self::DEFAULT_PACKET_TIMEOUT_LIMIT,
        }
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let year = self
            .date_time
            .year()
            .checked_sub(2000)
            .and_then(|y| u8::try_from(y).ok())
            .ok_or(PackingError::InvalidValue)?;

        let mut body = [0u8; 19];
        BigEndian::write_u32(&mut body[..4], self.address);
        body[4] = Self::MARKER;
        body[5] = self.packet_timeout_limit;
        body[6] = self.date_time.month() as u8;
        body[7] = self.date_time.day() as u8;
        body[8] = year;
        body[9] = self.date_time.hour() as u8;
        body[10] = self.date_time.minute() as u8;
        BigEndian::write_u32(&mut body[11..15], self.lot);
        BigEndian::write_u32(&mut body[15..19], self.tid);

        frame(MessageBlockType::SetupPod, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::LEN)?;

        let date_time = NaiveDate::from_ymd_opt(2000 + block[10] as i32, block[8] as u32, block[9] as u32)
            .and_then(|date| date.and_hms_opt(block[11] as u32, block[12] as u32, 0))
            .ok_or_else(|| {
                MessageBlockError::ValidationFailed(format!(
                    "invalid setup date {}",
                    hex::encode(&block[8..13])
                ))
            })?;

        Ok(Self {
            address: BigEndian::read_u32(&block[2..6]),
            date_time,
            lot: BigEndian::read_u32(&block[13..17]),
            tid: BigEndian::read_u32(&block[17..21]),
            packet_timeout_limit: block[7],
        })
    }
}

/// Pod info subtype requested by a [`GetStatusCommand`] and echoed by the
/// [`crate::block::PodInfoResponse`].
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    PrimitiveEnum_u8,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(u8)]
pub enum PodInfoType {
    #[default]
    Normal           = 0x00,
    ConfiguredAlerts = 0x01,
    DetailedStatus   = 0x02,
    PulseLogPlus     = 0x03,
    ActivationTime   = 0x05,
    PulseLogRecent   = 0x50,
    PulseLogPrevious = 0x51,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GetStatusCommand {
    pub pod_info_type: PodInfoType,
}

impl GetStatusCommand {
    pub fn encode(&self) -> PackingResult<Bytes> {
        frame(MessageBlockType::GetStatus, &[self.pod_info_type.to_primitive()])
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, 3)?;

        Ok(Self {
            pod_info_type: PodInfoType::from_primitive(block[2])
                .ok_or_else(|| MessageBlockError::unknown(block[2], "PodInfoType"))?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DeactivatePodCommand {
    pub nonce: u32,
}

impl DeactivatePodCommand {
    pub fn encode(&self) -> PackingResult<Bytes> {
        frame(MessageBlockType::DeactivatePod, &self.nonce.to_be_bytes())
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, 6)?;

        Ok(Self {
            nonce: BigEndian::read_u32(&block[2..6]),
        })
    }
}
