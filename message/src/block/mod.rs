//! The command and response blocks carried inside a [`crate::Message`].
//!
//! Every block starts with a one-byte type tag. All of them except [`StatusResponse`] follow
//! the tag with a length byte counting the remaining bytes, so several blocks can be
//! concatenated in one message body.

use bytes::{
    BufMut,
    Bytes,
    BytesMut,
};
use packed_struct::{
    prelude::*,
    PackingResult,
};

use crate::error::MessageBlockError;

mod basal_extra;
mod beep;
mod bolus_extra;
mod cancel;
mod error_response;
mod insulin_schedule;
mod pod_info;
mod pod_setup;
mod status;
mod temp_basal_extra;
mod version;

pub use basal_extra::BasalScheduleExtraCommand;
pub use beep::{
    BeepOptions,
    BeepType,
};
pub use bolus_extra::BolusExtraCommand;
pub use cancel::{
    CancelDeliveryCommand,
    CancelDeliveryType,
};
pub use error_response::ErrorResponse;
pub use insulin_schedule::{
    DeliverySchedule,
    SetInsulinScheduleCommand,
};
pub use pod_info::{
    DetailedStatus,
    ErrorEventInfo,
    PodInfo,
    PodInfoResponse,
};
pub use pod_setup::{
    AssignAddressCommand,
    DeactivatePodCommand,
    GetStatusCommand,
    PodInfoType,
    SetupPodCommand,
};
pub use status::StatusResponse;
pub use temp_basal_extra::TempBasalExtraCommand;
pub use version::{
    FirmwareVersion,
    PodConfiguration,
    VersionDetails,
    VersionResponse,
};

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u8, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum MessageBlockType {
    VersionResponse    = 0x01,
    PodInfoResponse    = 0x02,
    SetupPod           = 0x03,
    ErrorResponse      = 0x06,
    AssignAddress      = 0x07,
    GetStatus          = 0x0e,
    BasalScheduleExtra = 0x13,
    TempBasalExtra     = 0x16,
    BolusExtra         = 0x17,
    SetInsulinSchedule = 0x1a,
    DeactivatePod      = 0x1c,
    StatusResponse     = 0x1d,
    CancelDelivery     = 0x1f,
}

#[derive(Clone, Debug, PartialEq, derive_more::From)]
pub enum MessageBlock {
    VersionResponse(VersionResponse),
    PodInfoResponse(PodInfoResponse),
    SetupPod(SetupPodCommand),
    ErrorResponse(ErrorResponse),
    AssignAddress(AssignAddressCommand),
    GetStatus(GetStatusCommand),
    BasalScheduleExtra(BasalScheduleExtraCommand),
    TempBasalExtra(TempBasalExtraCommand),
    BolusExtra(BolusExtraCommand),
    SetInsulinSchedule(SetInsulinScheduleCommand),
    DeactivatePod(DeactivatePodCommand),
    StatusResponse(StatusResponse),
    CancelDelivery(CancelDeliveryCommand),
}

impl MessageBlock {
    pub fn block_type(&self) -> MessageBlockType {
        match self {
            MessageBlock::VersionResponse(_) => MessageBlockType::VersionResponse,
            MessageBlock::PodInfoResponse(_) => MessageBlockType::PodInfoResponse,
            MessageBlock::SetupPod(_) => MessageBlockType::SetupPod,
            MessageBlock::ErrorResponse(_) => MessageBlockType::ErrorResponse,
            MessageBlock::AssignAddress(_) => MessageBlockType::AssignAddress,
            MessageBlock::GetStatus(_) => MessageBlockType::GetStatus,
            MessageBlock::BasalScheduleExtra(_) => MessageBlockType::BasalScheduleExtra,
            MessageBlock::TempBasalExtra(_) => MessageBlockType::TempBasalExtra,
            MessageBlock::BolusExtra(_) => MessageBlockType::BolusExtra,
            MessageBlock::SetInsulinSchedule(_) => MessageBlockType::SetInsulinSchedule,
            MessageBlock::DeactivatePod(_) => MessageBlockType::DeactivatePod,
            MessageBlock::StatusResponse(_) => MessageBlockType::StatusResponse,
            MessageBlock::CancelDelivery(_) => MessageBlockType::CancelDelivery,
        }
    }

    /// The nonce carried by nonce-resyncable commands.
    pub fn nonce(&self) -> Option<u32> {
        match self {
            MessageBlock::SetInsulinSchedule(cmd) => Some(cmd.nonce),
            MessageBlock::CancelDelivery(cmd) => Some(cmd.nonce),
            MessageBlock::DeactivatePod(cmd) => Some(cmd.nonce),
            _ => None,
        }
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        match self {
            MessageBlock::VersionResponse(b) => b.encode(),
            MessageBlock::PodInfoResponse(b) => b.encode(),
            MessageBlock::SetupPod(b) => b.encode(),
            MessageBlock::ErrorResponse(b) => b.encode(),
            MessageBlock::AssignAddress(b) => b.encode(),
            MessageBlock::GetStatus(b) => b.encode(),
            MessageBlock::BasalScheduleExtra(b) => b.encode(),
            MessageBlock::TempBasalExtra(b) => b.encode(),
            MessageBlock::BolusExtra(b) => b.encode(),
            MessageBlock::SetInsulinSchedule(b) => b.encode(),
            MessageBlock::DeactivatePod(b) => b.encode(),
            MessageBlock::StatusResponse(b) => b.encode(),
            MessageBlock::CancelDelivery(b) => b.encode(),
        }
    }

    /// Decode the block at the start of `src`, returning it together with the number of bytes
    /// it occupied. Trailing bytes are left for the blocks that follow.
    #[tracing::instrument(skip_all, fields(src = %hex::encode(src)), level = "trace", err(Display))]
    pub fn decode(src: &[u8]) -> Result<(Self, usize), MessageBlockError> {
        let tag = *src.first().ok_or(MessageBlockError::NotEnoughData)?;
        let ty = MessageBlockType::from_primitive(tag)
            .ok_or(MessageBlockError::UnknownBlockType(tag))?;

        let len = match ty {
            MessageBlockType::StatusResponse => StatusResponse::SIZE,
            _ => *src.get(1).ok_or(MessageBlockError::NotEnoughData)? as usize + 2,
        };

        let block = src.get(..len).ok_or(MessageBlockError::NotEnoughData)?;

        let result = match ty {
            MessageBlockType::VersionResponse => VersionResponse::decode(block)?.into(),
            MessageBlockType::PodInfoResponse => PodInfoResponse::decode(block)?.into(),
            MessageBlockType::SetupPod => SetupPodCommand::decode(block)?.into(),
            MessageBlockType::ErrorResponse => ErrorResponse::decode(block)?.into(),
            MessageBlockType::AssignAddress => AssignAddressCommand::decode(block)?.into(),
            MessageBlockType::GetStatus => GetStatusCommand::decode(block)?.into(),
            MessageBlockType::BasalScheduleExtra => BasalScheduleExtraCommand::decode(block)?.into(),
            MessageBlockType::TempBasalExtra => TempBasalExtraCommand::decode(block)?.into(),
            MessageBlockType::BolusExtra => BolusExtraCommand::decode(block)?.into(),
            MessageBlockType::SetInsulinSchedule => SetInsulinScheduleCommand::decode(block)?.into(),
            MessageBlockType::DeactivatePod => DeactivatePodCommand::decode(block)?.into(),
            MessageBlockType::StatusResponse => StatusResponse::decode(block)?.into(),
            MessageBlockType::CancelDelivery => CancelDeliveryCommand::decode(block)?.into(),
        };

        Ok((result, len))
    }
}

/// Prefix `body` with the block tag and its length byte.
pub(crate) fn frame(ty: MessageBlockType, body: &[u8]) -> PackingResult<Bytes> {
    let len = u8::try_from(body.len()).map_err(|_| PackingError::InvalidValue)?;

    let mut out = BytesMut::with_capacity(body.len() + 2);
    out.put_u8(ty.to_primitive());
    out.put_u8(len);
    out.put_slice(body);

    Ok(out.freeze())
}

/// Fail with [`MessageBlockError::NotEnoughData`] unless `block` holds at least `min` bytes.
#[inline]
pub(crate) fn require(block: &[u8], min: usize) -> Result<(), MessageBlockError> {
    if block.len() < min {
        return Err(MessageBlockError::NotEnoughData);
    }

    Ok(())
}
