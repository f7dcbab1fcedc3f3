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
        BeepType,
        MessageBlockType,
    },
    error::MessageBlockError,
};

/// Which deliveries a [`CancelDeliveryCommand`] stops. The wire value is a bitset of
/// basal (1), temp basal (2) and bolus (4); only the combinations below are issued.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u8, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
#[serde(rename_all = "kebab-case")]
pub enum CancelDeliveryType {
    Basal       = 0b001,
    TempBasal   = 0b010,
    Bolus       = 0b100,
    AllButBasal = 0b110,
    All         = 0b111,
}

impl std::str::FromStr for CancelDeliveryType {
    type Err = MessageBlockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "basal" => Self::Basal,
            "temp-basal" | "temp" => Self::TempBasal,
            "bolus" => Self::Bolus,
            "all-but-basal" => Self::AllButBasal,
            "all" => Self::All,
            _ => {
                return Err(MessageBlockError::ValidationFailed(format!(
                    "unknown delivery type '{s}'"
                )))
            },
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CancelDeliveryCommand {
    pub nonce:         u32,
    pub delivery_type: CancelDeliveryType,
    pub beep_type:     BeepType,
}

impl CancelDeliveryCommand {
    const LEN: usize = 7;

    #[inline]
    pub fn new(nonce: u32, delivery_type: CancelDeliveryType, beep_type: BeepType) -> Self {
        Self {
            nonce,
            delivery_type,
            beep_type,
        }
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = [0u8; 5];
        BigEndian::write_u32(&mut body[..4], self.nonce);
        body[4] = (self.beep_type.to_primitive() << 4) | self.delivery_type.to_primitive();

        frame(MessageBlockType::CancelDelivery, &body)
    }

    pub fn decode(block: &[u8]) -> Result<Self, MessageBlockError> {
        require(block, Self::LEN)?;

        let flags = block[6];
        let delivery = flags & 0x0f;

        Ok(Self {
            nonce:         BigEndian::read_u32(&block[2..6]),
            delivery_type: CancelDeliveryType::from_primitive(delivery)
                .ok_or_else(|| MessageBlockError::unknown(delivery, "CancelDeliveryType"))?,
            beep_type:     BeepType::decode(flags >> 4)?,
        })
    }
}
