use std::fmt::{
    Display,
    Formatter,
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
    error::PacketError,
    PacketCRC,
    WithCRC,
};

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PrimitiveEnum_u8, serde::Serialize, serde::Deserialize,
)]
#[repr(u8)]
pub enum PacketType {
    Ack = 0b010,
    Con = 0b100,
    Pdm = 0b101,
    Pod = 0b111,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "5", endian = "msb")]
struct PacketHeader {
    #[packed_field(bytes = "0..=3")]
    address:     u32,
    #[packed_field(bits = "32..=34")]
    packet_type: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "35..=39")]
    sequence:    Integer<u8, packed_bits::Bits<5>>,
}

const HEADER_SIZE: usize = 5;

/// One physical radio packet: `address | type/sequence | data | crc8`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RadioPacket {
    pub address:     u32,
    pub packet_type: PacketType,
    pub sequence:    u8,
    pub data:        Bytes,
}

impl RadioPacket {
    pub const MAX_DATA: usize = 31;
    pub const SEQUENCE_MASK: u8 = 0x1f;

    /// Build a packet carrying at most [`Self::MAX_DATA`] bytes of `data`; anything past that
    /// is left for a continuation packet.
    pub fn new(address: u32, packet_type: PacketType, sequence: u8, data: impl AsRef<[u8]>) -> Self {
        let data = data.as_ref();
        let len = data.len().min(Self::MAX_DATA);

        Self {
            address,
            packet_type,
            sequence: sequence & Self::SEQUENCE_MASK,
            data: Bytes::copy_from_slice(&data[..len]),
        }
    }

    #[inline]
    pub fn ack(address: u32, ack_address: u32, sequence: u8) -> Self {
        Self::new(address, PacketType::Ack, sequence, ack_address.to_be_bytes())
    }

    pub fn encode(&self) -> PackingResult<Bytes> {
        let header = PacketHeader {
            address:     self.address,
            packet_type: self.packet_type.to_primitive().into(),
            sequence:    (self.sequence & Self::SEQUENCE_MASK).into(),
        };

        let mut body = BytesMut::with_capacity(HEADER_SIZE + self.data.len());
        body.put_slice(&header.pack()?);
        body.put_slice(&self.data);

        Ok(WithCRC::<_, PacketCRC>::new(body).to_bytes())
    }

    #[tracing::instrument(skip_all, fields(src = %hex::encode(src)), level = "trace", err(Display))]
    pub fn decode(src: &[u8]) -> Result<Self, PacketError> {
        if src.len() < HEADER_SIZE + WithCRC::<&[u8], PacketCRC>::CRC_SIZE {
            return Err(PacketError::InsufficientData);
        }

        let body = WithCRC::<&[u8], PacketCRC>::verify(src)?.take();
        let (header, data) = body.split_at(HEADER_SIZE);

        let header =
            PacketHeader::unpack_from_slice(header).map_err(|_| PacketError::InsufficientData)?;

        let type_bits = *header.packet_type;
        let packet_type =
            PacketType::from_primitive(type_bits).ok_or(PacketError::UnknownPacketType(type_bits))?;

        Ok(Self {
            address: header.address,
            packet_type,
            sequence: *header.sequence,
            data: Bytes::copy_from_slice(data),
        })
    }
}

impl Display for RadioPacket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Packet({:08x} {:?} seq:{} data:{})",
            self.address,
            self.packet_type,
            self.sequence,
            hex::encode(&self.data)
        )
    }
}

/// Split an encoded message into a leading PDM packet followed by as many CON packets as the
/// payload needs, numbering them consecutively from `first_sequence`.
pub fn fragment(address: u32, payload: &[u8], first_sequence: u8) -> Vec<RadioPacket> {
    if payload.is_empty() {
        return vec![RadioPacket::new(address, PacketType::Pdm, first_sequence, payload)];
    }

    payload
        .chunks(RadioPacket::MAX_DATA)
        .enumerate()
        .map(|(i, chunk)| {
            let packet_type = match i {
                0 => PacketType::Pdm,
                _ => PacketType::Con,
            };

            RadioPacket::new(address, packet_type, first_sequence.wrapping_add(i as u8), chunk)
        })
        .collect()
}

/// Concatenate packet data in arrival order.
pub fn reassemble<'a>(packets: impl IntoIterator<Item = &'a RadioPacket>) -> Bytes {
    packets
        .into_iter()
        .fold(BytesMut::new(), |mut acc, packet| {
            acc.extend_from_slice(&packet.data);
            acc
        })
        .freeze()
}
