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
use tap::Pipe;

use crate::{
    block::MessageBlock,
    error::MessageError,
    MessageCRC,
    WithCRC,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PackedStruct)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "6", endian = "msb")]
struct MessageHeader {
    #[packed_field(bytes = "0..=3")]
    address:          u32,
    #[packed_field(bits = "32")]
    expect_follow_on: bool,
    #[packed_field(bits = "33")]
    _reserved:        ReservedZero<packed_bits::Bits<1>>,
    #[packed_field(bits = "34..=37")]
    sequence:         Integer<u8, packed_bits::Bits<4>>,
    #[packed_field(bits = "38..=39")]
    length_hi:        Integer<u8, packed_bits::Bits<2>>,
    #[packed_field(bytes = "5")]
    length_lo:        u8,
}

impl MessageHeader {
    #[inline]
    fn body_len(&self) -> usize {
        ((*self.length_hi as usize) << 8) | self.length_lo as usize
    }
}

const HEADER_SIZE: usize = 6;
const MIN_SIZE: usize = 10;
const MAX_BODY: usize = 0x3ff;

/// Envelope grouping one or more blocks under a pod address and message sequence number,
/// protected by a trailing crc16.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub address:          u32,
    pub sequence:         u8,
    pub expect_follow_on: bool,
    pub blocks:           Vec<MessageBlock>,
}

impl Message {
    pub const SEQUENCE_MASK: u8 = 0x0f;

    #[inline]
    pub fn new(address: u32, blocks: Vec<MessageBlock>, sequence: u8) -> Self {
        Self {
            address,
            sequence: sequence & Self::SEQUENCE_MASK,
            expect_follow_on: false,
            blocks,
        }
    }

    #[tracing::instrument(skip(self), fields(address = %format_args!("{:08x}", self.address), seq = self.sequence), level = "trace", err(Display))]
    pub fn encode(&self) -> PackingResult<Bytes> {
        let mut body = BytesMut::new();
        for block in &self.blocks {
            body.put_slice(&block.encode()?);
        }

        if body.len() > MAX_BODY {
            return Err(PackingError::InvalidValue);
        }

        let header = MessageHeader {
            address:          self.address,
            expect_follow_on: self.expect_follow_on,
            _reserved:        Default::default(),
            sequence:         (self.sequence & Self::SEQUENCE_MASK).into(),
            length_hi:        ((body.len() >> 8) as u8).into(),
            length_lo:        body.len() as u8,
        };

        let mut out = BytesMut::with_capacity(HEADER_SIZE + body.len());
        out.put_slice(&header.pack()?);
        out.put_slice(&body);

        WithCRC::<_, MessageCRC>::new(out).to_bytes().pipe(Ok)
    }

    /// Decode a whole message. [`MessageError::NotEnoughData`] means `src` holds only a prefix
    /// of the message and more continuation data is expected.
    #[tracing::instrument(skip_all, fields(src = %hex::encode(src)), err(Display))]
    pub fn decode(src: &[u8]) -> Result<Self, MessageError> {
        if src.len() < MIN_SIZE {
            return Err(MessageError::NotEnoughData);
        }

        let header = MessageHeader::unpack_from_slice(&src[..HEADER_SIZE])
            .map_err(|_| MessageError::NotEnoughData)?;

        let body_len = header.body_len();
        if body_len > src.len() - 8 {
            return Err(MessageError::NotEnoughData);
        }

        let checked = WithCRC::<&[u8], MessageCRC>::verify(&src[..HEADER_SIZE + body_len + 2])?.take();
        let body = &checked[HEADER_SIZE..];

        let mut blocks = vec![];
        let mut offset = 0;

        while offset < body.len() {
            let (block, consumed) =
                MessageBlock::decode(&body[offset..]).map_err(|source| MessageError::Parsing {
                    offset: HEADER_SIZE + offset,
                    data: Bytes::copy_from_slice(&body[offset..]),
                    source,
                })?;

            tracing::trace!(offset, ty = ?block.block_type(), "decoded block");

            blocks.push(block);
            offset += consumed;
        }

        Ok(Self {
            address: header.address,
            sequence: *header.sequence,
            expect_follow_on: header.expect_follow_on,
            blocks,
        })
    }

    /// Check that this message came from `address` and answers `sequence`.
    pub fn verify(&self, address: u32, sequence: u8) -> Result<(), MessageError> {
        if self.address != address {
            return Err(MessageError::InvalidAddress(self.address));
        }

        let expected = sequence & Self::SEQUENCE_MASK;
        if self.sequence != expected {
            return Err(MessageError::InvalidSequence {
                expected,
                received: self.sequence,
            });
        }

        Ok(())
    }
}

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Message({:08x} seq:{:02}", self.address, self.sequence)?;

        if self.expect_follow_on {
            write!(f, " [follow-on]")?;
        }

        write!(f, " {:?})", self.blocks)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        block::{
            GetStatusCommand,
            MessageBlockType,
        },
        error::MessageBlockError,
        pod::{
            DeliveryStatus,
            PodProgressStatus,
            RESERVOIR_LEVEL_ABOVE_THRESHOLD,
        },
    };

    #[test]
    fn encode_get_status() -> eyre::Result<()> {
        let msg = Message::new(0x1f01482a, vec![GetStatusCommand::default().into()], 4);

        assert_eq!("1f01482a10030e0100802c", hex::encode(msg.encode()?));

        Ok(())
    }

    #[test]
    fn decode_status_response() -> eyre::Result<()> {
        let raw = hex::decode("1f00ee84300a1d18003f1800004297ff8128")?;
        let msg = Message::decode(&raw)?;

        assert_eq!(0x1f00ee84, msg.address);
        assert_eq!(12, msg.sequence);
        assert_eq!(1, msg.blocks.len());

        let status = match &msg.blocks[0] {
            MessageBlock::StatusResponse(status) => status,
            other => eyre::bail!("unexpected block {other:?}"),
        };

        assert_eq!(DeliveryStatus::ScheduledBasal, status.delivery_status);
        assert_eq!(PodProgressStatus::AboveFiftyUnits, status.pod_progress_status);
        assert!((status.insulin_delivered() - 6.3).abs() < 0.01);
        assert!((status.reservoir_level() - RESERVOIR_LEVEL_ABOVE_THRESHOLD).abs() < 0.01);
        assert_eq!(4261, status.minutes_active);
        assert_eq!(3, status.last_programming_sequence);
        assert!(status.alerts.is_empty());

        assert_eq!(raw, msg.encode()?.to_vec());

        Ok(())
    }

    #[test]
    fn multi_packet_message() -> eyre::Result<()> {
        let first = hex::decode("ffffffff041d011b13881008340a5002070002070002030000a62b00044794")?;
        assert_eq!(Err(MessageError::NotEnoughData), Message::decode(&first));

        let mut whole = first;
        whole.extend(hex::decode("1f00ee878352")?);

        let msg = Message::decode(&whole)?;
        assert_eq!(1, msg.blocks.len());
        assert_eq!(MessageBlockType::VersionResponse, msg.blocks[0].block_type());

        Ok(())
    }

    #[test]
    fn short_and_corrupt_messages() -> eyre::Result<()> {
        assert_eq!(Err(MessageError::NotEnoughData), Message::decode(&[0x1f; 9]));

        let mut raw = hex::decode("1f01482a10030e0100802c")?;
        raw[8] = 0x01;
        assert_eq!(Err(MessageError::InvalidCrc), Message::decode(&raw));

        Ok(())
    }

    #[test]
    fn unknown_block_reported_with_offset() -> eyre::Result<()> {
        let mut body = BytesMut::new();
        body.put_slice(&hex::decode("1f01482a1003ee0100")?);
        let raw = WithCRC::<_, MessageCRC>::new(body).to_bytes();

        match Message::decode(&raw) {
            Err(MessageError::Parsing {
                offset,
                source,
                ..
            }) => {
                assert_eq!(6, offset);
                assert_eq!(MessageBlockError::UnknownBlockType(0xee), source);
            },
            other => eyre::bail!("unexpected result {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn follow_on_and_sequence_bits() -> eyre::Result<()> {
        let mut msg = Message::new(0x1f01482a, vec![GetStatusCommand::default().into()], 0x1f);
        msg.expect_follow_on = true;

        let encoded = msg.encode()?;
        assert_eq!(0x80 | (0x0f << 2), encoded[4]);

        let decoded = Message::decode(&encoded)?;
        assert!(decoded.expect_follow_on);
        assert_eq!(0x0f, decoded.sequence);

        Ok(())
    }

    #[test]
    fn verify_address_and_sequence() {
        let msg = Message::new(0x1f01482a, vec![], 3);

        assert_eq!(Ok(()), msg.verify(0x1f01482a, 3));
        assert_eq!(Err(MessageError::InvalidAddress(0x1f01482a)), msg.verify(0x1f01482b, 3));
        assert_eq!(
            Err(MessageError::InvalidSequence {
                expected: 4,
                received: 3,
            }),
            msg.verify(0x1f01482a, 4)
        );
    }
}
