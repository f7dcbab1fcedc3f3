use bytes::BytesMut;
use message::{
    fragment,
    Message,
    RadioPacket,
};
use tokio_util::codec::{
    Decoder,
    Encoder,
};

use crate::{
    Error,
    MessageAssembler,
    PacketCodec,
};

/// Messages over a COBS-framed packet stream.
///
/// Outbound messages are fragmented into radio packets numbered from a rolling packet sequence.
/// Inbound packets are reassembled into messages.
#[derive(Debug, Clone, Default)]
pub struct MessageCodec {
    packets:       PacketCodec,
    assembler:     MessageAssembler,
    next_sequence: u8,
}

impl MessageCodec {
    #[inline]
    pub fn new(packet_sequence: u8) -> Self {
        Self {
            next_sequence: packet_sequence & RadioPacket::SEQUENCE_MASK,
            ..Default::default()
        }
    }

    /// Sequence number the next outbound packet will carry.
    #[inline]
    pub fn packet_sequence(&self) -> u8 {
        self.next_sequence
    }
}

impl Encoder<&Message> for MessageCodec {
    type Error = Error;

    fn encode(&mut self, msg: &Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = msg.encode()?;
        let packets = fragment(msg.address, &payload, self.next_sequence);

        tracing::debug!(%msg, packets = packets.len(), "fragmented");

        for packet in &packets {
            self.packets.encode(packet, dst)?;
        }

        self.next_sequence =
            self.next_sequence.wrapping_add(packets.len() as u8) & RadioPacket::SEQUENCE_MASK;

        Ok(())
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = Error;

    #[inline]
    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&Message>::encode(self, &msg, dst)
    }
}

impl Decoder for MessageCodec {
    type Error = Error;
    type Item = Message;

    /// Packets the assembler rejects are dropped with the partial message they interrupted, so
    /// one stray packet never ends the stream.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(packet) = self.packets.decode(src)? {
            match self.assembler.push(packet) {
                Ok(Some(msg)) => return Ok(Some(msg)),
                Ok(None) => {},
                Err(e) => tracing::warn!(error = %e, "dropping partial message"),
            }
        }

        Ok(None)
    }
}
