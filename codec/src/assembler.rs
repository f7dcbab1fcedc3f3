use message::{
    reassemble,
    Message,
    MessageError,
    PacketType,
    RadioPacket,
};

use crate::Error;

/// Collects the packets of one message in arrival order.
///
/// A message opens with a PDM or POD packet and continues with CON packets until its envelope
/// decodes. Out-of-order packets and envelopes that fail for any reason other than running short
/// reset the assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageAssembler {
    packets: Vec<RadioPacket>,
}

impl MessageAssembler {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.packets.clear();
    }

    #[tracing::instrument(skip_all, fields(packet = %packet), level = "debug", err(Display))]
    pub fn push(&mut self, packet: RadioPacket) -> Result<Option<Message>, Error> {
        let in_order = match packet.packet_type {
            PacketType::Pdm | PacketType::Pod => self.is_empty(),
            PacketType::Con => !self.is_empty(),
            PacketType::Ack => false,
        };

        if !in_order {
            self.reset();
            return Err(Error::UnexpectedPacket(packet.packet_type));
        }

        self.packets.push(packet);

        match Message::decode(&reassemble(&self.packets)) {
            Ok(msg) => {
                self.reset();
                Ok(Some(msg))
            },
            Err(MessageError::NotEnoughData) => {
                tracing::debug!(packets = self.packets.len(), "waiting for continuation");
                Ok(None)
            },
            Err(e) => {
                self.reset();
                Err(e.into())
            },
        }
    }
}
