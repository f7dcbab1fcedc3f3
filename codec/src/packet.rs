use bytes::BytesMut;
use message::RadioPacket;
use tokio_util::codec::{
    Decoder,
    Encoder,
};

use crate::{
    CobsCodec,
    Error,
};

/// Radio packets carried one per COBS frame.
///
/// Frames that fail their CRC or carry an unknown packet type are logged and dropped rather than
/// terminating the stream: the radio bridge forwards whatever it hears.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct PacketCodec {
    frames: CobsCodec,
}

impl Encoder<&RadioPacket> for PacketCodec {
    type Error = Error;

    fn encode(&mut self, packet: &RadioPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        tracing::trace!(%packet, "encoding");

        let bytes = packet.encode()?;
        self.frames.encode(bytes, dst)
    }
}

impl Encoder<RadioPacket> for PacketCodec {
    type Error = Error;

    #[inline]
    fn encode(&mut self, packet: RadioPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        Encoder::<&RadioPacket>::encode(self, &packet, dst)
    }
}

impl Decoder for PacketCodec {
    type Error = Error;
    type Item = RadioPacket;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(frame) = self.frames.decode(src)? {
            match RadioPacket::decode(&frame) {
                Ok(packet) => {
                    tracing::trace!(%packet, "decoded");
                    return Ok(Some(packet));
                },
                Err(e) => {
                    tracing::warn!(error = %e, frame = %hex::encode(&frame), "dropping radio packet");
                },
            }
        }

        Ok(None)
    }
}
