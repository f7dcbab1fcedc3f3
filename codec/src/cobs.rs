use bytes::{
    Buf,
    Bytes,
    BytesMut,
};
use tokio_util::codec::{
    Decoder,
    Encoder,
};

use crate::Error;

const DELIMITER: u8 = 0;

/// Zero-delimited COBS framing: every encoded frame is followed by a single `0x00`.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
pub struct CobsCodec;

impl<T> Encoder<T> for CobsCodec
where
    T: AsRef<[u8]>,
{
    type Error = Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let item = item.as_ref();

        let old_len = dst.len();
        dst.resize(old_len + cobs::max_encoding_length(item.len()), 0);

        let count = cobs::encode(item, &mut dst[old_len..]);
        dst.truncate(old_len + count);
        dst.extend_from_slice(&[DELIMITER]);

        Ok(())
    }
}

impl Decoder for CobsCodec {
    type Error = Error;
    type Item = Bytes;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let end = match src.iter().position(|&b| b == DELIMITER) {
                Some(end) => end,
                None => return Ok(None),
            };

            let frame = src.split_to(end);
            src.advance(1);

            // back-to-back delimiters carry nothing
            if frame.is_empty() {
                continue;
            }

            let decoded = cobs::decode_vec(&frame).map_err(|_| {
                tracing::warn!(frame = %hex::encode(&frame), "bad cobs frame");
                Error::Cobs
            })?;

            return Ok(Some(decoded.into()));
        }
    }
}
