use std::{
    fmt::{
        Debug,
        Formatter,
    },
    marker::PhantomData,
};

use bytes::{
    Bytes,
    BytesMut,
};
use smallvec::SmallVec;

use crate::{
    checksum,
    error::ChecksumError,
    Checksum,
};

/// A byte payload paired with the trailing checksum `CRC` that protects it on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WithCRC<T, CRC> {
    val:      T,
    _phantom: PhantomData<CRC>,
}

impl<T, CRC> WithCRC<T, CRC> {
    #[inline]
    pub fn new(data: T) -> Self {
        Self {
            val:      data,
            _phantom: PhantomData,
        }
    }

    #[inline]
    pub fn take(self) -> T {
        self.val
    }
}

impl<T, CRC> WithCRC<T, CRC>
where
    T: AsRef<[u8]>,
    CRC: Checksum,
{
    pub const CRC_SIZE: usize = checksum::size::<CRC>();

    #[inline]
    pub fn checksum(&self) -> SmallVec<[u8; 8]> {
        CRC::checksum_array(self.val.as_ref())
    }

    /// Payload followed by its checksum.
    pub fn to_bytes(&self) -> Bytes {
        let payload = self.val.as_ref();

        let mut out = BytesMut::with_capacity(payload.len() + Self::CRC_SIZE);
        out.extend_from_slice(payload);
        out.extend_from_slice(&self.checksum());

        out.freeze()
    }
}

impl<'a, CRC> WithCRC<&'a [u8], CRC>
where
    CRC: Checksum,
{
    /// Split `src` into payload and trailing checksum, rejecting it if the checksum does not
    /// match the payload.
    #[tracing::instrument(skip(src), fields(src.len = src.len()), level = "trace", err(Display))]
    pub fn verify(src: &'a [u8]) -> Result<Self, ChecksumError> {
        let split_point = src.len().checked_sub(Self::CRC_SIZE).ok_or(ChecksumError::TooShort)?;
        let (payload, src_checksum) = src.split_at(split_point);

        let result = Self::new(payload);
        let computed_checksum = result.checksum();

        if src_checksum != &computed_checksum[..] {
            tracing::error!(
                src_checksum = %hex::encode(src_checksum),
                computed_checksum = %hex::encode(&computed_checksum),
                "payload with invalid checksum"
            );

            return Err(ChecksumError::Mismatch {
                expected: hex::encode(src_checksum),
                computed: hex::encode(&computed_checksum),
            });
        }

        Ok(result)
    }
}

impl<T, CRC> AsRef<T> for WithCRC<T, CRC> {
    fn as_ref(&self) -> &T {
        &self.val
    }
}

impl<T, CRC> Debug for WithCRC<T, CRC>
where
    T: AsRef<[u8]>,
    CRC: Checksum,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "CRC(0x{}, 0x{})", hex::encode(self.val.as_ref()), hex::encode(self.checksum()))
    }
}
