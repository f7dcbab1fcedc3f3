pub trait Checksum {
    type Output: num_traits::PrimInt;

    fn checksum(vals: &[u8]) -> Self::Output;
    fn checksum_array(vals: &[u8]) -> smallvec::SmallVec<[u8; 8]>;
}

#[inline]
pub const fn size<T>() -> usize
where
    T: Checksum,
{
    std::mem::size_of::<T::Output>()
}

#[macro_export]
macro_rules! impl_checksum {
    (@impl $vis:vis $name:ident, $ty:ty, $vals:ident, $checksum_body:block, $array_body:block) => {
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        $vis struct $name;

        impl $crate::checksum::Checksum for $name {
            type Output = $ty;

            #[inline]
            fn checksum($vals: &[u8]) -> Self::Output $checksum_body

            fn checksum_array($vals: &[u8]) -> ::smallvec::SmallVec<[u8; 8]> $array_body
        }
    };

    (@endian $vis:vis $name:ident, $ty:ty, $endian:ty, $vals:ident, $checksum_body:block) => {
        $crate::impl_checksum!(@impl $vis $name, $ty, $vals, $checksum_body, {
            ::paste::paste! {
                let mut ret = ::smallvec::smallvec![0u8; ::std::mem::size_of::<$ty>()];

                <$endian as ::byteorder::ByteOrder>::[< write_ $ty >](&mut ret[..], Self::checksum($vals));
                ret
            }
        });
    };

    ($vis:vis $name:ident, $ty:ty, fn $func:path) => {
        $crate::impl_checksum!(@endian $vis $name, $ty, ::byteorder::BE, vals, { $func(vals) });
    };

    ($vis:vis $name:ident, u8, $algo:expr) => {
        $crate::impl_checksum!(@impl $vis $name, u8, vals, {
            const INSTANCE: ::crc::Crc<u8> = ::crc::Crc::<u8>::new(&$algo);

            INSTANCE.checksum(vals)
        }, {
            let mut ret = ::smallvec::SmallVec::new();
            ret.push(Self::checksum(vals));

            ret
        });
    };

    ($vis:vis $name:ident, $ty:ty, $algo:expr) => {
        $crate::impl_checksum!($vis $name, $ty, $algo, ::byteorder::BE);
    };

    ($vis:vis $name:ident, $ty:ty, $algo:expr, $endian:ty) => {
        $crate::impl_checksum!(@endian $vis $name, $ty, $endian, vals, {
            const INSTANCE: ::crc::Crc<$ty> = ::crc::Crc::<$ty>::new(&$algo);

            INSTANCE.checksum(vals)
        });
    };
}

pub use impl_checksum;

/// CRC-16 with polynomial 0x8005 and a zero initial value, fed least-significant byte first
/// through an MSB-first table. This is the trailer on every [`crate::Message`].
pub const fn crc16(data: &[u8]) -> u16 {
    let mut acc = 0u16;
    let mut i = 0;

    while i < data.len() {
        acc = (acc >> 8) ^ CRC16_TABLE[((acc ^ data[i] as u16) & 0xff) as usize];
        i += 1;
    }

    acc
}

const CRC16_POLY: u16 = 0x8005;

const CRC16_TABLE: [u16; 256] = {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;

        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };

            bit += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
};

impl_checksum!(pub MessageCRC, u16, fn crc16);
impl_checksum!(pub PacketCRC, u8, ::crc::CRC_8_SMBUS);
