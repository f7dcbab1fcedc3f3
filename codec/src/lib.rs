//! Byte-stream codecs for carrying radio packets over a serial bridge and assembling the
//! messages they carry.

pub use ::tokio_util::codec as tokio_codec;

mod assembler;
mod cobs;
mod error;
mod message;
mod packet;

pub use self::{
    assembler::MessageAssembler,
    cobs::CobsCodec,
    error::Error,
    message::MessageCodec,
    packet::PacketCodec,
};
