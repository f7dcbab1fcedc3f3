use message::{
    MessageError,
    PacketError,
    PacketType,
};
use packed_struct::PackingError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cobs frame failed to decode")]
    Cobs,

    #[error("{0:?} packet out of order")]
    UnexpectedPacket(PacketType),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error("packing: {0}")]
    Packing(#[from] PackingError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
