//! Wire model of the pod radio protocol: radio packets, the messages reassembled from them,
//! the command and response blocks inside messages, and the compiler that turns insulin
//! schedules into the pod's delivery tables.

pub mod block;
pub mod checksum;
pub mod crc;
pub mod error;
mod message;
mod packet;
pub mod pod;
pub mod schedule;

pub use block::{
    MessageBlock,
    MessageBlockType,
};
pub use checksum::{
    Checksum,
    MessageCRC,
    PacketCRC,
};
pub use error::{
    MessageBlockError,
    MessageError,
    PacketError,
    ScheduleError,
};
pub use message::Message;
pub use packet::{
    fragment,
    reassemble,
    PacketType,
    RadioPacket,
};
pub use schedule::{
    BasalSchedule,
    BasalScheduleEntry,
};

pub type WithCRC<T, CRC = MessageCRC> = crc::WithCRC<T, CRC>;
