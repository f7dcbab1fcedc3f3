//! Codec for the pod radio protocol: radio packets, message envelopes, command and response
//! blocks, and the compiler from basal schedules to the pod's delivery tables.

pub use codec;
pub use message;
pub use util::{
    self,
    build,
};
