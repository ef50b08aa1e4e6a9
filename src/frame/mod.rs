//! Typed protocol frames and the length-delimited envelope they're
//! serialized into.

mod envelope;
mod frame;

pub use envelope::{consume_frames, decode, encode};
pub use frame::{
    CapabilitiesPayload, Frame, HelloAckPayload, HelloPayload, MetadataPayload, VerifyPayload,
};
