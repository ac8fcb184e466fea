//! Crate for talking to an eight-servo legged robot controller over a serial or UDP link.
//!
//! The robot streams inertial-measurement samples and acknowledgements; the host streams
//! servo commands and pings. Both directions use the same checksummed binary frame format,
//! implemented by two halves: a [`FrameDecoder`](decode::FrameDecoder) that recovers
//! validated [`Frame`](frame::Frame)s from an arbitrarily-chunked, possibly corrupted byte
//! stream, and a [`FrameEncoder`](encode::FrameEncoder) that serializes [`Command`]s into
//! outbound frames. Decoded payloads are classified into typed values by
//! [`payload::interpret`].
//!
//! For transports without binary support there is also a newline-delimited JSON mode in
//! [`text`]. The [`connection`] module provides the serial and UDP transport bindings and
//! the reader task that owns the decoder.

pub mod command;
pub mod crc;
pub mod decode;
pub mod encode;
pub mod frame;
pub mod payload;
pub mod text;

#[cfg(feature = "connection")]
pub mod connection;

pub use command::Command;
pub use decode::FrameDecoder;
pub use encode::{EncodeError, FrameEncoder};
pub use frame::Frame;
pub use payload::{Ack, ImuSample, Payload, ServoState};
