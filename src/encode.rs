//! Serializes [`Command`]s into complete wire frames.

use thiserror::Error;

use crate::{
    command::Command,
    frame::{self, FrameType, MAX_PAYLOAD_LEN, MIN_FRAME_LEN, SYNC, TERMINATOR, VERSION},
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("servo channel {0} is out of range (0..8)")]
    InvalidChannel(u8),

    #[error("expected exactly 8 servo values, got {0}")]
    InvalidChannelCount(usize),

    #[error("payload of {0} bytes exceeds the maximum frame payload size")]
    PayloadTooLong(usize),
}

/// Builds outbound frames for [`Command`]s.
///
/// Owns the per-sender sequence counter. The counter increments before each
/// encode and wraps at 65536; sequence numbers exist for ordering diagnostics
/// only and are never matched against acknowledgements.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    sequence: u16,
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the most recently encoded frame.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Encodes `command` as one complete frame.
    ///
    /// Caller contract violations (bad channel, oversized payload) are
    /// rejected here before any bytes are produced; a frame is either fully
    /// assembled or not at all.
    pub fn encode(&mut self, command: &Command) -> Result<Vec<u8>, EncodeError> {
        let payload = command.encode_payload()?;
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(EncodeError::PayloadTooLong(payload.len()));
        }
        self.sequence = self.sequence.wrapping_add(1);

        let mut out = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
        out.extend_from_slice(&SYNC);
        out.push(VERSION);
        out.push(FrameType::Command.into_byte());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        let crc = frame::checksum(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        out.push(TERMINATOR);
        Ok(out)
    }
}
