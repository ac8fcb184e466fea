//! The canonical wire frame shape shared by the encoder and decoder.
//!
//! # Encoding
//!
//! | Field        | Size | Description |
//! |--------------|------|-------------|
//! | `sync`       | 2    | Must be [`SYNC`] (`AA 55`). |
//! | `version`    | 1    | Protocol revision tag, currently [`VERSION`]. |
//! | `type`       | 1    | Frame category, see [`FrameType`]. |
//! | `sequence`   | 2    | Per-sender counter (LE), wraps at 65536, diagnostics only. |
//! | `length`     | 2    | Payload byte count (LE), at most [`MAX_PAYLOAD_LEN`]. |
//! | `payload`    | n    | Opaque payload bytes. |
//! | `checksum`   | 2    | CRC16 (LE) over `version` through `payload`, see [`checksum`]. |
//! | `terminator` | 1    | Must be [`TERMINATOR`] (`7E`). |

use crate::crc::LINK_CRC16;

/// Starting byte sequence of every frame.
pub const SYNC: [u8; 2] = [0xAA, 0x55];

/// Protocol revision emitted by this client.
pub const VERSION: u8 = 0x01;

/// Trailing byte closing every frame.
pub const TERMINATOR: u8 = 0x7E;

/// sync + version + type + sequence + length.
pub const HEADER_LEN: usize = 8;

/// Size of the trailing CRC16 field.
pub const CHECKSUM_LEN: usize = 2;

/// Size of the trailing terminator byte.
pub const TERMINATOR_LEN: usize = 1;

/// Smallest complete frame: the fixed header plus checksum and terminator.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + CHECKSUM_LEN + TERMINATOR_LEN;

/// Largest payload the link will carry. A `length` field above this is
/// treated as line corruption rather than a frame to wait for.
pub const MAX_PAYLOAD_LEN: usize = 2048;

/// Frame categories carried in the `type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Device telemetry: IMU block plus servo echo.
    Control,
    /// Host command, or the device's acknowledgement of one.
    Command,
    /// A category this client does not know about. Carried through, not rejected.
    Reserved(u8),
}

impl FrameType {
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::Control,
            0x02 => Self::Command,
            other => Self::Reserved(other),
        }
    }

    pub const fn into_byte(self) -> u8 {
        match self {
            Self::Control => 0x01,
            Self::Command => 0x02,
            Self::Reserved(other) => other,
        }
    }
}

/// One validated unit of the binary wire protocol.
///
/// Constructed by the decoder and consumed immediately by the payload
/// interpreter; the sync marker, length, checksum and terminator are wire-only
/// and do not survive decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub version: u8,
    pub frame_type: FrameType,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

/// Computes the wire checksum for a frame given its bytes from the sync
/// marker through the end of the payload.
///
/// The checksum covers `version` through `payload`. The two sync bytes are a
/// fixed constant and carry no information, so they are excluded; both sides
/// of the link must use this exact range or every frame is rejected. This is
/// the single definition point of that contract for the crate.
pub fn checksum(frame_through_payload: &[u8]) -> u16 {
    LINK_CRC16.checksum(&frame_through_payload[SYNC.len()..])
}
