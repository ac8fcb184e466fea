//! Incremental frame decoder with byte-at-a-time resynchronization.

use bytes::{Buf, BytesMut};
use log::{debug, trace};
use thiserror::Error;

use crate::frame::{
    self, Frame, FrameType, HEADER_LEN, MAX_PAYLOAD_LEN, MIN_FRAME_LEN, SYNC, TERMINATOR,
};

/// Why a frame candidate was rejected.
///
/// Every variant is recovered from by discarding a single leading byte and
/// rescanning; none of them terminate decoding or surface to the consumer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRejection {
    #[error("leading bytes do not match the sync marker")]
    SyncLost,

    #[error("checksum mismatch: frame carried {found:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { found: u16, computed: u16 },

    #[error("claimed payload length {0} exceeds the maximum")]
    ImplausibleLength(u16),

    #[error("terminator byte was {0:#04x}, expected 0x7E")]
    BadTerminator(u8),
}

/// Outcome of one extraction attempt against the front of the buffer.
enum Scan {
    /// A complete, validated frame of this many total bytes.
    Frame(Frame, usize),
    /// The leading byte cannot start a valid frame; skip it and rescan.
    Reject(FrameRejection),
    /// Not enough bytes buffered to decide; wait for the next feed.
    Incomplete,
}

/// Recovers validated [`Frame`]s from a raw byte stream fed in arbitrary
/// chunks.
///
/// The decoder carries unconsumed bytes between [`feed`](Self::feed) calls in
/// an index-tracked buffer, so resynchronizing over long corrupted runs never
/// re-copies the tail. One decoder instance belongs to exactly one stream;
/// it is not shared across tasks.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Number of unconsumed bytes carried over for the next feed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Appends `chunk` to the internal buffer and extracts every complete,
    /// validated frame now available.
    ///
    /// Corruption is skipped one byte at a time: a corrupted length field
    /// cannot be trusted, so recovery never jumps by the claimed frame size.
    /// The incomplete tail (if any) is retained for the next call. No frame
    /// is emitted twice and no byte is consumed twice.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            match self.scan() {
                Scan::Frame(frame, consumed) => {
                    self.buf.advance(consumed);
                    frames.push(frame);
                }
                Scan::Reject(rejection) => {
                    if rejection != FrameRejection::SyncLost {
                        debug!("resynchronizing past rejected frame candidate: {rejection}");
                    }
                    self.buf.advance(1);
                }
                Scan::Incomplete => break,
            }
        }
        frames
    }

    /// Attempts to read one frame from the front of the buffer without
    /// consuming anything.
    fn scan(&self) -> Scan {
        let buf = &self.buf[..];
        if buf.is_empty() {
            return Scan::Incomplete;
        }
        if buf[0] != SYNC[0] {
            return Scan::Reject(FrameRejection::SyncLost);
        }
        if buf.len() < SYNC.len() {
            return Scan::Incomplete;
        }
        if buf[1] != SYNC[1] {
            return Scan::Reject(FrameRejection::SyncLost);
        }
        if buf.len() < HEADER_LEN {
            return Scan::Incomplete;
        }

        let length = u16::from_le_bytes([buf[6], buf[7]]);
        if usize::from(length) > MAX_PAYLOAD_LEN {
            // Waiting on an absurd length would stall resynchronization
            // forever; treat it as corruption immediately.
            return Scan::Reject(FrameRejection::ImplausibleLength(length));
        }
        let total = MIN_FRAME_LEN + usize::from(length);
        if buf.len() < total {
            return Scan::Incomplete;
        }

        let crc_offset = HEADER_LEN + usize::from(length);
        let found = u16::from_le_bytes([buf[crc_offset], buf[crc_offset + 1]]);
        let computed = frame::checksum(&buf[..crc_offset]);
        if found != computed {
            return Scan::Reject(FrameRejection::ChecksumMismatch { found, computed });
        }
        let terminator = buf[total - 1];
        if terminator != TERMINATOR {
            return Scan::Reject(FrameRejection::BadTerminator(terminator));
        }

        let frame = Frame {
            version: buf[2],
            frame_type: FrameType::from_byte(buf[3]),
            sequence: u16::from_le_bytes([buf[4], buf[5]]),
            payload: buf[HEADER_LEN..crc_offset].to_vec(),
        };
        trace!(
            "decoded frame: type={:?} seq={} len={}",
            frame.frame_type,
            frame.sequence,
            length
        );
        Scan::Frame(frame, total)
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::encode::FrameEncoder;

    fn frame_bytes(command: &Command) -> Vec<u8> {
        FrameEncoder::new().encode(command).unwrap()
    }

    #[test]
    fn single_chunk_single_frame() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&frame_bytes(&Command::Ping));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x04]);
        assert_eq!(frames[0].sequence, 1);
        assert_eq!(frames[0].frame_type, FrameType::Command);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn two_frames_in_one_chunk_stay_ordered() {
        let mut encoder = FrameEncoder::new();
        let mut stream = encoder.encode(&Command::Ping).unwrap();
        stream.extend_from_slice(
            &encoder
                .encode(&Command::SetServo {
                    channel: 3,
                    value: 1500,
                })
                .unwrap(),
        );

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].sequence, 1);
        assert_eq!(frames[0].payload, [0x04]);
        assert_eq!(frames[1].sequence, 2);
        assert_eq!(frames[1].payload, [0x01, 0x03, 0xDC, 0x05]);
    }

    #[test]
    fn resynchronizes_across_garbage() {
        let first = frame_bytes(&Command::Ping);
        let second = frame_bytes(&Command::SetServo {
            channel: 3,
            value: 1500,
        });

        let mut stream = vec![0x13, 0x37, 0x00, 0x55];
        stream.extend_from_slice(&first);
        stream.extend_from_slice(&[0x7E, 0x01, 0x02]);
        stream.extend_from_slice(&second);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&stream);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload, [0x04]);
        assert_eq!(frames[1].payload, [0x01, 0x03, 0xDC, 0x05]);
    }

    #[test]
    fn arbitrary_chunking_is_equivalent_to_one_chunk() {
        let bytes = frame_bytes(&Command::SetServo {
            channel: 3,
            value: 1500,
        });

        for split in 1..bytes.len() {
            let mut decoder = FrameDecoder::new();
            let mut frames = decoder.feed(&bytes[..split]);
            assert!(frames.is_empty(), "no frame before the stream completes");
            frames.extend(decoder.feed(&bytes[split..]));
            assert_eq!(frames.len(), 1, "split at {split}");
            assert_eq!(frames[0].payload, [0x01, 0x03, 0xDC, 0x05]);
            assert_eq!(decoder.pending(), 0);
        }
    }

    #[test]
    fn byte_at_a_time_feed() {
        let bytes = frame_bytes(&Command::Ping);
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for byte in &bytes {
            frames.extend(decoder.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x04]);
    }

    #[test]
    fn corrupted_frame_does_not_swallow_the_next() {
        let mut corrupted = frame_bytes(&Command::Ping);
        // Flip a payload byte and leave the checksum stale.
        corrupted[8] ^= 0x01;
        let valid = frame_bytes(&Command::SetServo {
            channel: 3,
            value: 1500,
        });

        let mut stream = corrupted;
        stream.extend_from_slice(&valid);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x01, 0x03, 0xDC, 0x05]);
    }

    #[test]
    fn implausible_length_never_stalls_resync() {
        // A header claiming a 0xFFFF-byte payload that will never arrive.
        let mut stream = vec![0xAA, 0x55, 0x01, 0x01, 0x00, 0x00, 0xFF, 0xFF];
        stream.extend_from_slice(&frame_bytes(&Command::Ping));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&stream);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x04]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn bad_terminator_rejected_and_recovered() {
        let mut broken = frame_bytes(&Command::Ping);
        let last = broken.len() - 1;
        broken[last] = 0x00;
        broken.extend_from_slice(&frame_bytes(&Command::Reset));

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&broken);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x03]);
    }

    #[test]
    fn incomplete_tail_is_retained_not_dropped() {
        let bytes = frame_bytes(&Command::Ping);
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&bytes[..5]).is_empty());
        assert_eq!(decoder.pending(), 5);
        let frames = decoder.feed(&bytes[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn no_frame_is_emitted_twice() {
        let bytes = frame_bytes(&Command::Ping);
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.feed(&bytes).len(), 1);
        assert!(decoder.feed(&[]).is_empty());
    }

    #[test]
    fn sync_bytes_inside_payload_do_not_confuse_extraction() {
        // A payload whose value bytes happen to spell the sync marker.
        let bytes = frame_bytes(&Command::SetServo {
            channel: 0,
            value: 0x55AA,
        });
        assert_eq!(&bytes[10..12], &[0xAA, 0x55]);

        let mut decoder = FrameDecoder::new();
        let frames = decoder.feed(&bytes);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload, [0x01, 0x00, 0xAA, 0x55]);
    }
}
