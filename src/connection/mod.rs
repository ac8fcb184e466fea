//! Transport bindings and the reader task shared by the serial and UDP links.
//!
//! Each link follows the same shape: one spawned reader task owns the
//! transport's receive side and a [`FrameDecoder`], pushing decoded events
//! into a bounded queue; the link handle keeps the send side and the
//! [`FrameEncoder`](crate::encode::FrameEncoder). No decoder state is ever
//! shared between tasks. When the transport fails or closes, the reader task
//! ends and drops its sender — the closed event channel is the
//! connection-lost signal to the application, which decides whether to
//! reconnect.

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::encode::EncodeError;
use crate::payload::Payload;

#[cfg(feature = "serial")]
pub mod serial;
#[cfg(feature = "udp")]
pub mod udp;

/// Capacity of the decoded-event queue between the reader task and the
/// application. When the consumer falls behind, further events are dropped
/// with a warning rather than stalling the reader.
pub const EVENT_QUEUE_DEPTH: usize = 256;

/// Protocol selection for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolMode {
    /// Checksummed binary frames.
    #[default]
    Binary,
    /// Newline-delimited JSON.
    Text,
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Pushes one decoded payload toward the consumer.
///
/// Malformed payloads are dropped here; decode continues regardless. Returns
/// `false` once the consumer is gone, telling the reader loop to stop.
pub(crate) fn deliver(events: &mpsc::Sender<Payload>, payload: Payload) -> bool {
    if matches!(payload, Payload::Malformed) {
        debug!("dropping malformed payload");
        return true;
    }
    match events.try_send(payload) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("event queue full, dropping decoded event");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(feature = "serial")]
pub(crate) use stream_readers::{run_binary_reader, run_text_reader};

#[cfg(feature = "serial")]
mod stream_readers {
    use log::{debug, error};
    use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
    use tokio::sync::mpsc;

    use super::deliver;
    use crate::decode::FrameDecoder;
    use crate::payload::{self, Payload};
    use crate::text;

    /// Reads binary frames from a byte stream until it ends or errors.
    pub(crate) async fn run_binary_reader<R>(mut reader: R, events: mpsc::Sender<Payload>)
    where
        R: AsyncRead + Unpin,
    {
        let mut decoder = FrameDecoder::new();
        let mut chunk = [0u8; 1024];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => {
                    debug!("transport closed");
                    break;
                }
                Ok(n) => {
                    for frame in decoder.feed(&chunk[..n]) {
                        if !deliver(&events, payload::interpret(&frame)) {
                            return;
                        }
                    }
                }
                Err(e) => {
                    error!("transport read failed: {e}");
                    break;
                }
            }
        }
    }

    /// Reads newline-delimited JSON from a byte stream until it ends or errors.
    pub(crate) async fn run_text_reader<R>(reader: R, events: mpsc::Sender<Payload>)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => {
                    debug!("transport closed");
                    break;
                }
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    if text.trim().is_empty() {
                        continue;
                    }
                    if !deliver(&events, text::decode_line(&text)) {
                        return;
                    }
                }
                Err(e) => {
                    error!("transport read failed: {e}");
                    break;
                }
            }
        }
    }
}
