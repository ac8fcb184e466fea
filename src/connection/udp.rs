//! UDP link to the robot.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, trace};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{deliver, ConnectionError, EVENT_QUEUE_DEPTH};
use crate::{
    command::Command,
    decode::FrameDecoder,
    encode::FrameEncoder,
    frame::SYNC,
    payload::{self, Payload},
};

/// UDP port the robot listens on.
pub const DEVICE_PORT: u16 = 12345;

/// Local port the robot streams telemetry back to.
pub const LOCAL_PORT: u16 = 12346;

/// Builds the simplified fixed-size pose datagram: the sync marker followed
/// by eight little-endian servo angles, no checksum. This is the firmware's
/// plainest control path, for callers that only steer servos.
pub fn pose_datagram(values: &[u16; 8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SYNC.len() + 16);
    buf.extend_from_slice(&SYNC);
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
    buf
}

/// An open UDP link to the robot.
///
/// Commands go out as canonical checksummed frames; telemetry datagrams are
/// run through the same [`FrameDecoder`] as the serial link. As with serial,
/// [`recv`](Self::recv) returning `None` means the link was lost.
#[derive(Debug)]
pub struct UdpLink {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    encoder: FrameEncoder,
    events: mpsc::Receiver<Payload>,
    reader: JoinHandle<()>,
}

impl UdpLink {
    /// Binds [`LOCAL_PORT`] and spawns the datagram reader task.
    pub async fn connect(target: SocketAddr) -> Result<Self, ConnectionError> {
        Self::bind(("0.0.0.0", LOCAL_PORT), target).await
    }

    /// Binds a specific local address instead of the default port.
    pub async fn bind(
        local: impl tokio::net::ToSocketAddrs,
        target: SocketAddr,
    ) -> Result<Self, ConnectionError> {
        let socket = Arc::new(UdpSocket::bind(local).await?);
        debug!(
            "udp link bound on {}, target {target}",
            socket.local_addr()?
        );

        let (tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let reader = tokio::spawn(run_datagram_reader(Arc::clone(&socket), tx));

        Ok(Self {
            socket,
            target,
            encoder: FrameEncoder::new(),
            events,
            reader,
        })
    }

    /// Serializes `command` as one canonical frame and sends it.
    pub async fn send(&mut self, command: &Command) -> Result<(), ConnectionError> {
        let bytes = self.encoder.encode(command)?;
        trace!("sending {} bytes to {}", bytes.len(), self.target);
        self.socket.send_to(&bytes, self.target).await?;
        Ok(())
    }

    /// Sends the simplified pose frame.
    pub async fn send_pose(&self, values: &[u16; 8]) -> Result<(), ConnectionError> {
        self.socket
            .send_to(&pose_datagram(values), self.target)
            .await?;
        Ok(())
    }

    /// Receives the next decoded event, or `None` once the link is lost.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.events.recv().await
    }
}

async fn run_datagram_reader(socket: Arc<UdpSocket>, events: mpsc::Sender<Payload>) {
    let mut decoder = FrameDecoder::new();
    let mut chunk = [0u8; 2048];
    loop {
        match socket.recv_from(&mut chunk).await {
            Ok((n, _)) => {
                for frame in decoder.feed(&chunk[..n]) {
                    if !deliver(&events, payload::interpret(&frame)) {
                        return;
                    }
                }
            }
            Err(e) => {
                error!("udp receive failed: {e}");
                break;
            }
        }
    }
}

impl Drop for UdpLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
