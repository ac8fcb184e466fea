//! Serial link to the robot controller.

use std::time::Duration;

use log::{debug, trace};
use tokio::io::{split, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::SerialStream;

use super::{
    run_binary_reader, run_text_reader, ConnectionError, ProtocolMode, EVENT_QUEUE_DEPTH,
};
use crate::{command::Command, encode::FrameEncoder, payload::Payload, text};

/// Default baud rate of the robot's UART link.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial link settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM8`.
    pub path: String,
    pub baud: u32,
    pub mode: ProtocolMode,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud: DEFAULT_BAUD,
            mode: ProtocolMode::Binary,
        }
    }

    pub fn baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn mode(mut self, mode: ProtocolMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Lists the names of serial ports that could host a robot link.
pub fn available_ports() -> Result<Vec<String>, ConnectionError> {
    Ok(tokio_serial::available_ports()?
        .into_iter()
        .map(|port| port.port_name)
        .collect())
}

/// An open serial link to the robot.
///
/// The spawned reader task owns the port's read half and the frame decoder;
/// the handle keeps the write half and the sequence counter, so commands may
/// be sent from whichever task holds the handle. [`recv`](Self::recv)
/// returning `None` means the link was lost.
#[derive(Debug)]
pub struct SerialLink {
    writer: WriteHalf<SerialStream>,
    encoder: FrameEncoder,
    mode: ProtocolMode,
    events: mpsc::Receiver<Payload>,
    reader: JoinHandle<()>,
}

impl SerialLink {
    /// Opens the port (8N1) and spawns the reader task.
    pub fn open(config: &SerialConfig) -> Result<Self, ConnectionError> {
        let stream = SerialStream::open(
            &tokio_serial::new(&config.path, config.baud)
                .parity(tokio_serial::Parity::None)
                .stop_bits(tokio_serial::StopBits::One)
                .timeout(Duration::from_millis(50)),
        )?;
        debug!(
            "serial link open: {} @ {} ({:?})",
            config.path, config.baud, config.mode
        );

        let (read_half, writer) = split(stream);
        let (tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let reader = match config.mode {
            ProtocolMode::Binary => tokio::spawn(run_binary_reader(read_half, tx)),
            ProtocolMode::Text => tokio::spawn(run_text_reader(read_half, tx)),
        };

        Ok(Self {
            writer,
            encoder: FrameEncoder::new(),
            mode: config.mode,
            events,
            reader,
        })
    }

    /// Serializes `command` for the link's protocol mode and writes it out.
    pub async fn send(&mut self, command: &Command) -> Result<(), ConnectionError> {
        let bytes = match self.mode {
            ProtocolMode::Binary => self.encoder.encode(command)?,
            ProtocolMode::Text => {
                let mut line = text::encode_line(command).into_bytes();
                line.push(b'\n');
                line
            }
        };
        trace!("sending {} bytes: {:x?}", bytes.len(), bytes);
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receives the next decoded event, or `None` once the link is lost.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.events.recv().await
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        // Unblocks the pending read and ends the reader loop.
        self.reader.abort();
    }
}
