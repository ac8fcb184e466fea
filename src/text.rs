//! Newline-delimited JSON fallback protocol.
//!
//! A degraded mode for transports without binary support: one UTF-8 JSON
//! object per line, no sync marker, no checksum. Every command and report
//! maps 1:1 to an object with a `cmd` or `resp` discriminator key.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::payload::{Ack, ImuSample, Payload, ServoState};

/// A host-to-device command in text mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum TextCommand {
    Ping,
    Set { id: u8, val: u16 },
    SetAll { vals: [u16; 8] },
    /// Per-channel trim offsets; only exists in the text vocabulary.
    Offset { off: [u16; 8] },
    Reset,
}

/// A device-to-host report in text mode. All fields are optional: the device
/// mixes telemetry and acknowledgements freely and may add keys this client
/// does not know about.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextReport {
    pub seq: Option<u16>,
    pub imu: Option<ImuRecord>,
    pub pos: Option<Vec<u16>>,
    pub off: Option<Vec<u16>>,
    pub resp: Option<String>,
    pub millis: Option<u64>,
}

/// JSON shape of the IMU block inside a [`TextReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ImuRecord {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub temp: f32,
}

/// Renders a command as one line of text-mode output, without the newline.
///
/// [`Command::Raw`] text is passed through verbatim so callers can reach
/// device vocabulary this client has no structured mapping for.
pub fn encode_line(command: &Command) -> String {
    let text_command = match command {
        Command::Ping => TextCommand::Ping,
        Command::SetServo { channel, value } => TextCommand::Set {
            id: *channel,
            val: *value,
        },
        Command::SetAllServos { values } => TextCommand::SetAll { vals: *values },
        Command::Reset => TextCommand::Reset,
        Command::Raw { text } => return text.clone(),
    };
    serde_json::to_string(&text_command).expect("text command serialization is infallible")
}

/// Parses one received line into the same closed set of outcomes the binary
/// interpreter produces. Unparseable lines surface as raw text for the
/// diagnostics channel.
pub fn decode_line(line: &str) -> Payload {
    let line = line.trim();
    match serde_json::from_str::<TextReport>(line) {
        Ok(report) => into_payload(report, line),
        Err(_) => Payload::Text(line.to_owned()),
    }
}

fn into_payload(report: TextReport, line: &str) -> Payload {
    if let Some(kind) = report.resp {
        return Payload::Ack(Ack {
            kind,
            uptime_ms: report.millis,
        });
    }

    if let Some(imu) = report.imu {
        let sample = ImuSample {
            ax: imu.ax,
            ay: imu.ay,
            az: imu.az,
            gx: imu.gx,
            gy: imu.gy,
            gz: imu.gz,
            temperature: imu.temp,
            sequence: report.seq.unwrap_or(0),
        };
        let servos = match (report.pos, report.off) {
            (Some(pos), Some(off)) => match (pos.try_into(), off.try_into()) {
                (Ok(positions), Ok(offsets)) => Some(ServoState { positions, offsets }),
                _ => None,
            },
            _ => None,
        };
        return Payload::Imu { sample, servos };
    }

    // Valid JSON, but nothing this client understands.
    Payload::Text(line.to_owned())
}
