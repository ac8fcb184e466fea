//! Maps a validated frame's payload bytes to a typed application value.

use log::debug;
use serde::Deserialize;

use crate::command::cmds;
use crate::frame::Frame;

/// Byte length of the IMU block at the front of a control payload:
/// six little-endian `f32`s followed by one raw temperature byte.
pub const IMU_BLOCK_LEN: usize = 25;

/// Length of the full control payload the firmware streams: the IMU block
/// plus eight servo positions and eight servo offsets, both `u16` LE.
pub const CONTROL_PAYLOAD_LEN: usize = 57;

/// One inertial measurement streamed by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    /// Widened from the single raw byte used by the wire encoding.
    pub temperature: f32,
    /// Copied from the owning frame's header.
    pub sequence: u16,
}

/// Servo echo carried after the IMU block in full control payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoState {
    pub positions: [u16; 8],
    pub offsets: [u16; 8],
}

/// A structured acknowledgement record from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Response-kind discriminator, e.g. `"pong"`.
    pub kind: String,
    /// Device uptime in milliseconds, when the device reports it.
    pub uptime_ms: Option<u64>,
}

/// Everything a validated frame's payload can decode to.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Imu {
        sample: ImuSample,
        /// Present when the payload carries the full control block.
        servos: Option<ServoState>,
    },
    Ack(Ack),
    /// Well-framed but unstructured text, surfaced for diagnostics.
    Text(String),
    /// Framing was valid but the payload failed semantic decode. Consumers
    /// drop this; it never terminates decoding.
    Malformed,
}

/// JSON shape of a text acknowledgement, e.g. `{"resp":"pong","millis":1234}`.
#[derive(Deserialize)]
struct AckRecord {
    resp: String,
    millis: Option<u64>,
}

/// Classifies and decodes a validated frame's payload.
///
/// The wire protocol carries no payload-type tag; dispatch is on length and
/// byte layout, matching the device firmware. Payloads of [`IMU_BLOCK_LEN`]
/// bytes or more are control telemetry; anything shorter is an
/// acknowledgement or free text.
pub fn interpret(frame: &Frame) -> Payload {
    let payload = &frame.payload;

    if payload.len() >= IMU_BLOCK_LEN {
        return match decode_imu(payload, frame.sequence) {
            Some(sample) => Payload::Imu {
                sample,
                servos: decode_servos(payload),
            },
            None => {
                debug!("control payload of {} bytes failed IMU decode", payload.len());
                Payload::Malformed
            }
        };
    }

    // The firmware answers a binary ping with a single opcode byte.
    if *payload == [cmds::PING] {
        return Payload::Ack(Ack {
            kind: "pong".into(),
            uptime_ms: None,
        });
    }

    // Lossy on purpose: a garbled byte inside otherwise-valid framing should
    // still surface on the diagnostics channel instead of erroring.
    let text = String::from_utf8_lossy(payload).into_owned();
    match serde_json::from_str::<AckRecord>(&text) {
        Ok(record) => Payload::Ack(Ack {
            kind: record.resp,
            uptime_ms: record.millis,
        }),
        Err(_) => Payload::Text(text),
    }
}

fn decode_imu(payload: &[u8], sequence: u16) -> Option<ImuSample> {
    let block = payload.get(..IMU_BLOCK_LEN)?;
    let mut floats = [0.0f32; 6];
    for (i, float) in floats.iter_mut().enumerate() {
        *float = f32::from_le_bytes(block[i * 4..i * 4 + 4].try_into().ok()?);
    }
    Some(ImuSample {
        ax: floats[0],
        ay: floats[1],
        az: floats[2],
        gx: floats[3],
        gy: floats[4],
        gz: floats[5],
        temperature: f32::from(block[24]),
        sequence,
    })
}

fn decode_servos(payload: &[u8]) -> Option<ServoState> {
    let block = payload.get(IMU_BLOCK_LEN..CONTROL_PAYLOAD_LEN)?;
    let mut positions = [0u16; 8];
    let mut offsets = [0u16; 8];
    for i in 0..8 {
        positions[i] = u16::from_le_bytes([block[i * 2], block[i * 2 + 1]]);
        offsets[i] = u16::from_le_bytes([block[16 + i * 2], block[16 + i * 2 + 1]]);
    }
    Some(ServoState { positions, offsets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameType;

    fn control_frame(payload: Vec<u8>, sequence: u16) -> Frame {
        Frame {
            version: 0x01,
            frame_type: FrameType::Control,
            sequence,
            payload,
        }
    }

    fn imu_block() -> Vec<u8> {
        let mut block = Vec::with_capacity(IMU_BLOCK_LEN);
        for value in [1.0f32, -2.5, 9.81, 0.1, 0.2, -0.3] {
            block.extend_from_slice(&value.to_le_bytes());
        }
        block.push(42);
        block
    }

    #[test]
    fn imu_only_payload() {
        let frame = control_frame(imu_block(), 7);
        match interpret(&frame) {
            Payload::Imu { sample, servos } => {
                assert_eq!(sample.ax, 1.0);
                assert_eq!(sample.ay, -2.5);
                assert_eq!(sample.az, 9.81);
                assert_eq!(sample.gx, 0.1);
                assert_eq!(sample.gy, 0.2);
                assert_eq!(sample.gz, -0.3);
                assert_eq!(sample.temperature, 42.0);
                assert_eq!(sample.sequence, 7);
                assert!(servos.is_none());
            }
            other => panic!("expected IMU payload, got {other:?}"),
        }
    }

    #[test]
    fn full_control_payload_includes_servo_echo() {
        let mut payload = imu_block();
        for position in [90u16, 91, 92, 93, 94, 95, 96, 97] {
            payload.extend_from_slice(&position.to_le_bytes());
        }
        for offset in [0u16, 1, 2, 3, 4, 5, 6, 7] {
            payload.extend_from_slice(&offset.to_le_bytes());
        }
        assert_eq!(payload.len(), CONTROL_PAYLOAD_LEN);

        let frame = control_frame(payload, 9);
        match interpret(&frame) {
            Payload::Imu {
                servos: Some(servos),
                ..
            } => {
                assert_eq!(servos.positions, [90, 91, 92, 93, 94, 95, 96, 97]);
                assert_eq!(servos.offsets, [0, 1, 2, 3, 4, 5, 6, 7]);
            }
            other => panic!("expected servo echo, got {other:?}"),
        }
    }

    #[test]
    fn binary_pong_byte_is_an_ack() {
        let frame = control_frame(vec![cmds::PING], 3);
        assert_eq!(
            interpret(&frame),
            Payload::Ack(Ack {
                kind: "pong".into(),
                uptime_ms: None,
            })
        );
    }

    #[test]
    fn json_ack_record() {
        let frame = control_frame(b"{\"resp\":\"pong\",\"millis\":1234}".to_vec(), 0);
        assert_eq!(
            interpret(&frame),
            Payload::Ack(Ack {
                kind: "pong".into(),
                uptime_ms: Some(1234),
            })
        );
    }

    #[test]
    fn unparseable_text_surfaces_verbatim() {
        let frame = control_frame(b"hello robot".to_vec(), 0);
        assert_eq!(interpret(&frame), Payload::Text("hello robot".into()));
    }

    #[test]
    fn invalid_utf8_is_replaced_not_fatal() {
        let frame = control_frame(vec![0xFF, 0xFE, b'o', b'k'], 0);
        match interpret(&frame) {
            Payload::Text(text) => assert!(text.ends_with("ok")),
            other => panic!("expected text payload, got {other:?}"),
        }
    }
}
