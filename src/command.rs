//! Host-to-device command model and its payload encodings.

use crate::encode::EncodeError;

/// Payload opcodes for [`FrameType::Command`](crate::frame::FrameType::Command) frames.
pub mod cmds {
    pub const SET_SERVO: u8 = 0x01;
    pub const SET_ALL_SERVOS: u8 = 0x02;
    pub const RESET: u8 = 0x03;
    pub const PING: u8 = 0x04;
}

/// Number of servo channels on the robot.
pub const SERVO_COUNT: usize = 8;

/// An application-level intent bound for the device.
///
/// All servo values are absolute positions, so a lost or repeated command is
/// harmless; the link deliberately has no acknowledgement matching or replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check; the device answers with a pong.
    Ping,
    /// Moves a single servo channel to an absolute position.
    SetServo { channel: u8, value: u16 },
    /// Moves all eight servo channels at once.
    SetAllServos { values: [u16; SERVO_COUNT] },
    /// Returns every servo to its neutral position and clears offsets.
    Reset,
    /// Free-form text payload, the escape hatch for commands the binary
    /// vocabulary does not cover.
    Raw { text: String },
}

impl Command {
    /// Builds a [`Command::SetAllServos`] from a slice, rejecting anything
    /// that is not exactly [`SERVO_COUNT`] channels.
    pub fn set_all(values: &[u16]) -> Result<Self, EncodeError> {
        let values: [u16; SERVO_COUNT] = values
            .try_into()
            .map_err(|_| EncodeError::InvalidChannelCount(values.len()))?;
        Ok(Self::SetAllServos { values })
    }

    /// Encodes this command's frame payload bytes.
    pub(crate) fn encode_payload(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(match self {
            Self::Ping => vec![cmds::PING],
            Self::SetServo { channel, value } => {
                if usize::from(*channel) >= SERVO_COUNT {
                    return Err(EncodeError::InvalidChannel(*channel));
                }
                let value = value.to_le_bytes();
                vec![cmds::SET_SERVO, *channel, value[0], value[1]]
            }
            Self::SetAllServos { values } => {
                let mut payload = Vec::with_capacity(1 + SERVO_COUNT * 2);
                payload.push(cmds::SET_ALL_SERVOS);
                for value in values {
                    payload.extend_from_slice(&value.to_le_bytes());
                }
                payload
            }
            Self::Reset => vec![cmds::RESET],
            Self::Raw { text } => text.as_bytes().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_servo_payload_layout() {
        let payload = Command::SetServo {
            channel: 3,
            value: 1500,
        }
        .encode_payload()
        .unwrap();
        assert_eq!(payload, [0x01, 0x03, 0xDC, 0x05]);
    }

    #[test]
    fn set_all_payload_layout() {
        let payload = Command::SetAllServos { values: [90; 8] }
            .encode_payload()
            .unwrap();
        assert_eq!(payload.len(), 17);
        assert_eq!(payload[0], cmds::SET_ALL_SERVOS);
        assert_eq!(&payload[1..3], &90u16.to_le_bytes());
        assert_eq!(&payload[15..17], &90u16.to_le_bytes());
    }

    #[test]
    fn single_byte_commands() {
        assert_eq!(Command::Ping.encode_payload().unwrap(), [cmds::PING]);
        assert_eq!(Command::Reset.encode_payload().unwrap(), [cmds::RESET]);
    }

    #[test]
    fn raw_text_is_verbatim_utf8() {
        let payload = Command::Raw {
            text: "{\"cmd\":\"ping\"}".into(),
        }
        .encode_payload()
        .unwrap();
        assert_eq!(payload, b"{\"cmd\":\"ping\"}");
    }

    #[test]
    fn out_of_range_channel_rejected() {
        let err = Command::SetServo {
            channel: 8,
            value: 90,
        }
        .encode_payload()
        .unwrap_err();
        assert_eq!(err, EncodeError::InvalidChannel(8));
    }

    #[test]
    fn set_all_requires_exactly_eight_values() {
        assert_eq!(
            Command::set_all(&[90; 7]).unwrap_err(),
            EncodeError::InvalidChannelCount(7)
        );
        assert_eq!(
            Command::set_all(&[90; 9]).unwrap_err(),
            EncodeError::InvalidChannelCount(9)
        );
        assert_eq!(
            Command::set_all(&[90; 8]).unwrap(),
            Command::SetAllServos { values: [90; 8] }
        );
    }
}
