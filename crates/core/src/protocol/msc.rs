//! MIDI Show Control (MSC) trigger decoding.
//!
//! Frames arrive with the sysex start/end bytes removed:
//!
//! ```text
//! 7F <device> 02 <format> <command> <cue ascii ...> <3-byte trailer>
//! ```
//!
//! Only the command byte and the cue number are used; device, command format and the
//! trailer (cue list / path) are ignored.

use super::ProtocolError;
use crate::cue::cue::{CueCommand, CueEvent};
use crate::cue::cue_key::CueKey;

/// Real-time universal sysex identifier.
pub const SYSEX_REALTIME: u8 = 0x7F;
pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

const MIN_PACKET_LEN: usize = 9;
const COMMAND_OFFSET: usize = 4;
const CUE_OFFSET: usize = 5;
const TRAILER_LEN: usize = 3;

/// A decoded MSC trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct MscMessage {
    pub command: CueCommand,
    /// Cue number exactly as sent by the console.
    pub cue: String,
    pub cue_number: f64,
}

impl MscMessage {
    pub fn into_event(self) -> CueEvent {
        CueEvent::new(self.command, CueKey::parse(&self.cue))
    }
}

/// Decode an MSC frame (without sysex framing bytes).
pub fn decode(bytes: &[u8]) -> Result<MscMessage, ProtocolError> {
    if bytes.len() < MIN_PACKET_LEN || bytes[0] != SYSEX_REALTIME {
        return Err(ProtocolError::MalformedPacket {
            len: bytes.len(),
            first: bytes.first().copied(),
        });
    }

    let code = bytes[COMMAND_OFFSET];
    let command = CueCommand::from_code(code).ok_or(ProtocolError::UnknownCommand(code))?;

    let cue_bytes = &bytes[CUE_OFFSET..bytes.len() - TRAILER_LEN];
    let cue = std::str::from_utf8(cue_bytes)
        .map(str::trim)
        .map_err(|_| ProtocolError::InvalidCueNumber(String::from_utf8_lossy(cue_bytes).into()))?;

    let cue_number = cue
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| ProtocolError::InvalidCueNumber(cue.to_string()))?;

    Ok(MscMessage {
        command,
        cue: cue.to_string(),
        cue_number,
    })
}

/// Decode a raw sysex message as delivered by a MIDI driver (`F0 ... F7`).
pub fn decode_sysex(message: &[u8]) -> Result<MscMessage, ProtocolError> {
    decode(strip_sysex_framing(message))
}

/// Remove a leading `F0` and trailing `F7` if present.
pub fn strip_sysex_framing(message: &[u8]) -> &[u8] {
    let message = message.strip_prefix(&[SYSEX_START]).unwrap_or(message);
    message.strip_suffix(&[SYSEX_END]).unwrap_or(message)
}

/// Encode an MSC frame (without sysex framing) addressed to all devices, lighting
/// command format, cue list 1.
pub fn encode(command: CueCommand, cue: &str) -> Vec<u8> {
    let mut frame = Vec::with_capacity(CUE_OFFSET + cue.len() + TRAILER_LEN);
    frame.extend_from_slice(&[SYSEX_REALTIME, 0x7F, 0x02, 0x01, command.code()]);
    frame.extend_from_slice(cue.as_bytes());
    frame.extend_from_slice(&[0x00, b'1', 0x00]);
    frame
}
