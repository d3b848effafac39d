//! OSC trigger decoding and the outbound `/msc/<command>/<cue>` echo.

use rosc::{OscMessage, OscPacket, OscType};

use super::ProtocolError;
use crate::cue::cue::{CueCommand, CueEvent};
use crate::cue::cue_key::CueKey;

/// Address pattern that accepts a trigger on any address.
pub const ANY_ADDRESS: &str = "*";

/// Decode an OSC packet into the messages it carries, flattening bundles.
pub fn decode_packet(bytes: &[u8]) -> Result<Vec<OscMessage>, ProtocolError> {
    let (_, packet) =
        rosc::decoder::decode_udp(bytes).map_err(|e| ProtocolError::Osc(e.to_string()))?;

    let mut messages = Vec::new();
    flatten(packet, &mut messages);
    Ok(messages)
}

fn flatten(packet: OscPacket, out: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(msg) => out.push(msg),
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                flatten(packet, out);
            }
        }
    }
}

/// Turn a trigger message into a `Go` event.
///
/// The first argument is the cue token; any trailing label after `_` is removed by
/// [`CueKey::parse`]. Alternate-key resolution is left to the cue table.
pub fn decode_trigger(msg: &OscMessage, address: &str) -> Result<CueEvent, ProtocolError> {
    if address != ANY_ADDRESS && msg.addr != address {
        return Err(ProtocolError::UnexpectedAddress(msg.addr.clone()));
    }

    let token = msg
        .args
        .first()
        .and_then(cue_token)
        .ok_or_else(|| ProtocolError::MissingCueArgument(msg.addr.clone()))?;

    let key = CueKey::parse(&token);
    if key.is_empty() {
        return Err(ProtocolError::InvalidCueNumber(token));
    }

    Ok(CueEvent::new(CueCommand::Go, key))
}

/// Stringify an OSC argument carrying a cue identifier.
pub fn cue_token(arg: &OscType) -> Option<String> {
    match arg {
        OscType::String(s) => Some(s.clone()),
        OscType::Float(f) => Some(f.to_string()),
        OscType::Double(d) => Some(d.to_string()),
        OscType::Int(i) => Some(i.to_string()),
        OscType::Long(l) => Some(l.to_string()),
        _ => None,
    }
}

/// Format a cue number the way consoles display it: one decimal place, with a
/// trailing `.0` dropped (`5.0` -> `5`, `5.2` -> `5.2`).
pub fn format_cue_number(cue: f64) -> String {
    let formatted = format!("{:.1}", cue);
    if formatted.ends_with('0') {
        format!("{:.0}", cue)
    } else {
        formatted
    }
}

/// Build the echo message for a cue event: `/msc/<command>/<cue>` with the numeric cue
/// (when there is one) and the command name as arguments.
pub fn echo_message(command: CueCommand, cue: &CueKey) -> OscMessage {
    let mut args = Vec::with_capacity(2);

    let cue_text = match cue.as_number() {
        Some(number) => {
            args.push(OscType::Double(number));
            format_cue_number(number)
        }
        None => cue.canonical().to_string(),
    };
    args.push(OscType::String(command.as_str().to_string()));

    OscMessage {
        addr: format!("/msc/{}/{}", command.as_str(), cue_text),
        args,
    }
}

/// Encode a message for sending over UDP.
pub fn encode_message(msg: OscMessage) -> Result<Vec<u8>, rosc::OscError> {
    rosc::encoder::encode(&OscPacket::Message(msg))
}
