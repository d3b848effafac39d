//! Decoding of incoming cue triggers and encoding of the outbound echo.
//!
//! Two trigger shapes are understood:
//! - **MSC**: MIDI Show Control sysex from the lighting console, see [`msc`].
//! - **OSC**: a single address carrying the cue as its first argument, see [`osc`].

pub mod msc;
pub mod osc;

use thiserror::Error;

/// A trigger message that could not be turned into a cue event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("not an MSC packet (length {len}, first byte {first:#04x?})")]
    MalformedPacket { len: usize, first: Option<u8> },

    #[error("unrecognised MSC command {0:#04x}")]
    UnknownCommand(u8),

    #[error("invalid cue number {0:?}")]
    InvalidCueNumber(String),

    #[error("OSC message on {0} carries no cue argument")]
    MissingCueArgument(String),

    #[error("unexpected OSC address {0}")]
    UnexpectedAddress(String),

    #[error("failed to decode OSC packet: {0}")]
    Osc(String),
}
