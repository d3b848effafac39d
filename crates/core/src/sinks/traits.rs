use std::path::Path;

use async_trait::async_trait;

use super::SinkError;
use crate::cue::cue::{CueCommand, Rgbw};
use crate::cue::cue_key::CueKey;
use crate::midi::midi::MidiMessage;

/// Sound desk MIDI output.
#[async_trait]
pub trait MidiSink: Send + Sync {
    async fn send(&self, message: MidiMessage) -> Result<(), SinkError>;

    async fn program_change(&self, channel: u8, program: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::ProgramChange { channel, program })
            .await
    }

    async fn note_on(&self, channel: u8, note: u8, velocity: u8) -> Result<(), SinkError> {
        self.send(MidiMessage::NoteOn {
            channel,
            note,
            velocity,
        })
        .await
    }

    async fn control_change(
        &self,
        channel: u8,
        controller: u8,
        value: u8,
    ) -> Result<(), SinkError> {
        self.send(MidiMessage::ControlChange {
            channel,
            controller,
            value,
        })
        .await
    }
}

/// Echo of every decoded trigger to a downstream show-control listener.
#[async_trait]
pub trait OutboundProtocolSink: Send + Sync {
    async fn relay(&self, command: CueCommand, cue: &CueKey) -> Result<(), SinkError>;
}

/// Local clip playback. `play` returns once the clip has finished.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, path: &Path) -> Result<(), SinkError>;
}

/// Virtual keyboard for soundboard programs driven by hotkeys.
#[async_trait]
pub trait KeyboardSink: Send + Sync {
    async fn press_key(&self, code: i32) -> Result<(), SinkError>;
}

/// Remote lighting controller addressed by light number.
#[async_trait]
pub trait LightApiSink: Send + Sync {
    async fn set_color(
        &self,
        light_id: u8,
        rgbw: Rgbw,
        transition_seconds: f64,
        effect: &str,
    ) -> Result<(), SinkError>;
}
