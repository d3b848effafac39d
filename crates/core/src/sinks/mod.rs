//! Output capabilities driven by the dispatcher, plus the concrete adapters used by
//! the bridge binary.

pub mod audio_sink;
pub mod keyboard_sink;
pub mod light_api;
pub mod midi_sink;
pub mod osc_sink;
pub mod traits;

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use audio_sink::RodioAudioSink;
pub use keyboard_sink::LogKeyboardSink;
pub use light_api::HomeAssistantLights;
pub use midi_sink::MidiOutputSink;
pub use osc_sink::OscRelaySink;
pub use traits::{AudioSink, KeyboardSink, LightApiSink, MidiSink, OutboundProtocolSink};

/// Failure talking to an output device or service.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("MIDI send failed: {0}")]
    Midi(String),

    #[error("OSC encode failed: {0}")]
    Osc(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audio playback failed: {0}")]
    Audio(String),

    #[error("unsupported audio file {0}")]
    UnsupportedAudio(PathBuf),

    #[error("light API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("light API returned status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("{0} call timed out after {1:?}")]
    Timeout(&'static str, Duration),
}

/// Bound a single sink call. A hung device stalls only the calling task, and only
/// for `limit`.
pub async fn with_timeout<F>(sink: &'static str, limit: Duration, call: F) -> Result<(), SinkError>
where
    F: Future<Output = Result<(), SinkError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SinkError::Timeout(sink, limit)),
    }
}
