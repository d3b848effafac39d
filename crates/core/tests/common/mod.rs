#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use cuebridge_core::{
    AudioSink, CueCommand, CueEvent, CueKey, CueTable, CueTableStore, Dispatcher, KeyboardSink,
    LightApiSink, LightEffectController, MidiMessage, MidiOutput, MidiSink, OutboundProtocolSink,
    Outputs, Rgbw, SinkError,
};

pub const SOUND_CHANNEL: u8 = 1;

#[derive(Default)]
pub struct RecordingMidi {
    pub sent: Mutex<Vec<MidiMessage>>,
}

#[async_trait]
impl MidiSink for RecordingMidi {
    async fn send(&self, message: MidiMessage) -> Result<(), SinkError> {
        self.sent.lock().push(message);
        Ok(())
    }
}

/// A MIDI device that never answers.
pub struct HangingMidi;

#[async_trait]
impl MidiSink for HangingMidi {
    async fn send(&self, _message: MidiMessage) -> Result<(), SinkError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightCall {
    pub light_id: u8,
    pub rgbw: Rgbw,
    pub transition: f64,
    pub effect: String,
}

impl LightCall {
    pub fn new(light_id: u8, rgbw: Rgbw, transition: f64, effect: &str) -> Self {
        Self {
            light_id,
            rgbw,
            transition,
            effect: effect.to_string(),
        }
    }
}

#[derive(Default)]
pub struct RecordingLights {
    pub calls: Mutex<Vec<LightCall>>,
}

impl RecordingLights {
    pub fn calls_for(&self, light_id: u8) -> Vec<LightCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.light_id == light_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LightApiSink for RecordingLights {
    async fn set_color(
        &self,
        light_id: u8,
        rgbw: Rgbw,
        transition_seconds: f64,
        effect: &str,
    ) -> Result<(), SinkError> {
        self.calls
            .lock()
            .push(LightCall::new(light_id, rgbw, transition_seconds, effect));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRelay {
    pub relayed: Mutex<Vec<(CueCommand, String)>>,
}

#[async_trait]
impl OutboundProtocolSink for RecordingRelay {
    async fn relay(&self, command: CueCommand, cue: &CueKey) -> Result<(), SinkError> {
        self.relayed
            .lock()
            .push((command, cue.canonical().to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingKeyboard {
    pub pressed: Mutex<Vec<i32>>,
}

#[async_trait]
impl KeyboardSink for RecordingKeyboard {
    async fn press_key(&self, code: i32) -> Result<(), SinkError> {
        self.pressed.lock().push(code);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    pub played: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl AudioSink for RecordingAudio {
    async fn play(&self, path: &Path) -> Result<(), SinkError> {
        self.played.lock().push(path.to_path_buf());
        Ok(())
    }
}

/// A dispatcher wired to recording sinks.
pub struct Harness {
    pub store: Arc<CueTableStore>,
    pub midi: Arc<RecordingMidi>,
    pub lights: Arc<RecordingLights>,
    pub relay: Arc<RecordingRelay>,
    pub keyboard: Arc<RecordingKeyboard>,
    pub audio: Arc<RecordingAudio>,
    pub controller: Arc<LightEffectController>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(yaml: &str) -> Self {
        Self::with_midi(yaml, None)
    }

    /// Use `midi` instead of the recording sound desk.
    pub fn with_midi(yaml: &str, midi_override: Option<Arc<dyn MidiSink>>) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let store = Arc::new(CueTableStore::new(
            CueTable::from_yaml(yaml).expect("test config parses"),
        ));
        let midi = Arc::new(RecordingMidi::default());
        let lights = Arc::new(RecordingLights::default());
        let relay = Arc::new(RecordingRelay::default());
        let keyboard = Arc::new(RecordingKeyboard::default());
        let audio = Arc::new(RecordingAudio::default());
        let timeout = Duration::from_millis(200);

        let controller = Arc::new(LightEffectController::new(
            Arc::clone(&lights) as Arc<dyn LightApiSink>,
            15,
            None,
            timeout,
        ));

        let outputs = Outputs {
            sound_desk: Some(MidiOutput {
                sink: midi_override.unwrap_or_else(|| Arc::clone(&midi) as Arc<dyn MidiSink>),
                channel: SOUND_CHANNEL,
            }),
            qlab: None,
            relay: Some(Arc::clone(&relay) as Arc<dyn OutboundProtocolSink>),
            audio: Some(Arc::clone(&audio) as Arc<dyn AudioSink>),
            keyboard: Some(Arc::clone(&keyboard) as Arc<dyn KeyboardSink>),
            lights: Some(Arc::clone(&controller)),
        };

        let dispatcher = Dispatcher::new(Arc::clone(&store), outputs, timeout);

        Self {
            store,
            midi,
            lights,
            relay,
            keyboard,
            audio,
            controller,
            dispatcher,
        }
    }

    /// Dispatch and wait for every sub-action to finish.
    pub async fn fire(&self, command: CueCommand, cue: &str) {
        let event = CueEvent::new(command, CueKey::parse(cue));
        for task in self.dispatcher.dispatch(&event) {
            task.await.expect("dispatch task panicked");
        }
    }
}
