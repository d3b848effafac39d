use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::cue::cue::{CueAction, CueCommand, CueEvent};
use crate::cue::cue_key::CueKey;
use crate::cue::cue_table::CueTableStore;
use crate::cue::validation::{midi_number, ValidationError};
use crate::light::LightEffectController;
use crate::sinks::{
    with_timeout, AudioSink, KeyboardSink, MidiSink, OutboundProtocolSink, SinkError,
};

const MUTE_VELOCITY: u8 = 0x7F;
const UNMUTE_VELOCITY: u8 = 0x00;
const MAX_MIDI_VALUE: u8 = 0x7F;

/// A MIDI output and the channel cues are sent on.
#[derive(Clone)]
pub struct MidiOutput {
    pub sink: Arc<dyn MidiSink>,
    pub channel: u8,
}

/// The outputs a dispatcher drives. Anything left as `None` is skipped.
#[derive(Clone, Default)]
pub struct Outputs {
    /// Sound desk: scene recall, mutes and faders.
    pub sound_desk: Option<MidiOutput>,
    /// Playback software fed the raw sound program number.
    pub qlab: Option<MidiOutput>,
    pub relay: Option<Arc<dyn OutboundProtocolSink>>,
    pub audio: Option<Arc<dyn AudioSink>>,
    pub keyboard: Option<Arc<dyn KeyboardSink>>,
    pub lights: Option<Arc<LightEffectController>>,
}

/// Turns decoded cue events into sink calls.
///
/// Every event is relayed. `Go` events are then looked up in the current cue table
/// and each sub-action of the matching cue runs in its own task, so a slow or failing
/// output never holds up the others.
pub struct Dispatcher {
    table: Arc<CueTableStore>,
    outputs: Outputs,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(table: Arc<CueTableStore>, outputs: Outputs, call_timeout: Duration) -> Self {
        Self {
            table,
            outputs,
            call_timeout,
        }
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Dispatch one event and return the tasks it started.
    ///
    /// Callers may drop the handles; the tasks keep running.
    pub fn dispatch(&self, event: &CueEvent) -> Vec<JoinHandle<()>> {
        log::info!("{} cue[{}]", event.command, event.cue);
        let mut tasks = Vec::new();

        if let Some(relay) = &self.outputs.relay {
            tasks.push(self.spawn_relay(Arc::clone(relay), event.command, event.cue.clone()));
        }

        if event.command != CueCommand::Go {
            return tasks;
        }

        let table = self.table.snapshot();
        let Some(action) = table.resolve(&event.cue) else {
            log::debug!("cue[{}] has no mapping", event.cue);
            return tasks;
        };

        if let Some(desk) = &self.outputs.sound_desk {
            if action.has_midi() {
                tasks.push(tokio::spawn(sound_desk_task(
                    desk.clone(),
                    Arc::clone(&action),
                    event.cue.clone(),
                    self.call_timeout,
                )));
            }
        }

        if let (Some(qlab), Some(program)) = (&self.outputs.qlab, action.sound_program) {
            tasks.push(tokio::spawn(qlab_task(
                qlab.clone(),
                program,
                event.cue.clone(),
                self.call_timeout,
            )));
        }

        if action.has_keyboard() {
            match &self.outputs.keyboard {
                Some(keyboard) => tasks.push(self.spawn_keyboard(
                    Arc::clone(keyboard),
                    action.keyboard_key,
                    event.cue.clone(),
                )),
                None => log::debug!("cue[{}]: keyboard output disabled", event.cue),
            }
        }

        if let Some(path) = &action.audio_file {
            match &self.outputs.audio {
                Some(audio) => tasks.push(spawn_audio(
                    Arc::clone(audio),
                    path.clone(),
                    event.cue.clone(),
                )),
                None => log::debug!("cue[{}]: audio output disabled", event.cue),
            }
        }

        if !action.lights.is_empty() {
            self.start_lights(&action, &event.cue, &mut tasks);
        }

        tasks
    }

    fn spawn_relay(
        &self,
        relay: Arc<dyn OutboundProtocolSink>,
        command: CueCommand,
        cue: CueKey,
    ) -> JoinHandle<()> {
        let limit = self.call_timeout;
        tokio::spawn(async move {
            if let Err(e) = with_timeout("relay", limit, relay.relay(command, &cue)).await {
                log::error!("cue[{}]: relay failed: {}", cue, e);
            }
        })
    }

    fn spawn_keyboard(
        &self,
        keyboard: Arc<dyn KeyboardSink>,
        code: i32,
        cue: CueKey,
    ) -> JoinHandle<()> {
        let limit = self.call_timeout;
        tokio::spawn(async move {
            if let Err(e) = with_timeout("keyboard", limit, keyboard.press_key(code)).await {
                log::error!("cue[{}]: key press failed: {}", cue, e);
            }
        })
    }

    fn start_lights(&self, action: &CueAction, cue: &CueKey, tasks: &mut Vec<JoinHandle<()>>) {
        let Some(lights) = &self.outputs.lights else {
            log::debug!("cue[{}]: light API not configured", cue);
            return;
        };

        let expanded = match action.lights.expand(lights.light_count()) {
            Ok(expanded) => expanded,
            Err(e) => {
                log::warn!("cue[{}]: skipping lights: {}", cue, e);
                return;
            }
        };

        for (light_id, e) in &expanded.rejected {
            log::warn!("cue[{}]: skipping light {}: {}", cue, light_id, e);
        }
        for light in expanded.actions {
            let light_id = light.light_id;
            match lights.apply(light) {
                Ok(handle) => tasks.push(handle),
                Err(e) => log::warn!("cue[{}]: skipping light {}: {}", cue, light_id, e),
            }
        }
    }
}

/// Audio runs until the clip ends, so it is not bounded by the call timeout.
fn spawn_audio(audio: Arc<dyn AudioSink>, path: PathBuf, cue: CueKey) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::debug!("cue[{}]: playing {}", cue, path.display());
        if let Err(e) = audio.play(&path).await {
            log::error!("cue[{}]: audio failed: {}", cue, e);
        }
    })
}

fn log_midi_result(cue: &CueKey, what: &str, result: Result<(), SinkError>) {
    if let Err(e) = result {
        log::error!("cue[{}]: {} failed: {}", cue, what, e);
    }
}

/// Scene recall, then mutes, unmutes and fader moves, in that order.
async fn sound_desk_task(desk: MidiOutput, action: Arc<CueAction>, cue: CueKey, limit: Duration) {
    let channel = desk.channel;
    let sink = desk.sink.as_ref();

    if let Some(program) = action.sound_program {
        match midi_number("sound", program) {
            Ok(program) => log_midi_result(
                &cue,
                "program change",
                with_timeout("midi", limit, sink.program_change(channel, program)).await,
            ),
            Err(e) => log::warn!("cue[{}]: {}", cue, e),
        }
    }

    for (kind, notes, velocity) in [
        ("mute", &action.mute_notes, MUTE_VELOCITY),
        ("unmute", &action.unmute_notes, UNMUTE_VELOCITY),
    ] {
        for &note in notes {
            match midi_number(kind, note) {
                Ok(note) => log_midi_result(
                    &cue,
                    kind,
                    with_timeout("midi", limit, sink.note_on(channel, note, velocity)).await,
                ),
                Err(e) => log::warn!("cue[{}]: {}", cue, e),
            }
        }
    }

    if action.fader_channels.len() != action.fader_values.len() {
        log::warn!(
            "cue[{}]: skipping faders: {}",
            cue,
            ValidationError::FaderLengthMismatch {
                faders: action.fader_channels.len(),
                values: action.fader_values.len(),
            }
        );
        return;
    }

    for (&fader, &value) in action.fader_channels.iter().zip(&action.fader_values) {
        if value > MAX_MIDI_VALUE {
            log::warn!(
                "cue[{}]: {}",
                cue,
                ValidationError::FaderValueOutOfRange { fader, value }
            );
            continue;
        }
        match midi_number("fader", fader) {
            Ok(controller) => log_midi_result(
                &cue,
                "fader",
                with_timeout("midi", limit, sink.control_change(channel, controller, value)).await,
            ),
            Err(e) => log::warn!("cue[{}]: {}", cue, e),
        }
    }
}

/// QLab numbers its cues from the program number as written, without the 1-based shift.
async fn qlab_task(qlab: MidiOutput, program: u8, cue: CueKey, limit: Duration) {
    if program > MAX_MIDI_VALUE {
        log::warn!("cue[{}]: qlab program {} is higher than 127", cue, program);
        return;
    }
    log_midi_result(
        &cue,
        "qlab program change",
        with_timeout("qlab", limit, qlab.sink.program_change(qlab.channel, program)).await,
    );
}
