pub use bridge::CueBridge;
pub use config::{
    BridgeConfig, ConfigError, ConfigManager, CueMappingEntry, HomeAssistantConfig,
    LightsConfig, MidiOutputConfig, OscInputConfig, OscOutputConfig, OutputsConfig,
};
pub use config_watch::{ConfigSource, ConfigWatcher, FileConfigSource, DEFAULT_DEBOUNCE};
pub use cue::cue::{CueAction, CueCommand, CueEvent, LightAction, LightEffect, LightGroup, Rgbw};
pub use cue::cue_key::CueKey;
pub use cue::cue_table::{CueTable, CueTableStore};
pub use cue::validation::{ExpandedLights, ValidationError};
pub use dispatcher::{Dispatcher, MidiOutput, Outputs};
pub use light::{LightEffectController, LightState, RAINBOW_STEPS};
pub use midi::midi::MidiMessage;
// Async module system exports
pub use modules::{
    AsyncModule, MidiInputModule, ModuleEvent, ModuleId, ModuleManager, ModuleMessage,
    OscInputModule,
};
pub use protocol::ProtocolError;
pub use sinks::{
    AudioSink, HomeAssistantLights, KeyboardSink, LightApiSink, LogKeyboardSink, MidiOutputSink,
    MidiSink, OscRelaySink, OutboundProtocolSink, RodioAudioSink, SinkError,
};

mod bridge;
mod config;
mod config_watch;
mod cue;
mod dispatcher;
pub mod keyboard_map;
mod light;
mod midi;
mod modules;
pub mod protocol;
pub mod sinks;
