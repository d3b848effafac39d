use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cue_key::CueKey;

/// Show-control commands understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CueCommand {
    Go,
    Stop,
    Resume,
    Macro,
}

impl CueCommand {
    /// MSC command byte for this command.
    pub fn code(&self) -> u8 {
        match self {
            CueCommand::Go => 0x01,
            CueCommand::Stop => 0x02,
            CueCommand::Resume => 0x03,
            CueCommand::Macro => 0x07,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(CueCommand::Go),
            0x02 => Some(CueCommand::Stop),
            0x03 => Some(CueCommand::Resume),
            0x07 => Some(CueCommand::Macro),
            _ => None,
        }
    }

    /// Lowercase name used in outbound echo addresses.
    pub fn as_str(&self) -> &'static str {
        match self {
            CueCommand::Go => "go",
            CueCommand::Stop => "stop",
            CueCommand::Resume => "resume",
            CueCommand::Macro => "macro",
        }
    }
}

impl fmt::Display for CueCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded trigger. Created once per incoming message and consumed by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct CueEvent {
    pub command: CueCommand,
    pub cue: CueKey,
    pub received_at: DateTime<Utc>,
}

impl CueEvent {
    pub fn new(command: CueCommand, cue: CueKey) -> Self {
        Self {
            command,
            cue,
            received_at: Utc::now(),
        }
    }

    /// The cue number, when the key is numeric.
    pub fn cue_number(&self) -> Option<f64> {
        self.cue.as_number()
    }
}

/// Four-channel colour value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgbw(pub [u8; 4]);

impl Rgbw {
    pub const OFF: Rgbw = Rgbw([0, 0, 0, 0]);

    pub fn new(red: u8, green: u8, blue: u8, white: u8) -> Self {
        Rgbw([red, green, blue, white])
    }

    pub fn channels(&self) -> [u8; 4] {
        self.0
    }
}

/// What a light does once its colour command has been issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightEffect {
    /// Off, then fade to the target colour.
    None,
    /// Fade to the target colour, then hand the fixture back to the lighting board.
    LightBoardControl,
    /// Cycle through a fixed hue sequence until superseded.
    CustomRainbow,
    /// A device-side effect passed through by name.
    Named(String),
}

impl LightEffect {
    pub const NONE_NAME: &'static str = "None";
    pub const LIGHT_BOARD_CONTROL_NAME: &'static str = "Light Board Control";
    pub const CUSTOM_RAINBOW_NAME: &'static str = "Custom Rainbow";

    pub fn from_name(name: &str) -> Self {
        match name {
            Self::NONE_NAME => LightEffect::None,
            Self::LIGHT_BOARD_CONTROL_NAME => LightEffect::LightBoardControl,
            Self::CUSTOM_RAINBOW_NAME => LightEffect::CustomRainbow,
            other => LightEffect::Named(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LightEffect::None => Self::NONE_NAME,
            LightEffect::LightBoardControl => Self::LIGHT_BOARD_CONTROL_NAME,
            LightEffect::CustomRainbow => Self::CUSTOM_RAINBOW_NAME,
            LightEffect::Named(name) => name,
        }
    }
}

/// One resolved command for one physical light.
#[derive(Debug, Clone, PartialEq)]
pub struct LightAction {
    pub light_id: u8,
    pub rgbw: Rgbw,
    pub transition_seconds: f64,
    pub effect: LightEffect,
}

/// The light section of a cue as written in configuration.
///
/// Parameter lists are either one element long (shared by every light) or as long
/// as `light_ids`. They are validated when the cue fires, see [`LightGroup::expand`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightGroup {
    pub light_ids: Vec<u8>,
    pub rgbws: Vec<Vec<i64>>,
    pub transitions: Vec<f64>,
    pub effects: Vec<String>,
}

impl LightGroup {
    pub fn is_empty(&self) -> bool {
        self.light_ids.is_empty()
    }
}

/// Everything a single cue asks the outputs to do.
#[derive(Debug, Clone, PartialEq)]
pub struct CueAction {
    /// 1-based sound desk program (scene) number.
    pub sound_program: Option<u8>,
    pub mute_notes: Vec<u8>,
    pub unmute_notes: Vec<u8>,
    pub fader_channels: Vec<u8>,
    pub fader_values: Vec<u8>,
    /// Platform key code, `-1` for none.
    pub keyboard_key: i32,
    pub audio_file: Option<PathBuf>,
    pub lights: LightGroup,
}

impl CueAction {
    pub const NO_KEY: i32 = -1;

    pub fn has_midi(&self) -> bool {
        self.sound_program.is_some()
            || !self.mute_notes.is_empty()
            || !self.unmute_notes.is_empty()
            || !self.fader_channels.is_empty()
    }

    pub fn has_keyboard(&self) -> bool {
        self.keyboard_key != Self::NO_KEY
    }
}

impl Default for CueAction {
    fn default() -> Self {
        Self {
            sound_program: None,
            mute_notes: Vec::new(),
            unmute_notes: Vec::new(),
            fader_channels: Vec::new(),
            fader_values: Vec::new(),
            keyboard_key: Self::NO_KEY,
            audio_file: None,
            lights: LightGroup::default(),
        }
    }
}
