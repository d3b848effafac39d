use std::time::Duration;

use thiserror::Error;

use super::cue::{LightAction, LightEffect, LightGroup, Rgbw};

/// A cue sub-action whose parameters cannot be sent. Only that sub-action is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{parameter} list has {len} entries for {lights} lights (expected 1 or {lights})")]
    LengthMismatch {
        parameter: &'static str,
        lights: usize,
        len: usize,
    },

    #[error("no RGBW colour given for {lights} lights")]
    MissingRgbw { lights: usize },

    #[error("RGBW value needs 4 channels, got {0}")]
    RgbwChannelCount(usize),

    #[error("RGBW channel {channel} value {value} is outside 0-255")]
    RgbwOutOfRange { channel: usize, value: i64 },

    #[error("light {light_id} is outside 1-{count}")]
    LightOutOfRange { light_id: u8, count: usize },

    #[error("invalid transition time {0}")]
    InvalidTransition(f64),

    #[error("{kind} number {number} is outside 1-128")]
    MidiNumberOutOfRange { kind: &'static str, number: u8 },

    #[error("{faders} fader channels but {values} fader values")]
    FaderLengthMismatch { faders: usize, values: usize },

    #[error("fader {fader} value {value} is higher than 127")]
    FaderValueOutOfRange { fader: u8, value: u8 },
}

impl Rgbw {
    /// Validate a configured colour: exactly four channels, each within 0-255.
    pub fn from_values(values: &[i64]) -> Result<Self, ValidationError> {
        if values.len() != 4 {
            return Err(ValidationError::RgbwChannelCount(values.len()));
        }

        let mut channels = [0u8; 4];
        for (channel, (&value, slot)) in values.iter().zip(channels.iter_mut()).enumerate() {
            *slot = u8::try_from(value)
                .map_err(|_| ValidationError::RgbwOutOfRange { channel, value })?;
        }
        Ok(Rgbw(channels))
    }
}

/// Check a 1-based MIDI note/controller number from configuration and return the
/// 0-based wire value.
pub fn midi_number(kind: &'static str, number: u8) -> Result<u8, ValidationError> {
    if (1..=128).contains(&number) {
        Ok(number - 1)
    } else {
        Err(ValidationError::MidiNumberOutOfRange { kind, number })
    }
}

/// Longest transition or hold time accepted from configuration, one day.
pub const MAX_TIME_SECONDS: f64 = 86_400.0;

/// Convert a configured time in seconds. Negative, non-finite and over-long values
/// are rejected.
pub fn time_seconds(seconds: f64) -> Result<Duration, ValidationError> {
    if !(0.0..=MAX_TIME_SECONDS).contains(&seconds) {
        return Err(ValidationError::InvalidTransition(seconds));
    }
    Duration::try_from_secs_f64(seconds).map_err(|_| ValidationError::InvalidTransition(seconds))
}

/// Result of expanding a [`LightGroup`] into per-light actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpandedLights {
    pub actions: Vec<LightAction>,
    /// Lights whose own parameters were invalid; the other lights still run.
    pub rejected: Vec<(u8, ValidationError)>,
}

fn check_len(
    parameter: &'static str,
    len: usize,
    lights: usize,
    allow_empty: bool,
) -> Result<(), ValidationError> {
    if len == 1 || len == lights || (allow_empty && len == 0) {
        Ok(())
    } else {
        Err(ValidationError::LengthMismatch {
            parameter,
            lights,
            len,
        })
    }
}

/// Pick the value for light `index`: a single-element list broadcasts to every light.
fn pick<T>(values: &[T], index: usize) -> Option<&T> {
    if values.len() == 1 {
        values.first()
    } else {
        values.get(index)
    }
}

impl LightGroup {
    /// Expand the configured lists into one action per light.
    ///
    /// A list whose length is neither 1 nor the number of lights rejects the whole
    /// group. Invalid values for an individual light only reject that light.
    pub fn expand(&self, light_count: usize) -> Result<ExpandedLights, ValidationError> {
        let lights = self.light_ids.len();
        if lights == 0 {
            return Ok(ExpandedLights::default());
        }

        if self.rgbws.is_empty() {
            return Err(ValidationError::MissingRgbw { lights });
        }
        check_len("rgbws", self.rgbws.len(), lights, false)?;
        check_len("transitions", self.transitions.len(), lights, true)?;
        check_len("effects", self.effects.len(), lights, true)?;

        let mut expanded = ExpandedLights::default();
        for (index, &light_id) in self.light_ids.iter().enumerate() {
            match self.light_action(index, light_id, light_count) {
                Ok(action) => expanded.actions.push(action),
                Err(e) => expanded.rejected.push((light_id, e)),
            }
        }
        Ok(expanded)
    }

    fn light_action(
        &self,
        index: usize,
        light_id: u8,
        light_count: usize,
    ) -> Result<LightAction, ValidationError> {
        if light_id == 0 || light_id as usize > light_count {
            return Err(ValidationError::LightOutOfRange {
                light_id,
                count: light_count,
            });
        }

        let rgbw = match pick(&self.rgbws, index) {
            Some(values) => Rgbw::from_values(values)?,
            None => return Err(ValidationError::MissingRgbw { lights: 1 }),
        };

        let transition_seconds = pick(&self.transitions, index).copied().unwrap_or(0.0);
        time_seconds(transition_seconds)?;

        let effect = pick(&self.effects, index)
            .map(|name| LightEffect::from_name(name))
            .unwrap_or(LightEffect::None);

        Ok(LightAction {
            light_id,
            rgbw,
            transition_seconds,
            effect,
        })
    }
}
