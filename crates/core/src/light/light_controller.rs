use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cue::cue::{LightAction, LightEffect, Rgbw};
use crate::cue::validation::{time_seconds, ValidationError};
use crate::sinks::{with_timeout, LightApiSink};

/// Colour steps of the custom rainbow loop.
pub const RAINBOW_STEPS: [Rgbw; 12] = [
    Rgbw([255, 0, 0, 0]),
    Rgbw([255, 128, 0, 0]),
    Rgbw([255, 255, 0, 0]),
    Rgbw([128, 255, 0, 0]),
    Rgbw([0, 255, 0, 0]),
    Rgbw([0, 255, 128, 0]),
    Rgbw([0, 255, 255, 0]),
    Rgbw([0, 128, 255, 0]),
    Rgbw([0, 0, 255, 0]),
    Rgbw([128, 0, 255, 0]),
    Rgbw([255, 0, 255, 0]),
    Rgbw([255, 0, 128, 0]),
];

/// Seconds shaved off each rainbow fade, and added to the dwell, so the next step
/// starts once the previous fade has settled.
const RAINBOW_MARGIN: f64 = 0.1;

/// What a light's current owner is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightState {
    Idle,
    RunningOneShot,
    RunningLoop,
}

struct SlotOwner {
    token: CancellationToken,
    generation: u64,
    state: LightState,
}

struct LightSlot {
    /// Held by whichever effect task is currently sending to this light.
    owner: Arc<tokio::sync::Mutex<()>>,
    current: Mutex<SlotOwner>,
}

impl LightSlot {
    fn new(token: CancellationToken) -> Self {
        Self {
            owner: Arc::new(tokio::sync::Mutex::new(())),
            current: Mutex::new(SlotOwner {
                token,
                generation: 0,
                state: LightState::Idle,
            }),
        }
    }
}

/// Runs light effects against the light API, one owner per light.
///
/// Applying an effect cancels whatever the light was doing. The new effect waits
/// until the previous task has let go of the light, so commands from two effects
/// never interleave on the same light.
pub struct LightEffectController {
    api: Arc<dyn LightApiSink>,
    slots: Vec<Arc<LightSlot>>,
    rainbow_dwell: Option<Duration>,
    call_timeout: Duration,
    shutdown: CancellationToken,
}

impl LightEffectController {
    pub fn new(
        api: Arc<dyn LightApiSink>,
        light_count: usize,
        rainbow_dwell: Option<Duration>,
        call_timeout: Duration,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let slots = (0..light_count)
            .map(|_| Arc::new(LightSlot::new(shutdown.child_token())))
            .collect();

        Self {
            api,
            slots,
            rainbow_dwell,
            call_timeout,
            shutdown,
        }
    }

    pub fn light_count(&self) -> usize {
        self.slots.len()
    }

    /// Current state of a light, `None` for an unknown light number.
    pub fn state(&self, light_id: u8) -> Option<LightState> {
        self.slot(light_id).map(|slot| slot.current.lock().state)
    }

    fn slot(&self, light_id: u8) -> Option<&Arc<LightSlot>> {
        (light_id as usize)
            .checked_sub(1)
            .and_then(|index| self.slots.get(index))
    }

    /// Take ownership of a light and start the requested effect.
    ///
    /// The returned handle completes when the effect has finished or was cancelled.
    pub fn apply(&self, action: LightAction) -> Result<JoinHandle<()>, ValidationError> {
        let slot = self
            .slot(action.light_id)
            .ok_or(ValidationError::LightOutOfRange {
                light_id: action.light_id,
                count: self.slots.len(),
            })?;

        let transition = time_seconds(action.transition_seconds)?;
        let dwell = self
            .rainbow_dwell
            .unwrap_or_else(|| transition + Duration::from_secs_f64(RAINBOW_MARGIN));

        let (token, generation) = {
            let mut current = slot.current.lock();
            current.token.cancel();
            current.token = self.shutdown.child_token();
            current.generation += 1;
            current.state = match action.effect {
                LightEffect::CustomRainbow => LightState::RunningLoop,
                _ => LightState::RunningOneShot,
            };
            (current.token.clone(), current.generation)
        };

        log::debug!(
            "light {} -> {} ({:?}, {}s)",
            action.light_id,
            action.effect.name(),
            action.rgbw,
            action.transition_seconds
        );

        let runner = EffectRunner {
            api: Arc::clone(&self.api),
            light_id: action.light_id,
            call_timeout: self.call_timeout,
            token,
        };
        let slot = Arc::clone(slot);

        Ok(tokio::spawn(async move {
            let _owner = slot.owner.clone().lock_owned().await;
            if !runner.token.is_cancelled() {
                runner.run(action, transition, dwell).await;
            }

            let mut current = slot.current.lock();
            if current.generation == generation {
                current.state = LightState::Idle;
            }
        }))
    }

    /// Stop every running effect. Used on shutdown.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for LightEffectController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct EffectRunner {
    api: Arc<dyn LightApiSink>,
    light_id: u8,
    call_timeout: Duration,
    token: CancellationToken,
}

impl EffectRunner {
    async fn run(&self, action: LightAction, transition: Duration, dwell: Duration) {
        let transition_seconds = action.transition_seconds;

        match &action.effect {
            LightEffect::None => {
                if self.send(Rgbw::OFF, 0.0, LightEffect::NONE_NAME).await {
                    self.send(action.rgbw, transition_seconds, LightEffect::NONE_NAME)
                        .await;
                }
            }
            LightEffect::LightBoardControl => {
                if self
                    .send(action.rgbw, transition_seconds, LightEffect::NONE_NAME)
                    .await
                    && self.wait(transition).await
                {
                    self.send(action.rgbw, 0.0, LightEffect::LIGHT_BOARD_CONTROL_NAME)
                        .await;
                }
            }
            LightEffect::CustomRainbow => {
                let fade = (transition_seconds - RAINBOW_MARGIN).max(0.0);
                if dwell.is_zero() {
                    log::warn!("light {}: rainbow with no dwell, not starting", self.light_id);
                    return;
                }
                self.rainbow(fade, dwell).await;
            }
            LightEffect::Named(name) => {
                if self.send(Rgbw::OFF, 0.0, LightEffect::NONE_NAME).await {
                    self.send(action.rgbw, transition_seconds, name).await;
                }
            }
        }
    }

    async fn rainbow(&self, fade: f64, dwell: Duration) {
        if !self.send(Rgbw::OFF, 0.0, LightEffect::NONE_NAME).await {
            return;
        }

        for step in RAINBOW_STEPS.iter().cycle() {
            if !self.send(*step, fade, LightEffect::NONE_NAME).await {
                break;
            }
            if !self.wait(dwell).await {
                break;
            }
        }
        log::debug!("light {}: rainbow stopped", self.light_id);
    }

    /// Send one command unless the effect was cancelled. Returns whether the effect
    /// should keep going; a failed call is logged and does not stop it.
    async fn send(&self, rgbw: Rgbw, transition_seconds: f64, effect: &str) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        let call = self
            .api
            .set_color(self.light_id, rgbw, transition_seconds, effect);
        if let Err(e) = with_timeout("light", self.call_timeout, call).await {
            log::error!("light {}: {}", self.light_id, e);
        }
        true
    }

    /// Sleep for `duration`, returning false if the effect was cancelled meanwhile.
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
