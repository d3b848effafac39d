//! House light effects driven through the remote light API.

pub mod light_controller;

pub use light_controller::{LightEffectController, LightState, RAINBOW_STEPS};
