use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::cue::cue::CueEvent;

/// Unique identifier for each input module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleId {
    MidiIn,
    OscIn,
}

/// Events the manager sends to modules
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    Shutdown,
}

/// Messages passed from modules to the bridge
#[derive(Debug)]
pub enum ModuleMessage {
    /// A decoded trigger ready for dispatch
    Trigger(CueEvent),
    Status(String),
    Error(String),
}

/// Trait that all async modules must implement
#[async_trait]
pub trait AsyncModule: Send + Sync {
    /// Get the unique identifier for this module
    fn id(&self) -> ModuleId;

    /// Initialize the module (called once at startup)
    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Run until a `Shutdown` event arrives
    async fn run(
        &mut self,
        rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Release devices and sockets
    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn status(&self) -> HashMap<String, String>;
}
