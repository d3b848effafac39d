use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};

const CHANNEL_CAPACITY: usize = 1000;

type StatusMap = Arc<Mutex<HashMap<ModuleId, HashMap<String, String>>>>;

/// Owns the input modules, runs each in its own task and funnels their output
/// into a single message channel.
pub struct ModuleManager {
    modules: HashMap<ModuleId, Box<dyn AsyncModule>>,
    module_handles: HashMap<ModuleId, JoinHandle<()>>,
    module_senders: HashMap<ModuleId, mpsc::Sender<ModuleEvent>>,
    message_receiver: Option<mpsc::Receiver<ModuleMessage>>,
    message_sender: mpsc::Sender<ModuleMessage>,
    last_status: StatusMap,
    running: bool,
}

impl ModuleManager {
    pub fn new() -> Self {
        let (message_sender, message_receiver) = mpsc::channel(CHANNEL_CAPACITY);

        Self {
            modules: HashMap::new(),
            module_handles: HashMap::new(),
            module_senders: HashMap::new(),
            message_receiver: Some(message_receiver),
            message_sender,
            last_status: Arc::new(Mutex::new(HashMap::new())),
            running: false,
        }
    }

    /// Register a new module with the manager
    pub fn register_module(&mut self, module: Box<dyn AsyncModule>) {
        let id = module.id();
        if self.modules.insert(id, module).is_some() {
            log::warn!("Module {:?} registered twice, replacing the earlier one", id);
        }
    }

    /// Initialize all registered modules
    pub async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for (id, module) in &mut self.modules {
            match module.initialize().await {
                Ok(_) => log::info!("Module {:?} initialized", id),
                Err(e) => {
                    log::error!("Failed to initialize module {:?}: {}", id, e);
                    return Err(format!("{:?} module error: {}", id, e).into());
                }
            }
            self.last_status.lock().insert(*id, module.status());
        }
        Ok(())
    }

    /// Start every module in its own task
    pub async fn start(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.running {
            return Err("Module manager is already running".into());
        }

        for (id, mut module) in std::mem::take(&mut self.modules) {
            let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
            let message_tx = self.message_sender.clone();
            let last_status = Arc::clone(&self.last_status);

            let handle = tokio::spawn(async move {
                if let Err(e) = module.run(event_rx, message_tx.clone()).await {
                    let _ = message_tx
                        .send(ModuleMessage::Error(format!("Module {:?} error: {}", id, e)))
                        .await;
                }
                if let Err(e) = module.shutdown().await {
                    log::error!("Module {:?} shutdown error: {}", id, e);
                }
                last_status.lock().insert(id, module.status());
            });

            self.module_handles.insert(id, handle);
            self.module_senders.insert(id, event_tx);
        }

        self.running = true;
        Ok(())
    }

    /// Broadcast an event to all modules
    pub async fn broadcast_event(&self, event: ModuleEvent) {
        for (id, sender) in &self.module_senders {
            if let Err(e) = sender.send(event.clone()).await {
                log::warn!("Failed to send event to module {:?}: {}", id, e);
            }
        }
    }

    /// Get the message receiver (should only be called once)
    pub fn take_message_receiver(&mut self) -> Option<mpsc::Receiver<ModuleMessage>> {
        self.message_receiver.take()
    }

    /// Shutdown all modules gracefully
    pub async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.running {
            return Ok(());
        }

        log::info!("Shutting down input modules...");
        self.broadcast_event(ModuleEvent::Shutdown).await;

        for (id, handle) in std::mem::take(&mut self.module_handles) {
            log::debug!("Waiting for module {:?} to stop...", id);
            if let Err(e) = handle.await {
                log::error!("Module {:?} task failed: {}", id, e);
            }
        }
        self.module_senders.clear();

        self.running = false;
        log::info!("Input modules stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Status reported by each module after initialization or shutdown
    pub fn get_status(&self) -> HashMap<ModuleId, HashMap<String, String>> {
        self.last_status.lock().clone()
    }
}

impl Default for ModuleManager {
    fn default() -> Self {
        Self::new()
    }
}
