use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::modules::{AsyncModule, ModuleManager, ModuleMessage};

/// Ties the input modules to the dispatcher.
///
/// Modules push decoded triggers into the module manager's channel; a single
/// handler task takes them off in arrival order and dispatches each one.
pub struct CueBridge {
    dispatcher: Arc<Dispatcher>,
    module_manager: ModuleManager,
    message_handler: Option<JoinHandle<()>>,
    is_running: bool,
}

impl CueBridge {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            module_manager: ModuleManager::new(),
            message_handler: None,
            is_running: false,
        }
    }

    pub fn register_module(&mut self, module: Box<dyn AsyncModule>) {
        self.module_manager.register_module(module);
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Initialize and start all modules, then begin dispatching.
    pub async fn initialize(&mut self) -> Result<(), anyhow::Error> {
        log::info!("Starting cue bridge...");

        self.module_manager
            .initialize()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        self.module_manager
            .start()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        if let Some(message_rx) = self.module_manager.take_message_receiver() {
            let dispatcher = Arc::clone(&self.dispatcher);
            self.message_handler = Some(tokio::spawn(Self::message_loop(message_rx, dispatcher)));
        }

        self.is_running = true;
        log::info!("Cue bridge running");
        Ok(())
    }

    async fn message_loop(
        mut message_rx: mpsc::Receiver<ModuleMessage>,
        dispatcher: Arc<Dispatcher>,
    ) {
        while let Some(message) = message_rx.recv().await {
            Self::handle_module_message(message, &dispatcher);
        }
    }

    fn handle_module_message(message: ModuleMessage, dispatcher: &Dispatcher) {
        match message {
            ModuleMessage::Trigger(event) => {
                // sub-actions run detached
                drop(dispatcher.dispatch(&event));
            }
            ModuleMessage::Status(status) => {
                log::info!("Module status: {}", status);
            }
            ModuleMessage::Error(error) => {
                log::error!("Module error: {}", error);
            }
        }
    }

    /// Stop the inputs, then cancel running light effects.
    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        if !self.is_running {
            return Ok(());
        }

        log::info!("Shutting down cue bridge...");

        self.module_manager
            .shutdown()
            .await
            .map_err(|e| anyhow::anyhow!(e))?;

        if let Some(handle) = self.message_handler.take() {
            handle.abort();
        }

        if let Some(lights) = &self.dispatcher.outputs().lights {
            lights.cancel_all();
        }

        self.is_running = false;
        log::info!("Cue bridge shutdown complete");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }
}
