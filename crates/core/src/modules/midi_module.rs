use std::collections::HashMap;

use async_trait::async_trait;
use midir::{Ignore, MidiInput, MidiInputConnection};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::protocol::msc::{self, SYSEX_START};
use crate::protocol::ProtocolError;

/// Listens for MIDI Show Control sysex on the first input port whose name contains
/// `device_name`.
pub struct MidiInputModule {
    device_name: String,
    // Mutex only to make the struct Sync (the ALSA connection is Send but not Sync)
    input_connection: Mutex<Option<MidiInputConnection<()>>>,
    status: HashMap<String, String>,
}

impl MidiInputModule {
    pub fn new(device_name: String) -> Self {
        Self {
            device_name,
            input_connection: Mutex::new(None),
            status: HashMap::new(),
        }
    }

    fn connect(
        &mut self,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut midi_in = MidiInput::new("cuebridge")?;
        // sysex is filtered out by default
        midi_in.ignore(Ignore::None);

        let in_port = midi_in
            .ports()
            .into_iter()
            .find(|port| {
                midi_in
                    .port_name(port)
                    .map(|name| name.contains(&self.device_name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| format!("{} input not found", self.device_name))?;
        let port_name = midi_in.port_name(&in_port)?;

        let connection = midi_in
            .connect(
                &in_port,
                "cuebridge-msc-input",
                move |_timestamp, message, _| handle_sysex(message, &tx),
                (),
            )
            .map_err(|e| format!("failed to connect MIDI input: {}", e))?;

        *self.input_connection.get_mut() = Some(connection);
        Ok(port_name)
    }
}

/// Decode one raw MIDI message from the driver callback and forward it.
fn handle_sysex(message: &[u8], tx: &mpsc::Sender<ModuleMessage>) {
    if message.first() != Some(&SYSEX_START) {
        return;
    }

    match msc::decode_sysex(message) {
        Ok(decoded) => {
            log::debug!("MSC {} cue {}", decoded.command, decoded.cue);
            // the driver thread must not block
            if let Err(e) = tx.try_send(ModuleMessage::Trigger(decoded.into_event())) {
                log::warn!("dropping MSC trigger: {}", e);
            }
        }
        Err(ProtocolError::MalformedPacket { .. }) => {
            log::debug!("ignoring non-MSC sysex ({} bytes)", message.len());
        }
        Err(e) => log::warn!("dropping MSC message: {}", e),
    }
}

#[async_trait]
impl AsyncModule for MidiInputModule {
    fn id(&self) -> ModuleId {
        ModuleId::MidiIn
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        log::info!("Initializing MIDI input for device: {}", self.device_name);

        self.status
            .insert("device_name".to_string(), self.device_name.clone());
        self.status
            .insert("status".to_string(), "initialized".to_string());
        self.status
            .insert("connected".to_string(), "false".to_string());

        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match self.connect(tx.clone()) {
            Ok(port_name) => {
                log::info!("MIDI input '{}' connected", port_name);
                self.status
                    .insert("connected".to_string(), "true".to_string());
                self.status.insert("port".to_string(), port_name.clone());
                let _ = tx
                    .send(ModuleMessage::Status(format!(
                        "MIDI input '{}' connected",
                        port_name
                    )))
                    .await;
            }
            Err(e) => {
                // keep running so the OSC input and outputs still work
                let error_msg = format!(
                    "Failed to connect MIDI input '{}': {}",
                    self.device_name, e
                );
                let _ = tx.send(ModuleMessage::Error(error_msg)).await;
            }
        }

        while let Some(event) = rx.recv().await {
            match event {
                ModuleEvent::Shutdown => {
                    log::debug!("MIDI input received shutdown signal");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(connection) = self.input_connection.get_mut().take() {
            connection.close();
        }

        self.status
            .insert("status".to_string(), "shutdown".to_string());
        self.status
            .insert("connected".to_string(), "false".to_string());

        log::info!("MIDI input shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}
