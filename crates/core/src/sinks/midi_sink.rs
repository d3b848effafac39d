use async_trait::async_trait;
use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;

use super::traits::MidiSink;
use super::SinkError;
use crate::midi::midi::MidiMessage;

/// MIDI output port, found by (partial) port name.
pub struct MidiOutputSink {
    port_name: String,
    connection: Mutex<MidiOutputConnection>,
}

impl MidiOutputSink {
    pub fn connect(device_name: &str) -> Result<Self, SinkError> {
        let midi_out =
            MidiOutput::new("cuebridge").map_err(|e| SinkError::Midi(e.to_string()))?;

        let out_port = midi_out
            .ports()
            .into_iter()
            .find(|port| {
                midi_out
                    .port_name(port)
                    .map(|name| name.contains(device_name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| SinkError::Midi(format!("{} output not found", device_name)))?;

        let port_name = midi_out
            .port_name(&out_port)
            .unwrap_or_else(|_| device_name.to_string());

        let connection = midi_out
            .connect(&out_port, "cuebridge-output")
            .map_err(|e| SinkError::Midi(format!("failed to connect {}: {}", port_name, e)))?;

        log::info!("MIDI output '{}' connected", port_name);

        Ok(Self {
            port_name,
            connection: Mutex::new(connection),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl MidiSink for MidiOutputSink {
    async fn send(&self, message: MidiMessage) -> Result<(), SinkError> {
        let bytes = message.to_bytes();
        self.connection
            .lock()
            .send(&bytes)
            .map_err(|e| SinkError::Midi(format!("{} on {}", e, self.port_name)))?;
        log::debug!("sent {:?} to {}", message, self.port_name);
        Ok(())
    }
}
