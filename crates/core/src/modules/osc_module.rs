use std::collections::HashMap;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use super::traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
use crate::protocol::osc;

const MAX_PACKET_SIZE: usize = 4096;

/// Listens for OSC triggers on a UDP socket.
pub struct OscInputModule {
    bind: SocketAddr,
    address: String,
    socket: Option<UdpSocket>,
    status: HashMap<String, String>,
}

impl OscInputModule {
    /// `address` is the OSC address that fires cues, or `*` for any address.
    pub fn new(bind: SocketAddr, address: String) -> Self {
        Self {
            bind,
            address,
            socket: None,
            status: HashMap::new(),
        }
    }

    /// Address the socket is actually bound to, once initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    async fn handle_packet(
        &self,
        packet: &[u8],
        from: SocketAddr,
        tx: &mpsc::Sender<ModuleMessage>,
    ) {
        let messages = match osc::decode_packet(packet) {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("dropping OSC packet from {}: {}", from, e);
                return;
            }
        };

        for message in &messages {
            match osc::decode_trigger(message, &self.address) {
                Ok(event) => {
                    if tx.send(ModuleMessage::Trigger(event)).await.is_err() {
                        return;
                    }
                }
                Err(e) => log::warn!("dropping OSC message from {}: {}", from, e),
            }
        }
    }
}

#[async_trait]
impl AsyncModule for OscInputModule {
    fn id(&self) -> ModuleId {
        ModuleId::OscIn
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let socket = UdpSocket::bind(self.bind).await?;
        let local = socket.local_addr()?;
        log::info!("OSC input listening on {} for {}", local, self.address);

        self.status
            .insert("listening".to_string(), local.to_string());
        self.status
            .insert("address".to_string(), self.address.clone());
        self.socket = Some(socket);
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let socket = self
            .socket
            .take()
            .ok_or("OSC input was not initialized")?;
        let mut buf = vec![0u8; MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(ModuleEvent::Shutdown) | None => break,
                },
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, from)) => self.handle_packet(&buf[..len], from, &tx).await,
                    Err(e) => log::warn!("OSC receive failed: {}", e),
                },
            }
        }

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.socket = None;
        self.status
            .insert("status".to_string(), "shutdown".to_string());
        log::info!("OSC input shutdown complete");
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        self.status.clone()
    }
}
