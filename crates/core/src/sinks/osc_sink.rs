use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use super::traits::OutboundProtocolSink;
use super::SinkError;
use crate::cue::cue::CueCommand;
use crate::cue::cue_key::CueKey;
use crate::protocol::osc;

/// Relays every trigger as `/msc/<command>/<cue>` over UDP.
pub struct OscRelaySink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl OscRelaySink {
    pub async fn bind(target: SocketAddr) -> Result<Self, SinkError> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        log::info!("relaying cues as OSC to {}", target);
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl OutboundProtocolSink for OscRelaySink {
    async fn relay(&self, command: CueCommand, cue: &CueKey) -> Result<(), SinkError> {
        let msg = osc::echo_message(command, cue);
        let addr = msg.addr.clone();
        let bytes = osc::encode_message(msg).map_err(|e| SinkError::Osc(e.to_string()))?;

        self.socket.send_to(&bytes, self.target).await?;
        log::debug!("sent OSC {} to {}", addr, self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relay_reaches_listener() {
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = OscRelaySink::bind(listener.local_addr().unwrap())
            .await
            .unwrap();

        sink.relay(CueCommand::Go, &CueKey::parse("5.0_label"))
            .await
            .unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = listener.recv_from(&mut buf).await.unwrap();
        let messages = osc::decode_packet(&buf[..len]).unwrap();
        assert_eq!(messages[0].addr, "/msc/go/5");
    }
}
