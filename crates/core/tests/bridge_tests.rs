mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use common::{RecordingLights, RecordingRelay};
use cuebridge_core::{
    AsyncModule, CueBridge, CueCommand, CueEvent, CueKey, CueTable, CueTableStore, Dispatcher,
    LightApiSink, LightEffectController, LightState, ModuleEvent, ModuleId, ModuleMessage,
    OscRelaySink, OutboundProtocolSink, Outputs,
};

/// Input that fires a fixed list of triggers as soon as it runs.
struct ScriptedInput {
    triggers: Vec<(CueCommand, &'static str)>,
}

#[async_trait]
impl AsyncModule for ScriptedInput {
    fn id(&self) -> ModuleId {
        ModuleId::OscIn
    }

    async fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    async fn run(
        &mut self,
        mut rx: mpsc::Receiver<ModuleEvent>,
        tx: mpsc::Sender<ModuleMessage>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        for (command, cue) in &self.triggers {
            tx.send(ModuleMessage::Trigger(CueEvent::new(
                *command,
                CueKey::parse(cue),
            )))
            .await?;
        }
        // runs until shutdown or the manager goes away
        let _ = rx.recv().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn status(&self) -> HashMap<String, String> {
        HashMap::new()
    }
}

async fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if done() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_triggers_flow_from_module_to_outputs() {
    let yaml = r#"
cue-mapping:
  - cue: 2
    houselights: [1]
    rgbws: [[1, 2, 3, 4]]
    effects: ["Custom Rainbow"]
"#;
    let store = Arc::new(CueTableStore::new(CueTable::from_yaml(yaml).unwrap()));
    let relay = Arc::new(RecordingRelay::default());
    let lights = Arc::new(RecordingLights::default());
    let controller = Arc::new(LightEffectController::new(
        Arc::clone(&lights) as Arc<dyn LightApiSink>,
        4,
        None,
        Duration::from_secs(1),
    ));
    let outputs = Outputs {
        relay: Some(Arc::clone(&relay) as Arc<dyn OutboundProtocolSink>),
        lights: Some(Arc::clone(&controller)),
        ..Default::default()
    };

    let mut bridge = CueBridge::new(Dispatcher::new(store, outputs, Duration::from_secs(1)));
    bridge.register_module(Box::new(ScriptedInput {
        triggers: vec![(CueCommand::Stop, "1"), (CueCommand::Go, "2")],
    }));
    bridge.initialize().await.unwrap();
    assert!(bridge.is_running());

    assert!(wait_until(|| relay.relayed.lock().len() == 2).await);
    {
        let relayed = relay.relayed.lock();
        assert!(relayed.contains(&(CueCommand::Stop, "1".to_string())));
        assert!(relayed.contains(&(CueCommand::Go, "2".to_string())));
    }
    assert!(wait_until(|| !lights.calls.lock().is_empty()).await);
    assert_eq!(controller.state(1), Some(LightState::RunningLoop));

    bridge.shutdown().await.unwrap();
    assert!(!bridge.is_running());
    assert!(wait_until(|| controller.state(1) == Some(LightState::Idle)).await);
}

#[tokio::test]
async fn test_osc_relay_echoes_over_udp() {
    let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let relay = OscRelaySink::bind(listener.local_addr().unwrap())
        .await
        .unwrap();
    let store = Arc::new(CueTableStore::default());
    let dispatcher = Dispatcher::new(
        store,
        Outputs {
            relay: Some(Arc::new(relay) as Arc<dyn OutboundProtocolSink>),
            ..Default::default()
        },
        Duration::from_secs(1),
    );

    for task in dispatcher.dispatch(&CueEvent::new(CueCommand::Go, CueKey::parse("5.0"))) {
        task.await.unwrap();
    }

    let mut buf = [0u8; 512];
    let (len, _) = listener.recv_from(&mut buf).await.unwrap();
    let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
    match packet {
        rosc::OscPacket::Message(msg) => {
            assert_eq!(msg.addr, "/msc/go/5");
            assert_eq!(
                msg.args,
                vec![
                    rosc::OscType::Double(5.0),
                    rosc::OscType::String("go".to_string())
                ]
            );
        }
        other => panic!("unexpected packet {:?}", other),
    }
}
