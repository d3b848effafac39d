mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{HangingMidi, Harness, LightCall, SOUND_CHANNEL};
use cuebridge_core::{
    keyboard_map, CueCommand, CueEvent, CueKey, CueTable, LightState, MidiMessage, MidiSink, Rgbw,
    RAINBOW_STEPS,
};

const SHOW: &str = r#"
cue-mapping:
  - cue: "5"
    sound: 3
    houselights: [1, 2]
    rgbws: [[255, 0, 0, 0]]
    transitions: [1.0]
    effects: ["None"]
  - cue: 6
    houselights: [4, 5, 6]
    rgbws: [[0, 0, 255, 0]]
    transitions: [2.5]
  - cue: 7
    sound: 2
    houselights: [4, 5, 6]
    rgbws: [[0, 0, 255, 0]]
    transitions: [2.5, 1.0]
  - cue: 8
    keyboard: "space"
    file: "clips/door.wav"
  - cue: 9
    sound: 4
    keyboard: "nope"
  - cue: 20
    houselights: [3]
    rgbws: [[0, 0, 0, 0]]
    transitions: [1.0]
    effects: ["Custom Rainbow"]
  - cue: 21
    houselights: [3]
    rgbws: [[10, 20, 30, 40]]
    transitions: [0.5]
    effects: ["None"]
"#;

const RED: Rgbw = Rgbw([255, 0, 0, 0]);
const BLUE: Rgbw = Rgbw([0, 0, 255, 0]);

#[tokio::test]
async fn test_go_drives_sound_desk_and_lights() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "5").await;

    assert_eq!(
        *harness.midi.sent.lock(),
        vec![MidiMessage::ProgramChange {
            channel: SOUND_CHANNEL,
            program: 2
        }]
    );

    for light in [1u8, 2] {
        assert_eq!(
            harness.lights.calls_for(light),
            vec![
                LightCall::new(light, Rgbw::OFF, 0.0, "None"),
                LightCall::new(light, RED, 1.0, "None"),
            ]
        );
    }
    assert_eq!(harness.lights.calls.lock().len(), 4);
    assert_eq!(
        *harness.relay.relayed.lock(),
        vec![(CueCommand::Go, "5".to_string())]
    );
}

#[tokio::test]
async fn test_labelled_trigger_uses_alternate_key() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "5.0_House to half").await;

    assert_eq!(harness.midi.sent.lock().len(), 1);
    assert_eq!(
        *harness.relay.relayed.lock(),
        vec![(CueCommand::Go, "5.0".to_string())]
    );
}

#[tokio::test]
async fn test_single_transition_applies_to_every_light() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "6").await;

    for light in [4u8, 5, 6] {
        assert_eq!(
            harness.lights.calls_for(light)[1],
            LightCall::new(light, BLUE, 2.5, "None")
        );
    }
}

#[tokio::test]
async fn test_mismatched_transitions_skip_only_lights() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "7").await;

    assert!(harness.lights.calls.lock().is_empty());
    assert_eq!(
        *harness.midi.sent.lock(),
        vec![MidiMessage::ProgramChange {
            channel: SOUND_CHANNEL,
            program: 1
        }]
    );
}

#[tokio::test]
async fn test_other_commands_are_only_relayed() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Stop, "5").await;
    harness.fire(CueCommand::Resume, "5").await;
    harness.fire(CueCommand::Macro, "5").await;

    assert!(harness.midi.sent.lock().is_empty());
    assert!(harness.lights.calls.lock().is_empty());
    assert_eq!(
        *harness.relay.relayed.lock(),
        vec![
            (CueCommand::Stop, "5".to_string()),
            (CueCommand::Resume, "5".to_string()),
            (CueCommand::Macro, "5".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unmapped_cue_is_only_relayed() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "99").await;

    assert!(harness.midi.sent.lock().is_empty());
    assert!(harness.lights.calls.lock().is_empty());
    assert!(harness.keyboard.pressed.lock().is_empty());
    assert_eq!(harness.relay.relayed.lock().len(), 1);
}

#[tokio::test]
async fn test_keyboard_and_audio() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "8").await;

    assert_eq!(
        *harness.keyboard.pressed.lock(),
        vec![keyboard_map::key_code("space")]
    );
    assert_eq!(
        *harness.audio.played.lock(),
        vec![PathBuf::from("clips/door.wav")]
    );
}

#[tokio::test]
async fn test_unknown_key_name_never_presses() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "9").await;

    assert!(harness.keyboard.pressed.lock().is_empty());
    assert_eq!(
        *harness.midi.sent.lock(),
        vec![MidiMessage::ProgramChange {
            channel: SOUND_CHANNEL,
            program: 3
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_rainbow_then_none_never_interleave() {
    let harness = Harness::new(SHOW);
    let target = Rgbw([10, 20, 30, 40]);

    // leave the rainbow running in the background
    let rainbow = harness
        .dispatcher
        .dispatch(&CueEvent::new(CueCommand::Go, CueKey::parse("20")));
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(harness.controller.state(3), Some(LightState::RunningLoop));

    harness.fire(CueCommand::Go, "21").await;
    for task in rainbow {
        task.await.unwrap();
    }

    let calls = harness.lights.calls_for(3);
    let (head, tail) = calls.split_at(calls.len() - 2);
    assert_eq!(
        tail,
        [
            LightCall::new(3, Rgbw::OFF, 0.0, "None"),
            LightCall::new(3, target, 0.5, "None"),
        ]
    );
    assert_eq!(head[0], LightCall::new(3, Rgbw::OFF, 0.0, "None"));
    assert!(head.len() > 2);
    for call in &head[1..] {
        assert!(RAINBOW_STEPS.contains(&call.rgbw));
    }
    assert_eq!(harness.controller.state(3), Some(LightState::Idle));
}

#[tokio::test(start_paused = true)]
async fn test_hung_sound_desk_does_not_block_other_outputs() {
    let harness = Harness::with_midi(SHOW, Some(Arc::new(HangingMidi) as Arc<dyn MidiSink>));

    let started = tokio::time::Instant::now();
    harness.fire(CueCommand::Go, "5").await;

    // the hung program change only costs its own timeout
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(harness.lights.calls.lock().len(), 4);
    assert_eq!(harness.relay.relayed.lock().len(), 1);
}

#[tokio::test]
async fn test_reload_between_dispatches() {
    let harness = Harness::new(SHOW);

    harness.fire(CueCommand::Go, "5").await;
    harness
        .store
        .publish(CueTable::from_yaml("cue-mapping:\n  - { cue: 5, sound: 10 }\n").unwrap());
    harness.fire(CueCommand::Go, "5").await;

    assert_eq!(
        *harness.midi.sent.lock(),
        vec![
            MidiMessage::ProgramChange {
                channel: SOUND_CHANNEL,
                program: 2
            },
            MidiMessage::ProgramChange {
                channel: SOUND_CHANNEL,
                program: 9
            },
        ]
    );
}
