use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cuebridge_core::{
    AudioSink, BridgeConfig, ConfigManager, ConfigWatcher, CueBridge, CueTable, CueTableStore,
    Dispatcher, FileConfigSource, HomeAssistantLights, KeyboardSink, LightApiSink,
    LightEffectController, LogKeyboardSink, MidiInputModule, MidiOutput, MidiOutputConfig,
    MidiOutputSink, MidiSink, OscInputModule, OscRelaySink, OutboundProtocolSink, Outputs,
    RodioAudioSink, DEFAULT_DEBOUNCE,
};
use tokio_util::sync::CancellationToken;

/// Relays MIDI Show Control and OSC cue triggers to a sound desk, house lights,
/// audio clips and keyboard shortcuts.
#[derive(Parser, Debug)]
#[command(name = "cuebridge")]
#[command(about = "Show-control cue bridge")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Do not reload the cue mapping when the configuration file changes
    #[arg(long, default_value = "false")]
    no_watch: bool,
}

fn connect_midi(label: &str, config: &MidiOutputConfig) -> Option<MidiOutput> {
    match MidiOutputSink::connect(&config.name) {
        Ok(sink) => {
            log::info!("{} output '{}' on channel {}", label, sink.port_name(), config.channel);
            Some(MidiOutput {
                sink: Arc::new(sink) as Arc<dyn MidiSink>,
                channel: config.channel,
            })
        }
        Err(e) => {
            log::error!("{} output '{}' unavailable: {}", label, config.name, e);
            None
        }
    }
}

/// Open every configured output. An output that cannot be opened is logged and
/// left out; the rest of the bridge keeps working.
async fn build_outputs(config: &BridgeConfig, config_dir: &Path) -> Outputs {
    let settings = &config.outputs;
    let timeout = settings.sink_timeout();
    let mut outputs = Outputs::default();

    if let Some(midi) = &settings.midi_pc {
        outputs.sound_desk = connect_midi("Sound desk", midi);
    }
    if let Some(qlab) = &settings.qlab {
        outputs.qlab = connect_midi("QLab", qlab);
    }

    if let Some(osc) = &settings.osc {
        match OscRelaySink::bind(osc.target()).await {
            Ok(relay) => {
                log::info!("Relaying triggers to {}", relay.target());
                outputs.relay = Some(Arc::new(relay) as Arc<dyn OutboundProtocolSink>);
            }
            Err(e) => log::error!("OSC relay to {} unavailable: {}", osc.target(), e),
        }
    }

    if settings.audio_files {
        let audio = RodioAudioSink::with_base_dir(config_dir);
        outputs.audio = Some(Arc::new(audio) as Arc<dyn AudioSink>);
    }
    if settings.keyboard_commands {
        outputs.keyboard = Some(Arc::new(LogKeyboardSink) as Arc<dyn KeyboardSink>);
    }

    if let Some(homeassistant) = &settings.homeassistant {
        match HomeAssistantLights::new(homeassistant, timeout) {
            Ok(api) => {
                log::info!("House lights via {}", api.endpoint());
                let dwell = config.lights.rainbow_dwell();
                outputs.lights = Some(Arc::new(LightEffectController::new(
                    Arc::new(api) as Arc<dyn LightApiSink>,
                    config.lights.count,
                    dwell,
                    timeout,
                )));
            }
            Err(e) => log::error!("Light API unavailable: {}", e),
        }
    }

    outputs
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .parse_default_env()
        .init();

    let mut config_manager = ConfigManager::new(Some(args.config.clone()));
    let config = config_manager
        .load()
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let config_dir = args
        .config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let table = CueTable::from_config(&config);
    log::info!("Loaded {} cues from {}", table.len(), args.config.display());
    let store = Arc::new(CueTableStore::new(table));

    let outputs = build_outputs(&config, &config_dir).await;
    let dispatcher = Dispatcher::new(Arc::clone(&store), outputs, config.outputs.sink_timeout());

    let mut bridge = CueBridge::new(dispatcher);
    if let Some(device) = &config.midi_in {
        bridge.register_module(Box::new(MidiInputModule::new(device.clone())));
    }
    if let Some(osc_in) = &config.osc_in {
        bridge.register_module(Box::new(OscInputModule::new(osc_in.bind, osc_in.address.clone())));
    }
    if config.midi_in.is_none() && config.osc_in.is_none() {
        log::warn!("No inputs configured, nothing will trigger cues");
    }

    let cancel = CancellationToken::new();
    let watcher = if args.no_watch {
        None
    } else {
        let source = FileConfigSource::new(&args.config).with_startup_settings(config.clone());
        Some(
            ConfigWatcher::spawn(
                &args.config,
                Arc::new(source),
                Arc::clone(&store),
                DEFAULT_DEBOUNCE,
                cancel.clone(),
            )
            .context("failed to watch configuration file")?,
        )
    };

    bridge.initialize().await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    log::info!("Ctrl-C received, shutting down");

    cancel.cancel();
    bridge.shutdown().await?;
    if let Some(watcher) = watcher {
        watcher.join().await;
    }

    Ok(())
}
