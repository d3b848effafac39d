use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rodio::{Decoder, OutputStreamBuilder, Sink};

use super::traits::AudioSink;
use super::SinkError;

const SUPPORTED_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Plays clips on the default output device, one stream per clip.
///
/// Playback runs on the blocking pool and `play` resolves when the clip ends.
#[derive(Debug, Default)]
pub struct RodioAudioSink {
    base_dir: Option<PathBuf>,
}

impl RodioAudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative clip paths against `dir` (usually the config file's directory).
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Only mp3 and wav clips are played.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn play_blocking(path: &Path) -> Result<(), SinkError> {
    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| SinkError::Audio(format!("cannot decode {}: {}", path.display(), e)))?;

    let mut stream = OutputStreamBuilder::open_default_stream()
        .map_err(|e| SinkError::Audio(format!("failed to open audio output stream: {}", e)))?;
    stream.log_on_drop(false);

    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[async_trait]
impl AudioSink for RodioAudioSink {
    async fn play(&self, path: &Path) -> Result<(), SinkError> {
        if !is_supported(path) {
            return Err(SinkError::UnsupportedAudio(path.to_path_buf()));
        }

        let path = self.resolve(path);
        log::info!("playing audio file {}", path.display());

        let clip = path.clone();
        tokio::task::spawn_blocking(move || play_blocking(&clip))
            .await
            .map_err(|e| SinkError::Audio(format!("playback task failed: {}", e)))??;

        log::debug!("finished playing {}", path.display());
        Ok(())
    }
}
