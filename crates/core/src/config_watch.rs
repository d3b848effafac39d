//! Hot reload of the cue mapping.
//!
//! The watcher observes the directory holding the configuration file, since editors
//! often save by writing a new file and renaming it over the old one. Bursts of
//! events are collapsed into one reload after a quiet period.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{BridgeConfig, ConfigError, ConfigManager};
use crate::cue::cue_table::{CueTable, CueTableStore};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Somewhere a cue table can be rebuilt from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<CueTable, ConfigError>;
}

/// The YAML configuration file on disk.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    startup: Option<BridgeConfig>,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            startup: None,
        }
    }

    /// Remember the settings the process started with, so a reload can point out
    /// edits that only take effect after a restart.
    pub fn with_startup_settings(mut self, config: BridgeConfig) -> Self {
        self.startup = Some(config);
        self
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<CueTable, ConfigError> {
        let config = ConfigManager::read(&self.path)?;
        if let Some(startup) = &self.startup {
            if !startup.same_settings(&config) {
                log::info!("input/output settings changed, restart to apply them");
            }
        }
        Ok(CueTable::from_config(&config))
    }
}

/// Keeps the file watcher alive and owns the reload task.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path` and republish the cue table whenever it changes.
    ///
    /// A reload that fails to read or parse is logged and the previous table stays
    /// in service.
    pub fn spawn(
        path: &Path,
        source: Arc<dyn ConfigSource>,
        store: Arc<CueTableStore>,
        debounce: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, ConfigError> {
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| ConfigError::NotAFile(path.to_path_buf()))?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (fs_tx, fs_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = fs_tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        log::info!("watching {} for cue mapping changes", path.display());

        let task = tokio::spawn(watch_loop(
            fs_rx, file_name, source, store, debounce, cancel,
        ));

        Ok(Self {
            _watcher: watcher,
            task,
        })
    }

    /// Wait for the reload task to exit after its cancel token fired.
    pub async fn join(self) {
        let ConfigWatcher {
            _watcher: watcher,
            task,
        } = self;
        drop(watcher);
        if let Err(e) = task.await {
            log::error!("config watcher task failed: {}", e);
        }
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    !matches!(event.kind, EventKind::Access(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

async fn watch_loop(
    mut fs_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    file_name: OsString,
    source: Arc<dyn ConfigSource>,
    store: Arc<CueTableStore>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = fs_rx.recv() => match event {
                Some(Ok(event)) => {
                    if touches(&event, &file_name) {
                        deadline = Some(Instant::now() + debounce);
                    }
                }
                Some(Err(e)) => log::warn!("config watch error: {}", e),
                None => break,
            },
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                if deadline.is_some() =>
            {
                deadline = None;
                let source = Arc::clone(&source);
                let rebuilt = tokio::task::spawn_blocking(move || source.load()).await;
                match rebuilt {
                    Ok(rebuilt) => {
                        let _ = store.reload(rebuilt);
                    }
                    Err(e) => log::error!("cue table rebuild panicked: {}", e),
                }
            }
        }
    }

    log::debug!("config watcher stopped");
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const FIRST: &str = "cue-mapping:\n  - { cue: 1, sound: 1 }\n";
    const SECOND: &str = "cue-mapping:\n  - { cue: 1, sound: 1 }\n  - { cue: 2, sound: 2 }\n";

    /// Save the way editors do: write a sibling file and rename it into place.
    fn replace(path: &Path, content: &str) {
        let staged = path.with_extension("yaml.tmp");
        fs::write(&staged, content).unwrap();
        fs::rename(&staged, path).unwrap();
    }

    async fn wait_for_generation(store: &CueTableStore, generation: u64) -> bool {
        for _ in 0..100 {
            if store.generation() >= generation {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[test]
    fn test_file_source_builds_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, SECOND).unwrap();

        let table = FileConfigSource::new(&path).load().unwrap();
        assert_eq!(table.len(), 2);

        let missing = FileConfigSource::new(dir.path().join("missing.yaml"));
        assert!(matches!(missing.load(), Err(ConfigError::ReadError { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_edit_republishes_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, FIRST).unwrap();

        let source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new(&path));
        let store = Arc::new(CueTableStore::new(source.load().unwrap()));
        let cancel = CancellationToken::new();
        let watcher = ConfigWatcher::spawn(
            &path,
            source,
            Arc::clone(&store),
            Duration::from_millis(50),
            cancel.clone(),
        )
        .unwrap();

        replace(&path, SECOND);
        assert!(wait_for_generation(&store, 1).await);
        assert_eq!(store.snapshot().len(), 2);

        cancel.cancel();
        watcher.join().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_broken_edit_keeps_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, FIRST).unwrap();

        let source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new(&path));
        let store = Arc::new(CueTableStore::new(source.load().unwrap()));
        let cancel = CancellationToken::new();
        let watcher = ConfigWatcher::spawn(
            &path,
            source,
            Arc::clone(&store),
            Duration::from_millis(50),
            cancel.clone(),
        )
        .unwrap();

        replace(&path, "cue-mapping: [ { sound: \"loud\" } ]");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.generation(), 0);
        assert_eq!(store.snapshot().len(), 1);

        replace(&path, SECOND);
        assert!(wait_for_generation(&store, 1).await);
        assert_eq!(store.snapshot().len(), 2);

        cancel.cancel();
        watcher.join().await;
    }

    #[tokio::test]
    async fn test_path_without_file_name_is_rejected() {
        let store = Arc::new(CueTableStore::default());
        let source: Arc<dyn ConfigSource> = Arc::new(FileConfigSource::new("/"));

        let result = ConfigWatcher::spawn(
            Path::new("/"),
            source,
            store,
            DEFAULT_DEBOUNCE,
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(ConfigError::NotAFile(path)) if path == Path::new("/")));
    }

    #[test]
    fn test_touches_filters_other_files() {
        let name = OsString::from("config.yaml");
        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/show/config.yaml"));
        assert!(touches(&event, &name));

        let other = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/show/notes.txt"));
        assert!(!touches(&other, &name));

        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/show/config.yaml"));
        assert!(!touches(&access, &name));
    }
}
