use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::cue::{CueAction, LightGroup};
use super::cue_key::CueKey;
use crate::config::{BridgeConfig, ConfigError, ConfigManager, CueMappingEntry};
use crate::keyboard_map;

/// Immutable mapping from cue key to the actions it triggers.
///
/// Tables are built wholesale from configuration and never edited in place; a
/// reload publishes a brand new table through [`CueTableStore`].
#[derive(Debug, Clone, Default)]
pub struct CueTable {
    entries: HashMap<String, Arc<CueAction>>,
}

impl CueTable {
    /// Build a table from the `cue-mapping` section of a parsed configuration.
    pub fn from_config(config: &BridgeConfig) -> Self {
        let mut entries = HashMap::with_capacity(config.cue_mapping.len());

        for entry in &config.cue_mapping {
            if entry.cue.is_empty() {
                log::warn!("skipping cue mapping entry without a cue number");
                continue;
            }

            let action = Self::build_action(entry);
            if entries.insert(entry.cue.clone(), Arc::new(action)).is_some() {
                log::warn!("cue[{}] is mapped more than once, using the last entry", entry.cue);
            }
        }

        Self { entries }
    }

    /// Parse a configuration document and build its cue table.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigManager::parse(content)?;
        Ok(Self::from_config(&config))
    }

    fn build_action(entry: &CueMappingEntry) -> CueAction {
        let keyboard_key = match entry.keyboard.as_deref() {
            Some(name) => {
                let code = keyboard_map::key_code(name);
                if code == keyboard_map::NO_KEY {
                    log::warn!(
                        "unrecognised keyboard key {:?} on cue[{}], ignoring",
                        name,
                        entry.cue
                    );
                }
                code
            }
            None => CueAction::NO_KEY,
        };

        CueAction {
            sound_program: (entry.sound != 0).then_some(entry.sound),
            mute_notes: entry.mute.clone(),
            unmute_notes: entry.unmute.clone(),
            fader_channels: entry.fader.clone(),
            fader_values: entry.value.clone(),
            keyboard_key,
            audio_file: entry.file.clone().filter(|path| !path.as_os_str().is_empty()),
            lights: LightGroup {
                light_ids: entry.houselights.clone(),
                rgbws: entry.rgbws.clone(),
                transitions: entry.transitions.clone(),
                effects: entry.effects.clone(),
            },
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<CueAction>> {
        self.entries.get(key)
    }

    /// Look a cue up by its canonical key, falling back to the alternate key.
    ///
    /// `None` is the routine outcome for cues that have no mapping.
    pub fn resolve(&self, key: &CueKey) -> Option<Arc<CueAction>> {
        for candidate in key.candidates() {
            if let Some(action) = self.entries.get(candidate) {
                if candidate != key.canonical() {
                    log::debug!("cue[{}] matched alternate key [{}]", key, candidate);
                }
                return Some(Arc::clone(action));
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds the currently published cue table.
///
/// Readers take a snapshot (`Arc` clone) and keep using it for the whole dispatch,
/// so a concurrent reload can never expose a partially built table.
pub struct CueTableStore {
    current: RwLock<Arc<CueTable>>,
    generation: AtomicU64,
}

impl CueTableStore {
    pub fn new(table: CueTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<CueTable> {
        Arc::clone(&self.current.read())
    }

    /// Replace the published table and return the new generation number.
    pub fn publish(&self, table: CueTable) -> u64 {
        let table = Arc::new(table);
        let previous = std::mem::replace(&mut *self.current.write(), table);
        drop(previous);
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Apply the outcome of a rebuild. A failed build keeps the current table.
    pub fn reload(&self, rebuilt: Result<CueTable, ConfigError>) -> Result<u64, ConfigError> {
        match rebuilt {
            Ok(table) => {
                let cues = table.len();
                let generation = self.publish(table);
                log::info!("cue table reloaded: {} cues (generation {})", cues, generation);
                Ok(generation)
            }
            Err(e) => {
                log::error!("failed to rebuild cue table, keeping previous table: {}", e);
                Err(e)
            }
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for CueTableStore {
    fn default() -> Self {
        Self::new(CueTable::default())
    }
}
