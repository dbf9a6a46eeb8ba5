use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::types::{ParticipantId, ScoreTotals};

const CURRENT_VERSION: u8 = 2;
const LEGACY_VERSION: u8 = 1;

/// Cross-session score totals keyed by stable participant identity.
/// Writes are last-write-wins per identity.
pub trait ScoreStore: Send {
    fn load(&self, participant_id: &str) -> Option<ScoreTotals>;

    fn record(&mut self, entries: &[(ParticipantId, ScoreTotals)]) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryScoreStore {
    totals: HashMap<ParticipantId, ScoreTotals>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: &[(&str, ScoreTotals)]) -> Self {
        Self {
            totals: entries
                .iter()
                .map(|(id, totals)| (id.to_string(), *totals))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn load(&self, participant_id: &str) -> Option<ScoreTotals> {
        self.totals.get(participant_id).copied()
    }

    fn record(&mut self, entries: &[(ParticipantId, ScoreTotals)]) -> Result<(), StoreError> {
        for (id, totals) in entries {
            self.totals.insert(id.clone(), *totals);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredScoreEntry {
    #[serde(rename = "nonImpostor", alias = "non_impostor")]
    non_impostor: u32,
    impostor: u32,
    #[serde(rename = "updatedAtMs", alias = "updated_at_ms", default)]
    updated_at_ms: i64,
}

/// The historical shape, from before roles were split into impostor and
/// non-impostor points.
#[derive(Clone, Debug, Deserialize)]
struct LegacyScoreEntry {
    #[serde(default)]
    acting: u32,
    #[serde(default)]
    guessing: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScoreFile<'a> {
    version: u8,
    participants: &'a HashMap<ParticipantId, StoredScoreEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct ScoreFileRaw {
    version: u8,
    #[serde(default)]
    participants: HashMap<String, serde_json::Value>,
    #[serde(default)]
    players: HashMap<String, serde_json::Value>,
}

pub struct JsonScoreStore {
    file_path: PathBuf,
    entries: HashMap<ParticipantId, StoredScoreEntry>,
}

impl JsonScoreStore {
    pub fn new(file_path: PathBuf) -> Self {
        let entries = load_entries(&file_path);
        Self { file_path, entries }
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let payload = ScoreFile {
            version: CURRENT_VERSION,
            participants: &self.entries,
        };
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&self.file_path, text).map_err(|source| StoreError::Io {
            path: self.file_path.display().to_string(),
            source,
        })
    }
}

impl ScoreStore for JsonScoreStore {
    fn load(&self, participant_id: &str) -> Option<ScoreTotals> {
        self.entries.get(participant_id).map(|entry| ScoreTotals {
            non_impostor: entry.non_impostor,
            impostor: entry.impostor,
        })
    }

    fn record(&mut self, entries: &[(ParticipantId, ScoreTotals)]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let now_ms = Utc::now().timestamp_millis();
        for (id, totals) in entries {
            let key = id.trim();
            if key.is_empty() {
                continue;
            }
            self.entries.insert(
                key.to_string(),
                StoredScoreEntry {
                    non_impostor: totals.non_impostor,
                    impostor: totals.impostor,
                    updated_at_ms: now_ms,
                },
            );
        }
        self.save()
    }
}

fn load_entries(path: &Path) -> HashMap<ParticipantId, StoredScoreEntry> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), %error, "failed to read score file");
            }
            return HashMap::new();
        }
    };
    let parsed = match serde_json::from_str::<ScoreFileRaw>(&text) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "failed to parse score file");
            return HashMap::new();
        }
    };

    match parsed.version {
        CURRENT_VERSION => parse_current(parsed.participants, path),
        LEGACY_VERSION => {
            tracing::info!(
                path = %path.display(),
                entries = parsed.players.len(),
                "migrating legacy score file"
            );
            migrate_legacy(parsed.players, path)
        }
        other => {
            tracing::warn!(path = %path.display(), version = other, "unsupported score file version");
            HashMap::new()
        }
    }
}

fn parse_current(
    raw: HashMap<String, serde_json::Value>,
    path: &Path,
) -> HashMap<ParticipantId, StoredScoreEntry> {
    let mut entries = HashMap::new();
    for (key, value) in raw {
        let key = key.trim().to_string();
        if key.is_empty() {
            continue;
        }
        match serde_json::from_value::<StoredScoreEntry>(value) {
            Ok(entry) => {
                entries.insert(key, entry);
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), participant = %key, %error, "skipping score entry");
            }
        }
    }
    entries
}

fn migrate_legacy(
    raw: HashMap<String, serde_json::Value>,
    path: &Path,
) -> HashMap<ParticipantId, StoredScoreEntry> {
    let mut entries = HashMap::new();
    for (key, value) in raw {
        let key = key.trim().to_string();
        if key.is_empty() {
            continue;
        }
        match serde_json::from_value::<LegacyScoreEntry>(value) {
            Ok(legacy) => {
                entries.insert(
                    key,
                    StoredScoreEntry {
                        non_impostor: legacy.guessing,
                        impostor: legacy.acting,
                        updated_at_ms: 0,
                    },
                );
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), participant = %key, %error, "skipping legacy score entry");
            }
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(non_impostor: u32, impostor: u32) -> ScoreTotals {
        ScoreTotals {
            non_impostor,
            impostor,
        }
    }

    #[test]
    fn record_then_reload_round_trips_through_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("scores.json");

        let mut store = JsonScoreStore::new(path.clone());
        assert!(store.load("p1").is_none());
        store
            .record(&[("p1".to_string(), totals(4, 5))])
            .expect("write succeeds");

        let reopened = JsonScoreStore::new(path);
        assert_eq!(reopened.load("p1"), Some(totals(4, 5)));
    }

    #[test]
    fn later_write_overwrites_earlier_one() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scores.json");
        let mut store = JsonScoreStore::new(path.clone());
        store
            .record(&[("p1".to_string(), totals(10, 0))])
            .expect("first write");
        store
            .record(&[("p1".to_string(), totals(1, 1))])
            .expect("second write");
        assert_eq!(JsonScoreStore::new(path).load("p1"), Some(totals(1, 1)));
    }

    #[test]
    fn legacy_file_is_migrated_on_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scores.json");
        let raw = r#"{
  "version": 1,
  "players": {
    "alice": { "acting": 5, "guessing": 7 },
    "bob": { "guessing": 2 },
    "   ": { "acting": 1, "guessing": 1 }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = JsonScoreStore::new(path);
        assert_eq!(store.load("alice"), Some(totals(7, 5)));
        assert_eq!(store.load("bob"), Some(totals(2, 0)));
        assert_eq!(store.entries.len(), 2);
    }

    #[test]
    fn invalid_entries_are_skipped() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scores.json");
        let raw = r#"{
  "version": 2,
  "participants": {
    "valid": { "nonImpostor": 3, "impostor": 0, "updatedAtMs": 10 },
    "broken": { "nonImpostor": -1 }
  }
}"#;
        fs::write(&path, raw).expect("write file");

        let store = JsonScoreStore::new(path);
        assert_eq!(store.load("valid"), Some(totals(3, 0)));
        assert!(store.load("broken").is_none());
    }

    #[test]
    fn unknown_version_starts_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scores.json");
        fs::write(&path, r#"{"version": 9, "participants": {}}"#).expect("write file");
        let store = JsonScoreStore::new(path);
        assert!(store.entries.is_empty());
    }

    #[test]
    fn memory_store_overwrites_per_identity() {
        let mut store = MemoryScoreStore::with_entries(&[("p1", totals(1, 0))]);
        store
            .record(&[("p1".to_string(), totals(2, 3)), ("p2".to_string(), totals(0, 5))])
            .expect("memory write");
        assert_eq!(store.load("p1"), Some(totals(2, 3)));
        assert_eq!(store.len(), 2);
    }
}
