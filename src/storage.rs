use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_DATA_DIR: &str = ".data";
pub const SCOREBOARD_FILE: &str = "eeq_scoreboard_v1.json";
pub const TEAMS_FILE: &str = "eeq_teams_v1.json";
pub const TEAM_RESULTS_FILE: &str = "eeq_team_leaderboard_v1.json";

pub fn default_path(file_name: &str) -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR).join(file_name)
}

/// Reads a JSON document. Missing, unreadable or malformed files yield `None`;
/// anything other than a missing file is logged under `component`.
pub fn load_json<T: DeserializeOwned>(path: &Path, component: &str) -> Option<T> {
    let text = match fs::read_to_string(path) {
        Ok(value) => value,
        Err(error) => {
            if error.kind() != std::io::ErrorKind::NotFound {
                log::warn!("[{component}] failed to read {}: {error}", path.display());
            }
            return None;
        }
    };
    match serde_json::from_str::<T>(&text) {
        Ok(value) => Some(value),
        Err(error) => {
            log::warn!("[{component}] failed to parse {}: {error}", path.display());
            None
        }
    }
}

pub fn save_json<T: Serialize>(path: &Path, value: &T, component: &str) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(error) = fs::create_dir_all(parent) {
                log::error!(
                    "[{component}] failed to create parent dir {}: {error}",
                    parent.display()
                );
                return;
            }
        }
    }

    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            if let Err(error) = fs::write(path, text) {
                log::error!("[{component}] failed to write {}: {error}", path.display());
            }
        }
        Err(error) => {
            log::error!(
                "[{component}] failed to serialize payload for {}: {error}",
                path.display()
            );
        }
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
pub(crate) fn temp_file(name: &str, file_name: &str) -> PathBuf {
    let unique = format!(
        "{}-{}-{}",
        name,
        std::process::id(),
        now_ms().saturating_add(rand::random::<u32>() as u64)
    );
    std::env::temp_dir().join(unique).join(file_name)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn save_then_load_creates_missing_dirs() {
        let path = temp_file("storage-save", "doc.json");
        let mut doc = BTreeMap::new();
        doc.insert("alpha".to_string(), 3u32);
        save_json(&path, &doc, "storage-test");

        let loaded: BTreeMap<String, u32> = load_json(&path, "storage-test").expect("loads");
        assert_eq!(loaded, doc);

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn missing_or_malformed_file_yields_none() {
        let path = temp_file("storage-missing", "doc.json");
        assert!(load_json::<Vec<u32>>(&path, "storage-test").is_none());

        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, "{ not json").expect("write file");
        assert!(load_json::<Vec<u32>>(&path, "storage-test").is_none());

        let _ = fs::remove_dir_all(&parent);
    }
}
