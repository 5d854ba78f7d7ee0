use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{load_json, save_json};
use crate::types::GameMode;

const COMPONENT: &str = "team-results";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamResult {
    #[serde(rename = "teamId")]
    pub team_id: String,
    #[serde(rename = "teamName")]
    pub team_name: String,
    pub mode: GameMode,
    #[serde(rename = "timeSeconds")]
    pub time_seconds: u64,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u64,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

pub struct TeamResults {
    file_path: Option<PathBuf>,
    results: Vec<TeamResult>,
}

impl TeamResults {
    pub fn new(file_path: PathBuf) -> Self {
        let mut results = load_results(&file_path);
        sort_results(&mut results);
        Self {
            file_path: Some(file_path),
            results,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: TeamResult) {
        log::info!(
            "[{COMPONENT}] {} finished in {}s with {} eco points",
            result.team_name,
            result.time_seconds,
            result.eco_points
        );
        self.results.push(result);
        sort_results(&mut self.results);
        if let Some(path) = self.file_path.as_ref() {
            save_json(path, &self.results, COMPONENT);
        }
    }

    pub fn all(&self) -> &[TeamResult] {
        &self.results
    }
}

// Ties keep insertion order.
fn sort_results(results: &mut [TeamResult]) {
    results.sort_by_key(|result| result.time_seconds);
}

fn load_results(path: &Path) -> Vec<TeamResult> {
    let Some(raw) = load_json::<Vec<serde_json::Value>>(path, COMPONENT) else {
        return Vec::new();
    };
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<TeamResult>(value) {
            Ok(result) => Some(result),
            Err(error) => {
                log::warn!("[{COMPONENT}] skipping entry in {}: {error}", path.display());
                None
            }
        })
        .collect()
}
