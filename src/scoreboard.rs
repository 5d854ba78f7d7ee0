use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{load_json, now_ms, save_json};

const COMPONENT: &str = "scoreboard";
pub const DEFAULT_TOP_LIMIT: usize = 10;
pub const MAX_TOP_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentScore {
    pub agent: String,
    pub points: u64,
    #[serde(rename = "updatedAt", alias = "updated_at")]
    pub updated_at: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoreboardResponse {
    #[serde(rename = "generatedAtIso")]
    pub generated_at_iso: String,
    pub entries: Vec<AgentScore>,
}

pub struct AgentScoreboard {
    file_path: Option<PathBuf>,
    agents: HashMap<String, AgentScore>,
}

impl AgentScoreboard {
    pub fn new(file_path: PathBuf) -> Self {
        let agents = load_agents(&file_path);
        log::debug!(
            "[{COMPONENT}] loaded {} agents from {}",
            agents.len(),
            file_path.display()
        );
        Self {
            file_path: Some(file_path),
            agents,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            agents: HashMap::new(),
        }
    }

    pub fn get(&self, agent: &str) -> Option<&AgentScore> {
        self.agents.get(&agent_key(agent))
    }

    pub fn add_points(&mut self, agent: &str, delta: i64) -> Option<AgentScore> {
        let current = self.get(agent).map(|entry| entry.points).unwrap_or(0);
        let total = current.saturating_add_signed(delta);
        self.set_points(agent, total)
    }

    pub fn set_points(&mut self, agent: &str, total: u64) -> Option<AgentScore> {
        let key = agent_key(agent);
        if key.is_empty() {
            return None;
        }
        let entry = AgentScore {
            agent: agent.trim().to_string(),
            points: total,
            updated_at: now_ms(),
        };
        self.agents.insert(key, entry.clone());
        self.save();
        Some(entry)
    }

    pub fn top(&self, requested_limit: Option<usize>) -> Vec<AgentScore> {
        let limit = requested_limit
            .unwrap_or(DEFAULT_TOP_LIMIT)
            .clamp(1, MAX_TOP_LIMIT);
        let mut entries: Vec<AgentScore> = self.agents.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.agent.to_lowercase().cmp(&b.agent.to_lowercase()))
        });
        entries.truncate(limit);
        entries
    }

    pub fn build_response(&self, requested_limit: Option<usize>) -> ScoreboardResponse {
        ScoreboardResponse {
            generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            entries: self.top(requested_limit),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    fn save(&self) {
        if let Some(path) = self.file_path.as_ref() {
            save_json(path, &self.agents, COMPONENT);
        }
    }
}

fn agent_key(agent: &str) -> String {
    agent.trim().to_lowercase()
}

fn load_agents(path: &std::path::Path) -> HashMap<String, AgentScore> {
    let Some(raw) = load_json::<HashMap<String, serde_json::Value>>(path, COMPONENT) else {
        return HashMap::new();
    };

    let mut merged = HashMap::<String, AgentScore>::new();
    for (stored_key, raw_value) in raw {
        let entry: AgentScore = match serde_json::from_value(raw_value) {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!(
                    "[{COMPONENT}] skipping entry '{stored_key}' in {}: {error}",
                    path.display()
                );
                continue;
            }
        };
        let agent = entry.agent.trim().to_string();
        let key = agent_key(&agent);
        if key.is_empty() {
            continue;
        }

        match merged.get_mut(&key) {
            Some(current) => {
                current.points = current.points.saturating_add(entry.points);
                if entry.updated_at >= current.updated_at {
                    current.agent = agent;
                    current.updated_at = entry.updated_at;
                }
            }
            None => {
                merged.insert(
                    key,
                    AgentScore {
                        agent,
                        points: entry.points,
                        updated_at: entry.updated_at,
                    },
                );
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::storage::temp_file;

    #[test]
    fn points_accumulate_and_clamp_at_zero() {
        let path = temp_file("scoreboard-add", "scoreboard.json");
        let mut board = AgentScoreboard::new(path.clone());
        board.add_points("Alice", 120);
        board.add_points(" alice ", -20);
        assert_eq!(board.get("ALICE").map(|entry| entry.points), Some(100));

        let entry = board.add_points("Alice", -500).expect("named agent");
        assert_eq!(entry.points, 0);
        assert!(board.add_points("   ", 10).is_none());
        assert_eq!(board.len(), 1);

        let reloaded = AgentScoreboard::new(path.clone());
        assert_eq!(reloaded.get("alice").map(|entry| entry.points), Some(0));

        let _ = fs::remove_dir_all(path.parent().expect("parent exists"));
    }

    #[test]
    fn adding_to_a_huge_total_saturates_instead_of_wrapping() {
        let mut board = AgentScoreboard::in_memory();
        board.set_points("Ada", u64::MAX);
        let entry = board.add_points("Ada", 1).expect("named agent");
        assert_eq!(entry.points, u64::MAX);

        board.set_points("Ada", i64::MAX as u64 + 10);
        let entry = board.add_points("Ada", -5).expect("named agent");
        assert_eq!(entry.points, i64::MAX as u64 + 5);
    }

    #[test]
    fn top_sorts_by_points_then_name_and_clamps_limit() {
        let mut board = AgentScoreboard::in_memory();
        board.set_points("bob", 50);
        board.set_points("Carol", 90);
        board.set_points("alice", 50);

        let names: Vec<String> = board.top(None).into_iter().map(|e| e.agent).collect();
        assert_eq!(names, vec!["Carol", "alice", "bob"]);
        assert_eq!(board.top(Some(0)).len(), 1);
        assert_eq!(board.top(Some(999)).len(), 3);
        assert_eq!(board.build_response(Some(2)).entries.len(), 2);
    }

    #[test]
    fn load_merges_case_insensitive_names_and_skips_broken_entries() {
        let path = temp_file("scoreboard-load", "scoreboard.json");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        let raw = r#"{
  "alice": { "agent": "alice", "points": 40, "updatedAt": 10 },
  "ALICE ": { "agent": " Alice ", "points": 60, "updatedAt": 20 },
  "broken": { "agent": "Broken", "points": -5 },
  "blank": { "agent": "  ", "points": 5, "updatedAt": 1 }
}"#;
        fs::write(&path, raw).expect("write file");

        let board = AgentScoreboard::new(path.clone());
        assert_eq!(board.len(), 1);
        let alice = board.get("alice").expect("merged");
        assert_eq!(alice.points, 100);
        assert_eq!(alice.agent, "Alice");
        assert_eq!(alice.updated_at, 20);

        let _ = fs::remove_dir_all(&parent);
    }

    #[test]
    fn unreadable_file_starts_empty() {
        let path = temp_file("scoreboard-bad", "scoreboard.json");
        let parent = path.parent().expect("parent exists").to_path_buf();
        fs::create_dir_all(&parent).expect("create dir");
        fs::write(&path, "[1, 2, 3]").expect("write file");

        let board = AgentScoreboard::new(path.clone());
        assert!(board.is_empty());

        let _ = fs::remove_dir_all(&parent);
    }
}
