use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::roster::Team;
use crate::storage::{load_json, save_json};

const COMPONENT: &str = "team-store";

pub struct TeamStore {
    file_path: Option<PathBuf>,
    teams: HashMap<String, Team>,
}

impl TeamStore {
    pub fn new(file_path: PathBuf) -> Self {
        let teams = load_teams(&file_path);
        Self {
            file_path: Some(file_path),
            teams,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            file_path: None,
            teams: HashMap::new(),
        }
    }

    pub fn save(&mut self, team: Team) {
        self.teams.insert(team.id.clone(), team);
        if let Some(path) = self.file_path.as_ref() {
            save_json(path, &self.teams, COMPONENT);
        }
    }

    pub fn get(&self, team_id: &str) -> Option<&Team> {
        self.teams.get(team_id)
    }

    pub fn all(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.teams.values().cloned().collect();
        teams.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        teams
    }
}

fn load_teams(path: &Path) -> HashMap<String, Team> {
    let Some(raw) = load_json::<HashMap<String, serde_json::Value>>(path, COMPONENT) else {
        return HashMap::new();
    };

    let mut teams = HashMap::new();
    for (stored_key, raw_value) in raw {
        let team: Team = match serde_json::from_value(raw_value) {
            Ok(team) => team,
            Err(error) => {
                log::warn!(
                    "[{COMPONENT}] skipping team '{stored_key}' in {}: {error}",
                    path.display()
                );
                continue;
            }
        };
        if !team.roles_are_unique() {
            log::warn!("[{COMPONENT}] skipping team '{stored_key}': duplicate roles");
            continue;
        }
        teams.insert(team.id.clone(), team);
    }
    teams
}
