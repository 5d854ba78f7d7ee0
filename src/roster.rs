use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::storage::now_ms;
use crate::types::{Difficulty, GameMode, RoomId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    EnergyEngineer,
    Recycler,
    WaterGuardian,
    Architect,
    PolicyMaker,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::EnergyEngineer,
        Role::Recycler,
        Role::WaterGuardian,
        Role::Architect,
        Role::PolicyMaker,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "energy_engineer" => Some(Self::EnergyEngineer),
            "recycler" => Some(Self::Recycler),
            "water_guardian" => Some(Self::WaterGuardian),
            "architect" => Some(Self::Architect),
            "policy_maker" => Some(Self::PolicyMaker),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::EnergyEngineer => "Energy Engineer",
            Self::Recycler => "Recycler",
            Self::WaterGuardian => "Water Guardian",
            Self::Architect => "Architect",
            Self::PolicyMaker => "Policy Maker",
        }
    }

    pub fn room(self) -> RoomId {
        match self {
            Self::EnergyEngineer => RoomId::Energy,
            Self::Recycler => RoomId::Waste,
            Self::WaterGuardian => RoomId::Water,
            Self::Architect => RoomId::Shelter,
            Self::PolicyMaker => RoomId::Policy,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error("'{0}' is not a member of this team")]
    NotAMember(String),
    #[error("the {} role is already taken", .0.label())]
    RoleTaken(Role),
    #[error("only the team leader can start the mission")]
    NotLeader,
    #[error("every member must be ready with a role before starting")]
    NotEveryoneReady,
    #[error("the mission has already started")]
    AlreadyStarted,
    #[error("chat messages cannot be empty")]
    EmptyMessage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub ready: bool,
}

impl Member {
    pub fn new(name: &str) -> Self {
        Self {
            id: make_member_id(),
            name: name.to_string(),
            role: None,
            ready: false,
        }
    }
}

pub fn make_member_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(16)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motto: Option<String>,
    #[serde(rename = "leaderId")]
    pub leader_id: String,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub members: Vec<Member>,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
    #[serde(rename = "startedAt", default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusEvent {
    #[serde(rename = "team:update")]
    TeamUpdate { team: Team },
    #[serde(rename = "team:start")]
    TeamStart {
        #[serde(rename = "teamId")]
        team_id: String,
        #[serde(rename = "startedAt")]
        started_at: u64,
    },
    #[serde(rename = "chat:message")]
    ChatMessage {
        #[serde(rename = "teamId")]
        team_id: String,
        from: String,
        text: String,
        ts: u64,
    },
}

/// Lower-cased name with each whitespace run turned into `-`, then the first
/// four characters of the leader id.
pub fn team_code(name: &str, leader_id: &str) -> String {
    let mut code = String::with_capacity(name.len() + 5);
    let mut in_whitespace = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                code.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        code.extend(ch.to_lowercase());
    }
    code.push('-');
    code.extend(leader_id.chars().take(4));
    code
}

impl Team {
    pub fn create(name: &str, leader: Member) -> Self {
        Self {
            id: team_code(name, &leader.id),
            name: name.to_string(),
            motto: None,
            leader_id: leader.id.clone(),
            mode: GameMode::Team,
            difficulty: Difficulty::Beginner,
            members: vec![leader],
            created_at: now_ms(),
            started_at: None,
        }
    }

    pub fn update_event(&self) -> BusEvent {
        BusEvent::TeamUpdate { team: self.clone() }
    }

    pub fn member(&self, member_id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == member_id)
    }

    pub fn is_leader(&self, member_id: &str) -> bool {
        self.leader_id == member_id
    }

    pub fn join(&mut self, member: Member) -> Option<BusEvent> {
        if self.member(&member.id).is_some() {
            return None;
        }
        log::debug!("[roster] {} joined {}", member.name, self.id);
        self.members.push(member);
        Some(self.update_event())
    }

    pub fn toggle_ready(&mut self, member_id: &str) -> Result<BusEvent, RosterError> {
        let member = self.member_mut(member_id)?;
        member.ready = !member.ready;
        Ok(self.update_event())
    }

    pub fn assign_role(&mut self, member_id: &str, role: Role) -> Result<BusEvent, RosterError> {
        self.member(member_id)
            .ok_or_else(|| RosterError::NotAMember(member_id.to_string()))?;
        if self.members.iter().any(|member| member.role == Some(role)) {
            return Err(RosterError::RoleTaken(role));
        }
        let member = self.member_mut(member_id)?;
        member.role = Some(role);
        Ok(self.update_event())
    }

    pub fn everyone_ready(&self) -> bool {
        !self.members.is_empty()
            && self
                .members
                .iter()
                .all(|member| member.ready && member.role.is_some())
    }

    pub fn start(&mut self, requester_id: &str) -> Result<BusEvent, RosterError> {
        if !self.is_leader(requester_id) {
            return Err(RosterError::NotLeader);
        }
        if self.started_at.is_some() {
            return Err(RosterError::AlreadyStarted);
        }
        if !self.everyone_ready() {
            return Err(RosterError::NotEveryoneReady);
        }
        let started_at = now_ms();
        self.started_at = Some(started_at);
        log::info!(
            "[roster] team {} started with {} members",
            self.id,
            self.members.len()
        );
        Ok(BusEvent::TeamStart {
            team_id: self.id.clone(),
            started_at,
        })
    }

    pub fn chat(&self, member_id: &str, text: &str) -> Result<BusEvent, RosterError> {
        let member = self
            .member(member_id)
            .ok_or_else(|| RosterError::NotAMember(member_id.to_string()))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RosterError::EmptyMessage);
        }
        Ok(BusEvent::ChatMessage {
            team_id: self.id.clone(),
            from: member.name.clone(),
            text: text.to_string(),
            ts: now_ms(),
        })
    }

    pub fn apply(&mut self, event: &BusEvent) -> bool {
        match event {
            BusEvent::TeamUpdate { team } if team.id == self.id && *team != *self => {
                *self = team.clone();
                true
            }
            BusEvent::TeamStart {
                team_id,
                started_at,
            } if *team_id == self.id && self.started_at.is_none() => {
                self.started_at = Some(*started_at);
                true
            }
            _ => false,
        }
    }

    pub fn roles_are_unique(&self) -> bool {
        let mut seen = Vec::with_capacity(self.members.len());
        for role in self.members.iter().filter_map(|member| member.role) {
            if seen.contains(&role) {
                return false;
            }
            seen.push(role);
        }
        true
    }

    fn member_mut(&mut self, member_id: &str) -> Result<&mut Member, RosterError> {
        self.members
            .iter_mut()
            .find(|member| member.id == member_id)
            .ok_or_else(|| RosterError::NotAMember(member_id.to_string()))
    }
}

pub fn parse_bus_event(raw: &str) -> Option<BusEvent> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let event_type = object.get("type")?.as_str()?;

    match event_type {
        "team:update" => {
            let team: Team = serde_json::from_value(object.get("team")?.clone()).ok()?;
            if team.id.trim().is_empty() || !team.roles_are_unique() {
                return None;
            }
            Some(BusEvent::TeamUpdate { team })
        }
        "team:start" => {
            let team_id = object.get("teamId")?.as_str()?.to_string();
            let started_at = parse_timestamp(object.get("startedAt")?)?;
            Some(BusEvent::TeamStart {
                team_id,
                started_at,
            })
        }
        "chat:message" => {
            let team_id = object.get("teamId")?.as_str()?.to_string();
            let from = object.get("from")?.as_str()?.to_string();
            let text = object.get("text")?.as_str()?.to_string();
            let ts = parse_timestamp(object.get("ts")?)?;
            Some(BusEvent::ChatMessage {
                team_id,
                from,
                text,
                ts,
            })
        }
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<u64> {
    if let Some(number) = value.as_u64() {
        return Some(number);
    }
    let number = value.as_f64()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some(number.floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            role: None,
            ready: false,
        }
    }

    fn ready_team() -> Team {
        let mut team = Team::create("Eco Avengers", member("abcd1234", "Ada"));
        team.join(member("zz99", "Bo"));
        team.assign_role("abcd1234", Role::EnergyEngineer)
            .expect("role free");
        team.assign_role("zz99", Role::Recycler).expect("role free");
        team.toggle_ready("abcd1234").expect("member");
        team.toggle_ready("zz99").expect("member");
        team
    }

    #[test]
    fn team_code_slugs_name_and_appends_leader_prefix() {
        assert_eq!(team_code("Eco Avengers", "abcd1234"), "eco-avengers-abcd");
        assert_eq!(team_code(" Green \t Team ", "xy"), "-green-team--xy");
        let team = Team::create("Eco Avengers", member("abcd1234", "Ada"));
        assert_eq!(team.id, "eco-avengers-abcd");
        assert_eq!(team.mode, GameMode::Team);
        assert_eq!(team.difficulty, Difficulty::Beginner);
    }

    #[test]
    fn join_is_idempotent() {
        let mut team = Team::create("Crew", member("lead", "Ada"));
        assert!(team.join(member("m2", "Bo")).is_some());
        assert!(team.join(member("m2", "Bo")).is_none());
        assert_eq!(team.members.len(), 2);
    }

    #[test]
    fn role_can_only_be_held_once() {
        let mut team = Team::create("Crew", member("lead", "Ada"));
        team.join(member("m2", "Bo"));
        team.assign_role("lead", Role::Architect).expect("free");
        assert_eq!(
            team.assign_role("m2", Role::Architect),
            Err(RosterError::RoleTaken(Role::Architect))
        );
        assert_eq!(
            team.assign_role("ghost", Role::Recycler),
            Err(RosterError::NotAMember("ghost".to_string()))
        );
        assert!(team.roles_are_unique());
    }

    #[test]
    fn only_leader_starts_once_everyone_is_ready() {
        let mut team = Team::create("Crew", member("lead", "Ada"));
        team.join(member("m2", "Bo"));
        team.assign_role("lead", Role::Architect).expect("free");
        team.toggle_ready("lead").expect("member");
        assert!(!team.everyone_ready());
        assert_eq!(team.start("lead"), Err(RosterError::NotEveryoneReady));

        let mut team = ready_team();
        assert!(team.everyone_ready());
        assert_eq!(team.start("zz99"), Err(RosterError::NotLeader));
        let event = team.start("abcd1234").expect("leader starts");
        match event {
            BusEvent::TeamStart {
                team_id,
                started_at,
            } => {
                assert_eq!(team_id, team.id);
                assert_eq!(Some(started_at), team.started_at);
            }
            _ => panic!("expected team:start"),
        }
        assert_eq!(team.start("abcd1234"), Err(RosterError::AlreadyStarted));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let team = ready_team();
        let value = serde_json::to_value(team.update_event()).expect("serializes");
        assert_eq!(value["type"], "team:update");
        assert_eq!(value["team"]["leaderId"], "abcd1234");
        assert_eq!(value["team"]["members"][0]["role"], "energy_engineer");

        let chat = team.chat("zz99", "  hello  ").expect("member chats");
        let value = serde_json::to_value(&chat).expect("serializes");
        assert_eq!(value["type"], "chat:message");
        assert_eq!(value["from"], "Bo");
        assert_eq!(value["text"], "hello");
        assert_eq!(team.chat("zz99", "   "), Err(RosterError::EmptyMessage));
    }

    #[test]
    fn parse_bus_event_accepts_known_shapes() {
        let team = ready_team();
        let raw = serde_json::to_string(&team.update_event()).expect("serializes");
        assert_eq!(parse_bus_event(&raw), Some(team.update_event()));

        let parsed = parse_bus_event(r#"{"type":"team:start","teamId":"crew-lead","startedAt":1700.9}"#);
        assert_eq!(
            parsed,
            Some(BusEvent::TeamStart {
                team_id: "crew-lead".to_string(),
                started_at: 1700,
            })
        );
    }

    #[test]
    fn parse_bus_event_drops_unknown_or_invalid_shapes() {
        assert!(parse_bus_event("not json").is_none());
        assert!(parse_bus_event(r#"{"type":"lobby:ping"}"#).is_none());
        assert!(parse_bus_event(r#"{"type":"chat:message","teamId":"t","from":"a"}"#).is_none());
        assert!(parse_bus_event(r#"{"type":"team:start","teamId":"t","startedAt":-5}"#).is_none());

        let mut team = ready_team();
        team.members[1].role = Some(Role::EnergyEngineer);
        let raw = serde_json::to_string(&team.update_event()).expect("serializes");
        assert!(parse_bus_event(&raw).is_none());
    }

    #[test]
    fn apply_folds_remote_updates_for_the_same_team() {
        let mut local = Team::create("Crew", member("lead", "Ada"));
        let mut remote = local.clone();
        remote.join(member("m2", "Bo"));

        assert!(local.apply(&remote.update_event()));
        assert_eq!(local.members.len(), 2);
        assert!(!local.apply(&remote.update_event()));

        let other = Team::create("Other", member("zzzz", "Cy"));
        assert!(!local.apply(&other.update_event()));
        assert!(local.apply(&BusEvent::TeamStart {
            team_id: local.id.clone(),
            started_at: 42,
        }));
        assert_eq!(local.started_at, Some(42));
    }
}
