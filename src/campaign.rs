use serde::Serialize;
use thiserror::Error;

use crate::photo::PhotoVerdict;
use crate::scoreboard::AgentScoreboard;
use crate::types::{Difficulty, RoomCompletion, RoomId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CampaignError {
    #[error("{} is locked until the previous room is completed", .0.as_str())]
    Locked(RoomId),
    #[error("{} has already been completed", .0.as_str())]
    AlreadyCompleted(RoomId),
    #[error("the {} photo bonus has already been awarded", .0.as_str())]
    PhotoAlreadyAwarded(RoomId),
    #[error("photo was verified for {} but submitted for {}", .verified.as_str(), .submitted.as_str())]
    PhotoRoomMismatch { verified: RoomId, submitted: RoomId },
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct RoomMeta {
    pub id: RoomId,
    pub name: &'static str,
    pub description: &'static str,
    pub difficulty: &'static str,
    #[serde(rename = "estimatedMinutes")]
    pub estimated_minutes: u32,
    #[serde(rename = "nominalPoints")]
    pub nominal_points: u32,
}

pub const ROOMS: [RoomMeta; 5] = [
    RoomMeta {
        id: RoomId::Energy,
        name: "Energy Blackout",
        description: "Restore power to the city using renewable energy",
        difficulty: "Medium",
        estimated_minutes: 12,
        nominal_points: 100,
    },
    RoomMeta {
        id: RoomId::Waste,
        name: "Waste Overflow",
        description: "Clear the digital landfill through proper sorting",
        difficulty: "Easy",
        estimated_minutes: 10,
        nominal_points: 80,
    },
    RoomMeta {
        id: RoomId::Water,
        name: "Water Crisis",
        description: "Purify contaminated water supply systems",
        difficulty: "Hard",
        estimated_minutes: 15,
        nominal_points: 120,
    },
    RoomMeta {
        id: RoomId::Shelter,
        name: "Climate Refugee Zone",
        description: "Build sustainable shelters for displaced families",
        difficulty: "Medium",
        estimated_minutes: 13,
        nominal_points: 110,
    },
    RoomMeta {
        id: RoomId::Policy,
        name: "Climate Policy Chamber",
        description: "Negotiate global policies to save the planet",
        difficulty: "Expert",
        estimated_minutes: 20,
        nominal_points: 150,
    },
];

pub fn room_meta(room: RoomId) -> &'static RoomMeta {
    &ROOMS[room.index()]
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomStatus {
    #[serde(flatten)]
    pub meta: RoomMeta,
    pub unlocked: bool,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<RoomCompletion>,
    #[serde(rename = "photoBonus")]
    pub photo_bonus: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CampaignProgress {
    pub completed: usize,
    pub total: usize,
    #[serde(rename = "progressPct")]
    pub progress_pct: f32,
    #[serde(rename = "sessionPoints")]
    pub session_points: u64,
    #[serde(rename = "nextRoom")]
    pub next_room: Option<RoomId>,
}

#[derive(Clone, Debug)]
pub struct Campaign {
    agent: String,
    difficulty: Difficulty,
    completions: [Option<RoomCompletion>; 5],
    photo_bonuses: [bool; 5],
    session_points: u64,
}

impl Campaign {
    pub fn new(agent: &str, difficulty: Difficulty) -> Self {
        Self {
            agent: agent.trim().to_string(),
            difficulty,
            completions: [None; 5],
            photo_bonuses: [false; 5],
            session_points: 0,
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn session_points(&self) -> u64 {
        self.session_points
    }

    pub fn is_unlocked(&self, room: RoomId) -> bool {
        let idx = room.index();
        idx == 0 || self.completions[idx - 1].is_some()
    }

    pub fn is_completed(&self, room: RoomId) -> bool {
        self.completions[room.index()].is_some()
    }

    pub fn next_room(&self) -> Option<RoomId> {
        RoomId::ALL
            .into_iter()
            .find(|room| !self.is_completed(*room))
    }

    pub fn is_finished(&self) -> bool {
        self.next_room().is_none()
    }

    pub fn complete_room(
        &mut self,
        room: RoomId,
        completion: RoomCompletion,
        scoreboard: &mut AgentScoreboard,
    ) -> Result<CampaignProgress, CampaignError> {
        if !self.is_unlocked(room) {
            return Err(CampaignError::Locked(room));
        }
        if self.is_completed(room) {
            return Err(CampaignError::AlreadyCompleted(room));
        }
        self.completions[room.index()] = Some(completion);
        self.award(completion.total(), scoreboard);
        log::info!(
            "[campaign] {} completed {} for {} points (session {})",
            self.agent,
            room.as_str(),
            completion.total(),
            self.session_points
        );
        Ok(self.progress())
    }

    pub fn award_photo_bonus(
        &mut self,
        room: RoomId,
        verdict: &PhotoVerdict,
        scoreboard: &mut AgentScoreboard,
    ) -> Result<u32, CampaignError> {
        if verdict.room != room {
            return Err(CampaignError::PhotoRoomMismatch {
                verified: verdict.room,
                submitted: room,
            });
        }
        if !self.is_unlocked(room) {
            return Err(CampaignError::Locked(room));
        }
        if self.photo_bonuses[room.index()] {
            return Err(CampaignError::PhotoAlreadyAwarded(room));
        }
        self.photo_bonuses[room.index()] = true;
        self.award(verdict.bonus, scoreboard);
        Ok(verdict.bonus)
    }

    pub fn progress(&self) -> CampaignProgress {
        let completed = self.completions.iter().filter(|c| c.is_some()).count();
        CampaignProgress {
            completed,
            total: ROOMS.len(),
            progress_pct: completed as f32 / ROOMS.len() as f32 * 100.0,
            session_points: self.session_points,
            next_room: self.next_room(),
        }
    }

    pub fn rooms(&self) -> Vec<RoomStatus> {
        ROOMS
            .iter()
            .map(|meta| RoomStatus {
                meta: *meta,
                unlocked: self.is_unlocked(meta.id),
                completed: self.is_completed(meta.id),
                completion: self.completions[meta.id.index()],
                photo_bonus: self.photo_bonuses[meta.id.index()],
            })
            .collect()
    }

    fn award(&mut self, points: u32, scoreboard: &mut AgentScoreboard) {
        self.session_points += points as u64;
        if scoreboard.add_points(&self.agent, points as i64).is_none() {
            log::warn!("[campaign] unnamed agent, lifetime score not updated");
        }
    }
}
