use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomId {
    Energy,
    Waste,
    Water,
    Shelter,
    Policy,
}

impl RoomId {
    pub const ALL: [RoomId; 5] = [
        RoomId::Energy,
        RoomId::Waste,
        RoomId::Water,
        RoomId::Shelter,
        RoomId::Policy,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "energy" => Some(Self::Energy),
            "waste" => Some(Self::Waste),
            "water" => Some(Self::Water),
            "shelter" => Some(Self::Shelter),
            "policy" => Some(Self::Policy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Waste => "waste",
            Self::Water => "water",
            Self::Shelter => "shelter",
            Self::Policy => "policy",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Energy => 0,
            Self::Waste => 1,
            Self::Water => 2,
            Self::Shelter => 3,
            Self::Policy => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            "expert" => Some(Self::Expert),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Solo,
    Team,
    Versus,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "solo" => Some(Self::Solo),
            "team" => Some(Self::Team),
            "versus" => Some(Self::Versus),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoomCompletion {
    pub points: u32,
    pub bonus: u32,
}

impl RoomCompletion {
    pub fn total(&self) -> u32 {
        self.points + self.bonus
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoomVerdict {
    InProgress,
    Completed {
        completion: RoomCompletion,
    },
    Failed {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_round_trip_through_parse() {
        for room in RoomId::ALL {
            assert_eq!(RoomId::parse(room.as_str()), Some(room));
        }
        assert_eq!(RoomId::parse("lobby"), None);
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse(" Expert "), Some(Difficulty::Expert));
        assert_eq!(Difficulty::parse("beginner"), Some(Difficulty::Beginner));
        assert_eq!(Difficulty::parse("nightmare"), None);
    }

    #[test]
    fn verdict_serializes_with_status_tag() {
        let verdict = RoomVerdict::Completed {
            completion: RoomCompletion {
                points: 40,
                bonus: 50,
            },
        };
        let value = serde_json::to_value(&verdict).expect("serializes");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["completion"]["points"], 40);
    }
}
