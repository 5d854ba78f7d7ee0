use serde::Serialize;
use thiserror::Error;

use crate::constants::{get_time_bonus, get_time_limit_secs};
use crate::types::RoomId;

pub mod energy;
pub mod policy;
pub mod shelter;
pub mod waste;
pub mod water;

pub use self::energy::EnergyGrid;
pub use self::policy::PolicyChamber;
pub use self::shelter::ShelterSite;
pub use self::waste::WasteSorter;
pub use self::water::FilterRig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("time's up")]
    TimeUp,
    #[error("room is already finished")]
    AlreadyCompleted,
    #[error("unknown energy source '{0}'")]
    UnknownSource(String),
    #[error("unknown district '{0}'")]
    UnknownDistrict(String),
    #[error("unknown waste item '{0}'")]
    UnknownItem(String),
    #[error("'{0}' has already been sorted")]
    ItemAlreadySorted(String),
    #[error("unknown filter stage '{0}'")]
    UnknownStage(String),
    #[error("'{0}' is already in the filter")]
    StageAlreadyPlaced(String),
    #[error("slot {0} does not exist")]
    InvalidSlot(usize),
    #[error("shelter {0} does not exist")]
    UnknownShelter(usize),
    #[error("unknown building material '{0}'")]
    UnknownMaterial(String),
    #[error("not enough {0} available")]
    OutOfStock(String),
    #[error("shelter {shelter} has no material at position {index}")]
    NoMaterialAt { shelter: usize, index: usize },
    #[error("unknown policy '{0}'")]
    UnknownPolicy(String),
    #[error("you can only select {0} policies, deselect one first")]
    PolicyLimitReached(usize),
    #[error("choose exactly {expected} policies to run the simulation (got {got})")]
    WrongPolicyCount { expected: usize, got: usize },
    #[error("the fast fashion choice is not open")]
    FastFashionNotOffered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RoomClock {
    #[serde(rename = "limitSecs")]
    limit_secs: u32,
    #[serde(rename = "timeLeftSecs")]
    time_left_secs: u32,
}

impl RoomClock {
    pub fn new(limit_secs: u32) -> Self {
        Self {
            limit_secs,
            time_left_secs: limit_secs,
        }
    }

    pub fn for_room(room: RoomId) -> Self {
        Self::new(get_time_limit_secs(room))
    }

    pub fn tick(&mut self, elapsed_secs: u32) {
        self.time_left_secs = self.time_left_secs.saturating_sub(elapsed_secs);
    }

    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.limit_secs - self.time_left_secs
    }

    pub fn is_expired(&self) -> bool {
        self.time_left_secs == 0
    }

    pub fn time_bonus(&self) -> u32 {
        get_time_bonus(self.time_left_secs)
    }

    pub fn reset(&mut self) {
        self.time_left_secs = self.limit_secs;
    }

    pub(crate) fn ensure_running(&self) -> Result<(), RoomError> {
        if self.is_expired() {
            return Err(RoomError::TimeUp);
        }
        Ok(())
    }
}

pub(crate) fn clamp_points(points: i32) -> u32 {
    points.max(0) as u32
}
