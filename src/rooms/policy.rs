use serde::Serialize;

use crate::constants::{
    POLICY_BASE_WARMING_DECI, POLICY_CRITICAL_POINTS, POLICY_CRITICAL_WARMING_DECI,
    POLICY_MIN_WARMING_DECI, POLICY_OPTIMAL_BONUS, POLICY_OPTIMAL_POINTS, POLICY_PICKS,
    POLICY_SAFE_WARMING_DECI, POLICY_SAVED_POINTS,
};
use crate::rooms::{RoomClock, RoomError};
use crate::types::{RoomCompletion, RoomId, RoomVerdict};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Policy {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Tenths of a degree removed from the projected rise. Negative adds warming.
    #[serde(rename = "warmingCutDeci")]
    pub warming_cut_deci: i32,
    pub economy: i32,
    #[serde(rename = "publicSupport")]
    pub public_support: i32,
}

pub const TRAP_POLICY: &str = "fossil-fuels";
pub const OPTIMAL_POLICIES: [&str; 3] = ["carbon-tax", "afforestation", "green-jobs"];

pub const POLICIES: [Policy; 6] = [
    Policy {
        id: "carbon-tax",
        name: "Carbon Tax",
        description: "Tax carbon emissions to incentivize clean energy",
        warming_cut_deci: 8,
        economy: -20,
        public_support: -30,
    },
    Policy {
        id: "plastic-ban",
        name: "Ban Single-Use Plastics",
        description: "Eliminate plastic pollution and microplastics",
        warming_cut_deci: 3,
        economy: -10,
        public_support: 40,
    },
    Policy {
        id: "ev-subsidies",
        name: "Electric Vehicle Subsidies",
        description: "Accelerate transition to clean transportation",
        warming_cut_deci: 6,
        economy: 10,
        public_support: 60,
    },
    Policy {
        id: "afforestation",
        name: "Large-Scale Afforestation",
        description: "Plant billions of trees to absorb CO2",
        warming_cut_deci: 12,
        economy: 20,
        public_support: 80,
    },
    Policy {
        id: "green-jobs",
        name: "Green Jobs Program",
        description: "Create millions of renewable energy jobs",
        warming_cut_deci: 4,
        economy: 50,
        public_support: 70,
    },
    Policy {
        id: TRAP_POLICY,
        name: "Continue Fossil Fuels",
        description: "Maintain current energy systems",
        warming_cut_deci: -20,
        economy: 30,
        public_support: -50,
    },
];

pub fn find_policy(id: &str) -> Option<&'static Policy> {
    POLICIES.iter().find(|policy| policy.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetStatus {
    Saved,
    Critical,
    Catastrophic,
}

impl PlanetStatus {
    pub fn from_warming_deci(warming_deci: i32) -> Self {
        if warming_deci <= POLICY_SAFE_WARMING_DECI {
            return Self::Saved;
        }
        if warming_deci <= POLICY_CRITICAL_WARMING_DECI {
            return Self::Critical;
        }
        Self::Catastrophic
    }

    fn points(self) -> u32 {
        match self {
            Self::Saved => POLICY_SAVED_POINTS,
            Self::Critical => POLICY_CRITICAL_POINTS,
            Self::Catastrophic => 0,
        }
    }

    fn outcome(self) -> &'static str {
        match self {
            Self::Saved => "Planet saved! Temperature rise limited to safe levels. Ecosystems thrive, cities are protected from flooding, and humanity prospers in a sustainable future.",
            Self::Critical => "Critical situation. Some progress made but temperature rise causes significant damage. Coastal cities flood, but catastrophic collapse is avoided.",
            Self::Catastrophic => "Climate catastrophe. Poor policy choices lead to runaway global warming. Mass extinction, civilization collapse, and human suffering on unprecedented scale.",
        }
    }
}

const TRAP_OUTCOME: &str =
    "Fossil fuel lobby wins. Temperature soars past +4°C. The planet becomes uninhabitable. Game over.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub policies: Vec<&'static str>,
    #[serde(rename = "warmingDeci")]
    pub warming_deci: i32,
    #[serde(rename = "temperatureRise")]
    pub temperature_rise: f32,
    #[serde(rename = "economicImpact")]
    pub economic_impact: i32,
    #[serde(rename = "publicApproval")]
    pub public_approval: i32,
    #[serde(rename = "planetStatus")]
    pub planet_status: PlanetStatus,
    #[serde(rename = "outcomeDescription")]
    pub outcome_description: &'static str,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u32,
    pub optimal: bool,
    #[serde(rename = "fellForTrap")]
    pub fell_for_trap: bool,
}

pub fn simulate_policies(ids: &[&str]) -> Result<SimulationResult, RoomError> {
    let mut picked: Vec<&'static Policy> = Vec::with_capacity(ids.len());
    for id in ids {
        let policy = find_policy(id).ok_or_else(|| RoomError::UnknownPolicy(id.to_string()))?;
        if !picked.iter().any(|seen| seen.id == policy.id) {
            picked.push(policy);
        }
    }
    if picked.len() != POLICY_PICKS {
        return Err(RoomError::WrongPolicyCount {
            expected: POLICY_PICKS,
            got: picked.len(),
        });
    }

    let cut: i32 = picked.iter().map(|policy| policy.warming_cut_deci).sum();
    let warming_deci = (POLICY_BASE_WARMING_DECI - cut).max(POLICY_MIN_WARMING_DECI);
    let fell_for_trap = picked.iter().any(|policy| policy.id == TRAP_POLICY);
    let optimal = OPTIMAL_POLICIES
        .iter()
        .all(|id| picked.iter().any(|policy| policy.id == *id));

    let (planet_status, mut eco_points, outcome_description) = if fell_for_trap {
        (PlanetStatus::Catastrophic, 0, TRAP_OUTCOME)
    } else {
        let status = PlanetStatus::from_warming_deci(warming_deci);
        (status, status.points(), status.outcome())
    };
    if optimal {
        eco_points += POLICY_OPTIMAL_POINTS;
    }

    Ok(SimulationResult {
        policies: picked.iter().map(|policy| policy.id).collect(),
        warming_deci,
        temperature_rise: warming_deci as f32 / 10.0,
        economic_impact: picked.iter().map(|policy| policy.economy).sum(),
        public_approval: picked.iter().map(|policy| policy.public_support).sum(),
        planet_status,
        outcome_description,
        eco_points,
        optimal,
        fell_for_trap,
    })
}

#[derive(Clone, Debug)]
pub struct PolicyChamber {
    clock: RoomClock,
    selected: Vec<&'static str>,
    last_simulation: Option<SimulationResult>,
    completion: Option<RoomCompletion>,
}

impl Default for PolicyChamber {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyChamber {
    pub fn new() -> Self {
        Self {
            clock: RoomClock::for_room(RoomId::Policy),
            selected: Vec::new(),
            last_simulation: None,
            completion: None,
        }
    }

    pub fn clock(&self) -> &RoomClock {
        &self.clock
    }

    pub fn tick(&mut self, elapsed_secs: u32) {
        self.clock.tick(elapsed_secs);
    }

    pub fn selected(&self) -> &[&'static str] {
        &self.selected
    }

    pub fn last_simulation(&self) -> Option<&SimulationResult> {
        self.last_simulation.as_ref()
    }

    pub fn completion(&self) -> Option<RoomCompletion> {
        self.completion
    }

    pub fn verdict(&self) -> RoomVerdict {
        match self.completion {
            Some(completion) => RoomVerdict::Completed { completion },
            None => RoomVerdict::InProgress,
        }
    }

    pub fn toggle(&mut self, policy_id: &str) -> Result<bool, RoomError> {
        self.ensure_playable()?;
        let policy = find_policy(policy_id)
            .ok_or_else(|| RoomError::UnknownPolicy(policy_id.to_string()))?;
        if let Some(pos) = self.selected.iter().position(|id| *id == policy.id) {
            self.selected.remove(pos);
            return Ok(false);
        }
        if self.selected.len() >= POLICY_PICKS {
            return Err(RoomError::PolicyLimitReached(POLICY_PICKS));
        }
        self.selected.push(policy.id);
        Ok(true)
    }

    pub fn simulate(&mut self) -> Result<SimulationResult, RoomError> {
        self.ensure_playable()?;
        let result = simulate_policies(&self.selected)?;
        if result.planet_status == PlanetStatus::Saved {
            let completion = RoomCompletion {
                points: result.eco_points + self.clock.time_bonus(),
                bonus: if result.optimal {
                    POLICY_OPTIMAL_BONUS
                } else {
                    0
                },
            };
            self.completion = Some(completion);
            log::info!(
                "[policy] planet saved at +{:.1}C, {} points",
                result.temperature_rise,
                completion.total()
            );
        } else {
            log::debug!(
                "[policy] simulation ended {:?} at +{:.1}C",
                result.planet_status,
                result.temperature_rise
            );
        }
        self.last_simulation = Some(result.clone());
        Ok(result)
    }

    pub fn reset_simulation(&mut self) {
        self.selected.clear();
        self.last_simulation = None;
    }

    fn ensure_playable(&self) -> Result<(), RoomError> {
        if self.completion.is_some() {
            return Err(RoomError::AlreadyCompleted);
        }
        self.clock.ensure_running()
    }
}
