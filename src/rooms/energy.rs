use serde::Serialize;

use crate::constants::{
    ENERGY_BADGE_BONUS, ENERGY_FOSSIL_PENALTY, ENERGY_POWER_DEMAND_MW, ENERGY_RENEWABLE_POINTS,
    ENERGY_RENEWABLE_TARGET_PCT,
};
use crate::rooms::{clamp_points, RoomClock, RoomError};
use crate::types::{RoomCompletion, RoomId, RoomVerdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Renewable,
    Fossil,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct EnergySource {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: SourceKind,
    #[serde(rename = "powerMw")]
    pub power_mw: u32,
    pub cost: u32,
    pub emissions: u32,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct District {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "demandMw")]
    pub demand_mw: u32,
}

pub const ENERGY_SOURCES: [EnergySource; 3] = [
    EnergySource {
        id: "solar",
        name: "Solar Panel",
        kind: SourceKind::Renewable,
        power_mw: 25,
        cost: 30,
        emissions: 0,
    },
    EnergySource {
        id: "wind",
        name: "Wind Turbine",
        kind: SourceKind::Renewable,
        power_mw: 35,
        cost: 40,
        emissions: 0,
    },
    EnergySource {
        id: "coal",
        name: "Coal Plant",
        kind: SourceKind::Fossil,
        power_mw: 50,
        cost: 20,
        emissions: 80,
    },
];

pub const DISTRICTS: [District; 3] = [
    District {
        id: "residential",
        name: "Residential",
        demand_mw: 30,
    },
    District {
        id: "commercial",
        name: "Commercial",
        demand_mw: 40,
    },
    District {
        id: "industrial",
        name: "Industrial",
        demand_mw: 30,
    },
];

pub fn find_source(id: &str) -> Option<&'static EnergySource> {
    ENERGY_SOURCES.iter().find(|source| source.id == id)
}

pub fn find_district(id: &str) -> Option<&'static District> {
    DISTRICTS.iter().find(|district| district.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GridConnection {
    pub source: &'static str,
    pub district: &'static str,
}

impl GridConnection {
    pub fn id(&self) -> String {
        format!("{}-{}", self.source, self.district)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionStatus {
    Safe,
    Warning,
    Danger,
}

impl EmissionStatus {
    pub fn from_emissions(emissions: u32) -> Self {
        if emissions <= 40 {
            return Self::Safe;
        }
        if emissions <= 80 {
            return Self::Warning;
        }
        Self::Danger
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GridStats {
    #[serde(rename = "totalPowerMw")]
    pub total_power_mw: u32,
    #[serde(rename = "renewablePowerMw")]
    pub renewable_power_mw: u32,
    pub emissions: u32,
    #[serde(rename = "renewablePct")]
    pub renewable_pct: f32,
    #[serde(rename = "emissionStatus")]
    pub emission_status: EmissionStatus,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u32,
}

impl GridStats {
    pub fn meets_target(&self) -> bool {
        self.total_power_mw >= ENERGY_POWER_DEMAND_MW
            && self.renewable_pct >= ENERGY_RENEWABLE_TARGET_PCT
    }
}

pub fn compute_grid_stats(connections: &[GridConnection]) -> GridStats {
    let mut total_power_mw = 0;
    let mut renewable_power_mw = 0;
    let mut emissions = 0;
    let mut points = 0i32;

    for connection in connections {
        let Some(source) = find_source(connection.source) else {
            continue;
        };
        total_power_mw += source.power_mw;
        emissions += source.emissions;
        match source.kind {
            SourceKind::Renewable => {
                renewable_power_mw += source.power_mw;
                points += ENERGY_RENEWABLE_POINTS;
            }
            SourceKind::Fossil => points += ENERGY_FOSSIL_PENALTY,
        }
    }

    let renewable_pct = if total_power_mw > 0 {
        renewable_power_mw as f32 / total_power_mw as f32 * 100.0
    } else {
        0.0
    };

    GridStats {
        total_power_mw,
        renewable_power_mw,
        emissions,
        renewable_pct,
        emission_status: EmissionStatus::from_emissions(emissions),
        eco_points: clamp_points(points),
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridReport {
    pub stats: GridStats,
    pub verdict: RoomVerdict,
    #[serde(rename = "missingRenewablePct")]
    pub missing_renewable_pct: Option<f32>,
    #[serde(rename = "greenEngineer")]
    pub green_engineer: bool,
}

#[derive(Clone, Debug)]
pub struct EnergyGrid {
    clock: RoomClock,
    connections: Vec<GridConnection>,
    completion: Option<RoomCompletion>,
}

impl Default for EnergyGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyGrid {
    pub fn new() -> Self {
        Self {
            clock: RoomClock::for_room(RoomId::Energy),
            connections: Vec::new(),
            completion: None,
        }
    }

    pub fn clock(&self) -> &RoomClock {
        &self.clock
    }

    pub fn tick(&mut self, elapsed_secs: u32) {
        self.clock.tick(elapsed_secs);
    }

    pub fn connections(&self) -> &[GridConnection] {
        &self.connections
    }

    pub fn completion(&self) -> Option<RoomCompletion> {
        self.completion
    }

    pub fn stats(&self) -> GridStats {
        compute_grid_stats(&self.connections)
    }

    pub fn connect(&mut self, source_id: &str, district_id: &str) -> Result<GridReport, RoomError> {
        self.ensure_playable()?;
        let source =
            find_source(source_id).ok_or_else(|| RoomError::UnknownSource(source_id.to_string()))?;
        let district = find_district(district_id)
            .ok_or_else(|| RoomError::UnknownDistrict(district_id.to_string()))?;

        self.connections
            .retain(|connection| connection.district != district.id);
        self.connections.push(GridConnection {
            source: source.id,
            district: district.id,
        });
        Ok(self.evaluate())
    }

    pub fn disconnect(&mut self, district_id: &str) -> Result<GridReport, RoomError> {
        self.ensure_playable()?;
        let district = find_district(district_id)
            .ok_or_else(|| RoomError::UnknownDistrict(district_id.to_string()))?;
        self.connections
            .retain(|connection| connection.district != district.id);
        Ok(self.evaluate())
    }

    fn ensure_playable(&self) -> Result<(), RoomError> {
        if self.completion.is_some() {
            return Err(RoomError::AlreadyCompleted);
        }
        self.clock.ensure_running()
    }

    fn evaluate(&mut self) -> GridReport {
        let stats = self.stats();
        if stats.meets_target() {
            let green_engineer = stats.renewable_pct >= 100.0;
            let completion = RoomCompletion {
                points: stats.eco_points + self.clock.time_bonus(),
                bonus: if green_engineer { ENERGY_BADGE_BONUS } else { 0 },
            };
            self.completion = Some(completion);
            log::info!(
                "[energy] grid restored at {:.1}% renewable, {} points",
                stats.renewable_pct,
                completion.total()
            );
            return GridReport {
                stats,
                verdict: RoomVerdict::Completed { completion },
                missing_renewable_pct: None,
                green_engineer,
            };
        }

        let missing_renewable_pct = if !self.connections.is_empty()
            && stats.renewable_pct < ENERGY_RENEWABLE_TARGET_PCT
        {
            Some(ENERGY_RENEWABLE_TARGET_PCT - stats.renewable_pct)
        } else {
            None
        };
        GridReport {
            stats,
            verdict: RoomVerdict::InProgress,
            missing_renewable_pct,
            green_engineer: false,
        }
    }
}
