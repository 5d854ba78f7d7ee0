use serde::Serialize;

use crate::constants::{
    WATER_POINTS_PER_STAGE, WATER_PURITY_PER_STAGE, WATER_SLOT_COUNT, WATER_WIN_PURITY_PCT,
};
use crate::rooms::{RoomClock, RoomError};
use crate::types::{RoomCompletion, RoomId, RoomVerdict};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct FilterStage {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Zero-based slot this stage belongs in.
    #[serde(rename = "correctSlot")]
    pub correct_slot: usize,
}

pub const FILTER_STAGES: [FilterStage; WATER_SLOT_COUNT] = [
    FilterStage {
        id: "gravel",
        name: "Gravel",
        description: "Removes large debris",
        correct_slot: 0,
    },
    FilterStage {
        id: "sand",
        name: "Sand",
        description: "Filters sediment",
        correct_slot: 1,
    },
    FilterStage {
        id: "charcoal",
        name: "Charcoal",
        description: "Absorbs chemicals",
        correct_slot: 2,
    },
    FilterStage {
        id: "cotton",
        name: "Cotton",
        description: "Fine filtration",
        correct_slot: 3,
    },
    FilterStage {
        id: "uv",
        name: "UV Light",
        description: "Kills bacteria",
        correct_slot: 4,
    },
    FilterStage {
        id: "tank",
        name: "Water Tank",
        description: "Clean water storage",
        correct_slot: 5,
    },
];

pub fn find_stage(id: &str) -> Option<&'static FilterStage> {
    FILTER_STAGES.iter().find(|stage| stage.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterQuality {
    Contaminated,
    Murky,
    Partial,
    Clean,
    Crystal,
}

impl WaterQuality {
    pub fn from_purity(purity_pct: f32) -> Self {
        if purity_pct >= 80.0 {
            return Self::Crystal;
        }
        if purity_pct >= 70.0 {
            return Self::Clean;
        }
        if purity_pct >= 50.0 {
            return Self::Partial;
        }
        if purity_pct >= 20.0 {
            return Self::Murky;
        }
        Self::Contaminated
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FilterReport {
    #[serde(rename = "correctStages")]
    pub correct_stages: usize,
    #[serde(rename = "purityPct")]
    pub purity_pct: f32,
    pub quality: WaterQuality,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u32,
    pub misplaced: Vec<&'static str>,
    pub verdict: RoomVerdict,
}

pub fn score_sequence(slots: &[Option<&'static FilterStage>]) -> (usize, f32, Vec<&'static str>) {
    let mut correct = 0;
    let mut misplaced = Vec::new();
    for (slot, stage) in slots.iter().enumerate() {
        let Some(stage) = stage else {
            continue;
        };
        if stage.correct_slot == slot {
            correct += 1;
        } else {
            misplaced.push(stage.id);
        }
    }
    let purity = (correct as f32 * WATER_PURITY_PER_STAGE).min(100.0);
    (correct, purity, misplaced)
}

#[derive(Clone, Debug)]
pub struct FilterRig {
    clock: RoomClock,
    slots: [Option<&'static FilterStage>; WATER_SLOT_COUNT],
    completion: Option<RoomCompletion>,
}

impl Default for FilterRig {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRig {
    pub fn new() -> Self {
        Self {
            clock: RoomClock::for_room(RoomId::Water),
            slots: [None; WATER_SLOT_COUNT],
            completion: None,
        }
    }

    pub fn clock(&self) -> &RoomClock {
        &self.clock
    }

    pub fn tick(&mut self, elapsed_secs: u32) {
        self.clock.tick(elapsed_secs);
    }

    pub fn completion(&self) -> Option<RoomCompletion> {
        self.completion
    }

    pub fn slots(&self) -> &[Option<&'static FilterStage>] {
        &self.slots
    }

    pub fn shelf(&self) -> Vec<&'static FilterStage> {
        FILTER_STAGES
            .iter()
            .filter(|stage| self.slot_of(stage.id).is_none())
            .collect()
    }

    pub fn place(&mut self, stage_id: &str, slot: usize) -> Result<FilterReport, RoomError> {
        self.ensure_playable()?;
        let stage =
            find_stage(stage_id).ok_or_else(|| RoomError::UnknownStage(stage_id.to_string()))?;
        if slot >= WATER_SLOT_COUNT {
            return Err(RoomError::InvalidSlot(slot));
        }
        if self.slot_of(stage.id).is_some() {
            return Err(RoomError::StageAlreadyPlaced(stage.name.to_string()));
        }
        self.slots[slot] = Some(stage);
        Ok(self.evaluate())
    }

    pub fn remove(&mut self, slot: usize) -> Result<FilterReport, RoomError> {
        self.ensure_playable()?;
        if slot >= WATER_SLOT_COUNT {
            return Err(RoomError::InvalidSlot(slot));
        }
        self.slots[slot] = None;
        Ok(self.evaluate())
    }

    pub fn report(&self) -> FilterReport {
        let (correct_stages, purity_pct, misplaced) = score_sequence(&self.slots);
        FilterReport {
            correct_stages,
            purity_pct,
            quality: WaterQuality::from_purity(purity_pct),
            eco_points: correct_stages as u32 * WATER_POINTS_PER_STAGE,
            misplaced,
            verdict: match self.completion {
                Some(completion) => RoomVerdict::Completed { completion },
                None => RoomVerdict::InProgress,
            },
        }
    }

    fn ensure_playable(&self) -> Result<(), RoomError> {
        if self.completion.is_some() {
            return Err(RoomError::AlreadyCompleted);
        }
        self.clock.ensure_running()
    }

    fn evaluate(&mut self) -> FilterReport {
        let mut report = self.report();
        if report.purity_pct >= WATER_WIN_PURITY_PCT {
            let completion = RoomCompletion {
                points: report.eco_points + self.clock.time_bonus(),
                bonus: 0,
            };
            self.completion = Some(completion);
            log::info!(
                "[water] purified to {:.1}%, {} points",
                report.purity_pct,
                completion.total()
            );
            report.verdict = RoomVerdict::Completed { completion };
        }
        report
    }

    fn slot_of(&self, stage_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.map(|stage| stage.id == stage_id).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_slot_is_reported_as_misplaced() {
        let mut rig = FilterRig::new();
        let report = rig.place("sand", 0).expect("placed");
        assert_eq!(report.correct_stages, 0);
        assert_eq!(report.misplaced, vec!["sand"]);
        assert_eq!(report.quality, WaterQuality::Contaminated);
    }

    #[test]
    fn placing_into_occupied_slot_returns_previous_stage_to_shelf() {
        let mut rig = FilterRig::new();
        rig.place("sand", 0).expect("placed");
        rig.place("gravel", 0).expect("replaced");
        assert!(rig.shelf().iter().any(|stage| stage.id == "sand"));
        assert_eq!(rig.slots()[0].map(|stage| stage.id), Some("gravel"));
        assert_eq!(
            rig.place("gravel", 1),
            Err(RoomError::StageAlreadyPlaced("Gravel".to_string()))
        );
        assert_eq!(rig.place("gravel", 6), Err(RoomError::InvalidSlot(6)));
    }

    #[test]
    fn four_correct_stages_are_not_enough() {
        let mut rig = FilterRig::new();
        let mut last = None;
        for stage in FILTER_STAGES.iter().take(4) {
            last = Some(rig.place(stage.id, stage.correct_slot).expect("placed"));
        }
        let report = last.expect("report");
        assert_eq!(report.correct_stages, 4);
        assert!(report.purity_pct < 70.0);
        assert_eq!(report.quality, WaterQuality::Partial);
        assert_eq!(report.eco_points, 80);
        assert_eq!(report.verdict, RoomVerdict::InProgress);
    }

    #[test]
    fn five_correct_stages_purify_the_water() {
        let mut rig = FilterRig::new();
        rig.tick(20);
        let mut last = None;
        for stage in FILTER_STAGES.iter().take(5) {
            last = Some(rig.place(stage.id, stage.correct_slot).expect("placed"));
        }
        let report = last.expect("report");
        assert_eq!(report.quality, WaterQuality::Crystal);
        assert_eq!(
            report.verdict,
            RoomVerdict::Completed {
                completion: RoomCompletion {
                    points: 100 + 40,
                    bonus: 0,
                }
            }
        );
        assert_eq!(rig.remove(0), Err(RoomError::AlreadyCompleted));
    }

    #[test]
    fn purity_caps_at_one_hundred() {
        let slots: Vec<Option<&'static FilterStage>> = FILTER_STAGES.iter().map(Some).collect();
        let (correct, purity, misplaced) = score_sequence(&slots);
        assert_eq!(correct, 6);
        assert_eq!(purity, 100.0);
        assert!(misplaced.is_empty());
    }

    #[test]
    fn removing_a_stage_updates_purity() {
        let mut rig = FilterRig::new();
        rig.place("gravel", 0).expect("placed");
        rig.place("sand", 1).expect("placed");
        let report = rig.remove(1).expect("removed");
        assert_eq!(report.correct_stages, 1);
        assert_eq!(rig.shelf().len(), 5);
    }
}
