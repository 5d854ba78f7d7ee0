use serde::Serialize;

use crate::constants::{
    SHELTERS_NEEDED_TO_WIN, SHELTER_COUNT, SHELTER_ECO_FRIENDLY_PCT, SHELTER_ECO_FRIENDLY_POINTS,
    SHELTER_HIGH_EMISSIONS, SHELTER_HIGH_EMISSIONS_PENALTY, SHELTER_MATERIALS_TO_COMPLETE,
    SHELTER_SUSTAINABLE_PCT,
};
use crate::rooms::{clamp_points, RoomClock, RoomError};
use crate::types::{RoomCompletion, RoomId, RoomVerdict};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Material {
    pub id: &'static str,
    pub name: &'static str,
    pub stock: u32,
    pub emissions: u32,
    pub sustainability: u32,
}

pub const MATERIALS: [Material; 4] = [
    Material {
        id: "bamboo",
        name: "Bamboo",
        stock: 20,
        emissions: 2,
        sustainability: 95,
    },
    Material {
        id: "recycled-bricks",
        name: "Recycled Bricks",
        stock: 15,
        emissions: 8,
        sustainability: 80,
    },
    Material {
        id: "solar-sheets",
        name: "Solar Sheets",
        stock: 10,
        emissions: 12,
        sustainability: 90,
    },
    Material {
        id: "cement",
        name: "Cement",
        stock: 25,
        emissions: 50,
        sustainability: 20,
    },
];

fn material_index(id: &str) -> Option<usize> {
    MATERIALS.iter().position(|material| material.id == id)
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Shelter {
    pub materials: Vec<&'static str>,
}

impl Shelter {
    pub fn emissions(&self) -> u32 {
        self.specs().map(|material| material.emissions).sum()
    }

    pub fn sustainability(&self) -> f32 {
        if self.materials.is_empty() {
            return 0.0;
        }
        let total: u32 = self.specs().map(|material| material.sustainability).sum();
        total as f32 / self.materials.len() as f32
    }

    pub fn is_complete(&self) -> bool {
        self.materials.len() >= SHELTER_MATERIALS_TO_COMPLETE
    }

    pub fn is_sustainable(&self) -> bool {
        self.is_complete() && self.sustainability() >= SHELTER_SUSTAINABLE_PCT
    }

    fn specs(&self) -> impl Iterator<Item = &'static Material> + '_ {
        self.materials
            .iter()
            .filter_map(|id| material_index(id).map(|idx| &MATERIALS[idx]))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SiteReport {
    #[serde(rename = "totalEmissions")]
    pub total_emissions: u32,
    #[serde(rename = "avgSustainability")]
    pub avg_sustainability: f32,
    #[serde(rename = "completedShelters")]
    pub completed_shelters: usize,
    #[serde(rename = "sustainableShelters")]
    pub sustainable_shelters: usize,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u32,
    pub verdict: RoomVerdict,
}

pub fn score_shelters(shelters: &[Shelter]) -> u32 {
    let mut points = 0i32;
    for shelter in shelters.iter().filter(|shelter| shelter.is_complete()) {
        if shelter.sustainability() >= SHELTER_ECO_FRIENDLY_PCT {
            points += SHELTER_ECO_FRIENDLY_POINTS;
        }
        if shelter.emissions() > SHELTER_HIGH_EMISSIONS {
            points += SHELTER_HIGH_EMISSIONS_PENALTY;
        }
    }
    clamp_points(points)
}

#[derive(Clone, Debug)]
pub struct ShelterSite {
    clock: RoomClock,
    used: [u32; 4],
    shelters: Vec<Shelter>,
    completion: Option<RoomCompletion>,
}

impl Default for ShelterSite {
    fn default() -> Self {
        Self::new()
    }
}

impl ShelterSite {
    pub fn new() -> Self {
        Self {
            clock: RoomClock::for_room(RoomId::Shelter),
            used: [0; 4],
            shelters: vec![Shelter::default(); SHELTER_COUNT],
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

    pub fn shelters(&self) -> &[Shelter] {
        &self.shelters
    }

    pub fn remaining_stock(&self, material_id: &str) -> Option<u32> {
        let idx = material_index(material_id)?;
        Some(MATERIALS[idx].stock - self.used[idx])
    }

    pub fn add_material(
        &mut self,
        shelter: usize,
        material_id: &str,
    ) -> Result<SiteReport, RoomError> {
        self.ensure_playable()?;
        let idx = material_index(material_id)
            .ok_or_else(|| RoomError::UnknownMaterial(material_id.to_string()))?;
        if shelter >= self.shelters.len() {
            return Err(RoomError::UnknownShelter(shelter));
        }
        let material = &MATERIALS[idx];
        if self.used[idx] >= material.stock {
            return Err(RoomError::OutOfStock(material.name.to_string()));
        }
        self.used[idx] += 1;
        self.shelters[shelter].materials.push(material.id);
        Ok(self.evaluate())
    }

    pub fn remove_material(
        &mut self,
        shelter: usize,
        index: usize,
    ) -> Result<SiteReport, RoomError> {
        self.ensure_playable()?;
        let target = self
            .shelters
            .get_mut(shelter)
            .ok_or(RoomError::UnknownShelter(shelter))?;
        if index >= target.materials.len() {
            return Err(RoomError::NoMaterialAt { shelter, index });
        }
        let material_id = target.materials.remove(index);
        if let Some(idx) = material_index(material_id) {
            self.used[idx] -= 1;
        }
        Ok(self.evaluate())
    }

    pub fn report(&self) -> SiteReport {
        let complete: Vec<&Shelter> = self
            .shelters
            .iter()
            .filter(|shelter| shelter.is_complete())
            .collect();
        let avg_sustainability = complete
            .iter()
            .map(|shelter| shelter.sustainability())
            .sum::<f32>()
            / complete.len().max(1) as f32;

        SiteReport {
            total_emissions: self.shelters.iter().map(Shelter::emissions).sum(),
            avg_sustainability,
            completed_shelters: complete.len(),
            sustainable_shelters: complete
                .iter()
                .filter(|shelter| shelter.is_sustainable())
                .count(),
            eco_points: score_shelters(&self.shelters),
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

    fn evaluate(&mut self) -> SiteReport {
        let mut report = self.report();
        if report.sustainable_shelters >= SHELTERS_NEEDED_TO_WIN {
            let completion = RoomCompletion {
                points: report.eco_points + self.clock.time_bonus(),
                bonus: 0,
            };
            self.completion = Some(completion);
            log::info!(
                "[shelter] {} sustainable shelters built, {} points",
                report.sustainable_shelters,
                completion.total()
            );
            report.verdict = RoomVerdict::Completed { completion };
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(site: &mut ShelterSite, shelter: usize, materials: &[&str]) -> SiteReport {
        let mut last = None;
        for material in materials {
            last = Some(site.add_material(shelter, material).expect("material added"));
        }
        last.expect("at least one material")
    }

    #[test]
    fn shelter_needs_three_materials_to_complete() {
        let mut site = ShelterSite::new();
        let report = build(&mut site, 0, &["bamboo", "cement"]);
        assert_eq!(report.completed_shelters, 0);
        assert_eq!(report.avg_sustainability, 0.0);
        let report = build(&mut site, 0, &["cement"]);
        assert_eq!(report.completed_shelters, 1);
        assert_eq!(site.shelters()[0].emissions(), 102);
        assert_eq!(site.shelters()[0].sustainability(), 45.0);
        assert_eq!(report.sustainable_shelters, 0);
        assert_eq!(report.eco_points, 0);
    }

    #[test]
    fn high_emission_shelters_cost_points_but_total_never_negative() {
        let mut site = ShelterSite::new();
        let report = build(&mut site, 0, &["cement", "cement", "cement"]);
        assert_eq!(report.total_emissions, 150);
        assert_eq!(report.eco_points, 0);
    }

    #[test]
    fn stock_runs_out() {
        let mut site = ShelterSite::new();
        for idx in 0..10 {
            site.add_material(idx % 5, "solar-sheets")
                .expect("stock available");
        }
        assert_eq!(site.remaining_stock("solar-sheets"), Some(0));
        assert_eq!(
            site.add_material(0, "solar-sheets"),
            Err(RoomError::OutOfStock("Solar Sheets".to_string()))
        );
        site.remove_material(0, 0).expect("removed");
        assert_eq!(site.remaining_stock("solar-sheets"), Some(1));
    }

    #[test]
    fn three_sustainable_shelters_win() {
        let mut site = ShelterSite::new();
        site.tick(80);
        build(&mut site, 0, &["bamboo", "bamboo", "bamboo"]);
        build(&mut site, 1, &["recycled-bricks", "bamboo", "solar-sheets"]);
        let report = build(&mut site, 2, &["bamboo", "bamboo", "cement"]);
        assert_eq!(report.sustainable_shelters, 3);
        // shelters 0 and 1 score +25 each; shelter 2 sits at 70%
        assert_eq!(report.eco_points, 50);
        assert_eq!(
            report.verdict,
            RoomVerdict::Completed {
                completion: RoomCompletion {
                    points: 50 + 40,
                    bonus: 0,
                }
            }
        );
        assert_eq!(
            site.add_material(3, "bamboo"),
            Err(RoomError::AlreadyCompleted)
        );
    }

    #[test]
    fn invalid_targets_are_rejected() {
        let mut site = ShelterSite::new();
        assert_eq!(
            site.add_material(5, "bamboo"),
            Err(RoomError::UnknownShelter(5))
        );
        assert_eq!(
            site.add_material(0, "steel"),
            Err(RoomError::UnknownMaterial("steel".to_string()))
        );
        assert_eq!(
            site.remove_material(0, 0),
            Err(RoomError::NoMaterialAt {
                shelter: 0,
                index: 0
            })
        );
    }
}
