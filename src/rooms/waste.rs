use serde::Serialize;

use crate::constants::{
    WASTE_FAST_FASHION_AFTER_SECS, WASTE_SUSTAINABLE_BONUS, WASTE_TOTAL_ITEMS,
    WASTE_WIN_ACCURACY_PCT,
};
use crate::rooms::{RoomClock, RoomError};
use crate::types::{RoomCompletion, RoomId, RoomVerdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteKind {
    Biodegradable,
    Recyclable,
    Ewaste,
    Hazardous,
}

impl WasteKind {
    pub const ALL: [WasteKind; 4] = [
        WasteKind::Biodegradable,
        WasteKind::Recyclable,
        WasteKind::Ewaste,
        WasteKind::Hazardous,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "biodegradable" => Some(Self::Biodegradable),
            "recyclable" => Some(Self::Recyclable),
            "ewaste" => Some(Self::Ewaste),
            "hazardous" => Some(Self::Hazardous),
            _ => None,
        }
    }

    pub fn bin_name(self) -> &'static str {
        match self {
            Self::Biodegradable => "Compost",
            Self::Recyclable => "Recycle",
            Self::Ewaste => "E-Waste",
            Self::Hazardous => "Hazardous",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct WasteItem {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: WasteKind,
    pub points: u32,
}

const fn item(id: &'static str, name: &'static str, kind: WasteKind, points: u32) -> WasteItem {
    WasteItem {
        id,
        name,
        kind,
        points,
    }
}

pub const WASTE_ITEMS: [WasteItem; WASTE_TOTAL_ITEMS] = [
    item("1", "Apple Core", WasteKind::Biodegradable, 5),
    item("2", "Plastic Bottle", WasteKind::Recyclable, 5),
    item("3", "Old Phone", WasteKind::Ewaste, 10),
    item("4", "Battery", WasteKind::Hazardous, 15),
    item("5", "Banana Peel", WasteKind::Biodegradable, 5),
    item("6", "Glass Jar", WasteKind::Recyclable, 5),
    item("7", "Laptop", WasteKind::Ewaste, 10),
    item("8", "Paint Can", WasteKind::Hazardous, 15),
    item("9", "Newspaper", WasteKind::Recyclable, 5),
    item("10", "Food Scraps", WasteKind::Biodegradable, 5),
    item("11", "Aluminum Can", WasteKind::Recyclable, 5),
    item("12", "Tablet", WasteKind::Ewaste, 10),
    item("13", "Leaves", WasteKind::Biodegradable, 5),
    item("14", "Cardboard Box", WasteKind::Recyclable, 5),
    item("15", "Light Bulb", WasteKind::Hazardous, 15),
    item("16", "Orange Peel", WasteKind::Biodegradable, 5),
    item("17", "Plastic Bag", WasteKind::Recyclable, 5),
    item("18", "Old Charger", WasteKind::Ewaste, 10),
    item("19", "Cleaning Product", WasteKind::Hazardous, 15),
    item("20", "Paper", WasteKind::Recyclable, 5),
];

pub fn find_item(id: &str) -> Option<&'static WasteItem> {
    WASTE_ITEMS.iter().find(|item| item.id == id)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FastFashionChoice {
    Buy,
    Sustainable,
}

impl FastFashionChoice {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "buy" => Some(Self::Buy),
            "sustainable" => Some(Self::Sustainable),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BinnedItem {
    pub item: &'static str,
    pub bin: WasteKind,
    pub correct: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SortOutcome {
    pub correct: bool,
    #[serde(rename = "pointsAwarded")]
    pub points_awarded: u32,
    #[serde(rename = "ecoPoints")]
    pub eco_points: u32,
    pub remaining: usize,
    #[serde(rename = "accuracyPct")]
    pub accuracy_pct: f32,
    pub verdict: RoomVerdict,
}

#[derive(Clone, Debug)]
pub struct WasteSorter {
    clock: RoomClock,
    binned: Vec<BinnedItem>,
    eco_points: u32,
    fast_fashion: Option<FastFashionChoice>,
    verdict: RoomVerdict,
}

impl Default for WasteSorter {
    fn default() -> Self {
        Self::new()
    }
}

impl WasteSorter {
    pub fn new() -> Self {
        Self {
            clock: RoomClock::for_room(RoomId::Waste),
            binned: Vec::with_capacity(WASTE_TOTAL_ITEMS),
            eco_points: 0,
            fast_fashion: None,
            verdict: RoomVerdict::InProgress,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn clock(&self) -> &RoomClock {
        &self.clock
    }

    pub fn tick(&mut self, elapsed_secs: u32) {
        self.clock.tick(elapsed_secs);
    }

    pub fn verdict(&self) -> &RoomVerdict {
        &self.verdict
    }

    pub fn eco_points(&self) -> u32 {
        self.eco_points
    }

    pub fn binned(&self) -> &[BinnedItem] {
        &self.binned
    }

    pub fn remaining_items(&self) -> Vec<&'static WasteItem> {
        WASTE_ITEMS
            .iter()
            .filter(|item| !self.is_binned(item.id))
            .collect()
    }

    pub fn correct_count(&self) -> usize {
        self.binned.iter().filter(|entry| entry.correct).count()
    }

    pub fn accuracy_pct(&self) -> f32 {
        if self.binned.is_empty() {
            return 0.0;
        }
        self.correct_count() as f32 / self.binned.len() as f32 * 100.0
    }

    pub fn progress_pct(&self) -> f32 {
        self.binned.len() as f32 / WASTE_TOTAL_ITEMS as f32 * 100.0
    }

    /// The curveball is offered once, after three minutes in an unfinished room.
    pub fn fast_fashion_due(&self) -> bool {
        self.fast_fashion.is_none()
            && self.verdict == RoomVerdict::InProgress
            && !self.clock.is_expired()
            && self.clock.elapsed_secs() >= WASTE_FAST_FASHION_AFTER_SECS
    }

    pub fn choose_fast_fashion(&mut self, choice: FastFashionChoice) -> Result<(), RoomError> {
        self.clock.ensure_running()?;
        if !self.fast_fashion_due() {
            return Err(RoomError::FastFashionNotOffered);
        }
        self.fast_fashion = Some(choice);
        Ok(())
    }

    pub fn fast_fashion_choice(&self) -> Option<FastFashionChoice> {
        self.fast_fashion
    }

    pub fn place(&mut self, item_id: &str, bin: WasteKind) -> Result<SortOutcome, RoomError> {
        if self.verdict != RoomVerdict::InProgress {
            return Err(RoomError::AlreadyCompleted);
        }
        self.clock.ensure_running()?;
        let item = find_item(item_id).ok_or_else(|| RoomError::UnknownItem(item_id.to_string()))?;
        if self.is_binned(item.id) {
            return Err(RoomError::ItemAlreadySorted(item.name.to_string()));
        }

        let correct = item.kind == bin;
        let points_awarded = if correct { item.points } else { 0 };
        self.eco_points += points_awarded;
        self.binned.push(BinnedItem {
            item: item.id,
            bin,
            correct,
        });

        let remaining = WASTE_TOTAL_ITEMS - self.binned.len();
        if remaining == 0 {
            self.verdict = self.judge();
        }

        Ok(SortOutcome {
            correct,
            points_awarded,
            eco_points: self.eco_points,
            remaining,
            accuracy_pct: self.accuracy_pct(),
            verdict: self.verdict.clone(),
        })
    }

    fn judge(&self) -> RoomVerdict {
        let final_pct = self.correct_count() as f32 / WASTE_TOTAL_ITEMS as f32 * 100.0;
        if final_pct >= WASTE_WIN_ACCURACY_PCT {
            let bonus = match self.fast_fashion {
                Some(FastFashionChoice::Sustainable) => WASTE_SUSTAINABLE_BONUS,
                _ => 0,
            };
            let completion = RoomCompletion {
                points: self.eco_points + self.clock.time_bonus(),
                bonus,
            };
            log::info!(
                "[waste] sorted {:.1}% correctly, {} points",
                final_pct,
                completion.total()
            );
            return RoomVerdict::Completed { completion };
        }
        log::info!("[waste] only {:.1}% sorted correctly", final_pct);
        RoomVerdict::Failed {
            reason: format!(
                "Only {:.1}% correct. Need {:.0}% to escape!",
                final_pct, WASTE_WIN_ACCURACY_PCT
            ),
        }
    }

    fn is_binned(&self, item_id: &str) -> bool {
        self.binned.iter().any(|entry| entry.item == item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort_all(sorter: &mut WasteSorter, wrong: usize) -> SortOutcome {
        let mut last = None;
        for (idx, item) in WASTE_ITEMS.iter().enumerate() {
            let bin = if idx < wrong {
                WasteKind::ALL
                    .into_iter()
                    .find(|kind| *kind != item.kind)
                    .expect("another bin exists")
            } else {
                item.kind
            };
            last = Some(sorter.place(item.id, bin).expect("placement accepted"));
        }
        last.expect("at least one item")
    }

    #[test]
    fn item_table_matches_fixed_set() {
        assert_eq!(WASTE_ITEMS.len(), 20);
        let hazardous = WASTE_ITEMS
            .iter()
            .filter(|item| item.kind == WasteKind::Hazardous)
            .count();
        assert_eq!(hazardous, 4);
        assert!(WASTE_ITEMS
            .iter()
            .filter(|item| item.kind == WasteKind::Hazardous)
            .all(|item| item.points == 15));
    }

    #[test]
    fn correct_and_wrong_placements_track_points_and_accuracy() {
        let mut sorter = WasteSorter::new();
        let first = sorter
            .place("4", WasteKind::Hazardous)
            .expect("battery sorted");
        assert!(first.correct);
        assert_eq!(first.points_awarded, 15);

        let second = sorter
            .place("1", WasteKind::Recyclable)
            .expect("apple core placed");
        assert!(!second.correct);
        assert_eq!(second.eco_points, 15);
        assert_eq!(second.remaining, 18);
        assert_eq!(second.accuracy_pct, 50.0);
        assert_eq!(
            sorter.place("4", WasteKind::Hazardous),
            Err(RoomError::ItemAlreadySorted("Battery".to_string()))
        );
        assert_eq!(
            sorter.place("99", WasteKind::Hazardous),
            Err(RoomError::UnknownItem("99".to_string()))
        );
    }

    #[test]
    fn exactly_eighty_percent_wins() {
        let mut sorter = WasteSorter::new();
        sorter.tick(100);
        let outcome = sort_all(&mut sorter, 4);
        let total_points: u32 = WASTE_ITEMS.iter().skip(4).map(|item| item.points).sum();
        assert_eq!(
            outcome.verdict,
            RoomVerdict::Completed {
                completion: RoomCompletion {
                    points: total_points + 50,
                    bonus: 0,
                }
            }
        );
    }

    #[test]
    fn below_eighty_percent_fails_and_reset_restores_room() {
        let mut sorter = WasteSorter::new();
        let outcome = sort_all(&mut sorter, 5);
        assert!(matches!(outcome.verdict, RoomVerdict::Failed { .. }));
        assert_eq!(
            sorter.place("1", WasteKind::Biodegradable),
            Err(RoomError::AlreadyCompleted)
        );

        sorter.reset();
        assert_eq!(sorter.remaining_items().len(), 20);
        assert_eq!(sorter.eco_points(), 0);
        assert_eq!(sorter.verdict(), &RoomVerdict::InProgress);
    }

    #[test]
    fn sustainable_fast_fashion_choice_adds_bonus() {
        let mut sorter = WasteSorter::new();
        assert_eq!(
            sorter.choose_fast_fashion(FastFashionChoice::Sustainable),
            Err(RoomError::FastFashionNotOffered)
        );
        sorter.tick(180);
        assert!(sorter.fast_fashion_due());
        sorter
            .choose_fast_fashion(FastFashionChoice::Sustainable)
            .expect("choice accepted");
        assert!(!sorter.fast_fashion_due());

        let outcome = sort_all(&mut sorter, 0);
        match outcome.verdict {
            RoomVerdict::Completed { completion } => assert_eq!(completion.bonus, 50),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn fast_fashion_offer_closes_when_time_is_up() {
        let mut sorter = WasteSorter::new();
        sorter.tick(700);
        assert!(sorter.clock().is_expired());
        assert!(!sorter.fast_fashion_due());
        assert_eq!(
            sorter.choose_fast_fashion(FastFashionChoice::Buy),
            Err(RoomError::TimeUp)
        );
        assert_eq!(sorter.fast_fashion_choice(), None);
    }
}
