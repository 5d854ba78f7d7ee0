use crate::types::RoomId;

pub const TIME_BONUS_DIVISOR_SECS: u32 = 10;
pub const PHOTO_BONUS_POINTS: u32 = 50;

pub const ENERGY_POWER_DEMAND_MW: u32 = 100;
pub const ENERGY_RENEWABLE_TARGET_PCT: f32 = 70.0;
pub const ENERGY_RENEWABLE_POINTS: i32 = 15;
pub const ENERGY_FOSSIL_PENALTY: i32 = -10;
pub const ENERGY_BADGE_BONUS: u32 = 50;

pub const WASTE_TOTAL_ITEMS: usize = 20;
pub const WASTE_WIN_ACCURACY_PCT: f32 = 80.0;
pub const WASTE_FAST_FASHION_AFTER_SECS: u32 = 180;
pub const WASTE_SUSTAINABLE_BONUS: u32 = 50;

pub const WATER_SLOT_COUNT: usize = 6;
pub const WATER_PURITY_PER_STAGE: f32 = 16.67;
pub const WATER_WIN_PURITY_PCT: f32 = 70.0;
pub const WATER_POINTS_PER_STAGE: u32 = 20;

pub const SHELTER_COUNT: usize = 5;
pub const SHELTER_MATERIALS_TO_COMPLETE: usize = 3;
pub const SHELTER_SUSTAINABLE_PCT: f32 = 70.0;
pub const SHELTER_ECO_FRIENDLY_PCT: f32 = 80.0;
pub const SHELTER_HIGH_EMISSIONS: u32 = 80;
pub const SHELTER_ECO_FRIENDLY_POINTS: i32 = 25;
pub const SHELTER_HIGH_EMISSIONS_PENALTY: i32 = -20;
pub const SHELTERS_NEEDED_TO_WIN: usize = 3;

pub const POLICY_PICKS: usize = 3;
pub const POLICY_BASE_WARMING_DECI: i32 = 35;
pub const POLICY_MIN_WARMING_DECI: i32 = 5;
pub const POLICY_SAFE_WARMING_DECI: i32 = 20;
pub const POLICY_CRITICAL_WARMING_DECI: i32 = 25;
pub const POLICY_SAVED_POINTS: u32 = 50;
pub const POLICY_CRITICAL_POINTS: u32 = 25;
pub const POLICY_OPTIMAL_POINTS: u32 = 25;
pub const POLICY_OPTIMAL_BONUS: u32 = 50;

pub fn get_time_limit_secs(room: RoomId) -> u32 {
    match room {
        RoomId::Energy => 300,
        RoomId::Waste => 600,
        RoomId::Water => 420,
        RoomId::Shelter => 480,
        RoomId::Policy => 600,
    }
}

pub fn get_time_bonus(time_left_secs: u32) -> u32 {
    time_left_secs / TIME_BONUS_DIVISOR_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_bonus_floors_to_tens_of_seconds() {
        assert_eq!(get_time_bonus(0), 0);
        assert_eq!(get_time_bonus(9), 0);
        assert_eq!(get_time_bonus(10), 1);
        assert_eq!(get_time_bonus(299), 29);
    }

    #[test]
    fn every_room_has_a_positive_limit() {
        for room in RoomId::ALL {
            assert!(get_time_limit_secs(room) > 0);
        }
    }
}
