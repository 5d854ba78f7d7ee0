pub mod campaign;
pub mod constants;
pub mod photo;
pub mod rng;
pub mod rooms;
pub mod roster;
pub mod scoreboard;
pub mod server_utils;
pub mod storage;
pub mod team_results;
pub mod team_store;
pub mod types;
