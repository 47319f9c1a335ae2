use crate::post::race_result::RaceResult;
use serde::{Deserialize, Serialize};

/// (Hz) Upper bound for the frequency at which race states are streamed to a consumer
pub const MAX_STATE_UPDATE_FREQUENCY: f64 = 20.0;

/// Flat public state of one contestant, as read by a renderer or sent to a network peer. A peer
/// can rebuild a mirrored contestant from it without running physics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContestantSnapshot {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub orientation: f64,
    pub direction: f64,
    pub lap: usize,
    pub intermediate: usize,
    pub nearest_point: usize,
    pub cur_lap_time_ms: u32,
    pub speed: f64,
    pub angular_speed: f64,
    pub gear: i32,
    pub rpm: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RaceState {
    pub cur_racetime: f64,
    pub started: bool,
    pub finished: bool,
    // ordered by race position
    pub contestants: Vec<ContestantSnapshot>,

    // final results payload (sent once when the session finishes)
    pub final_result: Option<RaceResult>,
}
