use crate::core::car::Position;
use crate::core::track::{Circuit, NO_INTERMEDIATES};
use serde::Serialize;

/// (m) A car within this distance of the next intermediate point has passed it
pub const INTERMEDIATE_CAPTURE_RADIUS: f64 = 10.0;

/// Sector times of one lap.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LapRecord {
    pub sectors_ms: [u32; NO_INTERMEDIATES],
    pub completed: bool,
}

impl LapRecord {
    pub fn lap_time_ms(&self) -> u32 {
        self.sectors_ms.iter().sum()
    }
}

/// StateHandler tracks the race progress of one contestant: completed laps, the active sector,
/// the nearest path point and the sector times of every lap driven so far. Lap records are only
/// ever appended.
#[derive(Debug, Clone)]
pub struct StateHandler {
    laps: Vec<LapRecord>,
    compl_lap_prev: usize,
    compl_lap_cur: usize,
    intermediate: usize,
    nearest_point: usize,
}

impl Default for StateHandler {
    fn default() -> Self {
        StateHandler {
            laps: vec![LapRecord::default()],
            compl_lap_prev: 0,
            compl_lap_cur: 0,
            intermediate: 0,
            nearest_point: 0,
        }
    }
}

impl StateHandler {
    /// update_nearest_point refreshes the nearest path point (seeded with the previous one).
    pub fn update_nearest_point(&mut self, position: &Position, circuit: &Circuit) {
        self.nearest_point = circuit.nearest_point(position, self.nearest_point);
    }

    /// update_race_prog adds the elapsed time to the active sector and advances the intermediate
    /// if the car is within the capture radius of the next intermediate point. Passing the third
    /// intermediate closes the lap and opens a new lap record. Returns the lap time of a lap
    /// completed in this step.
    pub fn update_race_prog(
        &mut self,
        position: &Position,
        circuit: &Circuit,
        timestep_size: f64,
    ) -> Option<u32> {
        self.compl_lap_prev = self.compl_lap_cur;
        self.update_nearest_point(position, circuit);
        self.add_time(timestep_size);

        let passed = circuit
            .intermediate_point(self.intermediate)
            .map_or(false, |p| p.position.distance_xz(position) < INTERMEDIATE_CAPTURE_RADIUS);
        if !passed {
            return None;
        }

        if self.intermediate + 1 < NO_INTERMEDIATES {
            self.intermediate += 1;
            None
        } else {
            Some(self.complete_lap())
        }
    }

    /// clear_new_lap ends the new-lap state of the last update for contestants whose timing is
    /// frozen.
    pub fn clear_new_lap(&mut self) {
        self.compl_lap_prev = self.compl_lap_cur;
    }

    /// add_time adds the step duration (rounded to whole milliseconds) to the active sector.
    pub fn add_time(&mut self, timestep_size: f64) {
        let ms = (timestep_size * 1000.0).round().max(0.0) as u32;
        let sector = &mut self.laps[self.compl_lap_cur].sectors_ms[self.intermediate];
        *sector = sector.saturating_add(ms);
    }

    fn complete_lap(&mut self) -> u32 {
        let record = &mut self.laps[self.compl_lap_cur];
        record.completed = true;
        let lap_time = record.lap_time_ms();

        self.compl_lap_cur += 1;
        self.intermediate = 0;
        self.laps.push(LapRecord::default());
        lap_time
    }

    /// sync takes over lap, intermediate and nearest point from a remote peer. Laps the peer
    /// finished in between are closed with the sector times accumulated locally.
    pub fn sync(&mut self, compl_lap: usize, intermediate: usize, nearest_point: usize) {
        self.compl_lap_prev = self.compl_lap_cur;
        while self.compl_lap_cur < compl_lap {
            self.complete_lap();
        }
        self.intermediate = intermediate.min(NO_INTERMEDIATES - 1);
        self.nearest_point = nearest_point;
    }

    pub fn get_compl_lap(&self) -> usize {
        self.compl_lap_cur
    }

    pub fn get_intermediate(&self) -> usize {
        self.intermediate
    }

    pub fn get_nearest_point(&self) -> usize {
        self.nearest_point
    }

    /// get_new_lap returns true if a lap was completed in the last update.
    pub fn get_new_lap(&self) -> bool {
        self.compl_lap_cur > self.compl_lap_prev
    }

    /// get_race_prog returns a single number that grows along the race:
    /// lap * 10000 + intermediate * 1000 + nearest point.
    pub fn get_race_prog(&self) -> i64 {
        self.compl_lap_cur as i64 * 10000 + self.intermediate as i64 * 1000 + self.nearest_point as i64
    }

    pub fn get_laps(&self) -> &[LapRecord] {
        &self.laps
    }

    pub fn get_lap(&self, lap: usize) -> Option<&LapRecord> {
        self.laps.get(lap)
    }

    pub fn get_sector_time(&self, lap: usize, sector: usize) -> Option<u32> {
        self.laps.get(lap)?.sectors_ms.get(sector).copied()
    }

    /// get_cur_lap_time returns the time spent in the lap in progress.
    pub fn get_cur_lap_time(&self) -> u32 {
        self.laps[self.compl_lap_cur].lap_time_ms()
    }

    /// get_last_lap_time returns the time of the previous lap, None during the first lap.
    pub fn get_last_lap_time(&self) -> Option<u32> {
        let prev = self.compl_lap_cur.checked_sub(1)?;
        self.laps
            .get(prev)
            .filter(|l| l.completed)
            .map(LapRecord::lap_time_ms)
    }

    /// get_best_lap_time returns the fastest completed lap.
    pub fn get_best_lap_time(&self) -> Option<u32> {
        self.laps
            .iter()
            .filter(|l| l.completed)
            .map(LapRecord::lap_time_ms)
            .min()
    }
}
