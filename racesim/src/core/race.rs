use crate::core::car::{CarTuning, Controls, VehicleState};
use crate::core::collision::{Body, Terrain};
use crate::core::contestant::{Contestant, ControlSource, TickContext};
use crate::core::driver::{AiDriver, Personality};
use crate::core::track::Circuit;
use crate::interfaces::state_interface::{ContestantSnapshot, RaceState};
use crate::post::race_result::{ClassifiedEntry, RaceResult, TrackRecord};
use helpers::general::{stable_hash, InputValueError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RaceMode {
    /// Ranked by best completed lap
    Time,
    /// Ranked by progress along the race
    Race,
}

/// * `mode` - Ranking mode of the session
/// * `laps` - Number of laps after which a contestant is finished
/// * `countdown_s` - (s) Time before the start during which throttle is gated
/// * `finish_grace_s` - (s) Time the session keeps running after the first contestant finished
/// * `seed` - Seed of the random source of the session (entropy if not set)
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionPars {
    pub mode: RaceMode,
    pub laps: usize,
    #[serde(default)]
    pub countdown_s: f64,
    #[serde(default)]
    pub finish_grace_s: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    DuplicateId(String),
    AlreadyStarted,
    UnknownCar(String),
    GridSlotOutOfRange(usize),
    UnknownContestant(String),
    WrongControlSource(String),
    InvalidControls(InputValueError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DuplicateId(id) => write!(f, "Contestant {} exists already", id),
            SessionError::AlreadyStarted => write!(f, "Session has already started"),
            SessionError::UnknownCar(name) => write!(f, "Unknown car {}", name),
            SessionError::GridSlotOutOfRange(slot) => {
                write!(f, "Grid slot {} does not exist on this circuit", slot)
            }
            SessionError::UnknownContestant(id) => write!(f, "Unknown contestant {}", id),
            SessionError::WrongControlSource(id) => {
                write!(f, "Contestant {} is not controlled this way", id)
            }
            SessionError::InvalidControls(err) => write!(f, "Rejected controls: {}", err),
        }
    }
}

impl std::error::Error for SessionError {}

fn validate(controls: &Controls) -> Result<(), SessionError> {
    Controls::new(
        controls.accelerator,
        controls.brake,
        controls.steering,
        controls.gear_change,
    )
    .map(|_| ())
    .map_err(SessionError::InvalidControls)
}

#[derive(Debug)]
pub struct RaceSession {
    pub mode: RaceMode,
    pub lap_target: usize,
    pub cur_racetime: f64,
    countdown: f64,
    finish_grace_s: f64,
    grace: Option<f64>,
    started: bool,
    finished: bool,
    circuit: Rc<Circuit>,
    contestants: Vec<Contestant>,
    id_index: HashMap<String, usize>,
    rng: StdRng,
}

impl RaceSession {
    pub fn new(session_pars: &SessionPars, circuit: Rc<Circuit>) -> RaceSession {
        let rng = match session_pars.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        RaceSession {
            mode: session_pars.mode,
            lap_target: session_pars.laps,
            cur_racetime: 0.0,
            countdown: session_pars.countdown_s,
            finish_grace_s: session_pars.finish_grace_s,
            grace: None,
            started: false,
            finished: false,
            circuit,
            contestants: Vec::new(),
            id_index: HashMap::new(),
            rng,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // SETUP ---------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// add_contestant places a new contestant on the given grid slot. Contestants can only be
    /// added before the start and identifiers must be unique.
    pub fn add_contestant(
        &mut self,
        id: &str,
        tuning: Rc<CarTuning>,
        control: ControlSource,
        grid_slot: usize,
    ) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        if self.id_index.contains_key(id) {
            return Err(SessionError::DuplicateId(id.to_owned()));
        }
        if let ControlSource::Human(controls) = &control {
            validate(controls)?;
        }
        let start = *self
            .circuit
            .grid_slot(grid_slot)
            .ok_or(SessionError::GridSlotOutOfRange(grid_slot))?;

        log::debug!("Adding contestant {} ({}) on grid slot {}", id, tuning.name, grid_slot);
        self.id_index.insert(id.to_owned(), self.contestants.len());
        self.contestants.push(Contestant::new(
            id,
            tuning,
            control,
            grid_slot,
            &start,
            &self.circuit,
        ));
        Ok(())
    }

    /// add_ai_contestant adds an AI contestant with a personality drawn from the session's random
    /// source.
    pub fn add_ai_contestant(
        &mut self,
        id: &str,
        tuning: Rc<CarTuning>,
        grid_slot: usize,
    ) -> Result<Personality, SessionError> {
        let personality = Personality::random(&mut self.rng);
        self.add_contestant(id, tuning, ControlSource::Ai(AiDriver::new(personality)), grid_slot)?;
        Ok(personality)
    }

    /// set_controls hands this tick's input to a human contestant. Controls outside their range
    /// (NaN included) are rejected and the previous controls stay in place.
    pub fn set_controls(&mut self, id: &str, controls: Controls) -> Result<(), SessionError> {
        validate(&controls)?;
        let contestant = self.contestant_mut(id)?;
        if contestant.set_human_controls(controls) {
            Ok(())
        } else {
            Err(SessionError::WrongControlSource(id.to_owned()))
        }
    }

    /// push_snapshot stores the latest state received from a peer for its mirrored contestant.
    pub fn push_snapshot(&mut self, snapshot: ContestantSnapshot) -> Result<(), SessionError> {
        let id = snapshot.id.to_owned();
        let contestant = self.contestant_mut(&id)?;
        if contestant.set_snapshot(snapshot) {
            Ok(())
        } else {
            Err(SessionError::WrongControlSource(id))
        }
    }

    fn contestant_mut(&mut self, id: &str) -> Result<&mut Contestant, SessionError> {
        let idx = *self
            .id_index
            .get(id)
            .ok_or_else(|| SessionError::UnknownContestant(id.to_owned()))?;
        Ok(&mut self.contestants[idx])
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// tick advances the session by one time step. Every contestant is updated against the world
    /// as it was committed in the previous tick.
    pub fn tick(&mut self, timestep_size: f64, terrain: &dyn Terrain) {
        if self.finished {
            return;
        }
        self.cur_racetime += timestep_size;

        if !self.started {
            self.countdown -= timestep_size;
            if self.countdown <= 0.0 {
                self.started = true;
                log::info!("Session started at {:.3}s", self.cur_racetime);
            }
        }
        let race_live = self.started;

        let world: Vec<Body> = self.contestants.iter().map(Contestant::body).collect();
        for (idx, contestant) in self.contestants.iter_mut().enumerate() {
            let ctx = TickContext {
                own_idx: idx,
                circuit: &self.circuit,
                terrain,
                world: &world,
                race_live,
                lap_target: self.lap_target,
                timestep_size,
            };
            contestant.update(&ctx, &mut self.rng);
        }
        self.exchange_contacts(&world);

        if self.started {
            self.update_finish(timestep_size);
        }
    }

    /// exchange_contacts hands the momentum of every car that ran into another one in this tick to
    /// the car it hit. Contacts both cars registered themselves (head-on) are already resolved.
    /// Mirrors are moved by their peer only.
    fn exchange_contacts(&mut self, world: &[Body]) {
        let contacts: Vec<(usize, usize, VehicleState)> = self
            .contestants
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.contact.map(|(hit_idx, striker)| (idx, hit_idx, striker)))
            .collect();

        for (idx, hit_idx, striker) in contacts {
            let struck = &mut self.contestants[hit_idx];
            if struck.is_mirror() || struck.contact.map_or(false, |(other, _)| other == idx) {
                continue;
            }
            struck.take_hit(&striker, world[idx].mass);
        }
    }

    fn update_finish(&mut self, timestep_size: f64) {
        if self.contestants.iter().all(|c| c.finished) {
            self.finish();
            return;
        }

        if let Some(grace) = self.grace {
            let grace = grace - timestep_size;
            self.grace = Some(grace);
            if grace <= 0.0 {
                self.finish();
            }
        } else if self.contestants.iter().any(|c| c.finished) {
            self.grace = Some(self.finish_grace_s);
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        log::info!("Session finished at {:.3}s", self.cur_racetime);
    }

    // ---------------------------------------------------------------------------------------------
    // RANKING -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// compare returns Less if `a` ranks ahead of `b`. Distinct identifiers never compare equal.
    fn compare(&self, a: &Contestant, b: &Contestant) -> Ordering {
        let by_mode = match self.mode {
            RaceMode::Time => match (a.sh.get_best_lap_time(), b.sh.get_best_lap_time()) {
                (Some(t_a), Some(t_b)) => t_a.cmp(&t_b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            RaceMode::Race => b.sh.get_race_prog().cmp(&a.sh.get_race_prog()),
        };

        by_mode
            .then_with(|| stable_hash(&a.id).cmp(&stable_hash(&b.id)))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// race_position returns the 1-based rank of a contestant.
    pub fn race_position(&self, id: &str) -> Option<usize> {
        let own = &self.contestants[*self.id_index.get(id)?];
        let no_ahead = self
            .contestants
            .iter()
            .filter(|other| other.id != own.id && self.compare(other, own) == Ordering::Less)
            .count();
        Some(no_ahead + 1)
    }

    /// classification returns the contestant indices ordered by race position.
    pub fn classification(&self) -> Vec<usize> {
        let mut idxs: Vec<usize> = (0..self.contestants.len()).collect();
        idxs.sort_by(|&i, &j| self.compare(&self.contestants[i], &self.contestants[j]));
        idxs
    }

    /// contestant_at_position is the inverse of race_position.
    pub fn contestant_at_position(&self, position: usize) -> Option<&Contestant> {
        if position == 0 || position > self.contestants.len() {
            return None;
        }
        let idx = self.classification()[position - 1];
        Some(&self.contestants[idx])
    }

    /// fastest_lap_holder returns the contestant with the fastest completed lap. On equal times
    /// the one added first wins.
    pub fn fastest_lap_holder(&self) -> Option<&Contestant> {
        let mut holder: Option<(&Contestant, u32)> = None;
        for contestant in self.contestants.iter() {
            if let Some(t) = contestant.sh.get_best_lap_time() {
                if holder.map_or(true, |(_, t_best)| t < t_best) {
                    holder = Some((contestant, t));
                }
            }
        }
        holder.map(|(c, _)| c)
    }

    // ---------------------------------------------------------------------------------------------
    // OUTPUT --------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// track_records returns one record per contestant with a completed lap.
    pub fn track_records(&self) -> Vec<TrackRecord> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());

        self.contestants
            .iter()
            .filter_map(|c| {
                c.sh.get_best_lap_time().map(|best_lap_ms| TrackRecord {
                    id: c.id.to_owned(),
                    car_name: c.tuning.name.to_owned(),
                    circuit_name: self.circuit.name.to_owned(),
                    best_lap_ms,
                    version: env!("CARGO_PKG_VERSION").to_owned(),
                    timestamp,
                })
            })
            .collect()
    }

    /// snapshots returns the public state of every contestant in insertion order.
    pub fn snapshots(&self) -> Vec<ContestantSnapshot> {
        self.contestants.iter().map(Contestant::snapshot).collect()
    }

    /// get_race_state returns the current state ordered by race position.
    pub fn get_race_state(&self) -> RaceState {
        RaceState {
            cur_racetime: self.cur_racetime,
            started: self.started,
            finished: self.finished,
            contestants: self
                .classification()
                .into_iter()
                .map(|idx| self.contestants[idx].snapshot())
                .collect(),
            final_result: None,
        }
    }

    pub fn get_race_result(&self) -> RaceResult {
        RaceResult {
            circuit_name: self.circuit.name.to_owned(),
            mode: self.mode,
            lap_target: self.lap_target,
            racetime: self.cur_racetime,
            classification: self
                .classification()
                .into_iter()
                .enumerate()
                .map(|(i, idx)| {
                    let c = &self.contestants[idx];
                    ClassifiedEntry {
                        position: i + 1,
                        id: c.id.to_owned(),
                        car_name: c.tuning.name.to_owned(),
                        compl_laps: c.sh.get_compl_lap(),
                        finished: c.finished,
                        best_lap_ms: c.sh.get_best_lap_time(),
                        lap_times_ms: c
                            .sh
                            .get_laps()
                            .iter()
                            .filter(|l| l.completed)
                            .map(|l| l.lap_time_ms())
                            .collect(),
                    }
                })
                .collect(),
            fastest_lap: self
                .fastest_lap_holder()
                .and_then(|c| c.sh.get_best_lap_time().map(|t| (c.id.to_owned(), t))),
            track_records: self.track_records(),
        }
    }

    // ---------------------------------------------------------------------------------------------
    // GETTERS -------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn get_circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn get_contestants(&self) -> &[Contestant] {
        &self.contestants
    }

    pub fn get_contestant(&self, id: &str) -> Option<&Contestant> {
        self.id_index.get(id).map(|&idx| &self.contestants[idx])
    }

    pub fn get_no_contestants(&self) -> usize {
        self.contestants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collision::OpenGround;
    use crate::core::state_handler::StateHandler;
    use crate::core::track::tests::square_circuit_pars;
    use crate::core::track::GridSlot;
    use approx::assert_relative_eq;

    const DT: f64 = 0.1;

    fn session(mode: RaceMode, countdown_s: f64) -> RaceSession {
        let pars = SessionPars {
            mode,
            laps: 1,
            countdown_s,
            finish_grace_s: 5.0,
            seed: Some(7),
        };
        let mut circuit_pars = square_circuit_pars(100.0, 10);
        circuit_pars.grid = (0..6)
            .map(|i| GridSlot { x: 0.0, z: -8.0 * i as f64, orientation: 0.0 })
            .collect();
        RaceSession::new(&pars, Rc::new(Circuit::new(&circuit_pars).unwrap()))
    }

    fn tuning() -> Rc<CarTuning> {
        Rc::new(CarTuning::default())
    }

    fn human() -> ControlSource {
        ControlSource::Human(Controls::default())
    }

    /// lap_with builds a state handler that has completed one lap in `t_ms`.
    fn lap_with(t_ms: u32, circuit: &Circuit) -> StateHandler {
        let mut sh = StateHandler::default();
        let dt = t_ms as f64 / 3000.0;
        for i in 0..3 {
            let p = circuit.intermediate_point(i).unwrap().position;
            sh.update_race_prog(&p, circuit, dt);
        }
        sh
    }

    #[test]
    fn test_setup_errors() {
        let mut s = session(RaceMode::Race, 0.0);
        s.add_contestant("a", tuning(), human(), 0).unwrap();
        assert_eq!(
            s.add_contestant("a", tuning(), human(), 1),
            Err(SessionError::DuplicateId(String::from("a")))
        );
        assert_eq!(
            s.add_contestant("b", tuning(), human(), 6),
            Err(SessionError::GridSlotOutOfRange(6))
        );
        assert_eq!(
            s.set_controls("x", Controls::default()),
            Err(SessionError::UnknownContestant(String::from("x")))
        );
        assert_eq!(
            s.push_snapshot(ContestantSnapshot { id: String::from("a"), ..Default::default() }),
            Err(SessionError::WrongControlSource(String::from("a")))
        );

        s.tick(DT, &OpenGround);
        assert!(s.is_started());
        assert_eq!(
            s.add_contestant("c", tuning(), human(), 1),
            Err(SessionError::AlreadyStarted)
        );
        assert_eq!(s.get_no_contestants(), 1);
        assert_eq!(s.get_circuit().no_points(), 40);
    }

    #[test]
    fn test_out_of_range_controls_rejected() {
        let mut s = session(RaceMode::Race, 0.0);
        s.add_contestant("a", tuning(), human(), 0).unwrap();

        let nan_pedal = Controls {
            accelerator: f64::NAN,
            brake: 3.0,
            ..Controls::default()
        };
        let err = s.set_controls("a", nan_pedal).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidControls(InputValueError { name: "accelerator", .. })
        ));
        assert_eq!(
            s.set_controls("a", Controls { brake: 3.0, ..Controls::default() }),
            Err(SessionError::InvalidControls(InputValueError { name: "brake", value: 3.0 }))
        );
        assert!(matches!(
            s.add_contestant(
                "b",
                tuning(),
                ControlSource::Human(Controls { steering: -1.5, ..Controls::default() }),
                1
            ),
            Err(SessionError::InvalidControls(_))
        ));

        // rejected input never reaches the car
        s.set_controls("a", Controls { accelerator: 0.5, ..Controls::default() }).unwrap();
        assert!(s.set_controls("a", nan_pedal).is_err());
        for _ in 0..20 {
            s.tick(DT, &OpenGround);
        }
        let a = s.get_contestant("a").unwrap();
        assert!(a.state.is_finite());
        assert!(a.state.speed > 0.0);
        assert_eq!(s.get_no_contestants(), 1);
    }

    #[test]
    fn test_struck_car_receives_momentum() {
        let dt = 0.02;
        let mut s = session(RaceMode::Race, 0.0);
        s.add_contestant("parked", tuning(), human(), 0).unwrap();
        let full_throttle = Controls { accelerator: 1.0, ..Controls::default() };
        s.add_contestant("pusher", tuning(), ControlSource::Human(full_throttle), 1)
            .unwrap();

        let mut contact_tick = None;
        for step in 0..300 {
            s.tick(dt, &OpenGround);
            if s.get_contestant("parked").unwrap().state.speed > 0.0 {
                contact_tick = Some(step);
                break;
            }
        }
        assert!(contact_tick.is_some(), "parked car was never pushed");

        // equal masses: the pusher stops and the parked car takes over its speed
        let pusher = s.get_contestant("pusher").unwrap();
        let (hit_idx, striker) = pusher.contact.unwrap();
        assert_eq!(hit_idx, 0);
        assert_relative_eq!(pusher.state.speed, 0.0, epsilon = 1e-9);
        assert_relative_eq!(
            s.get_contestant("parked").unwrap().state.speed,
            striker.speed,
            epsilon = 1e-9
        );

        // the pusher is not pinned: both cars keep moving up the straight
        for _ in 0..200 {
            s.tick(dt, &OpenGround);
        }
        assert!(s.get_contestant("parked").unwrap().state.position.z > 0.5);
        assert!(s.get_contestant("pusher").unwrap().state.position.z > -4.0);
    }

    #[test]
    fn test_countdown_gates_start() {
        let mut s = session(RaceMode::Race, 1.0);
        s.add_contestant("a", tuning(), ControlSource::Human(Controls { accelerator: 1.0, ..Default::default() }), 0)
            .unwrap();

        for _ in 0..9 {
            s.tick(DT, &OpenGround);
            assert!(!s.is_started());
        }
        assert_eq!(s.get_contestant("a").unwrap().state.speed, 0.0);

        for _ in 0..4 {
            s.tick(DT, &OpenGround);
        }
        assert!(s.is_started());
        assert!(!s.is_finished());
        assert!(s.get_contestant("a").unwrap().state.speed > 0.0);
    }

    #[test]
    fn test_time_mode_tie_broken_by_identifier_hash() {
        let mut s = session(RaceMode::Time, 0.0);
        for (slot, id) in ["car_b", "car_a", "car_c"].iter().enumerate() {
            s.add_contestant(id, tuning(), human(), slot).unwrap();
        }
        let circuit = Rc::clone(&s.circuit);
        s.contestants[0].sh = lap_with(90_000, &circuit);
        s.contestants[1].sh = lap_with(90_000, &circuit);

        assert_eq!(s.contestants[0].sh.get_best_lap_time(), Some(90_000));
        let (ahead, behind) = if stable_hash("car_a") < stable_hash("car_b") {
            ("car_a", "car_b")
        } else {
            ("car_b", "car_a")
        };
        for _ in 0..5 {
            assert_eq!(s.race_position(ahead), Some(1));
            assert_eq!(s.race_position(behind), Some(2));
            // no lap time ranks behind everybody
            assert_eq!(s.race_position("car_c"), Some(3));
        }
        assert_eq!(s.fastest_lap_holder().unwrap().id, "car_b");
    }

    #[test]
    fn test_race_mode_ranks_by_progress() {
        let mut s = session(RaceMode::Race, 0.0);
        for (slot, id) in ["a", "b", "c"].iter().enumerate() {
            s.add_contestant(id, tuning(), human(), slot).unwrap();
        }
        let circuit = Rc::clone(&s.circuit);
        s.contestants[2].sh = lap_with(60_000, &circuit);
        s.contestants[0].sh.update_nearest_point(&circuit.point(5).unwrap().position, &circuit);

        assert_eq!(s.race_position("c"), Some(1));
        assert_eq!(s.race_position("a"), Some(2));
        assert_eq!(s.race_position("b"), Some(3));
        assert_eq!(s.race_position("nobody"), None);
        assert_eq!(s.contestant_at_position(1).unwrap().id, "c");
        assert_eq!(s.contestant_at_position(3).unwrap().id, "b");
        assert!(s.contestant_at_position(0).is_none());
        assert!(s.contestant_at_position(4).is_none());
    }

    #[test]
    fn test_positions_are_a_bijection() {
        let mut s = session(RaceMode::Race, 0.0);
        for slot in 0..6 {
            s.add_ai_contestant(&format!("ai_{}", slot), tuning(), slot).unwrap();
        }
        for step in 0..300 {
            s.tick(DT, &OpenGround);
            if step % 50 != 0 {
                continue;
            }
            let mut positions: Vec<usize> = s
                .get_contestants()
                .iter()
                .map(|c| s.race_position(&c.id).unwrap())
                .collect();
            for c in s.get_contestants() {
                let p = s.race_position(&c.id).unwrap();
                assert_eq!(s.contestant_at_position(p).unwrap().id, c.id);
            }
            positions.sort_unstable();
            assert_eq!(positions, (1..=6).collect::<Vec<usize>>());
        }
    }

    #[test]
    fn test_fastest_lap_holder_first_found_wins() {
        let mut s = session(RaceMode::Race, 0.0);
        for (slot, id) in ["x", "y", "z"].iter().enumerate() {
            s.add_contestant(id, tuning(), human(), slot).unwrap();
        }
        assert!(s.fastest_lap_holder().is_none());
        let circuit = Rc::clone(&s.circuit);
        s.contestants[1].sh = lap_with(80_000, &circuit);
        s.contestants[2].sh = lap_with(80_000, &circuit);
        assert_eq!(s.fastest_lap_holder().unwrap().id, "y");

        let records = s.track_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "y");
        assert_eq!(records[0].circuit_name, "square");
        assert_eq!(records[0].best_lap_ms, 80_000);
        assert_eq!(records[0].version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_mirror_follows_pushed_snapshots() {
        let mut s = session(RaceMode::Race, 0.0);
        s.add_contestant("net", tuning(), ControlSource::NetworkMirror(None), 0).unwrap();
        s.push_snapshot(ContestantSnapshot {
            id: String::from("net"),
            x: 0.0,
            z: 40.0,
            speed: 25.0,
            nearest_point: 4,
            ..Default::default()
        })
        .unwrap();
        s.tick(DT, &OpenGround);

        let snapshots = s.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].z, 40.0);
        assert_eq!(snapshots[0].speed, 25.0);
        assert_eq!(snapshots[0].nearest_point, 4);
    }

    #[test]
    fn test_grace_period_ends_session() {
        let mut s = session(RaceMode::Race, 0.0);
        s.add_contestant("a", tuning(), human(), 0).unwrap();
        s.add_contestant("b", tuning(), human(), 1).unwrap();
        s.tick(DT, &OpenGround);
        s.contestants[0].finished = true;

        // grace period of 5s starts in the next tick
        for _ in 0..45 {
            s.tick(DT, &OpenGround);
            assert!(!s.is_finished());
        }
        for _ in 0..10 {
            s.tick(DT, &OpenGround);
        }
        assert!(s.is_finished());
        assert!(s.is_started());

        let t_end = s.cur_racetime;
        s.tick(DT, &OpenGround);
        assert_eq!(s.cur_racetime, t_end);
        assert!(s.is_finished());
    }
}
