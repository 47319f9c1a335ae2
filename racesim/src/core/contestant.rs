use crate::core::car::{integrate, CarTuning, Controls, Position, Surface, VehicleState};
use crate::core::collision::{resolve, Body, CollisionOutcome, Terrain};
use crate::core::driver::{AiDriver, Observation};
use crate::core::state_handler::StateHandler;
use crate::core::track::{Circuit, GridSlot};
use crate::interfaces::state_interface::ContestantSnapshot;
use rand::Rng;
use std::rc::Rc;

/// Where the controls of a contestant come from. Network mirrors do not integrate physics at all
/// but copy the latest snapshot received from their peer.
#[derive(Debug, Clone)]
pub enum ControlSource {
    Human(Controls),
    Ai(AiDriver),
    NetworkMirror(Option<ContestantSnapshot>),
}

/// Read-only view of the session handed to every contestant update. `world` holds the committed
/// cars of the previous tick, in session order.
pub struct TickContext<'a> {
    pub own_idx: usize,
    pub circuit: &'a Circuit,
    pub terrain: &'a dyn Terrain,
    pub world: &'a [Body],
    pub race_live: bool,
    pub lap_target: usize,
    pub timestep_size: f64,
}

#[derive(Debug, Clone)]
pub struct Contestant {
    pub id: String,
    pub tuning: Rc<CarTuning>,
    pub state: VehicleState,
    pub sh: StateHandler,
    pub control: ControlSource,
    pub grid_slot: usize,
    pub surface: Surface,
    pub finished: bool,
    /// Car hit in the last update (index into the world snapshot) and the own state right before
    /// the contact
    pub contact: Option<(usize, VehicleState)>,
}

impl Contestant {
    pub fn new(
        id: &str,
        tuning: Rc<CarTuning>,
        control: ControlSource,
        grid_slot: usize,
        start: &GridSlot,
        circuit: &Circuit,
    ) -> Contestant {
        let position = Position::new(start.x, 0.0, start.z);
        let mut sh = StateHandler::default();
        sh.update_nearest_point(&position, circuit);

        Contestant {
            id: id.to_owned(),
            state: VehicleState::at_rest(position, start.orientation, &tuning),
            tuning,
            sh,
            control,
            grid_slot,
            surface: Surface::default(),
            finished: false,
            contact: None,
        }
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self.control, ControlSource::NetworkMirror(_))
    }

    /// set_human_controls replaces the controls of a human contestant. Returns false for any other
    /// control source.
    pub fn set_human_controls(&mut self, controls: Controls) -> bool {
        match &mut self.control {
            ControlSource::Human(c) => {
                *c = controls;
                true
            }
            _ => false,
        }
    }

    /// set_snapshot stores the latest remote state of a network mirror. Returns false for any other
    /// control source.
    pub fn set_snapshot(&mut self, snapshot: ContestantSnapshot) -> bool {
        match &mut self.control {
            ControlSource::NetworkMirror(s) => {
                *s = Some(snapshot);
                true
            }
            _ => false,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// update runs one tick for this contestant: controls, physics, collision and lap progress.
    /// Returns the lap time if a lap was completed in this tick.
    pub fn update<R: Rng + ?Sized>(&mut self, ctx: &TickContext, rng: &mut R) -> Option<u32> {
        self.contact = None;
        self.surface = ctx.terrain.surface_at(&self.state.position);

        // CONTROLS --------------------------------------------------------------------------------
        let mut controls = match &mut self.control {
            ControlSource::Human(c) => *c,
            ControlSource::Ai(ai) => {
                let others: Vec<Position> = ctx
                    .world
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != ctx.own_idx)
                    .map(|(_, b)| b.state.position)
                    .collect();
                let obs = Observation {
                    state: &self.state,
                    tuning: &self.tuning,
                    circuit: ctx.circuit,
                    nearest_point: self.sh.get_nearest_point(),
                    others: &others,
                    on_track: self.surface.on_track,
                    race_live: ctx.race_live,
                    timestep_size: ctx.timestep_size,
                };
                ai.decide(&obs, rng)
            }
            ControlSource::NetworkMirror(snapshot) => {
                let snapshot = snapshot.clone();
                return self.follow_snapshot(snapshot.as_ref(), ctx);
            }
        };

        if !ctx.race_live || !self.surface.grounded {
            controls.accelerator = 0.0;
            controls.brake = 0.0;
        }

        // PHYSICS ---------------------------------------------------------------------------------
        let pos_prev = self.state.position;
        let mut next = integrate(
            &self.state,
            &self.tuning,
            &controls,
            self.surface.on_track,
            ctx.timestep_size,
        );

        match resolve(ctx.own_idx, &pos_prev, &next.position, ctx.terrain, ctx.world) {
            CollisionOutcome::Clear => {}
            CollisionOutcome::Blocked => {
                log::trace!("{} hit the scenery at {:.1} m/s", self.id, next.speed);
                next.collide_static();
                next.position = pos_prev;
            }
            CollisionOutcome::Vehicle(other_idx) => {
                let other = &ctx.world[other_idx];
                log::trace!("{} hit car {} at {:.1} m/s", self.id, other_idx, next.speed);
                self.contact = Some((other_idx, next));
                next.collide_vehicle(self.tuning.mass, &other.state, other.mass);
                next.position = pos_prev;
            }
        }
        self.state = next;

        // RACE PROGRESS ---------------------------------------------------------------------------
        if self.finished || !ctx.race_live {
            self.sh.clear_new_lap();
            self.sh.update_nearest_point(&self.state.position, ctx.circuit);
            return None;
        }

        let lap_time = self
            .sh
            .update_race_prog(&self.state.position, ctx.circuit, ctx.timestep_size);
        self.check_finished(lap_time, ctx.lap_target);
        lap_time
    }

    /// take_hit applies the momentum of a car that ran into this one. Only the speed changes, the
    /// committed position stays.
    pub fn take_hit(&mut self, striker: &VehicleState, striker_mass: f64) {
        log::trace!("{} was hit at {:.1} m/s", self.id, striker.speed);
        self.state.collide_vehicle(self.tuning.mass, striker, striker_mass);
    }

    /// follow_snapshot copies the remote state into a mirror. The peer already resolved its own
    /// collisions, so neither physics nor collision run here. Sector time is accumulated locally.
    fn follow_snapshot(
        &mut self,
        snapshot: Option<&ContestantSnapshot>,
        ctx: &TickContext,
    ) -> Option<u32> {
        let snapshot = snapshot?;

        self.state = VehicleState {
            position: Position::new(snapshot.x, snapshot.y, snapshot.z),
            orientation: snapshot.orientation,
            direction: snapshot.direction,
            speed: snapshot.speed,
            angular_speed: snapshot.angular_speed,
            gear: snapshot.gear,
            rpm: snapshot.rpm,
        };

        if self.finished || !ctx.race_live {
            self.sh.clear_new_lap();
            return None;
        }

        self.sh.add_time(ctx.timestep_size);
        self.sh
            .sync(snapshot.lap, snapshot.intermediate, snapshot.nearest_point);

        let lap_time = if self.sh.get_new_lap() {
            self.sh.get_last_lap_time()
        } else {
            None
        };
        self.check_finished(lap_time, ctx.lap_target);
        lap_time
    }

    fn check_finished(&mut self, lap_time: Option<u32>, lap_target: usize) {
        if let Some(t) = lap_time {
            log::debug!(
                "{} completed lap {} in {:.3}s",
                self.id,
                self.sh.get_compl_lap(),
                t as f64 / 1000.0
            );
            if self.sh.get_compl_lap() >= lap_target {
                self.finished = true;
                log::debug!("{} finished", self.id);
            }
        }
    }

    /// snapshot returns the flat public state of this contestant.
    pub fn snapshot(&self) -> ContestantSnapshot {
        ContestantSnapshot {
            id: self.id.to_owned(),
            x: self.state.position.x,
            y: self.state.position.y,
            z: self.state.position.z,
            orientation: self.state.orientation,
            direction: self.state.direction,
            lap: self.sh.get_compl_lap(),
            intermediate: self.sh.get_intermediate(),
            nearest_point: self.sh.get_nearest_point(),
            cur_lap_time_ms: self.sh.get_cur_lap_time(),
            speed: self.state.speed,
            angular_speed: self.state.angular_speed,
            gear: self.state.gear,
            rpm: self.state.rpm,
        }
    }

    pub fn body(&self) -> Body {
        Body {
            state: self.state,
            mass: self.tuning.mass,
        }
    }
}
