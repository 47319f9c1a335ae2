use crate::core::car::{CarTuning, Controls, Position, VehicleState};
use crate::core::track::Circuit;
use helpers::general::round_to_decimals;
use rand::distributions::OpenClosed01;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

// AI CONSTANTS ------------------------------------------------------------------------------------
/// Number of path points the AI aims ahead of its nearest point
pub const LOOK_AHEAD_POINTS: usize = 3;
/// (m) Lateral target offset below which the AI keeps the wheel straight
pub const STEERING_DEAD_ZONE: f64 = 0.5;
/// (m) Corridor ahead in which a car triggers an overtaking attempt
pub const LINE_FRONT_LENGTH: f64 = 15.0;
pub const LINE_FRONT_HALF_WIDTH: f64 = 2.0;
/// (m) Corridor behind in which a car triggers blocking
pub const LINE_BACK_LENGTH: f64 = 10.0;
pub const LINE_BACK_HALF_WIDTH: f64 = 2.0;
/// (m) A car ahead closer than this forces evasion
pub const EVADE_RADIUS: f64 = 6.0;
/// (m/s) Below this speed the AI always goes to full throttle
pub const MIN_SPEED: f64 = 5.0;
/// (m/s per m) Allowed excess over a suggested speed per metre of distance to that point
pub const BRAKE_THRESHOLD_PER_METRE: f64 = 0.25;
/// (m) Closer than this to a speed-constrained point the throttle is scaled by skill
pub const SLOW_ZONE_DISTANCE: f64 = 40.0;
/// Per-tick probability scale of an overtaking attempt
pub const OVERTAKE_CHANCE: f64 = 0.1;
/// Per-tick probability scale of a blocking manoeuvre
pub const BLOCK_CHANCE: f64 = 0.05;

pub const SKILL_BASE: f64 = 0.4;
pub const SKILL_SPREAD: f64 = 0.6;
pub const AGGRESSION_BASE: f64 = 0.2;
pub const AGGRESSION_SPREAD: f64 = 0.8;

/// chance returns true with probability `p`: a uniform draw from (0, 1] has to exceed `1 - p`.
/// `chance(0)` never succeeds, `chance(1)` always does.
pub fn chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    let draw: f64 = rng.sample(OpenClosed01);
    draw > 1.0 - p
}

/// Fixed character of an AI driver.
/// * `skill` - [0.4, 1.0] Throttle discipline near corners, blocking tendency, evasion recovery
/// * `aggression` - [0.2, 1.0] Overtaking tendency and persistence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub skill: f64,
    pub aggression: f64,
}

impl Personality {
    /// random draws base value plus a uniform offset for both scalars, rounded to one decimal.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Personality {
        let skill_offset = Uniform::new_inclusive(0.0, SKILL_SPREAD);
        let aggression_offset = Uniform::new_inclusive(0.0, AGGRESSION_SPREAD);
        Personality {
            skill: round_to_decimals(SKILL_BASE + skill_offset.sample(rng), 1)
                .clamp(SKILL_BASE, SKILL_BASE + SKILL_SPREAD),
            aggression: round_to_decimals(AGGRESSION_BASE + aggression_offset.sample(rng), 1)
                .clamp(AGGRESSION_BASE, AGGRESSION_BASE + AGGRESSION_SPREAD),
        }
    }

    pub fn overtake_probability(&self) -> f64 {
        OVERTAKE_CHANCE * (self.skill + self.aggression) / 2.0
    }

    pub fn block_probability(&self) -> f64 {
        BLOCK_CHANCE * self.skill
    }

    /// behavior_duration returns how long a freshly entered behavior is held, in seconds.
    pub fn behavior_duration<R: Rng + ?Sized>(&self, behavior: Behavior, rng: &mut R) -> f64 {
        let draw: f64 = rng.gen();
        match behavior {
            Behavior::Driving => 0.0,
            Behavior::Overtaking => 1.0 + 3.0 * self.aggression * draw,
            Behavior::Blocking => 1.0 + 2.0 * self.skill * draw,
            Behavior::Evading => 0.5 + (1.0 - self.skill) * draw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Behavior {
    Driving,
    Overtaking,
    Blocking,
    Evading,
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Driving
    }
}

/// Countdown that holds a behavior before the AI looks around again.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BehaviorTimer {
    remaining: f64,
}

impl BehaviorTimer {
    pub fn start(&mut self, duration: f64) {
        self.remaining = duration;
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// tick counts down and returns true in the step the timer runs out.
    pub fn tick(&mut self, timestep_size: f64) -> bool {
        if !self.is_active() {
            return false;
        }
        self.remaining -= timestep_size;
        !self.is_active()
    }
}

/// evaluate_behavior looks at the other cars in the own car's frame and decides whether a new
/// behavior is entered. Returns the behavior and whether the racing line flips. A car right in
/// front always forces evasion, whatever the other checks said.
pub fn evaluate_behavior<R: Rng + ?Sized>(
    own: &VehicleState,
    others: &[Position],
    p_overtake: f64,
    p_block: f64,
    rng: &mut R,
) -> Option<(Behavior, bool)> {
    let mut decision = None;
    let mut evade = false;

    for other in others {
        let (lateral, forward) = own.position.to_local(own.orientation, other);

        if forward > 0.0 && own.position.distance_xz(other) < EVADE_RADIUS {
            evade = true;
        }

        if decision.is_some() {
            continue;
        }
        if forward > 0.0
            && forward < LINE_FRONT_LENGTH
            && lateral.abs() < LINE_FRONT_HALF_WIDTH
            && chance(rng, p_overtake)
        {
            decision = Some((Behavior::Overtaking, true));
        } else if forward < 0.0
            && -forward < LINE_BACK_LENGTH
            && lateral.abs() < LINE_BACK_HALF_WIDTH
            && chance(rng, p_block)
        {
            decision = Some((Behavior::Blocking, true));
        }
    }

    if evade {
        Some((Behavior::Evading, false))
    } else {
        decision
    }
}

/// steer_towards returns full lock towards the target or straight ahead inside the dead zone.
pub fn steer_towards(state: &VehicleState, target: &Position) -> f64 {
    let (lateral, _) = state.position.to_local(state.orientation, target);
    if lateral > STEERING_DEAD_ZONE {
        1.0
    } else if lateral < -STEERING_DEAD_ZONE {
        -1.0
    } else {
        0.0
    }
}

/// Everything the AI may look at in one step. Other cars are given with their positions of the
/// previous step.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub state: &'a VehicleState,
    pub tuning: &'a CarTuning,
    pub circuit: &'a Circuit,
    pub nearest_point: usize,
    pub others: &'a [Position],
    pub on_track: bool,
    pub race_live: bool,
    pub timestep_size: f64,
}

/// Decision state of one AI contestant.
#[derive(Debug, Clone)]
pub struct AiDriver {
    pub personality: Personality,
    behavior: Behavior,
    alternate_line: bool,
    timer: BehaviorTimer,
    target: Position,
}

impl AiDriver {
    pub fn new(personality: Personality) -> AiDriver {
        AiDriver {
            personality,
            behavior: Behavior::Driving,
            alternate_line: false,
            timer: BehaviorTimer::default(),
            target: Position::default(),
        }
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn alternate_line(&self) -> bool {
        self.alternate_line
    }

    pub fn target(&self) -> Position {
        self.target
    }

    /// decide runs the behavior state machine for one step and returns the controls.
    pub fn decide<R: Rng + ?Sized>(&mut self, obs: &Observation, rng: &mut R) -> Controls {
        let state = obs.state;

        // BEHAVIOR --------------------------------------------------------------------------------
        if self.timer.tick(obs.timestep_size) {
            log::trace!("AI behavior {:?} expired", self.behavior);
            self.behavior = Behavior::Driving;
            self.alternate_line = false;
        }

        if !self.timer.is_active() {
            if let Some((behavior, flip_line)) = evaluate_behavior(
                state,
                obs.others,
                self.personality.overtake_probability(),
                self.personality.block_probability(),
                rng,
            ) {
                log::trace!("AI behavior {:?} -> {:?}", self.behavior, behavior);
                self.behavior = behavior;
                if flip_line {
                    self.alternate_line = !self.alternate_line;
                }
                self.timer.start(self.personality.behavior_duration(behavior, rng));
            }
        }

        // STEERING --------------------------------------------------------------------------------
        self.target = obs
            .circuit
            .point_ahead(obs.nearest_point, LOOK_AHEAD_POINTS)
            .line_position(self.alternate_line);

        let mut controls = Controls {
            steering: steer_towards(state, &self.target),
            ..Controls::default()
        };

        // THROTTLE / BRAKE ------------------------------------------------------------------------
        match obs.circuit.next_speed_constraint(obs.nearest_point) {
            Some((idx, v_suggested)) => {
                let d = obs
                    .circuit
                    .point(idx)
                    .map_or(0.0, |p| p.position.distance_xz(&state.position));
                if state.speed - v_suggested > d * BRAKE_THRESHOLD_PER_METRE {
                    controls.brake = 1.0;
                } else if d < SLOW_ZONE_DISTANCE {
                    controls.accelerator = self.personality.skill;
                } else {
                    controls.accelerator = 1.0;
                }
            }
            None => controls.accelerator = 1.0,
        }

        if self.behavior == Behavior::Evading {
            controls.accelerator = 0.0;
        }

        // OVERRIDES -------------------------------------------------------------------------------
        if state.speed < MIN_SPEED && controls.accelerator < 1.0 {
            controls.accelerator = 1.0;
            controls.brake = 0.0;
        }

        if !obs.on_track {
            if state.speed > MIN_SPEED {
                controls.accelerator = 0.0;
                controls.brake = 1.0;
            } else {
                controls.accelerator = 1.0;
                controls.brake = 0.0;
            }
        }

        if !obs.race_live {
            controls.accelerator = 0.0;
            controls.brake = 0.0;
        }

        if state.rpm >= obs.tuning.max_rpm && state.gear < obs.tuning.gears as i32 {
            controls.gear_change = 1;
        } else if state.rpm <= obs.tuning.min_rpm && state.gear > 1 {
            controls.gear_change = -1;
        }

        controls
    }
}
