use helpers::general::{sign, wrap_angle, InputValueError};
use serde::{Deserialize, Serialize};

// VEHICLE DYNAMICS CONSTANTS ----------------------------------------------------------------------
/// (m/s) Speeds below this are treated as standstill (brake and steering forces vanish)
pub const SPEED_EPSILON: f64 = 0.05;
/// (rad/s) Angular speeds below this snap to zero
pub const ANGULAR_SPEED_EPSILON: f64 = 0.01;
/// (m/s) Fixed speed while accelerating in reverse gear
pub const REVERSE_SPEED: f64 = -4.0;
/// (m/s) Rolling forward faster than this in reverse gear drops the gearbox to neutral
pub const REVERSE_EXIT_SPEED: f64 = 1.0;
/// Rolling resistance multiplier while off the track surface
pub const OFF_TRACK_ROLLING_FACTOR: f64 = 6.0;
/// Steering force multiplier while off the track surface
pub const OFF_TRACK_STEERING_FACTOR: f64 = 0.5;
/// Steering force multiplier while braking
pub const BRAKING_STEERING_FACTOR: f64 = 0.6;
/// (1/rad) Speed loss per second and per rad/s of yaw rate
pub const SLIDE_DAMPING: f64 = 0.1;
/// (1/s) Rate at which the travel direction follows the orientation
pub const DIRECTION_EASE_RATE: f64 = 6.0;
/// World units covered per metre travelled
pub const WORLD_UNITS_PER_METRE: f64 = 1.0;

/// Raw car tuning as read from a parameter file. Every field may be missing, missing fields are
/// replaced by defaults when the tuning is built.
/// * `name` - Car archetype name
/// * `engine_power` - (N) Traction force at full throttle in first gear
/// * `mass` - (kg) Vehicle mass
/// * `traction` - (-) Traction coefficient applied to the engine force
/// * `brake_force` - (N) Brake force at full brake
/// * `drag` - (kg/m) Aerodynamic drag coefficient (force = drag * v * |v|)
/// * `rolling_resistance` - (kg/s) Rolling resistance coefficient (force = roll * v)
/// * `steering_gain` - (rad/s^2) Yaw acceleration at full steering
/// * `yaw_stiffness` - (1/s) Yaw rate damping proportional to yaw rate
/// * `yaw_resistance` - (rad/m) Yaw rate damping proportional to speed
/// * `gears` - Number of forward gears
/// * `min_rpm`, `max_rpm`, `neutral_rpm` - (1/min) Engine speed limits
/// * `gear_speed_step` - (m/s) Speed span of every gear above second
/// * `gear_start_speed` - (m/s) Entry speed of second gear
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct CarPars {
    #[serde(default)]
    pub name: String,
    pub engine_power: Option<f64>,
    pub mass: Option<f64>,
    pub traction: Option<f64>,
    pub brake_force: Option<f64>,
    pub drag: Option<f64>,
    pub rolling_resistance: Option<f64>,
    pub steering_gain: Option<f64>,
    pub yaw_stiffness: Option<f64>,
    pub yaw_resistance: Option<f64>,
    pub gears: Option<u32>,
    pub min_rpm: Option<f64>,
    pub max_rpm: Option<f64>,
    pub neutral_rpm: Option<f64>,
    pub gear_speed_step: Option<f64>,
    pub gear_start_speed: Option<f64>,
}

/// Complete, immutable tuning of one car archetype. Built once and shared between all contestants
/// driving that car.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarTuning {
    pub name: String,
    pub engine_power: f64,
    pub mass: f64,
    pub traction: f64,
    pub brake_force: f64,
    pub drag: f64,
    pub rolling_resistance: f64,
    pub steering_gain: f64,
    pub yaw_stiffness: f64,
    pub yaw_resistance: f64,
    pub gears: u32,
    pub min_rpm: f64,
    pub max_rpm: f64,
    pub neutral_rpm: f64,
    pub gear_speed_step: f64,
    pub gear_start_speed: f64,
}

impl Default for CarTuning {
    fn default() -> Self {
        CarTuning {
            name: String::from("default"),
            engine_power: 8000.0,
            mass: 1000.0,
            traction: 1.0,
            brake_force: 12000.0,
            drag: 0.43,
            rolling_resistance: 12.8,
            steering_gain: 2.0,
            yaw_stiffness: 4.0,
            yaw_resistance: 0.005,
            gears: 5,
            min_rpm: 2000.0,
            max_rpm: 7000.0,
            neutral_rpm: 800.0,
            gear_speed_step: 12.0,
            gear_start_speed: 10.0,
        }
    }
}

fn field_or_default(car: &str, field: &str, value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        Some(v) => {
            log::warn!("Car {}: tuning field {} is not finite ({}), using {}", car, field, v, default);
            default
        }
        None => {
            log::warn!("Car {}: tuning field {} is missing, using {}", car, field, default);
            default
        }
    }
}

impl CarTuning {
    /// from_pars fills every missing or unusable field with its default. The result is always
    /// usable for integration; a car built from incomplete data simply drives less accurately.
    pub fn from_pars(car_pars: &CarPars) -> CarTuning {
        let d = CarTuning::default();
        let name = if car_pars.name.is_empty() {
            log::warn!("Car without name, using {}", d.name);
            d.name.to_owned()
        } else {
            car_pars.name.to_owned()
        };
        let n = name.as_str();

        let mut tuning = CarTuning {
            engine_power: field_or_default(n, "engine_power", car_pars.engine_power, d.engine_power),
            mass: field_or_default(n, "mass", car_pars.mass, d.mass),
            traction: field_or_default(n, "traction", car_pars.traction, d.traction),
            brake_force: field_or_default(n, "brake_force", car_pars.brake_force, d.brake_force),
            drag: field_or_default(n, "drag", car_pars.drag, d.drag),
            rolling_resistance: field_or_default(
                n,
                "rolling_resistance",
                car_pars.rolling_resistance,
                d.rolling_resistance,
            ),
            steering_gain: field_or_default(n, "steering_gain", car_pars.steering_gain, d.steering_gain),
            yaw_stiffness: field_or_default(n, "yaw_stiffness", car_pars.yaw_stiffness, d.yaw_stiffness),
            yaw_resistance: field_or_default(
                n,
                "yaw_resistance",
                car_pars.yaw_resistance,
                d.yaw_resistance,
            ),
            gears: car_pars.gears.unwrap_or_else(|| {
                log::warn!("Car {}: tuning field gears is missing, using {}", n, d.gears);
                d.gears
            }),
            min_rpm: field_or_default(n, "min_rpm", car_pars.min_rpm, d.min_rpm),
            max_rpm: field_or_default(n, "max_rpm", car_pars.max_rpm, d.max_rpm),
            neutral_rpm: field_or_default(n, "neutral_rpm", car_pars.neutral_rpm, d.neutral_rpm),
            gear_speed_step: field_or_default(
                n,
                "gear_speed_step",
                car_pars.gear_speed_step,
                d.gear_speed_step,
            ),
            gear_start_speed: field_or_default(
                n,
                "gear_start_speed",
                car_pars.gear_start_speed,
                d.gear_start_speed,
            ),
            name,
        };

        // values the integration divides by or clamps with must stay ordered and positive
        if tuning.mass <= 0.0 {
            log::warn!("Car {}: mass must be positive, using {}", tuning.name, d.mass);
            tuning.mass = d.mass;
        }
        if tuning.gears == 0 {
            log::warn!("Car {}: needs at least one gear, using {}", tuning.name, d.gears);
            tuning.gears = d.gears;
        }
        if tuning.gear_speed_step <= 0.0 || tuning.gear_start_speed <= 0.0 {
            log::warn!("Car {}: gear speeds must be positive, using defaults", tuning.name);
            tuning.gear_speed_step = d.gear_speed_step;
            tuning.gear_start_speed = d.gear_start_speed;
        }
        if !(tuning.neutral_rpm <= tuning.min_rpm && tuning.min_rpm < tuning.max_rpm) {
            log::warn!("Car {}: rpm limits are not ordered, using defaults", tuning.name);
            tuning.neutral_rpm = d.neutral_rpm;
            tuning.min_rpm = d.min_rpm;
            tuning.max_rpm = d.max_rpm;
        }

        tuning
    }

    /// gear_entry_speed returns the speed at which the given forward gear starts. First gear
    /// starts at standstill, second gear at `gear_start_speed`, every further gear one
    /// `gear_speed_step` later. Consecutive gears therefore never share an entry speed.
    pub fn gear_entry_speed(&self, gear: i32) -> f64 {
        if gear <= 1 {
            0.0
        } else {
            self.gear_start_speed + (gear - 2) as f64 * self.gear_speed_step
        }
    }

    /// engine_rpm interpolates the engine speed between the entry speed of the current gear
    /// (`min_rpm`) and the entry speed of the next gear (`max_rpm`).
    pub fn engine_rpm(&self, gear: i32, speed: f64) -> f64 {
        if gear <= 0 {
            return self.neutral_rpm;
        }
        let v_entry = self.gear_entry_speed(gear);
        let v_next = self.gear_entry_speed(gear + 1);
        let rpm = self.min_rpm + (speed - v_entry) / (v_next - v_entry) * (self.max_rpm - self.min_rpm);
        rpm.clamp(self.neutral_rpm, self.max_rpm)
    }
}

/// Normalized driver inputs for one tick.
/// * `accelerator` - [0, 1]
/// * `brake` - [0, 1]
/// * `steering` - [-1, 1], positive turns right
/// * `gear_change` - -1 (down), 0 or 1 (up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Controls {
    pub accelerator: f64,
    pub brake: f64,
    pub steering: f64,
    pub gear_change: i32,
}

impl Controls {
    /// new checks the input contract and rejects values outside of it.
    pub fn new(
        accelerator: f64,
        brake: f64,
        steering: f64,
        gear_change: i32,
    ) -> Result<Controls, InputValueError> {
        if !(0.0..=1.0).contains(&accelerator) {
            return Err(InputValueError { name: "accelerator", value: accelerator });
        }
        if !(0.0..=1.0).contains(&brake) {
            return Err(InputValueError { name: "brake", value: brake });
        }
        if !(-1.0..=1.0).contains(&steering) {
            return Err(InputValueError { name: "steering", value: steering });
        }
        if !(-1..=1).contains(&gear_change) {
            return Err(InputValueError { name: "gear_change", value: gear_change as f64 });
        }
        Ok(Controls { accelerator, brake, steering, gear_change })
    }

    pub fn is_valid(&self) -> bool {
        Controls::new(self.accelerator, self.brake, self.steering, self.gear_change).is_ok()
    }
}

/// World position. The track lies in the x/z plane, y is height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Position {
        Position { x, y, z }
    }

    /// distance_xz returns the distance in the ground plane.
    pub fn distance_xz(&self, other: &Position) -> f64 {
        ((other.x - self.x).powi(2) + (other.z - self.z).powi(2)).sqrt()
    }

    /// to_local expresses `other` in the frame of a car standing here with the given heading.
    /// Returns (lateral, forward); positive lateral is to the right.
    pub fn to_local(&self, heading: f64, other: &Position) -> (f64, f64) {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        let forward = dx * heading.sin() + dz * heading.cos();
        let lateral = -dx * heading.cos() + dz * heading.sin();
        (lateral, forward)
    }
}

/// What the ground below a car looks like, refreshed once per tick before integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub on_track: bool,
    pub grounded: bool,
}

impl Default for Surface {
    fn default() -> Self {
        Surface {
            on_track: true,
            grounded: true,
        }
    }
}

/// Dynamic state of one vehicle. `orientation` is where the car points, `direction` is where it
/// travels; the latter lags behind while the car slides. Headings are measured such that the
/// forward vector is (sin, cos) in the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Position,
    pub orientation: f64,
    pub direction: f64,
    pub speed: f64,
    pub angular_speed: f64,
    pub gear: i32,
    pub rpm: f64,
}

impl VehicleState {
    /// at_rest creates a standing car in neutral.
    pub fn at_rest(position: Position, orientation: f64, tuning: &CarTuning) -> VehicleState {
        VehicleState {
            position,
            orientation,
            direction: orientation,
            speed: 0.0,
            angular_speed: 0.0,
            gear: 0,
            rpm: tuning.neutral_rpm,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.x.is_finite()
            && self.position.y.is_finite()
            && self.position.z.is_finite()
            && self.orientation.is_finite()
            && self.direction.is_finite()
            && self.speed.is_finite()
            && self.angular_speed.is_finite()
            && self.rpm.is_finite()
    }

    /// collide_static stops the car dead after hitting the scenery.
    pub fn collide_static(&mut self) {
        self.speed = 0.0;
        self.angular_speed = 0.0;
    }

    /// collide_vehicle exchanges momentum with another car along the heading axis (1D elastic
    /// collision of two point masses). The other car's speed counts as opposing if the two
    /// headings differ by more than a right angle. Only this car is changed.
    pub fn collide_vehicle(&mut self, mass: f64, other: &VehicleState, other_mass: f64) {
        let heading_diff = wrap_angle(other.orientation - self.orientation).abs();
        let v_other = if heading_diff > std::f64::consts::FRAC_PI_2 {
            -other.speed
        } else {
            other.speed
        };
        let v_own = self.speed;

        self.speed = ((mass - other_mass) * v_own + 2.0 * other_mass * v_other) / (mass + other_mass);
        self.angular_speed = 0.0;
    }
}

/// integrate advances one vehicle by one time step. It is a pure function of its inputs and does
/// not know about other vehicles or the circuit.
pub fn integrate(
    state: &VehicleState,
    tuning: &CarTuning,
    controls: &Controls,
    on_track: bool,
    dt: f64,
) -> VehicleState {
    debug_assert!(controls.is_valid(), "Controls out of contract: {:?}", controls);
    let mut next = *state;

    // reverse-steer inversion
    let steering = if state.gear < 0 {
        -controls.steering
    } else {
        controls.steering
    };

    // LONGITUDINAL FORCES -------------------------------------------------------------------------
    let f_traction = if state.gear > 0 {
        controls.accelerator * tuning.engine_power * tuning.traction / state.gear as f64
    } else {
        0.0
    };

    // the brake may stop the car within this step but never push it backwards
    let f_brake = if state.speed.abs() < SPEED_EPSILON {
        0.0
    } else {
        let f_brake_max = state.speed.abs() * tuning.mass / dt;
        -(controls.brake * tuning.brake_force).min(f_brake_max) * sign(state.speed)
    };

    let f_drag = -tuning.drag * state.speed * state.speed.abs();

    let mut f_rolling = -tuning.rolling_resistance * state.speed;
    if !on_track {
        f_rolling *= OFF_TRACK_ROLLING_FACTOR;
    }

    let f_long = f_traction + f_brake + f_drag + f_rolling;

    // LATERAL FORCES ------------------------------------------------------------------------------
    let mut f_steering = if state.speed.abs() < SPEED_EPSILON {
        0.0
    } else {
        tuning.steering_gain * steering
    };
    if controls.brake > 0.0 {
        f_steering *= BRAKING_STEERING_FACTOR;
    }
    if !on_track {
        f_steering *= OFF_TRACK_STEERING_FACTOR;
    }

    let f_lat = f_steering
        - tuning.yaw_stiffness * state.angular_speed
        - tuning.yaw_resistance * sign(state.angular_speed) * state.speed.abs();

    // GEARBOX -------------------------------------------------------------------------------------
    next.gear = (state.gear + controls.gear_change).clamp(-1, tuning.gears as i32);
    if next.gear == 0 && controls.accelerator > 0.0 {
        next.gear = 1;
    }
    if next.gear == -1 && state.speed > REVERSE_EXIT_SPEED {
        next.gear = 0;
    }
    next.rpm = tuning.engine_rpm(next.gear, state.speed);

    // INTEGRATION ---------------------------------------------------------------------------------
    next.speed = state.speed + f_long / tuning.mass * dt;
    let slide = (state.angular_speed.abs() * SLIDE_DAMPING * dt).min(1.0);
    next.speed -= next.speed * slide;
    next.angular_speed = state.angular_speed + f_lat * dt;

    if next.speed.abs() < SPEED_EPSILON && controls.accelerator == 0.0 {
        next.speed = 0.0;
    }
    if next.angular_speed.abs() < ANGULAR_SPEED_EPSILON {
        next.angular_speed = 0.0;
    }
    if next.gear == -1 && controls.accelerator > 0.0 {
        next.speed = REVERSE_SPEED;
    }

    // POSE ----------------------------------------------------------------------------------------
    let ds = next.speed * dt * WORLD_UNITS_PER_METRE;
    next.position.x += state.direction.sin() * ds;
    next.position.z += state.direction.cos() * ds;
    next.orientation = wrap_angle(state.orientation - next.angular_speed * dt);
    let ease = (DIRECTION_EASE_RATE * dt).min(1.0);
    next.direction = wrap_angle(state.direction + wrap_angle(next.orientation - state.direction) * ease);

    next
}
