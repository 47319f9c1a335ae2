use crate::core::car::{Position, Surface, VehicleState};
use crate::core::track::Circuit;

/// (m) Contact radius of a car, two cars touch at twice this distance
pub const VEHICLE_RADIUS: f64 = 2.0;

/// Terrain answers what lies under and around a car. It stands in for the scene geometry the
/// rendering side owns.
pub trait Terrain {
    fn surface_at(&self, position: &Position) -> Surface;

    /// blocks returns true if static geometry occupies the position.
    fn blocks(&self, position: &Position) -> bool;
}

/// Flat infinite tarmac without any scenery.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGround;

impl Terrain for OpenGround {
    fn surface_at(&self, _position: &Position) -> Surface {
        Surface::default()
    }

    fn blocks(&self, _position: &Position) -> bool {
        false
    }
}

/// Terrain derived from the circuit path: tarmac within the track half width, grass up to the
/// walls, walls beyond.
#[derive(Debug, Clone, Copy)]
pub struct TrackCorridor<'a> {
    circuit: &'a Circuit,
}

impl<'a> TrackCorridor<'a> {
    pub fn new(circuit: &'a Circuit) -> TrackCorridor<'a> {
        TrackCorridor { circuit }
    }
}

impl Terrain for TrackCorridor<'_> {
    fn surface_at(&self, position: &Position) -> Surface {
        Surface {
            on_track: self.circuit.distance_to_path(position) <= self.circuit.track_half_width,
            grounded: true,
        }
    }

    fn blocks(&self, position: &Position) -> bool {
        self.circuit.distance_to_path(position) > self.circuit.wall_distance
    }
}

/// Committed state of one car in the previous tick together with its mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub state: VehicleState,
    pub mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    Clear,
    Blocked,
    /// Contact with the car at this index of the world snapshot
    Vehicle(usize),
}

/// resolve checks the move of car `own_idx` from `prev` to `proposed` against static geometry
/// first and against the other cars of the previous tick second. A car only counts as hit if
/// the move brings the two closer, so overlapping cars can always drive apart.
pub fn resolve(
    own_idx: usize,
    prev: &Position,
    proposed: &Position,
    terrain: &dyn Terrain,
    world: &[Body],
) -> CollisionOutcome {
    if terrain.blocks(proposed) {
        return CollisionOutcome::Blocked;
    }

    for (i, body) in world.iter().enumerate() {
        if i == own_idx {
            continue;
        }
        let d_new = proposed.distance_xz(&body.state.position);
        if d_new < 2.0 * VEHICLE_RADIUS && d_new < prev.distance_xz(&body.state.position) {
            return CollisionOutcome::Vehicle(i);
        }
    }

    CollisionOutcome::Clear
}
