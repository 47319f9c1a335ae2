use crate::core::car::Position;
use serde::{Deserialize, Serialize};

/// Number of intermediates per lap. The last one is the finish line.
pub const NO_INTERMEDIATES: usize = 3;

/// One point of the circuit path as stored in a circuit file.
/// * `x`, `z` - (m) Position on the ideal line
/// * `alt_x`, `alt_z` - (m) Optional position on the alternate (overtaking) line
/// * `speed` - (m/s) Optional suggested maximum speed at this point
/// * `intermediate` - True if this point is a sector boundary (the third one is the finish line)
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CircuitPointPars {
    pub x: f64,
    pub z: f64,
    #[serde(default)]
    pub alt_x: Option<f64>,
    #[serde(default)]
    pub alt_z: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub intermediate: bool,
}

/// * `x`, `z` - (m) Grid slot position
/// * `orientation` - (rad) Heading of a car standing in the slot
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct GridSlot {
    pub x: f64,
    pub z: f64,
    #[serde(default)]
    pub orientation: f64,
}

/// * `name` - Circuit name
/// * `track_half_width` - (m) Distance from the path within which the surface counts as track
/// * `wall_distance` - (m) Distance from the path at which static barriers begin
/// * `points` - Ordered path points, closed implicitly (last connects to first)
/// * `grid` - Starting grid slots, index = slot
/// * `cameras` - Camera hint positions, passed through to the rendering layer
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CircuitPars {
    pub name: String,
    #[serde(default = "default_track_half_width")]
    pub track_half_width: f64,
    #[serde(default = "default_wall_distance")]
    pub wall_distance: f64,
    #[serde(default)]
    pub points: Vec<CircuitPointPars>,
    #[serde(default)]
    pub grid: Vec<GridSlot>,
    #[serde(default)]
    pub cameras: Vec<Position>,
}

fn default_track_half_width() -> f64 {
    8.0
}

fn default_wall_distance() -> f64 {
    14.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitPoint {
    pub position: Position,
    pub alternate: Option<Position>,
    pub suggested_speed: Option<f64>,
    pub intermediate: bool,
}

impl CircuitPoint {
    /// line_position returns the alternate position if requested and defined, else the ideal one.
    pub fn line_position(&self, alternate_line: bool) -> Position {
        match (alternate_line, self.alternate) {
            (true, Some(alt)) => alt,
            _ => self.position,
        }
    }
}

/// Read-only circuit description.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub name: String,
    pub track_half_width: f64,
    pub wall_distance: f64,
    points: Vec<CircuitPoint>,
    intermediates: Vec<usize>,
    pub grid: Vec<GridSlot>,
    pub cameras: Vec<Position>,
}

impl Circuit {
    pub fn new(circuit_pars: &CircuitPars) -> anyhow::Result<Circuit> {
        if circuit_pars.points.is_empty() {
            anyhow::bail!("Circuit {} has no path points!", circuit_pars.name);
        }

        let points: Vec<CircuitPoint> = circuit_pars
            .points
            .iter()
            .map(|p| CircuitPoint {
                position: Position::new(p.x, 0.0, p.z),
                alternate: match (p.alt_x, p.alt_z) {
                    (Some(x), Some(z)) => Some(Position::new(x, 0.0, z)),
                    _ => None,
                },
                suggested_speed: p.speed,
                intermediate: p.intermediate,
            })
            .collect();

        let intermediates: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.intermediate)
            .map(|(i, _)| i)
            .collect();

        if intermediates.len() != NO_INTERMEDIATES {
            anyhow::bail!(
                "Circuit {} must flag exactly {} intermediate points, found {}!",
                circuit_pars.name,
                NO_INTERMEDIATES,
                intermediates.len()
            );
        }

        Ok(Circuit {
            name: circuit_pars.name.to_owned(),
            track_half_width: circuit_pars.track_half_width,
            wall_distance: circuit_pars.wall_distance,
            points,
            intermediates,
            grid: circuit_pars.grid.to_owned(),
            cameras: circuit_pars.cameras.to_owned(),
        })
    }

    pub fn no_points(&self) -> usize {
        self.points.len()
    }

    pub fn point(&self, idx: usize) -> Option<&CircuitPoint> {
        self.points.get(idx)
    }

    /// point_ahead returns the point `offset` points after `idx`, wrapping around the lap.
    pub fn point_ahead(&self, idx: usize, offset: usize) -> &CircuitPoint {
        &self.points[(idx + offset) % self.points.len()]
    }

    /// intermediate_point returns the circuit point of the given intermediate (0, 1 or 2).
    pub fn intermediate_point(&self, intermediate: usize) -> Option<&CircuitPoint> {
        self.intermediates
            .get(intermediate)
            .map(|&idx| &self.points[idx])
    }

    /// nearest_point scans all points for the one closest to `position`. The scan is seeded with
    /// the previous nearest point and only replaces it on strict improvement, so on ties the
    /// previous point (then the lowest index) wins.
    pub fn nearest_point(&self, position: &Position, prev_idx: usize) -> usize {
        let mut idx_best = if prev_idx < self.points.len() { prev_idx } else { 0 };
        let mut d_best = self.points[idx_best].position.distance_xz(position);

        for (i, point) in self.points.iter().enumerate() {
            let d = point.position.distance_xz(position);
            if d < d_best {
                d_best = d;
                idx_best = i;
            }
        }

        idx_best
    }

    /// next_speed_constraint returns the first point after `idx` (wrapping, excluding `idx`
    /// itself) that carries a suggested speed, as (index, suggested speed).
    pub fn next_speed_constraint(&self, idx: usize) -> Option<(usize, f64)> {
        (1..=self.points.len())
            .map(|offset| (idx + offset) % self.points.len())
            .find_map(|i| self.points[i].suggested_speed.map(|v| (i, v)))
    }

    /// distance_to_path returns the distance from `position` to the closed path polyline.
    pub fn distance_to_path(&self, position: &Position) -> f64 {
        let n = self.points.len();
        if n == 1 {
            return self.points[0].position.distance_xz(position);
        }

        (0..n)
            .map(|i| {
                let a = &self.points[i].position;
                let b = &self.points[(i + 1) % n].position;
                distance_to_segment(position, a, b)
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// grid_slot returns the grid slot or None if the circuit has fewer slots.
    pub fn grid_slot(&self, slot: usize) -> Option<&GridSlot> {
        self.grid.get(slot)
    }
}

fn distance_to_segment(p: &Position, a: &Position, b: &Position) -> f64 {
    let abx = b.x - a.x;
    let abz = b.z - a.z;
    let len_sq = abx * abx + abz * abz;
    if len_sq == 0.0 {
        return a.distance_xz(p);
    }
    let t = (((p.x - a.x) * abx + (p.z - a.z) * abz) / len_sq).clamp(0.0, 1.0);
    let closest = Position::new(a.x + t * abx, 0.0, a.z + t * abz);
    closest.distance_xz(p)
}
