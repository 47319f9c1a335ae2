use crate::core::car::CarPars;
use crate::core::race::SessionPars;
use crate::core::track::{CircuitPars, CircuitPointPars};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Human,
    Ai,
    NetworkMirror,
}

/// * `id` - Unique contestant identifier
/// * `car` - Key into `car_pars_all`
/// * `control` - Where the controls come from
/// * `grid_slot` - Starting grid slot on the circuit
#[derive(Debug, Deserialize, Clone)]
pub struct ContestantPars {
    pub id: String,
    pub car: String,
    pub control: ControlKind,
    pub grid_slot: usize,
}

/// Scenario file as written on disk. The circuit is either inline or in a separate file, car
/// tunings are inline, in separate files, or both. Relative paths are resolved against the
/// scenario file's directory.
#[derive(Debug, Deserialize, Clone)]
struct ScenarioFile {
    session_pars: SessionPars,
    #[serde(default)]
    circuit_pars: Option<CircuitPars>,
    #[serde(default)]
    circuit_file: Option<PathBuf>,
    #[serde(default)]
    car_pars_all: HashMap<String, CarPars>,
    #[serde(default)]
    car_files: HashMap<String, PathBuf>,
    contestants: Vec<ContestantPars>,
}

/// Circuit file as written on disk. The path points may be given inline or in a CSV file.
#[derive(Debug, Deserialize, Clone)]
struct CircuitFile {
    #[serde(flatten)]
    circuit_pars: CircuitPars,
    #[serde(default)]
    points_file: Option<PathBuf>,
}

/// One row of a circuit points CSV file.
#[derive(Debug, Deserialize, Clone)]
pub struct CsvCircuitPoint {
    pub x_m: f64,
    pub z_m: f64,
    pub alt_x_m: Option<f64>,
    pub alt_z_m: Option<f64>,
    pub speed_mps: Option<f64>,
    pub intermediate: bool,
}

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Clone)]
pub struct SimPars {
    pub session_pars: SessionPars,
    pub circuit_pars: CircuitPars,
    pub car_pars_all: HashMap<String, CarPars>,
    pub contestants: Vec<ContestantPars>,
}

fn read_json<T: DeserializeOwned>(filepath: &Path, what: &str) -> anyhow::Result<T> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open {} file {}!", what, filepath.display()))?;
    let pars = serde_json::from_reader(&fh)
        .context(format!("Failed to parse {} file {}!", what, filepath.display()))?;
    Ok(pars)
}

fn resolve_path(base: &Path, filepath: &Path) -> PathBuf {
    if filepath.is_absolute() {
        filepath.to_path_buf()
    } else {
        base.parent().unwrap_or_else(|| Path::new("")).join(filepath)
    }
}

/// read_sim_pars reads the scenario JSON file and, if referenced, the circuit and car files.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let scenario: ScenarioFile = read_json(filepath, "parameter")?;

    let circuit_pars = match (scenario.circuit_pars, scenario.circuit_file) {
        (Some(circuit_pars), _) => circuit_pars,
        (None, Some(circuit_file)) => read_circuit_pars(&resolve_path(filepath, &circuit_file))?,
        (None, None) => anyhow::bail!(
            "Parameter file {} contains neither circuit_pars nor circuit_file!",
            filepath.display()
        ),
    };

    let mut car_pars_all = scenario.car_pars_all;
    for (car_name, car_file) in scenario.car_files.iter() {
        if car_pars_all.contains_key(car_name) {
            anyhow::bail!(
                "Car {} is given both inline and as file in {}!",
                car_name,
                filepath.display()
            );
        }
        let car_pars = read_car_pars(&resolve_path(filepath, car_file))?;
        car_pars_all.insert(car_name.to_owned(), car_pars);
    }

    Ok(SimPars {
        session_pars: scenario.session_pars,
        circuit_pars,
        car_pars_all,
        contestants: scenario.contestants,
    })
}

/// read_circuit_pars reads a circuit JSON file. If it names a points file, the path points are
/// taken from that CSV file instead.
pub fn read_circuit_pars(filepath: &Path) -> anyhow::Result<CircuitPars> {
    let circuit_file: CircuitFile = read_json(filepath, "circuit")?;
    let mut circuit_pars = circuit_file.circuit_pars;

    if let Some(points_file) = circuit_file.points_file {
        circuit_pars.points = read_circuit_points(&resolve_path(filepath, &points_file))?;
    }
    Ok(circuit_pars)
}

/// read_circuit_points reads path points from a CSV file with the header
/// `x_m,z_m,alt_x_m,alt_z_m,speed_mps,intermediate`. Empty optional columns are allowed.
pub fn read_circuit_points(filepath: &Path) -> anyhow::Result<Vec<CircuitPointPars>> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!("Failed to open circuit points file {}!", filepath.display()))?;

    let mut csv_reader = csv::Reader::from_reader(&fh);
    let mut points = vec![];

    for result in csv_reader.deserialize() {
        let el: CsvCircuitPoint = result
            .context(format!("Failed to parse circuit points file {}!", filepath.display()))?;
        points.push(CircuitPointPars {
            x: el.x_m,
            z: el.z_m,
            alt_x: el.alt_x_m,
            alt_z: el.alt_z_m,
            speed: el.speed_mps,
            intermediate: el.intermediate,
        });
    }
    Ok(points)
}

/// read_car_pars reads a single car tuning JSON file.
pub fn read_car_pars(filepath: &Path) -> anyhow::Result<CarPars> {
    read_json(filepath, "car")
}
