use crate::core::race::RaceMode;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// format_lap_time formats milliseconds as m:ss.mmm.
pub fn format_lap_time(t_ms: u32) -> String {
    format!("{}:{:02}.{:03}", t_ms / 60_000, (t_ms / 1000) % 60, t_ms % 1000)
}

/// One row of the final classification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassifiedEntry {
    pub position: usize,
    pub id: String,
    pub car_name: String,
    pub compl_laps: usize,
    pub finished: bool,
    pub best_lap_ms: Option<u32>,
    pub lap_times_ms: Vec<u32>,
}

/// TrackRecord is what a leaderboard keeps about one contestant of a finished session. The crate
/// version and the UNIX timestamp serve as version/date stamp.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TrackRecord {
    pub id: String,
    pub car_name: String,
    pub circuit_name: String,
    pub best_lap_ms: u32,
    pub version: String,
    pub timestamp: u64,
}

/// RaceResult contains all session information that is required for post-processing.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub circuit_name: String,
    pub mode: RaceMode,
    pub lap_target: usize,
    pub racetime: f64,
    pub classification: Vec<ClassifiedEntry>,
    pub fastest_lap: Option<(String, u32)>,
    pub track_records: Vec<TrackRecord>,
}

impl RaceResult {
    /// write_result_to_file writes the result as JSON.
    pub fn write_result_to_file(&self, filepath: &Path) -> anyhow::Result<()> {
        let fh = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(filepath)
            .context(format!("Failed to open result file {}!", filepath.display()))?;
        serde_json::to_writer_pretty(&fh, self)
            .context(format!("Failed to write result file {}!", filepath.display()))?;
        Ok(())
    }

    /// write_track_records_to_file writes one CSV row per track record.
    pub fn write_track_records_to_file(&self, filepath: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(filepath)
            .context(format!("Failed to open track record file {}!", filepath.display()))?;
        for record in self.track_records.iter() {
            wtr.serialize(record)
                .context(format!("Failed to write track record file {}!", filepath.display()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// write_lap_times_to_file writes the lap times table as plain text.
    pub fn write_lap_times_to_file(&self, filepath: &Path) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(filepath)
            .context(format!("Failed to open lap time file {}!", filepath.display()))?;
        write!(file, "{}", self)?;
        file.flush()?;
        Ok(())
    }

    /// print_result prints the classification and lap times to the console output.
    pub fn print_result(&self) {
        println!("{}", self);
    }
}

impl fmt::Display for RaceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RESULT: {} ({:?}, {} laps, {:.3}s)",
            self.circuit_name, self.mode, self.lap_target, self.racetime
        )?;
        writeln!(f, "{:>3}  {:<12} {:<12} {:>4}  {:>10}", "pos", "id", "car", "laps", "best")?;
        for entry in self.classification.iter() {
            let best = entry
                .best_lap_ms
                .map_or_else(|| String::from("-"), format_lap_time);
            writeln!(
                f,
                "{:>3}  {:<12} {:<12} {:>4}  {:>10}{}",
                entry.position,
                entry.id,
                entry.car_name,
                entry.compl_laps,
                best,
                if entry.finished { "" } else { "  DNF" }
            )?;
        }

        writeln!(f, "RESULT: Lap times")?;
        for entry in self.classification.iter() {
            write!(f, "{:<12}", entry.id)?;
            for t in entry.lap_times_ms.iter() {
                write!(f, " {:>10}", format_lap_time(*t))?;
            }
            writeln!(f)?;
        }

        if let Some((id, t)) = &self.fastest_lap {
            writeln!(f, "Fastest lap: {} {}", id, format_lap_time(*t))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> RaceResult {
        RaceResult {
            circuit_name: String::from("square"),
            mode: RaceMode::Race,
            lap_target: 2,
            racetime: 190.5,
            classification: vec![
                ClassifiedEntry {
                    position: 1,
                    id: String::from("ai_1"),
                    car_name: String::from("gt"),
                    compl_laps: 2,
                    finished: true,
                    best_lap_ms: Some(91_234),
                    lap_times_ms: vec![95_000, 91_234],
                },
                ClassifiedEntry {
                    position: 2,
                    id: String::from("ai_2"),
                    car_name: String::from("gt"),
                    compl_laps: 1,
                    finished: false,
                    best_lap_ms: Some(97_000),
                    lap_times_ms: vec![97_000],
                },
            ],
            fastest_lap: Some((String::from("ai_1"), 91_234)),
            track_records: vec![],
        }
    }

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(0), "0:00.000");
        assert_eq!(format_lap_time(90_000), "1:30.000");
        assert_eq!(format_lap_time(61_005), "1:01.005");
    }

    #[test]
    fn test_display_lists_classification() {
        let text = result().to_string();
        assert!(text.starts_with("RESULT: square (Race, 2 laps, 190.500s)"));
        assert!(text.contains("1:31.234"));
        assert!(text.contains("DNF"));
        assert!(text.contains("Fastest lap: ai_1 1:31.234"));
        let pos_1 = text.find("ai_1").unwrap();
        let pos_2 = text.find("ai_2").unwrap();
        assert!(pos_1 < pos_2);
    }
}
