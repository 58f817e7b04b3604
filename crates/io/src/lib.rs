use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::{fs::File, path::Path};
use serde::Serialize;

use fuel_ingest_core::TelemetrySnapshot;
use strategy::utils::sport_format;
use strategy::LapList;

/// Reads a recorded session, one snapshot per line. Blank lines are skipped.
pub fn import_ndjson(path: &Path) -> Result<Vec<TelemetrySnapshot>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = std::io::BufReader::new(f);
    let mut snapshots = vec![];
    for (i, line) in rdr.lines().enumerate() {
        let s = line?;
        if s.trim().is_empty() {
            continue;
        }
        let snap: TelemetrySnapshot = serde_json::from_str(&s)
            .with_context(|| format!("{}:{}: invalid snapshot", path.display(), i + 1))?;
        snapshots.push(snap);
    }
    Ok(snapshots)
}

pub fn export_ndjson(snapshots: &[TelemetrySnapshot], path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = std::io::BufWriter::new(f);
    for snap in snapshots {
        let s = serde_json::to_string(snap)?;
        writeln!(w, "{}", s)?;
    }
    w.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct LapCsvRow {
    lap: i16,
    race_time: String,
    lap_time: String,
    lap_time_ms: i64,
    top_speed_kph: Option<f32>,
    fuel_start: f32,
    fuel_end: f32,
    fuel_consumed: f32,
    tire_fl: i32,
    tire_fr: i32,
    tire_rl: i32,
    tire_rr: i32,
    pit_in: bool,
}

/// Completed laps in driving order with per-lap fuel and tire consumption.
pub fn export_laps_csv(laps: &LapList, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for lap in laps.iter() {
        let tires = lap.tire_consumption();
        w.serialize(LapCsvRow {
            lap: lap.number,
            race_time: sport_format(laps.total_race_duration_at_end(lap)),
            lap_time: sport_format(lap.duration),
            lap_time_ms: lap.duration.whole_milliseconds() as i64,
            top_speed_kph: lap.top_speed(),
            fuel_start: lap.fuel_start,
            fuel_end: lap.fuel_end,
            fuel_consumed: lap.fuel_consumed(),
            tire_fl: tires.front_left,
            tire_fr: tires.front_right,
            tire_rl: tires.rear_left,
            tire_rr: tires.rear_right,
            pit_in: lap.is_lap_into_pit(),
        })?;
    }
    w.flush()?;
    Ok(())
}
