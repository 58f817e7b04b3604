//! Engine settings loaded from JSON, with a default for every field.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Race length in minutes for time-limited races, where the duration is not transmitted
    pub race_minutes: u32,
    /// Nominal spacing of two telemetry packages
    pub package_interval_ms: u64,
    /// Elapsed race time above which the race start timestamp is considered stale
    pub max_plausible_race_hours: u64,
    /// Number of raw samples kept for trend detection
    pub history_capacity: usize,
    /// Keep every n-th sample when building the lap trace
    pub trace_detail: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            race_minutes: 60,
            package_interval_ms: 16,
            max_plausible_race_hours: 1000,
            history_capacity: 600,
            trace_detail: 5,
        }
    }
}

impl StatsConfig {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn race_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.race_minutes))
    }

    pub fn package_interval(&self) -> Duration {
        Duration::milliseconds(self.package_interval_ms.min(i64::MAX as u64) as i64)
    }

    pub fn max_plausible_race_duration(&self) -> Duration {
        Duration::hours(self.max_plausible_race_hours.min(i64::MAX as u64 / 3600) as i64)
    }
}
