//! Telemetry snapshot model and the source traits the statistics engine is fed from

use serde::{Serialize, Deserialize};
use std::time::Duration;

/// Latest known vehicle state as delivered by the simulation, one per package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Monotonic per-package sequence id; may reset with the source
    pub package_id: i32,

    // race progress
    pub current_lap: i16,   // 0 = pre-race
    pub total_laps: i16,    // 0 = time-limited race
    pub best_lap_ms: i32,   // negative when unknown
    pub last_lap_ms: i32,   // negative when unknown

    // fuel, tank units
    pub current_fuel: f32,
    pub fuel_capacity: f32,

    // vehicle dynamics
    pub car_speed_kph: f32,
    pub throttle: u8,
    pub brake: u8,

    // tire temperatures, °C
    pub tyre_temp_fl: f32,
    pub tyre_temp_fr: f32,
    pub tyre_temp_rl: f32,
    pub tyre_temp_rr: f32,

    // world pose
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
    pub rotation_yaw: f32,

    // driver assists
    pub is_tcs_engaged: bool,
    pub is_asm_engaged: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TelemetryTx = crossbeam_channel::Sender<TelemetrySnapshot>;
pub type TelemetryRx = crossbeam_channel::Receiver<TelemetrySnapshot>;

/// Trait for any live source connector
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError>;
}

pub fn channel() -> (TelemetryTx, TelemetryRx) {
    crossbeam_channel::unbounded()
}

/// Plays back recorded snapshots at a fixed cadence.
pub struct ReplaySource {
    snapshots: Vec<TelemetrySnapshot>,
    interval: Duration,
}

impl ReplaySource {
    pub fn new(snapshots: Vec<TelemetrySnapshot>, interval: Duration) -> Self {
        Self { snapshots, interval }
    }
}

#[async_trait::async_trait]
impl TelemetrySource for ReplaySource {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError> {
        // tokio::time::interval panics on a zero period
        let mut ticker = (!self.interval.is_zero()).then(|| {
            let mut t = tokio::time::interval(self.interval);
            t.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            t
        });

        for snapshot in &self.snapshots {
            if let Some(t) = ticker.as_mut() {
                t.tick().await;
            }
            tx.send(snapshot.clone())
                .map_err(|_| IngestError::Msg("telemetry receiver dropped".into()))?;
        }
        tracing::debug!(count = self.snapshots.len(), "replay finished");
        Ok(())
    }
}
