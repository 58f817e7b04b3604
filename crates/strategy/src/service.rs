//! Shared engine handle: one writer pumping ticks, any number of readers.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fuel_ingest_core::{channel, TelemetryRx, TelemetrySnapshot, TelemetrySource};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::message::{heavy_message, real_time_message, HeavyMessage, RealTimeMessage};
use crate::stats::Stats;

#[derive(Clone)]
pub struct StatsService {
    stats: Arc<RwLock<Stats>>,
    // 0 = keep the configured race length
    race_minutes: Arc<AtomicU32>,
}

impl StatsService {
    pub fn new(stats: Stats) -> Self {
        Self { stats: Arc::new(RwLock::new(stats)), race_minutes: Arc::new(AtomicU32::new(0)) }
    }

    /// Race length picked by the user, applied with the next tick.
    /// `None` stops overriding; the engine keeps the length it last applied.
    pub fn set_race_minutes(&self, minutes: Option<NonZeroU32>) {
        self.race_minutes.store(minutes.map_or(0, NonZeroU32::get), Ordering::Relaxed);
    }

    fn race_minutes(&self) -> Option<u32> {
        match self.race_minutes.load(Ordering::Relaxed) {
            0 => None,
            m => Some(m),
        }
    }

    pub fn ingest(&self, snap: &TelemetrySnapshot) -> bool {
        let minutes = self.race_minutes();
        self.stats.write().process_tick(snap, minutes)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Stats) -> R) -> R {
        f(&self.stats.read())
    }

    pub fn real_time_message(&self) -> RealTimeMessage {
        real_time_message(&self.stats.read())
    }

    /// Heavy payload, only when a lap changed since the last call.
    pub fn heavy_message_if_stale(&self) -> Option<HeavyMessage> {
        let mut stats = self.stats.write();
        stats.take_heavy_refresh().then(|| heavy_message(&stats))
    }

    pub fn reset(&self) {
        self.stats.write().reset();
    }

    /// Drains `rx` on a dedicated thread until every sender is gone.
    pub fn pump(&self, rx: TelemetryRx) -> JoinHandle<()> {
        let service = self.clone();
        thread::spawn(move || {
            let mut accepted = 0u64;
            for snap in rx.iter() {
                if service.ingest(&snap) {
                    accepted += 1;
                }
            }
            info!(accepted, "telemetry channel closed");
        })
    }
}

/// Spawns `src` on the current tokio runtime and pumps its snapshots into `service`.
pub fn run_source<S: TelemetrySource + 'static>(src: S, service: &StatsService) -> JoinHandle<()> {
    let (tx, rx): (_, TelemetryRx) = channel();
    tokio::spawn(async move {
        if let Err(e) = src.run(tx).await {
            warn!(error = %e, "telemetry source stopped");
        }
    });
    service.pump(rx)
}
