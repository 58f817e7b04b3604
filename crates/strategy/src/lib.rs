//! Fuel and race strategy metrics derived from a live telemetry feed.

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod laps;
pub mod message;
pub mod service;
pub mod stats;
pub mod tires;
pub mod utils;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::StatsConfig;
pub use error::{ResultExt, StatsError};
pub use laps::LapList;
pub use message::{heavy_message, real_time_message, HeavyMessage, RealTimeMessage};
pub use service::{run_source, StatsService};
pub use stats::{EndOfRaceType, Stats};
pub use tires::TireWearCell;
pub use utils::PitStop;
