use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Formats a span as `MM:SS.mmm`; hours are folded into the minutes.
pub fn sport_format(duration: Duration) -> String {
    let sign = if duration.is_negative() { "-" } else { "" };
    let total_ms = duration.whole_milliseconds().unsigned_abs();
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{sign}{minutes:02}:{seconds:02}.{millis:03}")
}

/// A single telemetry sample kept with the lap it was recorded in.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LapSample {
    pub package_id: i32,
    pub speed_kph: f32,
    pub throttle: u8,
    pub brake: u8,
    pub x: f32,
    pub z: f32,
}

/// Remaining tire life per corner in percent, as read by the external tire-wear reader.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct TireWear {
    pub front_left: i32,
    pub front_right: i32,
    pub rear_left: i32,
    pub rear_right: i32,
    #[serde(default)]
    pub captured_at: Option<OffsetDateTime>,
}

impl TireWear {
    /// Wear consumed between `self` (earlier reading) and `end`.
    pub fn diff(&self, end: &TireWear) -> TireDelta {
        TireDelta {
            front_left: self.front_left - end.front_left,
            front_right: self.front_right - end.front_right,
            rear_left: self.rear_left - end.rear_left,
            rear_right: self.rear_right - end.rear_right,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Front: {}%, {}% Rear: {}%, {}%",
            self.front_left, self.front_right, self.rear_left, self.rear_right
        )
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct TireDelta {
    pub front_left: i32,
    pub front_right: i32,
    pub rear_left: i32,
    pub rear_right: i32,
}

impl TireDelta {
    pub fn format(&self) -> String {
        format!(
            "FL {}% FR {}% RL {}% RR {}%",
            self.front_left, self.front_right, self.rear_left, self.rear_right
        )
    }
}

/// One completed or ongoing lap.
///
/// `previous` is an index into the owning lap list, never an owning edge.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Lap {
    pub number: i16,
    pub fuel_start: f32,
    pub fuel_end: f32,
    pub duration: Duration,
    pub lap_start: Option<OffsetDateTime>,
    pub previous: Option<usize>,
    pub tires_start: TireWear,
    pub tires_end: TireWear,
    #[serde(default)]
    pub samples: Vec<LapSample>,
}

impl Default for Lap {
    fn default() -> Self {
        Self {
            number: 0,
            fuel_start: 0.0,
            fuel_end: 0.0,
            duration: Duration::ZERO,
            lap_start: None,
            previous: None,
            tires_start: TireWear::default(),
            tires_end: TireWear::default(),
            samples: Vec::new(),
        }
    }
}

impl Lap {
    pub fn start(
        number: i16,
        fuel_start: f32,
        lap_start: OffsetDateTime,
        previous: Option<usize>,
        tires_start: TireWear,
    ) -> Self {
        Self {
            number,
            fuel_start,
            lap_start: Some(lap_start),
            previous,
            tires_start,
            ..Self::default()
        }
    }

    /// Negative when fuel was added during the lap.
    pub fn fuel_consumed(&self) -> f32 {
        self.fuel_start - self.fuel_end
    }

    pub fn is_lap_into_pit(&self) -> bool {
        self.fuel_consumed() < 0.0
    }

    pub fn top_speed(&self) -> Option<f32> {
        self.samples
            .iter()
            .map(|s| s.speed_kph)
            .fold(None, |best, v| match best {
                Some(b) if b >= v => Some(b),
                _ => Some(v),
            })
    }

    pub fn tire_consumption(&self) -> TireDelta {
        self.tires_start.diff(&self.tires_end)
    }
}

impl fmt::Display for Lap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lap {}: fuel {:.2} -> {:.2} ({:.2} consumed), {}",
            self.number,
            self.fuel_start,
            self.fuel_end,
            self.fuel_consumed(),
            sport_format(self.duration)
        )
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CarPosition {
    pub x: f32,
    pub y: f32,
    pub facing: f32,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LapTrace {
    #[serde(default)]
    pub polyline: Vec<Point2>,
    pub bbox: BBox,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct BBox {
    pub minx: f64,
    pub maxx: f64,
    pub miny: f64,
    pub maxy: f64,
}

impl BBox {
    pub fn empty() -> Self {
        Self { minx: 0.0, maxx: 0.0, miny: 0.0, maxy: 0.0 }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}
