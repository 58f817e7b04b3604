//! Rolling window of raw samples for distance integration and brake trends.

use std::collections::VecDeque;

use fuel_ingest_core::TelemetrySnapshot;
use serde::Serialize;
use time::Duration;

use crate::utils::{package_duration, travelled_distance_m};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HistorySample {
    pub package_id: i32,
    pub throttle: u8,
    pub brake: u8,
    pub speed_kph: f32,
    /// Cumulative distance since the buffer was last cleared, in meters.
    pub distance_m: f64,
}

#[derive(Clone, Debug)]
pub struct History {
    samples: VecDeque<HistorySample>,
    capacity: usize,
    package_interval: Duration,
}

impl History {
    pub fn new(capacity: usize, package_interval: Duration) -> Self {
        let capacity = capacity.max(2);
        Self { samples: VecDeque::with_capacity(capacity), capacity, package_interval }
    }

    pub fn update(&mut self, snap: &TelemetrySnapshot) {
        let distance_m = match self.samples.back() {
            None => 0.0,
            Some(last) => {
                // ids may wrap or restart with the source
                let delta = snap.package_id.wrapping_sub(last.package_id);
                let step = if delta > 0 {
                    travelled_distance_m(snap.car_speed_kph, package_duration(delta, self.package_interval))
                } else {
                    0.0
                };
                last.distance_m + step
            }
        };

        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(HistorySample {
            package_id: snap.package_id,
            throttle: snap.throttle,
            brake: snap.brake,
            speed_kph: snap.car_speed_kph,
            distance_m,
        });
    }

    pub fn travelled_distance_m(&self) -> f64 {
        self.samples.back().map_or(0.0, |s| s.distance_m)
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True while the driver keeps adding brake, except for a clean
    /// ramp that started from a released pedal.
    pub fn is_trail_braking_increasing(&self) -> bool {
        let mut brakes = self.samples.iter().rev().map(|s| s.brake);
        let (Some(newest), Some(previous)) = (brakes.next(), brakes.next()) else {
            return false;
        };
        if newest <= previous {
            return false;
        }

        let mut upper = previous;
        if upper == 0 {
            return false;
        }
        for b in brakes {
            if b >= upper {
                return true;
            }
            if b == 0 {
                return false;
            }
            upper = b;
        }
        true
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(package_id: i32, speed: f32, brake: u8) -> TelemetrySnapshot {
        TelemetrySnapshot { package_id, car_speed_kph: speed, brake, ..Default::default() }
    }

    fn with_brakes(brakes: &[u8]) -> History {
        let mut h = History::new(16, Duration::milliseconds(16));
        for (i, b) in brakes.iter().enumerate() {
            h.update(&snap(i as i32 + 1, 100.0, *b));
        }
        h
    }

    #[test]
    fn test_first_sample_seeds_zero_distance() {
        let mut h = History::new(4, Duration::milliseconds(16));
        h.update(&snap(10, 200.0, 0));
        assert_eq!(h.travelled_distance_m(), 0.0);
        assert_eq!(h.latest().map(|s| s.package_id), Some(10));
    }

    #[test]
    fn test_dropped_packages_scale_distance() {
        let mut h = History::new(4, Duration::milliseconds(1000));
        h.update(&snap(1, 36.0, 0));
        h.update(&snap(2, 36.0, 0));
        assert!((h.travelled_distance_m() - 10.0).abs() < 1e-9);

        // three packages lost: four ticks worth of time
        h.update(&snap(6, 36.0, 0));
        assert!((h.travelled_distance_m() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_package_id_restart_adds_nothing() {
        let mut h = History::new(4, Duration::milliseconds(1000));
        h.update(&snap(100, 36.0, 0));
        h.update(&snap(101, 36.0, 0));
        h.update(&snap(3, 36.0, 0));
        assert!((h.travelled_distance_m() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrapping_package_id() {
        let mut h = History::new(4, Duration::milliseconds(1000));
        h.update(&snap(i32::MAX, 36.0, 0));
        h.update(&snap(i32::MIN, 36.0, 0));
        assert!((h.travelled_distance_m() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacity_keeps_cumulative_distance() {
        let mut h = History::new(2, Duration::milliseconds(1000));
        for id in 1..=5 {
            h.update(&snap(id, 36.0, 0));
        }
        assert_eq!(h.len(), 2);
        assert!((h.travelled_distance_m() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_trail_braking() {
        assert!(!with_brakes(&[]).is_trail_braking_increasing());
        assert!(!with_brakes(&[40]).is_trail_braking_increasing());
        // released pedal
        assert!(!with_brakes(&[50, 30, 0]).is_trail_braking_increasing());
        // steady or easing off
        assert!(!with_brakes(&[60, 60]).is_trail_braking_increasing());
        assert!(!with_brakes(&[80, 60]).is_trail_braking_increasing());
        // clean ramp from zero is normal entry
        assert!(!with_brakes(&[0, 20, 50, 90]).is_trail_braking_increasing());
        assert!(!with_brakes(&[0, 30]).is_trail_braking_increasing());
        // pressure was easing, then rising again
        assert!(with_brakes(&[0, 80, 40, 60]).is_trail_braking_increasing());
        // ramp whose start fell out of the window
        assert!(with_brakes(&[20, 50, 90]).is_trail_braking_increasing());
    }

    #[test]
    fn test_clear() {
        let mut h = with_brakes(&[1, 2, 3]);
        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.travelled_distance_m(), 0.0);
    }
}
