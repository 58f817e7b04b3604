//! Formatting and race arithmetic shared by the engine and the message assembler.

use serde::Serialize;
use time::Duration;

use crate::error::StatsError;

pub use model::sport_format;

/// Raw lap time in milliseconds as sent by the game; negative means "not set".
pub fn lap_time_from_millis(raw: i32) -> Duration {
    if raw < 0 {
        return Duration::ZERO;
    }
    Duration::milliseconds(i64::from(raw))
}

pub fn round_up_always(value: f32) -> i32 {
    value.ceil() as i32
}

pub fn median(data: &[f32]) -> f32 {
    let mut sorted: Vec<f64> = data.iter().map(|v| f64::from(*v)).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let l = sorted.len();
    if l == 0 {
        return 0.0;
    }
    if l % 2 == 0 {
        ((sorted[l / 2 - 1] + sorted[l / 2]) / 2.0) as f32
    } else {
        sorted[l / 2] as f32
    }
}

/// Population standard deviation; `None` for an empty slice.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values
        .iter()
        .map(|x| {
            let d = *x - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Some(var.sqrt())
}

pub fn package_duration(packages: i32, package_interval: Duration) -> Duration {
    package_interval * packages
}

pub fn travelled_distance_m(speed_kph: f32, elapsed: Duration) -> f64 {
    f64::from(speed_kph) / 3.6 * elapsed.as_seconds_f64()
}

fn ratio(numerator: Duration, reference_lap: Duration) -> Result<f64, StatsError> {
    if !reference_lap.is_positive() {
        return Err(StatsError::ZeroReferenceLap);
    }
    Ok(numerator.as_seconds_f64() / reference_lap.as_seconds_f64())
}

/// Laps still to run in a time-limited race, counting the lap that is
/// started before the clock runs out.
pub fn laps_left_in_race(
    time_in_race: Duration,
    configured_duration: Duration,
    reference_lap: Duration,
) -> Result<i16, StatsError> {
    let left = ratio(configured_duration + reference_lap - time_in_race, reference_lap)?;
    Ok(left.floor().clamp(0.0, f64::from(i16::MAX)) as i16)
}

pub fn fuel_needed_to_finish_race(
    time_in_race: Duration,
    race_duration: Duration,
    reference_lap: Duration,
    fuel_consumed_last_lap: f32,
) -> Result<f32, StatsError> {
    let laps_of_time_left = ratio(race_duration - time_in_race, reference_lap)?;
    Ok((laps_of_time_left * f64::from(fuel_consumed_last_lap)) as f32)
}

/// Fractional lap position, never reaching the next integer before the game reports it.
pub fn progress_in_lap(
    elapsed_in_lap: Duration,
    reference_lap: Duration,
    current_lap: i16,
) -> Result<f32, StatsError> {
    let progress = ratio(elapsed_in_lap, reference_lap)?.clamp(0.0, 0.99);
    Ok(f32::from(current_lap) + progress as f32)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PitStop {
    AtEndOfLap(i32),
    NotNeeded,
}

pub fn next_pit_stop(current_fuel: f32, avg_fuel_per_lap: f32, progress: f32) -> PitStop {
    if avg_fuel_per_lap <= 0.0 {
        return PitStop::NotNeeded;
    }

    let fuel = f64::from(current_fuel);
    let avg = f64::from(avg_fuel_per_lap);
    let progress = f64::from(progress);

    let remainder = progress.ceil() - progress;
    let fuel_to_finish_current_lap = avg * remainder;
    let current_lap = progress.floor();

    // another full lap is out of reach
    if fuel <= fuel_to_finish_current_lap + avg {
        return PitStop::AtEndOfLap(current_lap as i32);
    }
    PitStop::AtEndOfLap((current_lap + (fuel / avg).floor()) as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_format() {
        let d = Duration::minutes(1) + Duration::seconds(30) + Duration::milliseconds(10);
        assert_eq!(sport_format(d), "01:30.010");

        let d = Duration::minutes(1) + Duration::seconds(30) + Duration::milliseconds(1010);
        assert_eq!(sport_format(d), "01:31.010");

        let d = Duration::hours(2) + Duration::minutes(1) + Duration::seconds(30) + Duration::milliseconds(10);
        assert_eq!(sport_format(d), "121:30.010");

        assert_eq!(sport_format(-Duration::milliseconds(90_010)), "-01:30.010");
        assert_eq!(sport_format(Duration::ZERO), "00:00.000");
    }

    #[test]
    fn test_lap_time_from_millis() {
        let expected = Duration::minutes(1) + Duration::seconds(24) + Duration::milliseconds(149);
        assert_eq!(lap_time_from_millis(84149), expected);
        assert_eq!(lap_time_from_millis(-1), Duration::ZERO);
    }

    #[test]
    fn test_round_up_always() {
        assert_eq!(round_up_always(2.4), 3);
        assert_eq!(round_up_always(2.6), 3);
        assert_eq!(round_up_always(2.0), 2);
        assert_eq!(round_up_always(2.01), 3);
        assert_eq!(round_up_always(-2.01), -2);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(std_dev(&[]), None);
        assert_eq!(std_dev(&[5.0]), Some(0.0));
        assert_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), Some(2.0));
    }

    #[test]
    fn test_package_duration() {
        let tick = Duration::milliseconds(16);
        assert_eq!(package_duration(1, tick), Duration::milliseconds(16));
        assert_eq!(package_duration(100, tick), Duration::milliseconds(1600));
        let one_hour_in_packages = 60 * 60 * 1000 / 16;
        assert_eq!(package_duration(one_hour_in_packages, tick), Duration::hours(1));
    }

    #[test]
    fn test_travelled_distance_one_hour_drive() {
        let one_hour = package_duration(60 * 60 * 1000 / 16, Duration::milliseconds(16));
        let d = travelled_distance_m(100.0, one_hour);
        assert!((d - 100_000.0).abs() < 1e-6, "{d}");
    }

    #[test]
    fn test_laps_left_in_race() {
        let elapsed = Duration::minutes(1) + Duration::seconds(30) + Duration::milliseconds(10);
        let best = Duration::minutes(1) + Duration::seconds(45);
        assert_eq!(laps_left_in_race(elapsed, Duration::minutes(60), best), Ok(34));

        // every lap of a fresh race plus the one started when the clock expires
        assert_eq!(laps_left_in_race(Duration::ZERO, Duration::minutes(100), Duration::minutes(1)), Ok(101));

        let minute = Duration::minutes(1);
        let almost_done = Duration::minutes(99) + Duration::seconds(30);
        assert_eq!(laps_left_in_race(almost_done, Duration::minutes(100), minute), Ok(1));

        let in_last_lap = Duration::minutes(100) + Duration::seconds(30);
        assert_eq!(laps_left_in_race(in_last_lap, Duration::minutes(100), minute), Ok(0));
        assert_eq!(laps_left_in_race(Duration::minutes(101), Duration::minutes(100), minute), Ok(0));
        assert_eq!(laps_left_in_race(Duration::minutes(300), Duration::minutes(100), minute), Ok(0));
    }

    #[test]
    fn test_laps_left_rejects_zero_reference() {
        assert_eq!(
            laps_left_in_race(Duration::ZERO, Duration::minutes(30), Duration::ZERO),
            Err(StatsError::ZeroReferenceLap)
        );
    }

    #[test]
    fn test_fuel_needed_to_finish_race() {
        // 18 minutes left at 25 per 2 minute lap
        let needed = fuel_needed_to_finish_race(
            Duration::minutes(2),
            Duration::minutes(20),
            Duration::minutes(2),
            25.0,
        )
        .unwrap();
        assert_eq!(needed, 225.0);

        assert_eq!(
            fuel_needed_to_finish_race(Duration::ZERO, Duration::minutes(20), Duration::ZERO, 25.0),
            Err(StatsError::ZeroReferenceLap)
        );
    }

    #[test]
    fn test_progress_in_lap() {
        let p = progress_in_lap(Duration::minutes(3), Duration::minutes(4), 0).unwrap();
        assert_eq!(p, 0.75);

        let slow = progress_in_lap(Duration::minutes(5), Duration::minutes(4), 0).unwrap();
        assert!(slow < 1.0);
        assert_eq!(slow, 0.99);

        let p = progress_in_lap(Duration::minutes(1), Duration::minutes(2), 2).unwrap();
        assert_eq!(p, 2.5);
    }

    #[test]
    fn test_next_pit_stop() {
        // 3.5 left at lap 5.5 burning 3 per lap: box at the end of this lap
        assert_eq!(next_pit_stop(3.5, 3.0, 5.5), PitStop::AtEndOfLap(5));
        // close to the line the same fuel carries through lap 6
        assert_eq!(next_pit_stop(3.5, 3.0, 5.9), PitStop::AtEndOfLap(6));

        assert_eq!(next_pit_stop(0.0, 5.0, 0.5), PitStop::AtEndOfLap(0));
        assert_eq!(next_pit_stop(100.0, 5.0, 5.5), PitStop::AtEndOfLap(25));
        assert_eq!(next_pit_stop(100.0, 0.0, 5.5), PitStop::NotNeeded);
    }
}
