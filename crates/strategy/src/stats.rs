//! Race statistics engine: tick ingestion and the derived metric queries.

use std::fmt;
use std::sync::Arc;

use fuel_ingest_core::TelemetrySnapshot;
use model::{CarPosition, Lap, LapSample, TireWear};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::StatsConfig;
use crate::error::{ResultExt, StatsError};
use crate::history::History;
use crate::laps::LapList;
use crate::tires::TireWearCell;
use crate::utils::{self, lap_time_from_millis, sport_format, PitStop};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum EndOfRaceType {
    #[serde(rename = "By Laps")]
    ByLaps,
    #[serde(rename = "By Time")]
    ByTime,
}

impl fmt::Display for EndOfRaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndOfRaceType::ByLaps => f.write_str("By Laps"),
            EndOfRaceType::ByTime => f.write_str("By Time"),
        }
    }
}

/// Fields of the previous accepted tick the state machine compares against.
#[derive(Clone, Copy, Debug, PartialEq)]
struct LoggedState {
    package_id: i32,
    current_lap: i16,
    fuel_capacity: f32,
}

pub struct Stats {
    config: StatsConfig,
    clock: Arc<dyn Clock>,
    tires: TireWearCell,
    race_id: Uuid,
    last_logged: Option<LoggedState>,
    ongoing_lap: Lap,
    laps: LapList,
    last_data: TelemetrySnapshot,
    manual_race_duration: Duration,
    race_start: Option<OffsetDateTime>,
    connection_active: bool,
    history: History,
    heavy_refresh: bool,
}

impl Stats {
    pub fn new(config: StatsConfig, clock: Arc<dyn Clock>, tires: TireWearCell) -> Self {
        let history = History::new(config.history_capacity, config.package_interval());
        let manual_race_duration = config.race_duration();
        Self {
            config,
            clock,
            tires,
            race_id: Uuid::new_v4(),
            last_logged: None,
            ongoing_lap: Lap::default(),
            laps: LapList::new(),
            last_data: TelemetrySnapshot::default(),
            manual_race_duration,
            race_start: None,
            connection_active: false,
            history,
            heavy_refresh: false,
        }
    }

    /// Feeds one telemetry snapshot. Returns false when the package id did
    /// not change, in which case no state besides the liveness flag is touched.
    pub fn process_tick(&mut self, snap: &TelemetrySnapshot, race_minutes: Option<u32>) -> bool {
        if let Some(minutes) = race_minutes {
            self.manual_race_duration = Duration::minutes(i64::from(minutes));
        }

        self.connection_active = self
            .last_logged
            .map_or(true, |logged| logged.package_id != snap.package_id);
        if !self.connection_active {
            debug!(package_id = snap.package_id, "package id unchanged, tick skipped");
            return false;
        }

        self.last_data = snap.clone();
        self.history.update(snap);

        let now = self.clock.now();
        let tires = self.tires.latest();

        match self.last_logged.map(|logged| logged.current_lap) {
            None => {
                self.ongoing_lap = Lap::start(snap.current_lap, snap.current_fuel, now, None, tires);
            }
            Some(previous_lap) => {
                if snap.current_lap == 0 && (!self.laps.is_empty() || previous_lap > 0) {
                    self.start_new_race(snap, now, tires);
                } else if previous_lap == 0 && snap.current_lap == 1 {
                    self.race_start = Some(now);
                    self.ongoing_lap = Lap::start(1, snap.current_fuel, now, None, tires);
                    info!(race_id = %self.race_id, fuel = snap.current_fuel, "race start");
                } else if snap.current_lap != self.ongoing_lap.number {
                    self.finish_lap(snap, now, tires);
                }
            }
        }

        self.ongoing_lap.samples.push(LapSample {
            package_id: snap.package_id,
            speed_kph: snap.car_speed_kph,
            throttle: snap.throttle,
            brake: snap.brake,
            x: snap.position_x,
            z: snap.position_z,
        });

        self.last_logged = Some(LoggedState {
            package_id: snap.package_id,
            current_lap: snap.current_lap,
            fuel_capacity: snap.fuel_capacity,
        });
        true
    }

    fn finish_lap(&mut self, snap: &TelemetrySnapshot, now: OffsetDateTime, tires: TireWear) {
        let mut finished = std::mem::take(&mut self.ongoing_lap);
        finished.fuel_end = snap.current_fuel;
        finished.duration = lap_time_from_millis(snap.last_lap_ms);
        finished.tires_end = tires.clone();

        info!(
            lap = finished.number,
            time = %sport_format(finished.duration),
            fuel_consumed = finished.fuel_consumed(),
            "lap finished"
        );

        let idx = self.laps.push(finished);
        self.ongoing_lap = Lap::start(snap.current_lap, snap.current_fuel, now, Some(idx), tires);
        self.heavy_refresh = true;
    }

    fn start_new_race(&mut self, snap: &TelemetrySnapshot, now: OffsetDateTime, tires: TireWear) {
        info!(race_id = %self.race_id, completed_laps = self.laps.len(), "race reset");
        self.laps.clear();
        self.race_start = None;
        self.race_id = Uuid::new_v4();
        self.ongoing_lap = Lap::start(snap.current_lap, snap.current_fuel, now, None, tires);
        self.heavy_refresh = true;
    }

    /// Forgets everything learned from the feed; configuration and collaborators stay.
    pub fn reset(&mut self) {
        self.last_logged = None;
        self.last_data = TelemetrySnapshot::default();
        self.ongoing_lap = Lap::default();
        self.laps.clear();
        self.race_start = None;
        self.connection_active = false;
        self.history.clear();
        self.race_id = Uuid::new_v4();
        self.heavy_refresh = true;
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn race_id(&self) -> Uuid {
        self.race_id
    }

    pub fn connection_active(&self) -> bool {
        self.connection_active
    }

    pub fn laps(&self) -> &LapList {
        &self.laps
    }

    pub fn ongoing_lap(&self) -> &Lap {
        &self.ongoing_lap
    }

    pub fn last_data(&self) -> &TelemetrySnapshot {
        &self.last_data
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn race_start(&self) -> Option<OffsetDateTime> {
        self.race_start
    }

    pub fn set_race_start(&mut self, start: Option<OffsetDateTime>) {
        self.race_start = start;
    }

    pub fn manual_race_duration(&self) -> Duration {
        self.manual_race_duration
    }

    pub fn set_manual_race_duration(&mut self, duration: Duration) {
        self.manual_race_duration = duration;
    }

    pub fn fuel_capacity(&self) -> Option<f32> {
        self.last_logged.map(|logged| logged.fuel_capacity)
    }

    pub fn tire_wear(&self) -> TireWear {
        self.tires.latest()
    }

    /// Returns whether a lap changed since the last call and clears the flag.
    pub fn take_heavy_refresh(&mut self) -> bool {
        std::mem::replace(&mut self.heavy_refresh, false)
    }

    pub fn best_lap_duration(&self) -> Option<Duration> {
        (self.last_data.best_lap_ms >= 0).then(|| lap_time_from_millis(self.last_data.best_lap_ms))
    }

    pub fn last_lap_duration(&self) -> Option<Duration> {
        (self.last_data.last_lap_ms >= 0).then(|| lap_time_from_millis(self.last_data.last_lap_ms))
    }

    pub fn reference_lap_duration(&self) -> Result<Duration, StatsError> {
        self.best_lap_duration()
            .or_else(|| self.last_lap_duration())
            .ok_or(StatsError::ReferenceLapUnavailable {
                best_lap_ms: self.last_data.best_lap_ms,
                last_lap_ms: self.last_data.last_lap_ms,
            })
    }

    pub fn race_duration(&self) -> Result<Duration, StatsError> {
        let reference = self.reference_lap_duration().context("error getting reference lap")?;
        if self.last_data.total_laps > 0 {
            return Ok(reference * i32::from(self.last_data.total_laps));
        }
        // the lap running when the clock expires is still driven to the end
        Ok(self.manual_race_duration + reference)
    }

    pub fn duration_since_start(&self) -> Result<Duration, StatsError> {
        let start = self.race_start.ok_or(StatsError::RaceStartNotDetected)?;
        Ok(self.clock.now() - start)
    }

    pub fn is_race_clock_plausible(&self) -> bool {
        match self.duration_since_start() {
            Ok(elapsed) if elapsed <= self.config.max_plausible_race_duration() => true,
            Ok(elapsed) => {
                debug!(elapsed = %sport_format(elapsed), "race clock above plausible ceiling");
                false
            }
            Err(_) => false,
        }
    }

    pub fn end_of_race_type(&self) -> EndOfRaceType {
        if self.last_data.total_laps > 0 {
            EndOfRaceType::ByLaps
        } else {
            EndOfRaceType::ByTime
        }
    }

    pub fn laps_left_in_race(&self) -> Result<i16, StatsError> {
        let snap = &self.last_data;
        if snap.total_laps > 0 {
            // the current lap is still to be driven
            return Ok(snap.total_laps.saturating_sub(snap.current_lap).saturating_add(1).max(0));
        }

        let reference = self.reference_lap_duration().context("error getting reference lap")?;
        let elapsed = self.duration_since_start().context("error getting duration since start")?;
        let race_duration = self.race_duration().context("error getting race duration")?;
        utils::laps_left_in_race(elapsed, race_duration, reference).context("error getting laps left")
    }

    pub fn total_laps_in_race(&self) -> Result<i16, StatsError> {
        if self.last_data.total_laps > 0 {
            return Ok(self.last_data.total_laps);
        }
        let reference = self.reference_lap_duration().context("error getting reference lap")?;
        let race_duration = self.race_duration().context("error getting race duration")?;
        utils::laps_left_in_race(Duration::ZERO, race_duration, reference).context("error getting laps left")
    }

    /// Falls back to the lap before when the last lap was a pit stop; only one step back.
    pub fn fuel_consumed_last_lap(&self) -> Result<f32, StatsError> {
        let last = self.laps.last().ok_or(StatsError::NoCompletedLap(self.laps.len()))?;
        if last.is_lap_into_pit() {
            if let Some(before) = self.laps.previous(last) {
                return Ok(before.fuel_consumed());
            }
        }
        Ok(last.fuel_consumed())
    }

    pub fn average_fuel_consumption_per_lap(&self) -> Result<f32, StatsError> {
        let consumed: Vec<f32> = self.laps.regular_laps().map(Lap::fuel_consumed).collect();
        if consumed.is_empty() {
            return Err(StatsError::NoRegularLaps);
        }
        Ok(consumed.iter().sum::<f32>() / consumed.len() as f32)
    }

    pub fn average_lap_time(&self) -> Result<Duration, StatsError> {
        let (total, count) = self
            .laps
            .regular_laps()
            .fold((Duration::ZERO, 0u32), |(total, count), lap| (total + lap.duration, count + 1));
        if count == 0 {
            return Err(StatsError::NoRegularLaps);
        }
        Ok(total / count)
    }

    pub fn fuel_consumption_per_minute(&self) -> Result<f32, StatsError> {
        let lap_time = self.average_lap_time().context("error getting average lap time")?;
        let per_lap = self
            .average_fuel_consumption_per_lap()
            .context("error getting average fuel consumption")?;
        let minutes = lap_time.as_seconds_f64() / 60.0;
        if minutes <= 0.0 {
            return Err(StatsError::ZeroAverageLapTime);
        }
        Ok((f64::from(per_lap) / minutes) as f32)
    }

    /// Projects with the last lap's burn rate, which already absorbs lost packages.
    pub fn fuel_needed_to_finish_race(&self) -> Result<f32, StatsError> {
        let last_lap = self.fuel_consumed_last_lap().context("error getting fuel consumption last lap")?;
        let reference = self.reference_lap_duration().context("error getting reference lap")?;
        let race_duration = self.race_duration().context("error getting race duration")?;
        let elapsed = self.duration_since_start().context("error getting duration since start")?;
        utils::fuel_needed_to_finish_race(elapsed, race_duration, reference, last_lap)
    }

    /// Positive when the tank is short of what the rest of the race needs.
    pub fn fuel_div(&self) -> Result<f32, StatsError> {
        let needed = self
            .fuel_needed_to_finish_race()
            .context("error getting fuel needed to finish race")?;
        Ok(needed - self.last_data.current_fuel)
    }

    pub fn progress_adjusted_current_lap(&self) -> Result<f32, StatsError> {
        let lap_start = self.ongoing_lap.lap_start.ok_or(StatsError::NoLapStart)?;
        let in_lap = self.clock.now() - lap_start;
        let reference = self
            .reference_lap_duration()
            .context("impossible to calculate progress adjusted current lap")?;
        utils::progress_in_lap(in_lap, reference, self.last_data.current_lap)
    }

    pub fn progress_adjusted_laps_left_in_race(&self) -> Result<f32, StatsError> {
        let total = self.total_laps_in_race()?;
        let progress = self.progress_adjusted_current_lap()?;
        Ok(f32::from(total) - progress)
    }

    pub fn next_necessary_pit_stop(&self) -> Result<PitStop, StatsError> {
        let avg = self
            .average_fuel_consumption_per_lap()
            .context("error getting average fuel consumption per lap")?;
        let progress = self
            .progress_adjusted_current_lap()
            .context("error getting progress adjusted current lap")?;
        Ok(utils::next_pit_stop(self.last_data.current_fuel, avg, progress))
    }

    pub fn lap_time_deviation(&self) -> Result<Duration, StatsError> {
        if self.laps.len() < 2 {
            return Err(StatsError::NotEnoughLapsForDeviation(self.laps.len()));
        }
        let times: Vec<f64> = self.laps.regular_laps().map(|l| l.duration.as_seconds_f64()).collect();
        let deviation = utils::std_dev(&times).ok_or(StatsError::NoRegularLaps)?;
        Ok(Duration::seconds_f64(deviation))
    }

    pub fn car_position(&self) -> CarPosition {
        CarPosition {
            x: self.last_data.position_x,
            y: self.last_data.position_z,
            facing: self.last_data.rotation_yaw,
        }
    }

    pub fn tire_temperatures(&self) -> [f32; 4] {
        let snap = &self.last_data;
        [snap.tyre_temp_fl, snap.tyre_temp_fr, snap.tyre_temp_rl, snap.tyre_temp_rr]
    }

    pub fn lowest_tire_temp(&self) -> f32 {
        self.tire_temperatures().into_iter().fold(f32::INFINITY, f32::min)
    }

    pub fn is_trail_braking_increasing(&self) -> bool {
        self.history.is_trail_braking_increasing()
    }

    /// Lap-time deviation is left out: it needs lap 3 and must not blank the first laps.
    pub fn valid_state(&self) -> bool {
        self.is_race_clock_plausible()
            && self.laps_left_in_race().is_ok()
            && self.fuel_needed_to_finish_race().is_ok()
            && self.fuel_div().is_ok()
            && self.fuel_consumed_last_lap().is_ok()
            && self.fuel_consumption_per_minute().is_ok()
            && self.average_fuel_consumption_per_lap().is_ok()
            && self.next_necessary_pit_stop().is_ok()
            && self.progress_adjusted_current_lap().is_ok()
            && self.race_duration().is_ok()
    }
}
