//! Dashboard payloads assembled from engine queries.

use std::fmt::Write as _;

use model::{BBox, CarPosition, Lap, LapTrace, Point2};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StatsError;
use crate::laps::LapList;
use crate::stats::{EndOfRaceType, Stats};
use crate::utils::{round_up_always, sport_format, PitStop};

pub const NO_START_DETECTED: &str = "No start detected yet";

/// Frequent summary; a field is `None` when its metric is not computable yet
/// and the cause is listed in `error_message`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RealTimeMessage {
    pub race_id: Uuid,
    pub speed: String,
    pub package_id: i32,
    pub fuel_left: String,
    pub fuel_consumption_last_lap: Option<String>,
    pub fuel_consumption_avg: Option<String>,
    pub fuel_consumption_per_minute: Option<String>,
    pub time_since_start: String,
    pub fuel_needed_to_finish_race: Option<i32>,
    pub fuel_div: Option<String>,
    pub race_time_in_minutes: Option<i64>,
    pub valid_state: bool,
    pub laps_left_in_race: Option<i16>,
    pub end_of_race_type: EndOfRaceType,
    pub lowest_tire_temp: f32,
    pub error_message: String,
    pub next_pit_stop: Option<PitStop>,
    pub current_lap_progress_adjusted: Option<String>,
    pub tires: String,
    pub lap_time_deviation: Option<String>,
    pub tire_temperatures: [i32; 4],
    pub tcs_active: bool,
    pub asm_active: bool,
    pub rising_trail_braking: bool,
    pub position: CarPosition,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeavyMessage {
    pub formatted_laps: String,
    pub lap_trace: LapTrace,
}

/// Collects failure causes instead of stopping at the first one.
#[derive(Default)]
struct Diagnostics {
    messages: Vec<String>,
    invalid: bool,
}

impl Diagnostics {
    fn check<T>(&mut self, label: &str, result: Result<T, StatsError>) -> Option<T> {
        self.note(label, result, true)
    }

    fn note<T>(&mut self, label: &str, result: Result<T, StatsError>, affects_validity: bool) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.messages.push(format!("{label} unknown: {e}"));
                self.invalid |= affects_validity;
                None
            }
        }
    }
}

pub fn real_time_message(stats: &Stats) -> RealTimeMessage {
    let snap = stats.last_data();
    let mut diag = Diagnostics::default();

    let time_since_start = match stats.duration_since_start() {
        Ok(elapsed) => sport_format(elapsed),
        Err(_) => NO_START_DETECTED.to_string(),
    };
    let clock_plausible = stats.is_race_clock_plausible();

    let laps_left_in_race = diag.check("Laps left in race", stats.laps_left_in_race());
    let fuel_needed = diag.check("Fuel needed to finish race", stats.fuel_needed_to_finish_race());
    let fuel_div = diag.check("Fuel div", stats.fuel_div());
    let fuel_last_lap = diag.check("Fuel consumption last lap", stats.fuel_consumed_last_lap());
    let fuel_per_minute = diag.check("Fuel consumption per minute", stats.fuel_consumption_per_minute());
    let fuel_avg = diag.check("Avg fuel consumption", stats.average_fuel_consumption_per_lap());
    let next_pit_stop = diag.check("Next pit stop", stats.next_necessary_pit_stop());
    let progress = diag.check("Current lap progress", stats.progress_adjusted_current_lap());
    let race_duration = diag.check("Race duration", stats.race_duration());
    // only available from lap 3 on
    let deviation = diag.note("Lap time deviation", stats.lap_time_deviation(), false);

    let temps = stats.tire_temperatures();

    RealTimeMessage {
        race_id: stats.race_id(),
        speed: format!("{:.0}", snap.car_speed_kph),
        package_id: snap.package_id,
        fuel_left: format!("{:.2}", snap.current_fuel),
        fuel_consumption_last_lap: fuel_last_lap.map(|v| format!("{v:.2}")),
        fuel_consumption_avg: fuel_avg.map(|v| format!("{v:.2}")),
        fuel_consumption_per_minute: fuel_per_minute.map(|v| format!("{v:.2}")),
        time_since_start,
        fuel_needed_to_finish_race: fuel_needed.map(round_up_always),
        fuel_div: fuel_div.map(|v| format!("{v:.0}")),
        race_time_in_minutes: race_duration.map(|d| d.whole_minutes()),
        valid_state: clock_plausible && !diag.invalid,
        laps_left_in_race,
        end_of_race_type: stats.end_of_race_type(),
        lowest_tire_temp: stats.lowest_tire_temp(),
        error_message: diag.messages.join("\n"),
        next_pit_stop,
        current_lap_progress_adjusted: progress.map(|v| format!("{v:.1}")),
        tires: stats.tire_wear().summary(),
        lap_time_deviation: deviation.map(sport_format),
        tire_temperatures: temps.map(|t| t as i32),
        tcs_active: snap.is_tcs_engaged,
        asm_active: snap.is_asm_engaged,
        rising_trail_braking: stats.is_trail_braking_increasing(),
        position: stats.car_position(),
    }
}

pub fn heavy_message(stats: &Stats) -> HeavyMessage {
    let trace = match stats.laps().last() {
        Some(lap) => lap_trace(lap, stats.config().trace_detail),
        None => LapTrace { polyline: Vec::new(), bbox: BBox::empty() },
    };
    HeavyMessage { formatted_laps: lap_table_html(stats.laps()), lap_trace: trace }
}

/// Lap history as an HTML table, newest lap first.
pub fn lap_table_html(laps: &LapList) -> String {
    let mut html = String::from(
        "<table class='laptable'>\n\t<tr>\n\t\t<th>#</th>\n\t\t<th>Duration</th>\n\t\t<th>Time</th>\n\
         \t\t<th>Top Speed</th>\n\t\t<th>Fuel Consumed</th>\n\t\t<th>Tires Consumed</th>\n\t</tr>\n",
    );
    for lap in laps.iter().rev() {
        let top_speed = lap.top_speed().map_or_else(|| "-".to_string(), |v| format!("{v:.0}"));
        let _ = write!(
            html,
            "\t<tr>\n\t\t<td>{}</td>\n\t\t<td>{}</td>\n\t\t<td>{}</td>\n\t\t<td>{}</td>\n\
             \t\t<td>{:.1}</td>\n\t\t<td>{}</td>\n\t</tr>\n",
            lap.number,
            sport_format(laps.total_race_duration_at_end(lap)),
            sport_format(lap.duration),
            top_speed,
            lap.fuel_consumed(),
            lap.tire_consumption().format(),
        );
    }
    html.push_str("</table>\n");
    html
}

/// Path of a lap in the x/z plane, keeping every `detail`-th sample and
/// closing the loop back to the first point.
pub fn lap_trace(lap: &Lap, detail: usize) -> LapTrace {
    let mut polyline: Vec<Point2> = lap
        .samples
        .iter()
        .step_by(detail.max(1))
        .map(|s| Point2 { x: f64::from(s.x), y: f64::from(s.z) })
        .collect();

    if polyline.is_empty() {
        return LapTrace { polyline, bbox: BBox::empty() };
    }
    if polyline.len() > 1 && polyline.first() != polyline.last() {
        let first = polyline[0].clone();
        polyline.push(first);
    }

    let bbox = bbox_of(&polyline);
    LapTrace { polyline, bbox }
}

fn bbox_of(pl: &[Point2]) -> BBox {
    pl.iter().fold(
        BBox { minx: f64::INFINITY, maxx: f64::NEG_INFINITY, miny: f64::INFINITY, maxy: f64::NEG_INFINITY },
        |b, p| BBox {
            minx: b.minx.min(p.x),
            maxx: b.maxx.max(p.x),
            miny: b.miny.min(p.y),
            maxy: b.maxy.max(p.y),
        },
    )
}
