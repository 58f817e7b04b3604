//! Failure causes for derived metric queries.

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("not enough laps to return fuel consumption of last lap, nr of laps: {0}")]
    NoCompletedLap(usize),
    #[error("not enough laps to calculate lap time deviation, nr of laps: {0}")]
    NotEnoughLapsForDeviation(usize),
    #[error("no regular laps found")]
    NoRegularLaps,
    #[error("race start time is not detected, cannot get time since start")]
    RaceStartNotDetected,
    #[error("both best lap ({best_lap_ms}) and last lap ({last_lap_ms}) are unavailable")]
    ReferenceLapUnavailable { best_lap_ms: i32, last_lap_ms: i32 },
    #[error("reference lap duration is zero, cannot divide by it")]
    ZeroReferenceLap,
    #[error("average lap time is zero")]
    ZeroAverageLapTime,
    #[error("lap start of the ongoing lap is not set, impossible to calculate lap progress")]
    NoLapStart,
    #[error("{context}: {inner}")]
    Context {
        context: &'static str,
        inner: Box<StatsError>,
    },
}

impl StatsError {
    pub fn context(self, context: &'static str) -> Self {
        StatsError::Context {
            context,
            inner: Box::new(self),
        }
    }

    /// Innermost cause, skipping any context wrappers.
    pub fn root(&self) -> &StatsError {
        match self {
            StatsError::Context { inner, .. } => inner.root(),
            other => other,
        }
    }
}

pub trait ResultExt<T> {
    fn context(self, context: &'static str) -> Result<T, StatsError>;
}

impl<T> ResultExt<T> for Result<T, StatsError> {
    fn context(self, context: &'static str) -> Result<T, StatsError> {
        self.map_err(|e| e.context(context))
    }
}
