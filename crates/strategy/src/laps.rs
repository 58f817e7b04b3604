//! Append-only list of completed laps; `Lap::previous` indexes into it.

use model::Lap;
use time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LapList {
    laps: Vec<Lap>,
}

impl LapList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalised lap and returns its index.
    pub fn push(&mut self, lap: Lap) -> usize {
        self.laps.push(lap);
        self.laps.len() - 1
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Lap> {
        self.laps.get(idx)
    }

    pub fn last(&self) -> Option<&Lap> {
        self.laps.last()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.laps.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Lap> + ExactSizeIterator {
        self.laps.iter()
    }

    pub fn previous(&self, lap: &Lap) -> Option<&Lap> {
        lap.previous.and_then(|idx| self.laps.get(idx))
    }

    pub fn is_out_lap_from_pit(&self, lap: &Lap) -> bool {
        self.previous(lap).is_some_and(Lap::is_lap_into_pit)
    }

    /// Usable for averaging: past the cold start and not touching a pit stop.
    pub fn is_regular(&self, lap: &Lap) -> bool {
        lap.number >= 2 && !lap.is_lap_into_pit() && !self.is_out_lap_from_pit(lap)
    }

    pub fn regular_laps(&self) -> impl Iterator<Item = &Lap> {
        self.laps.iter().filter(|lap| self.is_regular(lap))
    }

    /// Race time at the end of `lap`, summed over the `previous` chain.
    pub fn total_race_duration_at_end(&self, lap: &Lap) -> Duration {
        let mut total = lap.duration;
        let mut next = lap.previous;
        // an index chain in an append-only list points strictly backwards
        let mut steps = 0;
        while let Some(idx) = next {
            let Some(prev) = self.laps.get(idx) else { break };
            if steps >= self.laps.len() {
                break;
            }
            total += prev.duration;
            next = prev.previous;
            steps += 1;
        }
        total
    }

    pub fn total_race_duration_at_start(&self, lap: &Lap) -> Duration {
        self.previous(lap)
            .map_or(Duration::ZERO, |prev| self.total_race_duration_at_end(prev))
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }
}

impl From<Vec<Lap>> for LapList {
    fn from(laps: Vec<Lap>) -> Self {
        Self { laps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(number: i16, fuel_start: f32, fuel_end: f32, minutes: i64, previous: Option<usize>) -> Lap {
        Lap {
            number,
            fuel_start,
            fuel_end,
            duration: Duration::minutes(minutes),
            previous,
            ..Lap::default()
        }
    }

    fn race_with_pit() -> LapList {
        LapList::from(vec![
            lap(1, 100.0, 95.0, 3, None),
            lap(2, 95.0, 90.0, 2, Some(0)),
            lap(3, 90.0, 100.0, 2, Some(1)),
            lap(4, 100.0, 95.0, 2, Some(2)),
            lap(5, 95.0, 90.0, 2, Some(3)),
        ])
    }

    #[test]
    fn test_regular_laps_skip_start_pit_and_out_lap() {
        let laps = race_with_pit();
        let numbers: Vec<i16> = laps.regular_laps().map(|l| l.number).collect();
        assert_eq!(numbers, vec![2, 5]);

        let out_lap = laps.get(3).unwrap();
        assert!(laps.is_out_lap_from_pit(out_lap));
        assert!(!laps.is_out_lap_from_pit(laps.get(4).unwrap()));
    }

    #[test]
    fn test_total_race_duration() {
        let laps = race_with_pit();
        let last = laps.last().unwrap();
        assert_eq!(laps.total_race_duration_at_end(last), Duration::minutes(11));
        assert_eq!(laps.total_race_duration_at_start(last), Duration::minutes(9));

        let first = laps.get(0).unwrap();
        assert_eq!(laps.total_race_duration_at_start(first), Duration::ZERO);
        assert_eq!(laps.total_race_duration_at_end(first), Duration::minutes(3));
    }

    #[test]
    fn test_dangling_previous_stops_the_walk() {
        let laps = LapList::from(vec![lap(2, 10.0, 8.0, 2, Some(7))]);
        let only = laps.last().unwrap();
        assert_eq!(laps.total_race_duration_at_end(only), Duration::minutes(2));
        assert!(!laps.is_out_lap_from_pit(only));
    }

    #[test]
    fn test_push_returns_index() {
        let mut laps = LapList::new();
        assert_eq!(laps.last_index(), None);
        assert_eq!(laps.push(lap(1, 1.0, 0.5, 1, None)), 0);
        assert_eq!(laps.push(lap(2, 0.5, 0.2, 1, Some(0))), 1);
        assert_eq!(laps.last_index(), Some(1));
        laps.clear();
        assert!(laps.is_empty());
    }
}
