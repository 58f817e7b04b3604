//! Latest tire-wear reading, written by the external reader and read by the engine.

use std::sync::Arc;

use model::TireWear;
use parking_lot::RwLock;

#[derive(Clone, Debug, Default)]
pub struct TireWearCell {
    inner: Arc<RwLock<TireWear>>,
}

impl TireWearCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, reading: TireWear) {
        *self.inner.write() = reading;
    }

    pub fn latest(&self) -> TireWear {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_reading() {
        let cell = TireWearCell::new();
        let reader = cell.clone();
        assert_eq!(reader.latest(), TireWear::default());

        cell.publish(TireWear { front_left: 83, front_right: 83, rear_left: 86, rear_right: 91, captured_at: None });
        assert_eq!(reader.latest().rear_right, 91);
    }
}
