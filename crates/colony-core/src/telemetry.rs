//! Optional metric sink.
//!
//! Stages report named numeric metrics on the telemetry cadence. Whether a
//! sink is attached never changes simulation state.

use crate::fixed::Ticks;
use std::sync::{Arc, Mutex};

pub const HAULER_DELIVERED: &str = "mining.haulerDelivered";
pub const SHORTFALL_FOOD: &str = "colony.shortfall.food";
pub const SHORTFALL_WATER: &str = "colony.shortfall.water";
pub const SHORTFALL_FUEL: &str = "colony.shortfall.fuel";
pub const SHORTFALL_SUPPLIES: &str = "colony.shortfall.supplies";
pub const SHORTFALL_ESSENTIALS: &str = "colony.shortfall.essentials";

/// Receiver for named metrics.
pub trait TelemetrySink: Send {
    /// Called once before the metrics of a telemetry tick are recorded.
    fn begin_tick(&mut self, _tick: Ticks) {}

    fn record(&mut self, name: &str, value: f64);
}

/// A sink that keeps every metric it receives, tagged with the tick.
#[derive(Debug, Default)]
pub struct MetricLog {
    tick: Ticks,
    entries: Vec<(Ticks, String, f64)>,
}

impl MetricLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick stamped onto subsequent records.
    pub fn set_tick(&mut self, tick: Ticks) {
        self.tick = tick;
    }

    pub fn entries(&self) -> &[(Ticks, String, f64)] {
        &self.entries
    }

    /// Most recent value recorded under `name`.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .rev()
            .find(|(_, n, _)| n == name)
            .map(|(_, _, v)| *v)
    }

    pub fn drain(&mut self) -> Vec<(Ticks, String, f64)> {
        std::mem::take(&mut self.entries)
    }
}

impl TelemetrySink for MetricLog {
    fn begin_tick(&mut self, tick: Ticks) {
        self.set_tick(tick);
    }

    fn record(&mut self, name: &str, value: f64) {
        self.entries.push((self.tick, name.to_string(), value));
    }
}

/// A sink shared with the host, which keeps a clone of the handle to read
/// metrics back. A poisoned lock drops the metric.
impl<T: TelemetrySink> TelemetrySink for Arc<Mutex<T>> {
    fn begin_tick(&mut self, tick: Ticks) {
        if let Ok(mut inner) = self.lock() {
            inner.begin_tick(tick);
        }
    }

    fn record(&mut self, name: &str, value: f64) {
        if let Ok(mut inner) = self.lock() {
            inner.record(name, value);
        }
    }
}

/// Whether metrics are emitted on `tick`.
pub fn is_telemetry_tick(cadence: Ticks, tick: Ticks) -> bool {
    cadence != 0 && tick % cadence == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_log_keeps_latest() {
        let mut log = MetricLog::new();
        log.set_tick(30);
        log.record(HAULER_DELIVERED, 10.0);
        log.record(HAULER_DELIVERED, 25.0);
        assert_eq!(log.latest(HAULER_DELIVERED), Some(25.0));
        assert_eq!(log.latest(SHORTFALL_FOOD), None);
        assert_eq!(log.entries()[0].0, 30);
        assert_eq!(log.drain().len(), 2);
    }

    #[test]
    fn shared_handle_records_into_inner_log() {
        let shared = Arc::new(Mutex::new(MetricLog::new()));
        let mut sink: Box<dyn TelemetrySink> = Box::new(Arc::clone(&shared));
        sink.begin_tick(60);
        sink.record(SHORTFALL_FOOD, 3.5);
        let log = shared.lock().unwrap();
        assert_eq!(log.entries(), &[(60, SHORTFALL_FOOD.to_string(), 3.5)]);
    }

    #[test]
    fn cadence_gate() {
        assert!(is_telemetry_tick(30, 60));
        assert!(!is_telemetry_tick(30, 61));
        assert!(!is_telemetry_tick(0, 0));
    }
}
