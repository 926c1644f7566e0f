//! EMA crossover: emits one event each time the fast EMA crosses the slow one.

use replaylab_core::data::DataError;
use replaylab_core::memory::{MemoryCell, Parameters};
use replaylab_core::results::ResultHandler;
use replaylab_core::supplier::DataSupplier;

use crate::algorithm::Algorithm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

/// Parameters: `fast` and `slow` EMA periods.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmaCross;

impl Algorithm for EmaCross {
    type State = Trend;

    fn name(&self) -> &str {
        "ema-cross"
    }

    fn keys(&self) -> &[&str] {
        &["fast", "slow"]
    }

    fn step(
        &self,
        chart: &DataSupplier<'_>,
        events: &mut ResultHandler<'_>,
        memory: &mut MemoryCell<Trend>,
        params: &Parameters,
    ) -> Result<(), DataError> {
        let interval = chart.interval(chart.resolution());
        let fast = interval.indicator("ema", &[params.get_int("fast")])?;
        let slow = interval.indicator("ema", &[params.get_int("slow")])?;
        if !fast.exists() || !slow.exists() {
            return Ok(());
        }

        let next = if slow.value() > fast.value() {
            Trend::Down
        } else {
            Trend::Up
        };

        // The first known trend only seeds the state.
        match (memory.read().copied(), next) {
            (Some(Trend::Up), Trend::Down) => {
                events.new_event("downtrend").set_color("red").set_icon("down");
            }
            (Some(Trend::Down), Trend::Up) => {
                events.new_event("uptrend").set_color("green").set_icon("up");
            }
            _ => {}
        }
        memory.store(next);
        Ok(())
    }
}
