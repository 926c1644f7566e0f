//! Rolling high: flags closes at or above every close in the last
//! `historySize` slots.

use replaylab_core::data::DataError;
use replaylab_core::memory::{MemoryCell, Parameters, RingBuffer};
use replaylab_core::results::ResultHandler;
use replaylab_core::supplier::DataSupplier;

use crate::algorithm::Algorithm;

#[derive(Debug, Clone, Copy, Default)]
pub struct RollingHigh;

impl Algorithm for RollingHigh {
    type State = RingBuffer<f64>;

    fn name(&self) -> &str {
        "rolling-high"
    }

    fn keys(&self) -> &[&str] {
        &["historySize"]
    }

    fn step(
        &self,
        chart: &DataSupplier<'_>,
        events: &mut ResultHandler<'_>,
        memory: &mut MemoryCell<RingBuffer<f64>>,
        params: &Parameters,
    ) -> Result<(), DataError> {
        let interval = chart.interval(chart.resolution());
        let current = interval.candle()?;

        if memory.is_empty() {
            let size = params.get_int("historySize").max(1) as usize;
            let mut history = RingBuffer::new(size);
            for offset in (1..size).rev() {
                let candle = interval.from_last(offset)?;
                if !candle.missing {
                    history.push(candle.close);
                }
            }
            memory.store(history);
        }
        let Some(history) = memory.read_mut() else {
            return Ok(());
        };
        history.push(current.close);

        if history.iter().all(|&close| current.close >= close) {
            events.new_event("high").set_color("green").set_icon("up");
        }
        Ok(())
    }
}
