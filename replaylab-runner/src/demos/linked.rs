//! Composition demo: re-emits the events another algorithm produced during
//! the current step.

use replaylab_core::data::DataError;
use replaylab_core::memory::{MemoryCell, Parameters};
use replaylab_core::results::ResultHandler;
use replaylab_core::supplier::DataSupplier;

use crate::algorithm::Algorithm;

pub const SOURCE_ALGORITHM: &str = "highs-and-lows";
pub const SOURCE_PARAMS: [f64; 1] = [7.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct Linked;

impl Algorithm for Linked {
    type State = ();

    fn name(&self) -> &str {
        "linked"
    }

    fn step(
        &self,
        chart: &DataSupplier<'_>,
        events: &mut ResultHandler<'_>,
        _memory: &mut MemoryCell<()>,
        _params: &Parameters,
    ) -> Result<(), DataError> {
        let source = chart.algorithm(SOURCE_ALGORITHM, &SOURCE_PARAMS)?;
        if !source.has_events() {
            return Ok(());
        }
        for event in source.current_events() {
            events
                .new_event(event.label.clone())
                .set_color(event.color.clone())
                .set_icon(event.icon.clone())
                .set_price(event.price)
                .set_time(event.time);
        }
        Ok(())
    }
}
