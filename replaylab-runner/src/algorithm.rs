//! The step-function contract every replayed algorithm implements.

use replaylab_core::data::DataError;
use replaylab_core::memory::{MemoryCell, Parameters};
use replaylab_core::results::ResultHandler;
use replaylab_core::supplier::DataSupplier;

/// An algorithm replayed slot by slot over historical data.
///
/// `step` is called once per non-missing slot, per scenario, in time order.
/// Whatever the algorithm needs to remember between steps lives in its
/// [`MemoryCell`]; one cell exists per (symbol, scenario) for the whole run.
pub trait Algorithm: Send + Sync {
    type State: Send;

    fn name(&self) -> &str;

    /// Parameter names used when a run request does not name them.
    fn keys(&self) -> &[&str] {
        &[]
    }

    fn step(
        &self,
        chart: &DataSupplier<'_>,
        events: &mut ResultHandler<'_>,
        memory: &mut MemoryCell<Self::State>,
        params: &Parameters,
    ) -> Result<(), DataError>;
}
