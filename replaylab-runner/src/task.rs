//! One symbol's replay: every block from the symbol's first data point to the
//! end of the run, every scenario at every non-missing slot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use replaylab_core::data::{DataError, Provider};
use replaylab_core::memory::{MemoryCell, Parameters};
use replaylab_core::results::{ResultHandler, ResultSet, ScenarioResultSet, SymbolResultSet};
use replaylab_core::supplier::DataSupplier;

use crate::algorithm::Algorithm;

/// Block counters shared by all tasks of a run.
#[derive(Debug, Default)]
pub struct Progress {
    total: AtomicU64,
    completed: AtomicU64,
}

impl Progress {
    pub fn add_total(&self, blocks: u64) {
        self.total.fetch_add(blocks, Ordering::SeqCst);
    }

    pub fn complete_block(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::SeqCst);
        self.completed.store(0, Ordering::SeqCst);
    }

    /// Percent complete, or `None` while the total is still unknown.
    pub fn percent(&self) -> Option<f64> {
        progress_percent(self.completed(), self.total())
    }
}

pub fn progress_percent(completed: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| completed as f64 * 100.0 / total as f64)
}

pub(crate) struct Task<'r, A: Algorithm> {
    algorithm: &'r A,
    provider: Provider,
    params: &'r [Parameters],
    until: i64,
    first: i64,
    last: i64,
    progress: &'r Progress,
}

impl<'r, A: Algorithm> Task<'r, A> {
    /// Resolve the symbol's listing and the blocks to replay, without
    /// fetching any block data.
    pub(crate) fn prepare(
        algorithm: &'r A,
        provider: Provider,
        params: &'r [Parameters],
        until: i64,
        progress: &'r Progress,
    ) -> Result<Self, DataError> {
        let info = provider.info()?;
        let first = provider.first_block(&info);
        let last = provider.block_of(until);
        Ok(Self {
            algorithm,
            provider,
            params,
            until,
            first,
            last,
            progress,
        })
    }

    /// Blocks this task will replay.
    pub(crate) fn blocks(&self) -> u64 {
        u64::try_from(self.last - self.first + 1).unwrap_or(0)
    }

    /// Replay the symbol and publish its results into `results`.
    pub(crate) fn run(&self, results: &Mutex<ResultSet>) -> Result<(), DataError> {
        let symbol = self.provider.symbol().to_string();
        debug!(symbol = %symbol, "task started");

        let replayed = self.replay().map_err(|e| {
            warn!(symbol = %symbol, error = %e, "task failed");
            e
        })?;

        results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .symbols
            .insert(symbol, replayed);
        Ok(())
    }

    fn replay(&self) -> Result<SymbolResultSet, DataError> {
        let resolution = self.provider.resolution();
        let (first, last) = (self.first, self.last);

        let mut memory: Vec<MemoryCell<A::State>> =
            self.params.iter().map(|_| MemoryCell::new()).collect();
        let mut scenarios: Vec<ScenarioResultSet> = self
            .params
            .iter()
            .map(|p| ScenarioResultSet::new(p.values().to_vec()))
            .collect();

        let mut previous = self.provider.data_store(first - 1);
        for block in first..=last {
            let current = self.provider.data_store(block);
            let candles = current.candles(resolution)?;

            for (index, candle) in candles.candles.iter().enumerate() {
                if candle.time > self.until {
                    break;
                }
                if candle.missing {
                    continue;
                }

                let chart = DataSupplier::new(
                    &current,
                    &previous,
                    self.provider.algorithms(),
                    index,
                    candle.time,
                    candle.close,
                );
                for ((cell, set), params) in memory
                    .iter_mut()
                    .zip(scenarios.iter_mut())
                    .zip(self.params)
                {
                    let mut events = ResultHandler::new(set, candle.time, candle.close);
                    self.algorithm.step(&chart, &mut events, cell, params)?;
                }
            }

            self.progress.complete_block();
            debug!(symbol = %self.provider.symbol(), block, "block replayed");
            previous = current;
        }

        Ok(SymbolResultSet { scenarios })
    }
}
