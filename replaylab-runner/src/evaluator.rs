//! Evaluator — runs one algorithm over many symbols and scenarios.
//!
//! A run validates its whole configuration first, then replays every symbol
//! as an independent task on a bounded rayon pool and merges the per-symbol
//! results into one [`ResultSet`]. Any data error fails the whole run and no
//! results are published.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use replaylab_core::data::{MarketData, Provider};
use replaylab_core::domain::AssetIdentifier;
use replaylab_core::memory::Parameters;
use replaylab_core::results::ResultSet;

use crate::algorithm::Algorithm;
use crate::config::{default_threads, ConfigError};
use crate::error::RunError;
use crate::gate::RunGate;
use crate::task::{Progress, Task};

/// What to replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalOptions {
    pub symbols: Vec<String>,
    pub resolution: i64,
    /// Last timestamp to replay (unix seconds); `None` means now.
    #[serde(default)]
    pub until: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Finished,
    Failed,
}

/// Snapshot of a run's progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Seconds since the run started (final duration once it ended).
    pub elapsed: f64,
    /// Unix seconds at which the run started.
    pub start_time: Option<i64>,
    pub total_blocks: u64,
    pub completed_blocks: u64,
    /// Percent complete; absent while the total is unknown.
    pub progress: Option<f64>,
    pub running: bool,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

struct RunStatus {
    state: RunState,
    started: Option<Instant>,
    start_time: Option<i64>,
    elapsed: Duration,
    failure: Option<String>,
    results: Option<Arc<ResultSet>>,
}

/// Validated inputs of one run.
struct Plan {
    symbols: Vec<AssetIdentifier>,
    params: Vec<Parameters>,
}

pub struct Evaluator<A: Algorithm> {
    algorithm: A,
    market: Arc<MarketData>,
    options: EvalOptions,
    max_threads: usize,
    gate: Option<Arc<RunGate>>,
    status: Mutex<RunStatus>,
    progress: Progress,
}

impl<A: Algorithm> Evaluator<A> {
    pub fn new(algorithm: A, market: Arc<MarketData>, options: EvalOptions) -> Self {
        Self {
            algorithm,
            market,
            options,
            max_threads: default_threads(),
            gate: None,
            status: Mutex::new(RunStatus {
                state: RunState::Idle,
                started: None,
                start_time: None,
                elapsed: Duration::ZERO,
                failure: None,
                results: None,
            }),
            progress: Progress::default(),
        }
    }

    /// Register runs with a shutdown gate.
    pub fn with_gate(mut self, gate: Arc<RunGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Worker threads for the next run; 1 replays on the calling thread.
    pub fn set_max_threads(&mut self, n: usize) {
        self.max_threads = n.max(1);
    }

    pub fn max_threads(&self) -> usize {
        self.max_threads
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    fn status(&self) -> MutexGuard<'_, RunStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        self.status().state
    }

    /// Results of the last successful run.
    pub fn results(&self) -> Option<Arc<ResultSet>> {
        self.status().results.clone()
    }

    pub fn metrics(&self) -> Metrics {
        let status = self.status();
        let running = status.state == RunState::Running;
        let elapsed = match (running, status.started) {
            (true, Some(started)) => started.elapsed(),
            _ => status.elapsed,
        };
        Metrics {
            elapsed: elapsed.as_secs_f64(),
            start_time: status.start_time,
            total_blocks: self.progress.total(),
            completed_blocks: self.progress.completed(),
            progress: self.progress.percent(),
            running,
            finished: status.state == RunState::Finished,
            failed: status.failure.clone(),
        }
    }

    /// Replay every scenario over every configured symbol.
    ///
    /// `scenarios` are parameter vectors, `keys` their shared names. The
    /// configuration is validated before anything is fetched; a rejected run
    /// leaves the evaluator untouched.
    pub fn run(&self, scenarios: &[Vec<f64>], keys: &[String]) -> Result<Arc<ResultSet>, RunError> {
        let plan = self.validate(scenarios, keys)?;
        let _guard = self.gate.as_ref().map(|g| g.enter()).transpose()?;
        self.begin()?;
        let _running = RunningGuard(self);

        let until = self
            .options
            .until
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        info!(
            algorithm = self.algorithm.name(),
            symbols = plan.symbols.len(),
            scenarios = plan.params.len(),
            threads = self.max_threads,
            "run started"
        );

        let results = Mutex::new(ResultSet::default());
        match self.execute(&plan, until, &results) {
            Ok(()) => {
                let results = Arc::new(results.into_inner().unwrap_or_else(PoisonError::into_inner));
                let elapsed = self.end(RunState::Finished, None, Some(Arc::clone(&results)));
                info!(
                    algorithm = self.algorithm.name(),
                    events = results.event_count(),
                    elapsed_secs = elapsed.as_secs_f64(),
                    "run finished"
                );
                Ok(results)
            }
            Err(err) => {
                self.end(RunState::Failed, Some(err.to_string()), None);
                warn!(algorithm = self.algorithm.name(), error = %err, "run failed");
                Err(err)
            }
        }
    }

    fn validate(&self, scenarios: &[Vec<f64>], keys: &[String]) -> Result<Plan, ConfigError> {
        if self.options.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if self.options.resolution <= 0 {
            return Err(ConfigError::BadResolution(self.options.resolution));
        }
        let symbols = self
            .options
            .symbols
            .iter()
            .map(|s| AssetIdentifier::parse(s))
            .collect::<Result<Vec<_>, _>>()?;

        let keys: Arc<[String]> = keys.into();
        let params = scenarios
            .iter()
            .enumerate()
            .map(|(index, values)| {
                Parameters::new(values.clone(), Arc::clone(&keys))
                    .map_err(|source| ConfigError::Parameters { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Plan { symbols, params })
    }

    fn begin(&self) -> Result<(), RunError> {
        let mut status = self.status();
        if status.state == RunState::Running {
            return Err(RunError::AlreadyRunning);
        }
        status.state = RunState::Running;
        status.started = Some(Instant::now());
        status.start_time = Some(chrono::Utc::now().timestamp());
        status.elapsed = Duration::ZERO;
        status.failure = None;
        status.results = None;
        self.progress.reset();
        Ok(())
    }

    fn end(
        &self,
        state: RunState,
        failure: Option<String>,
        results: Option<Arc<ResultSet>>,
    ) -> Duration {
        let mut status = self.status();
        status.state = state;
        status.elapsed = status.started.map(|s| s.elapsed()).unwrap_or_default();
        status.failure = failure;
        status.results = results;
        status.elapsed
    }

    fn execute(&self, plan: &Plan, until: i64, results: &Mutex<ResultSet>) -> Result<(), RunError> {
        let tasks: Vec<Task<'_, A>> = plan
            .symbols
            .iter()
            .map(|symbol| {
                let provider = Provider::new(
                    Arc::clone(&self.market),
                    symbol.clone(),
                    self.options.resolution,
                );
                Task::prepare(&self.algorithm, provider, &plan.params, until, &self.progress)
            })
            .collect::<Result<_, _>>()?;
        // Every total is known before the first block completes.
        self.progress.add_total(tasks.iter().map(Task::blocks).sum());

        if self.max_threads <= 1 {
            tasks.iter().try_for_each(|task| task.run(results))?;
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.max_threads)
                .build()?;
            pool.install(|| tasks.par_iter().try_for_each(|task| task.run(results)))?;
        }
        Ok(())
    }
}

/// Marks the run failed if a worker panic unwinds out of [`Evaluator::run`].
struct RunningGuard<'e, A: Algorithm>(&'e Evaluator<A>);

impl<A: Algorithm> Drop for RunningGuard<'_, A> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            warn!(algorithm = self.0.algorithm.name(), "run panicked");
            self.0
                .end(RunState::Failed, Some("run panicked".to_string()), None);
        }
    }
}
