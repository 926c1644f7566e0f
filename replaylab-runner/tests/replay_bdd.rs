//! BDD tests for the replay engine.
//!
//! These tests drive the evaluator end to end over in-memory market data:
//! - Determinism across runs and worker counts
//! - Memory continuity across missing candles
//! - EMA crossover transitions
//! - Validation before any fetch, failed runs, run exclusivity
//! - Malformed payloads and panicking algorithms
//! - Monotonic progress
//! - Composition with another algorithm's results

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use replaylab_core::data::{
    CacheMode, DataError, MarketData, MarketSource, MemorySource, Payload, Request, RequestKind,
    DEFAULT_MAX_COST,
};
use replaylab_core::domain::{
    AssetIdentifier, Candle, ExchangeList, Indicator, INTERVAL_1D, INTERVAL_1H,
};
use replaylab_core::indicators::ema_of_series;
use replaylab_core::memory::{MemoryCell, Parameters};
use replaylab_core::results::{Event, ResultHandler, ScenarioResultSet};
use replaylab_core::supplier::DataSupplier;
use replaylab_runner::demos::{EmaCross, Linked, RollingHigh};
use replaylab_runner::{Algorithm, ConfigError, EvalOptions, Evaluator, RunError, RunGate, RunState};

// ── Helpers ──────────────────────────────────────────────────────────

fn spy() -> AssetIdentifier {
    AssetIdentifier::new("UNICORN", "US", "SPY")
}

fn candle(time: i64, close: f64) -> Candle {
    Candle {
        time,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000.0,
        missing: false,
    }
}

fn market(src: &Arc<MemorySource>) -> Arc<MarketData> {
    let source: Arc<dyn MarketSource> = src.clone();
    Arc::new(MarketData::new(
        source,
        DEFAULT_MAX_COST,
        CacheMode::Historical,
    ))
}

fn options(symbols: &[AssetIdentifier], resolution: i64, until: i64) -> EvalOptions {
    EvalOptions {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        resolution,
        until: Some(until),
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Emits one event per step labelled with the running step count.
struct StepCounter;

impl Algorithm for StepCounter {
    type State = u64;

    fn name(&self) -> &str {
        "step-counter"
    }

    fn step(
        &self,
        _chart: &DataSupplier<'_>,
        events: &mut ResultHandler<'_>,
        memory: &mut MemoryCell<u64>,
        _params: &Parameters,
    ) -> Result<(), DataError> {
        let count = memory.get_or_default();
        *count += 1;
        events.new_event(count.to_string());
        Ok(())
    }
}

// ── Determinism ──────────────────────────────────────────────────────

#[test]
fn bdd_single_worker_runs_are_byte_identical() {
    // GIVEN synthetic daily data for two symbols
    let symbols = [spy(), AssetIdentifier::new("UNICORN", "US", "QQQ")];
    let src = Arc::new(MemorySource::synthetic(&symbols, INTERVAL_1D, 0, 400 * INTERVAL_1D));
    let scenarios = vec![vec![5.0, 20.0], vec![10.0, 50.0]];

    // WHEN the same EMA crossover run is executed twice with one worker
    let run = || {
        let mut ev = Evaluator::new(
            EmaCross,
            market(&src),
            options(&symbols, INTERVAL_1D, 400 * INTERVAL_1D),
        );
        ev.set_max_threads(1);
        ev.run(&scenarios, &keys(&["fast", "slow"])).unwrap()
    };
    let first = run();
    let second = run();

    // THEN both result trees serialize to the same bytes
    assert_eq!(
        serde_json::to_string(&*first).unwrap(),
        serde_json::to_string(&*second).unwrap()
    );
    assert!(first.event_count() > 0, "random walk should cross at least once");
}

#[test]
fn bdd_worker_count_does_not_change_results() {
    // GIVEN synthetic data for three symbols
    let symbols = [
        spy(),
        AssetIdentifier::new("UNICORN", "US", "QQQ"),
        AssetIdentifier::new("KRAKEN", "CRYPTO", "BTCUSD"),
    ];
    let src = Arc::new(MemorySource::synthetic(&symbols, INTERVAL_1D, 0, 300 * INTERVAL_1D));

    // WHEN the run is executed with one worker and with four
    let digest = |threads: usize| {
        let mut ev = Evaluator::new(
            EmaCross,
            market(&src),
            options(&symbols, INTERVAL_1D, 300 * INTERVAL_1D),
        );
        ev.set_max_threads(threads);
        ev.run(&[vec![3.0, 12.0]], &keys(&["fast", "slow"]))
            .unwrap()
            .digest()
    };

    // THEN the digests match
    assert_eq!(digest(1), digest(4));
}

// ── Memory continuity ────────────────────────────────────────────────

#[test]
fn bdd_missing_candles_do_not_reset_memory() {
    // GIVEN daily candles with a five day gap in the middle
    let candles = (0..10)
        .chain(15..25)
        .map(|d| candle(d * INTERVAL_1D, 100.0 + d as f64));
    let src = Arc::new(MemorySource::new().with_candles(spy(), INTERVAL_1D, candles));

    // WHEN a step counter is replayed over the window
    let mut ev = Evaluator::new(StepCounter, market(&src), options(&[spy()], INTERVAL_1D, 24 * INTERVAL_1D));
    ev.set_max_threads(1);
    let results = ev.run(&[vec![]], &[]).unwrap();

    // THEN the count continues across the gap
    let events = &results.symbols["UNICORN:US:SPY"].scenarios[0].events;
    let labels: Vec<_> = events.iter().map(|e| e.label.clone()).collect();
    let expected: Vec<_> = (1..=20).map(|n: i32| n.to_string()).collect();
    assert_eq!(labels, expected);

    // AND no step ran inside the gap
    assert!(events
        .iter()
        .all(|e| e.created_on < 10 * INTERVAL_1D || e.created_on >= 15 * INTERVAL_1D));
}

// ── EMA crossover ────────────────────────────────────────────────────

#[test]
fn bdd_ema_crossover_emits_single_transition() {
    // GIVEN 60 days of decline followed by 60 days of steep rise
    let closes: Vec<f64> = (0..120)
        .map(|d| {
            if d < 60 {
                100.0 - 0.5 * d as f64
            } else {
                70.0 + 2.0 * (d - 60) as f64
            }
        })
        .collect();
    let candles = closes
        .iter()
        .enumerate()
        .map(|(d, &c)| candle(d as i64 * INTERVAL_1D, c));
    let src = Arc::new(MemorySource::new().with_candles(spy(), INTERVAL_1D, candles));

    // AND the day the 5-day EMA first stops being below the 20-day EMA
    let fast = ema_of_series(&closes, 5);
    let slow = ema_of_series(&closes, 20);
    let cross = (19..closes.len())
        .find(|&d| slow[d] <= fast[d])
        .expect("the rise must cross");
    assert!(cross > 60);
    assert!((cross..closes.len()).all(|d| slow[d] <= fast[d]));

    // WHEN EmaCross(5, 20) is replayed over the window
    let mut ev = Evaluator::new(EmaCross, market(&src), options(&[spy()], INTERVAL_1D, 119 * INTERVAL_1D));
    ev.set_max_threads(1);
    let results = ev.run(&[vec![5.0, 20.0]], &keys(&["fast", "slow"])).unwrap();

    // THEN exactly one uptrend event is emitted at the crossover day
    let events = &results.symbols["UNICORN:US:SPY"].scenarios[0].events;
    assert_eq!(events.len(), 1, "{events:?}");
    let event = &events[0];
    assert_eq!(event.created_on, cross as i64 * INTERVAL_1D);
    assert_eq!(event.label, "uptrend");
    assert_eq!(event.color, "green");
    assert_eq!(event.icon, "up");
    assert_eq!(event.price, closes[cross]);

    // AND the scenario carries its parameters
    assert_eq!(results.symbols["UNICORN:US:SPY"].scenarios[0].parameters, vec![5.0, 20.0]);
}

// ── Validation ───────────────────────────────────────────────────────

#[test]
fn bdd_short_parameter_vector_fails_before_any_fetch() {
    // GIVEN a source that counts every upstream call
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 100 * INTERVAL_1D));
    let ev = Evaluator::new(EmaCross, market(&src), options(&[spy()], INTERVAL_1D, 100 * INTERVAL_1D));

    // WHEN a scenario has fewer values than there are keys
    let err = ev
        .run(&[vec![5.0, 20.0], vec![5.0]], &keys(&["fast", "slow"]))
        .unwrap_err();

    // THEN the run is rejected as a configuration error
    assert!(matches!(
        err,
        RunError::Config(ConfigError::Parameters { index: 1, .. })
    ));

    // AND nothing was fetched and the evaluator is still idle
    assert_eq!(src.total_fetches(), 0);
    assert_eq!(src.exchange_fetches(), 0);
    assert_eq!(ev.state(), RunState::Idle);
}

// ── Failures ─────────────────────────────────────────────────────────

#[test]
fn bdd_data_failure_fails_the_run_without_results() {
    // GIVEN a candle service that is down
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 100 * INTERVAL_1D));
    src.fail_requests(
        RequestKind::Candles,
        DataError::Network {
            url: "market/t/UNICORN:US:SPY".into(),
            reason: "connection refused".into(),
        },
    );
    let ev = Evaluator::new(EmaCross, market(&src), options(&[spy()], INTERVAL_1D, 100 * INTERVAL_1D));

    // WHEN the run executes
    let err = ev.run(&[vec![5.0, 20.0]], &keys(&["fast", "slow"])).unwrap_err();

    // THEN the data error surfaces at the run boundary
    assert!(matches!(err, RunError::Data(DataError::Network { .. })));

    // AND the metrics report the failure and no results are published
    assert_eq!(ev.state(), RunState::Failed);
    let metrics = ev.metrics();
    assert!(!metrics.running && !metrics.finished);
    assert!(metrics.failed.unwrap().contains("connection refused"));
    assert!(ev.results().is_none());
}

#[test]
fn bdd_unlisted_symbol_fails_with_unknown_asset() {
    // GIVEN a source that only lists SPY
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 10 * INTERVAL_1D));
    let other = AssetIdentifier::new("UNICORN", "US", "DIA");
    let ev = Evaluator::new(StepCounter, market(&src), options(&[other], INTERVAL_1D, 10 * INTERVAL_1D));

    // WHEN a run asks for another symbol
    let err = ev.run(&[vec![]], &[]).unwrap_err();

    // THEN the broker lookup fails
    assert_eq!(
        err.to_string(),
        "data error: could not find broker for asset: UNICORN:US:DIA"
    );
}

/// Serves candles as-is but cuts every indicator series down to one slot.
struct TruncatingSource(MemorySource);

impl MarketSource for TruncatingSource {
    fn name(&self) -> &str {
        "truncating"
    }

    fn fetch(&self, request: &Request) -> Result<Option<Payload>, DataError> {
        Ok(match self.0.fetch(request)? {
            Some(Payload::Indicator(indicator)) => {
                let mut short = Indicator::clone(&indicator);
                for series in short.series.values_mut() {
                    series.values.truncate(1);
                }
                Some(Payload::Indicator(Arc::new(short)))
            }
            other => other,
        })
    }

    fn exchange_info(&self) -> Result<ExchangeList, DataError> {
        self.0.exchange_info()
    }
}

#[test]
fn bdd_truncated_indicator_fails_the_run() {
    // GIVEN a source whose indicator series hold a single slot
    let inner = MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 100 * INTERVAL_1D);
    let source: Arc<dyn MarketSource> = Arc::new(TruncatingSource(inner));
    let market = Arc::new(MarketData::new(source, DEFAULT_MAX_COST, CacheMode::Historical));
    let mut ev = Evaluator::new(EmaCross, market, options(&[spy()], INTERVAL_1D, 99 * INTERVAL_1D));
    ev.set_max_threads(1);

    // WHEN an EMA crossover reads past the first slot
    let err = ev.run(&[vec![5.0, 20.0]], &keys(&["fast", "slow"])).unwrap_err();

    // THEN the run fails with a decode error instead of panicking
    assert!(matches!(err, RunError::Data(DataError::Decode { .. })), "{err}");
    assert_eq!(ev.state(), RunState::Failed);
    assert!(ev.results().is_none());
}

/// Panics on its first step after being armed.
struct Tripwire {
    armed: AtomicBool,
}

impl Algorithm for Tripwire {
    type State = ();

    fn name(&self) -> &str {
        "tripwire"
    }

    fn step(
        &self,
        _chart: &DataSupplier<'_>,
        _events: &mut ResultHandler<'_>,
        _memory: &mut MemoryCell<()>,
        _params: &Parameters,
    ) -> Result<(), DataError> {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("tripwire");
        }
        Ok(())
    }
}

#[test]
fn bdd_panicking_algorithm_fails_the_run_and_allows_another() {
    // GIVEN an algorithm that panics once
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 10 * INTERVAL_1D));
    let algorithm = Tripwire {
        armed: AtomicBool::new(true),
    };
    let mut ev = Evaluator::new(algorithm, market(&src), options(&[spy()], INTERVAL_1D, 9 * INTERVAL_1D));
    ev.set_max_threads(1);

    // WHEN the run panics
    let outcome = catch_unwind(AssertUnwindSafe(|| ev.run(&[vec![]], &[])));
    assert!(outcome.is_err());

    // THEN the run is reported failed, not running
    assert_eq!(ev.state(), RunState::Failed);
    let metrics = ev.metrics();
    assert!(!metrics.running);
    assert!(metrics.failed.unwrap().contains("panicked"));

    // AND the next run is accepted and finishes
    assert!(ev.run(&[vec![]], &[]).is_ok());
    assert_eq!(ev.state(), RunState::Finished);
}

// ── Run exclusivity ──────────────────────────────────────────────────

#[test]
fn bdd_second_run_while_running_is_refused() {
    // GIVEN a slow source
    let src = Arc::new(
        MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 50 * INTERVAL_1D)
            .with_latency(Duration::from_millis(200)),
    );
    let ev = Evaluator::new(EmaCross, market(&src), options(&[spy()], INTERVAL_1D, 50 * INTERVAL_1D));
    let scenarios = vec![vec![5.0, 20.0]];
    let keys = keys(&["fast", "slow"]);

    std::thread::scope(|s| {
        // WHEN a run is in progress
        let first = s.spawn(|| ev.run(&scenarios, &keys));
        while ev.state() != RunState::Running {
            std::thread::sleep(Duration::from_millis(1));
        }

        // THEN a second run is refused
        assert!(matches!(
            ev.run(&scenarios, &keys),
            Err(RunError::AlreadyRunning)
        ));
        assert!(ev.metrics().running);

        // AND the first run still completes
        assert!(first.join().unwrap().is_ok());
    });
    assert_eq!(ev.state(), RunState::Finished);
}

#[test]
fn bdd_terminated_gate_refuses_runs() {
    // GIVEN an engine whose gate was terminated
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, 10 * INTERVAL_1D));
    let gate = Arc::new(RunGate::new());
    let ev = Evaluator::new(StepCounter, market(&src), options(&[spy()], INTERVAL_1D, 10 * INTERVAL_1D))
        .with_gate(Arc::clone(&gate));
    gate.terminate();

    // WHEN a run is requested
    let err = ev.run(&[vec![]], &[]).unwrap_err();

    // THEN it is refused and nothing is fetched
    assert!(matches!(err, RunError::ShuttingDown));
    assert_eq!(src.total_fetches(), 0);
    assert_eq!(gate.active(), 0);
}

// ── Progress ─────────────────────────────────────────────────────────

#[test]
fn bdd_progress_counts_blocks() {
    // GIVEN 300 days of hourly data, which spans two blocks
    let src = Arc::new(MemorySource::synthetic(&[spy()], INTERVAL_1H, 0, 300 * INTERVAL_1D));
    let mut ev = Evaluator::new(
        RollingHigh,
        market(&src),
        options(&[spy()], INTERVAL_1H, 300 * INTERVAL_1D - INTERVAL_1H),
    );
    ev.set_max_threads(2);

    // WHEN the run completes
    let results = ev.run(&[vec![24.0]], &keys(&["historySize"])).unwrap();

    // THEN every block was counted
    let metrics = ev.metrics();
    assert_eq!(metrics.total_blocks, 2);
    assert_eq!(metrics.completed_blocks, 2);
    assert_eq!(metrics.progress, Some(100.0));
    assert!(metrics.finished);
    assert!(metrics.elapsed >= 0.0);

    // AND the rolling high fired at least once
    assert!(results.event_count() > 0);
}

#[test]
fn bdd_progress_never_moves_backwards() {
    // GIVEN two symbols behind a slow source, replayed one after the other
    let symbols = [spy(), AssetIdentifier::new("UNICORN", "US", "QQQ")];
    let src = Arc::new(
        MemorySource::synthetic(&symbols, INTERVAL_1D, 0, 100 * INTERVAL_1D)
            .with_latency(Duration::from_millis(30)),
    );
    let mut ev = Evaluator::new(StepCounter, market(&src), options(&symbols, INTERVAL_1D, 99 * INTERVAL_1D));
    ev.set_max_threads(1);

    // WHEN progress is sampled for the whole run
    let samples = std::thread::scope(|s| {
        let run = s.spawn(|| ev.run(&[vec![]], &[]));
        let mut samples = Vec::new();
        while !run.is_finished() {
            let m = ev.metrics();
            samples.push((m.total_blocks, m.completed_blocks, m.progress));
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(run.join().unwrap().is_ok());
        samples
    });

    // THEN the total is known before any block completes
    for &(total, completed, _) in &samples {
        assert!(completed == 0 || total == 2, "total {total} after {completed} blocks");
    }

    // AND the percentage never decreases
    let percents: Vec<f64> = samples.iter().filter_map(|&(_, _, p)| p).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    assert_eq!(ev.metrics().progress, Some(100.0));
}

// ── Composition ──────────────────────────────────────────────────────

#[test]
fn bdd_linked_algorithm_echoes_upstream_events() {
    // GIVEN an upstream result set with events on days 3 and 7
    let upstream_event = |day: i64, label: &str| Event {
        created_on: day * INTERVAL_1D,
        time: (day - 1) * INTERVAL_1D,
        price: day as f64,
        label: label.into(),
        icon: "peak".into(),
        color: "orange".into(),
        annotations: None,
    };
    let mut upstream = ScenarioResultSet::new(vec![7.0]);
    upstream.events = vec![upstream_event(3, "high"), upstream_event(7, "low")];

    let candles = (0..10).map(|d| candle(d * INTERVAL_1D, 50.0));
    let src = Arc::new(
        MemorySource::new()
            .with_candles(spy(), INTERVAL_1D, candles)
            .with_algorithm(spy(), INTERVAL_1D, "highs-and-lows", upstream),
    );

    // WHEN the linked algorithm is replayed
    let ev = Evaluator::new(Linked, market(&src), options(&[spy()], INTERVAL_1D, 9 * INTERVAL_1D));
    let results = ev.run(&[vec![]], &[]).unwrap();

    // THEN each upstream event is re-emitted on the step it was created
    let events = &results.symbols["UNICORN:US:SPY"].scenarios[0].events;
    let seen: Vec<_> = events
        .iter()
        .map(|e| (e.created_on, e.time, e.label.as_str(), e.color.as_str()))
        .collect();
    assert_eq!(
        seen,
        vec![
            (3 * INTERVAL_1D, 2 * INTERVAL_1D, "high", "orange"),
            (7 * INTERVAL_1D, 6 * INTERVAL_1D, "low", "orange"),
        ]
    );

    // AND the upstream result set was fetched once for the whole run
    assert_eq!(src.fetches(RequestKind::Algorithm), 1);
}
