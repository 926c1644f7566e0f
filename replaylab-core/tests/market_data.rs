//! Integration tests for the market-data layer: coalescing, caching, stores.

use std::sync::{Arc, Barrier};
use std::time::Duration;

use replaylab_core::data::{
    CacheMode, DataError, MarketData, MemorySource, Provider, RequestKind, DEFAULT_MAX_COST,
    LIVE_TTL, PAYLOAD_COST,
};
use replaylab_core::domain::{block_start, AssetIdentifier, INTERVAL_1D};

fn spy() -> AssetIdentifier {
    AssetIdentifier::new("UNICORN", "US", "SPY")
}

fn synthetic(days: i64) -> MemorySource {
    MemorySource::synthetic(&[spy()], INTERVAL_1D, 0, days * INTERVAL_1D)
}

#[test]
fn concurrent_identical_requests_reach_upstream_once() {
    // GIVEN a slow upstream and a cold cache
    let src = Arc::new(synthetic(100).with_latency(Duration::from_millis(150)));
    let market = Arc::new(MarketData::new(
        src.clone(),
        DEFAULT_MAX_COST,
        CacheMode::Historical,
    ));
    let barrier = Barrier::new(16);

    // WHEN 16 threads ask for the same candle set at the same moment
    let got: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // THEN exactly one upstream call was made and everyone got the data
    assert_eq!(src.fetches(RequestKind::Candles), 1);
    assert!(got.iter().all(|r| matches!(r, Ok(Some(_)))));
}

#[test]
fn concurrent_absent_lookups_reach_upstream_once() {
    // GIVEN a slow upstream that knows no indicator called "nope"
    let src = Arc::new(synthetic(100).with_latency(Duration::from_millis(150)));
    let market = MarketData::new(src.clone(), DEFAULT_MAX_COST, CacheMode::Historical);
    let barrier = Barrier::new(16);

    // WHEN 16 threads look it up at the same moment
    let got: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    market.indicator(&spy(), INTERVAL_1D, 0, INTERVAL_1D, "nope", &[1])
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // THEN everyone sees the absence and upstream was asked once
    assert!(got.iter().all(|r| matches!(r, Ok(None))));
    assert_eq!(src.fetches(RequestKind::Indicator), 1);

    // AND the absence stays cached
    assert!(market
        .indicator(&spy(), INTERVAL_1D, 0, INTERVAL_1D, "nope", &[1])
        .unwrap()
        .is_none());
    assert_eq!(src.fetches(RequestKind::Indicator), 1);
}

#[test]
fn concurrent_store_lookups_share_one_indicator() {
    // GIVEN one block store over a slow upstream
    let src = Arc::new(synthetic(100).with_latency(Duration::from_millis(100)));
    let market = Arc::new(MarketData::new(
        src.clone(),
        DEFAULT_MAX_COST,
        CacheMode::Historical,
    ));
    let store = Provider::new(market, spy(), INTERVAL_1D).data_store(0);
    let barrier = Barrier::new(16);

    // WHEN 16 threads ask the store for the same indicator
    let got: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    store.indicator("ema", INTERVAL_1D, &[10]).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // THEN it was fetched once and memoized once
    assert_eq!(src.fetches(RequestKind::Indicator), 1);
    assert_eq!(store.indicator_count(), 1);

    // AND every caller holds the same value
    assert!(got.iter().all(|i| Arc::ptr_eq(i, &got[0])));
}

#[test]
fn concurrent_failures_are_shared_and_not_cached() {
    // GIVEN a slow, failing upstream
    let src = Arc::new(synthetic(10).with_latency(Duration::from_millis(100)));
    src.fail_requests(
        RequestKind::Candles,
        DataError::Status {
            url: "memory".into(),
            status: 502,
        },
    );
    let market = MarketData::new(src.clone(), DEFAULT_MAX_COST, CacheMode::Historical);
    let barrier = Barrier::new(4);

    // WHEN several callers coalesce onto the failing fetch
    let errors: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // THEN all of them see the same error
    assert!(errors
        .iter()
        .all(|r| matches!(r, Err(DataError::Status { status: 502, .. }))));
    assert_eq!(src.fetches(RequestKind::Candles), 1);

    // AND a later call retries upstream
    src.clear_failures();
    assert!(market
        .candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D)
        .unwrap()
        .is_some());
    assert_eq!(src.fetches(RequestKind::Candles), 2);
}

#[test]
fn live_mode_refetches_after_ttl() {
    // GIVEN a live-mode context with a cached candle set
    let src = Arc::new(synthetic(10));
    let market = MarketData::new(src.clone(), DEFAULT_MAX_COST, CacheMode::Live);
    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D).unwrap();
    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D).unwrap();
    assert_eq!(src.fetches(RequestKind::Candles), 1);

    // WHEN the TTL elapses
    std::thread::sleep(LIVE_TTL + Duration::from_millis(100));

    // THEN the next lookup goes upstream again
    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D).unwrap();
    assert_eq!(src.fetches(RequestKind::Candles), 2);
}

#[test]
fn cache_stays_within_budget_over_many_blocks() {
    // GIVEN a budget for three payloads
    let src = Arc::new(synthetic(10));
    let market = MarketData::new(src.clone(), 3 * PAYLOAD_COST, CacheMode::Historical);

    // WHEN ten distinct blocks are fetched
    for block in 0..10 {
        market.candles(&spy(), INTERVAL_1D, block, INTERVAL_1D).unwrap();
        assert!(market.cache().cost() <= 3 * PAYLOAD_COST);
    }

    // THEN only the newest survive and the oldest must be refetched
    assert_eq!(market.cache().len(), 3);
    market.candles(&spy(), INTERVAL_1D, 9, INTERVAL_1D).unwrap();
    assert_eq!(src.fetches(RequestKind::Candles), 10);
    market.candles(&spy(), INTERVAL_1D, 0, INTERVAL_1D).unwrap();
    assert_eq!(src.fetches(RequestKind::Candles), 11);
}

#[test]
fn indicator_buckets_keep_parameter_sets_apart() {
    // GIVEN a block store over 200 days of candles
    let src = Arc::new(synthetic(200));
    let market = Arc::new(MarketData::new(
        src.clone(),
        DEFAULT_MAX_COST,
        CacheMode::Historical,
    ));
    let provider = Provider::new(market, spy(), INTERVAL_1D);
    let store = provider.data_store(0);

    // WHEN indicators sharing a primary parameter are requested
    let a = store.indicator("bb", INTERVAL_1D, &[20, 2]).unwrap();
    let b = store.indicator("bb", INTERVAL_1D, &[20, 3]).unwrap();
    let fast = store.indicator("ema", INTERVAL_1D, &[10]).unwrap();
    let slow = store.indicator("ema", INTERVAL_1D, &[50]).unwrap();

    // THEN each request gets its own parameter set back
    assert_eq!(a.meta.parameters, vec![20, 2]);
    assert_eq!(b.meta.parameters, vec![20, 3]);
    assert_eq!(fast.meta.parameters, vec![10]);
    assert_eq!(slow.meta.parameters, vec![50]);
    assert_ne!(fast.primary(), slow.primary());

    // AND repeated requests are answered from the store
    store.indicator("bb", INTERVAL_1D, &[20, 3]).unwrap();
    store.indicator("ema", INTERVAL_1D, &[10]).unwrap();
    assert_eq!(src.fetches(RequestKind::Indicator), 4);
    assert_eq!(store.indicator_count(), 4);
}

#[test]
fn provider_resolves_first_block_from_onboard_date() {
    // GIVEN a symbol whose data starts in block 2
    let start = block_start(2, INTERVAL_1D) + 3 * INTERVAL_1D;
    let src = MemorySource::synthetic(&[spy()], INTERVAL_1D, start, start + 30 * INTERVAL_1D);
    let market = Arc::new(MarketData::new(
        Arc::new(src),
        DEFAULT_MAX_COST,
        CacheMode::Historical,
    ));

    // WHEN the provider looks up exchange info
    let provider = Provider::new(market, spy(), INTERVAL_1D);
    let info = provider.info().unwrap();

    // THEN the replay starts at block 2
    assert_eq!(provider.first_block(&info), 2);
    assert_eq!(info.symbol, "UNICORN:US:SPY");
}
