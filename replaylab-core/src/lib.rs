//! ReplayLab Core — market data, memory primitives and results for replaying
//! algorithms over historical candles.
//!
//! This crate contains everything a replay step touches:
//! - Domain types (assets, candles, indicators, exchange metadata)
//! - Per-scenario memory (ring buffer, typed memory cell, named parameters)
//! - The result tree algorithms append events to
//! - The market-data layer: bounded-cost cache, request coalescing,
//!   upstream sources, block-scoped stores
//! - The per-step data supplier facade

pub mod data;
pub mod domain;
pub mod indicators;
pub mod memory;
pub mod results;
pub mod supplier;
