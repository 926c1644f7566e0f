//! Queries over another algorithm's events, windowed to the current step.
//!
//! The step window is `(step_start, step_end]` with `step_end` the current
//! slot time and `step_start = step_end - resolution`. Events are assumed to be
//! in ascending `created_on` order, which lets every scan stop early.

use std::sync::Arc;

use crate::results::{Event, ScenarioResultSet};

pub struct AlgorithmSupplier {
    result: Arc<ScenarioResultSet>,
    step_start: i64,
    step_end: i64,
}

impl AlgorithmSupplier {
    pub fn new(result: Arc<ScenarioResultSet>, time: i64, resolution: i64) -> Self {
        Self {
            result,
            step_start: time - resolution,
            step_end: time,
        }
    }

    /// True if any event was created within the current step.
    pub fn has_events(&self) -> bool {
        for event in &self.result.events {
            if event.created_on > self.step_end {
                return false;
            }
            if event.created_on > self.step_start {
                return true;
            }
        }
        false
    }

    /// Events created within the current step.
    pub fn current_events(&self) -> Vec<&Event> {
        self.result
            .events
            .iter()
            .skip_while(|e| e.created_on <= self.step_start)
            .take_while(|e| e.created_on <= self.step_end)
            .collect()
    }

    /// Events created before the current step.
    pub fn past_events(&self) -> Vec<&Event> {
        self.result
            .events
            .iter()
            .take_while(|e| e.created_on <= self.step_start)
            .collect()
    }

    pub fn result_set(&self) -> &ScenarioResultSet {
        &self.result
    }
}
