//! The result tree: ResultSet → SymbolResultSet → ScenarioResultSet → events.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ICON: &str = "event";
pub const DEFAULT_COLOR: &str = "blue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointAnnotation {
    pub time: i64,
    pub price: f64,
    pub icon: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A straight line between two (time, price) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentAnnotation {
    pub time_from: i64,
    pub time_end: i64,
    pub price_begin: f64,
    pub price_end: f64,
    pub style: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAnnotation {
    pub text: String,
    pub time: i64,
    pub price: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCollection {
    pub points: Vec<PointAnnotation>,
    #[serde(rename = "lines")]
    pub segments: Vec<SegmentAnnotation>,
    pub labels: Vec<LabelAnnotation>,
}

/// One event emitted by an algorithm step.
///
/// `created_on` is the step time at which the event was emitted; `time` is
/// where it is displayed and may be moved into the past by the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub created_on: i64,
    pub time: i64,
    pub price: f64,
    pub label: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub annotations: Option<AnnotationCollection>,
}

/// Events of one scenario, in non-decreasing `created_on` order, plus the
/// parameter vector that produced them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResultSet {
    pub events: Vec<Event>,
    pub parameters: Vec<f64>,
}

impl ScenarioResultSet {
    pub fn new(parameters: Vec<f64>) -> Self {
        Self {
            events: Vec::new(),
            parameters,
        }
    }
}

/// All scenarios of one symbol, in caller order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolResultSet {
    pub scenarios: Vec<ScenarioResultSet>,
}

/// The complete output of one run, keyed by canonical symbol.
///
/// An ordered map keeps serialization byte-identical across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub symbols: BTreeMap<String, SymbolResultSet>,
}

impl ResultSet {
    pub fn event_count(&self) -> usize {
        self.symbols
            .values()
            .flat_map(|s| s.scenarios.iter())
            .map(|s| s.events.len())
            .sum()
    }

    /// BLAKE3 hex digest of the canonical JSON form.
    ///
    /// Non-finite prices serialize as `null`, so every result set has a
    /// canonical form.
    pub fn digest(&self) -> String {
        let json = serde_json::to_vec(self).expect("ResultSet must serialize");
        blake3::hash(&json).to_hex().to_string()
    }
}
