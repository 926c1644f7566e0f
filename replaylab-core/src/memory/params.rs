//! Named scenario parameters.

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("expected {expected} parameters but only got {got}")]
    TooFew { expected: usize, got: usize },
}

/// One scenario's parameter vector, looked up by key.
///
/// Keys are shared across every scenario of a run. Extra trailing values
/// without a key are allowed and ignored by name lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    values: Vec<f64>,
    keys: Arc<[String]>,
}

impl Parameters {
    pub fn new(values: Vec<f64>, keys: Arc<[String]>) -> Result<Self, ParameterError> {
        if values.len() < keys.len() {
            return Err(ParameterError::TooFew {
                expected: keys.len(),
                got: values.len(),
            });
        }
        Ok(Self { values, keys })
    }

    pub fn try_get(&self, key: &str) -> Option<f64> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.values[i])
    }

    /// Value for `key`. Asking for a key the algorithm never declared is a bug.
    pub fn get(&self, key: &str) -> f64 {
        match self.try_get(key) {
            Some(v) => v,
            None => panic!("parameter \"{key}\" does not exist"),
        }
    }

    /// Value for `key`, truncated toward zero.
    pub fn get_int(&self, key: &str) -> i64 {
        self.get(key) as i64
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn lookup_by_key() {
        let p = Parameters::new(vec![10.0, 50.5], keys(&["fast", "slow"])).unwrap();
        assert_eq!(p.get("fast"), 10.0);
        assert_eq!(p.get_int("slow"), 50);
        assert_eq!(p.try_get("missing"), None);
    }

    #[test]
    fn shorter_values_than_keys_is_rejected() {
        let err = Parameters::new(vec![1.0], keys(&["a", "b"])).unwrap_err();
        assert_eq!(err, ParameterError::TooFew { expected: 2, got: 1 });
    }

    #[test]
    fn extra_values_are_allowed() {
        let p = Parameters::new(vec![1.0, 2.0, 3.0], keys(&["a"])).unwrap();
        assert_eq!(p.values().len(), 3);
        assert_eq!(p.get("a"), 1.0);
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn unknown_key_panics() {
        let p = Parameters::new(vec![], keys(&[])).unwrap();
        p.get("historySize");
    }
}
