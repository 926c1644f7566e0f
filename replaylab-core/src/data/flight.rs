//! Request coalescing: at most one in-flight computation per key.
//!
//! The first caller for a key becomes the leader and runs the fetch; callers
//! arriving while it runs block on a condition variable and receive a clone of
//! the leader's outcome. The flight is forgotten as soon as it completes, so
//! a later caller starts afresh.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use super::lock;

enum CallState<V> {
    Pending,
    Done(V),
    /// The leader unwound without producing a value.
    Abandoned,
}

struct Call<V> {
    state: Mutex<CallState<V>>,
    done: Condvar,
}

impl<V> Call<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(CallState::Pending),
            done: Condvar::new(),
        }
    }
}

pub struct SingleFlight<V> {
    calls: Mutex<HashMap<String, Arc<Call<V>>>>,
}

impl<V: Clone> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> SingleFlight<V> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Run `fetch` for `key` unless another thread already is; in that case
    /// wait for and share its result.
    pub fn run(&self, key: &str, fetch: impl FnOnce() -> V) -> V {
        let mut fetch = Some(fetch);
        loop {
            let (call, leader) = {
                let mut calls = lock(&self.calls);
                match calls.get(key) {
                    Some(call) => (Arc::clone(call), false),
                    None => {
                        let call = Arc::new(Call::new());
                        calls.insert(key.to_string(), Arc::clone(&call));
                        (call, true)
                    }
                }
            };

            if leader {
                let mut guard = LeaderGuard {
                    flight: self,
                    key,
                    call,
                    completed: false,
                };
                // `fetch` is only taken by a leader, and a leader always returns.
                let Some(fetch) = fetch.take() else {
                    unreachable!("leader ran twice")
                };
                let value = fetch();
                guard.complete(value.clone());
                return value;
            }

            let mut state = lock(&call.state);
            while matches!(*state, CallState::Pending) {
                state = call
                    .done
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            match &*state {
                CallState::Done(value) => return value.clone(),
                // Leader panicked; try to lead ourselves.
                CallState::Abandoned => continue,
                CallState::Pending => unreachable!(),
            }
        }
    }

    /// Number of keys currently being fetched.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }

    fn forget(&self, key: &str, call: &Arc<Call<V>>) {
        let mut calls = lock(&self.calls);
        if calls.get(key).is_some_and(|c| Arc::ptr_eq(c, call)) {
            calls.remove(key);
        }
    }
}

/// Publishes the leader's outcome, or marks the call abandoned if the leader
/// unwinds first.
struct LeaderGuard<'a, V: Clone> {
    flight: &'a SingleFlight<V>,
    key: &'a str,
    call: Arc<Call<V>>,
    completed: bool,
}

impl<V: Clone> LeaderGuard<'_, V> {
    fn complete(&mut self, value: V) {
        self.finish(CallState::Done(value));
        self.completed = true;
    }

    fn finish(&self, outcome: CallState<V>) {
        self.flight.forget(self.key, &self.call);
        *lock(&self.call.state) = outcome;
        self.call.done.notify_all();
    }
}

impl<V: Clone> Drop for LeaderGuard<'_, V> {
    fn drop(&mut self) {
        if !self.completed {
            self.finish(CallState::Abandoned);
        }
    }
}
