//! Per-scenario state slot.

/// State owned by exactly one (symbol, scenario) pair for one run.
///
/// The engine creates one empty cell per scenario and hands it to every step;
/// it never inspects the contents. The algorithm decides the type `S`.
#[derive(Debug)]
pub struct MemoryCell<S> {
    slot: Option<S>,
}

impl<S> Default for MemoryCell<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MemoryCell<S> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn read(&self) -> Option<&S> {
        self.slot.as_ref()
    }

    pub fn read_mut(&mut self) -> Option<&mut S> {
        self.slot.as_mut()
    }

    pub fn store(&mut self, state: S) {
        self.slot = Some(state);
    }

    pub fn take(&mut self) -> Option<S> {
        self.slot.take()
    }

    /// Load the state, initializing it on the first step.
    pub fn get_or_insert_with(&mut self, init: impl FnOnce() -> S) -> &mut S {
        self.slot.get_or_insert_with(init)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl<S: Default> MemoryCell<S> {
    pub fn get_or_default(&mut self) -> &mut S {
        self.slot.get_or_insert_with(S::default)
    }
}
