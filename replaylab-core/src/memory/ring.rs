//! Fixed-capacity ring buffer for rolling windows of past values.

/// Holds the last `size()` pushed items.
///
/// `at(0)` is the oldest retained slot and `at(size() - 1)` is always the most
/// recently pushed item. Slots not yet written read as `None`.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    next: usize,
    filled: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "ring buffer capacity must be >= 1");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            next: 0,
            filled: 0,
        }
    }

    /// Store `item` as the newest entry, overwriting the oldest when full.
    pub fn push(&mut self, item: T) {
        self.slots[self.next] = Some(item);
        self.next = (self.next + 1) % self.slots.len();
        self.filled = (self.filled + 1).min(self.slots.len());
    }

    /// The `index`-th oldest slot.
    pub fn at(&self, index: usize) -> Option<&T> {
        assert!(
            index < self.slots.len(),
            "ring buffer index {index} out of range for size {}",
            self.slots.len()
        );
        self.slots[(self.next + index) % self.slots.len()].as_ref()
    }

    /// Fixed capacity, not the fill count.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots written so far (saturates at capacity).
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.slots.len()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.next = 0;
        self.filled = 0;
    }

    /// Retained items from oldest to newest, skipping unfilled slots.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.slots.len()).filter_map(move |i| self.at(i))
    }
}
