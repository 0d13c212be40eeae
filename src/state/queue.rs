use std::collections::VecDeque;

/// FIFO buffer between the stream reader and the typing animator.
///
/// Both sides run on the UI event loop, so there is no locking; each call
/// completes before the next begins. Unbounded on purpose: the producer is
/// network-rate-limited in practice.
#[derive(Debug, Default)]
pub struct TokenQueue {
    items: VecDeque<String>,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: String) {
        self.items.push_back(token);
    }

    /// Removes and returns up to `max` tokens in arrival order.
    pub fn drain(&mut self, max: usize) -> Vec<String> {
        let count = max.min(self.items.len());
        self.items.drain(..count).collect()
    }

    /// Discards everything not yet displayed. Accepted data loss for
    /// abandoned streams.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
