use super::queue::TokenQueue;
use std::time::{Duration, Instant};

pub const TYPING_BATCH_SIZE: usize = 3;

const SHORT_DELAY: Duration = Duration::from_millis(20);
const MEDIUM_DELAY: Duration = Duration::from_millis(70);
const LONG_DELAY: Duration = Duration::from_millis(150);

/// Samples the inter-append delay: mostly quick bursts, occasionally a
/// longer pause, which reads as human typing rather than a metronome.
pub fn sample_typing_delay() -> Duration {
    let roll: f64 = rand::random();
    if roll < 0.40 {
        SHORT_DELAY
    } else if roll < 0.85 {
        MEDIUM_DELAY
    } else {
        LONG_DELAY
    }
}

/// Drains small batches from the token queue on a randomized cadence.
///
/// `poll` is called once per animation tick; it appends nothing until the
/// sampled delay has elapsed since the last qualifying tick. Ticks are a
/// UI nicety, not a correctness path: a delayed tick delays tokens but
/// never drops or reorders them.
pub struct TypingAnimator {
    last_append: Instant,
    next_delay: Duration,
    batch_size: usize,
    sampler: fn() -> Duration,
}

impl TypingAnimator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            last_append: Instant::now(),
            // Zero so the first tick after a send fires immediately.
            next_delay: Duration::ZERO,
            batch_size: batch_size.max(1),
            sampler: sample_typing_delay,
        }
    }

    #[cfg(test)]
    pub fn with_sampler(batch_size: usize, sampler: fn() -> Duration) -> Self {
        let mut animator = Self::new(batch_size);
        animator.sampler = sampler;
        animator
    }

    /// Restarts the cadence for a fresh send.
    pub fn reset(&mut self, now: Instant) {
        self.last_append = now;
        self.next_delay = Duration::ZERO;
    }

    /// Returns the concatenated batch to append, if this tick qualifies
    /// and the queue had anything buffered.
    pub fn poll(&mut self, now: Instant, queue: &mut TokenQueue) -> Option<String> {
        if now.duration_since(self.last_append) < self.next_delay {
            return None;
        }

        self.last_append = now;
        self.next_delay = (self.sampler)();

        let batch = queue.drain(self.batch_size);
        if batch.is_empty() {
            None
        } else {
            Some(batch.concat())
        }
    }
}
