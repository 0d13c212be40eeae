pub mod queue;
pub mod session;
pub mod typing;

pub use queue::TokenQueue;
pub use session::{Invalidation, Phase, Session};
pub use typing::{TypingAnimator, TYPING_BATCH_SIZE};

#[cfg(test)]
mod tests;
