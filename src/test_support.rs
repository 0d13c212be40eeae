use tokio::sync::Mutex;

/// Serializes tests that mutate process environment variables.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());
