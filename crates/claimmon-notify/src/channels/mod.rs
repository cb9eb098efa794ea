pub mod console;
pub mod email;
pub mod sms;
pub mod webhook;

/// Delay before retry `attempt` (0-based): 100ms, 200ms, 400ms, ...
pub(crate) fn backoff(attempt: u32) -> std::time::Duration {
    std::time::Duration::from_millis(100 * 2u64.pow(attempt))
}
