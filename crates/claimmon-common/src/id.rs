use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Initialise the process-wide snowflake generator.
///
/// `machine_id` and `node_id` are both in `0..=31`. Calling this is
/// optional; [`next_id`] lazily falls back to `(1, 1)`.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Generate a new unique id (decimal string form of a snowflake).
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

/// Alert ids carry an `alert_` prefix so they are recognisable in logs and
/// webhook payloads.
pub fn next_alert_id() -> String {
    format!("alert_{}", next_id())
}
