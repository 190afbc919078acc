/// Milliseconds since the Unix epoch. All session timestamps use this unit.
pub type Timestamp = u64;

/// Returns the current wall-clock time as a [`Timestamp`].
pub fn now_millis() -> Timestamp {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as Timestamp
}
