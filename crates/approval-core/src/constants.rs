/// Workflow configuration constants

/// Maximum attempts for each remote activity call before the run fails
/// Used for upload, review dispatch, rejection recording and finalization
pub const ACTIVITY_MAX_ATTEMPTS: u32 = 3;

/// Per-attempt timeout for activity calls (two minutes)
pub const ACTIVITY_TIMEOUT_SECS: u64 = 120;
