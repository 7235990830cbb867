//! Crate-wide constants.

/// Environment entry injected into `extra_envs` when a replica is created
/// with `need_restore = true`; propagated to the application engine at open.
pub const FORCE_RESTORE_ENV: &str = "force_restore";

/// File name under the replica directory holding the serialized `AppInfo`.
pub const APP_INFO_FILE: &str = ".app-info";

/// Decree value meaning "not assigned yet".
pub const INVALID_DECREE: i64 = -1;

/// Private log offset value meaning "not logged yet".
pub const INVALID_OFFSET: i64 = -1;

/// How often the checkpoint timer task wakes up to compare the clock against
/// the randomized trigger point.
pub const CHECKPOINT_TIMER_TICK_MS: u64 = 1000;
