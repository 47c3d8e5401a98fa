//! Default configuration values, mirrored in `jobman_config`.

pub const JOB_EXPIRY_SECS: u64 = 400;
pub const ERROR_EXPIRY_SECS: u64 = 400;
pub const MAX_RETRIES: u32 = 50;
pub const RETRY_SLEEP_SECS: u64 = 5;
pub const CHECK_ERRORS_EVERY: u32 = 5;
pub const REDIS_ERROR_KEY_PREFIX: &str = "jobman/errors:";
pub const REDIS_JOB_KEY_PREFIX: &str = "jobman/jobs:";
