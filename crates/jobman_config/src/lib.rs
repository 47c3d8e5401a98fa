//! Environment-variable driven configuration, matching spec.md section 6.
//!
//! Loaded with `clap`'s `env` derive feature, following the same
//! `clap::Parser` shape the teacher's `casparian` binary uses for its CLI,
//! here every field is env-backed rather than positional/flag-backed, since
//! jobman has no interactive CLI surface of its own.

use std::time::Duration;

use clap::Parser;
use jobman_protocol::defaults;

#[derive(Parser, Debug, Clone)]
#[command(name = "jobman", about = "Job-chain resolution and locking coordinator")]
pub struct Config {
    /// Redis lock store hostname.
    #[arg(long, env = "REDIS_HOST", default_value = "localhost")]
    pub redis_host: String,

    /// Redis lock store port.
    #[arg(long, env = "REDIS_PORT", default_value_t = 6379)]
    pub redis_port: u16,

    /// Redis logical database index.
    #[arg(long, env = "REDIS_DB", default_value_t = 0)]
    pub redis_db: u32,

    /// Key prefix for error flags in the lock store.
    #[arg(long, env = "REDIS_ERROR_KEY_PREFIX", default_value_t = defaults::REDIS_ERROR_KEY_PREFIX.to_string())]
    pub redis_error_key_prefix: String,

    /// Key prefix for job locks in the lock store.
    #[arg(long, env = "REDIS_JOB_KEY_PREFIX", default_value_t = defaults::REDIS_JOB_KEY_PREFIX.to_string())]
    pub redis_job_key_prefix: String,

    /// Base URL of the blob cache service.
    #[arg(long, env = "DATA_CACHE_URL")]
    pub data_cache_url: String,

    /// Base URL of the upstream router service.
    #[arg(long, env = "ROUTER_URL")]
    pub router_url: String,

    /// Maximum number of Phase B poll iterations before abandoning a wait.
    #[arg(long, env = "MAX_RETRIES", default_value_t = defaults::MAX_RETRIES)]
    pub max_retries: u32,

    /// Seconds to sleep between Phase B polls.
    #[arg(long, env = "RETRY_SLEEP", default_value_t = defaults::RETRY_SLEEP_SECS)]
    pub retry_sleep_secs: u64,

    /// Check the pending job's error flag every N Phase B iterations.
    #[arg(long, env = "CHECK_ERRORS_EVERY", default_value_t = defaults::CHECK_ERRORS_EVERY)]
    pub check_errors_every: u32,

    /// TTL, in seconds, for job lock records.
    #[arg(long, env = "JOB_EXPIRY", default_value_t = defaults::JOB_EXPIRY_SECS)]
    pub job_expiry_secs: u64,

    /// TTL, in seconds, for error flag records.
    #[arg(long, env = "ERROR_EXPIRY", default_value_t = defaults::ERROR_EXPIRY_SECS)]
    pub error_expiry_secs: u64,

    /// Tracing filter directive, e.g. "info" or "jobman=debug".
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Address the HTTP front door binds to.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,
}

impl Config {
    /// Parse configuration from the process environment (and, incidentally,
    /// argv, since clap's env derive supports both, but jobman is only ever
    /// invoked with environment variables set).
    pub fn from_env() -> Self {
        Self::parse()
    }

    pub fn retry_sleep(&self) -> Duration {
        Duration::from_secs(self.retry_sleep_secs)
    }

    pub fn job_expiry(&self) -> Duration {
        Duration::from_secs(self.job_expiry_secs)
    }

    pub fn error_expiry(&self) -> Duration {
        Duration::from_secs(self.error_expiry_secs)
    }

    pub fn redis_url(&self) -> String {
        format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::parse_from([
            "jobman",
            "--data-cache-url",
            "http://cache.local",
            "--router-url",
            "http://router.local",
        ]);
        assert_eq!(config.max_retries, 50);
        assert_eq!(config.retry_sleep_secs, 5);
        assert_eq!(config.check_errors_every, 5);
        assert_eq!(config.job_expiry_secs, 400);
        assert_eq!(config.error_expiry_secs, 400);
        assert_eq!(config.redis_job_key_prefix, "jobman/jobs:");
        assert_eq!(config.redis_error_key_prefix, "jobman/errors:");
    }

    #[test]
    fn builds_redis_url_from_host_port_db() {
        let config = Config::parse_from([
            "jobman",
            "--data-cache-url",
            "http://cache.local",
            "--router-url",
            "http://router.local",
            "--redis-host",
            "redis.internal",
            "--redis-port",
            "6380",
            "--redis-db",
            "2",
        ]);
        assert_eq!(config.redis_url(), "redis://redis.internal:6380/2");
    }
}
