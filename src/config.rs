use std::time::Duration;

/// Forum API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Maximum number of entries kept in the global chat history, and the
    /// number of backfill entries pushed to a newly connected client.
    pub history_limit: usize,
    /// Maximum age of a global chat history entry before the sweeper evicts it.
    pub message_ttl: Duration,
    /// How often the expiry sweeper runs.
    pub sweep_interval: Duration,
    /// Per-connection deadline for a single broadcast delivery. A connection
    /// that cannot accept a frame within this window is dropped.
    pub write_deadline: Duration,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8080),
            history_limit: env_parse("GLOBAL_HISTORY_LIMIT", 100),
            message_ttl: Duration::from_secs(env_parse("GLOBAL_MESSAGE_TTL_SECS", 60)),
            sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", 10)),
            write_deadline: Duration::from_millis(env_parse("WS_WRITE_DEADLINE_MS", 5000)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            history_limit: 100,
            message_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
            write_deadline: Duration::from_millis(5000),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
