use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Watcher configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Player list endpoint of the game server query API
    /// Env: PLAYERS_URL (default: "http://localhost:3000/players")
    pub players_url: String,

    /// Time between polls
    /// Env: POLL_INTERVAL_MS (default: 1000)
    pub poll_interval: Duration,

    /// Timeout for one player list request
    /// Env: FETCH_TIMEOUT_SECS (default: 5)
    pub fetch_timeout: Duration,

    /// Timeout for delivering one notification
    /// Env: SEND_TIMEOUT_SECS (default: 10)
    pub send_timeout: Duration,

    /// How long an in-flight tick may run after shutdown is requested
    /// Env: SHUTDOWN_GRACE_SECS (default: 5)
    pub shutdown_grace: Duration,

    /// Database file path
    /// Env: DATABASE_PATH (default: "sewatch.db")
    pub database_path: String,

    /// Discord API Token
    /// Env: DISCORD_TOKEN (required by the bot binary)
    pub discord_token: Option<String>,

    /// Who to contact when the server goes down, named in the offline notice
    /// Env: ESCALATION_CONTACT (default: "the server administrator")
    pub escalation_contact: String,

    /// Server slot count shown in the bot status
    /// Env: MAX_PLAYERS (default: 16)
    pub max_players: u32,

    /// Status API port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Status API request timeout
    /// Env: REQUEST_TIMEOUT_SECS (default: 30)
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for debugging mostly
        let defaults = Self::default();
        Self {
            players_url: env_or_default_string("PLAYERS_URL", &defaults.players_url),
            poll_interval: Duration::from_millis(env_or_default("POLL_INTERVAL_MS", 1000u64).max(1)),
            fetch_timeout: Duration::from_secs(env_or_default("FETCH_TIMEOUT_SECS", 5)),
            send_timeout: Duration::from_secs(env_or_default("SEND_TIMEOUT_SECS", 10)),
            shutdown_grace: Duration::from_secs(env_or_default("SHUTDOWN_GRACE_SECS", 5)),
            database_path: env_or_default_string("DATABASE_PATH", &defaults.database_path),
            discord_token: var("DISCORD_TOKEN").ok(),
            escalation_contact: env_or_default_string(
                "ESCALATION_CONTACT",
                &defaults.escalation_contact,
            ),
            max_players: env_or_default("MAX_PLAYERS", defaults.max_players),
            port: env_or_default("PORT", defaults.port),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 30)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            players_url: "http://localhost:3000/players".to_string(),
            poll_interval: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
            database_path: "sewatch.db".to_string(),
            discord_token: None,
            escalation_contact: "the server administrator".to_string(),
            max_players: 16,
            port: 3000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.players_url, "http://localhost:3000/players");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.send_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.database_path, "sewatch.db");
        assert_eq!(config.discord_token, None);
        assert_eq!(config.max_players, 16);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_env_falls_back_when_unset() {
        assert_eq!(env_or_default("SEWATCH_TEST_UNSET_VAR", 7u32), 7);
        assert_eq!(
            env_or_default_string("SEWATCH_TEST_UNSET_VAR", "fallback"),
            "fallback"
        );
    }
}
