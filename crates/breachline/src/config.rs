//! Server configuration.

use std::time::Duration;

use breachline_protocol::Uid;
use tracing::warn;

use crate::{LOG_FORMAT_ENV, LogFormat};

/// Settings for [`ServerBuilder`](crate::ServerBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send its `Handshake`.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is closed. Clients
    /// are expected to heartbeat well inside it.
    pub idle_timeout: Duration,

    /// Default `EnvFilter` directive, used when `BREACHLINE_LOG` is unset.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Users the reference binary creates profiles for at startup.
    pub seed_users: Vec<Uid>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            log_level: "info".to_string(),
            log_format: LogFormat::Human,
            seed_users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `BREACHLINE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BREACHLINE_BIND") {
            config.bind_addr = addr;
        }
        if let Some(raw) = lookup(LOG_FORMAT_ENV) {
            match raw.parse() {
                Ok(format) => config.log_format = format,
                Err(e) => warn!(error = %e, "ignoring BREACHLINE_LOG_FORMAT"),
            }
        }
        if let Some(raw) = lookup("BREACHLINE_IDLE_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.idle_timeout = Duration::from_secs(secs),
                Err(e) => warn!(error = %e, value = %raw, "ignoring BREACHLINE_IDLE_TIMEOUT_SECS"),
            }
        }
        if let Some(raw) = lookup("BREACHLINE_SEED_USERS") {
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                match Uid::new(name) {
                    Ok(uid) => config.seed_users.push(uid),
                    Err(e) => warn!(error = %e, "skipping seed user"),
                }
            }
        }

        config.validated()
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `handshake_timeout` at least 100ms.
    /// - `idle_timeout` no shorter than `handshake_timeout`.
    pub fn validated(mut self) -> Self {
        let min_handshake = Duration::from_millis(100);
        if self.handshake_timeout < min_handshake {
            warn!(
                timeout_ms = self.handshake_timeout.as_millis() as u64,
                "handshake_timeout too short, using 100ms"
            );
            self.handshake_timeout = min_handshake;
        }
        if self.idle_timeout < self.handshake_timeout {
            warn!("idle_timeout below handshake_timeout, raising it");
            self.idle_timeout = self.handshake_timeout;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_without_vars_is_default() {
        assert_eq!(ServerConfig::from_lookup(|_| None), ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_overlays_values() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BREACHLINE_BIND", "0.0.0.0:9000"),
            ("BREACHLINE_LOG_FORMAT", "json"),
            ("BREACHLINE_IDLE_TIMEOUT_SECS", "120"),
            ("BREACHLINE_SEED_USERS", "alice, bob,,"),
        ]));

        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        let seeded: Vec<&str> = config.seed_users.iter().map(Uid::as_str).collect();
        assert_eq!(seeded, ["alice", "bob"]);
    }

    #[test]
    fn test_from_lookup_ignores_bad_values() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BREACHLINE_LOG_FORMAT", "xml"),
            ("BREACHLINE_IDLE_TIMEOUT_SECS", "soon"),
            ("BREACHLINE_SEED_USERS", "ok,bad/uid"),
        ]));

        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.idle_timeout, ServerConfig::default().idle_timeout);
        assert_eq!(config.seed_users.len(), 1);
    }

    #[test]
    fn test_validated_raises_idle_timeout() {
        let config = ServerConfig {
            idle_timeout: Duration::ZERO,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(config.idle_timeout, config.handshake_timeout);
    }

    #[test]
    fn test_validated_clamps_handshake_timeout() {
        let config = ServerConfig {
            handshake_timeout: Duration::ZERO,
            ..ServerConfig::default()
        }
        .validated();
        assert_eq!(config.handshake_timeout, Duration::from_millis(100));
    }
}
