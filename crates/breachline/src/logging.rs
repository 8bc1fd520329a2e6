//! Logging initialization.
//!
//! Human-readable or JSON lines on stderr, filtered by `BREACHLINE_LOG`
//! when set and by the configured level otherwise.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "BREACHLINE_LOG";

/// Environment variable selecting the [`LogFormat`].
pub const LOG_FORMAT_ENV: &str = "BREACHLINE_LOG_FORMAT";

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// Newline-delimited JSON for log shippers.
    Json,
}

impl LogFormat {
    /// Parses an optional setting, falling back to the default.
    ///
    /// Usable before a subscriber exists, so a bad value stays silent here
    /// and is reported later by config loading.
    pub fn from_setting(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }

    /// Reads [`LOG_FORMAT_ENV`].
    pub fn from_env() -> Self {
        Self::from_setting(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" | "pretty" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => f.write_str("human"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Installs the global tracing subscriber.
///
/// `default_directive` (e.g. `"info"` or `"breachline=debug,info"`) applies
/// unless [`LOG_ENV`] is set. Uses `try_init`, so a second call is a no-op.
pub fn init_logging(format: LogFormat, default_directive: &str) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive));

    let result = match format {
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if result.is_ok() {
        tracing::debug!(%format, "logging initialized");
    }
}
