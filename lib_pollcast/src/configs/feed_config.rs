use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Config file read when `--config-path` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "server_pollcast.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[clap(about = "Polls an upstream JSON feed and pushes changes to WebSocket clients", version)]
#[serde(rename_all = "camelCase")]
/// # Feed Config
///
/// One configuration layer. Every field is optional so layers can be merged;
/// `resolve` turns the merged result into a `ResolvedConfig`.
pub struct FeedConfig {
    /// Port for the WebSocket / health server.
    #[clap(long, env = "POLLCAST_PORT", help = "Port to listen on for client connections.")]
    pub port: Option<u16>,

    /// JSON config file to merge over the defaults.
    #[clap(long, env = "POLLCAST_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    /// Directory for log files.
    #[clap(long, env = "POLLCAST_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    /// Log level name.
    #[clap(long, env = "POLLCAST_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    /// Absolute URL of the upstream JSON document.
    #[clap(long, env = "POLLCAST_UPSTREAM_URL", help = "Upstream HTTP endpoint to poll.")]
    pub upstream_url: Option<String>,

    /// Milliseconds between poll cycle starts.
    #[clap(long, env = "POLLCAST_POLL_INTERVAL_MS", help = "Interval in milliseconds between upstream polls.")]
    pub poll_interval_ms: Option<u64>,

    /// Per-request timeout for the upstream fetch.
    #[clap(long, env = "POLLCAST_FETCH_TIMEOUT_MS", help = "Timeout in milliseconds for one upstream request.")]
    pub fetch_timeout_ms: Option<u64>,

    /// `User-Agent` header sent upstream.
    #[clap(long, env = "POLLCAST_USER_AGENT", help = "User-Agent header sent to the upstream.")]
    pub user_agent: Option<String>,
}

/// Fully populated, validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Listening port.
    pub port: u16,
    /// Upstream document URL.
    pub upstream_url: String,
    /// Poll period.
    pub poll_interval: Duration,
    /// Upstream request timeout.
    pub fetch_timeout: Duration,
    /// Log directory.
    pub log_dir: PathBuf,
    /// Log level name.
    pub log_level: String,
    /// Upstream `User-Agent`.
    pub user_agent: String,
    /// What happened to the file layer. Log it once logging is set up.
    pub source: ConfigSource,
}

/// Outcome of reading the JSON file layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No file layer was consulted.
    NoFile,
    /// The file was read and merged.
    File(PathBuf),
    /// The file does not exist; other layers were used.
    Missing(PathBuf),
    /// The file exists but could not be read or parsed; it was skipped.
    Skipped {
        /// The file that was skipped.
        path: PathBuf,
        /// Read or parse error.
        reason: String,
    },
}

impl ConfigSource {
    /// Logs the outcome at the matching level.
    pub fn log(&self) {
        match self {
            ConfigSource::NoFile => {}
            ConfigSource::File(path) => log::info!("Loaded config file {}.", path.display()),
            ConfigSource::Missing(path) => log::info!(
                "Config file not found at {}. Using defaults and environment/CLI variables.",
                path.display()
            ),
            ConfigSource::Skipped { path, reason } => log::warn!(
                "Ignoring config file {}: {}. Falling back to other sources.",
                path.display(),
                reason
            ),
        }
    }
}

/// Configuration values that cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An interval or timeout was configured as zero.
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    /// The upstream URL does not parse as an absolute URL.
    #[error("invalid upstream URL {url}: {reason}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The command line could not be parsed.
    #[error(transparent)]
    Cli(#[from] clap::Error),
}

impl FeedConfig {
    /// Built-in defaults: port 5001, a local upstream, 5 s polls with a 10 s timeout.
    pub fn defaults() -> Self {
        Self {
            port: Some(5001),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            upstream_url: Some("http://127.0.0.1:5000/api/teams".to_string()),
            poll_interval_ms: Some(5_000),
            fetch_timeout_ms: Some(10_000),
            user_agent: Some(format!("PollCast/{}", env!("CARGO_PKG_VERSION"))),
            ..Default::default()
        }
    }

    /// Merge two layers, where `other` overrides `self` for `Some` values.
    pub fn merge(self, other: FeedConfig) -> FeedConfig {
        FeedConfig {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            upstream_url: other.upstream_url.or(self.upstream_url),
            poll_interval_ms: other.poll_interval_ms.or(self.poll_interval_ms),
            fetch_timeout_ms: other.fetch_timeout_ms.or(self.fetch_timeout_ms),
            user_agent: other.user_agent.or(self.user_agent),
        }
    }

    /// Fills gaps from the defaults and validates the result.
    ///
    /// # Errors
    /// `ConfigError` for zero durations or an unusable upstream URL.
    pub fn resolve(self) -> Result<ResolvedConfig, ConfigError> {
        let merged = FeedConfig::defaults().merge(self);

        let poll_interval_ms = merged.poll_interval_ms.unwrap_or(5_000);
        if poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("pollIntervalMs"));
        }
        let fetch_timeout_ms = merged.fetch_timeout_ms.unwrap_or(10_000);
        if fetch_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("fetchTimeoutMs"));
        }

        let upstream_url = merged.upstream_url.unwrap_or_default();
        Url::parse(&upstream_url).map_err(|e| ConfigError::InvalidUrl {
            url: upstream_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(ResolvedConfig {
            port: merged.port.unwrap_or(5001),
            upstream_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            log_dir: merged.log_dir.unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: merged.log_level.unwrap_or_else(|| "info".to_string()),
            user_agent: merged.user_agent.unwrap_or_default(),
            source: ConfigSource::NoFile,
        })
    }
}

/// Reads one JSON config layer. Missing or broken files yield an empty layer;
/// the returned `ConfigSource` says which case applied.
fn read_file_layer(path: &Path) -> (FeedConfig, ConfigSource) {
    if !path.exists() {
        return (FeedConfig::default(), ConfigSource::Missing(path.to_path_buf()));
    }

    let skipped = |reason: String| ConfigSource::Skipped {
        path: path.to_path_buf(),
        reason,
    };
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<FeedConfig>(&config_str) {
            Ok(file_config) => (file_config, ConfigSource::File(path.to_path_buf())),
            Err(e) => (FeedConfig::default(), skipped(e.to_string())),
        },
        Err(e) => (FeedConfig::default(), skipped(e.to_string())),
    }
}

/// Layers defaults, the config file named by `cli` (or the default file) and
/// `cli` itself, then resolves.
///
/// # Errors
/// See `FeedConfig::resolve`.
pub fn load_with(cli: FeedConfig) -> Result<ResolvedConfig, ConfigError> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let (file_layer, source) = read_file_layer(&config_file_path);
    let mut resolved = FeedConfig::defaults().merge(file_layer).merge(cli).resolve()?;
    resolved.source = source;
    Ok(resolved)
}

/// Parses the process arguments and environment, then calls `load_with`.
/// Exits the process on `--help`, `--version` or malformed flags.
///
/// # Errors
/// See `FeedConfig::resolve`.
pub fn load_config() -> Result<ResolvedConfig, ConfigError> {
    load_with(FeedConfig::parse())
}

/// Like `load_config`, but parses the given argument list instead of the
/// process arguments.
///
/// # Errors
/// `ConfigError::Cli` for malformed flags, otherwise see `FeedConfig::resolve`.
pub fn load_config_from<I, T>(args: I) -> Result<ResolvedConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    load_with(FeedConfig::try_parse_from(args)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_file(path: &Path) -> FeedConfig {
        FeedConfig {
            config_path: Some(path.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_resolve() {
        let resolved = FeedConfig::default().resolve().unwrap();

        assert_eq!(resolved.port, 5001);
        assert_eq!(resolved.poll_interval, Duration::from_secs(5));
        assert_eq!(resolved.fetch_timeout, Duration::from_secs(10));
        assert_eq!(resolved.upstream_url, "http://127.0.0.1:5000/api/teams");
        assert!(resolved.user_agent.starts_with("PollCast/"));
    }

    #[test]
    fn test_file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "port": 7000, "pollIntervalMs": 2000, "upstreamUrl": "https://feed.example.com/api/teams" }}"#
        )
        .unwrap();

        let from_file = load_with(cli_with_file(file.path())).unwrap();
        assert_eq!(from_file.source, ConfigSource::File(file.path().to_path_buf()));
        assert_eq!(from_file.port, 7000);
        assert_eq!(from_file.poll_interval, Duration::from_secs(2));
        assert_eq!(from_file.upstream_url, "https://feed.example.com/api/teams");

        let cli = FeedConfig {
            port: Some(7100),
            ..cli_with_file(file.path())
        };
        let from_cli = load_with(cli).unwrap();
        assert_eq!(from_cli.port, 7100);
        assert_eq!(from_cli.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let resolved = load_with(cli_with_file(file.path())).unwrap();
        assert_eq!(resolved.port, 5001);
        match &resolved.source {
            ConfigSource::Skipped { path, reason } => {
                assert_eq!(path, file.path());
                assert!(!reason.is_empty());
            }
            other => panic!("broken file should be reported as skipped, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = FeedConfig::try_parse_from([
            "server_pollcast",
            "--port",
            "6001",
            "--poll-interval-ms",
            "250",
            "--upstream-url",
            "http://localhost:9000/feed",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(6001));
        assert_eq!(cli.poll_interval_ms, Some(250));
        assert_eq!(cli.upstream_url.as_deref(), Some("http://localhost:9000/feed"));
    }

    #[test]
    fn test_load_config_from_args() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.conf");
        let resolved = load_config_from([
            "server_pollcast",
            "--config-path",
            missing.to_str().unwrap(),
            "--fetch-timeout-ms",
            "1500",
        ])
        .unwrap();

        assert_eq!(resolved.fetch_timeout, Duration::from_millis(1500));
        assert_eq!(resolved.port, 5001);
        assert_eq!(resolved.source, ConfigSource::Missing(missing));

        assert!(matches!(
            load_config_from(["server_pollcast", "--port", "not-a-port"]),
            Err(ConfigError::Cli(_))
        ));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let zero = FeedConfig {
            poll_interval_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero.resolve(), Err(ConfigError::ZeroDuration("pollIntervalMs"))));

        let zero_timeout = FeedConfig {
            fetch_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(zero_timeout.resolve(), Err(ConfigError::ZeroDuration("fetchTimeoutMs"))));

        let relative = FeedConfig {
            upstream_url: Some("/api/teams".to_string()),
            ..Default::default()
        };
        assert!(matches!(relative.resolve(), Err(ConfigError::InvalidUrl { .. })));
    }
}
