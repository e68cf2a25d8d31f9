//! Configuration module for fixture-responder.
//!
//! The four positional arguments (address, port, topology, drop threshold)
//! are always required. Everything else comes from flags, an optional
//! TOML configuration file, or built-in defaults, in that order of
//! precedence.

use crate::faults::{FaultInjector, DEFAULT_BASE_DELAY_MS, DEFAULT_JITTER_MS};
use clap::Parser;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 7777;
pub const DEFAULT_TOPOLOGY: &str = "d";
pub const DEFAULT_THRESHOLD: f64 = 0.99;

/// Command-line arguments for the responder
#[derive(Parser, Debug)]
#[command(name = "fixture-responder")]
#[command(version = "0.1.0")]
#[command(about = "UDP fixture server with simulated loss and latency", long_about = None)]
pub struct CliArgs {
    /// Address to bind to (e.g., 127.0.0.1)
    pub address: String,

    /// Port to bind to
    pub port: u16,

    /// Topology tag selecting the fixture set (d|w|t)
    pub topology: String,

    /// Fraction of responses delivered, 0-1 (0.99 drops 1%)
    pub drop_threshold: f64,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding the fixture files
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum response delay in milliseconds
    #[arg(long)]
    pub base_delay_ms: Option<u64>,

    /// Random delay added on top of the base, in milliseconds
    #[arg(long)]
    pub jitter_ms: Option<u64>,

    /// Seed for drop, delay and sampling draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Synthesize LOOKUP responses instead of reading fixtures
    #[arg(long)]
    pub random_lookup: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub fixtures: FixturesConfig,
    #[serde(default)]
    pub faults: FaultsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fixture-related configuration
#[derive(Debug, Deserialize)]
pub struct FixturesConfig {
    /// Directory holding the fixture files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Synthesize LOOKUP responses
    #[serde(default)]
    pub random_lookup: bool,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            random_lookup: false,
        }
    }
}

/// Fault injection configuration
#[derive(Debug, Deserialize)]
pub struct FaultsConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
    pub seed: Option<u64>,
}

impl Default for FaultsConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: default_jitter_ms(),
            seed: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `data/` beside the executable, falling back to the crate's own
/// `data/` when the binary runs out of the cargo target directory.
fn default_data_dir() -> PathBuf {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("data")));

    match beside_exe {
        Some(dir) if dir.is_dir() => dir,
        _ => Path::new(env!("CARGO_MANIFEST_DIR")).join("data"),
    }
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_jitter_ms() -> u64 {
    DEFAULT_JITTER_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub topology: String,
    pub threshold: f64,
    pub data_dir: PathBuf,
    pub base_delay: Duration,
    pub jitter: Duration,
    pub seed: Option<u64>,
    pub random_lookup: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from process arguments and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve parsed CLI arguments against the TOML file and defaults.
    /// CLI arguments take precedence over TOML file values.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let ip: IpAddr = cli
            .address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(cli.address.clone()))?;

        validate_topology(&cli.topology)?;
        validate_threshold(cli.drop_threshold)?;

        Ok(Config {
            listen: SocketAddr::new(ip, cli.port),
            topology: cli.topology,
            threshold: cli.drop_threshold,
            data_dir: cli.data_dir.unwrap_or(toml_config.fixtures.data_dir),
            base_delay: Duration::from_millis(
                cli.base_delay_ms.unwrap_or(toml_config.faults.base_delay_ms),
            ),
            jitter: Duration::from_millis(cli.jitter_ms.unwrap_or(toml_config.faults.jitter_ms)),
            seed: cli.seed.or(toml_config.faults.seed),
            random_lookup: cli.random_lookup || toml_config.fixtures.random_lookup,
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        })
    }

    /// Fault policy described by this configuration.
    pub fn faults(&self) -> FaultInjector {
        FaultInjector::new(self.threshold, self.base_delay, self.jitter)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            topology: DEFAULT_TOPOLOGY.to_string(),
            threshold: DEFAULT_THRESHOLD,
            data_dir: default_data_dir(),
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            jitter: Duration::from_millis(DEFAULT_JITTER_MS),
            seed: None,
            random_lookup: false,
            log_level: default_log_level(),
        }
    }
}

/// The tag is spliced into file names, so it must not escape the data dir.
fn validate_topology(tag: &str) -> Result<(), ConfigError> {
    let valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidTopology(tag.to_string()))
    }
}

fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold(threshold))
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    InvalidAddress(String),
    InvalidTopology(String),
    InvalidThreshold(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidAddress(addr) => write!(f, "Invalid bind address: {}", addr),
            ConfigError::InvalidTopology(tag) => write!(
                f,
                "Invalid topology tag '{}': expected letters, digits, '-' or '_'",
                tag
            ),
            ConfigError::InvalidThreshold(t) => {
                write!(f, "Invalid drop threshold {}: expected a value in 0-1", t)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let cli = CliArgs::try_parse_from(
            std::iter::once("fixture-responder").chain(args.iter().copied()),
        )
        .unwrap();
        Config::from_args(cli)
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.fixtures.data_dir, default_data_dir());
        assert!(!config.fixtures.random_lookup);
        assert_eq!(config.faults.base_delay_ms, 500);
        assert_eq!(config.faults.jitter_ms, 1000);
        assert_eq!(config.logging.level, "info");

        let config = Config::default();
        assert_eq!(config.listen.to_string(), "127.0.0.1:7777");
        assert_eq!(config.topology, "d");
        assert_eq!(config.threshold, 0.99);
    }

    #[test]
    fn test_positional_args() {
        let config = parse(&["0.0.0.0", "9000", "w", "0.5"]).unwrap();
        assert_eq!(config.listen.to_string(), "0.0.0.0:9000");
        assert_eq!(config.topology, "w");
        assert_eq!(config.threshold, 0.5);
        assert_eq!(config.base_delay, Duration::from_millis(500));
        assert_eq!(config.jitter, Duration::from_millis(1000));
        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_missing_positional_args() {
        for args in [
            vec!["fixture-responder"],
            vec!["fixture-responder", "127.0.0.1", "7777", "d"],
        ] {
            let err = CliArgs::try_parse_from(args).unwrap_err();
            assert_eq!(
                err.kind(),
                clap::error::ErrorKind::MissingRequiredArgument
            );
        }
    }

    #[test]
    fn test_flags_override() {
        let config = parse(&[
            "::1",
            "7777",
            "t",
            "1",
            "--data-dir",
            "/srv/fixtures",
            "--base-delay-ms",
            "10",
            "--jitter-ms",
            "0",
            "--seed",
            "42",
            "--random-lookup",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.listen.to_string(), "[::1]:7777");
        assert_eq!(config.data_dir, PathBuf::from("/srv/fixtures"));
        assert_eq!(config.base_delay, Duration::from_millis(10));
        assert_eq!(config.jitter, Duration::ZERO);
        assert_eq!(config.seed, Some(42));
        assert!(config.random_lookup);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            parse(&["localhost", "7777", "d", "0.5"]),
            Err(ConfigError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse(&["127.0.0.1", "7777", "../etc", "0.5"]),
            Err(ConfigError::InvalidTopology(_))
        ));
        assert!(matches!(
            parse(&["127.0.0.1", "7777", "d", "1.5"]),
            Err(ConfigError::InvalidThreshold(_))
        ));
        assert!(matches!(
            parse(&["127.0.0.1", "7777", "d", "NaN"]),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [fixtures]
            data_dir = "/var/lib/fixtures"
            random_lookup = true

            [faults]
            base_delay_ms = 50
            jitter_ms = 25
            seed = 7

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.fixtures.data_dir, PathBuf::from("/var/lib/fixtures"));
        assert!(config.fixtures.random_lookup);
        assert_eq!(config.faults.base_delay_ms, 50);
        assert_eq!(config.faults.jitter_ms, 25);
        assert_eq!(config.faults.seed, Some(7));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_file_merge() {
        let path = std::env::temp_dir().join(format!(
            "fixture-responder-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "[faults]\nbase_delay_ms = 5\njitter_ms = 5\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();

        let path_str = path.to_str().unwrap();
        let config = parse(&[
            "127.0.0.1",
            "7777",
            "d",
            "0.9",
            "--config",
            path_str,
            "--jitter-ms",
            "1",
        ])
        .unwrap();

        assert_eq!(config.base_delay, Duration::from_millis(5));
        assert_eq!(config.jitter, Duration::from_millis(1));
        assert_eq!(config.log_level, "warn");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_config_file() {
        assert!(matches!(
            parse(&[
                "127.0.0.1",
                "7777",
                "d",
                "0.9",
                "--config",
                "/nonexistent/responder.toml"
            ]),
            Err(ConfigError::FileRead(..))
        ));
    }

    #[test]
    fn test_default_data_dir_independent_of_cwd() {
        let data_dir = default_data_dir();
        assert!(data_dir.is_absolute());
        assert_ne!(data_dir, PathBuf::from("data"));
        assert!(data_dir.join("topo-d.json").is_file());

        // A relative override is taken as given
        let config = parse(&["127.0.0.1", "7777", "d", "0.5", "--data-dir", "fixtures"]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("fixtures"));
    }
}
