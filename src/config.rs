use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::interpreter::cps::DEFAULT_MAX_DEPTH;

const DEFAULT_STACK_SIZE_MB: usize = 512;

// host stack set aside for each builtin that re-enters the evaluator
const NESTED_EVAL_STACK_BYTES: usize = 256 * 1024;

#[derive(Parser, Debug)]
#[command(name = "mu-scheme", version, about = "Scheme interpreter with lexically and dynamically scoped procedures")]
pub struct Cli {
    /// Scheme file to run
    pub file: Option<PathBuf>,

    /// Load FILE first, then keep reading from the terminal
    #[arg(short = 'i', long = "load")]
    pub load: bool,

    /// Do not print the values of evaluated expressions
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(long, value_enum)]
    pub emit: Option<Emit>,

    /// Maximum number of pending continuations before a RecursionError
    #[arg(long, env = "SCHEME_MAX_DEPTH")]
    pub max_depth: Option<usize>,

    /// Abort a top-level evaluation after this many milliseconds (0 disables)
    #[arg(long, env = "SCHEME_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Stack size of the evaluation thread
    #[arg(long)]
    pub stack_size_mb: Option<usize>,

    /// Log filter, e.g. "info" or "mu_scheme=debug"
    #[arg(long, env = "SCHEME_LOG")]
    pub log_level: Option<String>,

    #[arg(long, env = "SCHEME_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// JSON configuration file
    #[arg(long, env = "SCHEME_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub history_file: Option<PathBuf>,
}

/// How evaluated values are printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emit {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub max_depth: usize,
    pub timeout_ms: Option<u64>,
    pub stack_size_mb: usize,
    pub log: LogSettings,
    pub history_file: Option<PathBuf>,
    pub emit: Emit,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_ms: None,
            stack_size_mb: DEFAULT_STACK_SIZE_MB,
            log: LogSettings::default(),
            history_file: None,
            emit: Emit::Text,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read(PathBuf, io::Error),
    Parse(PathBuf, serde_json::Error),
    Invalid(String),
    Log(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Read(path, e) => write!(f, "cannot read config file {}: {}", path.display(), e),
            ConfigError::Parse(path, e) => write!(f, "invalid config file {}: {}", path.display(), e),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
            ConfigError::Log(msg) => write!(f, "cannot set up logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Settings, ConfigError> {
        let src = fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        serde_json::from_str(&src).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    /// Defaults, then the config file, then flags and environment variables.
    pub fn resolve(cli: &Cli) -> Result<Settings, ConfigError> {
        let mut settings = match cli.config {
            Some(ref path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(max_depth) = cli.max_depth {
            self.max_depth = max_depth;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.timeout_ms = Some(timeout_ms);
        }
        if let Some(stack_size_mb) = cli.stack_size_mb {
            self.stack_size_mb = stack_size_mb;
        }
        if let Some(ref level) = cli.log_level {
            self.log.level = level.clone();
        }
        if let Some(ref file) = cli.log_file {
            self.log.file = Some(file.clone());
        }
        if let Some(ref history_file) = cli.history_file {
            self.history_file = Some(history_file.clone());
        }
        if let Some(emit) = cli.emit {
            self.emit = emit;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be positive".to_string()));
        }
        if self.stack_size_mb == 0 {
            return Err(ConfigError::Invalid("stack_size_mb must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            Some(0) | None => None,
            Some(ms) => Some(Duration::from_millis(ms)),
        }
    }

    pub fn stack_size(&self) -> usize { self.stack_size_mb * 1024 * 1024 }

    /// Nested evaluations the evaluator thread's stack can hold.
    pub fn max_nesting(&self) -> usize { (self.stack_size() / NESTED_EVAL_STACK_BYTES).max(1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout(), None);
        assert_eq!(settings.emit, Emit::Text);
    }

    #[test]
    fn test_partial_file() {
        let settings: Settings = serde_json::from_str(r#"{"max_depth": 500, "timeout_ms": 250, "log": {"level": "debug"}, "emit": "json"}"#).unwrap();
        assert_eq!(settings.max_depth, 500);
        assert_eq!(settings.timeout(), Some(Duration::from_millis(250)));
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.log.file, None);
        assert_eq!(settings.emit, Emit::Json);
        assert_eq!(settings.stack_size_mb, DEFAULT_STACK_SIZE_MB);
    }

    #[test]
    fn test_unknown_field() {
        assert!(serde_json::from_str::<Settings>(r#"{"max_dept": 5}"#).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from(["mu-scheme", "-i", "lib.scm", "--max-depth", "64", "--emit", "json", "--timeout-ms", "0"]).unwrap();
        assert!(cli.load);
        assert_eq!(cli.file, Some(PathBuf::from("lib.scm")));

        let mut settings = Settings::default();
        settings.apply_cli(&cli);
        assert_eq!(settings.max_depth, 64);
        assert_eq!(settings.emit, Emit::Json);
        assert_eq!(settings.timeout(), None);
    }

    #[test]
    fn test_max_nesting_follows_stack_size() {
        assert_eq!(Settings::default().max_nesting(), 2048);
        let small = Settings {
            stack_size_mb: 2,
            ..Settings::default()
        };
        assert_eq!(small.max_nesting(), 8);
    }

    #[test]
    fn test_validate() {
        let settings = Settings {
            max_depth: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file(Path::new("/nonexistent/mu-scheme.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_, _)));
    }
}
