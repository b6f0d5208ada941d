use crate::error::{Result, StreamError};
use crate::json::{FixMode, Limits, PendingScalars};
use crate::streaming::AssemblerOptions;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_OUTPUT_CAPACITY: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub limits: LimitsConfig,
    pub assembler: AssemblerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_depth: usize,
    pub output_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub mode: FixMode,
    pub pending: PendingScalars,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
        }
    }
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            mode: FixMode::Repair,
            pending: PendingScalars::Omit,
        }
    }
}

impl ParserConfig {
    /// Load configuration from environment variables, using defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let mut config = ParserConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let mut config: ParserConfig = toml::from_str(&contents)
            .map_err(|e| StreamError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        // Allow environment variables to override file config
        config.apply_env_overrides()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(max_depth) = env_value("STREAM_PARSER_MAX_DEPTH")? {
            self.limits.max_depth = max_depth;
        }
        if let Some(capacity) = env_value("STREAM_PARSER_OUTPUT_CAPACITY")? {
            self.limits.output_capacity = capacity;
        }
        if let Some(mode) = env_value("STREAM_PARSER_MODE")? {
            self.assembler.mode = mode;
        }
        if let Some(pending) = env_value("STREAM_PARSER_PENDING")? {
            self.assembler.pending = pending;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_depth == 0 {
            return Err(StreamError::ConfigError(
                "max_depth must be greater than 0".to_string(),
            ));
        }

        if self.limits.output_capacity == 0 {
            return Err(StreamError::ConfigError(
                "output_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_depth: self.limits.max_depth,
            output_capacity: self.limits.output_capacity,
        }
    }

    pub fn assembler_options(&self) -> AssemblerOptions {
        AssemblerOptions {
            mode: self.assembler.mode,
            pending: self.assembler.pending,
            limits: self.limits(),
        }
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| StreamError::ConfigError(format!("Invalid {} value: {}", name, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(StreamError::ConfigError(format!("{}: {}", name, e))),
    }
}
