//! Runtime configuration
//!
//! Layers, lowest precedence first:
//! 1. built-in defaults
//! 2. a TOML file (`flow.toml` in the working directory when present, or an
//!    explicit path which must then exist)
//! 3. `FLOW_`-prefixed environment variables, `__` between sections
//!    (`FLOW_INTERPRETER__MAX_LOOP_COUNT=50`)
//! 4. values set on the builder
//!
//! ```rust,no_run
//! use flow_core::config::FlowConfig;
//!
//! let config = FlowConfig::builder()
//!     .config_path(Some("deploy/flow.toml".into()))
//!     .max_loop_count(Some(5_000))
//!     .build()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_FILE: &str = "flow.toml";
const DEFAULT_ENV_PREFIX: &str = "FLOW";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Iterations a `repeat` block runs before it is stopped
    pub max_loop_count: u64,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_loop_count: 1000,
        }
    }
}

/// Settings of the stub host used by the `flow` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Simulated latency before a stub delegate replies
    pub reply_delay_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub interpreter: InterpreterOptions,
    pub host: HostOptions,
}

impl FlowConfig {
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::default()
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowConfigBuilder {
    config_path: Option<PathBuf>,
    env_prefix: Option<String>,
    max_loop_count: Option<u64>,
    reply_delay_ms: Option<u64>,
}

impl FlowConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Environment prefix, `FLOW` unless set
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn max_loop_count(mut self, count: Option<u64>) -> Self {
        self.max_loop_count = count;
        self
    }

    pub fn reply_delay_ms(mut self, delay: Option<u64>) -> Self {
        self.reply_delay_ms = delay;
        self
    }

    pub fn build(self) -> Result<FlowConfig> {
        let defaults = FlowConfig::default();
        let mut builder = ::config::Config::builder()
            .set_default(
                "interpreter.max_loop_count",
                to_i64(defaults.interpreter.max_loop_count),
            )?
            .set_default("host.reply_delay_ms", to_i64(defaults.host.reply_delay_ms))?;

        builder = match &self.config_path {
            Some(path) => builder.add_source(
                ::config::File::from(path.as_path())
                    .format(::config::FileFormat::Toml)
                    .required(true),
            ),
            None => builder.add_source(
                ::config::File::new(DEFAULT_FILE, ::config::FileFormat::Toml).required(false),
            ),
        };

        let prefix = self.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
        builder = builder.add_source(
            ::config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(count) = self.max_loop_count {
            builder = builder.set_override("interpreter.max_loop_count", to_i64(count))?;
        }
        if let Some(delay) = self.reply_delay_ms {
            builder = builder.set_override("host.reply_delay_ms", to_i64(delay))?;
        }

        let config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize::<FlowConfig>()
            .context("Invalid configuration")?;
        Ok(config)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
