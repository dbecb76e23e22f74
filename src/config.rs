// File: ./src/config.rs
// Configuration defaults, the optional config file, and flag layering.
use crate::cli::CliArgs;
use crate::context::AppContext;
use crate::remind::FormatOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

fn default_lead() -> i64 {
    3
}

/// Values accepted in the config file. Every key is optional.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_lead")]
    pub lead: i64,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub todos: bool,
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            label: String::new(),
            lead: default_lead(),
            heading: String::new(),
            todos: false,
            debug: false,
        }
    }
}

impl Config {
    /// Reads a config file. A missing or empty file yields the defaults;
    /// an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config file at '{}', using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

        Ok(config)
    }

    /// Loads the config file named on the command line, or the context's default one.
    pub fn load(ctx: &dyn AppContext, explicit: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(p) => p.to_path_buf(),
            None => ctx.get_config_file_path()?,
        };
        Self::load_from(&path)
    }
}

/// Effective settings for one run: defaults < config file < flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub format: FormatOptions,
    pub debug: bool,
}

impl Options {
    pub fn layer(config: Config, cli: &CliArgs) -> Self {
        Self {
            format: FormatOptions {
                label: cli.label.clone().unwrap_or(config.label),
                heading: cli.heading.clone().unwrap_or(config.heading),
                lead_days: cli.lead.unwrap_or(config.lead),
                include_tasks: cli.todos || config.todos,
            },
            debug: cli.debug || config.debug,
        }
    }
}
