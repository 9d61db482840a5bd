//! CLI command handlers.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use keepsake_server::{KeepsakeConfig, load_config_file};

pub mod check;
pub mod serve;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config file given on the command line.
    pub config_path: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Load the config file, or defaults when none was given.
    pub fn load_config(&self) -> Result<KeepsakeConfig> {
        match &self.config_path {
            Some(path) => load_config_file(path)
                .with_context(|| format!("loading config from {}", path.display())),
            None => Ok(KeepsakeConfig::default()),
        }
    }
}
