//! CLI commands module

pub mod provider;
pub mod serve;

use std::path::PathBuf;

use crate::output::OutputFormat;
use searchgate_core::Database;

/// Shared context for all commands
pub struct Context {
    pub db: Database,
    pub db_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}
