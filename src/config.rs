// ⚙️ Runtime configuration - where expenses are kept and how much gets logged
//
// Every option can come from the command line or the environment.

use crate::storage::{FileStorage, MemoryStorage, SqliteStorage, Storage};
use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub const DATABASE_FILE: &str = "expenses.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// `<data-dir>/expenses.json`
    File,
    /// `<data-dir>/expenses.db`
    Sqlite,
    /// Nothing is written to disk
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Storage backend for the expense list
    #[clap(long, env = "EXPENSES_BACKEND", value_enum, default_value = "file", global = true)]
    pub backend: Backend,

    /// Directory holding the saved expenses
    #[clap(long, env = "EXPENSES_DATA_DIR", default_value = ".expenses", global = true)]
    pub data_dir: PathBuf,

    /// Log filter, e.g. `info` or `expense_dashboard=debug`
    #[clap(long = "log", env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: Backend::File,
            data_dir: PathBuf::from(".expenses"),
            log_filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Build the storage backend this configuration selects.
    pub fn open_storage(&self) -> Result<Box<dyn Storage>> {
        let storage: Box<dyn Storage> = match self.backend {
            Backend::File => Box::new(FileStorage::new(&self.data_dir)),
            Backend::Sqlite => Box::new(SqliteStorage::open(&self.database_path())?),
            Backend::Memory => Box::new(MemoryStorage::new()),
        };
        Ok(storage)
    }

    /// Install the global tracing subscriber. Logs go to stderr.
    pub fn init_logging(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log_filter)
            .map_err(|e| anyhow!("Invalid log filter {:?}: {}", self.log_filter, e))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow!(e))?;

        Ok(())
    }
}
