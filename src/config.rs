// ⚙️ Configuration - environment driven

use crate::rules::RuleSet;
use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// JSON rule file; None = built-in table
    pub rules_file: Option<PathBuf>,

    /// Directory holding transactions.csv, budgets.csv, invoices.csv, payments.csv
    pub data_dir: PathBuf,

    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            rules_file: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Read `SHIV_RULES_FILE`, `SHIV_DATA_DIR` and `SHIV_BIND_ADDR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = AppConfig::default();
        AppConfig {
            rules_file: read("SHIV_RULES_FILE").map(PathBuf::from),
            data_dir: read("SHIV_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            bind_addr: read("SHIV_BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    /// Rule set to classify with: the configured file, or the built-in table
    pub fn rule_set(&self) -> Result<RuleSet> {
        match &self.rules_file {
            Some(path) => RuleSet::from_file(path),
            None => {
                tracing::debug!("using built-in analytical rules");
                Ok(RuleSet::default())
            }
        }
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.data_file("transactions.csv")
    }

    pub fn budgets_path(&self) -> PathBuf {
        self.data_file("budgets.csv")
    }

    pub fn invoices_path(&self) -> PathBuf {
        self.data_file("invoices.csv")
    }

    pub fn payments_path(&self) -> PathBuf {
        self.data_file("payments.csv")
    }

    fn data_file(&self, name: &str) -> PathBuf {
        Path::new(&self.data_dir).join(name)
    }
}
