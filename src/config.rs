//! Configuration for a solve: resource budget, logging, and evaluation mode.
//!
//! Hierarchical loading, following the teacher crate's layering:
//! 1. `latticelog.toml` (base configuration)
//! 2. `latticelog.local.toml` (local overrides, git-ignored)
//! 3. Environment variables (`LATTICELOG_*` prefix, `__` nesting separator)

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Mirrors [`crate::cancel::ResourceBudget`] in a serializable form; `None`
/// means unlimited and is represented in TOML/env as the literal `0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_recursive_queries")]
    pub max_recursive_queries: u64,
    #[serde(default)]
    pub max_worklist_steps: u64,
}

impl BudgetConfig {
    pub fn to_resource_budget(&self) -> crate::cancel::ResourceBudget {
        crate::cancel::ResourceBudget {
            max_recursive_queries: non_zero(self.max_recursive_queries),
            max_worklist_steps: non_zero(self.max_worklist_steps),
        }
    }
}

fn non_zero(n: u64) -> Option<usize> {
    if n == 0 {
        None
    } else {
        Some(n as usize)
    }
}

fn default_max_recursive_queries() -> u64 {
    1_000_000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            max_recursive_queries: default_max_recursive_queries(),
            max_worklist_steps: 0,
        }
    }
}

/// Log level and format, matching the teacher crate's `LoggingConfig` shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl SolverConfig {
    /// Loads configuration from the default locations, falling back to
    /// in-process defaults when none of the files exist.
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("latticelog.toml"))
            .merge(Toml::file("latticelog.local.toml"))
            .merge(Env::prefixed("LATTICELOG_").split("__"))
            .join(figment::providers::Serialized::defaults(SolverConfig::default()))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LATTICELOG_").split("__"))
            .join(figment::providers::Serialized::defaults(SolverConfig::default()))
            .extract()
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            budget: BudgetConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_bounded_recursive_query_budget() {
        let config = SolverConfig::default();
        assert_eq!(config.budget.max_recursive_queries, 1_000_000);
        assert_eq!(config.budget.max_worklist_steps, 0);
    }

    #[test]
    fn zero_worklist_budget_means_unlimited() {
        let config = BudgetConfig::default();
        assert_eq!(config.to_resource_budget().max_worklist_steps, None);
    }

    #[test]
    fn load_without_config_files_falls_back_to_defaults() {
        let config = SolverConfig::load().expect("figment extraction of pure defaults cannot fail");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn from_file_overrides_defaults_with_toml_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"[budget]\nmax_worklist_steps = 500\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = SolverConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.budget.max_worklist_steps, 500);
        assert_eq!(config.logging.level, "debug");
        // Unset fields still take figment's serialized defaults.
        assert_eq!(config.budget.max_recursive_queries, 1_000_000);
    }
}
