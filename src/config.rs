//! Configuration for the builders page.
//!
//! Settings are read from `.katana/builders.toml` and layered
//! file → environment → CLI.
//!
//! ```toml
//! [page]
//! main_codebase = "unity_branch"
//! url_debounce_ms = 1000
//! hide_unstable = false
//!
//! [table]
//! default_sort_column = "name"
//! default_sort_direction = "asc"
//! ```
//!
//! | Variable                 | Overrides              |
//! |--------------------------|------------------------|
//! | `KATANA_MAIN_CODEBASE`   | `page.main_codebase`   |
//! | `KATANA_URL_DEBOUNCE_MS` | `page.url_debounce_ms` |

use crate::branch::{BRANCH_PARAM_SUFFIX, DEFAULT_MAIN_CODEBASE};
use crate::page::builders_columns;
use crate::sort::SortDirection;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const CONFIG_DIR: &str = ".katana";
pub const CONFIG_FILE: &str = "builders.toml";
pub const MAIN_CODEBASE_ENV: &str = "KATANA_MAIN_CODEBASE";
pub const URL_DEBOUNCE_ENV: &str = "KATANA_URL_DEBOUNCE_MS";

/// `[page]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSection {
    /// Codebase parameter whose branch drives the trunk fallback
    #[serde(default = "default_main_codebase")]
    pub main_codebase: String,
    /// Quiet period before filter changes reach the URL
    #[serde(default = "default_url_debounce_ms")]
    pub url_debounce_ms: u64,
    /// Initial value of the hide-unstable toggle when the URL says nothing
    #[serde(default)]
    pub hide_unstable: bool,
}

fn default_main_codebase() -> String {
    DEFAULT_MAIN_CODEBASE.to_string()
}

fn default_url_debounce_ms() -> u64 {
    1000
}

impl Default for PageSection {
    fn default() -> Self {
        Self {
            main_codebase: default_main_codebase(),
            url_debounce_ms: default_url_debounce_ms(),
            hide_unstable: false,
        }
    }
}

/// `[table]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSection {
    #[serde(default = "default_sort_column")]
    pub default_sort_column: String,
    #[serde(default = "default_sort_direction")]
    pub default_sort_direction: String,
}

fn default_sort_column() -> String {
    "name".to_string()
}

fn default_sort_direction() -> String {
    "asc".to_string()
}

impl Default for TableSection {
    fn default() -> Self {
        Self {
            default_sort_column: default_sort_column(),
            default_sort_direction: default_sort_direction(),
        }
    }
}

/// The complete builders.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildersToml {
    #[serde(default)]
    pub page: PageSection,
    #[serde(default)]
    pub table: TableSection,
}

impl BuildersToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse builders.toml")
    }

    /// Load `builders.toml` from `config_dir`, or defaults when it is absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize builders.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Main codebase, with the environment taking precedence over the file.
    pub fn main_codebase(&self) -> String {
        std::env::var(MAIN_CODEBASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.page.main_codebase.clone())
    }

    /// URL debounce in milliseconds, with the environment taking precedence.
    pub fn url_debounce_ms(&self) -> u64 {
        match std::env::var(URL_DEBOUNCE_ENV) {
            Ok(value) => value.trim().parse().unwrap_or_else(|_| {
                warn!(%value, "ignoring invalid {}", URL_DEBOUNCE_ENV);
                self.page.url_debounce_ms
            }),
            Err(_) => self.page.url_debounce_ms,
        }
    }

    /// Check the configuration; returns human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.page.main_codebase.ends_with(BRANCH_PARAM_SUFFIX) {
            warnings.push(format!(
                "main_codebase '{}' should end with '{}'",
                self.page.main_codebase, BRANCH_PARAM_SUFFIX
            ));
        }

        let column = builders_columns()
            .into_iter()
            .find(|column| column.name == self.table.default_sort_column);
        match column {
            None => warnings.push(format!(
                "Unknown default_sort_column '{}'",
                self.table.default_sort_column
            )),
            Some(column) if column.sort_type.is_none() => warnings.push(format!(
                "default_sort_column '{}' is not sortable",
                self.table.default_sort_column
            )),
            Some(_) => {}
        }

        if let Err(err) = self
            .table
            .default_sort_direction
            .parse::<SortDirection>()
        {
            warnings.push(err.to_string());
        }

        warnings
    }
}

/// Resolved configuration: file, environment, then CLI.
#[derive(Debug, Clone)]
pub struct BuildersConfig {
    pub project_dir: PathBuf,
    pub config_dir: PathBuf,
    pub toml: BuildersToml,
    pub verbose: bool,
    /// CLI override for the main codebase
    pub cli_main_codebase: Option<String>,
}

impl BuildersConfig {
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let config_dir = project_dir.join(CONFIG_DIR);
        let toml = BuildersToml::load_or_default(&config_dir)?;

        Ok(Self {
            project_dir,
            config_dir,
            toml,
            verbose: false,
            cli_main_codebase: None,
        })
    }

    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        main_codebase: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_main_codebase = main_codebase;
        Ok(config)
    }

    /// Defaults only, for callers without a project directory.
    pub fn from_toml(toml: BuildersToml) -> Self {
        Self {
            project_dir: PathBuf::from("."),
            config_dir: PathBuf::from(CONFIG_DIR),
            toml,
            verbose: false,
            cli_main_codebase: None,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn main_codebase(&self) -> String {
        self.cli_main_codebase
            .clone()
            .unwrap_or_else(|| self.toml.main_codebase())
    }

    pub fn url_debounce(&self) -> Duration {
        Duration::from_millis(self.toml.url_debounce_ms())
    }

    pub fn hide_unstable(&self) -> bool {
        self.toml.page.hide_unstable
    }

    /// Default sort as `(column, direction)`; invalid settings fall back to
    /// name ascending.
    pub fn default_sort(&self) -> (String, SortDirection) {
        let direction = self
            .toml
            .table
            .default_sort_direction
            .parse()
            .unwrap_or_default();
        (self.toml.table.default_sort_column.clone(), direction)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
