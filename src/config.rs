//! Harness configuration.
//!
//! Loaded from `SUITERUN_CONFIG`, else `suiterun.yaml` in the working
//! directory, else built-in defaults. `SUITERUN_TRACEFILE` overrides the
//! tracefile after loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use termcolor::ColorChoice;

use crate::error::HarnessError;

pub const CONFIG_ENV: &str = "SUITERUN_CONFIG";
pub const TRACEFILE_ENV: &str = "SUITERUN_TRACEFILE";
pub const DEFAULT_CONFIG_FILE: &str = "suiterun.yaml";

/// When to colour runner output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves the mode against the stream the runner writes to (stderr).
    pub fn choice(self) -> ColorChoice {
        match self {
            ColorMode::Always => ColorChoice::Always,
            ColorMode::Never => ColorChoice::Never,
            ColorMode::Auto if atty::is(atty::Stream::Stderr) => ColorChoice::Auto,
            ColorMode::Auto => ColorChoice::Never,
        }
    }
}

/// Configuration for discovery, execution and coverage reporting.
///
/// The defaults point at the crate's own checkout as recorded at build time.
/// When that directory no longer exists, as for an installed binary, they
/// resolve against the working directory instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Directory scanned for suite modules. Not recursive.
    pub suite_dir: PathBuf,
    /// Extension of source files, without the dot.
    pub source_extension: String,
    /// Files whose names begin with this are the package's own bootstrap and never candidates.
    pub bootstrap_file: String,
    /// Checkout directory of the package under test. Coverage rows for files
    /// outside it are dropped.
    pub source_root: PathBuf,
    /// Package name that modules under `source_root` are reported under.
    pub root_package: String,
    /// Dotted prefix of the harness's own modules, hidden from the coverage table.
    pub test_namespace: String,
    /// LCOV tracefile read by the coverage tracer.
    pub tracefile: Option<PathBuf>,
    pub color: ColorMode,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let root = checkout_root(Path::new(env!("CARGO_MANIFEST_DIR")));
        Self {
            suite_dir: root.join("src").join("suites"),
            source_root: root,
            source_extension: "rs".to_string(),
            bootstrap_file: "mod.rs".to_string(),
            root_package: "suiterun".to_string(),
            test_namespace: "suiterun.suites".to_string(),
            tracefile: None,
            color: ColorMode::Auto,
        }
    }
}

/// `built` if it still exists, else the working directory.
fn checkout_root(built: &Path) -> PathBuf {
    if built.is_dir() {
        return built.to_path_buf();
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

impl HarnessConfig {
    /// Loads the configuration using the environment and working directory.
    pub fn load() -> Result<Self, HarnessError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        if let Some(tracefile) = std::env::var_os(TRACEFILE_ENV) {
            config.tracefile = Some(PathBuf::from(tracefile));
        }
        Ok(config)
    }

    /// Reads a YAML configuration file; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path).map_err(|source| HarnessError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| HarnessError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
