//! Harness error types.
//!
//! Only conditions that stop the whole run live in [`HarnessError`]. A module
//! that fails to import is not an error at this level: it is reported and
//! skipped, so it gets its own value type, [`ImportFailure`], which only ever
//! travels inside an [`ImportOutcome`](crate::aggregator::ImportOutcome).

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Fatal failures of the harness pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("cannot read suite directory '{}'", dir.display())]
    #[diagnostic(
        code(suiterun::discovery),
        help("check `suite_dir` in the harness configuration")
    )]
    Discovery {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("cannot read configuration file '{}'", path.display())]
    #[diagnostic(code(suiterun::config::read))]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in '{}'", path.display())]
    #[diagnostic(code(suiterun::config::parse))]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot read coverage tracefile '{}'", path.display())]
    #[diagnostic(
        code(suiterun::coverage::tracefile),
        help("produce an LCOV tracefile (for example with `cargo llvm-cov --lcov`) and point SUITERUN_TRACEFILE at it")
    )]
    TracefileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tracefile '{}' at line {line}: {message}", path.display())]
    #[diagnostic(code(suiterun::coverage::tracefile))]
    Tracefile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("coverage tracefile '{}' was not written by this run", path.display())]
    #[diagnostic(
        code(suiterun::coverage::stale),
        help("re-run under `cargo llvm-cov` so the tracefile is exported while suiterun runs")
    )]
    StaleTracefile { path: PathBuf },

    #[error("coverage results requested before the traced run")]
    #[diagnostic(code(suiterun::coverage::not_run))]
    TracerNotRun,

    #[error("no coverage tracefile configured")]
    #[diagnostic(
        code(suiterun::coverage::tracefile),
        help("set `tracefile` in the configuration or the SUITERUN_TRACEFILE environment variable")
    )]
    MissingTracefile,

    #[error("cannot write coverage results to '{}'", path.display())]
    #[diagnostic(code(suiterun::coverage::write))]
    CoverageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write coverage summary")]
    #[diagnostic(code(suiterun::coverage::summary))]
    SummaryWrite {
        #[source]
        source: std::io::Error,
    },
}

/// Why a discovered module could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportFailure {
    #[error("no module named '{module}' is registered with the harness")]
    NotFound { module: String },

    #[error("module '{module}' failed to initialise: {message}")]
    InitFailed { module: String, message: String },

    #[error("module '{module}' panicked during initialisation: {message}")]
    InitPanicked { module: String, message: String },
}

impl ImportFailure {
    pub fn module(&self) -> &str {
        match self {
            ImportFailure::NotFound { module }
            | ImportFailure::InitFailed { module, .. }
            | ImportFailure::InitPanicked { module, .. } => module,
        }
    }
}

/// Extracts the message of a panic payload produced by `panic!` or a failed assertion.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
