//! Coverage mode: run the suites under a tracer and print a per-module table.
//!
//! The tracer owns instrumentation and its own result format. This module only
//! asks it to write a textual summary into a buffer, then reshapes that
//! summary into the table printed on stdout (see [`summary`]).

pub mod lcov;
pub mod summary;

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::registry::ModuleRegistry;
use crate::runner;

pub use lcov::{default_ignore_dirs, LcovReport, LcovTracer};
pub use summary::{format_table, module_name, parse_summary, relative_to_root, CoverageRecord};

/// Execution count of every executable line, per source file.
pub type LineCounts = BTreeMap<PathBuf, BTreeMap<u32, u64>>;

/// How a report should be written.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions<'a> {
    /// Mark executable lines that never ran in the annotated files.
    pub show_missing: bool,
    /// Write the per-file summary to the sink.
    pub summary: bool,
    /// Directory receiving one annotated file per source file.
    pub coverdir: &'a Path,
}

/// Line-level instrumentation collaborator.
pub trait Tracer {
    /// Runs `body` under instrumentation and returns what it returned.
    fn run(&mut self, body: &mut dyn FnMut() -> bool) -> bool;

    /// Line counts gathered so far.
    fn results(&mut self) -> Result<Box<dyn CoverageReport>, HarnessError>;
}

/// Results of a traced run.
pub trait CoverageReport {
    fn counts(&self) -> &LineCounts;

    /// Writes annotated sources into `options.coverdir` and, when
    /// `options.summary` is set, the summary text into `sink`.
    fn write_results(
        &self,
        sink: &mut dyn Write,
        options: &WriteOptions<'_>,
    ) -> Result<(), HarnessError>;
}

/// Runs the configured suites under `tracer`, then prints the coverage table.
///
/// Returns true iff every test passed.
pub fn run_with_coverage(
    config: &HarnessConfig,
    registry: &ModuleRegistry,
    verbosity: u8,
    coverdir: &Path,
    tracer: &mut dyn Tracer,
) -> Result<bool, HarnessError> {
    let mut failure = None;
    let success = tracer.run(&mut || match runner::run(config, registry, verbosity) {
        Ok(success) => success,
        Err(err) => {
            failure = Some(err);
            false
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }

    println!("Writing coverage results...");
    let report = tracer.results()?;
    let table = coverage_table(report.as_ref(), config, coverdir)?;
    println!();
    print!("{table}");
    Ok(success)
}

/// Captures the report's summary and formats it as the coverage table.
pub fn coverage_table(
    report: &dyn CoverageReport,
    config: &HarnessConfig,
    coverdir: &Path,
) -> Result<String, HarnessError> {
    let summary = capture_summary(report, coverdir)?;
    let records = parse_summary(&summary, config);
    Ok(format_table(&records))
}

/// Has the report write its summary into a buffer and returns the text.
pub fn capture_summary(
    report: &dyn CoverageReport,
    coverdir: &Path,
) -> Result<String, HarnessError> {
    let mut sink = Vec::new();
    report.write_results(
        &mut sink,
        &WriteOptions {
            show_missing: true,
            summary: true,
            coverdir,
        },
    )?;
    Ok(String::from_utf8_lossy(&sink).into_owned())
}
