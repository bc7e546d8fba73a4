//! Tracer backed by an LCOV tracefile.
//!
//! Line instrumentation is done by the compiler (`-C instrument-coverage`) and
//! exported by an external tool such as `cargo llvm-cov --lcov`. The tracer
//! runs the suites in-process and then reads the tracefile, which must have
//! been written since the run started. `SF:` opens a
//! source file record, `DA:<line>,<count>` gives the execution count of one
//! executable line, `end_of_record` closes the record. Other records are
//! ignored.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use super::{CoverageReport, LineCounts, Tracer, WriteOptions};
use crate::error::HarnessError;

/// Directories whose sources are never reported: the standard library as
/// remapped by rustc, installed toolchains, and cargo's dependency checkouts.
pub fn default_ignore_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("/rustc")];
    let home = directories::BaseDirs::new().map(|base| base.home_dir().to_path_buf());

    let rustup_home = std::env::var_os("RUSTUP_HOME")
        .map(PathBuf::from)
        .or_else(|| home.as_ref().map(|h| h.join(".rustup")));
    if let Some(rustup_home) = rustup_home {
        dirs.push(rustup_home.join("toolchains"));
    }

    let cargo_home = std::env::var_os("CARGO_HOME")
        .map(PathBuf::from)
        .or_else(|| home.as_ref().map(|h| h.join(".cargo")));
    if let Some(cargo_home) = cargo_home {
        dirs.push(cargo_home.join("registry"));
        dirs.push(cargo_home.join("git"));
    }
    dirs
}

pub struct LcovTracer {
    tracefile: PathBuf,
    ignore_dirs: Vec<PathBuf>,
    started: Option<SystemTime>,
}

impl LcovTracer {
    pub fn new(tracefile: impl Into<PathBuf>) -> Self {
        Self {
            tracefile: tracefile.into(),
            ignore_dirs: Vec::new(),
            started: None,
        }
    }

    pub fn ignore_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        self.ignore_dirs.extend(dirs);
        self
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_dirs.iter().any(|dir| path.starts_with(dir))
    }

    /// Fails unless the tracefile was written during the current run.
    ///
    /// Timestamps are compared to the second, the coarsest common file
    /// system resolution.
    fn check_fresh(&self) -> Result<(), HarnessError> {
        let started = self.started.ok_or(HarnessError::TracerNotRun)?;
        let read_error = |source| HarnessError::TracefileRead {
            path: self.tracefile.clone(),
            source,
        };
        let modified = fs::metadata(&self.tracefile)
            .and_then(|meta| meta.modified())
            .map_err(read_error)?;
        if whole_seconds(modified) < whole_seconds(started) {
            return Err(HarnessError::StaleTracefile {
                path: self.tracefile.clone(),
            });
        }
        Ok(())
    }
}

fn whole_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|since| since.as_secs())
        .unwrap_or(0)
}

impl Tracer for LcovTracer {
    fn run(&mut self, body: &mut dyn FnMut() -> bool) -> bool {
        debug!(tracefile = %self.tracefile.display(), "running under coverage");
        self.started = Some(SystemTime::now());
        body()
    }

    fn results(&mut self) -> Result<Box<dyn CoverageReport>, HarnessError> {
        self.check_fresh()?;
        let content =
            fs::read_to_string(&self.tracefile).map_err(|source| HarnessError::TracefileRead {
                path: self.tracefile.clone(),
                source,
            })?;
        let mut counts = parse_tracefile(&content, &self.tracefile)?;
        counts.retain(|path, _| {
            let keep = !self.is_ignored(path);
            if !keep {
                trace!(path = %path.display(), "ignored by directory");
            }
            keep
        });
        debug!(files = counts.len(), "loaded line counts");
        Ok(Box::new(LcovReport { counts }))
    }
}

/// Parses LCOV text. Counts for a file listed in several records are summed.
pub fn parse_tracefile(content: &str, origin: &Path) -> Result<LineCounts, HarnessError> {
    let malformed = |line: usize, message: &str| HarnessError::Tracefile {
        path: origin.to_path_buf(),
        line,
        message: message.to_string(),
    };

    let mut counts = LineCounts::new();
    let mut current: Option<PathBuf> = None;
    for (index, raw) in content.lines().enumerate() {
        let number = index + 1;
        let line = raw.trim();
        if let Some(path) = line.strip_prefix("SF:") {
            let path = PathBuf::from(path);
            counts.entry(path.clone()).or_default();
            current = Some(path);
        } else if let Some(data) = line.strip_prefix("DA:") {
            let file = current
                .as_ref()
                .ok_or_else(|| malformed(number, "DA record outside a source file"))?;
            let mut fields = data.split(',');
            let line_no = fields
                .next()
                .and_then(|f| f.trim().parse::<u32>().ok())
                .ok_or_else(|| malformed(number, "invalid line number in DA record"))?;
            let hits = fields
                .next()
                .and_then(|f| f.trim().parse::<u64>().ok())
                .ok_or_else(|| malformed(number, "invalid execution count in DA record"))?;
            *counts
                .entry(file.clone())
                .or_default()
                .entry(line_no)
                .or_insert(0) += hits;
        } else if line == "end_of_record" {
            current = None;
        }
    }
    Ok(counts)
}

/// Line counts read from a tracefile.
#[derive(Debug, Clone, Default)]
pub struct LcovReport {
    counts: LineCounts,
}

impl LcovReport {
    pub fn new(counts: LineCounts) -> Self {
        Self { counts }
    }

    fn annotate(
        &self,
        path: &Path,
        lines: &BTreeMap<u32, u64>,
        options: &WriteOptions<'_>,
    ) -> Result<(), HarnessError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                debug!(path = %path.display(), %err, "source unavailable, not annotated");
                return Ok(());
            }
        };

        let mut annotated = String::with_capacity(source.len() + source.len() / 4);
        for (index, text) in source.lines().enumerate() {
            let line_no = u32::try_from(index + 1).unwrap_or(u32::MAX);
            let prefix = match lines.get(&line_no) {
                Some(0) if options.show_missing => ">>>>>> ".to_string(),
                Some(0) | None => "       ".to_string(),
                Some(hits) => format!("{hits:>5}: "),
            };
            annotated.push_str(&prefix);
            annotated.push_str(text);
            annotated.push('\n');
        }

        let target = options
            .coverdir
            .join(format!("{}.cover", dotted_file_name(path)));
        fs::write(&target, annotated).map_err(|source| HarnessError::CoverageWrite {
            path: target,
            source,
        })
    }
}

impl CoverageReport for LcovReport {
    fn counts(&self) -> &LineCounts {
        &self.counts
    }

    fn write_results(
        &self,
        sink: &mut dyn Write,
        options: &WriteOptions<'_>,
    ) -> Result<(), HarnessError> {
        fs::create_dir_all(options.coverdir).map_err(|source| HarnessError::CoverageWrite {
            path: options.coverdir.to_path_buf(),
            source,
        })?;

        let mut rows = Vec::new();
        for (path, lines) in &self.counts {
            if lines.is_empty() {
                continue;
            }
            self.annotate(path, lines, options)?;

            let total = lines.len();
            let hit = lines.values().filter(|&&hits| hits > 0).count();
            let percent = 100 * hit / total;
            let module = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            rows.push(format!(
                "{total:>5}   {percent:>3}%   {module}   ({})",
                path.display()
            ));
        }

        if options.summary && !rows.is_empty() {
            let summary_err = |source| HarnessError::SummaryWrite { source };
            writeln!(sink, "lines   cov%   module   (path)").map_err(summary_err)?;
            for row in rows {
                writeln!(sink, "{row}").map_err(summary_err)?;
            }
        }
        Ok(())
    }
}

/// `/w/suiterun/src/lib.rs` becomes `w.suiterun.src.lib`.
fn dotted_file_name(path: &Path) -> String {
    let without_ext = path.with_extension("");
    without_ext
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACEFILE: &str = "\
TN:
SF:/w/suiterun/src/a.rs
FN:1,main
DA:1,3
DA:2,0
DA:3,1
DA:4,0
LF:4
LH:2
end_of_record
SF:/rustc/abc123/library/core/src/option.rs
DA:10,7
end_of_record
SF:/w/suiterun/src/a.rs
DA:2,5
end_of_record
";

    #[test]
    fn parses_and_merges_records() {
        let counts = parse_tracefile(TRACEFILE, Path::new("t.lcov")).unwrap();
        let a = &counts[Path::new("/w/suiterun/src/a.rs")];
        assert_eq!(a.len(), 4);
        assert_eq!(a[&1], 3);
        assert_eq!(a[&2], 5);
        assert_eq!(a[&4], 0);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn data_outside_a_record_is_malformed() {
        let err = parse_tracefile("DA:1,1\n", Path::new("t.lcov")).unwrap_err();
        assert!(matches!(err, HarnessError::Tracefile { line: 1, .. }));
    }

    #[test]
    fn bad_counts_are_malformed() {
        let err = parse_tracefile("SF:/a.rs\nDA:1,lots\n", Path::new("t.lcov")).unwrap_err();
        assert!(matches!(err, HarnessError::Tracefile { line: 2, .. }));
    }

    fn backdate(path: &Path) {
        let hour_ago = SystemTime::now() - std::time::Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(hour_ago)
            .unwrap();
    }

    #[test]
    fn tracer_drops_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let tracefile = dir.path().join("cov.lcov");

        let mut tracer = LcovTracer::new(&tracefile).ignore_dirs([PathBuf::from("/rustc")]);
        assert!(tracer.run(&mut || fs::write(&tracefile, TRACEFILE).is_ok()));
        let report = tracer.results().unwrap();
        let files: Vec<_> = report.counts().keys().cloned().collect();
        assert_eq!(files, vec![PathBuf::from("/w/suiterun/src/a.rs")]);
    }

    #[test]
    fn tracefile_from_an_earlier_run_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tracefile = dir.path().join("old.lcov");
        fs::write(&tracefile, "SF:/w/checkout/src/a.rs\nDA:1,9\nend_of_record\n").unwrap();
        backdate(&tracefile);

        let mut tracer = LcovTracer::new(&tracefile);
        assert!(tracer.run(&mut || true));
        assert!(matches!(
            tracer.results(),
            Err(HarnessError::StaleTracefile { .. })
        ));
    }

    #[test]
    fn results_before_any_run_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let tracefile = dir.path().join("cov.lcov");
        fs::write(&tracefile, TRACEFILE).unwrap();
        let mut tracer = LcovTracer::new(&tracefile);
        assert!(matches!(tracer.results(), Err(HarnessError::TracerNotRun)));
    }

    #[test]
    fn missing_tracefile_is_reported() {
        let mut tracer = LcovTracer::new("/definitely/not/here.lcov");
        tracer.run(&mut || true);
        assert!(matches!(
            tracer.results(),
            Err(HarnessError::TracefileRead { .. })
        ));
    }

    #[test]
    fn writes_summary_and_annotated_sources() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("suiterun").join("src").join("calc.rs");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "fn add() {\n    1 + 1\n}\n// trailing\n").unwrap();

        let mut counts = LineCounts::new();
        counts.insert(source.clone(), [(1, 2), (2, 0), (3, 2)].into_iter().collect());
        let report = LcovReport::new(counts);

        let coverdir = dir.path().join("cover");
        let mut sink = Vec::new();
        report
            .write_results(
                &mut sink,
                &WriteOptions {
                    show_missing: true,
                    summary: true,
                    coverdir: &coverdir,
                },
            )
            .unwrap();

        let summary = String::from_utf8(sink).unwrap();
        let mut lines = summary.lines();
        assert_eq!(lines.next(), Some("lines   cov%   module   (path)"));
        assert_eq!(
            lines.next(),
            Some(format!("    3    66%   calc   ({})", source.display()).as_str())
        );

        let annotated = fs::read_dir(&coverdir)
            .unwrap()
            .map(|e| fs::read_to_string(e.unwrap().path()).unwrap())
            .next()
            .unwrap();
        assert_eq!(
            annotated,
            "    2: fn add() {\n>>>>>>     1 + 1\n    2: }\n       // trailing\n"
        );
    }
}
