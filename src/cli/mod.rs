//! The suiterun command-line interface.
//!
//! Parses the arguments, runs the suites plainly or under the coverage
//! tracer, and turns the result into an exit status.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitCode;

use crate::cli::args::Invocation;
use crate::config::HarnessConfig;
use crate::coverage::{self, default_ignore_dirs, LcovTracer};
use crate::error::HarnessError;
use crate::registry::ModuleRegistry;
use crate::{logging, runner};

pub mod args;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every test passed.
    Passed,
    /// At least one test failed or errored.
    Failed,
    /// The arguments were rejected; nothing ran.
    Usage,
}

impl RunOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            RunOutcome::Passed
        } else {
            RunOutcome::Failed
        }
    }

    pub fn code(self) -> u8 {
        match self {
            RunOutcome::Passed => 0,
            RunOutcome::Failed => 1,
            RunOutcome::Usage => 2,
        }
    }
}

impl From<RunOutcome> for ExitCode {
    fn from(outcome: RunOutcome) -> Self {
        ExitCode::from(outcome.code())
    }
}

/// The main entry point for the binary.
pub fn run() -> ExitCode {
    logging::init();
    let result = HarnessConfig::load().and_then(|config| {
        run_from(
            std::env::args_os(),
            &config,
            &ModuleRegistry::from_inventory(),
        )
    });
    match result {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            let report = miette::Report::new(err);
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one invocation. `args` starts with the program name.
///
/// Usage errors print the usage block on stdout and return
/// [`RunOutcome::Usage`] before any test runs.
pub fn run_from<I, T>(
    args: I,
    config: &HarnessConfig,
    registry: &ModuleRegistry,
) -> Result<RunOutcome, HarnessError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
    let Some(invocation) = args::parse(argv.iter().cloned()) else {
        print!("{}", args::usage(&program_name(argv.first())));
        return Ok(RunOutcome::Usage);
    };

    let success = match invocation {
        Invocation::Test { verbosity } => runner::run(config, registry, verbosity)?,
        Invocation::Coverage {
            verbosity,
            coverdir,
        } => {
            let tracefile = config
                .tracefile
                .clone()
                .ok_or(HarnessError::MissingTracefile)?;
            let mut tracer = LcovTracer::new(tracefile).ignore_dirs(default_ignore_dirs());
            coverage::run_with_coverage(config, registry, verbosity, &coverdir, &mut tracer)?
        }
    };
    Ok(RunOutcome::from_success(success))
}

fn program_name(arg0: Option<&OsString>) -> String {
    arg0.and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "suiterun".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SuiteProvider;
    use crate::suite::Suite;
    use std::fs;
    use std::time::{Duration, SystemTime};

    fn passing() -> Suite {
        Suite::new("passing").case("holds", || Ok(()))
    }

    fn failing() -> Suite {
        Suite::new("failing").case("breaks", || {
            let (one, two) = (1, 2);
            assert!(one > two, "one is not greater than two");
            Ok(())
        })
    }

    fn config_for(dir: &Path) -> HarnessConfig {
        HarnessConfig {
            suite_dir: dir.to_path_buf(),
            color: crate::config::ColorMode::Never,
            ..HarnessConfig::default()
        }
    }

    fn registry() -> ModuleRegistry {
        ModuleRegistry::new()
            .with(SuiteProvider { module: "passing", init: None, suite: Some(passing) })
            .with(SuiteProvider { module: "failing", init: None, suite: Some(failing) })
    }

    #[test]
    fn passing_suites_give_passed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("passing.rs"), "").unwrap();
        let outcome = run_from(["prog", "-v", "-v", "mydir"], &config_for(dir.path()), &registry());
        assert_eq!(outcome.unwrap(), RunOutcome::Passed);
    }

    #[test]
    fn any_failing_test_gives_failed() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("passing.rs"), "").unwrap();
        fs::write(dir.path().join("failing.rs"), "").unwrap();
        let outcome = run_from(["prog"], &config_for(dir.path()), &registry());
        assert_eq!(outcome.unwrap(), RunOutcome::Failed);
    }

    #[test]
    fn usage_errors_run_nothing() {
        // The suite directory does not exist, so running anything would error.
        let config = config_for(Path::new("/no/such/suite/dir"));
        let cases: [&[&str]; 3] = [&["prog", "-c", "a", "b"], &["prog", "-x"], &["prog", "-c"]];
        for argv in cases {
            let outcome = run_from(argv.iter().copied(), &config, &registry());
            assert_eq!(outcome.unwrap(), RunOutcome::Usage);
        }
    }

    #[test]
    fn coverage_without_a_tracefile_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = run_from(["prog", "-c", "out"], &config_for(dir.path()), &registry());
        assert!(matches!(outcome, Err(HarnessError::MissingTracefile)));
    }

    #[test]
    fn coverage_run_rejects_a_tracefile_from_before_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let suites = dir.path().join("suites");
        fs::create_dir(&suites).unwrap();
        fs::write(suites.join("passing.rs"), "").unwrap();
        let tracefile = dir.path().join("cov.lcov");
        fs::write(&tracefile, "SF:/w/checkout/src/lib.rs\nDA:1,1\nend_of_record\n").unwrap();
        let hour_ago = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&tracefile)
            .unwrap()
            .set_modified(hour_ago)
            .unwrap();

        let config = HarnessConfig {
            tracefile: Some(tracefile),
            ..config_for(&suites)
        };
        let coverdir = dir.path().join("cover");
        let outcome = run_from(
            [OsString::from("prog"), "-c".into(), coverdir.into_os_string()],
            &config,
            &registry(),
        );
        assert!(matches!(outcome, Err(HarnessError::StaleTracefile { .. })));
    }

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [RunOutcome::Passed, RunOutcome::Failed, RunOutcome::Usage].map(RunOutcome::code);
        assert_eq!(codes, [0, 1, 2]);
    }
}
