//! Text test runner and the plain (untraced) harness run.
//!
//! Verbosity `0` prints only the final summary, `1` prints one character
//! per test (`.`, `F`, `E`), and `2` or more prints `name ... ok` lines.
//! Details of every failure and error follow the progress output.

use std::cell::Cell;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing::debug;

use crate::aggregator::Aggregator;
use crate::config::HarnessConfig;
use crate::contracts;
use crate::discovery::Discovery;
use crate::error::{panic_message, HarnessError};
use crate::registry::ModuleRegistry;
use crate::suite::{Suite, TestCase};

const HEAVY_RULE: &str =
    "======================================================================";
const LIGHT_RULE: &str =
    "----------------------------------------------------------------------";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    /// The test panicked, usually a failed assertion.
    Failed(String),
    /// The test returned an error.
    Errored(String),
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub name: String,
    pub status: TestStatus,
}

/// Outcome of running a suite.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<TestReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn tests_run(&self) -> usize {
        self.reports.len()
    }

    pub fn failures(&self) -> usize {
        self.count(|s| matches!(s, TestStatus::Failed(_)))
    }

    pub fn errors(&self) -> usize {
        self.count(|s| matches!(s, TestStatus::Errored(_)))
    }

    /// True iff every test passed. An empty run is successful.
    pub fn was_successful(&self) -> bool {
        self.reports.iter().all(|r| r.status == TestStatus::Passed)
    }

    fn count(&self, pred: impl Fn(&TestStatus) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Runs suites one test at a time, reporting to a colour-capable stream.
pub struct TextRunner<W> {
    out: W,
    verbosity: u8,
}

impl TextRunner<StandardStream> {
    pub fn stderr(verbosity: u8, color: ColorChoice) -> Self {
        Self::new(StandardStream::stderr(color), verbosity)
    }
}

impl<W: WriteColor> TextRunner<W> {
    pub fn new(out: W, verbosity: u8) -> Self {
        Self { out, verbosity }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Runs every test of `suite` in declaration order.
    pub fn run(&mut self, suite: &Suite) -> RunSummary {
        let started = Instant::now();
        let mut reports = Vec::with_capacity(suite.count_cases());

        with_quiet_panics(|| {
            suite.for_each_case(&mut |name, case| {
                let status = execute(case);
                if let Err(err) = self.progress(name, &status) {
                    debug!(%err, "cannot write test progress");
                }
                reports.push(TestReport {
                    name: name.to_string(),
                    status,
                });
            });
        });

        let summary = RunSummary {
            reports,
            elapsed: started.elapsed(),
        };
        debug!(
            run = summary.tests_run(),
            failures = summary.failures(),
            errors = summary.errors(),
            "suite finished"
        );
        if let Err(err) = self.print_details(&summary) {
            debug!(%err, "cannot write failure details");
        }
        if let Err(err) = self.print_totals(&summary) {
            debug!(%err, "cannot write run totals");
        }
        summary
    }

    fn progress(&mut self, name: &str, status: &TestStatus) -> io::Result<()> {
        let (mark, word, color) = match status {
            TestStatus::Passed => (".", "ok", Color::Green),
            TestStatus::Failed(_) => ("F", "FAIL", Color::Red),
            TestStatus::Errored(_) => ("E", "ERROR", Color::Red),
        };
        match self.verbosity {
            0 => Ok(()),
            1 => {
                self.colored(mark, color)?;
                self.out.flush()
            }
            _ => {
                write!(self.out, "{name} ... ")?;
                self.colored(word, color)?;
                writeln!(self.out)
            }
        }
    }

    fn print_details(&mut self, summary: &RunSummary) -> io::Result<()> {
        if self.verbosity == 1 {
            writeln!(self.out)?;
        }
        for report in &summary.reports {
            let (label, message) = match &report.status {
                TestStatus::Passed => continue,
                TestStatus::Failed(message) => ("FAIL", message),
                TestStatus::Errored(message) => ("ERROR", message),
            };
            writeln!(self.out, "{HEAVY_RULE}")?;
            self.colored(label, Color::Red)?;
            writeln!(self.out, ": {}", report.name)?;
            writeln!(self.out, "{LIGHT_RULE}")?;
            writeln!(self.out, "{message}")?;
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn print_totals(&mut self, summary: &RunSummary) -> io::Result<()> {
        let run = summary.tests_run();
        writeln!(self.out, "{LIGHT_RULE}")?;
        writeln!(
            self.out,
            "Ran {run} test{} in {:.3}s",
            if run == 1 { "" } else { "s" },
            summary.elapsed.as_secs_f64()
        )?;
        writeln!(self.out)?;
        if summary.was_successful() {
            self.colored("OK", Color::Green)?;
            return writeln!(self.out);
        }
        let mut parts = Vec::new();
        if summary.failures() > 0 {
            parts.push(format!("failures={}", summary.failures()));
        }
        if summary.errors() > 0 {
            parts.push(format!("errors={}", summary.errors()));
        }
        self.colored("FAILED", Color::Red)?;
        writeln!(self.out, " ({})", parts.join(", "))
    }

    fn colored(&mut self, text: &str, color: Color) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        write!(self.out, "{text}")?;
        self.out.reset()
    }
}

fn execute(case: &TestCase) -> TestStatus {
    match panic::catch_unwind(AssertUnwindSafe(|| case.call())) {
        Ok(Ok(())) => TestStatus::Passed,
        Ok(Err(report)) => {
            let mut message = report.to_string();
            for cause in report.chain().skip(1) {
                message.push_str(&format!("\n  caused by: {cause}"));
            }
            TestStatus::Errored(message)
        }
        Err(payload) => TestStatus::Failed(panic_message(payload.as_ref())),
    }
}

static PANIC_HOOK_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static QUIET: Cell<bool> = const { Cell::new(false) };
}

/// Serialises replacement of the process-wide panic hook.
pub(crate) fn lock_panic_hook() -> MutexGuard<'static, ()> {
    PANIC_HOOK_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Runs `body` with panics on the calling thread silenced. Panics on other
/// threads still reach the previous hook, which is restored before returning
/// or unwinding. Nested calls on one thread run `body` directly.
pub(crate) fn with_quiet_panics<T>(body: impl FnOnce() -> T) -> T {
    if QUIET.with(Cell::get) {
        return body();
    }

    let _guard = lock_panic_hook();
    let owner = thread::current().id();
    let previous = Arc::new(panic::take_hook());
    let delegate = Arc::clone(&previous);
    panic::set_hook(Box::new(move |info| {
        if thread::current().id() != owner {
            (*delegate)(info);
        }
    }));
    QUIET.with(|quiet| quiet.set(true));

    let result = panic::catch_unwind(AssertUnwindSafe(body));

    QUIET.with(|quiet| quiet.set(false));
    drop(panic::take_hook());
    match Arc::try_unwrap(previous) {
        Ok(hook) => panic::set_hook(hook),
        Err(shared) => panic::set_hook(Box::new(move |info| (*shared)(info))),
    }
    match result {
        Ok(value) => value,
        Err(payload) => panic::resume_unwind(payload),
    }
}

/// Discovers, aggregates and runs the configured suites.
///
/// Returns true iff every test passed.
pub fn run(
    config: &HarnessConfig,
    registry: &ModuleRegistry,
    verbosity: u8,
) -> Result<bool, HarnessError> {
    contracts::enforce_strict();
    let candidates = Discovery::from_config(config).candidates()?;
    let suite = Aggregator::new(registry).suite(candidates);
    let mut runner = TextRunner::stderr(verbosity, config.color.choice());
    Ok(runner.run(&suite).was_successful())
}

#[cfg(test)]
pub(crate) mod panic_counter {
    use std::panic;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::thread;

    use super::lock_panic_hook;

    static SERIAL: Mutex<()> = Mutex::new(());

    /// Counts panics raised on the installing thread until dropped.
    /// Only one counter is installed at a time.
    pub(crate) struct OwnPanicCounter {
        calls: Arc<AtomicUsize>,
        restore: Option<Box<dyn FnOnce()>>,
        _serial: MutexGuard<'static, ()>,
    }

    impl OwnPanicCounter {
        pub(crate) fn install() -> Self {
            let serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let me = thread::current().id();
            let previous = {
                let _guard = lock_panic_hook();
                let previous = panic::take_hook();
                panic::set_hook(Box::new(move |_| {
                    if thread::current().id() == me {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }));
                previous
            };
            Self {
                calls,
                restore: Some(Box::new(move || {
                    let _guard = lock_panic_hook();
                    panic::set_hook(previous);
                })),
                _serial: serial,
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Drop for OwnPanicCounter {
        fn drop(&mut self) {
            if let Some(restore) = self.restore.take() {
                restore();
            }
        }
    }
}
