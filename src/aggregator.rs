//! Imports discovered candidates through the registry and merges the suites
//! they contribute into one composite suite.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::discovery::Candidate;
use crate::error::{panic_message, ImportFailure};
use crate::registry::ModuleRegistry;
use crate::runner::with_quiet_panics;
use crate::suite::Suite;

/// What importing one candidate produced.
#[derive(Debug)]
pub enum ImportOutcome {
    /// The module imported and its suite factory returned this suite.
    Contributed(Suite),
    /// The module imported but exposes no suite factory.
    NoSuite,
    Failed(ImportFailure),
}

/// The folded result of importing every candidate.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub suites: Vec<Suite>,
    pub failures: Vec<ImportFailure>,
    /// Modules that imported without contributing a suite.
    pub silent: Vec<String>,
}

impl Aggregation {
    pub fn push(&mut self, module: &str, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Contributed(suite) => self.suites.push(suite),
            ImportOutcome::NoSuite => self.silent.push(module.to_string()),
            ImportOutcome::Failed(failure) => self.failures.push(failure),
        }
    }

    /// The composite of every contributed suite, in contribution order.
    pub fn into_suite(self) -> Suite {
        Suite::compose("", self.suites)
    }
}

/// Imports candidates from a registry and merges their suites.
pub struct Aggregator<'a> {
    registry: &'a ModuleRegistry,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self { registry }
    }

    /// Imports one candidate.
    ///
    /// Initialiser errors and panics become [`ImportOutcome::Failed`]; the
    /// panic message is not printed. A panic inside the suite factory is not
    /// caught.
    pub fn import(&self, candidate: &Candidate) -> ImportOutcome {
        let module = candidate.module.as_str();
        let Some(provider) = self.registry.get(module) else {
            return ImportOutcome::Failed(ImportFailure::NotFound {
                module: module.to_string(),
            });
        };

        if let Some(init) = provider.init {
            let attempt = with_quiet_panics(|| panic::catch_unwind(AssertUnwindSafe(init)));
            match attempt {
                Ok(Ok(())) => {}
                Ok(Err(message)) => {
                    return ImportOutcome::Failed(ImportFailure::InitFailed {
                        module: module.to_string(),
                        message,
                    })
                }
                Err(payload) => {
                    return ImportOutcome::Failed(ImportFailure::InitPanicked {
                        module: module.to_string(),
                        message: panic_message(payload.as_ref()),
                    })
                }
            }
        }

        match provider.suite {
            Some(factory) => ImportOutcome::Contributed(factory()),
            None => ImportOutcome::NoSuite,
        }
    }

    /// Imports every candidate, reporting failures and carrying on.
    pub fn collect<I>(&self, candidates: I) -> Aggregation
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut aggregation = Aggregation::default();
        for candidate in candidates {
            let outcome = self.import(&candidate);
            match &outcome {
                ImportOutcome::Failed(failure) => {
                    println!("Error importing {}", candidate.file_name);
                    warn!(%failure, "import failed");
                }
                ImportOutcome::Contributed(suite) => {
                    debug!(module = %candidate.module, cases = suite.count_cases(), "collected suite");
                }
                ImportOutcome::NoSuite => {
                    debug!(module = %candidate.module, "module has no suite factory");
                }
            }
            aggregation.push(&candidate.module, outcome);
        }
        aggregation
    }

    /// Imports every candidate and returns the composite suite.
    pub fn suite<I>(&self, candidates: I) -> Suite
    where
        I: IntoIterator<Item = Candidate>,
    {
        self.collect(candidates).into_suite()
    }
}
