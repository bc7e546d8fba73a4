//! Shared data for the built-in suites. Registers no suite of its own.

use std::path::PathBuf;

use crate::discovery::Candidate;
use crate::registry::SuiteProvider;
use crate::suite::Suite;

inventory::submit! {
    SuiteProvider {
        module: "fixtures",
        init: None,
        suite: None,
    }
}

/// Checkout directory of [`SAMPLE_SUMMARY`], not named after the package.
pub(crate) const SAMPLE_ROOT: &str = "/w/checkout";

/// A tracer summary mixing package rows, harness rows and a dependency.
pub(crate) const SAMPLE_SUMMARY: &str = "\
lines   cov%   module   (path)
   10    80%   a   (/w/checkout/src/a.rs)
    5    50%   b   (/w/checkout/src/b.rs)
   20    50%   c   (/w/checkout/src/c.rs)
   31    95%   coverage   (/w/checkout/src/suites/coverage.rs)
  412    12%   lib   (/home/u/.cargo/registry/src/regex-1.11.1/src/lib.rs)
";

pub(crate) fn candidate(module: &str) -> Candidate {
    Candidate {
        module: module.to_string(),
        file_name: format!("{module}.rs"),
        path: PathBuf::from(format!("{module}.rs")),
    }
}

pub(crate) fn two_cases(name: &'static str) -> Suite {
    Suite::new(name).case("first", || Ok(())).case("second", || Ok(()))
}
