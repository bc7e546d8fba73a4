//! suiterun: discovers suite modules, runs their tests, and summarises line
//! coverage per module.
//!
//! The pipeline is [`discovery`] → [`aggregator`] → [`runner`], optionally
//! wrapped by [`coverage`]. [`cli`] ties it to the command line.

pub use crate::error::{HarnessError, ImportFailure};
pub use crate::registry::{ModuleRegistry, SuiteProvider};
pub use crate::suite::{Suite, TestCase};

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod contracts;
pub mod coverage;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runner;
pub mod suite;
mod suites;
