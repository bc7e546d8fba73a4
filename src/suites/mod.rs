//! The harness's own suites, discovered from this directory like any other.

mod aggregation;
mod coverage;
mod discovery;
mod fixtures;
