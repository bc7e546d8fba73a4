//! Command-line grammar: `suiterun [-v]... [-c | --coverage] [COVERDIR]`.
//!
//! Anything outside the grammar, including `--help`, is a usage error.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "suiterun",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct HarnessArgs {
    /// Print more test output. Repeat for more detail.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run under the coverage tracer and write results to COVERDIR.
    #[arg(short, long)]
    pub coverage: bool,

    /// Directory receiving coverage results. Ignored without --coverage.
    #[arg(value_name = "COVERDIR")]
    pub coverdir: Option<PathBuf>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Test { verbosity: u8 },
    Coverage { verbosity: u8, coverdir: PathBuf },
}

impl HarnessArgs {
    /// `None` when coverage is requested without a directory.
    pub fn invocation(self) -> Option<Invocation> {
        match (self.coverage, self.coverdir) {
            (false, _) => Some(Invocation::Test {
                verbosity: self.verbose,
            }),
            (true, Some(coverdir)) => Some(Invocation::Coverage {
                verbosity: self.verbose,
                coverdir,
            }),
            (true, None) => None,
        }
    }
}

/// Parses a full argument vector (program name first). `None` means usage error.
pub fn parse<I, T>(args: I) -> Option<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    HarnessArgs::try_parse_from(args).ok()?.invocation()
}

/// The two-line usage block.
pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [-v]... [-c | --coverage] [COVERDIR]\n  \
         -v, --verbose: more test output (repeatable)   -c, --coverage: write coverage results to COVERDIR\n"
    )
}
