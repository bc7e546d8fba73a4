//! Turns a tracer summary into the coverage table.
//!
//! Summary rows look like `   40    75%   aggregator   (/w/checkout/src/aggregator.rs)`.
//! Each row for a file under the configured source root becomes a
//! [`CoverageRecord`] named by its dotted module path.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::config::HarnessConfig;
use crate::contracts;

static SUMMARY_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s+(\d+)%\s+\S+\s+\((\S+)\)\s*$").expect("summary row pattern is valid")
});

const TABLE_HEADER: &str = "Coverage  Lines  Module";
const TABLE_RULE_WIDTH: usize = 36;

/// One row of the coverage table.
///
/// Field order gives the table order: percent, then line count, then name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CoverageRecord {
    pub percent: u32,
    pub lines: u32,
    pub module: String,
}

/// Parses the summary, keeping rows under the source root outside the test
/// namespace, sorted worst-covered first.
pub fn parse_summary(summary: &str, config: &HarnessConfig) -> Vec<CoverageRecord> {
    let mut records: Vec<CoverageRecord> = summary
        .lines()
        .filter_map(|line| parse_row(line, config))
        .collect();
    records.sort();
    records
}

fn parse_row(line: &str, config: &HarnessConfig) -> Option<CoverageRecord> {
    let caps = SUMMARY_ROW.captures(line)?;
    let path = &caps[3];
    // The tracer's ignore list does not catch everything outside the package.
    let Some(relative) = relative_to_root(path, &config.source_root) else {
        trace!(path, "outside the source root");
        return None;
    };
    let lines: u32 = caps[1].parse().ok()?;
    let percent: u32 = caps[2].parse().ok()?;
    contracts::check(percent <= 100, || format!("coverage of {path} is {percent}%"));

    let module = module_name(
        &relative,
        &config.root_package,
        &config.bootstrap_file,
        &config.source_extension,
    );
    if module.starts_with(&config.test_namespace) {
        trace!(%module, "harness module hidden from the table");
        return None;
    }
    Some(CoverageRecord {
        percent,
        lines,
        module,
    })
}

/// The part of `path` below `root`, or `None` for files outside it.
///
/// Both sides are compared with `/` separators.
pub fn relative_to_root(path: &str, root: &Path) -> Option<String> {
    let path = path.replace('\\', "/");
    let root = root.to_string_lossy().replace('\\', "/");
    path.strip_prefix(root.trim_end_matches('/'))?
        .strip_prefix('/')
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// Dotted module name for a path relative to the package checkout.
///
/// A leading `src/` is dropped, a trailing bootstrap file names its
/// directory, the extension is dropped and separators become dots. The
/// result is prefixed with `package`.
pub fn module_name(relative: &str, package: &str, bootstrap_file: &str, extension: &str) -> String {
    let relative = relative.replace('\\', "/");
    let relative = relative.trim_start_matches('/');
    let rest = relative.strip_prefix("src/").unwrap_or(relative);

    let rest = if rest == bootstrap_file {
        ""
    } else {
        rest.strip_suffix(bootstrap_file)
            .and_then(|dir| dir.strip_suffix('/'))
            .unwrap_or(rest)
    };
    let rest = rest
        .strip_suffix(extension)
        .and_then(|stem| stem.strip_suffix('.'))
        .unwrap_or(rest);

    if rest.is_empty() {
        package.to_string()
    } else {
        format!("{package}.{}", rest.replace('/', "."))
    }
}

/// Renders the table; an empty slice gives the header and rule only.
pub fn format_table(records: &[CoverageRecord]) -> String {
    let mut table = format!("{TABLE_HEADER}\n{}\n", "-".repeat(TABLE_RULE_WIDTH));
    for record in records {
        table.push_str(&format!(
            "{:>5}%   {:>5}   {}\n",
            record.percent, record.lines, record.module
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(percent: u32, lines: u32, module: &str) -> CoverageRecord {
        CoverageRecord {
            percent,
            lines,
            module: module.to_string(),
        }
    }

    #[test]
    fn sorts_by_percent_then_lines_then_name() {
        let mut records = vec![record(80, 10, "a"), record(50, 5, "b"), record(50, 20, "c")];
        records.sort();
        let order: Vec<_> = records.iter().map(|r| r.module.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_percent_and_lines_fall_back_to_name() {
        let mut records = vec![record(50, 5, "zeta"), record(50, 5, "alpha")];
        records.sort();
        assert_eq!(records[0].module, "alpha");
    }

    #[test]
    fn module_names_are_dotted_paths_under_the_package() {
        let name = |path| module_name(path, "suiterun", "mod.rs", "rs");
        assert_eq!(name("src/aggregator.rs"), "suiterun.aggregator");
        assert_eq!(name("src/coverage/mod.rs"), "suiterun.coverage");
        assert_eq!(name("src/coverage/lcov.rs"), "suiterun.coverage.lcov");
        assert_eq!(name("src\\cli\\args.rs"), "suiterun.cli.args");
        assert_eq!(name("mod.rs"), "suiterun");
        assert_eq!(name("src/barmod.rs"), "suiterun.barmod");
    }

    #[test]
    fn other_layouts_normalise_too() {
        let name = |path| module_name(path, "nltk", "__init__.py", "py");
        assert_eq!(name("token.py"), "nltk.token");
        assert_eq!(name("parser/__init__.py"), "nltk.parser");
        assert_eq!(name("__init__.py"), "nltk");
    }

    #[test]
    fn paths_are_taken_relative_to_the_source_root() {
        let root = Path::new("/root/crate");
        assert_eq!(
            relative_to_root("/root/crate/src/runner.rs", root).as_deref(),
            Some("src/runner.rs")
        );
        assert_eq!(
            relative_to_root("/root/crate/", Path::new("/root/crate/")),
            None
        );
        assert_eq!(relative_to_root("/root/crates/src/lib.rs", root), None);
        assert_eq!(relative_to_root("/opt/deps/suiterun/src/lib.rs", root), None);
        assert_eq!(
            relative_to_root("C:\\src\\crate\\src\\lib.rs", Path::new("C:\\src\\crate")).as_deref(),
            Some("src/lib.rs")
        );
    }

    fn rooted_at(root: &str) -> HarnessConfig {
        HarnessConfig {
            source_root: root.into(),
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn checkout_directory_need_not_be_named_after_the_package() {
        let summary = "\
   40    75%   aggregator   (/root/crate/src/aggregator.rs)
   12    10%   coverage   (/root/crate/src/suites/coverage.rs)
  300    90%   lib   (/home/u/.cargo/registry/src/suiterun-0.1.0/src/lib.rs)
";
        assert_eq!(
            parse_summary(summary, &rooted_at("/root/crate")),
            vec![record(75, 40, "suiterun.aggregator")]
        );
    }

    #[test]
    fn test_namespace_and_foreign_rows_are_dropped() {
        let summary = "lines   cov%   module   (path)\n\
                       \x20  10    80%   a   (/w/checkout/src/a.rs)\n\
                       \x20   5    50%   b   (/w/checkout/src/b.rs)\n\
                       \x20  20    50%   c   (/w/checkout/src/c.rs)\n\
                       \x20  99     1%   lexer   (/w/checkout/src/suites/lexer.rs)\n\
                       \x20  50    20%   walkdir   (/home/u/.cargo/registry/walkdir/src/lib.rs)\n\
                       not a summary row\n";
        let records = parse_summary(summary, &rooted_at("/w/checkout"));
        assert_eq!(
            records,
            vec![
                record(50, 5, "suiterun.b"),
                record(50, 20, "suiterun.c"),
                record(80, 10, "suiterun.a"),
            ]
        );
    }

    #[test]
    fn empty_table_keeps_header_and_rule() {
        assert_eq!(
            format_table(&[]),
            "Coverage  Lines  Module\n------------------------------------\n"
        );
    }

    #[test]
    fn rows_are_right_aligned() {
        let table = format_table(&[record(7, 123, "suiterun.cli")]);
        assert!(table.ends_with("    7%     123   suiterun.cli\n"));
    }
}
