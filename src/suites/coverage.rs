use miette::ensure;

use super::fixtures::{SAMPLE_ROOT, SAMPLE_SUMMARY};
use crate::config::HarnessConfig;
use crate::coverage::{format_table, module_name, parse_summary};
use crate::registry::SuiteProvider;
use crate::suite::Suite;

inventory::submit! {
    SuiteProvider {
        module: "coverage",
        init: None,
        suite: Some(suite),
    }
}

fn sample_config() -> HarnessConfig {
    HarnessConfig {
        source_root: SAMPLE_ROOT.into(),
        ..HarnessConfig::default()
    }
}

fn suite() -> Suite {
    Suite::new("coverage")
        .case("worst covered modules come first", || {
            let records = parse_summary(SAMPLE_SUMMARY, &sample_config());
            let order: Vec<_> = records.iter().map(|r| r.module.as_str()).collect();
            assert_eq!(order, ["suiterun.b", "suiterun.c", "suiterun.a"]);
            Ok(())
        })
        .case("harness and dependency rows are hidden", || {
            let records = parse_summary(SAMPLE_SUMMARY, &sample_config());
            ensure!(
                records.iter().all(|r| !r.module.starts_with("suiterun.suites")),
                "suite modules leaked into the table"
            );
            ensure!(records.len() == 3, "expected 3 rows, got {}", records.len());
            Ok(())
        })
        .case("empty table is header and rule", || {
            let rule = "-".repeat(36);
            assert_eq!(format_table(&[]), format!("Coverage  Lines  Module\n{rule}\n"));
            Ok(())
        })
        .case("bootstrap files name their directory", || {
            assert_eq!(
                module_name("src/coverage/mod.rs", "suiterun", "mod.rs", "rs"),
                "suiterun.coverage"
            );
            Ok(())
        })
}
