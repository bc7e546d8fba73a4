use super::fixtures::{candidate, two_cases};
use crate::aggregator::{Aggregation, Aggregator, ImportOutcome};
use crate::error::ImportFailure;
use crate::registry::{ModuleRegistry, SuiteProvider};
use crate::suite::Suite;

inventory::submit! {
    SuiteProvider {
        module: "aggregation",
        init: None,
        suite: Some(suite),
    }
}

fn left() -> Suite {
    two_cases("left")
}

fn right() -> Suite {
    two_cases("right")
}

fn unavailable() -> Result<(), String> {
    Err("corpus not installed".to_string())
}

fn registry() -> ModuleRegistry {
    ModuleRegistry::new()
        .with(SuiteProvider { module: "left", init: None, suite: Some(left) })
        .with(SuiteProvider { module: "right", init: None, suite: Some(right) })
        .with(SuiteProvider { module: "corpus", init: Some(unavailable), suite: Some(left) })
}

fn aggregate(modules: &[&str]) -> Aggregation {
    let registry = registry();
    let aggregator = Aggregator::new(&registry);
    let mut aggregation = Aggregation::default();
    for module in modules {
        let outcome = aggregator.import(&candidate(module));
        aggregation.push(module, outcome);
    }
    aggregation
}

fn suite() -> Suite {
    Suite::new("aggregation")
        .case("contributed suites keep their order", || {
            let suite = aggregate(&["right", "left"]).into_suite();
            assert_eq!(suite.child_suite_names(), ["right", "left"]);
            assert_eq!(suite.count_cases(), 4);
            Ok(())
        })
        .case("failed imports are skipped", || {
            let aggregation = aggregate(&["corpus", "missing", "left"]);
            assert_eq!(aggregation.failures.len(), 2);
            assert!(matches!(
                &aggregation.failures[0],
                ImportFailure::InitFailed { module, .. } if module == "corpus"
            ));
            assert_eq!(aggregation.into_suite().count_cases(), 2);
            Ok(())
        })
        .case("modules without a factory contribute nothing", || {
            let registry = ModuleRegistry::new().with(SuiteProvider {
                module: "helpers",
                init: None,
                suite: None,
            });
            let outcome = Aggregator::new(&registry).import(&candidate("helpers"));
            assert!(matches!(outcome, ImportOutcome::NoSuite));
            Ok(())
        })
}
