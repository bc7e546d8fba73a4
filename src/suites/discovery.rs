use miette::ensure;

use crate::config::HarnessConfig;
use crate::discovery::Discovery;
use crate::registry::SuiteProvider;
use crate::suite::Suite;

inventory::submit! {
    SuiteProvider {
        module: "discovery",
        init: None,
        suite: Some(suite),
    }
}

fn suite() -> Suite {
    Suite::new("discovery")
        .case("finds the built-in suite modules", || {
            let config = HarnessConfig::default();
            let candidates = Discovery::from_config(&config).candidates()?;
            let modules: Vec<_> = candidates.iter().map(|c| c.module.as_str()).collect();
            for expected in ["aggregation", "coverage", "discovery", "fixtures"] {
                ensure!(modules.contains(&expected), "{expected} was not discovered");
            }
            ensure!(!modules.contains(&"mod"), "the bootstrap file was discovered");
            Ok(())
        })
        .case("candidates come in file-name order", || {
            let candidates = Discovery::from_config(&HarnessConfig::default())
                .candidates()?;
            let mut sorted = candidates.clone();
            sorted.sort_by(|a, b| a.file_name.cmp(&b.file_name));
            assert_eq!(candidates, sorted);
            Ok(())
        })
        .case("a missing directory is an error", || {
            let result = Discovery::new("/no/such/suite/dir", "rs", "mod.rs").candidates();
            ensure!(result.is_err(), "discovery of a missing directory succeeded");
            Ok(())
        })
}
