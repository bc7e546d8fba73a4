//! Suite modules known to the harness.
//!
//! A suite module announces itself with a [`SuiteProvider`]:
//!
//! ```rust,ignore
//! fn suite() -> Suite {
//!     Suite::new("lexer").case("tokens", || Ok(()))
//! }
//!
//! inventory::submit! {
//!     suiterun::SuiteProvider {
//!         module: "lexer",
//!         init: None,
//!         suite: Some(suite),
//!     }
//! }
//! ```
//!
//! The module name must match the stem of the file that defines it in the
//! suite directory; discovery finds the file, the registry supplies the code.

use std::collections::BTreeMap;

use crate::suite::Suite;

/// Initialiser run when a module is imported. An `Err` is an import failure.
pub type InitFn = fn() -> Result<(), String>;

/// Zero-argument constructor of the suite a module contributes.
pub type SuiteFactory = fn() -> Suite;

#[derive(Debug, Clone, Copy)]
pub struct SuiteProvider {
    pub module: &'static str,
    pub init: Option<InitFn>,
    pub suite: Option<SuiteFactory>,
}

inventory::collect!(SuiteProvider);

/// Lookup table from module name to provider.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    providers: BTreeMap<&'static str, SuiteProvider>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider submitted with `inventory::submit!` in the linked program.
    pub fn from_inventory() -> Self {
        inventory::iter::<SuiteProvider>
            .into_iter()
            .copied()
            .fold(Self::new(), |registry, provider| registry.with(provider))
    }

    /// Registers a provider. A later provider for the same module replaces the earlier one.
    pub fn register(&mut self, provider: SuiteProvider) {
        if self.providers.insert(provider.module, provider).is_some() {
            tracing::warn!(module = provider.module, "suite module registered twice");
        }
    }

    pub fn with(mut self, provider: SuiteProvider) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, module: &str) -> Option<&SuiteProvider> {
        self.providers.get(module)
    }

    pub fn modules(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> Suite {
        Suite::new("empty")
    }

    #[test]
    fn later_registration_wins() {
        let registry = ModuleRegistry::new()
            .with(SuiteProvider {
                module: "a",
                init: None,
                suite: None,
            })
            .with(SuiteProvider {
                module: "a",
                init: None,
                suite: Some(empty),
            });
        assert_eq!(registry.len(), 1);
        assert!(registry.get("a").unwrap().suite.is_some());
    }

    #[test]
    fn inventory_holds_the_builtin_suites() {
        let registry = ModuleRegistry::from_inventory();
        let modules: Vec<_> = registry.modules().collect();
        assert!(modules.contains(&"coverage"));
        assert!(modules.contains(&"discovery"));
        assert!(modules.contains(&"fixtures"));
    }
}
