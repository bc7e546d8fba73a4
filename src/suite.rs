//! Test cases and composable suites.

use std::fmt;

/// Body of a test case. Returning `Err` marks an error; panicking marks a failure.
pub type TestFn = Box<dyn Fn() -> miette::Result<()>>;

/// A single named test.
pub struct TestCase {
    name: String,
    body: TestFn,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> miette::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self) -> miette::Result<()> {
        (self.body)()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

/// One entry of a suite.
#[derive(Debug)]
pub enum SuiteMember {
    Case(TestCase),
    Suite(Suite),
}

/// An ordered collection of test cases and nested suites, runnable as a unit.
#[derive(Debug, Default)]
pub struct Suite {
    name: String,
    members: Vec<SuiteMember>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Builds a composite suite whose members are `suites`, in order.
    pub fn compose(name: impl Into<String>, suites: impl IntoIterator<Item = Suite>) -> Self {
        Self {
            name: name.into(),
            members: suites.into_iter().map(SuiteMember::Suite).collect(),
        }
    }

    /// Adds a test case, builder style.
    pub fn case<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> miette::Result<()> + 'static,
    {
        self.push_case(TestCase::new(name, body));
        self
    }

    pub fn push_case(&mut self, case: TestCase) {
        self.members.push(SuiteMember::Case(case));
    }

    pub fn push_suite(&mut self, suite: Suite) {
        self.members.push(SuiteMember::Suite(suite));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[SuiteMember] {
        &self.members
    }

    /// Names of the directly nested suites, in order.
    pub fn child_suite_names(&self) -> Vec<&str> {
        self.members
            .iter()
            .filter_map(|m| match m {
                SuiteMember::Suite(s) => Some(s.name()),
                SuiteMember::Case(_) => None,
            })
            .collect()
    }

    /// Number of test cases, counting nested suites.
    pub fn count_cases(&self) -> usize {
        self.members
            .iter()
            .map(|m| match m {
                SuiteMember::Case(_) => 1,
                SuiteMember::Suite(s) => s.count_cases(),
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count_cases() == 0
    }

    /// Visits every test case depth-first in declaration order, with its
    /// qualified name (`suite::nested::case`).
    pub fn for_each_case(&self, visit: &mut dyn FnMut(&str, &TestCase)) {
        self.walk("", visit);
    }

    fn walk(&self, prefix: &str, visit: &mut dyn FnMut(&str, &TestCase)) {
        let scope = qualify(prefix, &self.name);
        for member in &self.members {
            match member {
                SuiteMember::Case(case) => visit(&qualify(&scope, case.name()), case),
                SuiteMember::Suite(suite) => suite.walk(&scope, visit),
            }
        }
    }
}

fn qualify(prefix: &str, name: &str) -> String {
    match (prefix.is_empty(), name.is_empty()) {
        (_, true) => prefix.to_string(),
        (true, false) => name.to_string(),
        (false, false) => format!("{prefix}::{name}"),
    }
}
