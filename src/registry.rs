use std::collections::BTreeMap;

use crate::error::RegistryError;
use crate::problem::{GithubIssueProblem, PROBLEM_NAME};

/// Name -> problem table handed to the training framework.
#[derive(Debug, Default)]
pub struct Registry {
    problems: BTreeMap<String, GithubIssueProblem>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the GitHub issue problem under its usual name.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .problems
            .insert(PROBLEM_NAME.to_owned(), GithubIssueProblem::default());
        registry
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        problem: GithubIssueProblem,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.problems.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.problems.insert(name, problem);
        Ok(())
    }

    pub fn problem(&self, name: &str) -> Result<&GithubIssueProblem, RegistryError> {
        self.problems
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.problems.keys().map(String::as_str)
    }
}
