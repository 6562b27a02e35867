//! Query and module resolution seams.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use termstore_kernel::{Component, Result, TermstoreError};

/// One page of component ids matched by a query expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdPage {
    /// Matching ids, ascending.
    pub ids: Vec<String>,
    /// Continuation token; `None` once the last page was returned.
    pub search_after: Option<String>,
}

/// Resolves a set expression to the component ids it matches.
///
/// The expression language itself is opaque to the editing core.
pub trait QueryResolver {
    /// Matching ids strictly after `after`, at most `limit` of them.
    fn resolve_page(&self, expression: &str, after: Option<&str>, limit: usize) -> Result<IdPage>;

    /// The subset of `candidates` that the expression matches.
    fn matching(
        &self,
        expression: &str,
        candidates: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>>;
}

/// Expression results fixed up front.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueryResolver {
    results: BTreeMap<String, BTreeSet<String>>,
}

impl MemoryQueryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<I, S>(mut self, expression: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(expression, ids);
        self
    }

    /// Replace what `expression` resolves to.
    pub fn set<I, S>(&mut self, expression: &str, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.results.insert(
            expression.trim().to_string(),
            ids.into_iter().map(Into::into).collect(),
        );
    }

    fn lookup(&self, expression: &str) -> Result<&BTreeSet<String>> {
        let key = expression.trim();
        if key.is_empty() {
            return Err(TermstoreError::validation("query expression is blank"));
        }
        self.results.get(key).ok_or_else(|| {
            TermstoreError::validation(format!("unresolvable query expression '{key}'"))
        })
    }
}

impl QueryResolver for MemoryQueryResolver {
    fn resolve_page(&self, expression: &str, after: Option<&str>, limit: usize) -> Result<IdPage> {
        if limit == 0 {
            return Err(TermstoreError::validation("query page size must be positive"));
        }
        let ids = self.lookup(expression)?;
        let lower = match after {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        let mut page: Vec<String> = ids
            .range::<str, _>((lower, Bound::Unbounded))
            .take(limit + 1)
            .cloned()
            .collect();
        let search_after = if page.len() > limit {
            page.truncate(limit);
            page.last().cloned()
        } else {
            None
        };
        Ok(IdPage {
            ids: page,
            search_after,
        })
    }

    fn matching(
        &self,
        expression: &str,
        candidates: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        let ids = self.lookup(expression)?;
        Ok(candidates.intersection(ids).cloned().collect())
    }
}

/// Picks the module id recorded on members created or touched on behalf of
/// a component.
pub trait ModuleResolver {
    fn resolve(&self, component: &Component) -> String;
}

/// The component's own module.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentModule;

impl ModuleResolver for ComponentModule {
    fn resolve(&self, component: &Component) -> String {
        component.module_id.clone()
    }
}

/// One module for every edit, e.g. the module of the current authoring task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedModule(pub String);

impl ModuleResolver for FixedModule {
    fn resolve(&self, _component: &Component) -> String {
        self.0.clone()
    }
}
