//! Desired states a component's members are reconciled against.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use termstore_kernel::{Result, TermstoreError};

/// Historical association targets, keyed by association refset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationTargets(BTreeMap<String, BTreeSet<String>>);

impl AssociationTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, refset_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        self.insert(refset_id, target_id);
        self
    }

    pub fn insert(&mut self, refset_id: impl Into<String>, target_id: impl Into<String>) {
        self.0
            .entry(refset_id.into())
            .or_default()
            .insert(target_id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeSet::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(refset_id, targets)| {
            targets
                .iter()
                .map(move |target| (refset_id.as_str(), target.as_str()))
        })
    }

    pub(crate) fn into_map(self) -> BTreeMap<String, BTreeSet<String>> {
        self.0
    }
}

/// Language acceptability, keyed by language refset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcceptabilityMap(BTreeMap<String, String>);

impl AcceptabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, refset_id: impl Into<String>, acceptability_id: impl Into<String>) -> Self {
        self.0.insert(refset_id.into(), acceptability_id.into());
        self
    }

    pub fn get(&self, refset_id: &str) -> Option<&str> {
        self.0.get(refset_id).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(refset_id, value)| (refset_id.as_str(), value.as_str()))
    }
}

/// Target of a single-valued member such as the inactivation indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum SingletonValue {
    #[default]
    Unchanged,
    Cleared,
    Value(String),
}

/// What one category of a component's members should become.
///
/// A missing map leaves the category untouched; an empty map clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DesiredState {
    Associations {
        #[serde(default)]
        targets: Option<AssociationTargets>,
    },
    Acceptability {
        #[serde(default)]
        acceptability: Option<AcceptabilityMap>,
    },
    InactivationIndicator {
        #[serde(default)]
        value: SingletonValue,
    },
}

impl DesiredState {
    pub fn associations(targets: AssociationTargets) -> Self {
        Self::Associations {
            targets: Some(targets),
        }
    }

    pub fn acceptability(acceptability: AcceptabilityMap) -> Self {
        Self::Acceptability {
            acceptability: Some(acceptability),
        }
    }

    pub fn inactivation_indicator(value: SingletonValue) -> Self {
        Self::InactivationIndicator { value }
    }

    pub fn is_unchanged(&self) -> bool {
        match self {
            Self::Associations { targets } => targets.is_none(),
            Self::Acceptability { acceptability } => acceptability.is_none(),
            Self::InactivationIndicator { value } => *value == SingletonValue::Unchanged,
        }
    }

    /// Every (refset, value) pair the state asks for.
    pub(crate) fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            Self::Associations { targets } => {
                targets.iter().flat_map(AssociationTargets::iter).collect()
            }
            Self::Acceptability { acceptability } => {
                acceptability.iter().flat_map(AcceptabilityMap::iter).collect()
            }
            Self::InactivationIndicator { value } => match value {
                SingletonValue::Value(value) => vec![("inactivation indicator", value.as_str())],
                SingletonValue::Unchanged | SingletonValue::Cleared => Vec::new(),
            },
        }
    }

    /// Reject blank refset ids and values.
    ///
    /// Kind-specific value checks run when the state is planned.
    pub fn validate(&self) -> Result<()> {
        for (refset_id, value) in self.entries() {
            if refset_id.trim().is_empty() {
                return Err(TermstoreError::validation("desired state names a blank refset"));
            }
            if value.trim().is_empty() {
                return Err(TermstoreError::validation(format!(
                    "desired value for '{refset_id}' is blank"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn association_targets_iterate_in_key_order() {
        let targets = AssociationTargets::new()
            .with("900000000000527005", "71388002")
            .with("900000000000526001", "404684003")
            .with("900000000000527005", "22298006");
        assert_eq!(targets.len(), 3);
        assert_eq!(
            targets.iter().collect::<Vec<_>>(),
            vec![
                ("900000000000526001", "404684003"),
                ("900000000000527005", "22298006"),
                ("900000000000527005", "71388002"),
            ]
        );
    }

    #[test]
    fn desired_state_json_forms() {
        let unchanged: DesiredState =
            serde_json::from_str(r#"{"kind":"associations"}"#).expect("parses");
        assert!(unchanged.is_unchanged());

        let cleared: DesiredState =
            serde_json::from_str(r#"{"kind":"acceptability","acceptability":{}}"#).expect("parses");
        assert!(!cleared.is_unchanged());

        let indicator: DesiredState = serde_json::from_str(
            r#"{"kind":"inactivation_indicator","value":{"state":"value","value":"900000000000482003"}}"#,
        )
        .expect("parses");
        assert_eq!(
            indicator,
            DesiredState::inactivation_indicator(SingletonValue::Value(
                "900000000000482003".to_string()
            ))
        );
    }

    #[test]
    fn blank_entries_are_rejected() {
        let blank_value = DesiredState::acceptability(AcceptabilityMap::new().with("900000000000509007", " "));
        assert!(matches!(
            blank_value.validate(),
            Err(TermstoreError::Validation(msg)) if msg.contains("900000000000509007")
        ));

        let blank_refset = DesiredState::associations(AssociationTargets::new().with("", "404684003"));
        assert!(blank_refset.validate().is_err());

        assert!(
            DesiredState::inactivation_indicator(SingletonValue::Cleared)
                .validate()
                .is_ok()
        );
    }
}
