//! Terminology components: the identities members hang off.

use crate::effective_time::EffectiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Component category, as encoded in the SCTID partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Concept,
    Description,
    Relationship,
}

impl ComponentCategory {
    pub fn partition_digit(self) -> u8 {
        match self {
            Self::Concept => 0,
            Self::Description => 1,
            Self::Relationship => 2,
        }
    }

    pub fn from_partition_digit(digit: u32) -> Option<Self> {
        match digit {
            0 => Some(Self::Concept),
            1 => Some(Self::Description),
            2 => Some(Self::Relationship),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Description => "description",
            Self::Relationship => "relationship",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and lifecycle state of a terminology element.
///
/// Members refer to components by id only; the component itself is owned
/// by the revision store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub category: ComponentCategory,
    pub module_id: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub effective_time: EffectiveTime,
}

fn default_active() -> bool {
    true
}

impl Component {
    /// A new, active, unpublished component.
    pub fn new(
        id: impl Into<String>,
        category: ComponentCategory,
        module_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            module_id: module_id.into(),
            active: true,
            released: false,
            effective_time: EffectiveTime::UNSET,
        }
    }

    pub fn concept(id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self::new(id, ComponentCategory::Concept, module_id)
    }

    pub fn description(id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self::new(id, ComponentCategory::Description, module_id)
    }

    pub fn relationship(id: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self::new(id, ComponentCategory::Relationship, module_id)
    }

    /// Mark the component as part of a published release.
    pub fn published(mut self, effective_time: EffectiveTime) -> Self {
        self.released = true;
        self.effective_time = effective_time;
        self
    }
}
