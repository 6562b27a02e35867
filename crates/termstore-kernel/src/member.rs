//! Reference-set members: satellite records attached to components.

use crate::effective_time::EffectiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Type tag of a member payload; the key of the member-kind registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKindTag {
    Simple,
    Association,
    Language,
    AttributeValue,
    Query,
}

impl MemberKindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Association => "association",
            Self::Language => "language",
            Self::AttributeValue => "attribute_value",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for MemberKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific member fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemberPayload {
    Simple,
    #[serde(rename_all = "camelCase")]
    Association { target_component_id: String },
    #[serde(rename_all = "camelCase")]
    Language { acceptability_id: String },
    #[serde(rename_all = "camelCase")]
    AttributeValue { value_id: String },
    Query { query: String },
}

impl MemberPayload {
    pub fn kind(&self) -> MemberKindTag {
        match self {
            Self::Simple => MemberKindTag::Simple,
            Self::Association { .. } => MemberKindTag::Association,
            Self::Language { .. } => MemberKindTag::Language,
            Self::AttributeValue { .. } => MemberKindTag::AttributeValue,
            Self::Query { .. } => MemberKindTag::Query,
        }
    }

    /// The single value reconciliation compares against, if the kind has one.
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Simple => None,
            Self::Association {
                target_component_id,
            } => Some(target_component_id),
            Self::Language { acceptability_id } => Some(acceptability_id),
            Self::AttributeValue { value_id } => Some(value_id),
            Self::Query { query } => Some(query),
        }
    }

    /// Payload of `kind` carrying `value`. `Simple` ignores the value.
    pub fn from_value(kind: MemberKindTag, value: impl Into<String>) -> Self {
        let value = value.into();
        match kind {
            MemberKindTag::Simple => Self::Simple,
            MemberKindTag::Association => Self::Association {
                target_component_id: value,
            },
            MemberKindTag::Language => Self::Language {
                acceptability_id: value,
            },
            MemberKindTag::AttributeValue => Self::AttributeValue { value_id: value },
            MemberKindTag::Query => Self::Query { query: value },
        }
    }

    /// Same kind, different value. `Simple` payloads have nothing to retarget.
    pub fn with_value(&self, value: impl Into<String>) -> Self {
        Self::from_value(self.kind(), value)
    }
}

/// One membership record of a reference set.
///
/// The id is a UUID that stays stable for the member's whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub refset_id: String,
    pub referenced_component_id: String,
    pub module_id: String,
    pub active: bool,
    #[serde(default)]
    pub released: bool,
    #[serde(default)]
    pub effective_time: EffectiveTime,
    pub payload: MemberPayload,
}

impl Member {
    /// A new active, unpublished member with a fresh random id.
    pub fn new(
        refset_id: impl Into<String>,
        referenced_component_id: impl Into<String>,
        module_id: impl Into<String>,
        payload: MemberPayload,
    ) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            refset_id,
            referenced_component_id,
            module_id,
            payload,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        refset_id: impl Into<String>,
        referenced_component_id: impl Into<String>,
        module_id: impl Into<String>,
        payload: MemberPayload,
    ) -> Self {
        Self {
            id: id.into(),
            refset_id: refset_id.into(),
            referenced_component_id: referenced_component_id.into(),
            module_id: module_id.into(),
            active: true,
            released: false,
            effective_time: EffectiveTime::UNSET,
            payload,
        }
    }

    pub fn kind(&self) -> MemberKindTag {
        self.payload.kind()
    }

    pub fn value(&self) -> Option<&str> {
        self.payload.value()
    }

    /// Mark the member as part of a published release.
    pub fn published(mut self, effective_time: EffectiveTime) -> Self {
        self.released = true;
        self.effective_time = effective_time;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Compare everything a release publishes, ignoring publication bookkeeping
    /// (`released`, `effectiveTime`).
    pub fn same_content(&self, other: &Member) -> bool {
        self.id == other.id
            && self.refset_id == other.refset_id
            && self.referenced_component_id == other.referenced_component_id
            && self.module_id == other.module_id
            && self.active == other.active
            && self.payload == other.payload
    }
}
