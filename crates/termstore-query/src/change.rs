//! Membership changes emitted by query evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Create an active member for the component.
    Add,
    /// Drop the member: delete when unreleased, deactivate when released.
    Remove,
    /// Reactivate the member.
    Change,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Change => "change",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberChange {
    pub kind: ChangeKind,
    pub referenced_component_id: String,
    /// Existing member the change targets; `None` for `add`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
}

impl MemberChange {
    pub fn add(referenced_component_id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Add,
            referenced_component_id: referenced_component_id.into(),
            member_id: None,
        }
    }

    pub fn remove(referenced_component_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Remove,
            referenced_component_id: referenced_component_id.into(),
            member_id: Some(member_id.into()),
        }
    }

    pub fn change(referenced_component_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Change,
            referenced_component_id: referenced_component_id.into(),
            member_id: Some(member_id.into()),
        }
    }
}
