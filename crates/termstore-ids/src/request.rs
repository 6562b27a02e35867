//! Create requests: a component together with the satellites created with it.
//!
//! A concept request may nest descriptions, relationships and members; a
//! description request may nest members. A nested request that leaves its
//! parent reference empty points at the enclosing component.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use termstore_kernel::{ComponentCategory, MemberPayload, Namespace, Result, Sctid, TermstoreError};
use uuid::Uuid;

/// Where a new component's id comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum IdStrategy {
    /// Caller-chosen id.
    Constant { id: String },
    /// Next free id of the namespace.
    Namespace { namespace: Namespace },
}

impl IdStrategy {
    pub fn constant(id: impl Into<String>) -> Self {
        Self::Constant { id: id.into() }
    }

    pub fn namespace(namespace: Namespace) -> Self {
        Self::Namespace { namespace }
    }

    pub fn constant_id(&self) -> Option<&str> {
        match self {
            Self::Constant { id } => Some(id),
            Self::Namespace { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRequest {
    pub id: IdStrategy,
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<CreateRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    pub id: IdStrategy,
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_id: Option<String>,
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<CreateRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipRequest {
    pub id: IdStrategy,
    pub module_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub type_id: String,
    pub destination_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    /// Caller-chosen member id; a fresh UUID otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub module_id: String,
    pub refset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_component_id: Option<String>,
    pub payload: MemberPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CreateRequest {
    Concept(ConceptRequest),
    Description(DescriptionRequest),
    Relationship(RelationshipRequest),
    Member(MemberRequest),
}

impl CreateRequest {
    /// Category of the component this request creates; `None` for members.
    pub fn category(&self) -> Option<ComponentCategory> {
        match self {
            Self::Concept(_) => Some(ComponentCategory::Concept),
            Self::Description(_) => Some(ComponentCategory::Description),
            Self::Relationship(_) => Some(ComponentCategory::Relationship),
            Self::Member(_) => None,
        }
    }

    pub fn id_strategy(&self) -> Option<&IdStrategy> {
        match self {
            Self::Concept(request) => Some(&request.id),
            Self::Description(request) => Some(&request.id),
            Self::Relationship(request) => Some(&request.id),
            Self::Member(_) => None,
        }
    }

    pub(crate) fn id_strategy_mut(&mut self) -> Option<&mut IdStrategy> {
        match self {
            Self::Concept(request) => Some(&mut request.id),
            Self::Description(request) => Some(&mut request.id),
            Self::Relationship(request) => Some(&mut request.id),
            Self::Member(_) => None,
        }
    }

    pub fn module_id(&self) -> &str {
        match self {
            Self::Concept(request) => &request.module_id,
            Self::Description(request) => &request.module_id,
            Self::Relationship(request) => &request.module_id,
            Self::Member(request) => &request.module_id,
        }
    }

    /// Requests created together with this one.
    pub fn nested_requests(&self) -> &[CreateRequest] {
        match self {
            Self::Concept(request) => &request.nested,
            Self::Description(request) => &request.nested,
            Self::Relationship(_) | Self::Member(_) => &[],
        }
    }

    pub(crate) fn nested_requests_mut(&mut self) -> &mut [CreateRequest] {
        match self {
            Self::Concept(request) => &mut request.nested,
            Self::Description(request) => &mut request.nested,
            Self::Relationship(_) | Self::Member(_) => &mut [],
        }
    }

    /// This request and everything nested in it, parents first.
    pub fn walk(&self) -> Vec<&CreateRequest> {
        let mut out = vec![self];
        for nested in self.nested_requests() {
            out.extend(nested.walk());
        }
        out
    }

    /// Components the whole tree refers to and that must already exist.
    ///
    /// References left empty for the enclosing component are not included.
    pub fn required_component_ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for request in self.walk() {
            ids.insert(request.module_id().to_string());
            match request {
                Self::Concept(_) => {}
                Self::Description(request) => {
                    ids.extend(request.concept_id.iter().cloned());
                    ids.insert(request.type_id.clone());
                }
                Self::Relationship(request) => {
                    ids.extend(request.source_id.iter().cloned());
                    ids.insert(request.type_id.clone());
                    ids.insert(request.destination_id.clone());
                }
                Self::Member(request) => {
                    ids.insert(request.refset_id.clone());
                    ids.extend(request.referenced_component_id.iter().cloned());
                }
            }
        }
        ids
    }

    /// Check nesting, blank references and constant ids.
    pub fn validate(&self) -> Result<()> {
        self.validate_under(None)
    }

    fn validate_under(&self, parent: Option<ComponentCategory>) -> Result<()> {
        if self.module_id().trim().is_empty() {
            return Err(TermstoreError::validation("create request has a blank moduleId"));
        }

        let category = self.category();
        let allowed_parent = match self {
            Self::Concept(_) => parent.is_none(),
            Self::Description(_) | Self::Relationship(_) => {
                matches!(parent, None | Some(ComponentCategory::Concept))
            }
            Self::Member(_) => parent != Some(ComponentCategory::Relationship),
        };
        if !allowed_parent {
            return Err(TermstoreError::validation(format!(
                "{} requests cannot be nested in {} requests",
                category.map_or("member", ComponentCategory::as_str),
                parent.map_or("no", ComponentCategory::as_str),
            )));
        }

        let missing_parent_reference = match self {
            Self::Concept(_) => None,
            Self::Description(request) => request.concept_id.is_none().then_some("conceptId"),
            Self::Relationship(request) => request.source_id.is_none().then_some("sourceId"),
            Self::Member(request) => request
                .referenced_component_id
                .is_none()
                .then_some("referencedComponentId"),
        };
        if let (Some(field), None) = (missing_parent_reference, parent) {
            return Err(TermstoreError::validation(format!(
                "top-level {} request needs a {field}",
                category.map_or("member", ComponentCategory::as_str)
            )));
        }

        if let (Some(category), Some(IdStrategy::Constant { id })) = (category, self.id_strategy()) {
            let sctid = Sctid::parse(id)?;
            if sctid.category() != category {
                return Err(TermstoreError::validation(format!(
                    "'{id}' is a {} id, not a {category} id",
                    sctid.category()
                )));
            }
        }

        self.nested_requests()
            .iter()
            .try_for_each(|nested| nested.validate_under(category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termstore_kernel::concepts::{REFSET_LANGUAGE_TYPE_US, PREFERRED};

    const MODULE: &str = "1000154104";
    const IS_A: &str = "116680003";
    const FSN: &str = "900000000000003001";

    fn namespace() -> IdStrategy {
        IdStrategy::namespace(Namespace::parse("1000154").expect("namespace"))
    }

    fn concept_tree() -> CreateRequest {
        CreateRequest::Concept(ConceptRequest {
            id: namespace(),
            module_id: MODULE.to_string(),
            nested: vec![
                CreateRequest::Description(DescriptionRequest {
                    id: namespace(),
                    module_id: MODULE.to_string(),
                    concept_id: None,
                    type_id: FSN.to_string(),
                    nested: vec![CreateRequest::Member(MemberRequest {
                        id: None,
                        module_id: MODULE.to_string(),
                        refset_id: REFSET_LANGUAGE_TYPE_US.to_string(),
                        referenced_component_id: None,
                        payload: MemberPayload::Language {
                            acceptability_id: PREFERRED.to_string(),
                        },
                    })],
                }),
                CreateRequest::Relationship(RelationshipRequest {
                    id: namespace(),
                    module_id: MODULE.to_string(),
                    source_id: None,
                    type_id: IS_A.to_string(),
                    destination_id: "404684003".to_string(),
                }),
            ],
        })
    }

    #[test]
    fn required_ids_skip_parent_references() {
        let ids = concept_tree().required_component_ids();
        assert_eq!(
            ids,
            BTreeSet::from(
                [MODULE, FSN, REFSET_LANGUAGE_TYPE_US, IS_A, "404684003"].map(String::from)
            )
        );
    }

    #[test]
    fn walk_visits_parents_first() {
        let tree = concept_tree();
        let categories: Vec<Option<ComponentCategory>> =
            tree.walk().iter().map(|request| request.category()).collect();
        assert_eq!(
            categories,
            vec![
                Some(ComponentCategory::Concept),
                Some(ComponentCategory::Description),
                None,
                Some(ComponentCategory::Relationship),
            ]
        );
    }

    #[test]
    fn validate_accepts_a_well_formed_tree() {
        concept_tree().validate().expect("valid tree");
    }

    #[test]
    fn validate_rejects_misplaced_and_orphaned_requests() {
        let relationship_in_description = CreateRequest::Description(DescriptionRequest {
            id: namespace(),
            module_id: MODULE.to_string(),
            concept_id: Some("404684003".to_string()),
            type_id: FSN.to_string(),
            nested: vec![CreateRequest::Relationship(RelationshipRequest {
                id: namespace(),
                module_id: MODULE.to_string(),
                source_id: None,
                type_id: IS_A.to_string(),
                destination_id: "404684003".to_string(),
            })],
        });
        let orphan = CreateRequest::Description(DescriptionRequest {
            id: namespace(),
            module_id: MODULE.to_string(),
            concept_id: None,
            type_id: FSN.to_string(),
            nested: vec![],
        });

        for request in [relationship_in_description, orphan] {
            let err = request.validate().expect_err("invalid tree");
            assert!(matches!(err, TermstoreError::Validation(_)), "{err}");
        }
    }

    #[test]
    fn constant_ids_must_match_the_category() {
        let request = CreateRequest::Concept(ConceptRequest {
            id: IdStrategy::constant("21000154110"),
            module_id: MODULE.to_string(),
            nested: vec![],
        });
        let err = request.validate().expect_err("description id on a concept");
        assert!(err.to_string().contains("is a description id"), "{err}");
    }

    #[test]
    fn requests_parse_from_json() {
        let request: CreateRequest = serde_json::from_value(serde_json::json!({
            "type": "concept",
            "id": { "strategy": "namespace", "namespace": "1000154" },
            "moduleId": MODULE,
            "nested": [{
                "type": "member",
                "id": "4d1e3c52-5e4b-4a51-9b38-2fa0e0c1f7a1",
                "moduleId": MODULE,
                "refsetId": "723264001",
                "payload": { "kind": "simple" }
            }]
        }))
        .expect("request should parse");

        assert_eq!(request.category(), Some(ComponentCategory::Concept));
        let CreateRequest::Member(member) = &request.nested_requests()[0] else {
            panic!("expected a nested member, got {:?}", request.nested_requests());
        };
        assert!(member.id.is_some());
        assert_eq!(member.referenced_component_id, None);
    }
}
