//! Integration tests: identifier allocation inside create transactions.

use std::collections::BTreeSet;
use termstore_ids::{
    ConceptRequest, CreateExecutor, CreateRequest, DescriptionRequest, IdAllocator, IdStrategy,
    MemberRequest, RelationshipRequest,
};
use termstore_kernel::concepts::{
    MODULE_SCT_CORE, PREFERRED, REFSET_LANGUAGE_TYPE_US, ROOT_CONCEPT,
};
use termstore_kernel::{
    Component, ComponentCategory, EditConfig, MemberPayload, Namespace, Sctid, TermstoreError,
};
use termstore_store::{IdentifierRecorder, MemoryIdentifierRecorder, MemoryRevisionStore, RevisionStore};
use uuid::Uuid;

const FSN: &str = "900000000000003001";
const IS_A: &str = "116680003";

fn namespace() -> Namespace {
    Namespace::parse("1000154").expect("namespace")
}

fn generated() -> IdStrategy {
    IdStrategy::namespace(namespace())
}

fn store() -> MemoryRevisionStore {
    MemoryRevisionStore::from_snapshot(
        [MODULE_SCT_CORE, FSN, IS_A, ROOT_CONCEPT, REFSET_LANGUAGE_TYPE_US]
            .into_iter()
            .map(|id| Component::concept(id, MODULE_SCT_CORE))
            .collect(),
        vec![],
    )
    .expect("store should build")
}

fn concept_tree(member_id: Option<Uuid>) -> CreateRequest {
    CreateRequest::Concept(ConceptRequest {
        id: generated(),
        module_id: MODULE_SCT_CORE.to_string(),
        nested: vec![
            CreateRequest::Description(DescriptionRequest {
                id: generated(),
                module_id: MODULE_SCT_CORE.to_string(),
                concept_id: None,
                type_id: FSN.to_string(),
                nested: vec![CreateRequest::Member(MemberRequest {
                    id: member_id,
                    module_id: MODULE_SCT_CORE.to_string(),
                    refset_id: REFSET_LANGUAGE_TYPE_US.to_string(),
                    referenced_component_id: None,
                    payload: MemberPayload::Language {
                        acceptability_id: PREFERRED.to_string(),
                    },
                })],
            }),
            CreateRequest::Relationship(RelationshipRequest {
                id: generated(),
                module_id: MODULE_SCT_CORE.to_string(),
                source_id: None,
                type_id: IS_A.to_string(),
                destination_id: ROOT_CONCEPT.to_string(),
            }),
        ],
    })
}

fn three_concepts() -> Vec<CreateRequest> {
    (0..3)
        .map(|_| {
            CreateRequest::Concept(ConceptRequest {
                id: generated(),
                module_id: MODULE_SCT_CORE.to_string(),
                nested: vec![],
            })
        })
        .collect()
}

#[test]
fn exhausted_namespace_rolls_back_the_transaction() {
    let mut store = MemoryRevisionStore::from_snapshot(
        vec![
            Component::concept(MODULE_SCT_CORE, MODULE_SCT_CORE),
            Component::concept("11000154102", MODULE_SCT_CORE),
            Component::concept("21000154106", MODULE_SCT_CORE),
        ],
        vec![],
    )
    .expect("store should build");
    let before = store.components();
    let mut recorder = MemoryIdentifierRecorder::new().with_item_limit(4);

    let err = CreateExecutor::new(&EditConfig::default())
        .execute(&mut store, &mut recorder, three_concepts(), "three concepts")
        .expect_err("only two ids are reachable");
    assert_eq!(
        err,
        TermstoreError::ExhaustedResource {
            namespace: "1000154".to_string(),
            category: "concept".to_string(),
            requested: 3,
            allocated: 2,
        }
    );

    assert_eq!(store.components(), before);
    assert!(!store.has_pending_changes());
    assert!(store.history().is_empty());
    assert_eq!(recorder.assigned().count(), 0);

    // The released reservations are handed out again.
    let ticket = IdAllocator::default()
        .allocate(&store, &mut recorder, ComponentCategory::Concept, &namespace(), 2)
        .expect("two ids remain");
    assert_eq!(ticket.ids, vec!["31000154108", "41000154101"]);
}

#[test]
fn allocated_ids_are_unique_and_unused() {
    let mut store = store();
    let mut recorder = MemoryIdentifierRecorder::new();
    let executor = CreateExecutor::new(&EditConfig::default());
    let mut seen = BTreeSet::new();

    for round in 0..3 {
        let requests = vec![concept_tree(None), concept_tree(None)];
        let before: Vec<String> = store.components().into_iter().map(|c| c.id).collect();
        let outcome = executor
            .execute(&mut store, &mut recorder, requests, &format!("round {round}"))
            .expect("execute");

        let allocated: Vec<&String> = outcome.tickets.iter().flat_map(|ticket| &ticket.ids).collect();
        assert_eq!(allocated.len(), 6);
        for id in allocated {
            assert!(!before.contains(id), "{id} existed before the round");
            assert!(seen.insert(id.clone()), "{id} handed out twice");
            let sctid = Sctid::parse(id).expect("allocated ids are valid SCTIDs");
            assert_eq!(sctid.namespace(), &namespace());
            assert!(recorder.is_assigned(id));
            assert!(store.contains_id(id));
        }
        assert_eq!(outcome.created.len(), 8);
        assert!(outcome.commit.is_some());
    }
}

#[test]
fn constants_and_generated_ids_do_not_collide() {
    let mut store = store();
    let mut recorder = MemoryIdentifierRecorder::new();
    let requests = vec![
        CreateRequest::Concept(ConceptRequest {
            id: IdStrategy::constant("11000154102"),
            module_id: MODULE_SCT_CORE.to_string(),
            nested: vec![],
        }),
        CreateRequest::Concept(ConceptRequest {
            id: generated(),
            module_id: MODULE_SCT_CORE.to_string(),
            nested: vec![],
        }),
    ];

    let outcome = CreateExecutor::default()
        .execute(&mut store, &mut recorder, requests, "mixed")
        .expect("execute");
    assert_eq!(outcome.created, vec!["11000154102", "21000154106"]);
    assert!(recorder.is_assigned("11000154102"));

    // Committed constants stay taken for later transactions.
    let err = recorder
        .register(&["11000154102".to_string()])
        .expect_err("already assigned");
    assert!(matches!(err, TermstoreError::AlreadyExists { .. }));
}

#[test]
fn nested_requests_reference_their_parent() {
    let mut store = store();
    let mut recorder = MemoryIdentifierRecorder::new();
    let member_id = Uuid::parse_str("2b8f3c1e-6c0d-4b6e-9a55-0f4d8e2b7c31").expect("uuid");

    let outcome = CreateExecutor::default()
        .execute(
            &mut store,
            &mut recorder,
            vec![concept_tree(Some(member_id))],
            "new concept",
        )
        .expect("execute");

    let member = store.member(&member_id.to_string()).expect("member created");
    assert_eq!(member.referenced_component_id, "11000154118");
    assert_eq!(
        store.component("11000154125").expect("relationship").category,
        ComponentCategory::Relationship
    );

    insta::assert_json_snapshot!(outcome.requests, @r#"
    [
      {
        "type": "concept",
        "id": {
          "strategy": "constant",
          "id": "11000154102"
        },
        "moduleId": "900000000000207008",
        "nested": [
          {
            "type": "description",
            "id": {
              "strategy": "constant",
              "id": "11000154118"
            },
            "moduleId": "900000000000207008",
            "typeId": "900000000000003001",
            "nested": [
              {
                "type": "member",
                "id": "2b8f3c1e-6c0d-4b6e-9a55-0f4d8e2b7c31",
                "moduleId": "900000000000207008",
                "refsetId": "900000000000509007",
                "payload": {
                  "kind": "language",
                  "acceptabilityId": "900000000000548007"
                }
              }
            ]
          },
          {
            "type": "relationship",
            "id": {
              "strategy": "constant",
              "id": "11000154125"
            },
            "moduleId": "900000000000207008",
            "typeId": "116680003",
            "destinationId": "138875005"
          }
        ]
      }
    ]
    "#);
}
