//! Integration tests: properties every reconciliation must keep.

use std::collections::BTreeSet;
use termstore_kernel::concepts::{
    ACCEPTABLE, PREFERRED, REFSET_LANGUAGE_TYPE_UK, REFSET_LANGUAGE_TYPE_US,
    REFSET_REPLACED_BY_ASSOCIATION, REFSET_SAME_AS_ASSOCIATION,
};
use termstore_kernel::{Component, EditConfig, EffectiveTime, Member, MemberPayload};
use termstore_reconcile::{AcceptabilityMap, AssociationTargets, DesiredState, Reconciler};
use termstore_store::{ComponentModule, FixedModule, MemoryRevisionStore, RevisionStore};

const CORE: &str = "900000000000207008";
const CONCEPT: &str = "22298006";

fn association(id: &str, refset: &str, target: &str) -> Member {
    Member::with_id(
        id,
        refset,
        CONCEPT,
        CORE,
        MemberPayload::Association {
            target_component_id: target.to_string(),
        },
    )
}

fn released(member: Member) -> Member {
    member.published(EffectiveTime::parse("20230131").expect("date"))
}

fn store() -> MemoryRevisionStore {
    MemoryRevisionStore::from_snapshot(
        vec![Component::concept(CONCEPT, CORE)],
        vec![
            released(association("m-1", REFSET_SAME_AS_ASSOCIATION, "404684003")),
            released(association("m-2", REFSET_SAME_AS_ASSOCIATION, "71388002")).inactive(),
            association("m-3", REFSET_REPLACED_BY_ASSOCIATION, "73211009"),
            released(association("m-4", REFSET_REPLACED_BY_ASSOCIATION, "49601007")),
            association("m-5", REFSET_SAME_AS_ASSOCIATION, "404684003"),
        ],
    )
    .expect("store should build")
}

fn reconciler() -> Reconciler<ComponentModule> {
    Reconciler::new(ComponentModule, &EditConfig::default())
}

fn desired_cases() -> Vec<AssociationTargets> {
    vec![
        AssociationTargets::new(),
        AssociationTargets::new().with(REFSET_SAME_AS_ASSOCIATION, "404684003"),
        AssociationTargets::new()
            .with(REFSET_SAME_AS_ASSOCIATION, "71388002")
            .with(REFSET_SAME_AS_ASSOCIATION, "82271004"),
        AssociationTargets::new()
            .with(REFSET_REPLACED_BY_ASSOCIATION, "49601007")
            .with(REFSET_REPLACED_BY_ASSOCIATION, "73211009")
            .with(REFSET_REPLACED_BY_ASSOCIATION, "86299006")
            .with(REFSET_SAME_AS_ASSOCIATION, "195967001"),
    ]
}

#[test]
fn second_reconcile_changes_nothing() {
    for targets in desired_cases() {
        let mut store = store();
        let desired = DesiredState::associations(targets.clone());
        reconciler()
            .reconcile_component(&mut store, CONCEPT, &desired)
            .expect("first reconcile");
        store.commit("first").expect("commit");

        let changed = reconciler()
            .reconcile_component(&mut store, CONCEPT, &desired)
            .expect("second reconcile");
        assert!(!changed, "targets {targets:?} were not stable");
        assert!(!store.has_pending_changes());
    }
}

#[test]
fn active_members_match_desired_entries_one_to_one() {
    for targets in desired_cases() {
        let mut store = store();
        reconciler()
            .reconcile_component(&mut store, CONCEPT, &DesiredState::associations(targets.clone()))
            .expect("reconcile");

        let members = store.members_referencing(CONCEPT);
        let active: Vec<(String, String)> = members
            .iter()
            .filter(|member| member.active)
            .map(|member| {
                (
                    member.refset_id.clone(),
                    member.value().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let expected: BTreeSet<(String, String)> = targets
            .iter()
            .map(|(refset, target)| (refset.to_string(), target.to_string()))
            .collect();

        assert_eq!(active.len(), expected.len(), "targets {targets:?}");
        assert_eq!(active.into_iter().collect::<BTreeSet<_>>(), expected);
        for member in members.iter().filter(|member| !member.active) {
            assert!(member.released, "unreleased member {} kept inactive", member.id);
        }
    }
}

#[test]
fn unchanged_entries_keep_their_member_id() {
    let mut store = store();
    reconciler()
        .reconcile_component(
            &mut store,
            CONCEPT,
            &DesiredState::associations(
                AssociationTargets::new()
                    .with(REFSET_SAME_AS_ASSOCIATION, "404684003")
                    .with(REFSET_REPLACED_BY_ASSOCIATION, "86299006"),
            ),
        )
        .expect("first edit");
    store.commit("first edit").expect("commit");

    let kept = |store: &MemoryRevisionStore| {
        store
            .members_referencing(CONCEPT)
            .into_iter()
            .find(|member| member.active && member.value() == Some("404684003"))
            .map(|member| member.id)
    };
    let before = kept(&store);
    assert_eq!(before.as_deref(), Some("m-1"));

    reconciler()
        .reconcile_component(
            &mut store,
            CONCEPT,
            &DesiredState::associations(
                AssociationTargets::new()
                    .with(REFSET_SAME_AS_ASSOCIATION, "404684003")
                    .with(REFSET_REPLACED_BY_ASSOCIATION, "82271004"),
            ),
        )
        .expect("second edit");
    assert_eq!(kept(&store), before);
}

#[test]
fn changed_members_lose_their_effective_time() {
    let mut store = store();
    let before = store.members_referencing(CONCEPT);
    reconciler()
        .reconcile_component(
            &mut store,
            CONCEPT,
            &DesiredState::associations(
                AssociationTargets::new()
                    .with(REFSET_SAME_AS_ASSOCIATION, "404684003")
                    .with(REFSET_REPLACED_BY_ASSOCIATION, "82271004"),
            ),
        )
        .expect("reconcile");

    for after in store.members_referencing(CONCEPT) {
        match before.iter().find(|member| member.id == after.id) {
            Some(original) if original.same_content(&after) => {
                assert_eq!(original.effective_time, after.effective_time, "{}", after.id);
            }
            _ => assert!(!after.effective_time.is_set(), "{} kept its date", after.id),
        }
    }
}

#[test]
fn acceptability_plan_snapshot() {
    let component = Component::description("2148514019", CORE);
    let existing = vec![
        Member::with_id(
            "l-1",
            REFSET_LANGUAGE_TYPE_US,
            "2148514019",
            CORE,
            MemberPayload::Language {
                acceptability_id: ACCEPTABLE.to_string(),
            },
        ),
        released(Member::with_id(
            "l-2",
            REFSET_LANGUAGE_TYPE_UK,
            "2148514019",
            CORE,
            MemberPayload::Language {
                acceptability_id: ACCEPTABLE.to_string(),
            },
        )),
    ];
    let desired = DesiredState::acceptability(
        AcceptabilityMap::new().with(REFSET_LANGUAGE_TYPE_US, PREFERRED),
    );

    let reconciler = Reconciler::new(FixedModule("1000154104".to_string()), &EditConfig::default());
    let plan = reconciler
        .plan(&component, &existing, &desired)
        .expect("plan");

    insta::assert_json_snapshot!(plan, @r#"
    {
      "componentId": "2148514019",
      "kind": "language",
      "moduleId": "1000154104",
      "steps": [
        {
          "op": "deactivate",
          "memberId": "l-2",
          "refsetId": "900000000000508004",
          "value": "900000000000549004"
        },
        {
          "op": "retarget",
          "memberId": "l-1",
          "refsetId": "900000000000509007",
          "value": "900000000000548007"
        }
      ]
    }
    "#);
}
