//! Transactional execution of create requests.
//!
//! One call is one transaction against both the revision store and the
//! identifier recorder:
//!
//! 1. validate every request tree and check its references exist
//! 2. claim caller-chosen ids (they must be unused and unique)
//! 3. allocate namespace ids per (namespace, category) group
//! 4. rewrite every namespace strategy to the id it received
//! 5. stage components and members, commit the recorder, then the store
//!
//! Any failure rolls both back before it is returned. A store commit that
//! fails after the recorder committed releases the ids the recorder just
//! assigned.

use crate::allocator::{IdAllocator, ReservationTicket};
use crate::request::{CreateRequest, IdStrategy};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use termstore_kernel::{
    Component, ComponentCategory, EditConfig, Member, Namespace, Result, TermstoreError,
};
use termstore_store::{CommitRecord, IdentifierRecorder, RevisionStore};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Result of a committed create transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOutcome {
    /// The requests with every id strategy resolved to a constant.
    pub requests: Vec<CreateRequest>,
    /// Ids of created components and members, parents first.
    pub created: Vec<String>,
    pub tickets: Vec<ReservationTicket>,
    pub commit: Option<CommitRecord>,
}

type Group = (Namespace, ComponentCategory);

#[derive(Debug, Default)]
struct IdDemand {
    constants: Vec<String>,
    member_ids: Vec<Uuid>,
    groups: BTreeMap<Group, usize>,
}

impl IdDemand {
    fn collect(requests: &[CreateRequest]) -> Result<Self> {
        let mut demand = Self::default();
        let mut seen = BTreeSet::new();
        for request in requests.iter().flat_map(CreateRequest::walk) {
            match (request, request.category(), request.id_strategy()) {
                (CreateRequest::Member(member), _, _) => {
                    if let Some(id) = member.id {
                        if !seen.insert(id.to_string()) {
                            return Err(TermstoreError::already_exists("member", id.to_string()));
                        }
                        demand.member_ids.push(id);
                    }
                }
                (_, Some(_), Some(IdStrategy::Constant { id })) => {
                    if !seen.insert(id.clone()) {
                        return Err(TermstoreError::already_exists("component", id.as_str()));
                    }
                    demand.constants.push(id.clone());
                }
                (_, Some(category), Some(IdStrategy::Namespace { namespace })) => {
                    *demand.groups.entry((namespace.clone(), category)).or_default() += 1;
                }
                _ => {}
            }
        }
        Ok(demand)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateExecutor {
    allocator: IdAllocator,
}

impl CreateExecutor {
    pub fn new(config: &EditConfig) -> Self {
        Self::with_allocator(IdAllocator::new(config))
    }

    pub fn with_allocator(allocator: IdAllocator) -> Self {
        Self { allocator }
    }

    /// Create every request tree in one transaction.
    ///
    /// No requests is a no-op: nothing is reserved and nothing is committed.
    #[instrument(skip(self, store, recorder, requests), fields(requests = requests.len()))]
    pub fn execute<S, R>(
        &self,
        store: &mut S,
        recorder: &mut R,
        requests: Vec<CreateRequest>,
        message: &str,
    ) -> Result<CreateOutcome>
    where
        S: RevisionStore + ?Sized,
        R: IdentifierRecorder + ?Sized,
    {
        if requests.is_empty() {
            return Ok(CreateOutcome::default());
        }
        match self.try_execute(store, recorder, requests, message) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, "Create transaction failed, rolling back");
                store.rollback();
                recorder.rollback();
                Err(err)
            }
        }
    }

    fn try_execute<S, R>(
        &self,
        store: &mut S,
        recorder: &mut R,
        mut requests: Vec<CreateRequest>,
        message: &str,
    ) -> Result<CreateOutcome>
    where
        S: RevisionStore + ?Sized,
        R: IdentifierRecorder + ?Sized,
    {
        for request in &requests {
            request.validate()?;
        }
        let demand = IdDemand::collect(&requests)?;

        let created_here: BTreeSet<&str> = demand.constants.iter().map(String::as_str).collect();
        let required: BTreeSet<String> = requests
            .iter()
            .flat_map(CreateRequest::required_component_ids)
            .collect();
        if let Some(missing) = required
            .iter()
            .find(|id| !created_here.contains(id.as_str()) && !store.contains_id(id))
        {
            return Err(TermstoreError::not_found("component", missing.as_str()));
        }

        if let Some(taken) = demand.constants.iter().find(|id| store.contains_id(id)) {
            return Err(TermstoreError::already_exists("component", taken.as_str()));
        }
        if let Some(taken) = demand
            .member_ids
            .iter()
            .find(|id| store.contains_id(&id.to_string()))
        {
            return Err(TermstoreError::already_exists("member", taken.to_string()));
        }
        recorder.register(&demand.constants)?;

        let mut tickets = Vec::with_capacity(demand.groups.len());
        let mut queues: BTreeMap<Group, VecDeque<String>> = BTreeMap::new();
        for ((namespace, category), count) in &demand.groups {
            let ticket = self
                .allocator
                .allocate(&*store, recorder, *category, namespace, *count)?;
            queues.insert(
                (namespace.clone(), *category),
                ticket.ids.iter().cloned().collect(),
            );
            tickets.push(ticket);
        }

        for request in &mut requests {
            assign_ids(request, &mut queues)?;
        }

        let mut created = Vec::new();
        for request in &requests {
            stage(store, request, None, &mut created)?;
        }

        recorder.commit()?;
        let commit = match store.commit(message) {
            Ok(commit) => commit,
            Err(err) => {
                let assigned: Vec<String> = demand
                    .constants
                    .iter()
                    .chain(tickets.iter().flat_map(|ticket| ticket.ids.iter()))
                    .cloned()
                    .collect();
                if let Err(release_err) = recorder.release(&assigned) {
                    warn!(error = %release_err, "Could not release identifiers of a failed commit");
                }
                return Err(err);
            }
        };
        info!(
            created = created.len(),
            constants = demand.constants.len(),
            allocated = tickets.iter().map(ReservationTicket::len).sum::<usize>(),
            "Create transaction committed"
        );

        Ok(CreateOutcome {
            requests,
            created,
            tickets,
            commit,
        })
    }
}

fn assign_ids(request: &mut CreateRequest, queues: &mut BTreeMap<Group, VecDeque<String>>) -> Result<()> {
    if let Some(category) = request.category() {
        if let Some(strategy) = request.id_strategy_mut() {
            if let IdStrategy::Namespace { namespace } = strategy {
                let id = queues
                    .get_mut(&(namespace.clone(), category))
                    .and_then(VecDeque::pop_front)
                    .ok_or_else(|| {
                        TermstoreError::Storage(format!(
                            "no identifier left for {category} in namespace {namespace}"
                        ))
                    })?;
                *strategy = IdStrategy::Constant { id };
            }
        }
    }
    request
        .nested_requests_mut()
        .iter_mut()
        .try_for_each(|nested| assign_ids(nested, queues))
}

fn resolved_id(request: &CreateRequest) -> Result<&str> {
    request
        .id_strategy()
        .and_then(IdStrategy::constant_id)
        .ok_or_else(|| TermstoreError::Storage("create request id was not assigned".to_string()))
}

fn parent_reference<'a>(own: Option<&'a str>, parent: Option<&'a str>, field: &str) -> Result<&'a str> {
    own.or(parent)
        .ok_or_else(|| TermstoreError::validation(format!("create request needs a {field}")))
}

fn stage<S: RevisionStore + ?Sized>(
    store: &mut S,
    request: &CreateRequest,
    parent: Option<&str>,
    created: &mut Vec<String>,
) -> Result<()> {
    let id = match request {
        CreateRequest::Concept(concept) => {
            let id = resolved_id(request)?;
            store.add_component(Component::concept(id, &concept.module_id))?;
            id.to_string()
        }
        CreateRequest::Description(description) => {
            parent_reference(description.concept_id.as_deref(), parent, "conceptId")?;
            let id = resolved_id(request)?;
            store.add_component(Component::description(id, &description.module_id))?;
            id.to_string()
        }
        CreateRequest::Relationship(relationship) => {
            parent_reference(relationship.source_id.as_deref(), parent, "sourceId")?;
            let id = resolved_id(request)?;
            store.add_component(Component::relationship(id, &relationship.module_id))?;
            id.to_string()
        }
        CreateRequest::Member(member) => {
            let referenced = parent_reference(
                member.referenced_component_id.as_deref(),
                parent,
                "referencedComponentId",
            )?;
            let id = member.id.unwrap_or_else(Uuid::new_v4).to_string();
            store.add_member(Member::with_id(
                &id,
                &member.refset_id,
                referenced,
                &member.module_id,
                member.payload.clone(),
            ))?;
            id
        }
    };
    created.push(id.clone());

    request
        .nested_requests()
        .iter()
        .try_for_each(|nested| stage(store, nested, Some(&id), created))
}
