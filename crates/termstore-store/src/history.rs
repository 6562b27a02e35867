//! Append-only commit history.
//!
//! `termstore.commit.v1` records every committed transaction:
//! - one JSON object per line (JSONL), ordered by `sequence`
//! - a sha256 digest over the change list, verified on replay
//! - deterministic replay on top of a baseline snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, Write};
use std::path::Path;
use termstore_kernel::{Component, Member, TermstoreError};

use crate::memory::MemoryRevisionStore;

pub const COMMIT_RECORD_SCHEMA: &str = "termstore.commit.v1";

fn default_commit_record_schema() -> String {
    COMMIT_RECORD_SCHEMA.to_string()
}

/// One staged write, as it lands in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum RevisionChange {
    ComponentAdded { component: Component },
    MemberAdded { member: Member },
    MemberUpdated { before: Member, after: Member },
    MemberDeleted { member: Member },
}

impl RevisionChange {
    /// Id of the component or member the change touches.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::ComponentAdded { component } => &component.id,
            Self::MemberAdded { member } | Self::MemberDeleted { member } => &member.id,
            Self::MemberUpdated { after, .. } => &after.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    #[serde(default = "default_commit_record_schema")]
    pub schema: String,
    pub sequence: u64,
    pub committed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub digest: String,
    pub changes: Vec<RevisionChange>,
}

impl CommitRecord {
    pub fn new(
        sequence: u64,
        message: impl Into<String>,
        changes: Vec<RevisionChange>,
        committed_at: DateTime<Utc>,
    ) -> Result<Self, HistoryError> {
        let digest = changes_digest(&changes)?;
        Ok(Self::sealed(sequence, message, digest, changes, committed_at))
    }

    /// A record whose `digest` was already computed over `changes`.
    pub(crate) fn sealed(
        sequence: u64,
        message: impl Into<String>,
        digest: String,
        changes: Vec<RevisionChange>,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema: COMMIT_RECORD_SCHEMA.to_string(),
            sequence,
            committed_at,
            message: message.into(),
            digest,
            changes,
        }
    }

    /// Schema and digest check performed before a record is replayed.
    pub fn check(&self) -> Result<(), HistoryError> {
        if self.schema != COMMIT_RECORD_SCHEMA {
            return Err(HistoryError::UnsupportedSchema(self.schema.clone()));
        }
        if self.digest != changes_digest(&self.changes)? {
            return Err(HistoryError::DigestMismatch {
                sequence: self.sequence,
            });
        }
        Ok(())
    }
}

/// `sha256:<hex>` over the canonical JSON of a change list.
pub fn changes_digest(changes: &[RevisionChange]) -> Result<String, HistoryError> {
    let canonical =
        serde_json::to_vec(changes).map_err(|e| HistoryError::Serialize(e.to_string()))?;
    let hash = Sha256::digest(&canonical);
    Ok(format!("sha256:{hash:x}"))
}

pub fn read_history(reader: impl BufRead) -> Result<Vec<CommitRecord>, HistoryError> {
    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| HistoryError::Io(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record: CommitRecord = serde_json::from_str(trimmed)
            .map_err(|e| HistoryError::Parse(line_no + 1, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_history(writer: &mut impl Write, records: &[CommitRecord]) -> Result<(), HistoryError> {
    for record in records {
        let line =
            serde_json::to_string(record).map_err(|e| HistoryError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| HistoryError::Io(0, e.to_string()))?;
    }
    Ok(())
}

pub fn read_history_from_path(path: impl AsRef<Path>) -> Result<Vec<CommitRecord>, HistoryError> {
    let file = File::open(path.as_ref())
        .map_err(|e| HistoryError::Io(0, format!("{}: {e}", path.as_ref().display())))?;
    read_history(std::io::BufReader::new(file))
}

pub fn write_history_to_path(
    path: impl AsRef<Path>,
    records: &[CommitRecord],
) -> Result<(), HistoryError> {
    let mut file = File::create(path.as_ref())
        .map_err(|e| HistoryError::Io(0, format!("{}: {e}", path.as_ref().display())))?;
    write_history(&mut file, records)
}

/// Rebuild the committed state reached after `records`.
pub fn replay_history(
    baseline: MemoryRevisionStore,
    records: &[CommitRecord],
) -> Result<MemoryRevisionStore, HistoryError> {
    MemoryRevisionStore::replay(baseline, records)
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("line {0}: I/O error: {1}")]
    Io(usize, String),

    #[error("line {0}: parse error: {1}")]
    Parse(usize, String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("unsupported commit schema: {0}")]
    UnsupportedSchema(String),

    #[error("commit {sequence}: digest does not match its changes")]
    DigestMismatch { sequence: u64 },

    #[error("commit out of order: expected sequence {expected}, found {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    #[error("commit {sequence} failed to replay: {source}")]
    Replay {
        sequence: u64,
        #[source]
        source: TermstoreError,
    },
}
