//! Publishes a snapshot to the remote repository.
//!
//! Read the current file, then do exactly one write: update with the revision
//! handle if the file exists, create otherwise. Failures are returned as-is
//! and never retried. An empty snapshot is rejected before any remote call.
//!
//! The read-then-write has no optimistic-concurrency retry: if another run
//! changes the file in between, the update fails with the store's conflict
//! error. Only one harvest should run against a given file at a time.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, error, info};

use crate::contract::{FileWrite, SnapshotStore};
use crate::snapshot::Snapshot;

pub const DEFAULT_MESSAGE_PREFIX: &str = "Update knowledge base snapshot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    Updated,
    /// Remote content already matched; nothing was written.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub record_count: usize,
    pub action: PublishAction,
    pub path: String,
    /// Revision handle of the file after publishing.
    pub revision: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("snapshot rejected: {0}")]
    Rejected(String),
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("publish failed: {0}")]
    Failure(String),
}

/// Where to publish and how to label the revision.
#[derive(Debug, Clone)]
pub struct PublishTarget<'a> {
    pub path: &'a str,
    pub message_prefix: Option<&'a str>,
}

/// Revision message: `"<prefix>: <n> articles (<UTC timestamp>)"`.
pub fn revision_message(prefix: Option<&str>, count: usize) -> String {
    format!(
        "{}: {} articles ({})",
        prefix.unwrap_or(DEFAULT_MESSAGE_PREFIX),
        count,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

pub async fn publish<S>(
    snapshot: &Snapshot,
    store: &S,
    target: PublishTarget<'_>,
) -> Result<PublishReport, PublishError>
where
    S: SnapshotStore + ?Sized,
{
    if snapshot.is_empty() {
        info!(path = target.path, "[PUBLISH] Empty snapshot, keeping the published one");
        return Err(PublishError::Rejected(
            "snapshot is empty; the previously published snapshot stays authoritative".to_string(),
        ));
    }

    let content = snapshot.to_json()?;
    let count = snapshot.len();

    let existing = store.get_file(target.path).await.map_err(|e| {
        error!(error = %e, path = target.path, "[PUBLISH][ERROR] Failed to look up remote file");
        PublishError::Failure(e.to_string())
    })?;

    if let Some(remote) = &existing {
        if remote.content.as_deref() == Some(content.as_str()) {
            info!(path = target.path, records = count, "[PUBLISH] Remote snapshot already up to date");
            return Ok(PublishReport {
                record_count: count,
                action: PublishAction::Unchanged,
                path: target.path.to_string(),
                revision: remote.revision.clone(),
            });
        }
    }

    let message = revision_message(target.message_prefix, count);
    let write = FileWrite {
        path: target.path,
        content: &content,
        message: &message,
    };
    debug!(path = target.path, bytes = content.len(), %message, "[PUBLISH] Writing snapshot");

    let (action, result) = match &existing {
        Some(remote) => (
            PublishAction::Updated,
            store.update_file(write, &remote.revision).await,
        ),
        None => (PublishAction::Created, store.create_file(write).await),
    };

    match result {
        Ok(revision) => {
            info!(path = target.path, records = count, ?action, %revision, "[PUBLISH] Snapshot published");
            Ok(PublishReport {
                record_count: count,
                action,
                path: target.path.to_string(),
                revision,
            })
        }
        Err(e) => {
            error!(error = %e, path = target.path, ?action, "[PUBLISH][ERROR] Remote write failed");
            Err(PublishError::Failure(e.to_string()))
        }
    }
}
