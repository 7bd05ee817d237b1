#![allow(unused)]

//! # contract: the seams between harvesting, pacing and publishing
//!
//! This module defines the data that flows through a harvest run and the three
//! traits the pipeline is assembled from:
//!
//! - [`PageFetcher`]: issues one paginated request and classifies the response.
//! - [`Pacer`]: every deliberate pause in a run (inter-page jitter, cool-down
//!   after a block, back-off after a network failure).
//! - [`SnapshotStore`]: the remote content API that holds the published snapshot.
//!
//! ## Mocking & Testing
//! - All traits are annotated for `mockall` so tests can drive the coordinator
//!   and publisher with scripted pages, counted pauses and an in-memory store.
//!
//! ## Adding New Destinations
//! - Implement [`SnapshotStore`] for the destination. Convert every upstream
//!   failure into a [`StoreError`] carrying the underlying message.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::{automock, predicate::*};

use crate::identity::ClientIdentity;

/// A post as returned by the WordPress REST API, before normalization.
///
/// Only lives for the duration of one page response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub title: Rendered,
    pub link: String,
    pub content: Rendered,
    #[serde(rename = "date")]
    pub publish_date: String,
    /// Author/media metadata requested through `_embed`. Carried along but not
    /// part of the normalized record.
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<serde_json::Value>,
}

/// WordPress wraps rich text fields as `{"rendered": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Rendered {
    pub rendered: String,
}

/// The flat record stored in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub link: String,
    pub body: String,
    pub publish_date: String,
}

/// Result of fetching a single page.
#[derive(Debug)]
pub enum PageOutcome {
    /// The decoded post list, still as raw JSON so the normalizer can skip
    /// malformed entries one by one.
    Posts(Vec<serde_json::Value>),
    /// Empty body, empty list or an error object: nothing more to fetch.
    EndOfData,
    /// HTTP 403 or 429. The caller rotates identity and retries the same page.
    Blocked { status: u16 },
    /// Anything else. The run stops and keeps what it has.
    Fatal(FetchError),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode page body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Network failures get a back-off pause before the run stops.
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

/// Trait for fetching one page of posts from the content API.
///
/// The identity is passed in on every call; implementations must not keep
/// their own mutable header state.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        page: u32,
        per_page: u32,
        identity: &ClientIdentity,
    ) -> PageOutcome;
}

/// The kinds of pause a harvest run takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Randomized delay after every successfully processed page.
    BetweenPages,
    /// Fixed cool-down before retrying a blocked page.
    BlockedCooldown,
    /// Fixed back-off after a network-level failure.
    NetworkBackoff,
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, pause: Pause);
}

/// A file as it currently exists in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    /// Content-addressed revision handle required to update the file.
    pub revision: String,
    /// Decoded UTF-8 content, when the API returned it inline.
    pub content: Option<String>,
}

/// A create or update request for the remote file.
#[derive(Debug, Clone)]
pub struct FileWrite<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub message: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode remote response: {0}")]
    Decode(String),
}

/// Trait for the remote source-control content API that holds the snapshot.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Look up the file at `path`. `Ok(None)` when it does not exist yet.
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError>;

    /// Create a file that does not exist yet. Returns the new revision handle.
    async fn create_file<'a>(&self, write: FileWrite<'a>) -> Result<String, StoreError>;

    /// Replace an existing file, given the revision handle from a prior read.
    /// Returns the new revision handle.
    async fn update_file<'a>(
        &self,
        write: FileWrite<'a>,
        revision: &'a str,
    ) -> Result<String, StoreError>;
}
