#![doc = "GitHub contents API client: the production `SnapshotStore` used by the CLI."]
//
//! # GitHub snapshot store
//!
//! Bridges the [`SnapshotStore`] seam in `wp-snapshot-core` to the GitHub
//! repository contents API:
//!
//! - `GET  /repos/{owner}/{repo}/contents/{path}` returns the file and its blob
//!   `sha` (the revision handle), or 404 when it does not exist yet.
//! - `PUT  /repos/{owner}/{repo}/contents/{path}` creates the file, or updates
//!   it when `sha` is supplied.
//!
//! ## Client Usage
//!
//! - Construct [`GitHubClient`] with [`GitHubClient::new`], using the secrets
//!   from [`crate::load_config::load_secrets`] (`GITHUB_TOKEN`,
//!   `GITHUB_REPOSITORY`).
//! - Authentication is a bearer token. The client never retries.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use wp_snapshot_core::contract::{FileWrite, RemoteFile, SnapshotStore, StoreError};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPOSITORY_ENV: &str = "GITHUB_REPOSITORY";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("wp-snapshot/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: Client,
    api_base: String,
    repository: String,
    token: String,
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: PutContentsFile,
}

#[derive(Debug, Deserialize)]
struct PutContentsFile {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: String,
}

impl GitHubClient {
    pub fn new(
        api_base: &str,
        repository: impl Into<String>,
        token: impl Into<String>,
        branch: Option<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;
        let repository = repository.into();
        tracing::info!(
            api_base,
            repository = %repository,
            branch = ?branch,
            "Initialized GitHubClient"
        );
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository,
            token: token.into(),
            branch,
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            self.repository,
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn put(
        &self,
        write: FileWrite<'_>,
        sha: Option<&str>,
    ) -> Result<String, StoreError> {
        let body = PutContentsRequest {
            message: write.message,
            content: STANDARD.encode(write.content.as_bytes()),
            sha,
            branch: self.branch.as_deref(),
        };
        let url = self.contents_url(write.path);
        tracing::info!(
            url = %url,
            update = sha.is_some(),
            bytes = write.content.len(),
            "Writing file to GitHub"
        );
        let response = self
            .authorized(self.client.put(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Transport error writing file");
                StoreError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }
        let parsed: PutContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        tracing::info!(path = write.path, sha = %parsed.content.sha, "GitHub write succeeded");
        Ok(parsed.content.sha)
    }
}

async fn error_from_response(response: reqwest::Response) -> StoreError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);
    tracing::error!(status, message = %message, "GitHub API returned error");
    StoreError::Status { status, message }
}

/// GitHub wraps base64 content at 60 columns; strip the line breaks first.
pub fn decode_content(encoded: &str) -> Result<String, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| StoreError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| StoreError::Decode(format!("content is not UTF-8: {e}")))
}

#[async_trait]
impl SnapshotStore for GitHubClient {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, StoreError> {
        let url = self.contents_url(path);
        tracing::info!(url = %url, "Looking up file on GitHub");
        let mut request = self.authorized(self.client.get(&url));
        if let Some(branch) = &self.branch {
            request = request.query(&[("ref", branch.as_str())]);
        }
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = ?e, url = %url, "Transport error reading file");
            StoreError::Transport(e.to_string())
        })?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(path, "File does not exist yet");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let parsed: ContentsResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        let content = match (parsed.encoding.as_deref(), parsed.content.as_deref()) {
            (Some("base64"), Some(encoded)) if !encoded.is_empty() => Some(decode_content(encoded)?),
            _ => None,
        };
        tracing::info!(path = %parsed.path, sha = %parsed.sha, inline = content.is_some(), "Found existing file");
        Ok(Some(RemoteFile {
            path: parsed.path,
            revision: parsed.sha,
            content,
        }))
    }

    async fn create_file<'a>(&self, write: FileWrite<'a>) -> Result<String, StoreError> {
        self.put(write, None).await
    }

    async fn update_file<'a>(
        &self,
        write: FileWrite<'a>,
        revision: &'a str,
    ) -> Result<String, StoreError> {
        self.put(write, Some(revision)).await
    }
}
