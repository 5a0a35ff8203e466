pub mod client;
mod queries;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::board::StatusField;
use crate::model::issue::{IssueRef, SearchHit};

pub use client::GitHubClient;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("GitHub returned errors: {}", .0.join("; "))]
    Service(Vec<String>),
    #[error("unexpected response: {0}")]
    Malformed(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// The GitHub calls a sync run needs. Every call is a single request.
#[async_trait]
pub trait ProjectsApi: Send + Sync {
    /// Login of the account the token belongs to.
    async fn viewer_login(&self) -> Result<String, ApiError>;

    /// The first 20 project fields that carry an option list, in API order.
    async fn single_select_fields(&self, project_id: &str) -> Result<Vec<StatusField>, ApiError>;

    /// Content node id → project item id for the first 100 items on the board.
    async fn project_items(&self, project_id: &str) -> Result<HashMap<String, String>, ApiError>;

    /// Global node id of the issue or pull request at `issue`.
    async fn content_node_id(&self, issue: &IssueRef) -> Result<String, ApiError>;

    /// Returns the new project item id.
    async fn add_project_item(&self, project_id: &str, content_id: &str)
        -> Result<String, ApiError>;

    async fn set_single_select(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<(), ApiError>;

    /// `owner/name` of every repository `login` watches.
    async fn watched_repos(&self, login: &str) -> Result<Vec<String>, ApiError>;

    async fn search_issues(&self, query: &str) -> Result<Vec<SearchHit>, ApiError>;
}
