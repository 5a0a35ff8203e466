use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{queries, ApiError, ProjectsApi};
use crate::model::board::{FieldOption, StatusField};
use crate::model::issue::{IssueRef, SearchHit};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const AGENT: &str = concat!("inbox-sync/", env!("CARGO_PKG_VERSION"));
const MEDIA_TYPE: &str = "application/vnd.github+json";

pub struct GitHubClient {
    token: String,
    base_url: String,
    client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(token: String, base_url: &str) -> Self {
        Self {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, ApiError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let resp = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .bearer_auth(&self.token)
            .header(USER_AGENT, AGENT)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let gql: GqlResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Malformed(format!("{e}: {text}")))?;

        if let Some(errors) = gql.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            if errors.iter().all(|e| e.kind.as_deref() == Some("NOT_FOUND")) {
                return Err(ApiError::NotFound(messages.join("; ")));
            }
            return Err(ApiError::Service(messages));
        }

        let data = gql
            .data
            .filter(|d| !d.is_null())
            .ok_or_else(|| ApiError::Malformed(format!("no data in response: {text}")))?;
        serde_json::from_value(data).map_err(|e| ApiError::Malformed(format!("{e}: {text}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header(USER_AGENT, AGENT)
            .header(ACCEPT, MEDIA_TYPE)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(format!("{e}: {text}")))
    }
}

#[derive(Deserialize)]
struct GqlResponse {
    data: Option<Value>,
    errors: Option<Vec<GqlError>>,
}

#[derive(Deserialize)]
struct GqlError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct ViewerData {
    viewer: Login,
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct RepositoryData {
    repository: Option<Repository>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Repository {
    issue_or_pull_request: Option<MaybeId>,
}

/// Fragment spreads yield `{}` when the node is of another type.
#[derive(Deserialize)]
struct MaybeId {
    id: Option<String>,
}

#[derive(Deserialize)]
struct NodeData<T> {
    node: Option<T>,
}

#[derive(Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Deserialize)]
struct ProjectFields {
    fields: Option<Connection<FieldNode>>,
}

#[derive(Deserialize)]
struct FieldNode {
    id: Option<String>,
    name: Option<String>,
    options: Option<Vec<FieldOption>>,
}

#[derive(Deserialize)]
struct ProjectItems {
    items: Option<Connection<ItemNode>>,
}

#[derive(Deserialize)]
struct ItemNode {
    id: String,
    content: Option<MaybeId>,
}

#[derive(Deserialize)]
struct AddItemData {
    #[serde(rename = "addProjectV2ItemById")]
    add_item: Option<AddItemPayload>,
}

#[derive(Deserialize)]
struct AddItemPayload {
    item: Option<MaybeId>,
}

#[derive(Deserialize)]
struct Subscription {
    name: String,
    owner: Login,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Value>,
}

fn not_a_project(project_id: &str) -> ApiError {
    ApiError::NotFound(format!("project {project_id}"))
}

#[async_trait]
impl ProjectsApi for GitHubClient {
    async fn viewer_login(&self) -> Result<String, ApiError> {
        let data: ViewerData = self.graphql(queries::VIEWER, Value::Null).await?;
        Ok(data.viewer.login)
    }

    async fn single_select_fields(&self, project_id: &str) -> Result<Vec<StatusField>, ApiError> {
        let data: NodeData<ProjectFields> = self
            .graphql(
                queries::PROJECT_FIELDS,
                serde_json::json!({ "projectId": project_id }),
            )
            .await?;
        let fields = data
            .node
            .and_then(|n| n.fields)
            .ok_or_else(|| not_a_project(project_id))?;

        let candidates = fields
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|f| match (f.id, f.name, f.options) {
                (Some(id), Some(name), Some(options)) => Some(StatusField { id, name, options }),
                _ => None,
            })
            .collect();
        Ok(candidates)
    }

    async fn project_items(&self, project_id: &str) -> Result<HashMap<String, String>, ApiError> {
        let data: NodeData<ProjectItems> = self
            .graphql(
                queries::PROJECT_ITEMS,
                serde_json::json!({ "projectId": project_id }),
            )
            .await?;
        let items = data
            .node
            .and_then(|n| n.items)
            .ok_or_else(|| not_a_project(project_id))?;

        let existing = items
            .nodes
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let content_id = item.content.and_then(|c| c.id)?;
                Some((content_id, item.id))
            })
            .collect();
        Ok(existing)
    }

    async fn content_node_id(&self, issue: &IssueRef) -> Result<String, ApiError> {
        let data: RepositoryData = self
            .graphql(
                queries::CONTENT_ID,
                serde_json::json!({
                    "owner": issue.owner,
                    "repo": issue.repo,
                    "number": issue.number,
                }),
            )
            .await?;
        data.repository
            .and_then(|r| r.issue_or_pull_request)
            .and_then(|c| c.id)
            .ok_or_else(|| ApiError::NotFound(issue.to_string()))
    }

    async fn add_project_item(
        &self,
        project_id: &str,
        content_id: &str,
    ) -> Result<String, ApiError> {
        let data: AddItemData = self
            .graphql(
                queries::ADD_ITEM,
                serde_json::json!({ "projectId": project_id, "contentId": content_id }),
            )
            .await?;
        data.add_item
            .and_then(|p| p.item)
            .and_then(|i| i.id)
            .ok_or_else(|| ApiError::Malformed("addProjectV2ItemById returned no item".into()))
    }

    async fn set_single_select(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<(), ApiError> {
        let _: Value = self
            .graphql(
                queries::SET_SINGLE_SELECT,
                serde_json::json!({
                    "projectId": project_id,
                    "itemId": item_id,
                    "fieldId": field_id,
                    "optionId": option_id,
                }),
            )
            .await?;
        Ok(())
    }

    async fn watched_repos(&self, login: &str) -> Result<Vec<String>, ApiError> {
        let url = format!(
            "{}/users/{}/subscriptions?per_page=100",
            self.base_url,
            urlencoding::encode(login)
        );
        let repos: Vec<Subscription> = self.get_json(&url).await?;
        Ok(repos
            .into_iter()
            .map(|r| format!("{}/{}", r.owner.login, r.name))
            .collect())
    }

    async fn search_issues(&self, query: &str) -> Result<Vec<SearchHit>, ApiError> {
        let url = format!(
            "{}/search/issues?q={}&per_page=100",
            self.base_url,
            urlencoding::encode(query)
        );
        let resp: SearchResponse = self.get_json(&url).await?;
        let hits = resp
            .items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<SearchHit>(item) {
                Ok(hit) => Some(hit),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable search result");
                    None
                }
            })
            .collect();
        Ok(hits)
    }
}
