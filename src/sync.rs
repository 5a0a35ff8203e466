use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::github::{ApiError, ProjectsApi};
use crate::model::board::{select_status_field, StatusFieldError};
use crate::model::issue::{AddedItem, SearchHit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub project_id: String,
    /// Lookback window; items not updated within it are ignored
    pub days: u32,
    /// Name of the single-select field to use; auto-detected when unset
    pub status_field: Option<String>,
    pub inbox_option: String,
}

/// Failures that stop a run before anything is mutated.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not resolve the authenticated user: {0}")]
    Viewer(#[source] ApiError),
    #[error("could not load project fields: {0}")]
    Fields(#[source] ApiError),
    #[error(transparent)]
    StatusField(#[from] StatusFieldError),
    #[error("status field {field:?} has no {option:?} option")]
    MissingOption { field: String, option: String },
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub added: Vec<AddedItem>,
    /// Hits whose content was already on the board
    pub skipped_existing: usize,
    /// Hits whose node id could not be resolved
    pub unresolved: usize,
    /// Hits that failed while being added
    pub failed: usize,
}

impl SyncReport {
    pub fn status_failures(&self) -> usize {
        self.added.iter().filter(|a| !a.status_set).count()
    }

    /// True when some hit was dropped or only partly synced.
    pub fn incomplete(&self) -> bool {
        self.failed > 0 || self.unresolved > 0 || self.status_failures() > 0
    }
}

enum Outcome {
    Added(AddedItem),
    AlreadyOnBoard,
    Unresolved,
}

/// Longest accepted lookback window, about a century.
pub const MAX_DAYS: u32 = 36_500;

pub fn cutoff_date(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

fn filters(cutoff: NaiveDate) -> String {
    format!("state:open updated:>={}", cutoff.format("%Y-%m-%d"))
}

/// `None` when nothing is watched; an empty `repo:` qualifier would be rejected.
pub fn watched_query(repos: &[String], cutoff: NaiveDate) -> Option<String> {
    if repos.is_empty() {
        return None;
    }
    let qualifiers: Vec<String> = repos.iter().map(|r| format!("repo:{r}")).collect();
    Some(format!("{} {}", qualifiers.join(" "), filters(cutoff)))
}

pub fn involves_query(login: &str, cutoff: NaiveDate) -> String {
    format!("involves:{login} {}", filters(cutoff))
}

/// Put every open issue and pull request the viewer watches or is involved in,
/// updated on or after `today - days`, into the project's Inbox column.
pub async fn sync_inbox(
    api: &dyn ProjectsApi,
    opts: &SyncOptions,
    today: NaiveDate,
) -> Result<SyncReport, SyncError> {
    let project_id = opts.project_id.as_str();

    let mut on_board = match api.project_items(project_id).await {
        Ok(items) => items,
        Err(e) => {
            error!(project = project_id, error = %e, "Could not load existing project items");
            warn!("Continuing without deduplication: items already on the board will be moved back to the inbox column");
            HashMap::new()
        }
    };
    info!(project = project_id, count = on_board.len(), "Loaded existing project items");

    let login = api.viewer_login().await.map_err(SyncError::Viewer)?;
    debug!(%login, "Resolved viewer");

    let candidates = api
        .single_select_fields(project_id)
        .await
        .map_err(SyncError::Fields)?;
    let field = select_status_field(candidates, opts.status_field.as_deref())?;
    let option = field
        .option(&opts.inbox_option)
        .ok_or_else(|| SyncError::MissingOption {
            field: field.name.clone(),
            option: opts.inbox_option.clone(),
        })?
        .clone();
    debug!(field = %field.name, option = %option.name, "Resolved status column");

    let cutoff = cutoff_date(today, opts.days);

    let watched = match api.watched_repos(&login).await {
        Ok(repos) => repos,
        Err(e) => {
            warn!(%login, error = %e, "Could not list watched repositories");
            Vec::new()
        }
    };
    info!(count = watched.len(), %cutoff, "Searching for recently updated items");

    let queries = [
        watched_query(&watched, cutoff),
        Some(involves_query(&login, cutoff)),
    ];

    let mut report = SyncReport::default();
    for query in queries.into_iter().flatten() {
        let hits = match api.search_issues(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(%query, error = %e, "Search failed");
                continue;
            }
        };
        debug!(%query, count = hits.len(), "Search returned");

        for hit in &hits {
            match add_hit(api, project_id, &field.id, &option.id, hit, &mut on_board).await {
                Ok(Outcome::Added(item)) => {
                    info!(title = %item.title, url = %item.url, "Added to inbox");
                    report.added.push(item);
                }
                Ok(Outcome::AlreadyOnBoard) => report.skipped_existing += 1,
                Ok(Outcome::Unresolved) => report.unresolved += 1,
                Err(e) => {
                    warn!(title = %hit.title, error = %e, "Error processing item");
                    report.failed += 1;
                }
            }
        }
    }

    Ok(report)
}

async fn add_hit(
    api: &dyn ProjectsApi,
    project_id: &str,
    field_id: &str,
    option_id: &str,
    hit: &SearchHit,
    on_board: &mut HashMap<String, String>,
) -> Result<Outcome, ApiError> {
    let issue = hit.issue_ref().ok_or_else(|| {
        ApiError::Malformed(format!("repository_url {:?}", hit.repository_url))
    })?;

    let content_id = match api.content_node_id(&issue).await {
        Ok(id) => id,
        Err(e) => {
            warn!(%issue, error = %e, "Could not get node id");
            return Ok(Outcome::Unresolved);
        }
    };

    if on_board.contains_key(&content_id) {
        return Ok(Outcome::AlreadyOnBoard);
    }

    let item_id = api.add_project_item(project_id, &content_id).await?;
    on_board.insert(content_id, item_id.clone());

    let status_set = match api
        .set_single_select(project_id, &item_id, field_id, option_id)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            warn!(title = %hit.title, error = %e, "Error setting status");
            false
        }
    };

    Ok(Outcome::Added(AddedItem {
        item_id,
        title: hit.title.clone(),
        url: hit.html_url.clone(),
        status_set,
    }))
}
