//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{error, respond, ApiResult};
use crate::access::ViewScope;
use crate::auth::Actor;
use crate::models::Task;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with tasks and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub task: Task,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over the tasks the acting user can see.
pub async fn search_tasks(
    State(state): State<AppState>,
    Actor(viewer): Actor,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Limit the maximum number of results
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    // Hits are filtered after ranking, so pages may come back short
    let hits = match state.search.search(&params.q, limit, params.offset) {
        Ok(hits) => hits,
        Err(e) => return error(e, revision_id),
    };

    let result = state.repo.list_tasks().await.map(|tasks| {
        let visible = viewer.retain_visible(tasks, ViewScope::Department);
        let results: Vec<SearchResultItem> = hits
            .into_iter()
            .filter_map(|hit| {
                visible
                    .iter()
                    .find(|t| t.id == hit.task_id)
                    .map(|task| SearchResultItem {
                        task: task.clone(),
                        score: hit.score,
                    })
            })
            .collect();
        SearchResponse {
            total: results.len(),
            results,
            limit,
            offset: params.offset,
        }
    });
    respond(&state, revision_id, result).await
}
