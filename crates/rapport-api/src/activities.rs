//! Handlers for the `/activities` feed endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/activities` | Optional `viewer`, `user`, `only`, `except`, `limit` |
//! | `GET` | `/activities/recent` | `viewer` required; optional `limit` |
//!
//! `only` and `except` are comma-separated action names, e.g.
//! `only=created,updated`. An unknown action name is a 400.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use rapport_core::{
  activity::{Action, Activity, ActivityQuery},
  store::CrmStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a comma-separated list of action names.
fn parse_actions(list: &str) -> Result<Vec<Action>, ApiError> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(|s| {
      s.parse::<Action>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))
    })
    .collect()
}

// ─── Feed ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct FeedParams {
  /// Drop rows this viewer may not see.
  pub viewer: Option<Uuid>,
  /// Restrict to activities performed by this user.
  pub user:   Option<Uuid>,
  /// Comma-separated action names to include.
  pub only:   Option<String>,
  /// Comma-separated action names to exclude.
  pub except: Option<String>,
  /// Most recent N rows (counted after visibility filtering).
  pub limit:  Option<usize>,
}

/// `GET /activities[?viewer=...][&user=...][&only=...][&except=...][&limit=...]`
pub async fn feed<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<FeedParams>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let mut query = ActivityQuery::new();
  if let Some(user) = params.user {
    query = query.for_user(user);
  }
  if let Some(only) = &params.only {
    query = query.only(parse_actions(only)?);
  }
  if let Some(except) = &params.except {
    query = query.except(parse_actions(except)?);
  }
  if let Some(limit) = params.limit {
    query = query.latest(limit);
  }
  if let Some(viewer) = params.viewer {
    query = query.visible_to(viewer);
  }

  let rows = store.activities(&query).await.map_err(ApiError::store)?;
  Ok(Json(rows))
}

// ─── Recently viewed ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecentParams {
  pub viewer: Uuid,
  pub limit:  Option<usize>,
}

/// `GET /activities/recent?viewer=<uuid>[&limit=...]`
pub async fn recent<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<RecentParams>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = store
    .recently_viewed(params.viewer, params.limit.unwrap_or(10))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_actions_accepts_known_names() {
    let actions = parse_actions("created, updated").unwrap();
    assert_eq!(actions, vec![Action::Created, Action::Updated]);
  }

  #[test]
  fn parse_actions_rejects_unknown_names() {
    assert!(parse_actions("created,renamed").is_err());
  }
}
