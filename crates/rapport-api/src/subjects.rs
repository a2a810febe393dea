//! Handlers for `/subjects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subjects` | Optional `?kind=account\|campaign\|...` |
//! | `POST`   | `/subjects` | Body: [`CreateBody`] |
//! | `GET`    | `/subjects/:id` | `?viewer=<uuid>` records a view |
//! | `PATCH`  | `/subjects/:id` | Body: [`PatchBody`] |
//! | `DELETE` | `/subjects/:id` | `?actor=<uuid>` required |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use rapport_core::{
  store::CrmStore,
  subject::{
    Access, NewSubject, Subject, SubjectDetails, SubjectKind, SubjectPatch,
  },
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind: Option<SubjectKind>,
}

/// `GET /subjects[?kind=<kind>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let subjects = store
    .list_subjects(params.kind)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subjects))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub owner_id: Uuid,
  pub access:   Option<Access>,
  #[serde(flatten)]
  pub details:  SubjectDetails,
}

/// `POST /subjects`
///
/// Body: `{"owner_id":"...","access":"shared","kind":"lead","data":{...}}`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let input = NewSubject {
    access:  body.access.unwrap_or_default(),
    details: body.details,
  };
  let subject = store
    .create_subject(body.owner_id, input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(subject)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  /// If set, the read is display access: the viewer's recently-viewed row
  /// is recorded or touched.
  pub viewer: Option<Uuid>,
}

/// `GET /subjects/:id[?viewer=<uuid>]`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<GetParams>,
) -> Result<Json<Subject>, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let subject = match params.viewer {
    Some(viewer) => {
      store.view_subject(viewer, id).await.map_err(ApiError::store)?
    }
    None => store
      .get_subject(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?,
  };
  Ok(Json(subject))
}

// ─── Update ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PatchBody {
  pub actor_id: Uuid,
  pub access:   Option<Access>,
  pub details:  Option<SubjectDetails>,
}

/// `PATCH /subjects/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<PatchBody>,
) -> Result<Json<Subject>, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let patch = SubjectPatch { access: body.access, details: body.details };
  let subject = store
    .update_subject(body.actor_id, id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(subject))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
  pub actor: Uuid,
}

/// `DELETE /subjects/:id?actor=<uuid>`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  store
    .delete_subject(params.actor, id)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
