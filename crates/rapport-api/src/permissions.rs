//! Handler for `POST /subjects/:id/permissions`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rapport_core::store::CrmStore;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// The grantee.
  pub user_id: Uuid,
}

/// `POST /subjects/:id/permissions` — body: `{"user_id":"..."}`
///
/// Grants the named user visibility on a Shared subject.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CrmStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let subject = store
    .get_subject(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("subject {id} not found")))?;

  let permission = store
    .grant_permission(body.user_id, subject.subject_ref())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(permission)))
}
