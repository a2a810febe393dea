//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use rapport_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend error.
  ///
  /// Domain failures are pulled out of the error's source chain and mapped
  /// to the right status: missing records become 404, rejected input
  /// becomes 400. Anything else stays a 500.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(e);

    let mut current: Option<&(dyn std::error::Error + 'static)> =
      Some(&*boxed);
    while let Some(err) = current {
      if let Some(core) = err.downcast_ref::<CoreError>() {
        return match core {
          CoreError::UserNotFound(_) | CoreError::SubjectNotFound(_) => {
            ApiError::NotFound(core.to_string())
          }
          CoreError::SubjectDeleted(_)
          | CoreError::KindChange { .. }
          | CoreError::Invalid(_)
          | CoreError::UnknownAction(_) => {
            ApiError::BadRequest(core.to_string())
          }
          CoreError::Serialization(_) => break,
        };
      }
      current = err.source();
    }

    ApiError::Store(boxed)
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use rapport_core::subject::SubjectKind;
  use thiserror::Error;
  use uuid::Uuid;

  use super::*;

  /// Mimics a backend error type that wraps domain errors via `#[from]`.
  #[derive(Debug, Error)]
  enum BackendError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("database error: {0}")]
    Database(String),
  }

  fn status_of(err: ApiError) -> StatusCode {
    err.into_response().status()
  }

  #[test]
  fn missing_records_map_to_404() {
    let id = Uuid::new_v4();
    assert_eq!(
      status_of(ApiError::store(BackendError::from(
        CoreError::SubjectNotFound(id)
      ))),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(ApiError::store(BackendError::from(CoreError::UserNotFound(
        id
      )))),
      StatusCode::NOT_FOUND
    );
  }

  #[test]
  fn rejected_input_maps_to_400() {
    assert_eq!(
      status_of(ApiError::store(BackendError::from(CoreError::Invalid(
        "username must not be blank".into()
      )))),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status_of(ApiError::store(BackendError::from(
        CoreError::SubjectDeleted(Uuid::new_v4())
      ))),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      status_of(ApiError::store(BackendError::from(CoreError::KindChange {
        from: SubjectKind::Account,
        to:   SubjectKind::Task,
      }))),
      StatusCode::BAD_REQUEST
    );
  }

  #[test]
  fn backend_failures_map_to_500() {
    assert_eq!(
      status_of(ApiError::store(BackendError::Database(
        "database is locked".into()
      ))),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn bare_domain_errors_are_classified_too() {
    assert_eq!(
      status_of(ApiError::store(CoreError::SubjectNotFound(Uuid::new_v4()))),
      StatusCode::NOT_FOUND
    );
  }
}
