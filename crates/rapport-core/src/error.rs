//! Error types for `rapport-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::subject::SubjectKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("subject {0} has been deleted")]
  SubjectDeleted(Uuid),

  #[error("cannot change subject kind from {from:?} to {to:?}")]
  KindChange { from: SubjectKind, to: SubjectKind },

  #[error("validation failed: {0}")]
  Invalid(String),

  #[error("unknown action kind: {0:?}")]
  UnknownAction(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
