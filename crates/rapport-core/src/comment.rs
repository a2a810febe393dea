//! Comments attached to subjects.
//!
//! A comment is a free-text note on any subject kind. Attaching one is a
//! tracked event: the store records a `commented` activity carrying the
//! subject's display name at comment time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::SubjectRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  /// The author.
  pub user_id:    Uuid,
  pub subject:    SubjectRef,
  pub body:       String,
  pub created_at: DateTime<Utc>,
}
