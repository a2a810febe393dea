//! Users — actors and viewers.
//!
//! Authentication and sessions live outside this crate; callers identify
//! themselves by UUID and the store only verifies existence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user. Acts on subjects, views the activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub created_at: DateTime<Utc>,
}
