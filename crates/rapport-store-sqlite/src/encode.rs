//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Subject payloads are
//! stored as compact JSON. UUIDs are stored as hyphenated lowercase
//! strings; enums as their lowercase serde tags.

use chrono::{DateTime, Utc};
use rapport_core::{
  activity::{Action, Activity},
  permission::Permission,
  subject::{Access, Subject, SubjectDetails, SubjectKind, SubjectRef},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Access ──────────────────────────────────────────────────────────────────

pub fn encode_access(a: Access) -> &'static str {
  match a {
    Access::Private => "private",
    Access::Shared => "shared",
    Access::Public => "public",
  }
}

pub fn decode_access(s: &str) -> Result<Access> {
  match s {
    "private" => Ok(Access::Private),
    "shared" => Ok(Access::Shared),
    "public" => Ok(Access::Public),
    other => Err(Error::Decode(format!("unknown access mode: {other:?}"))),
  }
}

// ─── SubjectKind ─────────────────────────────────────────────────────────────

pub fn encode_subject_kind(k: SubjectKind) -> &'static str {
  match k {
    SubjectKind::Account => "account",
    SubjectKind::Campaign => "campaign",
    SubjectKind::Contact => "contact",
    SubjectKind::Lead => "lead",
    SubjectKind::Opportunity => "opportunity",
    SubjectKind::Task => "task",
  }
}

pub fn decode_subject_kind(s: &str) -> Result<SubjectKind> {
  match s {
    "account" => Ok(SubjectKind::Account),
    "campaign" => Ok(SubjectKind::Campaign),
    "contact" => Ok(SubjectKind::Contact),
    "lead" => Ok(SubjectKind::Lead),
    "opportunity" => Ok(SubjectKind::Opportunity),
    "task" => Ok(SubjectKind::Task),
    other => Err(Error::Decode(format!("unknown subject kind: {other:?}"))),
  }
}

// ─── Action ──────────────────────────────────────────────────────────────────

pub fn decode_action(s: &str) -> Result<Action> {
  s.parse::<Action>().map_err(Error::Core)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub created_at: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id:   String,
  pub owner_id:     String,
  pub subject_kind: String,
  pub access:       String,
  pub details_json: String,
  pub created_at:   String,
  pub updated_at:   String,
  pub deleted_at:   Option<String>,
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    let data: serde_json::Value = serde_json::from_str(&self.details_json)?;
    let details = SubjectDetails::from_parts(&self.subject_kind, data)
      .map_err(Error::Core)?;

    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      owner_id:   decode_uuid(&self.owner_id)?,
      access:     decode_access(&self.access)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
      details,
    })
  }
}

/// Raw strings read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id:  String,
  pub user_id:      String,
  pub subject_kind: String,
  pub subject_id:   String,
  pub action:       String,
  pub info:         String,
  pub private:      bool,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id: decode_uuid(&self.activity_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      subject:     SubjectRef {
        kind: decode_subject_kind(&self.subject_kind)?,
        id:   decode_uuid(&self.subject_id)?,
      },
      action:      decode_action(&self.action)?,
      info:        self.info,
      private:     self.private,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `permissions` row.
pub struct RawPermission {
  pub permission_id: String,
  pub user_id:       String,
  pub subject_kind:  String,
  pub subject_id:    String,
  pub created_at:    String,
}

impl RawPermission {
  pub fn into_permission(self) -> Result<Permission> {
    Ok(Permission {
      permission_id: decode_uuid(&self.permission_id)?,
      user_id:       decode_uuid(&self.user_id)?,
      subject:       SubjectRef {
        kind: decode_subject_kind(&self.subject_kind)?,
        id:   decode_uuid(&self.subject_id)?,
      },
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}
