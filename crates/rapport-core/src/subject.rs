//! Subject — the CRM record an activity describes.
//!
//! A subject is a thin envelope (identity, ownership, visibility) around a
//! typed payload for one of the six record kinds. The payload variants form
//! a closed set; every variant answers `display_name()`, which is what the
//! activity log stores in its `info` column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Access ──────────────────────────────────────────────────────────────────

/// Visibility classification of a subject.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Access {
  /// Owner only.
  Private,
  /// Owner plus explicit permission grantees.
  Shared,
  /// Everyone.
  #[default]
  Public,
}

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The kind of CRM record a subject represents.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
  Account,
  Campaign,
  Contact,
  Lead,
  Opportunity,
  Task,
}

// ─── Detail sub-types ────────────────────────────────────────────────────────

/// A company or organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetails {
  pub name:    String,
  pub website: Option<String>,
  pub phone:   Option<String>,
}

/// Lifecycle state of a campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
  Planned,
  Started,
  Completed,
}

/// A marketing campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDetails {
  pub name:   String,
  pub status: CampaignStatus,
  pub budget: Option<f64>,
}

/// A person attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDetails {
  pub first_name: String,
  pub last_name:  String,
  pub title:      Option<String>,
  pub email:      Option<String>,
}

/// Qualification state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
  New,
  Contacted,
  Converted,
  Rejected,
}

/// An unqualified prospect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadDetails {
  pub first_name: String,
  pub last_name:  String,
  pub company:    Option<String>,
  pub status:     LeadStatus,
}

/// Pipeline stage of an opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStage {
  Prospecting,
  Proposal,
  Negotiation,
  Won,
  Lost,
}

/// A potential deal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpportunityDetails {
  pub name:   String,
  pub stage:  OpportunityStage,
  pub amount: Option<f64>,
}

/// A to-do item. Tasks carry no sharing controls and are always public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetails {
  pub name:   String,
  pub due_at: Option<DateTime<Utc>>,
}

// ─── SubjectDetails ──────────────────────────────────────────────────────────

/// The typed payload of a subject. The variant name serves as the
/// `subject_kind` discriminant stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum SubjectDetails {
  Account(AccountDetails),
  Campaign(CampaignDetails),
  Contact(ContactDetails),
  Lead(LeadDetails),
  Opportunity(OpportunityDetails),
  Task(TaskDetails),
}

impl SubjectDetails {
  pub fn kind(&self) -> SubjectKind {
    match self {
      Self::Account(_) => SubjectKind::Account,
      Self::Campaign(_) => SubjectKind::Campaign,
      Self::Contact(_) => SubjectKind::Contact,
      Self::Lead(_) => SubjectKind::Lead,
      Self::Opportunity(_) => SubjectKind::Opportunity,
      Self::Task(_) => SubjectKind::Task,
    }
  }

  /// The human-readable name recorded in the activity log: the person's
  /// full name for contacts and leads, the record's name otherwise.
  pub fn display_name(&self) -> String {
    match self {
      Self::Account(a) => a.name.clone(),
      Self::Campaign(c) => c.name.clone(),
      Self::Contact(c) => format!("{} {}", c.first_name, c.last_name),
      Self::Lead(l) => format!("{} {}", l.first_name, l.last_name),
      Self::Opportunity(o) => o.name.clone(),
      Self::Task(t) => t.name.clone(),
    }
  }

  /// Reject payloads that would produce an empty display name.
  ///
  /// Runs before any write; a failed validation must leave no trace in the
  /// activity log.
  pub fn validate(&self) -> Result<()> {
    let ok = match self {
      Self::Account(a) => !a.name.trim().is_empty(),
      Self::Campaign(c) => !c.name.trim().is_empty(),
      Self::Contact(c) => {
        !c.first_name.trim().is_empty() && !c.last_name.trim().is_empty()
      }
      Self::Lead(l) => {
        !l.first_name.trim().is_empty() && !l.last_name.trim().is_empty()
      }
      Self::Opportunity(o) => !o.name.trim().is_empty(),
      Self::Task(t) => !t.name.trim().is_empty(),
    };
    if ok {
      Ok(())
    } else {
      Err(Error::Invalid(format!(
        "{:?} requires a non-blank name",
        self.kind()
      )))
    }
  }

  /// Serialise the inner payload (without the kind tag) for the
  /// `details_json` database column.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    // The full serialised form is `{"kind": "...", "data": <payload>}`.
    // We want only the payload.
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Deserialise from the discriminant string and JSON payload stored in
  /// the database.
  pub fn from_parts(
    discriminant: &str,
    data: serde_json::Value,
  ) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": discriminant, "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── SubjectRef ──────────────────────────────────────────────────────────────

/// Polymorphic reference to a subject: kind plus UUID. Stored on
/// activities, permissions, and comments.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct SubjectRef {
  pub kind: SubjectKind,
  pub id:   Uuid,
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// The envelope around a typed CRM record.
///
/// Deletion is soft: `deleted_at` is set and the row kept, so the mutation
/// history of the record survives while its activities stop being visible
/// to any viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub owner_id:   Uuid,
  pub access:     Access,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub deleted_at: Option<DateTime<Utc>>,
  pub details:    SubjectDetails,
}

impl Subject {
  pub fn kind(&self) -> SubjectKind { self.details.kind() }

  pub fn display_name(&self) -> String { self.details.display_name() }

  pub fn subject_ref(&self) -> SubjectRef {
    SubjectRef { kind: self.kind(), id: self.subject_id }
  }

  pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::CrmStore::create_subject`].
/// Timestamps and the UUID are always set by the store.
#[derive(Debug, Clone)]
pub struct NewSubject {
  pub access:  Access,
  pub details: SubjectDetails,
}

impl NewSubject {
  pub fn new(details: SubjectDetails) -> Self {
    Self { access: Access::default(), details }
  }

  pub fn with_access(details: SubjectDetails, access: Access) -> Self {
    Self { access, details }
  }
}

/// Input to [`crate::store::CrmStore::update_subject`]. `None` fields are
/// left untouched. A `details` payload of a different kind is rejected.
#[derive(Debug, Clone, Default)]
pub struct SubjectPatch {
  pub access:  Option<Access>,
  pub details: Option<SubjectDetails>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn contact(first: &str, last: &str) -> SubjectDetails {
    SubjectDetails::Contact(ContactDetails {
      first_name: first.into(),
      last_name:  last.into(),
      title:      None,
      email:      None,
    })
  }

  #[test]
  fn contact_display_name_is_full_name() {
    assert_eq!(contact("Billy", "Bones").display_name(), "Billy Bones");
  }

  #[test]
  fn account_display_name_is_name() {
    let details = SubjectDetails::Account(AccountDetails {
      name:    "Acme Corp".into(),
      website: None,
      phone:   None,
    });
    assert_eq!(details.display_name(), "Acme Corp");
  }

  #[test]
  fn blank_name_fails_validation() {
    let details = SubjectDetails::Task(TaskDetails {
      name:   "   ".into(),
      due_at: None,
    });
    assert!(matches!(details.validate(), Err(Error::Invalid(_))));
  }

  #[test]
  fn blank_last_name_fails_validation() {
    assert!(contact("Billy", "").validate().is_err());
    assert!(contact("Billy", "Bones").validate().is_ok());
  }

  #[test]
  fn details_json_roundtrip() {
    let details = contact("Alice", "Liddell");
    let json = details.to_json().unwrap();
    let back = SubjectDetails::from_parts("contact", json).unwrap();
    assert_eq!(back.display_name(), "Alice Liddell");
    assert_eq!(back.kind(), SubjectKind::Contact);
  }

  #[test]
  fn unknown_discriminant_is_an_error() {
    let res = SubjectDetails::from_parts("widget", serde_json::json!({}));
    assert!(res.is_err());
  }
}
