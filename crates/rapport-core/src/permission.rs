//! Permission grants and the visibility resolver.
//!
//! A grant is an explicit user-to-subject exception: it widens a Shared
//! subject to the named user. Private and Public subjects ignore grants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::{Access, Subject, SubjectRef};

/// An explicit visibility exception for a Shared subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
  pub permission_id: Uuid,
  /// The grantee.
  pub user_id:       Uuid,
  pub subject:       SubjectRef,
  pub created_at:    DateTime<Utc>,
}

/// Whether `viewer` may see `subject`, given the subject's grants.
///
/// Deleted subjects are visible to nobody, their owner included; the feed
/// fails closed once a record is gone.
pub fn subject_visible_to(
  viewer: Uuid,
  subject: &Subject,
  grants: &[Permission],
) -> bool {
  if subject.is_deleted() {
    return false;
  }
  match subject.access {
    Access::Public => true,
    Access::Private => subject.owner_id == viewer,
    Access::Shared => {
      subject.owner_id == viewer
        || grants.iter().any(|g| {
          g.user_id == viewer && g.subject.id == subject.subject_id
        })
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subject::{AccountDetails, SubjectDetails};

  fn account(owner: Uuid, access: Access) -> Subject {
    let now = Utc::now();
    Subject {
      subject_id: Uuid::new_v4(),
      owner_id: owner,
      access,
      created_at: now,
      updated_at: now,
      deleted_at: None,
      details: SubjectDetails::Account(AccountDetails {
        name:    "Acme Corp".into(),
        website: None,
        phone:   None,
      }),
    }
  }

  fn grant(user: Uuid, subject: &Subject) -> Permission {
    Permission {
      permission_id: Uuid::new_v4(),
      user_id:       user,
      subject:       subject.subject_ref(),
      created_at:    Utc::now(),
    }
  }

  #[test]
  fn private_is_owner_only() {
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();
    let subject = account(owner, Access::Private);

    assert!(subject_visible_to(owner, &subject, &[]));
    assert!(!subject_visible_to(other, &subject, &[]));
  }

  #[test]
  fn shared_requires_a_grant() {
    let owner = Uuid::new_v4();
    let grantee = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let subject = account(owner, Access::Shared);
    let grants = vec![grant(grantee, &subject)];

    assert!(subject_visible_to(owner, &subject, &grants));
    assert!(subject_visible_to(grantee, &subject, &grants));
    assert!(!subject_visible_to(stranger, &subject, &grants));
  }

  #[test]
  fn grant_on_a_different_subject_does_not_leak() {
    let owner = Uuid::new_v4();
    let grantee = Uuid::new_v4();
    let subject = account(owner, Access::Shared);
    let other_subject = account(owner, Access::Shared);
    let grants = vec![grant(grantee, &other_subject)];

    assert!(!subject_visible_to(grantee, &subject, &grants));
  }

  #[test]
  fn public_is_visible_to_everyone() {
    let subject = account(Uuid::new_v4(), Access::Public);
    assert!(subject_visible_to(Uuid::new_v4(), &subject, &[]));
  }

  #[test]
  fn deleted_subject_is_visible_to_nobody() {
    let owner = Uuid::new_v4();
    let mut subject = account(owner, Access::Public);
    subject.deleted_at = Some(Utc::now());

    assert!(!subject_visible_to(owner, &subject, &[]));
  }
}
