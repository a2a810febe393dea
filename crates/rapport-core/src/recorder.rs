//! Activity recording — explicit event construction.
//!
//! The original design hid activity logging inside ORM lifecycle hooks.
//! Here the mutation layer builds a [`NewActivity`] explicitly for each
//! tracked event and hands it to the store, which persists it best-effort:
//! a failure to log is reported but never aborts the mutation itself.

use uuid::Uuid;

use crate::{
  activity::Action,
  subject::{Access, Subject, SubjectRef},
};

/// Input to the store's activity insert. The UUID and timestamps are
/// always assigned by the store.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub user_id: Uuid,
  pub subject: SubjectRef,
  pub action:  Action,
  pub info:    String,
  pub private: bool,
}

impl NewActivity {
  /// Describe one tracked event on `subject`, performed by `actor`.
  ///
  /// `info` captures the subject's display name at event time, so the feed
  /// stays readable even after the record is renamed or deleted.
  pub fn for_event(actor: Uuid, subject: &Subject, action: Action) -> Self {
    Self {
      user_id: actor,
      subject: subject.subject_ref(),
      action,
      info: subject.display_name(),
      private: subject.access == Access::Private,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use crate::subject::{ContactDetails, SubjectDetails, SubjectKind};

  fn contact(access: Access) -> Subject {
    let now = Utc::now();
    Subject {
      subject_id: Uuid::new_v4(),
      owner_id: Uuid::new_v4(),
      access,
      created_at: now,
      updated_at: now,
      deleted_at: None,
      details: SubjectDetails::Contact(ContactDetails {
        first_name: "Billy".into(),
        last_name:  "Bones".into(),
        title:      None,
        email:      None,
      }),
    }
  }

  #[test]
  fn info_is_the_display_name_at_event_time() {
    let subject = contact(Access::Public);
    let actor = Uuid::new_v4();
    let event = NewActivity::for_event(actor, &subject, Action::Created);

    assert_eq!(event.info, "Billy Bones");
    assert_eq!(event.user_id, actor);
    assert_eq!(event.subject.kind, SubjectKind::Contact);
    assert_eq!(event.subject.id, subject.subject_id);
    assert!(!event.private);
  }

  #[test]
  fn private_subjects_produce_private_activities() {
    let subject = contact(Access::Private);
    let event =
      NewActivity::for_event(Uuid::new_v4(), &subject, Action::Updated);
    assert!(event.private);
  }
}
