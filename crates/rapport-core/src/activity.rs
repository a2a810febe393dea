//! Activity — the immutable log entry describing one lifecycle or view
//! event on a subject, plus the composable query type for the feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, subject::SubjectRef};

// ─── Action ──────────────────────────────────────────────────────────────────

/// What happened to the subject. The set is closed; an unknown string at
/// the storage boundary is a decode error, not a runtime case.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Created,
  Updated,
  Deleted,
  Viewed,
  Commented,
}

impl Action {
  pub const ALL: [Action; 5] = [
    Action::Created,
    Action::Updated,
    Action::Deleted,
    Action::Viewed,
    Action::Commented,
  ];

  /// The string stored in the `action` column.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Created => "created",
      Self::Updated => "updated",
      Self::Deleted => "deleted",
      Self::Viewed => "viewed",
      Self::Commented => "commented",
    }
  }
}

impl std::str::FromStr for Action {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "created" => Ok(Self::Created),
      "updated" => Ok(Self::Updated),
      "deleted" => Ok(Self::Deleted),
      "viewed" => Ok(Self::Viewed),
      "commented" => Ok(Self::Commented),
      other => Err(Error::UnknownAction(other.to_owned())),
    }
  }
}

// ─── Activity ────────────────────────────────────────────────────────────────

/// One log entry. Written exactly once per tracked event; never updated
/// afterwards except the `updated_at` touch on a re-viewed `Viewed` row,
/// and never deleted directly by users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id: Uuid,
  /// The acting user.
  pub user_id:     Uuid,
  pub subject:     SubjectRef,
  pub action:      Action,
  /// The subject's display name at the time of the event.
  pub info:        String,
  /// Mirror of the subject's access being Private at recording time.
  pub private:     bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Composable filter over the activity feed.
///
/// Builder calls accumulate and commute: `for_user(u).only(s)` selects the
/// same set as `only(s).for_user(u)`. Results are ordered by `created_at`
/// descending; the `latest` bound is applied after visibility filtering so
/// a feed of N rows really contains N visible rows.
#[derive(Debug, Clone, Default)]
pub struct ActivityQuery {
  pub actor:   Option<Uuid>,
  pub only:    Vec<Action>,
  pub except:  Vec<Action>,
  pub limit:   Option<usize>,
  pub viewer:  Option<Uuid>,
}

impl ActivityQuery {
  pub fn new() -> Self { Self::default() }

  /// Restrict to activities performed by `user_id`.
  pub fn for_user(mut self, user_id: Uuid) -> Self {
    self.actor = Some(user_id);
    self
  }

  /// Include only rows whose action is in the given set. Repeated calls
  /// widen the set.
  pub fn only(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
    self.only.extend(actions);
    self
  }

  /// Exclude rows whose action is in the given set. Repeated calls widen
  /// the set.
  pub fn except(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
    self.except.extend(actions);
    self
  }

  /// Bound the result to the most recent `limit` rows.
  pub fn latest(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  /// Drop rows the given viewer may not see, per the permission resolver.
  pub fn visible_to(mut self, viewer: Uuid) -> Self {
    self.viewer = Some(viewer);
    self
  }

  /// Whether `activity` passes the actor and action filters. Visibility
  /// and the recency bound are applied by the store, not here.
  pub fn matches(&self, activity: &Activity) -> bool {
    if let Some(actor) = self.actor
      && activity.user_id != actor
    {
      return false;
    }
    if !self.only.is_empty() && !self.only.contains(&activity.action) {
      return false;
    }
    !self.except.contains(&activity.action)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subject::SubjectKind;

  fn activity(user_id: Uuid, action: Action) -> Activity {
    let now = Utc::now();
    Activity {
      activity_id: Uuid::new_v4(),
      user_id,
      subject: SubjectRef { kind: SubjectKind::Lead, id: Uuid::new_v4() },
      action,
      info: "Billy Bones".into(),
      private: false,
      created_at: now,
      updated_at: now,
    }
  }

  #[test]
  fn action_string_roundtrip() {
    for action in Action::ALL {
      assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
    }
    assert!("renamed".parse::<Action>().is_err());
  }

  #[test]
  fn for_user_filters_by_actor() {
    let alice = Uuid::new_v4();
    let query = ActivityQuery::new().for_user(alice);
    assert!(query.matches(&activity(alice, Action::Created)));
    assert!(!query.matches(&activity(Uuid::new_v4(), Action::Created)));
  }

  #[test]
  fn only_restricts_to_the_given_set() {
    let user = Uuid::new_v4();
    let query =
      ActivityQuery::new().only([Action::Created, Action::Updated]);
    assert!(query.matches(&activity(user, Action::Created)));
    assert!(query.matches(&activity(user, Action::Updated)));
    assert!(!query.matches(&activity(user, Action::Viewed)));
  }

  #[test]
  fn except_drops_the_given_set() {
    let user = Uuid::new_v4();
    let query = ActivityQuery::new().except([Action::Viewed]);
    assert!(query.matches(&activity(user, Action::Created)));
    assert!(!query.matches(&activity(user, Action::Viewed)));
  }

  #[test]
  fn except_equals_only_of_complement() {
    let user = Uuid::new_v4();
    let excluded = [Action::Viewed, Action::Commented];
    let complement =
      Action::ALL.into_iter().filter(|a| !excluded.contains(a));

    let via_except = ActivityQuery::new().except(excluded);
    let via_only = ActivityQuery::new().only(complement);

    for action in Action::ALL {
      let row = activity(user, action);
      assert_eq!(via_except.matches(&row), via_only.matches(&row));
    }
  }

  #[test]
  fn filter_order_does_not_change_the_result() {
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let a = ActivityQuery::new()
      .for_user(alice)
      .only([Action::Created, Action::Deleted])
      .except([Action::Deleted]);
    let b = ActivityQuery::new()
      .except([Action::Deleted])
      .only([Action::Created, Action::Deleted])
      .for_user(alice);

    for user in [alice, bob] {
      for action in Action::ALL {
        let row = activity(user, action);
        assert_eq!(a.matches(&row), b.matches(&row));
      }
    }
  }
}
