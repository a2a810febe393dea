//! [`SqliteStore`] — the SQLite implementation of [`CrmStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use rapport_core::{
  activity::{Action, Activity, ActivityQuery},
  comment::Comment,
  permission::{Permission, subject_visible_to},
  recorder::NewActivity,
  store::CrmStore,
  subject::{
    Access, NewSubject, Subject, SubjectKind, SubjectPatch, SubjectRef,
  },
  user::User,
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawPermission, RawSubject, RawUser,
    encode_access, encode_dt, encode_subject_kind, encode_uuid,
  },
  schema::SCHEMA,
};

/// Tasks carry no sharing controls; whatever the caller asks for, a task
/// is public.
fn normalise_access(kind: SubjectKind, access: Access) -> Access {
  if kind == SubjectKind::Task { Access::Public } else { access }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rapport CRM store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Internal helpers ──────────────────────────────────────────────────────

  async fn user_exists(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let exists: bool = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn load_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, owner_id, subject_kind, access,
                      details_json, created_at, updated_at, deleted_at
               FROM subjects WHERE subject_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawSubject {
                  subject_id:   row.get(0)?,
                  owner_id:     row.get(1)?,
                  subject_kind: row.get(2)?,
                  access:       row.get(3)?,
                  details_json: row.get(4)?,
                  created_at:   row.get(5)?,
                  updated_at:   row.get(6)?,
                  deleted_at:   row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubject::into_subject).transpose()
  }

  /// Load a subject that must exist and must not be soft-deleted.
  async fn require_live_subject(&self, id: Uuid) -> Result<Subject> {
    let subject = self
      .load_subject(id)
      .await?
      .ok_or(Error::Core(rapport_core::Error::SubjectNotFound(id)))?;
    if subject.is_deleted() {
      return Err(Error::Core(rapport_core::Error::SubjectDeleted(id)));
    }
    Ok(subject)
  }

  /// Insert one activity row. Used by [`Self::record`]; not exposed.
  async fn insert_activity(&self, event: NewActivity) -> Result<Activity> {
    let now = Utc::now();
    let activity = Activity {
      activity_id: Uuid::new_v4(),
      user_id:     event.user_id,
      subject:     event.subject,
      action:      event.action,
      info:        event.info,
      private:     event.private,
      created_at:  now,
      updated_at:  now,
    };

    let id_str      = encode_uuid(activity.activity_id);
    let user_str    = encode_uuid(activity.user_id);
    let kind_str    = encode_subject_kind(activity.subject.kind).to_owned();
    let subject_str = encode_uuid(activity.subject.id);
    let action_str  = activity.action.as_str().to_owned();
    let info        = activity.info.clone();
    let private     = activity.private;
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (
             activity_id, user_id, subject_kind, subject_id,
             action, info, private, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
          rusqlite::params![
            id_str,
            user_str,
            kind_str,
            subject_str,
            action_str,
            info,
            private,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(activity)
  }

  /// Best-effort activity recording: a failure here must never abort the
  /// mutation that triggered it.
  async fn record(&self, event: NewActivity) {
    let action = event.action;
    let subject_id = event.subject.id;
    if let Err(e) = self.insert_activity(event).await {
      tracing::warn!(
        %subject_id,
        action = action.as_str(),
        error = %e,
        "failed to record activity",
      );
    }
  }

  /// Insert or touch the viewer's `viewed` row for `subject`. Best-effort,
  /// like [`Self::record`].
  async fn record_view(&self, viewer_id: Uuid, subject: &Subject) {
    if let Err(e) = self.touch_view(viewer_id, subject).await {
      tracing::warn!(
        subject_id = %subject.subject_id,
        error = %e,
        "failed to record view",
      );
    }
  }

  async fn touch_view(&self, viewer_id: Uuid, subject: &Subject) -> Result<()> {
    let user_str    = encode_uuid(viewer_id);
    let subject_str = encode_uuid(subject.subject_id);
    let info        = subject.display_name();
    let at_str      = encode_dt(Utc::now());

    let touched: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE activities SET updated_at = ?1, info = ?2
           WHERE user_id = ?3 AND subject_id = ?4 AND action = 'viewed'",
          rusqlite::params![at_str, info, user_str, subject_str],
        )?)
      })
      .await?;

    if touched == 0 {
      self
        .insert_activity(NewActivity::for_event(
          viewer_id,
          subject,
          Action::Viewed,
        ))
        .await?;
    }
    Ok(())
  }

  /// Drop every user's `viewed` rows for a subject — called on delete, so
  /// the record falls off all recently-viewed lists.
  async fn purge_viewed(&self, subject_id: Uuid) -> Result<()> {
    let subject_str = encode_uuid(subject_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM activities
           WHERE subject_id = ?1 AND action = 'viewed'",
          rusqlite::params![subject_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn persist_subject_update(&self, subject: &Subject) -> Result<()> {
    let id_str      = encode_uuid(subject.subject_id);
    let access_str  = encode_access(subject.access).to_owned();
    let details_str = subject.details.to_json().map_err(Error::Core)?.to_string();
    let at_str      = encode_dt(subject.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects
           SET access = ?1, details_json = ?2, updated_at = ?3
           WHERE subject_id = ?4",
          rusqlite::params![access_str, details_str, at_str, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All activity rows matching the optional actor filter, newest first.
  /// Insert order breaks `created_at` ties.
  async fn load_activities(&self, actor: Option<Uuid>) -> Result<Vec<Activity>> {
    let actor_str = actor.map(encode_uuid);

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let sql_all =
          "SELECT activity_id, user_id, subject_kind, subject_id,
                  action, info, private, created_at, updated_at
           FROM activities
           ORDER BY created_at DESC, rowid DESC";
        let sql_for =
          "SELECT activity_id, user_id, subject_kind, subject_id,
                  action, info, private, created_at, updated_at
           FROM activities
           WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC";

        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawActivity {
            activity_id:  row.get(0)?,
            user_id:      row.get(1)?,
            subject_kind: row.get(2)?,
            subject_id:   row.get(3)?,
            action:       row.get(4)?,
            info:         row.get(5)?,
            private:      row.get(6)?,
            created_at:   row.get(7)?,
            updated_at:   row.get(8)?,
          })
        };

        let rows = if let Some(actor) = actor_str {
          let mut stmt = conn.prepare(sql_for)?;
          stmt
            .query_map(rusqlite::params![actor], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(sql_all)?;
          stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  /// Batch-load the subjects referenced by a candidate activity set.
  async fn load_subjects_by_ids(
    &self,
    ids: Vec<Uuid>,
  ) -> Result<HashMap<Uuid, Subject>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }

    let id_strs: Vec<String> = ids.into_iter().map(encode_uuid).collect();

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let placeholders = std::iter::repeat("?")
          .take(id_strs.len())
          .collect::<Vec<_>>()
          .join(", ");
        let sql = format!(
          "SELECT subject_id, owner_id, subject_kind, access,
                  details_json, created_at, updated_at, deleted_at
           FROM subjects WHERE subject_id IN ({placeholders})"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs.iter()), |row| {
            Ok(RawSubject {
              subject_id:   row.get(0)?,
              owner_id:     row.get(1)?,
              subject_kind: row.get(2)?,
              access:       row.get(3)?,
              details_json: row.get(4)?,
              created_at:   row.get(5)?,
              updated_at:   row.get(6)?,
              deleted_at:   row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| {
        let subject = raw.into_subject()?;
        Ok((subject.subject_id, subject))
      })
      .collect()
  }

  /// All permission grants held by `viewer`.
  async fn load_grants(&self, viewer: Uuid) -> Result<Vec<Permission>> {
    let user_str = encode_uuid(viewer);

    let raws: Vec<RawPermission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT permission_id, user_id, subject_kind, subject_id, created_at
           FROM permissions WHERE user_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawPermission {
              permission_id: row.get(0)?,
              user_id:       row.get(1)?,
              subject_kind:  row.get(2)?,
              subject_id:    row.get(3)?,
              created_at:    row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPermission::into_permission).collect()
  }
}

// ─── CrmStore impl ───────────────────────────────────────────────────────────

impl CrmStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, username: String) -> Result<User> {
    if username.trim().is_empty() {
      return Err(Error::Core(rapport_core::Error::Invalid(
        "username must not be blank".into(),
      )));
    }

    let user = User {
      user_id: Uuid::new_v4(),
      username,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.username.clone();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, created_at FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawUser {
                  user_id:    row.get(0)?,
                  username:   row.get(1)?,
                  created_at: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn create_subject(
    &self,
    owner_id: Uuid,
    input: NewSubject,
  ) -> Result<Subject> {
    // Validation first: a failed create must leave no activity behind.
    input.details.validate().map_err(Error::Core)?;

    if !self.user_exists(owner_id).await? {
      return Err(Error::Core(rapport_core::Error::UserNotFound(owner_id)));
    }

    let now = Utc::now();
    let subject = Subject {
      subject_id: Uuid::new_v4(),
      owner_id,
      access: normalise_access(input.details.kind(), input.access),
      created_at: now,
      updated_at: now,
      deleted_at: None,
      details: input.details,
    };

    let id_str      = encode_uuid(subject.subject_id);
    let owner_str   = encode_uuid(owner_id);
    let kind_str    = encode_subject_kind(subject.kind()).to_owned();
    let access_str  = encode_access(subject.access).to_owned();
    let details_str =
      subject.details.to_json().map_err(Error::Core)?.to_string();
    let at_str      = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (
             subject_id, owner_id, subject_kind, access,
             details_json, created_at, updated_at, deleted_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, NULL)",
          rusqlite::params![
            id_str,
            owner_str,
            kind_str,
            access_str,
            details_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .record(NewActivity::for_event(owner_id, &subject, Action::Created))
      .await;
    // A freshly created record is also its creator's most recently viewed.
    self.record_view(owner_id, &subject).await;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    self.load_subject(id).await
  }

  async fn list_subjects(
    &self,
    kind: Option<SubjectKind>,
  ) -> Result<Vec<Subject>> {
    let kind_str = kind.map(encode_subject_kind).map(str::to_owned);

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let map_row = |row: &rusqlite::Row<'_>| {
          Ok(RawSubject {
            subject_id:   row.get(0)?,
            owner_id:     row.get(1)?,
            subject_kind: row.get(2)?,
            access:       row.get(3)?,
            details_json: row.get(4)?,
            created_at:   row.get(5)?,
            updated_at:   row.get(6)?,
            deleted_at:   row.get(7)?,
          })
        };

        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(
            "SELECT subject_id, owner_id, subject_kind, access,
                    details_json, created_at, updated_at, deleted_at
             FROM subjects
             WHERE subject_kind = ?1 AND deleted_at IS NULL",
          )?;
          stmt
            .query_map(rusqlite::params![k], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT subject_id, owner_id, subject_kind, access,
                    details_json, created_at, updated_at, deleted_at
             FROM subjects WHERE deleted_at IS NULL",
          )?;
          stmt
            .query_map([], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn view_subject(&self, viewer_id: Uuid, id: Uuid) -> Result<Subject> {
    let subject = self.require_live_subject(id).await?;
    self.record_view(viewer_id, &subject).await;
    Ok(subject)
  }

  async fn update_subject(
    &self,
    actor_id: Uuid,
    id: Uuid,
    patch: SubjectPatch,
  ) -> Result<Subject> {
    let mut subject = self.require_live_subject(id).await?;

    // Validation first, writes after: a rejected patch records nothing.
    if let Some(details) = patch.details {
      if details.kind() != subject.kind() {
        return Err(Error::Core(rapport_core::Error::KindChange {
          from: subject.kind(),
          to:   details.kind(),
        }));
      }
      details.validate().map_err(Error::Core)?;
      subject.details = details;
    }
    if let Some(access) = patch.access {
      subject.access = normalise_access(subject.kind(), access);
    }
    subject.updated_at = Utc::now();

    self.persist_subject_update(&subject).await?;

    self
      .record(NewActivity::for_event(actor_id, &subject, Action::Updated))
      .await;
    self.record_view(actor_id, &subject).await;

    Ok(subject)
  }

  async fn delete_subject(&self, actor_id: Uuid, id: Uuid) -> Result<()> {
    let subject = self.require_live_subject(id).await?;

    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE subjects SET deleted_at = ?1, updated_at = ?1
           WHERE subject_id = ?2",
          rusqlite::params![at_str, id_str],
        )?;
        Ok(())
      })
      .await?;

    // Deleted records drop off everyone's recently-viewed list.
    if let Err(e) = self.purge_viewed(id).await {
      tracing::warn!(subject_id = %id, error = %e, "failed to purge viewed rows");
    }

    self
      .record(NewActivity::for_event(actor_id, &subject, Action::Deleted))
      .await;

    Ok(())
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn add_comment(
    &self,
    actor_id: Uuid,
    subject_ref: SubjectRef,
    body: String,
  ) -> Result<Comment> {
    if body.trim().is_empty() {
      return Err(Error::Core(rapport_core::Error::Invalid(
        "comment body must not be blank".into(),
      )));
    }

    let subject = self.require_live_subject(subject_ref.id).await?;

    let comment = Comment {
      comment_id: Uuid::new_v4(),
      user_id: actor_id,
      subject: subject.subject_ref(),
      body,
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(comment.comment_id);
    let user_str    = encode_uuid(actor_id);
    let kind_str    = encode_subject_kind(comment.subject.kind).to_owned();
    let subject_str = encode_uuid(comment.subject.id);
    let body_str    = comment.body.clone();
    let at_str      = encode_dt(comment.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (
             comment_id, user_id, subject_kind, subject_id, body, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            user_str,
            kind_str,
            subject_str,
            body_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .record(NewActivity::for_event(actor_id, &subject, Action::Commented))
      .await;

    Ok(comment)
  }

  // ── Permissions ───────────────────────────────────────────────────────────

  async fn grant_permission(
    &self,
    user_id: Uuid,
    subject_ref: SubjectRef,
  ) -> Result<Permission> {
    if !self.user_exists(user_id).await? {
      return Err(Error::Core(rapport_core::Error::UserNotFound(user_id)));
    }
    let subject = self.require_live_subject(subject_ref.id).await?;

    let permission = Permission {
      permission_id: Uuid::new_v4(),
      user_id,
      subject: subject.subject_ref(),
      created_at: Utc::now(),
    };

    let id_str      = encode_uuid(permission.permission_id);
    let user_str    = encode_uuid(user_id);
    let kind_str    = encode_subject_kind(permission.subject.kind).to_owned();
    let subject_str = encode_uuid(permission.subject.id);
    let at_str      = encode_dt(permission.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO permissions (
             permission_id, user_id, subject_kind, subject_id, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, kind_str, subject_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(permission)
  }

  // ── Activity feed ─────────────────────────────────────────────────────────

  async fn activities(&self, query: &ActivityQuery) -> Result<Vec<Activity>> {
    let mut rows = self.load_activities(query.actor).await?;
    rows.retain(|a| query.matches(a));

    if let Some(viewer) = query.viewer {
      let mut ids: Vec<Uuid> = rows.iter().map(|a| a.subject.id).collect();
      ids.sort_unstable();
      ids.dedup();

      let subjects = self.load_subjects_by_ids(ids).await?;
      let grants = self.load_grants(viewer).await?;

      // A row whose subject is missing or deleted fails closed.
      rows.retain(|a| {
        subjects
          .get(&a.subject.id)
          .is_some_and(|s| subject_visible_to(viewer, s, &grants))
      });
    }

    // The recency bound counts rows the viewer actually gets to see, so it
    // is applied after the visibility filter.
    if let Some(limit) = query.limit {
      rows.truncate(limit);
    }

    Ok(rows)
  }

  async fn recently_viewed(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> Result<Vec<Activity>> {
    let user_str  = encode_uuid(user_id);
    let limit_val = limit as i64;

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT activity_id, user_id, subject_kind, subject_id,
                  action, info, private, created_at, updated_at
           FROM activities
           WHERE user_id = ?1 AND action = 'viewed'
           ORDER BY updated_at DESC, rowid DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, limit_val], |row| {
            Ok(RawActivity {
              activity_id:  row.get(0)?,
              user_id:      row.get(1)?,
              subject_kind: row.get(2)?,
              subject_id:   row.get(3)?,
              action:       row.get(4)?,
              info:         row.get(5)?,
              private:      row.get(6)?,
              created_at:   row.get(7)?,
              updated_at:   row.get(8)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }
}
