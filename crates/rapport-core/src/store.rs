//! The `CrmStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `rapport-store-sqlite`). Higher layers (`rapport-api`, the server
//! binary) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::{Activity, ActivityQuery},
  comment::Comment,
  permission::Permission,
  subject::{NewSubject, Subject, SubjectKind, SubjectPatch, SubjectRef},
  user::User,
};

/// Abstraction over a Rapport CRM backend.
///
/// Every tracked mutation (create, update, delete, comment) records its
/// activity synchronously within the same call, before returning to the
/// caller. Recording is best-effort: a logging failure is traced and
/// swallowed, never surfaced as the mutation's error. Validation failures
/// happen before any write, so they leave no activity behind.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CrmStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new user.
  fn create_user(
    &self,
    username: String,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by UUID. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Create a subject owned by `owner_id`. Records a `created` activity
  /// and seeds the owner's `viewed` row (a freshly created record is also
  /// its creator's most recently viewed one).
  fn create_subject(
    &self,
    owner_id: Uuid,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Plain read, no side effects. Soft-deleted subjects are returned too;
  /// callers check `deleted_at`.
  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  /// List all live subjects, optionally restricted to one kind.
  fn list_subjects(
    &self,
    kind: Option<SubjectKind>,
  ) -> impl Future<Output = Result<Vec<Subject>, Self::Error>> + Send + '_;

  /// Display access: returns the subject and records (or touches) the
  /// viewer's `viewed` activity. Errors on missing or deleted subjects.
  fn view_subject(
    &self,
    viewer_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Apply `patch`, record an `updated` activity carrying the post-update
  /// display name, and touch the actor's `viewed` row.
  fn update_subject(
    &self,
    actor_id: Uuid,
    id: Uuid,
    patch: SubjectPatch,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + '_;

  /// Soft-delete the subject, record a `deleted` activity, and purge every
  /// user's `viewed` rows for it.
  fn delete_subject(
    &self,
    actor_id: Uuid,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Attach a comment and record a `commented` activity.
  fn add_comment(
    &self,
    actor_id: Uuid,
    subject: SubjectRef,
    body: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  // ── Permissions ───────────────────────────────────────────────────────

  /// Grant `user_id` visibility on a Shared subject.
  fn grant_permission(
    &self,
    user_id: Uuid,
    subject: SubjectRef,
  ) -> impl Future<Output = Result<Permission, Self::Error>> + Send + '_;

  // ── Activity feed ─────────────────────────────────────────────────────

  /// Run a composed [`ActivityQuery`]. Rows come back ordered by
  /// `created_at` descending; the `latest` bound is applied after the
  /// visibility filter.
  fn activities<'a>(
    &'a self,
    query: &'a ActivityQuery,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + 'a;

  /// The user's `viewed` rows, most recently touched first.
  fn recently_viewed(
    &self,
    user_id: Uuid,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Activity>, Self::Error>> + Send + '_;
}
