//! JSON REST API for Rapport.
//!
//! Exposes an axum [`Router`] backed by any [`rapport_core::store::CrmStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility; the
//! acting user and the feed viewer are identified by UUID in the request.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rapport_api::api_router(store.clone()))
//! ```

pub mod activities;
pub mod comments;
pub mod error;
pub mod permissions;
pub mod subjects;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rapport_core::store::CrmStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CrmStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Users
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    // Subjects
    .route("/subjects", get(subjects::list::<S>).post(subjects::create::<S>))
    .route(
      "/subjects/{id}",
      get(subjects::get_one::<S>)
        .patch(subjects::update::<S>)
        .delete(subjects::delete::<S>),
    )
    .route("/subjects/{id}/comments", post(comments::create::<S>))
    .route("/subjects/{id}/permissions", post(permissions::create::<S>))
    // Activity feed
    .route("/activities", get(activities::feed::<S>))
    .route("/activities/recent", get(activities::recent::<S>))
    .with_state(store)
}
