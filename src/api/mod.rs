//! REST resources under `/api/v1/{country}`. Each submodule owns one resource
//! family and exposes a `router()`; handlers authorize through the
//! [`Authenticated`] extractor before touching the store.

pub mod applications;
pub mod audit;
pub mod auth;
pub mod locations;
pub mod lookups;
pub mod persons;
pub mod regions;
pub mod user_groups;
pub mod users;

use axum::Router;
use sea_orm::ConnectionTrait;
use serde::Serialize;

use crate::authz::{Action, TargetResource};
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::storage::audit::{self as audit_store, AuditAction, AuditEntry};
use crate::storage::scope;
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(user_groups::router())
        .merge(locations::router())
        .merge(regions::router())
        .merge(users::router())
        .merge(persons::router())
        .merge(applications::router())
        .merge(lookups::router())
        .merge(audit::router())
        .merge(crate::authz::web::router())
}

/// Target descriptor of whatever `group_id` owns. A vanished owner reads as
/// not found.
pub(crate) async fn owner_target(
    db: &impl ConnectionTrait,
    group_id: i64,
) -> Result<TargetResource, LincError> {
    scope::target_of_owner(db, group_id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user group {group_id}")))
}

/// Authorize `action` on a record owned by `group_id`.
pub(crate) async fn authorize_owner(
    auth: &Authenticated,
    group_id: i64,
    action: Action,
) -> Result<(), LincError> {
    let target = owner_target(&auth.tenant.db, group_id).await?;
    auth.authorize(&target, action)?;
    Ok(())
}

pub(crate) async fn audit<T: Serialize>(
    db: &impl ConnectionTrait,
    auth: &Authenticated,
    action: AuditAction,
    entity_type: &str,
    entity_id: impl ToString,
    old: Option<&T>,
    new: Option<&T>,
) -> Result<(), LincError> {
    audit_store::record(
        db,
        AuditEntry {
            user_id: Some(auth.user.id),
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            old,
            new,
        },
    )
    .await
}
