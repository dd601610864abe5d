//! Locations and the staff assigned to them.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use sea_orm::TransactionTrait;

use crate::api::{audit, authorize_owner};
use crate::authz::Action;
use crate::entities::location;
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::RecordState;
use crate::storage::assignments::{self, NewAssignment};
use crate::storage::audit::AuditAction;
use crate::storage::locations::{self, LocationPatch, NewLocation};
use crate::storage::{user_groups, users};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/{country}/locations",
            get(list_locations).post(create_location),
        )
        .route(
            "/api/v1/{country}/locations/{id}",
            get(get_location)
                .patch(update_location)
                .delete(delete_location),
        )
        .route(
            "/api/v1/{country}/locations/{id}/staff",
            get(list_staff).post(assign_staff),
        )
        .route(
            "/api/v1/{country}/locations/{id}/staff/{assignment_id}",
            delete(unassign_staff),
        )
}

async fn load_location(
    auth: &Authenticated,
    id: i64,
    action: Action,
) -> Result<location::Model, LincError> {
    let location = locations::get(&auth.tenant.db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("location {id}")))?;
    authorize_owner(auth, location.user_group_id, action).await?;
    Ok(location)
}

async fn list_locations(auth: Authenticated) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    Ok(Json(locations::list(&auth.tenant.db, &scope).await?))
}

async fn create_location(
    auth: Authenticated,
    Json(mut req): Json<NewLocation>,
) -> Result<impl IntoResponse, LincError> {
    let group_id = req.user_group_id.unwrap_or(auth.group.id);
    authorize_owner(&auth, group_id, Action::Write).await?;

    // Province follows the owning group unless given explicitly
    if req.province_code.is_none() {
        req.province_code = user_groups::get(&auth.tenant.db, group_id)
            .await?
            .and_then(|g| g.province_code);
    }

    let txn = auth.tenant.db.begin().await?;
    let location = locations::create(&txn, group_id, req).await?;
    audit(&txn, &auth, AuditAction::Create, "location", location.id, None, Some(&location)).await?;
    txn.commit().await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn get_location(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_location(&auth, id, Action::Read).await?))
}

async fn update_location(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<LocationPatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_location(&auth, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let updated = locations::update(&txn, existing.clone(), patch).await?;
    audit(&txn, &auth, AuditAction::Update, "location", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_location(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_location(&auth, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let deleted = locations::set_state(&txn, existing.clone(), RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "location", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_staff(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    load_location(&auth, id, Action::Read).await?;
    Ok(Json(assignments::list_for_location(&auth.tenant.db, id).await?))
}

async fn assign_staff(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(req): Json<NewAssignment>,
) -> Result<impl IntoResponse, LincError> {
    load_location(&auth, id, Action::Write).await?;

    // The assignee must be a user the caller could manage
    let user = users::get(&auth.tenant.db, req.user_id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user {}", req.user_id)))?;
    authorize_owner(&auth, user.user_group_id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let assignment = assignments::assign(&txn, id, req, Some(auth.user.id)).await?;
    audit(
        &txn,
        &auth,
        AuditAction::Create,
        "user_location_assignment",
        assignment.id,
        None,
        Some(&assignment),
    )
    .await?;
    txn.commit().await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn unassign_staff(
    auth: Authenticated,
    Path((_, id, assignment_id)): Path<(String, i64, i64)>,
) -> Result<impl IntoResponse, LincError> {
    load_location(&auth, id, Action::Write).await?;
    let existing = assignments::get(&auth.tenant.db, assignment_id)
        .await?
        .filter(|a| a.location_id == id)
        .ok_or_else(|| LincError::NotFound(format!("assignment {assignment_id}")))?;

    let txn = auth.tenant.db.begin().await?;
    let removed = assignments::unassign(&txn, existing.clone()).await?;
    audit(
        &txn,
        &auth,
        AuditAction::Delete,
        "user_location_assignment",
        assignment_id,
        Some(&existing),
        Some(&removed),
    )
    .await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
