use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::api::{audit, authorize_owner};
use crate::authz::{can_grant_helpdesk, Action, AuthorityLevel, HelpdeskFlags};
use crate::entities::user_group;
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::RecordState;
use crate::storage::audit::AuditAction;
use crate::storage::users::{self, NewUser, User, UserPatch};
use crate::storage::{offices, scope, user_groups};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/{country}/users", get(list_users).post(create_user))
        .route(
            "/api/v1/{country}/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

async fn load_user(auth: &Authenticated, id: i64, action: Action) -> Result<User, LincError> {
    let user = users::get(&auth.tenant.db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user {id}")))?;
    authorize_owner(auth, user.user_group_id, action).await?;
    Ok(user)
}

/// Members of `group` act with its level and helpdesk flags, so only a caller
/// already holding that much may add members or change their credentials.
fn check_membership(auth: &Authenticated, group: &user_group::Model) -> Result<(), LincError> {
    let level = AuthorityLevel::from_stored(&group.authority_level);
    let flags = HelpdeskFlags {
        provincial: group.is_provincial_help_desk,
        national: group.is_national_help_desk,
    };
    if level.rank() > auth.actor.authority_level.rank() || !can_grant_helpdesk(&auth.actor, flags) {
        tracing::debug!(
            user_id = auth.actor.user_id,
            group = %group.code,
            "membership change denied"
        );
        return Err(LincError::AuthorizationDenied(format!(
            "manage members of {level} group {}",
            group.code
        )));
    }
    Ok(())
}

async fn check_office(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    office_id: Option<i64>,
) -> Result<(), LincError> {
    let Some(office_id) = office_id else {
        return Ok(());
    };
    match offices::get(db, office_id).await? {
        Some(office) if office.user_group_id == user_group_id => Ok(()),
        _ => Err(LincError::BadRequest(format!(
            "office {office_id} does not belong to user group {user_group_id}"
        ))),
    }
}

async fn list_users(auth: Authenticated) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    Ok(Json(users::list(&auth.tenant.db, &scope).await?))
}

async fn create_user(
    auth: Authenticated,
    Json(req): Json<NewUser>,
) -> Result<impl IntoResponse, LincError> {
    let group_id = req.user_group_id.unwrap_or(auth.group.id);
    let group = user_groups::get(&auth.tenant.db, group_id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user group {group_id}")))?;
    auth.authorize(&scope::target_of_group(&group), Action::Write)?;
    check_membership(&auth, &group)?;
    check_office(&auth.tenant.db, group_id, req.office_id).await?;

    let txn = auth.tenant.db.begin().await?;
    let user = users::create(&txn, group_id, req).await?;
    audit(&txn, &auth, AuditAction::Create, "user", user.id, None, Some(&user)).await?;
    txn.commit().await?;

    tracing::info!(country = %auth.tenant.country, user_id = user.id, group = %group.code, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_user(&auth, id, Action::Read).await?))
}

async fn update_user(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_user(&auth, id, Action::Write).await?;
    if id != auth.user.id {
        let group = user_groups::get(&auth.tenant.db, existing.user_group_id)
            .await?
            .ok_or_else(|| LincError::NotFound(format!("user {id}")))?;
        check_membership(&auth, &group)?;
    }
    check_office(&auth.tenant.db, existing.user_group_id, patch.office_id.flatten()).await?;
    if id == auth.user.id && patch.state.is_some_and(|s| s != RecordState::Active) {
        return Err(LincError::Conflict("cannot deactivate yourself".to_string()));
    }

    let txn = auth.tenant.db.begin().await?;
    let updated = users::update(&txn, id, patch).await?;
    audit(&txn, &auth, AuditAction::Update, "user", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_user(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_user(&auth, id, Action::Write).await?;
    if id == auth.user.id {
        return Err(LincError::Conflict("cannot delete yourself".to_string()));
    }

    let txn = auth.tenant.db.begin().await?;
    let deleted = users::set_state(&txn, id, RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "user", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
