//! User groups and the offices that hang off them.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde_json::json;

use crate::api::{audit, authorize_owner};
use crate::authz::{
    can_create_group, can_grant_helpdesk, Action, AuthorityLevel, HelpdeskFlags,
};
use crate::codes::{OfficeCode, ProvinceCode, UserGroupCode};
use crate::entities::{office, user_group};
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::RecordState;
use crate::storage::audit::AuditAction;
use crate::storage::offices::{self, NewOffice, OfficePatch};
use crate::storage::user_groups::{self, NewUserGroup, UserGroupPatch};
use crate::storage::{scope, users};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/{country}/user-groups",
            get(list_groups).post(create_group),
        )
        .route(
            "/api/v1/{country}/user-groups/validate-code/{code}",
            get(validate_code),
        )
        .route(
            "/api/v1/{country}/user-groups/{id}",
            get(get_group).patch(update_group).delete(delete_group),
        )
        .route(
            "/api/v1/{country}/user-groups/{id}/offices",
            get(list_offices).post(create_office),
        )
        .route(
            "/api/v1/{country}/offices/{id}",
            get(get_office).patch(update_office).delete(delete_office),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateUserGroup {
    pub code: String,
    pub name: String,
    pub province_code: Option<String>,
    pub authority_level: AuthorityLevel,
    #[serde(default)]
    pub is_provincial_help_desk: bool,
    #[serde(default)]
    pub is_national_help_desk: bool,
}

fn parse_province(raw: Option<&str>) -> Result<Option<ProvinceCode>, LincError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => ProvinceCode::parse(p)
            .map(Some)
            .map_err(|e| LincError::BadRequest(e.to_string())),
        None => Ok(None),
    }
}

/// Load a visible group and authorize `action` on it.
async fn load_group(
    auth: &Authenticated,
    id: i64,
    action: Action,
) -> Result<user_group::Model, LincError> {
    let group = user_groups::get(&auth.tenant.db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user group {id}")))?;
    auth.authorize(&scope::target_of_group(&group), action)?;
    Ok(group)
}

async fn list_groups(auth: Authenticated) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    let groups = user_groups::list(&auth.tenant.db, &scope).await?;
    Ok(Json(groups))
}

async fn create_group(
    auth: Authenticated,
    Json(req): Json<CreateUserGroup>,
) -> Result<impl IntoResponse, LincError> {
    let code = UserGroupCode::parse(req.code.trim())
        .map_err(|e| LincError::BadRequest(e.to_string()))?;
    let province = parse_province(req.province_code.as_deref())?;
    let flags = HelpdeskFlags {
        provincial: req.is_provincial_help_desk,
        national: req.is_national_help_desk,
    };

    if !can_create_group(&auth.actor, req.authority_level, province.as_ref())
        || !can_grant_helpdesk(&auth.actor, flags)
    {
        tracing::debug!(
            user_id = auth.actor.user_id,
            level = %req.authority_level,
            "group creation denied"
        );
        return Err(LincError::AuthorizationDenied(format!(
            "create {} group",
            req.authority_level
        )));
    }

    let txn = auth.tenant.db.begin().await?;
    let group = user_groups::create(
        &txn,
        NewUserGroup {
            code,
            name: req.name,
            province_code: province,
            authority_level: req.authority_level,
            is_provincial_help_desk: flags.provincial,
            is_national_help_desk: flags.national,
        },
    )
    .await?;
    audit(&txn, &auth, AuditAction::Create, "user_group", group.id, None, Some(&group)).await?;
    txn.commit().await?;

    tracing::info!(country = %auth.tenant.country, group = %group.code, "user group created");
    Ok((StatusCode::CREATED, Json(group)))
}

async fn validate_code(
    auth: Authenticated,
    Path((_, code)): Path<(String, String)>,
) -> Result<impl IntoResponse, LincError> {
    let (valid_format, available) = match UserGroupCode::parse(&code) {
        Ok(parsed) => (true, user_groups::code_available(&auth.tenant.db, &parsed).await?),
        Err(_) => (false, false),
    };
    Ok(Json(json!({
        "code": code,
        "valid_format": valid_format,
        "available": available,
    })))
}

async fn get_group(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_group(&auth, id, Action::Read).await?))
}

async fn update_group(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<UserGroupPatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_group(&auth, id, Action::Write).await?;

    if let Some(level) = patch.authority_level {
        let province = parse_province(existing.province_code.as_deref())?;
        if !can_create_group(&auth.actor, level, province.as_ref()) {
            return Err(LincError::AuthorizationDenied(format!("raise group {id} to {level}")));
        }
    }
    let flags = HelpdeskFlags {
        provincial: patch
            .is_provincial_help_desk
            .unwrap_or(existing.is_provincial_help_desk),
        national: patch
            .is_national_help_desk
            .unwrap_or(existing.is_national_help_desk),
    };
    if !can_grant_helpdesk(&auth.actor, flags) {
        return Err(LincError::AuthorizationDenied(format!(
            "helpdesk flags on group {id}"
        )));
    }

    let txn = auth.tenant.db.begin().await?;
    let updated = user_groups::update(&txn, existing.clone(), patch).await?;
    audit(&txn, &auth, AuditAction::Update, "user_group", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_group(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_group(&auth, id, Action::Write).await?;
    if existing.id == auth.group.id {
        return Err(LincError::Conflict("cannot delete your own user group".to_string()));
    }
    let members = users::count_in_group(&auth.tenant.db, id).await?;
    if members > 0 {
        return Err(LincError::Conflict(format!(
            "user group {} still has {members} users",
            existing.code
        )));
    }

    let txn = auth.tenant.db.begin().await?;
    let deleted = user_groups::set_state(&txn, existing.clone(), RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "user_group", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct CreateOffice {
    pub office_code: String,
    pub name: String,
}

/// Load a visible office and authorize `action` on its owning group.
async fn load_office(
    auth: &Authenticated,
    id: i64,
    action: Action,
) -> Result<office::Model, LincError> {
    let office = offices::get(&auth.tenant.db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("office {id}")))?;
    authorize_owner(auth, office.user_group_id, action).await?;
    Ok(office)
}

async fn list_offices(
    auth: Authenticated,
    Path((_, group_id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    load_group(&auth, group_id, Action::Read).await?;
    Ok(Json(offices::list_for_group(&auth.tenant.db, group_id).await?))
}

async fn create_office(
    auth: Authenticated,
    Path((_, group_id)): Path<(String, i64)>,
    Json(req): Json<CreateOffice>,
) -> Result<impl IntoResponse, LincError> {
    load_group(&auth, group_id, Action::Write).await?;
    let office_code = OfficeCode::parse(req.office_code.trim())
        .map_err(|e| LincError::BadRequest(e.to_string()))?;

    let txn = auth.tenant.db.begin().await?;
    let office = offices::create(
        &txn,
        NewOffice {
            user_group_id: group_id,
            office_code,
            name: req.name,
        },
    )
    .await?;
    audit(&txn, &auth, AuditAction::Create, "office", office.id, None, Some(&office)).await?;
    txn.commit().await?;
    Ok((StatusCode::CREATED, Json(office)))
}

async fn get_office(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_office(&auth, id, Action::Read).await?))
}

async fn update_office(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<OfficePatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_office(&auth, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let updated = offices::update(&txn, existing.clone(), patch).await?;
    audit(&txn, &auth, AuditAction::Update, "office", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_office(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_office(&auth, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let deleted = offices::set_state(&txn, existing.clone(), RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "office", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_province() {
        assert_eq!(parse_province(None).unwrap(), None);
        assert_eq!(parse_province(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_province(Some("GP")).unwrap(),
            Some(ProvinceCode::parse("GP").unwrap())
        );
        assert!(matches!(
            parse_province(Some("Gauteng")),
            Err(LincError::BadRequest(_))
        ));
    }
}
