//! Regions: the registered authorities (testing centres, registering
//! authorities, help desks) a user group runs, and their registration.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Deserialize;
use serde_json::json;

use crate::api::{audit, authorize_owner, owner_target};
use crate::authz::Action;
use crate::codes::{ProvinceCode, RegionCode};
use crate::entities::region;
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::{RecordState, RegionType, RegistrationStatus};
use crate::storage::audit::AuditAction;
use crate::storage::regions::{self, NewRegion, RegionFilter, RegionPatch};
use crate::storage::{now, user_groups};
use crate::validation::{self, region::OPERATING_RULES};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/{country}/regions",
            get(list_regions).post(create_region),
        )
        .route(
            "/api/v1/{country}/regions/validate-code/{code}",
            get(validate_code),
        )
        .route(
            "/api/v1/{country}/regions/by-province/{province}",
            get(regions_by_province),
        )
        .route(
            "/api/v1/{country}/regions/{id}",
            get(get_region).patch(update_region).delete(delete_region),
        )
        .route(
            "/api/v1/{country}/regions/{id}/registration",
            post(change_registration),
        )
        .route(
            "/api/v1/{country}/regions/{id}/operating",
            get(operating_status),
        )
}

#[derive(Debug, Deserialize)]
pub struct CreateRegion {
    /// Owning group; defaults to the caller's group
    pub user_group_id: Option<i64>,
    pub region_code: String,
    pub name: String,
    pub region_type: RegionType,
    /// Required only when the owning group has no province
    pub province_code: Option<String>,
    pub registration_status: Option<RegistrationStatus>,
    pub contact_person: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub operational_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrationChange {
    pub status: RegistrationStatus,
    /// Unix seconds; only with SUSPENDED
    pub suspended_until: Option<i64>,
}

fn bad_request(e: impl ToString) -> LincError {
    LincError::BadRequest(e.to_string())
}

async fn load_region(
    auth: &Authenticated,
    db: &impl ConnectionTrait,
    id: i64,
    action: Action,
) -> Result<region::Model, LincError> {
    let region = regions::get(db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("region {id}")))?;
    let target = owner_target(db, region.user_group_id).await?;
    auth.authorize(&target, action)?;
    Ok(region)
}

async fn list_regions(
    auth: Authenticated,
    Query(filter): Query<RegionFilter>,
) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    Ok(Json(regions::list(&auth.tenant.db, &scope, &filter).await?))
}

/// Regions of one province, narrowed to what the caller may read.
async fn regions_by_province(
    auth: Authenticated,
    Path((_, province)): Path<(String, String)>,
) -> Result<impl IntoResponse, LincError> {
    let province = ProvinceCode::parse(&province.to_ascii_uppercase()).map_err(bad_request)?;
    let scope = auth.scope(Action::Read)?;
    let filter = RegionFilter {
        province_code: Some(province.to_string()),
        region_type: None,
    };
    Ok(Json(regions::list(&auth.tenant.db, &scope, &filter).await?))
}

async fn create_region(
    auth: Authenticated,
    Json(req): Json<CreateRegion>,
) -> Result<impl IntoResponse, LincError> {
    let group_id = req.user_group_id.unwrap_or(auth.group.id);
    let group = user_groups::get(&auth.tenant.db, group_id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user group {group_id}")))?;
    authorize_owner(&auth, group_id, Action::Write).await?;

    let region_code = RegionCode::parse(req.region_code.trim()).map_err(bad_request)?;
    let requested = req
        .province_code
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ProvinceCode::parse)
        .transpose()
        .map_err(bad_request)?;
    // A provincial group's regions sit in its own province
    let province_code = match (group.province_code.as_deref(), requested) {
        (Some(own), Some(requested)) if requested.as_str() != own => {
            return Err(LincError::BadRequest(format!(
                "user group {} cannot run regions in province {requested}",
                group.code
            )));
        }
        (_, Some(requested)) => requested,
        (Some(own), None) => ProvinceCode::parse(own).map_err(bad_request)?,
        (None, None) => {
            return Err(LincError::BadRequest("province_code is required".to_string()));
        }
    };

    let txn = auth.tenant.db.begin().await?;
    let region = regions::create(
        &txn,
        group_id,
        NewRegion {
            region_code,
            name: req.name,
            region_type: req.region_type,
            province_code,
            registration_status: req
                .registration_status
                .unwrap_or(RegistrationStatus::PendingRegistration),
            contact_person: req.contact_person,
            phone_number: req.phone_number,
            email: req.email,
            operational_notes: req.operational_notes,
        },
    )
    .await?;
    audit(&txn, &auth, AuditAction::Create, "region", region.id, None, Some(&region)).await?;
    txn.commit().await?;

    tracing::info!(country = %auth.tenant.country, region = %region.region_code, "region created");
    Ok((StatusCode::CREATED, Json(region)))
}

async fn validate_code(
    auth: Authenticated,
    Path((_, code)): Path<(String, String)>,
) -> Result<impl IntoResponse, LincError> {
    let (valid_format, available) = match RegionCode::parse(&code) {
        Ok(parsed) => (true, regions::code_available(&auth.tenant.db, &parsed).await?),
        Err(_) => (false, false),
    };
    Ok(Json(json!({
        "code": code,
        "valid_format": valid_format,
        "available": available,
    })))
}

async fn get_region(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_region(&auth, &auth.tenant.db, id, Action::Read).await?))
}

async fn update_region(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<RegionPatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_region(&auth, &auth.tenant.db, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let updated = regions::update(&txn, existing.clone(), patch).await?;
    audit(&txn, &auth, AuditAction::Update, "region", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_region(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_region(&auth, &auth.tenant.db, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let deleted = regions::set_state(&txn, existing.clone(), RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "region", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_registration(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(req): Json<RegistrationChange>,
) -> Result<impl IntoResponse, LincError> {
    let txn = auth.tenant.db.begin().await?;
    let existing = load_region(&auth, &txn, id, Action::Write).await?;
    let updated =
        regions::set_registration(&txn, &existing, req.status, req.suspended_until).await?;
    audit(
        &txn,
        &auth,
        AuditAction::Transition,
        "region",
        id,
        Some(&existing),
        Some(&updated),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        country = %auth.tenant.country,
        region = %updated.region_code,
        from = %existing.registration_status,
        to = %updated.registration_status,
        "region registration changed"
    );
    Ok(Json(updated))
}

/// Whether the region may operate right now, with every rule it breaks.
async fn operating_status(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let region = load_region(&auth, &auth.tenant.db, id, Action::Read).await?;
    let snapshot = regions::snapshot(&region, now())?;
    let failures = validation::run(OPERATING_RULES, &snapshot, &auth.tenant.config);

    Ok(Json(json!({
        "region_code": region.region_code,
        "registration_status": snapshot.registration_status,
        "operating": failures.is_empty(),
        "failures": failures,
    })))
}
