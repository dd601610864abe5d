//! Licence applications and their status lifecycle.

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::{ConnectionTrait, TransactionTrait};
use serde::Deserialize;
use serde_json::json;

use crate::api::{audit, authorize_owner, owner_target};
use crate::authz::Action;
use crate::entities::license_application;
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::ApplicationStatus;
use crate::storage::applications::{self, status_of, ApplicationFilter, NewApplication};
use crate::storage::audit::AuditAction;
use crate::storage::{locations, persons};
use crate::validation::application::{
    Applicant, ApplicationSnapshot, TransitionSnapshot, CREATE_RULES, TRANSITION_RULES,
};
use crate::validation::{self, RuleFailure};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/{country}/licenses/applications",
            get(list_applications).post(create_application),
        )
        .route(
            "/api/v1/{country}/licenses/applications/{id}",
            get(get_application),
        )
        .route(
            "/api/v1/{country}/licenses/applications/{id}/transition",
            post(transition_application),
        )
        .route(
            "/api/v1/{country}/licenses/applications/{id}/validate",
            post(validate_transition),
        )
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub status: ApplicationStatus,
}

async fn load_application(
    auth: &Authenticated,
    db: &impl ConnectionTrait,
    id: i64,
    action: Action,
) -> Result<license_application::Model, LincError> {
    let application = applications::get(db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("application {id}")))?;
    let target = owner_target(db, application.user_group_id).await?;
    auth.authorize(&target, action)?;
    Ok(application)
}

/// The applicant as the caller can see it. A person outside the caller's
/// read scope is reported exactly like a missing one.
async fn visible_applicant(
    auth: &Authenticated,
    person_id: i64,
) -> Result<Option<Applicant>, LincError> {
    let Some(person) = persons::get(&auth.tenant.db, person_id).await? else {
        return Ok(None);
    };
    let target = owner_target(&auth.tenant.db, person.user_group_id).await?;
    if auth.authorize(&target, Action::Read).is_err() {
        return Ok(None);
    }
    Ok(Some(Applicant {
        date_of_birth: person.date_of_birth,
    }))
}

fn transition_failures(
    auth: &Authenticated,
    current: ApplicationStatus,
    requested: ApplicationStatus,
) -> Vec<RuleFailure> {
    validation::run(
        TRANSITION_RULES,
        &TransitionSnapshot { current, requested },
        &auth.tenant.config,
    )
}

async fn list_applications(
    auth: Authenticated,
    Query(filter): Query<ApplicationFilter>,
) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    Ok(Json(
        applications::list(&auth.tenant.db, &scope, &filter).await?,
    ))
}

async fn create_application(
    auth: Authenticated,
    Json(req): Json<NewApplication>,
) -> Result<impl IntoResponse, LincError> {
    let group_id = auth.group.id;
    authorize_owner(&auth, group_id, Action::Write).await?;

    let category = req.license_category.trim().to_ascii_uppercase();
    if auth.tenant.config.license_category(&category).is_none() {
        return Err(LincError::BadRequest(format!(
            "licence category {category} is not offered in {}",
            auth.tenant.country
        )));
    }
    if let Some(location_id) = req.location_id {
        let location = locations::get(&auth.tenant.db, location_id)
            .await?
            .ok_or_else(|| LincError::BadRequest(format!("unknown location {location_id}")))?;
        let target = owner_target(&auth.tenant.db, location.user_group_id).await?;
        auth.authorize(&target, Action::Read)
            .map_err(|_| LincError::BadRequest(format!("unknown location {location_id}")))?;
    }

    let snapshot = ApplicationSnapshot {
        applicant: visible_applicant(&auth, req.person_id).await?,
        license_category: category,
        as_of: Utc::now().date_naive(),
    };
    let failures = validation::run(CREATE_RULES, &snapshot, &auth.tenant.config);
    if !failures.is_empty() {
        tracing::info!(
            country = %auth.tenant.country,
            person_id = req.person_id,
            rule_codes = ?validation::codes(&failures),
            "application rejected by validation"
        );
        return Err(LincError::ValidationFailed(failures));
    }

    let txn = auth.tenant.db.begin().await?;
    let application = applications::create(&txn, group_id, req).await?;
    audit(
        &txn,
        &auth,
        AuditAction::Create,
        "license_application",
        application.id,
        None,
        Some(&application),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        country = %auth.tenant.country,
        number = %application.application_number,
        "application captured"
    );
    Ok((StatusCode::CREATED, Json(application)))
}

async fn get_application(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_application(&auth, &auth.tenant.db, id, Action::Read).await?))
}

async fn transition_application(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, LincError> {
    // Read, check and write against one snapshot of the row
    let txn = auth.tenant.db.begin().await?;
    let existing = load_application(&auth, &txn, id, Action::Write).await?;
    let current = status_of(&existing)?;

    let failures = transition_failures(&auth, current, req.status);
    if !failures.is_empty() {
        tracing::info!(
            country = %auth.tenant.country,
            application_id = id,
            rule_codes = ?validation::codes(&failures),
            "transition rejected by validation"
        );
        return Err(LincError::ValidationFailed(failures));
    }
    if !current.can_transition_to(req.status) {
        return Err(LincError::Conflict(format!(
            "application cannot move from {current} to {}",
            req.status
        )));
    }

    let updated = applications::set_status(&txn, &existing, req.status).await?;
    audit(
        &txn,
        &auth,
        AuditAction::Transition,
        "license_application",
        id,
        Some(&existing),
        Some(&updated),
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        country = %auth.tenant.country,
        application_id = id,
        from = %current,
        to = %req.status,
        "application transitioned"
    );
    Ok(Json(updated))
}

/// Dry run of a transition: reports rule failures and whether the lifecycle
/// table allows the move, without writing anything.
async fn validate_transition(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(req): Json<TransitionRequest>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_application(&auth, &auth.tenant.db, id, Action::Read).await?;
    let current = status_of(&existing)?;
    let failures = transition_failures(&auth, current, req.status);
    let lifecycle_allows = current.can_transition_to(req.status);

    Ok(Json(json!({
        "current": current,
        "requested": req.status,
        "valid": failures.is_empty() && lifecycle_allows,
        "lifecycle_allows": lifecycle_allows,
        "failures": failures,
    })))
}
