use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::TransactionTrait;
use serde_json::json;

use crate::api::{audit, authorize_owner};
use crate::authz::Action;
use crate::country::CountryConfig;
use crate::entities::person;
use crate::errors::LincError;
use crate::session::Authenticated;
use crate::status::RecordState;
use crate::storage::audit::AuditAction;
use crate::storage::persons::{self, PersonFilter, PersonInput, PersonPatch};
use crate::validation::{self, person::RULES, RuleFailure};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/{country}/persons",
            get(list_persons).post(create_person),
        )
        .route("/api/v1/{country}/persons/validate", post(validate_person))
        .route(
            "/api/v1/{country}/persons/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        )
}

fn check(input: &PersonInput, config: &CountryConfig) -> Vec<RuleFailure> {
    validation::run(RULES, &input.snapshot(Utc::now().date_naive()), config)
}

fn reject_failures(failures: Vec<RuleFailure>, country: &str) -> Result<(), LincError> {
    if failures.is_empty() {
        return Ok(());
    }
    tracing::info!(
        country,
        rule_codes = ?validation::codes(&failures),
        "person rejected by validation"
    );
    Err(LincError::ValidationFailed(failures))
}

async fn load_person(
    auth: &Authenticated,
    id: i64,
    action: Action,
) -> Result<person::Model, LincError> {
    let person = persons::get(&auth.tenant.db, id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("person {id}")))?;
    authorize_owner(auth, person.user_group_id, action).await?;
    Ok(person)
}

async fn list_persons(
    auth: Authenticated,
    Query(filter): Query<PersonFilter>,
) -> Result<impl IntoResponse, LincError> {
    let scope = auth.scope(Action::Read)?;
    Ok(Json(persons::list(&auth.tenant.db, &scope, &filter).await?))
}

async fn validate_person(
    auth: Authenticated,
    Json(input): Json<PersonInput>,
) -> Result<impl IntoResponse, LincError> {
    let failures = check(&input, &auth.tenant.config);
    Ok(Json(json!({
        "valid": failures.is_empty(),
        "failures": failures,
    })))
}

async fn create_person(
    auth: Authenticated,
    Json(input): Json<PersonInput>,
) -> Result<impl IntoResponse, LincError> {
    let group_id = auth.group.id;
    authorize_owner(&auth, group_id, Action::Write).await?;
    reject_failures(check(&input, &auth.tenant.config), auth.tenant.country.as_str())?;

    let txn = auth.tenant.db.begin().await?;
    let person = persons::create(&txn, group_id, input).await?;
    audit(&txn, &auth, AuditAction::Create, "person", person.id, None, Some(&person)).await?;
    txn.commit().await?;
    Ok((StatusCode::CREATED, Json(person)))
}

async fn get_person(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    Ok(Json(load_person(&auth, id, Action::Read).await?))
}

async fn update_person(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
    Json(patch): Json<PersonPatch>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_person(&auth, id, Action::Write).await?;
    let merged = PersonInput::from_model(&existing).overlay(patch.fields);
    reject_failures(check(&merged, &auth.tenant.config), auth.tenant.country.as_str())?;

    let txn = auth.tenant.db.begin().await?;
    let updated = persons::update(
        &txn,
        existing.clone(),
        merged,
        patch.validation_status,
        patch.state,
    )
    .await?;
    audit(&txn, &auth, AuditAction::Update, "person", id, Some(&existing), Some(&updated)).await?;
    txn.commit().await?;
    Ok(Json(updated))
}

async fn delete_person(
    auth: Authenticated,
    Path((_, id)): Path<(String, i64)>,
) -> Result<impl IntoResponse, LincError> {
    let existing = load_person(&auth, id, Action::Write).await?;

    let txn = auth.tenant.db.begin().await?;
    let deleted = persons::set_state(&txn, existing.clone(), RecordState::Deleted).await?;
    audit(&txn, &auth, AuditAction::Delete, "person", id, Some(&existing), Some(&deleted)).await?;
    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}
