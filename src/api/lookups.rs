//! Reference data for clients: the country bundle plus every fixed enumeration
//! and the rule codes the server can report.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::authz::AuthorityLevel;
use crate::session::Tenant;
use crate::status::{ApplicationStatus, Gender, RecordState, ValidationStatus};
use crate::validation::{application, person, rule_codes};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/{country}/lookups", get(lookups))
}

async fn lookups(tenant: Tenant) -> impl IntoResponse {
    let config = tenant.config.as_ref();
    Json(json!({
        "country": config,
        "genders": Gender::ALL.iter().map(|g| g.as_str()).collect::<Vec<_>>(),
        "record_states": RecordState::ALL,
        "validation_statuses": ValidationStatus::ALL,
        "application_statuses": ApplicationStatus::ALL,
        "authority_levels": [
            AuthorityLevel::National,
            AuthorityLevel::Provincial,
            AuthorityLevel::Local,
            AuthorityLevel::Office,
        ],
        "rules": {
            "person": rule_codes(person::RULES),
            "application": rule_codes(application::CREATE_RULES),
            "transition": rule_codes(application::TRANSITION_RULES),
        },
    }))
}
