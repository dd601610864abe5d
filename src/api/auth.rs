use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde_json::json;

use crate::authz::{effective_scope, Action};
use crate::errors::LincError;
use crate::session::{Authenticated, Tenant};
use crate::storage::audit::{self as audit_store, AuditAction, AuditEntry};
use crate::storage::{assignments, tokens, users};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/{country}/auth/login", post(login))
        .route("/api/v1/{country}/auth/logout", post(logout))
        .route("/api/v1/{country}/auth/me", get(me))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    tenant: Tenant,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, LincError> {
    let Some(user) = users::verify_password(&tenant.db, &req.username, &req.password).await? else {
        tracing::warn!(country = %tenant.country, username = %req.username, "failed login");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_credentials"})),
        ));
    };

    let ttl = state.settings.auth.token_ttl_secs;
    let txn = tenant.db.begin().await?;
    let token = tokens::issue(&txn, user.id, ttl).await?;
    users::record_login(&txn, user.id).await?;
    audit_store::record::<serde_json::Value>(
        &txn,
        AuditEntry {
            user_id: Some(user.id),
            action: AuditAction::Login,
            entity_type: "user",
            entity_id: user.id.to_string(),
            old: None,
            new: None,
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!(country = %tenant.country, user_id = user.id, "login");
    Ok((
        StatusCode::OK,
        Json(json!({
            "access_token": token.token,
            "token_type": "Bearer",
            "expires_in": ttl,
        })),
    ))
}

async fn logout(auth: Authenticated) -> Result<impl IntoResponse, LincError> {
    let txn = auth.tenant.db.begin().await?;
    tokens::revoke(&txn, &auth.token).await?;
    audit_store::record::<serde_json::Value>(
        &txn,
        AuditEntry {
            user_id: Some(auth.user.id),
            action: AuditAction::Logout,
            entity_type: "user",
            entity_id: auth.user.id.to_string(),
            old: None,
            new: None,
        },
    )
    .await?;
    txn.commit().await?;

    tracing::info!(country = %auth.tenant.country, user_id = auth.user.id, "logout");
    Ok(StatusCode::NO_CONTENT)
}

async fn me(auth: Authenticated) -> Result<impl IntoResponse, LincError> {
    let locations = assignments::list_for_user(&auth.tenant.db, auth.user.id).await?;
    Ok(Json(json!({
        "user": auth.user,
        "user_group": auth.group,
        "actor": auth.actor,
        "read_scope": effective_scope(&auth.actor, Action::Read),
        "write_scope": effective_scope(&auth.actor, Action::Write),
        "assignments": locations,
        "country": auth.tenant.country,
    })))
}
