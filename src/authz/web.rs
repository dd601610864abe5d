use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::authz::engine;
use crate::authz::types::CheckRequest;
use crate::session::Authenticated;
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/{country}/authz/check", post(handle_check))
}

/// Evaluate a target descriptor for the calling actor. A denial is a normal
/// `{allow: false}` answer here, not an error.
async fn handle_check(auth: Authenticated, Json(req): Json<CheckRequest>) -> impl IntoResponse {
    let decision = engine::authorize(&auth.actor, &req.target, req.action);
    tracing::debug!(
        user_id = auth.actor.user_id,
        allow = decision.allow,
        "authz check"
    );
    Json(decision)
}
