use axum::extract::Query;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::errors::LincError;
use crate::session::Authenticated;
use crate::storage::audit::{self, AuditFilter};
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/{country}/audit", get(list_audit))
}

/// Audit history is readable by NATIONAL-level actors only. Helpdesk flags
/// do not qualify.
async fn list_audit(
    auth: Authenticated,
    Query(filter): Query<AuditFilter>,
) -> Result<impl IntoResponse, LincError> {
    if !auth.is_national() {
        return Err(LincError::AuthorizationDenied("audit log".to_string()));
    }
    Ok(Json(audit::list(&auth.tenant.db, &filter).await?))
}
