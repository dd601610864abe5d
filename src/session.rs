//! Request identity: which country database a request targets and who is
//! calling. Both are axum extractors so handlers only name what they need.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::collections::HashMap;
use std::sync::Arc;

use crate::authz::{
    authorize, effective_scope, Action, ActorContext, AuthorityLevel, HelpdeskFlags, Scope,
    TargetResource,
};
use crate::codes::{CountryCode, ProvinceCode, UserGroupCode};
use crate::country::CountryConfig;
use crate::entities::user_group;
use crate::errors::LincError;
use crate::status::RecordState;
use crate::storage::{self, tokens, user_groups, users::User};
use crate::web::AppState;

/// The country a request is addressed to, with its configuration and database.
#[derive(Clone)]
pub struct Tenant {
    pub country: CountryCode,
    pub config: Arc<CountryConfig>,
    pub db: DatabaseConnection,
}

/// A caller whose bearer token resolved to an active user in an active group.
pub struct Authenticated {
    pub tenant: Tenant,
    pub user: User,
    pub group: user_group::Model,
    pub actor: ActorContext,
    pub token: String,
}

impl Authenticated {
    /// Allow or fail with `AuthorizationDenied`, which renders as 404.
    pub fn authorize(&self, target: &TargetResource, action: Action) -> Result<Scope, LincError> {
        let decision = authorize(&self.actor, target, action);
        match decision.scope {
            Some(scope) if decision.allow => Ok(scope),
            _ => {
                tracing::debug!(
                    user_id = self.actor.user_id,
                    ?target,
                    ?action,
                    "authorization denied"
                );
                Err(LincError::AuthorizationDenied(format!(
                    "{action:?} on group {:?}",
                    target.owning_user_group_id
                )))
            }
        }
    }

    /// List filter for `action`. An actor with no scope sees nothing.
    pub fn scope(&self, action: Action) -> Result<Scope, LincError> {
        effective_scope(&self.actor, action).ok_or_else(|| {
            tracing::debug!(user_id = self.actor.user_id, "actor has no scope");
            LincError::AuthorizationDenied("no scope".to_string())
        })
    }

    pub fn is_national(&self) -> bool {
        self.actor.authority_level == AuthorityLevel::National
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn actor_context(user: &User, group: &user_group::Model) -> ActorContext {
    ActorContext {
        user_id: user.id,
        user_group_id: Some(group.id),
        user_group_code: UserGroupCode::parse(&group.code).ok(),
        authority_level: AuthorityLevel::from_stored(&group.authority_level),
        province_code: group
            .province_code
            .as_deref()
            .and_then(|p| ProvinceCode::parse(p).ok()),
        flags: HelpdeskFlags {
            provincial: group.is_provincial_help_desk,
            national: group.is_national_help_desk,
        },
    }
}

/// Token, then active user, then active group. Any missing link is a 401.
pub async fn resolve(
    db: &impl ConnectionTrait,
    token: &str,
) -> Result<(User, user_group::Model, ActorContext), LincError> {
    let token_row = tokens::get_valid(db, token)
        .await?
        .ok_or(LincError::Unauthorized)?;

    let user = storage::users::get(db, token_row.user_id)
        .await?
        .filter(|u| u.state == RecordState::Active.as_str())
        .ok_or(LincError::Unauthorized)?;

    let group = user_groups::get(db, user.user_group_id)
        .await?
        .filter(|g| g.state == RecordState::Active.as_str())
        .ok_or(LincError::Unauthorized)?;

    let actor = actor_context(&user, &group);
    Ok((user, group, actor))
}

impl FromRequestParts<AppState> for Tenant {
    type Rejection = LincError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| LincError::BadRequest(e.body_text()))?;
        let raw = params
            .get("country")
            .ok_or_else(|| LincError::BadRequest("missing country".to_string()))?;
        state.tenant(raw)
    }
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = LincError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let tenant = Tenant::from_request_parts(parts, state).await?;
        let token = bearer_token(&parts.headers)
            .ok_or(LincError::Unauthorized)?
            .to_string();
        let (user, group, actor) = resolve(&tenant.db, &token).await?;
        Ok(Authenticated {
            tenant,
            user,
            group,
            actor,
            token,
        })
    }
}
