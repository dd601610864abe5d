use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use crate::authz::{AuthorityLevel, Scope};
use crate::codes::{ProvinceCode, UserGroupCode};
use crate::entities::user_group::{self, ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::RecordState;
use crate::storage::{ensure_state_change, now, required, scope};

#[derive(Debug, Clone)]
pub struct NewUserGroup {
    pub code: UserGroupCode,
    pub name: String,
    pub province_code: Option<ProvinceCode>,
    pub authority_level: AuthorityLevel,
    pub is_provincial_help_desk: bool,
    pub is_national_help_desk: bool,
}

/// Partial update. `code` and `province_code` are accepted only so a request
/// that repeats the stored values is not rejected; changing them is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserGroupPatch {
    pub code: Option<String>,
    pub province_code: Option<String>,
    pub name: Option<String>,
    pub authority_level: Option<AuthorityLevel>,
    pub is_provincial_help_desk: Option<bool>,
    pub is_national_help_desk: Option<bool>,
    pub state: Option<RecordState>,
}

pub async fn create(db: &impl ConnectionTrait, input: NewUserGroup) -> Result<Model, LincError> {
    if input.province_code.is_none() && input.authority_level != AuthorityLevel::National {
        return Err(LincError::BadRequest(format!(
            "province_code is required for {} groups",
            input.authority_level
        )));
    }

    let now = now();
    let group = ActiveModel {
        code: Set(input.code.to_string()),
        name: Set(required(&input.name, "name")?),
        province_code: Set(input.province_code.map(String::from)),
        authority_level: Set(input.authority_level.as_str().to_string()),
        is_provincial_help_desk: Set(input.is_provincial_help_desk),
        is_national_help_desk: Set(input.is_national_help_desk),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    group
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("user group {}", input.code)))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

pub async fn get_by_code(db: &impl ConnectionTrait, code: &str) -> Result<Option<Model>, LincError> {
    Ok(Entity::find()
        .filter(Column::Code.eq(code))
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

/// Whether `code` is still free. Deleted groups keep their code reserved.
pub async fn code_available(db: &impl ConnectionTrait, code: &UserGroupCode) -> Result<bool, LincError> {
    let taken = Entity::find()
        .filter(Column::Code.eq(code.as_str()))
        .count(db)
        .await?;
    Ok(taken == 0)
}

pub async fn list(db: &impl ConnectionTrait, scope: &Scope) -> Result<Vec<Model>, LincError> {
    Ok(Entity::find()
        .filter(scope::visible(Column::State))
        .filter(scope::group_condition(scope))
        .order_by_asc(Column::Code)
        .all(db)
        .await?)
}

pub async fn update(
    db: &impl ConnectionTrait,
    existing: Model,
    patch: UserGroupPatch,
) -> Result<Model, LincError> {
    if let Some(code) = patch.code.as_deref() {
        if code != existing.code {
            return Err(LincError::BadRequest(
                "user group code cannot be changed".to_string(),
            ));
        }
    }
    if let Some(province) = patch.province_code.as_deref() {
        if Some(province) != existing.province_code.as_deref() {
            return Err(LincError::BadRequest(
                "user group province cannot be changed".to_string(),
            ));
        }
    }
    if let Some(level) = patch.authority_level {
        if level != AuthorityLevel::National && existing.province_code.is_none() {
            return Err(LincError::BadRequest(format!(
                "a group without a province cannot become {level}"
            )));
        }
    }
    if let Some(state) = patch.state {
        ensure_state_change("user group", &existing.state, state)?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(required(&name, "name")?);
    }
    if let Some(level) = patch.authority_level {
        active.authority_level = Set(level.as_str().to_string());
    }
    if let Some(flag) = patch.is_provincial_help_desk {
        active.is_provincial_help_desk = Set(flag);
    }
    if let Some(flag) = patch.is_national_help_desk {
        active.is_national_help_desk = Set(flag);
    }
    if let Some(state) = patch.state {
        active.state = Set(state.as_str().to_string());
    }
    active.updated_at = Set(now());

    Ok(active.update(db).await?)
}

pub async fn set_state(
    db: &impl ConnectionTrait,
    existing: Model,
    state: RecordState,
) -> Result<Model, LincError> {
    ensure_state_change("user group", &existing.state, state)?;
    let mut active: user_group::ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}
