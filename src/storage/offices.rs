use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::codes::OfficeCode;
use crate::entities::office::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::RecordState;
use crate::storage::{ensure_state_change, now, required, scope};

#[derive(Debug, Clone)]
pub struct NewOffice {
    pub user_group_id: i64,
    pub office_code: OfficeCode,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfficePatch {
    pub office_code: Option<String>,
    pub name: Option<String>,
    pub state: Option<RecordState>,
}

pub async fn create(db: &impl ConnectionTrait, input: NewOffice) -> Result<Model, LincError> {
    let now = now();
    let office = ActiveModel {
        user_group_id: Set(input.user_group_id),
        office_code: Set(input.office_code.to_string()),
        name: Set(required(&input.name, "name")?),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    office
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("office {}", input.office_code)))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

pub async fn list_for_group(db: &impl ConnectionTrait, user_group_id: i64) -> Result<Vec<Model>, LincError> {
    Ok(Entity::find()
        .filter(Column::UserGroupId.eq(user_group_id))
        .filter(scope::visible(Column::State))
        .order_by_asc(Column::OfficeCode)
        .all(db)
        .await?)
}

pub async fn update(db: &impl ConnectionTrait, existing: Model, patch: OfficePatch) -> Result<Model, LincError> {
    if let Some(code) = patch.office_code.as_deref() {
        if code != existing.office_code {
            return Err(LincError::BadRequest(
                "office code cannot be changed".to_string(),
            ));
        }
    }
    if let Some(state) = patch.state {
        ensure_state_change("office", &existing.state, state)?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(required(&name, "name")?);
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
    ensure_state_change("office", &existing.state, state)?;
    let mut active: ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}
