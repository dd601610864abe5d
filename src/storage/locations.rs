use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::authz::Scope;
use crate::entities::location::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::RecordState;
use crate::storage::{
    clean, double_option, ensure_state_change, now, offices, required, scope,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewLocation {
    /// Owning group; defaults to the caller's group at the API layer
    pub user_group_id: Option<i64>,
    pub office_id: Option<i64>,
    pub location_code: String,
    pub name: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub province_code: Option<String>,
    pub postal_code: Option<String>,
}

/// Absent fields are kept; the nullable ones are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<i64>>,
    pub name: Option<String>,
    pub address_line1: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub address_line2: Option<Option<String>>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub postal_code: Option<Option<String>>,
    pub state: Option<RecordState>,
}

/// An office attached to a location must belong to the same group.
async fn check_office(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    office_id: Option<i64>,
) -> Result<(), LincError> {
    let Some(office_id) = office_id else {
        return Ok(());
    };
    match offices::get(db, office_id).await? {
        Some(office) if office.user_group_id == user_group_id => Ok(()),
        _ => Err(LincError::BadRequest(format!(
            "office {office_id} does not belong to user group {user_group_id}"
        ))),
    }
}

pub async fn create(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    input: NewLocation,
) -> Result<Model, LincError> {
    check_office(db, user_group_id, input.office_id).await?;

    let code = required(&input.location_code, "location_code")?.to_ascii_uppercase();
    let now = now();
    let location = ActiveModel {
        user_group_id: Set(user_group_id),
        office_id: Set(input.office_id),
        location_code: Set(code.clone()),
        name: Set(required(&input.name, "name")?),
        address_line1: Set(required(&input.address_line1, "address_line1")?),
        address_line2: Set(clean(input.address_line2)),
        city: Set(required(&input.city, "city")?),
        province_code: Set(clean(input.province_code)),
        postal_code: Set(clean(input.postal_code)),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    location
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("location {code}")))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

pub async fn list(db: &impl ConnectionTrait, scope: &Scope) -> Result<Vec<Model>, LincError> {
    let condition = scope::owned_condition(db, Column::UserGroupId, scope).await?;
    Ok(Entity::find()
        .filter(scope::visible(Column::State))
        .filter(condition)
        .order_by_asc(Column::LocationCode)
        .all(db)
        .await?)
}

pub async fn update(
    db: &impl ConnectionTrait,
    existing: Model,
    patch: LocationPatch,
) -> Result<Model, LincError> {
    check_office(db, existing.user_group_id, patch.office_id.flatten()).await?;
    if let Some(state) = patch.state {
        ensure_state_change("location", &existing.state, state)?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(office_id) = patch.office_id {
        active.office_id = Set(office_id);
    }
    if let Some(name) = patch.name {
        active.name = Set(required(&name, "name")?);
    }
    if let Some(line) = patch.address_line1 {
        active.address_line1 = Set(required(&line, "address_line1")?);
    }
    if let Some(line) = patch.address_line2 {
        active.address_line2 = Set(clean(line));
    }
    if let Some(city) = patch.city {
        active.city = Set(required(&city, "city")?);
    }
    if let Some(postal_code) = patch.postal_code {
        active.postal_code = Set(clean(postal_code));
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
    ensure_state_change("location", &existing.state, state)?;
    let mut active: ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}
