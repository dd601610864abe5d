use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;

use crate::entities::user_location_assignment::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::RecordState;
use crate::storage::{ensure_state_change, now, scope, stored_state};

#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    pub user_id: i64,
    pub role: String,
}

fn normalize_role(role: &str) -> Result<String, LincError> {
    let role = role.trim().to_ascii_uppercase();
    if role.is_empty() || role.len() > 50 {
        return Err(LincError::BadRequest(
            "role must be between 1 and 50 characters".to_string(),
        ));
    }
    Ok(role)
}

/// Assign a user to a location. A previously removed assignment with the same
/// role is reactivated instead of inserting a duplicate triple.
pub async fn assign(
    db: &impl ConnectionTrait,
    location_id: i64,
    input: NewAssignment,
    assigned_by: Option<i64>,
) -> Result<Model, LincError> {
    let role = normalize_role(&input.role)?;

    let existing = Entity::find()
        .filter(Column::UserId.eq(input.user_id))
        .filter(Column::LocationId.eq(location_id))
        .filter(Column::Role.eq(role.as_str()))
        .one(db)
        .await?;

    if let Some(model) = existing {
        if stored_state(&model.state).is_visible() {
            return Err(LincError::Conflict(format!(
                "user {} already holds {role} at location {location_id}",
                input.user_id
            )));
        }
        let mut active: ActiveModel = model.into();
        active.state = Set(RecordState::Active.as_str().to_string());
        active.assigned_at = Set(now());
        active.assigned_by = Set(assigned_by);
        return Ok(active.update(db).await?);
    }

    let assignment = ActiveModel {
        user_id: Set(input.user_id),
        location_id: Set(location_id),
        role: Set(role.clone()),
        state: Set(RecordState::Active.as_str().to_string()),
        assigned_at: Set(now()),
        assigned_by: Set(assigned_by),
        ..Default::default()
    };
    assignment
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("assignment {role}")))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

pub async fn list_for_location(db: &impl ConnectionTrait, location_id: i64) -> Result<Vec<Model>, LincError> {
    Ok(Entity::find()
        .filter(Column::LocationId.eq(location_id))
        .filter(scope::visible(Column::State))
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub async fn list_for_user(db: &impl ConnectionTrait, user_id: i64) -> Result<Vec<Model>, LincError> {
    Ok(Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(scope::visible(Column::State))
        .order_by_asc(Column::Id)
        .all(db)
        .await?)
}

pub async fn unassign(db: &impl ConnectionTrait, existing: Model) -> Result<Model, LincError> {
    ensure_state_change("assignment", &existing.state, RecordState::Deleted)?;
    let mut active: ActiveModel = existing.into();
    active.state = Set(RecordState::Deleted.as_str().to_string());
    Ok(active.update(db).await?)
}
