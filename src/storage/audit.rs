use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::audit_log::{ActiveModel, Column, Entity, Model};
use crate::errors::LincError;
use crate::status::string_enum;
use crate::storage::now;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Transition,
    Login,
    Logout,
}

string_enum!(AuditAction {
    Create => "CREATE",
    Update => "UPDATE",
    Delete => "DELETE",
    Transition => "TRANSITION",
    Login => "LOGIN",
    Logout => "LOGOUT",
});

/// One audited change. `old` and `new` are stored as JSON text.
pub struct AuditEntry<'a, T: Serialize> {
    pub user_id: Option<i64>,
    pub action: AuditAction,
    pub entity_type: &'a str,
    pub entity_id: String,
    pub old: Option<&'a T>,
    pub new: Option<&'a T>,
}

pub async fn record<T: Serialize>(
    db: &impl ConnectionTrait,
    entry: AuditEntry<'_, T>,
) -> Result<(), LincError> {
    let old_values = entry.old.map(serde_json::to_string).transpose()?;
    let new_values = entry.new.map(serde_json::to_string).transpose()?;

    let row = ActiveModel {
        user_id: Set(entry.user_id),
        action: Set(entry.action.as_str().to_string()),
        entity_type: Set(entry.entity_type.to_string()),
        entity_id: Set(entry.entity_id),
        old_values: Set(old_values),
        new_values: Set(new_values),
        created_at: Set(now()),
        ..Default::default()
    };
    row.insert(db).await?;
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub limit: Option<u64>,
}

pub async fn list(db: &impl ConnectionTrait, filter: &AuditFilter) -> Result<Vec<Model>, LincError> {
    let mut query = Entity::find();
    if let Some(entity_type) = filter.entity_type.as_deref() {
        query = query.filter(Column::EntityType.eq(entity_type));
    }
    if let Some(entity_id) = filter.entity_id.as_deref() {
        query = query.filter(Column::EntityId.eq(entity_id));
    }
    Ok(query
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .limit(filter.limit.unwrap_or(100).min(1000))
        .all(db)
        .await?)
}

/// Delete rows older than `retention_days`; returns how many were removed.
pub async fn purge_older_than(db: &impl ConnectionTrait, retention_days: i64) -> Result<u64, LincError> {
    let cutoff = now() - retention_days * 86_400;
    let result = Entity::delete_many()
        .filter(Column::CreatedAt.lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
