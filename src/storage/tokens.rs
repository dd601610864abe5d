use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entities::access_token::{ActiveModel, Column, Entity, Model};
use crate::errors::LincError;
use crate::storage::{now, random_id};

pub async fn issue(db: &impl ConnectionTrait, user_id: i64, ttl_secs: i64) -> Result<Model, LincError> {
    let now = now();
    let token = ActiveModel {
        token: Set(random_id()),
        user_id: Set(user_id),
        created_at: Set(now),
        expires_at: Set(now + ttl_secs),
        revoked: Set(0),
    };
    Ok(token.insert(db).await?)
}

/// The token if it exists, is not revoked and has not expired.
pub async fn get_valid(db: &impl ConnectionTrait, token: &str) -> Result<Option<Model>, LincError> {
    let model = Entity::find()
        .filter(Column::Token.eq(token))
        .one(db)
        .await?;
    let now = now();
    Ok(model.filter(|t| t.revoked == 0 && now <= t.expires_at))
}

pub async fn revoke(db: &impl ConnectionTrait, token: &str) -> Result<(), LincError> {
    if let Some(model) = Entity::find()
        .filter(Column::Token.eq(token))
        .one(db)
        .await?
    {
        let mut active: ActiveModel = model.into();
        active.revoked = Set(1);
        active.update(db).await?;
    }
    Ok(())
}

/// Delete expired and revoked tokens; returns how many were removed.
pub async fn cleanup_expired(db: &impl ConnectionTrait) -> Result<u64, LincError> {
    let result = Entity::delete_many()
        .filter(
            Condition::any()
                .add(Column::ExpiresAt.lt(now()))
                .add(Column::Revoked.ne(0)),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
