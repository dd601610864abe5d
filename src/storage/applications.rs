use chrono::Utc;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::authz::Scope;
use crate::entities::license_application::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::{string_enum, ApplicationStatus};
use crate::storage::{now, scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationType {
    #[default]
    New,
    Renewal,
    Upgrade,
    Duplicate,
}

string_enum!(ApplicationType {
    New => "NEW",
    Renewal => "RENEWAL",
    Upgrade => "UPGRADE",
    Duplicate => "DUPLICATE",
});

#[derive(Debug, Clone, Deserialize)]
pub struct NewApplication {
    pub person_id: i64,
    pub license_category: String,
    #[serde(default)]
    pub application_type: ApplicationType,
    pub location_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub person_id: Option<i64>,
}

/// `LA` + capture date + six random digits, e.g. `LA20250601-042917`.
fn application_number() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("LA{}-{suffix:06}", Utc::now().format("%Y%m%d"))
}

pub fn status_of(model: &Model) -> Result<ApplicationStatus, LincError> {
    model
        .status
        .parse()
        .map_err(|e: String| LincError::Other(format!("application {}: {e}", model.id)))
}

/// Persist a new application in DRAFT. The caller has already run the
/// creation rules and resolved the owning group.
pub async fn create(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    input: NewApplication,
) -> Result<Model, LincError> {
    let now = now();
    let number = application_number();
    let application = ActiveModel {
        application_number: Set(number.clone()),
        person_id: Set(input.person_id),
        user_group_id: Set(user_group_id),
        location_id: Set(input.location_id),
        license_category: Set(input.license_category.trim().to_ascii_uppercase()),
        application_type: Set(input.application_type.as_str().to_string()),
        status: Set(ApplicationStatus::Draft.as_str().to_string()),
        submitted_at: Set(None),
        status_changed_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    application
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("application {number}")))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn list(
    db: &impl ConnectionTrait,
    scope: &Scope,
    filter: &ApplicationFilter,
) -> Result<Vec<Model>, LincError> {
    let condition = scope::owned_condition(db, Column::UserGroupId, scope).await?;
    let mut query = Entity::find().filter(condition);
    if let Some(status) = filter.status {
        query = query.filter(Column::Status.eq(status.as_str()));
    }
    if let Some(person_id) = filter.person_id {
        query = query.filter(Column::PersonId.eq(person_id));
    }
    Ok(query.order_by_desc(Column::CreatedAt).all(db).await?)
}

/// Move an application from the status recorded in `existing` to `next`.
///
/// The write only lands if the row still holds that status, so a concurrent
/// transition committed since `existing` was read turns into a conflict
/// instead of being overwritten. Legality has been checked by the caller.
pub async fn set_status(
    db: &impl ConnectionTrait,
    existing: &Model,
    next: ApplicationStatus,
) -> Result<Model, LincError> {
    let now = now();
    let mut update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(next.as_str()))
        .col_expr(Column::StatusChangedAt, Expr::value(now))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(existing.id))
        .filter(Column::Status.eq(existing.status.as_str()));
    if next == ApplicationStatus::Submitted && existing.submitted_at.is_none() {
        update = update.col_expr(Column::SubmittedAt, Expr::value(Some(now)));
    }

    if update.exec(db).await?.rows_affected == 0 {
        return Err(LincError::Conflict(format!(
            "application {} is no longer {}",
            existing.id, existing.status
        )));
    }
    get(db, existing.id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("application {}", existing.id)))
}
