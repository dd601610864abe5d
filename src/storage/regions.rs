use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;

use crate::authz::Scope;
use crate::codes::{ProvinceCode, RegionCode};
use crate::entities::region::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::{RecordState, RegionType, RegistrationStatus};
use crate::storage::{
    clean, double_option, ensure_state_change, now, required, scope, stored_state,
};
use crate::storage::users::checked_email;
use crate::validation::region::RegionSnapshot;

#[derive(Debug, Clone)]
pub struct NewRegion {
    pub region_code: RegionCode,
    pub name: String,
    pub region_type: RegionType,
    pub province_code: ProvinceCode,
    pub registration_status: RegistrationStatus,
    pub contact_person: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub operational_notes: Option<String>,
}

/// Absent fields are kept; the contact fields are cleared by an explicit
/// `null`. Registration status moves through its own operation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionPatch {
    pub region_code: Option<String>,
    pub name: Option<String>,
    pub region_type: Option<RegionType>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_person: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub operational_notes: Option<Option<String>>,
    pub state: Option<RecordState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegionFilter {
    pub province_code: Option<String>,
    pub region_type: Option<RegionType>,
}

pub fn registration_of(model: &Model) -> Result<RegistrationStatus, LincError> {
    model
        .registration_status
        .parse()
        .map_err(|e: String| LincError::Other(format!("region {}: {e}", model.id)))
}

/// Registration facts of `model` as of `now` (unix seconds).
pub fn snapshot(model: &Model, now: i64) -> Result<RegionSnapshot, LincError> {
    Ok(RegionSnapshot {
        registration_status: registration_of(model)?,
        suspended_until: model.suspended_until,
        now,
    })
}

pub async fn create(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    input: NewRegion,
) -> Result<Model, LincError> {
    if input.region_code.province_prefix() != input.province_code.as_str() {
        return Err(LincError::BadRequest(format!(
            "region code {} does not belong to province {}",
            input.region_code, input.province_code
        )));
    }

    let now = now();
    let region = ActiveModel {
        user_group_id: Set(user_group_id),
        region_code: Set(input.region_code.to_string()),
        name: Set(required(&input.name, "name")?),
        region_type: Set(input.region_type.as_str().to_string()),
        province_code: Set(input.province_code.to_string()),
        registration_status: Set(input.registration_status.as_str().to_string()),
        suspended_until: Set(None),
        contact_person: Set(clean(input.contact_person)),
        phone_number: Set(clean(input.phone_number)),
        email: Set(checked_email(input.email)?),
        operational_notes: Set(clean(input.operational_notes)),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    region
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("region {}", input.region_code)))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

/// Whether `code` is still free. Deleted regions keep their code reserved.
pub async fn code_available(db: &impl ConnectionTrait, code: &RegionCode) -> Result<bool, LincError> {
    let taken = Entity::find()
        .filter(Column::RegionCode.eq(code.as_str()))
        .count(db)
        .await?;
    Ok(taken == 0)
}

pub async fn list(
    db: &impl ConnectionTrait,
    scope: &Scope,
    filter: &RegionFilter,
) -> Result<Vec<Model>, LincError> {
    let condition = scope::owned_condition(db, Column::UserGroupId, scope).await?;
    let mut query = Entity::find()
        .filter(scope::visible(Column::State))
        .filter(condition);
    if let Some(province) = filter.province_code.as_deref() {
        query = query.filter(Column::ProvinceCode.eq(province.trim().to_ascii_uppercase()));
    }
    if let Some(region_type) = filter.region_type {
        query = query.filter(Column::RegionType.eq(region_type.as_str()));
    }
    Ok(query.order_by_asc(Column::RegionCode).all(db).await?)
}

pub async fn update(
    db: &impl ConnectionTrait,
    existing: Model,
    patch: RegionPatch,
) -> Result<Model, LincError> {
    if let Some(code) = patch.region_code.as_deref() {
        if code != existing.region_code {
            return Err(LincError::BadRequest(
                "region code cannot be changed".to_string(),
            ));
        }
    }
    if let Some(state) = patch.state {
        ensure_state_change("region", &existing.state, state)?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(required(&name, "name")?);
    }
    if let Some(region_type) = patch.region_type {
        active.region_type = Set(region_type.as_str().to_string());
    }
    if let Some(contact) = patch.contact_person {
        active.contact_person = Set(clean(contact));
    }
    if let Some(phone) = patch.phone_number {
        active.phone_number = Set(clean(phone));
    }
    if let Some(email) = patch.email {
        active.email = Set(checked_email(email)?);
    }
    if let Some(notes) = patch.operational_notes {
        active.operational_notes = Set(clean(notes));
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
    ensure_state_change("region", &existing.state, state)?;
    let mut active: ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}

/// Move the registration of `existing` to `next`, optionally with the end of
/// a suspension.
///
/// Only SUSPENDED carries an end date; every other status clears it. The write
/// is guarded on the status recorded in `existing`, so a concurrent change
/// shows up as a conflict.
pub async fn set_registration(
    db: &impl ConnectionTrait,
    existing: &Model,
    next: RegistrationStatus,
    suspended_until: Option<i64>,
) -> Result<Model, LincError> {
    let current = registration_of(existing)?;
    if stored_state(&existing.state) != RecordState::Active {
        return Err(LincError::Conflict(format!(
            "region {} is not active",
            existing.region_code
        )));
    }
    if !current.can_transition_to(next) {
        return Err(LincError::Conflict(format!(
            "region registration cannot move from {current} to {next}"
        )));
    }
    let now = now();
    let suspended_until = match (next, suspended_until) {
        (RegistrationStatus::Suspended, Some(until)) if until <= now => {
            return Err(LincError::BadRequest(
                "suspended_until must be in the future".to_string(),
            ));
        }
        (RegistrationStatus::Suspended, until) => until,
        (_, Some(_)) => {
            return Err(LincError::BadRequest(
                "suspended_until only applies to a suspension".to_string(),
            ));
        }
        (_, None) => None,
    };

    let result = Entity::update_many()
        .col_expr(Column::RegistrationStatus, Expr::value(next.as_str()))
        .col_expr(Column::SuspendedUntil, Expr::value(suspended_until))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(existing.id))
        .filter(Column::RegistrationStatus.eq(existing.registration_status.as_str()))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(LincError::Conflict(format!(
            "region {} registration changed concurrently",
            existing.region_code
        )));
    }
    get(db, existing.id)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("region {}", existing.id)))
}
