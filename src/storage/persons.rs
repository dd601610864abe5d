use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::Deserialize;

use crate::authz::Scope;
use crate::entities::person::{ActiveModel, Column, Entity, Model};
use crate::errors::{map_unique, LincError};
use crate::status::{RecordState, ValidationStatus};
use crate::storage::{clean, ensure_state_change, now, required, scope};
use crate::validation::person::PersonSnapshot;

/// Person fields as submitted for create, and as a partial patch for update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonInput {
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub language_preference: Option<String>,
    pub email: Option<String>,
    pub phone_mobile: Option<String>,
    pub postal_code: Option<String>,
}

impl PersonInput {
    pub fn from_model(model: &Model) -> Self {
        Self {
            id_type: Some(model.id_type.clone()),
            id_number: Some(model.id_number.clone()),
            first_name: Some(model.first_name.clone()),
            middle_name: model.middle_name.clone(),
            surname: Some(model.surname.clone()),
            date_of_birth: model.date_of_birth,
            gender: Some(model.gender.clone()),
            nationality: model.nationality.clone(),
            language_preference: model.language_preference.clone(),
            email: model.email.clone(),
            phone_mobile: model.phone_mobile.clone(),
            postal_code: model.postal_code.clone(),
        }
    }

    /// Fields present in `patch` replace the current ones. Absent and `null`
    /// fields are kept; an optional field is cleared by sending it blank,
    /// which [`update`] stores as NULL.
    pub fn overlay(self, patch: PersonInput) -> Self {
        Self {
            id_type: patch.id_type.or(self.id_type),
            id_number: patch.id_number.or(self.id_number),
            first_name: patch.first_name.or(self.first_name),
            middle_name: patch.middle_name.or(self.middle_name),
            surname: patch.surname.or(self.surname),
            date_of_birth: patch.date_of_birth.or(self.date_of_birth),
            gender: patch.gender.or(self.gender),
            nationality: patch.nationality.or(self.nationality),
            language_preference: patch.language_preference.or(self.language_preference),
            email: patch.email.or(self.email),
            phone_mobile: patch.phone_mobile.or(self.phone_mobile),
            postal_code: patch.postal_code.or(self.postal_code),
        }
    }

    pub fn snapshot(&self, as_of: NaiveDate) -> PersonSnapshot {
        PersonSnapshot {
            id_type: self.id_type.clone(),
            id_number: self.id_number.clone(),
            first_name: self.first_name.clone(),
            surname: self.surname.clone(),
            date_of_birth: self.date_of_birth,
            gender: self.gender.clone(),
            nationality: self.nationality.clone(),
            language_preference: self.language_preference.clone(),
            email: self.email.clone(),
            postal_code: self.postal_code.clone(),
            as_of,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonPatch {
    #[serde(flatten)]
    pub fields: PersonInput,
    pub validation_status: Option<ValidationStatus>,
    pub state: Option<RecordState>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonFilter {
    pub id_number: Option<String>,
    pub surname: Option<String>,
    pub limit: Option<u64>,
}

fn text(value: &Option<String>, field: &str) -> Result<String, LincError> {
    required(value.as_deref().unwrap_or_default(), field)
}

/// Persist a person whose fields have already passed the person rules.
pub async fn create(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    input: PersonInput,
) -> Result<Model, LincError> {
    let id_type = text(&input.id_type, "id_type")?;
    let id_number = text(&input.id_number, "id_number")?;
    let now = now();

    let person = ActiveModel {
        user_group_id: Set(user_group_id),
        id_type: Set(id_type.clone()),
        id_number: Set(id_number.clone()),
        first_name: Set(text(&input.first_name, "first_name")?),
        middle_name: Set(clean(input.middle_name)),
        surname: Set(text(&input.surname, "surname")?),
        date_of_birth: Set(input.date_of_birth),
        gender: Set(text(&input.gender, "gender")?),
        nationality: Set(clean(input.nationality)),
        language_preference: Set(clean(input.language_preference)),
        email: Set(clean(input.email)),
        phone_mobile: Set(clean(input.phone_mobile)),
        postal_code: Set(clean(input.postal_code)),
        validation_status: Set(ValidationStatus::Pending.as_str().to_string()),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    person
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("person {id_type} {id_number}")))
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<Model>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?)
}

pub async fn list(
    db: &impl ConnectionTrait,
    scope: &Scope,
    filter: &PersonFilter,
) -> Result<Vec<Model>, LincError> {
    let condition = scope::owned_condition(db, Column::UserGroupId, scope).await?;
    let mut query = Entity::find()
        .filter(scope::visible(Column::State))
        .filter(condition);
    if let Some(id_number) = filter.id_number.as_deref() {
        query = query.filter(Column::IdNumber.eq(id_number.trim()));
    }
    if let Some(surname) = filter.surname.as_deref() {
        query = query.filter(Column::Surname.contains(surname.trim()));
    }
    Ok(query
        .order_by_asc(Column::Surname)
        .order_by_asc(Column::Id)
        .limit(filter.limit.unwrap_or(100).min(500))
        .all(db)
        .await?)
}

/// Write an already-validated merge of the stored person and a patch.
pub async fn update(
    db: &impl ConnectionTrait,
    existing: Model,
    merged: PersonInput,
    validation_status: Option<ValidationStatus>,
    state: Option<RecordState>,
) -> Result<Model, LincError> {
    if let Some(state) = state {
        ensure_state_change("person", &existing.state, state)?;
    }
    let label = format!("person {}", existing.id);

    let mut active: ActiveModel = existing.into();
    active.id_type = Set(text(&merged.id_type, "id_type")?);
    active.id_number = Set(text(&merged.id_number, "id_number")?);
    active.first_name = Set(text(&merged.first_name, "first_name")?);
    active.middle_name = Set(clean(merged.middle_name));
    active.surname = Set(text(&merged.surname, "surname")?);
    active.date_of_birth = Set(merged.date_of_birth);
    active.gender = Set(text(&merged.gender, "gender")?);
    active.nationality = Set(clean(merged.nationality));
    active.language_preference = Set(clean(merged.language_preference));
    active.email = Set(clean(merged.email));
    active.phone_mobile = Set(clean(merged.phone_mobile));
    active.postal_code = Set(clean(merged.postal_code));
    if let Some(status) = validation_status {
        active.validation_status = Set(status.as_str().to_string());
    }
    if let Some(state) = state {
        active.state = Set(state.as_str().to_string());
    }
    active.updated_at = Set(now());

    active.update(db).await.map_err(|e| map_unique(e, &label))
}

pub async fn set_state(
    db: &impl ConnectionTrait,
    existing: Model,
    state: RecordState,
) -> Result<Model, LincError> {
    ensure_state_change("person", &existing.state, state)?;
    let mut active: ActiveModel = existing.into();
    active.state = Set(state.as_str().to_string());
    active.updated_at = Set(now());
    Ok(active.update(db).await?)
}
