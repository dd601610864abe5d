use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};

use crate::authz::Scope;
use crate::codes::is_valid_email;
use crate::entities::user::{self, ActiveModel, Column, Entity};
use crate::errors::{map_unique, LincError};
use crate::status::RecordState;
use crate::storage::{
    clean, double_option, ensure_state_change, now, required, scope, stored_state,
};

/// A user as exposed outside the store: everything but the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub surname: String,
    pub user_group_id: i64,
    pub office_id: Option<i64>,
    pub state: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login_at: Option<i64>,
}

impl From<user::Model> for User {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            surname: model.surname,
            user_group_id: model.user_group_id,
            office_id: model.office_id,
            state: model.state,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_login_at: model.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub first_name: String,
    pub surname: String,
    /// Defaults to the caller's group at the API layer
    pub user_group_id: Option<i64>,
    pub office_id: Option<i64>,
}

/// Absent fields are kept; `email` and `office_id` are cleared by an
/// explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub password: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub office_id: Option<Option<i64>>,
    pub state: Option<RecordState>,
}

fn hash_password(password: &str) -> Result<String, LincError> {
    if password.len() < 8 {
        return Err(LincError::BadRequest(
            "password must be at least 8 characters".to_string(),
        ));
    }
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| LincError::Other(format!("Password hashing failed: {}", e)))?
        .to_string())
}

pub(crate) fn checked_email(email: Option<String>) -> Result<Option<String>, LincError> {
    match clean(email) {
        Some(e) if !is_valid_email(&e) => {
            Err(LincError::BadRequest(format!("invalid email `{e}`")))
        }
        other => Ok(other),
    }
}

pub async fn create(
    db: &impl ConnectionTrait,
    user_group_id: i64,
    input: NewUser,
) -> Result<User, LincError> {
    let username = required(&input.username, "username")?.to_ascii_lowercase();
    let password_hash = hash_password(&input.password)?;
    let now = now();

    let user = ActiveModel {
        username: Set(username.clone()),
        password_hash: Set(password_hash),
        email: Set(checked_email(input.email)?),
        first_name: Set(required(&input.first_name, "first_name")?),
        surname: Set(required(&input.surname, "surname")?),
        user_group_id: Set(user_group_id),
        office_id: Set(input.office_id),
        state: Set(RecordState::Active.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        last_login_at: Set(None),
        ..Default::default()
    };

    let model = user
        .insert(db)
        .await
        .map_err(|e| map_unique(e, &format!("user {username}")))?;
    Ok(model.into())
}

pub async fn get(db: &impl ConnectionTrait, id: i64) -> Result<Option<User>, LincError> {
    Ok(Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?
        .map(User::from))
}

pub async fn get_by_username(db: &impl ConnectionTrait, username: &str) -> Result<Option<User>, LincError> {
    Ok(Entity::find()
        .filter(Column::Username.eq(username.trim().to_ascii_lowercase()))
        .filter(scope::visible(Column::State))
        .one(db)
        .await?
        .map(User::from))
}

/// Check credentials. Only ACTIVE users can log in; a wrong password and an
/// unknown user are indistinguishable.
pub async fn verify_password(
    db: &impl ConnectionTrait,
    username: &str,
    password: &str,
) -> Result<Option<User>, LincError> {
    let model = match Entity::find()
        .filter(Column::Username.eq(username.trim().to_ascii_lowercase()))
        .one(db)
        .await?
    {
        Some(m) if stored_state(&m.state) == RecordState::Active => m,
        _ => return Ok(None),
    };

    let parsed_hash = PasswordHash::new(&model.password_hash)
        .map_err(|e| LincError::Other(format!("Invalid password hash: {}", e)))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        Ok(Some(model.into()))
    } else {
        Ok(None)
    }
}

pub async fn record_login(db: &impl ConnectionTrait, user_id: i64) -> Result<(), LincError> {
    if let Some(model) = Entity::find_by_id(user_id).one(db).await? {
        let mut active: ActiveModel = model.into();
        active.last_login_at = Set(Some(now()));
        active.update(db).await?;
    }
    Ok(())
}

pub async fn list(db: &impl ConnectionTrait, scope: &Scope) -> Result<Vec<User>, LincError> {
    let condition = scope::owned_condition(db, Column::UserGroupId, scope).await?;
    Ok(Entity::find()
        .filter(scope::visible(Column::State))
        .filter(condition)
        .order_by_asc(Column::Username)
        .all(db)
        .await?
        .into_iter()
        .map(User::from)
        .collect())
}

/// Users that still count as members of the group.
pub async fn count_in_group(db: &impl ConnectionTrait, user_group_id: i64) -> Result<u64, LincError> {
    Ok(Entity::find()
        .filter(Column::UserGroupId.eq(user_group_id))
        .filter(scope::visible(Column::State))
        .count(db)
        .await?)
}

pub async fn update(db: &impl ConnectionTrait, id: i64, patch: UserPatch) -> Result<User, LincError> {
    let model = Entity::find_by_id(id)
        .filter(scope::visible(Column::State))
        .one(db)
        .await?
        .ok_or_else(|| LincError::NotFound(format!("user {id}")))?;
    if let Some(state) = patch.state {
        ensure_state_change("user", &model.state, state)?;
    }

    let mut active: ActiveModel = model.into();
    if let Some(password) = patch.password {
        active.password_hash = Set(hash_password(&password)?);
    }
    if let Some(email) = patch.email {
        active.email = Set(checked_email(email)?);
    }
    if let Some(first_name) = patch.first_name {
        active.first_name = Set(required(&first_name, "first_name")?);
    }
    if let Some(surname) = patch.surname {
        active.surname = Set(required(&surname, "surname")?);
    }
    if let Some(office_id) = patch.office_id {
        active.office_id = Set(office_id);
    }
    if let Some(state) = patch.state {
        active.state = Set(state.as_str().to_string());
    }
    active.updated_at = Set(now());
    Ok(active.update(db).await?.into())
}

pub async fn set_state(db: &impl ConnectionTrait, id: i64, state: RecordState) -> Result<User, LincError> {
    update(
        db,
        id,
        UserPatch {
            state: Some(state),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default()
            .verify_password(b"correct horse", &parsed)
            .is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(hash_password("short"), Err(LincError::BadRequest(_))));
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: UserPatch =
            serde_json::from_str(r#"{"email": null, "first_name": "Sipho"}"#).unwrap();
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.office_id, None);

        let patch: UserPatch = serde_json::from_str(r#"{"office_id": 4}"#).unwrap();
        assert_eq!(patch.office_id, Some(Some(4)));
        assert_eq!(patch.email, None);
    }

    #[test]
    fn test_email_checked() {
        assert_eq!(checked_email(Some(" ".into())).unwrap(), None);
        assert!(checked_email(Some("not-an-email".into())).is_err());
        assert_eq!(
            checked_email(Some("a@b.co".into())).unwrap(),
            Some("a@b.co".to_string())
        );
    }
}
