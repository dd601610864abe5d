//! Translating resolver scopes into query predicates, and stored rows back
//! into resolver targets.

use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::authz::{AuthorityLevel, ProvinceScope, Scope, TargetResource};
use crate::codes::ProvinceCode;
use crate::entities::user_group;
use crate::errors::LincError;
use crate::status::RecordState;

/// Target descriptor for anything owned by `group`. A NATIONAL group owns
/// province ALL; a group whose stored province does not parse is treated the
/// same way, which only unrestricted actors can reach.
pub fn target_of_group(group: &user_group::Model) -> TargetResource {
    let province = match AuthorityLevel::from_stored(&group.authority_level) {
        AuthorityLevel::National => ProvinceScope::All,
        _ => group
            .province_code
            .as_deref()
            .and_then(|p| ProvinceCode::parse(p).ok())
            .map(ProvinceScope::Code)
            .unwrap_or(ProvinceScope::All),
    };
    TargetResource::new(province, Some(group.id))
}

/// Target descriptor for a record owned by the group with `group_id`.
/// `None` when the group no longer exists.
pub async fn target_of_owner(
    db: &impl ConnectionTrait,
    group_id: i64,
) -> Result<Option<TargetResource>, LincError> {
    Ok(user_group::Entity::find_by_id(group_id)
        .one(db)
        .await?
        .map(|g| target_of_group(&g)))
}

fn province_groups(province: &ProvinceCode) -> Condition {
    Condition::all()
        .add(user_group::Column::ProvinceCode.eq(province.as_str()))
        .add(user_group::Column::AuthorityLevel.ne(AuthorityLevel::National.as_str()))
}

/// Predicate on the `user_groups` table itself.
pub fn group_condition(scope: &Scope) -> Condition {
    match scope {
        Scope::Unrestricted => Condition::all(),
        Scope::Province(province) => province_groups(province),
        Scope::OwnGroup(id) => Condition::all().add(user_group::Column::Id.eq(*id)),
    }
}

/// Predicate on a table that carries an owning `user_group_id` column.
pub async fn owned_condition<C: ColumnTrait>(
    db: &impl ConnectionTrait,
    column: C,
    scope: &Scope,
) -> Result<Condition, LincError> {
    Ok(match scope {
        Scope::Unrestricted => Condition::all(),
        Scope::OwnGroup(id) => Condition::all().add(column.eq(*id)),
        Scope::Province(province) => {
            let ids: Vec<i64> = user_group::Entity::find()
                .select_only()
                .column(user_group::Column::Id)
                .filter(province_groups(province))
                .into_tuple()
                .all(db)
                .await?;
            Condition::all().add(column.is_in(ids))
        }
    })
}

/// Rows that have not been soft-deleted.
pub fn visible<C: ColumnTrait>(state_column: C) -> Condition {
    Condition::all().add(state_column.ne(RecordState::Deleted.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(level: &str, province: Option<&str>) -> user_group::Model {
        user_group::Model {
            id: 7,
            code: "GP01".into(),
            name: "Gauteng".into(),
            province_code: province.map(str::to_string),
            authority_level: level.into(),
            is_provincial_help_desk: false,
            is_national_help_desk: false,
            state: "ACTIVE".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_national_group_owns_all() {
        let target = target_of_group(&group("NATIONAL", Some("GP")));
        assert_eq!(target.province, ProvinceScope::All);
        assert_eq!(target.owning_user_group_id, Some(7));
    }

    #[test]
    fn test_provincial_group_owns_its_province() {
        let target = target_of_group(&group("LOCAL", Some("GP")));
        assert_eq!(
            target.province,
            ProvinceScope::Code(ProvinceCode::parse("GP").unwrap())
        );
    }

    #[test]
    fn test_missing_province_falls_back_to_all() {
        let target = target_of_group(&group("PROVINCIAL", None));
        assert_eq!(target.province, ProvinceScope::All);
    }
}
