use crate::authz::AuthorityLevel;
use crate::codes::{CountryCode, ProvinceCode, UserGroupCode};
use crate::storage::{self, user_groups, users, Tenants};
use miette::{IntoDiagnostic, Result};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// User group definition from the seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub code: UserGroupCode,
    pub name: String,
    #[serde(default)]
    pub province_code: Option<ProvinceCode>,
    pub authority_level: AuthorityLevel,
    #[serde(default)]
    pub is_provincial_help_desk: bool,
    #[serde(default)]
    pub is_national_help_desk: bool,
}

/// User definition from the seed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDefinition {
    /// Username (unique identifier)
    pub username: String,
    /// Plain text password, hashed on creation. Existing users keep theirs.
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    pub first_name: String,
    pub surname: String,
    /// Code of the owning user group, defined in the same file or already stored
    pub user_group: UserGroupCode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountrySeed {
    #[serde(default)]
    pub user_groups: Vec<GroupDefinition>,
    #[serde(default)]
    pub users: Vec<UserDefinition>,
}

/// Root structure of the seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    pub countries: BTreeMap<CountryCode, CountrySeed>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    fn count(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
            SyncOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Sync user groups and users from a JSON file into every listed tenant
/// (idempotent). A country in the file that is not enabled is an error.
pub async fn sync_from_file(tenants: &Tenants, path: &Path) -> Result<SyncReport> {
    tracing::info!("Loading seed data from {}", path.display());

    let content = fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| miette::miette!("Failed to read seed file at '{}': {}", path.display(), e))?;

    let seed: SeedFile = serde_json::from_str(&content)
        .into_diagnostic()
        .map_err(|e| {
            miette::miette!(
                "Failed to parse seed file: {}\n\nExpected format:\n{{\n  \"countries\": {{\n    \"ZA\": {{\n      \"user_groups\": [{{\"code\": \"NA01\", \"name\": \"National\", \"authority_level\": \"NATIONAL\"}}],\n      \"users\": [{{\"username\": \"admin\", \"password\": \"...\", \"first_name\": \"...\", \"surname\": \"...\", \"user_group\": \"NA01\"}}]\n    }}\n  }}\n}}",
                e
            )
        })?;

    sync(tenants, seed).await
}

pub async fn sync(tenants: &Tenants, seed: SeedFile) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for (country, data) in seed.countries {
        let db = tenants.get(&country)?;
        tracing::info!(
            %country,
            groups = data.user_groups.len(),
            users = data.users.len(),
            "syncing seed data"
        );

        for group in &data.user_groups {
            report.count(sync_group(db, group).await?);
        }
        for user in &data.users {
            report.count(sync_user(db, user).await?);
        }
    }

    tracing::info!(
        "Seed sync complete: {} created, {} updated, {} unchanged",
        report.created,
        report.updated,
        report.unchanged
    );

    Ok(report)
}

/// Sync a single user group, matched by code
async fn sync_group(db: &DatabaseConnection, def: &GroupDefinition) -> Result<SyncOutcome> {
    let existing = user_groups::get_by_code(db, def.code.as_str()).await?;

    let Some(existing) = existing else {
        tracing::info!("Creating user group: {}", def.code);
        user_groups::create(
            db,
            user_groups::NewUserGroup {
                code: def.code.clone(),
                name: def.name.clone(),
                province_code: def.province_code.clone(),
                authority_level: def.authority_level,
                is_provincial_help_desk: def.is_provincial_help_desk,
                is_national_help_desk: def.is_national_help_desk,
            },
        )
        .await?;
        return Ok(SyncOutcome::Created);
    };

    if existing.province_code.as_deref() != def.province_code.as_ref().map(|p| p.as_str()) {
        tracing::warn!(
            code = %def.code,
            "seed province differs from stored group; provinces are immutable, leaving it"
        );
    }

    let unchanged = existing.name == def.name
        && existing.authority_level == def.authority_level.as_str()
        && existing.is_provincial_help_desk == def.is_provincial_help_desk
        && existing.is_national_help_desk == def.is_national_help_desk;
    if unchanged {
        return Ok(SyncOutcome::Unchanged);
    }

    tracing::info!("Updating user group: {}", def.code);
    user_groups::update(
        db,
        existing,
        user_groups::UserGroupPatch {
            name: Some(def.name.clone()),
            authority_level: Some(def.authority_level),
            is_provincial_help_desk: Some(def.is_provincial_help_desk),
            is_national_help_desk: Some(def.is_national_help_desk),
            ..Default::default()
        },
    )
    .await?;
    Ok(SyncOutcome::Updated)
}

/// Sync a single user, matched by username
async fn sync_user(db: &DatabaseConnection, def: &UserDefinition) -> Result<SyncOutcome> {
    let group = user_groups::get_by_code(db, def.user_group.as_str())
        .await?
        .ok_or_else(|| {
            miette::miette!(
                "User {} references unknown user group {}",
                def.username,
                def.user_group
            )
        })?;

    let username = def.username.trim().to_ascii_lowercase();
    let txn = db.begin().await.into_diagnostic()?;
    let outcome = match users::get_by_username(&txn, &username).await? {
        None => {
            tracing::info!("Creating user: {}", username);
            users::create(
                &txn,
                group.id,
                users::NewUser {
                    username: username.clone(),
                    password: def.password.clone(),
                    email: def.email.clone(),
                    first_name: def.first_name.clone(),
                    surname: def.surname.clone(),
                    user_group_id: Some(group.id),
                    office_id: None,
                },
            )
            .await?;
            SyncOutcome::Created
        }
        Some(existing) => {
            if existing.user_group_id != group.id {
                tracing::warn!(
                    %username,
                    "seed moves user to another group; group membership is not synced"
                );
            }
            // an absent email in the file leaves the stored one alone
            let email = storage::clean(def.email.clone());
            let unchanged = (email.is_none() || existing.email == email)
                && existing.first_name == def.first_name
                && existing.surname == def.surname;
            if unchanged {
                SyncOutcome::Unchanged
            } else {
                tracing::info!("Updating user: {}", username);
                users::update(
                    &txn,
                    existing.id,
                    users::UserPatch {
                        email: email.map(Some),
                        first_name: Some(def.first_name.clone()),
                        surname: Some(def.surname.clone()),
                        ..Default::default()
                    },
                )
                .await?;
                SyncOutcome::Updated
            }
        }
    };
    txn.commit().await.into_diagnostic()?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_file_shape() {
        let raw = r#"{
            "countries": {
                "ZA": {
                    "user_groups": [
                        {"code": "NA01", "name": "National", "authority_level": "NATIONAL"},
                        {"code": "WC01", "name": "Cape Town", "province_code": "WC",
                         "authority_level": "LOCAL", "is_provincial_help_desk": true}
                    ],
                    "users": [
                        {"username": "admin", "password": "changeme123", "first_name": "Ada",
                         "surname": "Admin", "user_group": "NA01"}
                    ]
                }
            }
        }"#;
        let seed: SeedFile = serde_json::from_str(raw).unwrap();
        let za = &seed.countries[&CountryCode::parse("ZA").unwrap()];
        assert_eq!(za.user_groups.len(), 2);
        assert!(za.user_groups[0].province_code.is_none());
        assert!(za.user_groups[1].is_provincial_help_desk);
        assert!(!za.user_groups[1].is_national_help_desk);
        assert_eq!(za.users[0].user_group.as_str(), "NA01");
    }

    #[test]
    fn test_seed_rejects_malformed_codes() {
        let raw = r#"{"countries": {"ZA": {"user_groups": [
            {"code": "toolong", "name": "x", "authority_level": "LOCAL"}
        ]}}}"#;
        assert!(serde_json::from_str::<SeedFile>(raw).is_err());
    }

    #[test]
    fn test_report_counts() {
        let mut report = SyncReport::default();
        report.count(SyncOutcome::Created);
        report.count(SyncOutcome::Created);
        report.count(SyncOutcome::Unchanged);
        assert_eq!(
            report,
            SyncReport {
                created: 2,
                updated: 0,
                unchanged: 1
            }
        );
    }
}
