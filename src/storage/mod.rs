//! Per-country persistence. Every function takes the tenant connection (or a
//! transaction on it) explicitly; nothing here knows which country it is in.

pub mod applications;
pub mod assignments;
pub mod audit;
pub mod locations;
pub mod offices;
pub mod persons;
pub mod regions;
pub mod scope;
pub mod tokens;
pub mod user_groups;
pub mod users;

use base64ct::Encoding;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use rand::RngCore;
use sea_orm::{Database, DatabaseConnection};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::codes::CountryCode;
use crate::country::CountryRegistry;
use crate::errors::LincError;
use crate::settings::Settings;
use crate::status::RecordState;

/// One database connection per enabled country.
#[derive(Clone, Default)]
pub struct Tenants {
    inner: Arc<BTreeMap<CountryCode, DatabaseConnection>>,
}

impl Tenants {
    pub fn from_connections(
        connections: impl IntoIterator<Item = (CountryCode, DatabaseConnection)>,
    ) -> Self {
        Self {
            inner: Arc::new(connections.into_iter().collect()),
        }
    }

    pub fn get(&self, country: &CountryCode) -> Result<&DatabaseConnection, LincError> {
        self.inner
            .get(country)
            .ok_or_else(|| LincError::UnknownCountry(country.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, &DatabaseConnection)> {
        self.inner.iter()
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountryCode> {
        self.inner.keys()
    }
}

/// Connect to every configured country and bring its schema up to date.
/// A configured country missing from the registry aborts startup.
pub async fn init(settings: &Settings, registry: &CountryRegistry) -> Result<Tenants, LincError> {
    let mut connections = Vec::with_capacity(settings.countries.len());
    for (raw, cfg) in &settings.countries {
        let code = CountryCode::parse(raw).map_err(|e| LincError::Other(e.to_string()))?;
        if registry.get(&code).is_none() {
            return Err(LincError::UnknownCountry(code.to_string()));
        }

        let db = Database::connect(&cfg.database_url).await?;
        Migrator::up(&db, None).await?;
        info!(country = %code, "tenant database ready");
        connections.push((code, db));
    }
    Ok(Tenants::from_connections(connections))
}

pub(crate) fn random_id() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64ct::Base64UrlUnpadded::encode_string(&bytes)
}

pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

/// Parse a stored state column. Rows written by this crate always hold a
/// valid value; anything else is treated as deleted and therefore hidden.
pub(crate) fn stored_state(value: &str) -> RecordState {
    value.parse().unwrap_or(RecordState::Deleted)
}

pub(crate) fn ensure_state_change(
    what: &str,
    current: &str,
    next: RecordState,
) -> Result<(), LincError> {
    let current = stored_state(current);
    if current == next || current.can_transition_to(next) {
        Ok(())
    } else {
        Err(LincError::Conflict(format!(
            "{what} cannot move from {current} to {next}"
        )))
    }
}

/// Trim an optional text field, treating blank input as absent.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Mandatory text field: trimmed and non-empty.
pub(crate) fn required(value: &str, field: &str) -> Result<String, LincError> {
    let value = value.trim();
    if value.is_empty() {
        Err(LincError::BadRequest(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

/// PATCH field that can be cleared. With `#[serde(default)]` an absent field
/// stays `None`, an explicit `null` becomes `Some(None)`.
#[allow(clippy::option_option)]
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
