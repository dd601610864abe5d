use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codes::{ProvinceCode, UserGroupCode};

/// Tier in the permission hierarchy, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityLevel {
    National,
    Provincial,
    Local,
    Office,
}

impl AuthorityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorityLevel::National => "NATIONAL",
            AuthorityLevel::Provincial => "PROVINCIAL",
            AuthorityLevel::Local => "LOCAL",
            AuthorityLevel::Office => "OFFICE",
        }
    }

    /// Lenient parse used when reading stored rows: anything unrecognised is
    /// treated as LOCAL, the most restrictive group-bound level.
    pub fn from_stored(value: &str) -> Self {
        value.parse().unwrap_or(AuthorityLevel::Local)
    }

    /// Higher is broader. LOCAL and OFFICE share the own-group scope but an
    /// OFFICE actor may not create LOCAL groups or users.
    pub fn rank(&self) -> u8 {
        match self {
            AuthorityLevel::National => 3,
            AuthorityLevel::Provincial => 2,
            AuthorityLevel::Local => 1,
            AuthorityLevel::Office => 0,
        }
    }
}

impl FromStr for AuthorityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NATIONAL" => Ok(AuthorityLevel::National),
            "PROVINCIAL" => Ok(AuthorityLevel::Provincial),
            "LOCAL" => Ok(AuthorityLevel::Local),
            "OFFICE" => Ok(AuthorityLevel::Office),
            other => Err(format!("unknown authority level `{other}`")),
        }
    }
}

impl fmt::Display for AuthorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpdeskFlags {
    pub provincial: bool,
    pub national: bool,
}

/// Everything the resolver knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorContext {
    pub user_id: i64,
    pub user_group_id: Option<i64>,
    pub user_group_code: Option<UserGroupCode>,
    pub authority_level: AuthorityLevel,
    pub province_code: Option<ProvinceCode>,
    pub flags: HelpdeskFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvinceScope {
    /// Nationally owned resource, not tied to any province
    #[serde(rename = "ALL")]
    All,
    #[serde(untagged)]
    Code(ProvinceCode),
}

/// What is being accessed: the owning province (or ALL) and owning group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetResource {
    pub province: ProvinceScope,
    pub owning_user_group_id: Option<i64>,
}

impl TargetResource {
    pub fn new(province: ProvinceScope, owning_user_group_id: Option<i64>) -> Self {
        Self {
            province,
            owning_user_group_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    #[default]
    Read,
    Write,
}

/// Subset of records a request is narrowed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Unrestricted,
    Province(ProvinceCode),
    OwnGroup(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allow: bool,
    pub scope: Option<Scope>,
}

impl Decision {
    pub fn allow(scope: Scope) -> Self {
        Self {
            allow: true,
            scope: Some(scope),
        }
    }

    pub fn deny() -> Self {
        Self {
            allow: false,
            scope: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub target: TargetResource,
    #[serde(default)]
    pub action: Action,
}
