//! Fixed-format identifiers. Each newtype can only be constructed through
//! `parse`, so a value in hand has already passed its format check.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static USER_GROUP_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{4}$").expect("valid regex"));
static REGION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}[A-Z0-9]{2}$").expect("valid regex"));
static PROVINCE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));
static OFFICE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]$").expect("valid regex"));
static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} `{value}`: expected {expected}")]
pub struct CodeError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

macro_rules! code_type {
    ($(#[$meta:meta])* $name:ident, $re:ident, $kind:literal, $expected:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn parse(value: &str) -> Result<Self, CodeError> {
                if $re.is_match(value) {
                    Ok(Self(value.to_string()))
                } else {
                    Err(CodeError {
                        kind: $kind,
                        value: value.to_string(),
                        expected: $expected,
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CodeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

code_type!(
    /// Four upper-case alphanumerics, e.g. `WC01`. Immutable once a group exists.
    UserGroupCode,
    USER_GROUP_CODE,
    "user group code",
    "4 characters A-Z or 0-9"
);
code_type!(
    /// Province letters followed by two alphanumerics, e.g. `WC01` or `WCHD`.
    RegionCode,
    REGION_CODE,
    "region code",
    "2 letters A-Z then 2 characters A-Z or 0-9"
);

impl RegionCode {
    /// The two leading letters; callers check them against the region's
    /// province.
    pub fn province_prefix(&self) -> &str {
        &self.0[..2]
    }
}

code_type!(
    /// Two upper-case letters.
    ProvinceCode,
    PROVINCE_CODE,
    "province code",
    "2 letters A-Z"
);
code_type!(
    /// Single letter identifying an office inside its user group.
    OfficeCode,
    OFFICE_CODE,
    "office code",
    "1 letter A-Z"
);
code_type!(
    /// ISO 3166-1 alpha-2, upper case.
    CountryCode,
    COUNTRY_CODE,
    "country code",
    "2 letters A-Z"
);

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}
