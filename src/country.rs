//! Static per-country configuration. Built once at startup and passed by
//! reference into the resolver and the validation rules; never mutated.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codes::CountryCode;
use crate::status::ApplicationStatus;

#[derive(Debug, Clone, Serialize)]
pub struct IdTypeRule {
    pub code: &'static str,
    pub name: &'static str,
    pub min_len: usize,
    pub max_len: usize,
    pub numeric_only: bool,
    #[serde(serialize_with = "pattern_source")]
    pub pattern: Option<Regex>,
    /// Last digit is a check digit over the preceding twelve
    pub luhn: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseCategory {
    pub code: &'static str,
    pub description: &'static str,
    pub min_age: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountryConfig {
    pub code: &'static str,
    pub name: &'static str,
    pub currency: &'static str,
    pub currency_symbol: &'static str,
    pub id_types: Vec<IdTypeRule>,
    pub languages: Vec<&'static str>,
    pub license_categories: Vec<LicenseCategory>,
    #[serde(serialize_with = "required_pattern_source")]
    pub postal_code_pattern: Regex,
    pub nationalities: Vec<&'static str>,
    /// Statuses from which an application may be submitted
    pub active_statuses: Vec<ApplicationStatus>,
}

impl CountryConfig {
    pub fn id_type(&self, code: &str) -> Option<&IdTypeRule> {
        self.id_types.iter().find(|t| t.code == code)
    }

    pub fn license_category(&self, code: &str) -> Option<&LicenseCategory> {
        self.license_categories.iter().find(|c| c.code == code)
    }

    pub fn license_min_age(&self, code: &str) -> Option<u32> {
        self.license_category(code).map(|c| c.min_age)
    }

    pub fn supports_language(&self, code: &str) -> bool {
        self.languages.contains(&code)
    }

    pub fn supports_nationality(&self, code: &str) -> bool {
        self.nationalities.contains(&code)
    }

    pub fn is_active_status(&self, status: ApplicationStatus) -> bool {
        self.active_statuses.contains(&status)
    }
}

#[derive(Debug, Clone)]
pub struct CountryRegistry {
    countries: BTreeMap<&'static str, Arc<CountryConfig>>,
}

impl CountryRegistry {
    pub fn builtin() -> Self {
        let countries = [south_africa(), kenya(), nigeria()]
            .into_iter()
            .map(|c| (c.code, Arc::new(c)))
            .collect();
        Self { countries }
    }

    pub fn get(&self, code: &CountryCode) -> Option<Arc<CountryConfig>> {
        self.countries.get(code.as_str()).cloned()
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.countries.keys().copied()
    }
}

/// RSA ID check digit: digits at odd positions of the first twelve are
/// doubled (minus 9 when above 9), and the thirteenth digit must bring the
/// sum to a multiple of ten.
pub fn luhn_check_digit_valid(value: &str) -> bool {
    let digits: Vec<u32> = match value.chars().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };
    if digits.len() != 13 {
        return false;
    }

    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    (10 - sum % 10) % 10 == digits[12]
}

fn pattern_source<S: Serializer>(pattern: &Option<Regex>, s: S) -> Result<S::Ok, S::Error> {
    match pattern {
        Some(re) => s.serialize_some(re.as_str()),
        None => s.serialize_none(),
    }
}

fn required_pattern_source<S: Serializer>(pattern: &Regex, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(pattern.as_str())
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern compiles")
}

fn id_type(
    code: &'static str,
    name: &'static str,
    min_len: usize,
    max_len: usize,
    numeric_only: bool,
) -> IdTypeRule {
    IdTypeRule {
        code,
        name,
        min_len,
        max_len,
        numeric_only,
        pattern: None,
        luhn: false,
    }
}

fn category(code: &'static str, description: &'static str, min_age: u32) -> LicenseCategory {
    LicenseCategory {
        code,
        description,
        min_age,
    }
}

fn south_africa() -> CountryConfig {
    CountryConfig {
        code: "ZA",
        name: "South Africa",
        currency: "ZAR",
        currency_symbol: "R",
        id_types: vec![
            IdTypeRule {
                luhn: true,
                ..id_type("RSA_ID", "RSA Identity Document", 13, 13, true)
            },
            id_type("RSA_PASSPORT", "RSA Passport", 9, 9, false),
            id_type("TEMPORARY_ID", "Temporary ID Certificate", 8, 13, false),
            id_type("ASYLUM_PERMIT", "Asylum Seeker Permit", 8, 15, false),
            id_type("FOREIGN_PASSPORT", "Foreign Passport", 6, 12, false),
        ],
        languages: vec!["EN", "AF", "ZU", "XH", "ST", "TN", "SS", "VE", "TS", "NR", "ND"],
        license_categories: vec![
            category("A", "Motorcycle", 16),
            category("A1", "Motorcycle up to 125cc", 16),
            category("B", "Light motor vehicle", 18),
            category("C", "Heavy motor vehicle over 16000kg", 21),
            category("C1", "Heavy motor vehicle 3500-16000kg", 18),
            category("EB", "Articulated light motor vehicle", 18),
            category("EC", "Articulated heavy motor vehicle", 21),
            category("EC1", "Heavy motor vehicle with trailer", 18),
        ],
        postal_code_pattern: re(r"^\d{4}$"),
        nationalities: vec!["ZA", "FOREIGN"],
        active_statuses: vec![ApplicationStatus::Draft, ApplicationStatus::Active],
    }
}

fn kenya() -> CountryConfig {
    CountryConfig {
        code: "KE",
        name: "Kenya",
        currency: "KES",
        currency_symbol: "KSh",
        id_types: vec![
            id_type("NATIONAL_ID", "National ID Card", 8, 8, true),
            id_type("PASSPORT", "Kenyan Passport", 9, 9, false),
            id_type("REFUGEE_ID", "Refugee ID", 8, 12, false),
            id_type("ALIEN_ID", "Alien ID", 8, 12, false),
            id_type("WORK_PERMIT", "Work Permit", 8, 15, false),
        ],
        languages: vec!["EN", "SW", "KI", "LU", "KA", "ME", "GU", "KU", "MA", "TU"],
        license_categories: vec![
            category("A", "Motorcycle", 16),
            category("B", "Light vehicle", 18),
            category("C", "Light truck", 21),
            category("D", "Public service vehicle", 21),
            category("E", "Heavy truck", 21),
            category("F", "Persons with disabilities", 18),
            category("G", "Industrial, construction and agricultural", 21),
            category("H", "Tricycle", 18),
            category("I", "Special purpose", 21),
            category("J", "Emergency vehicle", 21),
            category("K", "Articulated vehicle", 21),
        ],
        postal_code_pattern: re(r"^\d{5}$"),
        nationalities: vec!["KE", "FOREIGN"],
        active_statuses: vec![ApplicationStatus::Active],
    }
}

fn nigeria() -> CountryConfig {
    CountryConfig {
        code: "NG",
        name: "Nigeria",
        currency: "NGN",
        currency_symbol: "₦",
        id_types: vec![
            id_type("NATIONAL_ID", "National Identification Number", 11, 11, true),
            IdTypeRule {
                pattern: Some(re(r"^[A-Z0-9]{19}$")),
                ..id_type("VOTERS_CARD", "Permanent Voter's Card", 19, 19, false)
            },
            id_type("DRIVERS_LICENSE", "Driver's License", 10, 12, false),
            IdTypeRule {
                pattern: Some(re(r"^[A-Z]\d{8}$")),
                ..id_type("PASSPORT", "Nigerian Passport", 9, 9, false)
            },
            id_type("BVN", "Bank Verification Number", 11, 11, true),
        ],
        languages: vec!["EN", "HA", "IG", "YO", "FU", "IJ", "KA", "TI", "UR", "BI"],
        license_categories: vec![
            category("A", "Motorcycle", 17),
            category("B", "Light vehicle", 18),
            category("C", "Light truck", 21),
            category("D", "Heavy truck", 21),
            category("E", "Articulated vehicle", 21),
            category("F", "Agricultural machinery", 18),
        ],
        postal_code_pattern: re(r"^\d{6}$"),
        nationalities: vec!["NG", "FOREIGN"],
        active_statuses: vec![ApplicationStatus::Draft, ApplicationStatus::Active],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn za() -> CountryConfig {
        let registry = CountryRegistry::builtin();
        registry
            .get(&CountryCode::parse("ZA").unwrap())
            .unwrap()
            .as_ref()
            .clone()
    }

    #[test]
    fn test_builtin_countries() {
        let registry = CountryRegistry::builtin();
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec!["KE", "NG", "ZA"]);
        assert!(registry.get(&CountryCode::parse("US").unwrap()).is_none());
    }

    #[test]
    fn test_id_type_lookup() {
        let za = za();
        let rsa = za.id_type("RSA_ID").unwrap();
        assert_eq!((rsa.min_len, rsa.max_len), (13, 13));
        assert!(rsa.numeric_only && rsa.luhn);
        assert!(za.id_type("NATIONAL_ID").is_none());
    }

    #[test]
    fn test_license_min_age() {
        let za = za();
        assert_eq!(za.license_min_age("B"), Some(18));
        assert_eq!(za.license_min_age("EC"), Some(21));
        assert_eq!(za.license_min_age("K"), None);
    }

    #[test]
    fn test_active_statuses_differ_per_country() {
        let registry = CountryRegistry::builtin();
        let ke = registry.get(&CountryCode::parse("KE").unwrap()).unwrap();
        assert!(za().is_active_status(ApplicationStatus::Draft));
        assert!(!ke.is_active_status(ApplicationStatus::Draft));
        assert!(ke.is_active_status(ApplicationStatus::Active));
    }

    #[test]
    fn test_luhn_check_digit() {
        assert!(luhn_check_digit_valid("8001015009087"));
        assert!(!luhn_check_digit_valid("8001015009088"));
        assert!(!luhn_check_digit_valid("800101500908"));
        assert!(!luhn_check_digit_valid("80010150090A7"));
    }

    #[test]
    fn test_config_serializes_patterns_as_text() {
        let json = serde_json::to_value(za()).unwrap();
        assert_eq!(json["postal_code_pattern"], "^\\d{4}$");
        assert_eq!(json["currency_symbol"], "R");
        assert_eq!(json["active_statuses"][0], "DRAFT");
    }
}
