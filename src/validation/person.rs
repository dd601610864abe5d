use chrono::NaiveDate;
use serde::Deserialize;

use crate::codes::is_valid_email;
use crate::country::{luhn_check_digit_valid, CountryConfig, IdTypeRule};
use crate::status::Gender;
use crate::validation::{Outcome, Rule};

/// Person fields as submitted, before any of them are trusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonSnapshot {
    pub id_type: Option<String>,
    pub id_number: Option<String>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub language_preference: Option<String>,
    pub email: Option<String>,
    pub postal_code: Option<String>,
    #[serde(skip, default = "today")]
    pub as_of: NaiveDate,
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

pub const RULES: &[Rule<PersonSnapshot>] = &[
    Rule {
        code: "V00001",
        check: id_type_valid,
    },
    Rule {
        code: "V00013",
        check: id_number_present,
    },
    Rule {
        code: "V00017",
        check: id_number_format,
    },
    Rule {
        code: "V00018",
        check: id_number_length,
    },
    Rule {
        code: "V00019",
        check: id_number_check_digit,
    },
    Rule {
        code: "V00002",
        check: surname_present,
    },
    Rule {
        code: "V00056",
        check: first_name_present,
    },
    Rule {
        code: "V00004",
        check: gender_valid,
    },
    Rule {
        code: "V00007",
        check: nationality_valid,
    },
    Rule {
        code: "V00008",
        check: email_valid,
    },
    Rule {
        code: "V00067",
        check: birth_date_not_future,
    },
    Rule {
        code: "V00068",
        check: language_supported,
    },
    Rule {
        code: "V00069",
        check: postal_code_valid,
    },
];

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// ID type and number, only when both are usable. The format, length and
/// check-digit rules stay silent otherwise so V00001/V00013 report alone.
fn identity<'a>(s: &'a PersonSnapshot, c: &'a CountryConfig) -> Option<(&'a IdTypeRule, &'a str)> {
    let rule = c.id_type(non_blank(&s.id_type)?)?;
    let number = non_blank(&s.id_number)?;
    Some((rule, number))
}

fn id_type_valid(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    match non_blank(&s.id_type) {
        None => Outcome::fail("V00001", "id_type", "Identification type is mandatory"),
        Some(t) => Outcome::check(
            c.id_type(t).is_some(),
            "V00001",
            "id_type",
            format!("Identification type {t} is not valid for {}", c.code),
        ),
    }
}

fn id_number_present(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        non_blank(&s.id_number).is_some(),
        "V00013",
        "id_number",
        "Identification number is mandatory",
    )
}

fn id_number_format(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    let Some((rule, number)) = identity(s, c) else {
        return Outcome::Pass;
    };
    if rule.numeric_only && !number.chars().all(|ch| ch.is_ascii_digit()) {
        return Outcome::fail(
            "V00017",
            "id_number",
            format!("{} must be numeric", rule.name),
        );
    }
    match &rule.pattern {
        Some(re) if !re.is_match(number) => Outcome::fail(
            "V00017",
            "id_number",
            format!("{} does not match the required format", rule.name),
        ),
        _ => Outcome::Pass,
    }
}

fn id_number_length(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    let Some((rule, number)) = identity(s, c) else {
        return Outcome::Pass;
    };
    let len = number.chars().count();
    let message = if rule.min_len == rule.max_len {
        format!("{} must be {} characters", rule.name, rule.min_len)
    } else {
        format!(
            "{} must be between {} and {} characters",
            rule.name, rule.min_len, rule.max_len
        )
    };
    Outcome::check(
        (rule.min_len..=rule.max_len).contains(&len),
        "V00018",
        "id_number",
        message,
    )
}

fn id_number_check_digit(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    let Some((rule, number)) = identity(s, c) else {
        return Outcome::Pass;
    };
    let well_formed = number.len() == rule.max_len && number.chars().all(|ch| ch.is_ascii_digit());
    if !rule.luhn || !well_formed {
        return Outcome::Pass;
    }
    Outcome::check(
        luhn_check_digit_valid(number),
        "V00019",
        "id_number",
        format!("{} check digit is invalid", rule.name),
    )
}

fn surname_present(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        non_blank(&s.surname).is_some(),
        "V00002",
        "surname",
        "Surname is mandatory",
    )
}

fn first_name_present(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        non_blank(&s.first_name).is_some(),
        "V00056",
        "first_name",
        "First name is mandatory",
    )
}

fn gender_valid(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    let ok = non_blank(&s.gender)
        .map(|g| g.parse::<Gender>().is_ok())
        .unwrap_or(false);
    Outcome::check(ok, "V00004", "gender", "Gender must be 01 (male) or 02 (female)")
}

fn nationality_valid(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    match non_blank(&s.nationality) {
        Some(n) => Outcome::check(
            c.supports_nationality(n),
            "V00007",
            "nationality",
            format!("Nationality {n} is not valid for {}", c.code),
        ),
        None => Outcome::Pass,
    }
}

fn email_valid(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    match non_blank(&s.email) {
        Some(e) => Outcome::check(
            is_valid_email(e),
            "V00008",
            "email",
            "Email address is not valid",
        ),
        None => Outcome::Pass,
    }
}

fn birth_date_not_future(s: &PersonSnapshot, _: &CountryConfig) -> Outcome {
    match s.date_of_birth {
        Some(dob) => Outcome::check(
            dob <= s.as_of,
            "V00067",
            "date_of_birth",
            "Birth date cannot be in the future",
        ),
        None => Outcome::Pass,
    }
}

fn language_supported(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    match non_blank(&s.language_preference) {
        Some(l) => Outcome::check(
            c.supports_language(l),
            "V00068",
            "language_preference",
            format!("Language {l} is not supported in {}", c.code),
        ),
        None => Outcome::Pass,
    }
}

fn postal_code_valid(s: &PersonSnapshot, c: &CountryConfig) -> Outcome {
    match non_blank(&s.postal_code) {
        Some(p) => Outcome::check(
            c.postal_code_pattern.is_match(p),
            "V00069",
            "postal_code",
            format!("Postal code {p} is not valid for {}", c.code),
        ),
        None => Outcome::Pass,
    }
}
