use chrono::{Datelike, NaiveDate};

use crate::country::CountryConfig;
use crate::status::ApplicationStatus;
use crate::validation::{Outcome, Rule};

/// Facts about the applicant that the creation rules need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicant {
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationSnapshot {
    /// `None` when the person does not exist or has been deleted
    pub applicant: Option<Applicant>,
    pub license_category: String,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionSnapshot {
    pub current: ApplicationStatus,
    pub requested: ApplicationStatus,
}

pub const CREATE_RULES: &[Rule<ApplicationSnapshot>] = &[
    Rule {
        code: "V00014",
        check: person_exists,
    },
    Rule {
        code: "V00065",
        check: birth_date_known,
    },
    Rule {
        code: "V00874",
        check: minimum_age,
    },
];

pub const TRANSITION_RULES: &[Rule<TransitionSnapshot>] = &[
    Rule {
        code: "V00489",
        check: submission_from_active_status,
    },
    Rule {
        code: "V00490",
        check: issued_cannot_be_cancelled,
    },
    Rule {
        code: "V00491",
        check: suspension_requires_valid,
    },
];

/// Whole years between `dob` and `on`.
pub fn age_on(dob: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - dob.year();
    if (on.month(), on.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

fn person_exists(s: &ApplicationSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        s.applicant.is_some(),
        "V00014",
        "person_id",
        "Person must exist before a licence application can be captured",
    )
}

fn birth_date_known(s: &ApplicationSnapshot, _: &CountryConfig) -> Outcome {
    match &s.applicant {
        Some(a) => Outcome::check(
            a.date_of_birth.is_some(),
            "V00065",
            "date_of_birth",
            "Date of birth is required for the age check",
        ),
        None => Outcome::Pass,
    }
}

fn minimum_age(s: &ApplicationSnapshot, c: &CountryConfig) -> Outcome {
    let (Some(dob), Some(min_age)) = (
        s.applicant.as_ref().and_then(|a| a.date_of_birth),
        c.license_min_age(&s.license_category),
    ) else {
        return Outcome::Pass;
    };
    let age = age_on(dob, s.as_of);
    Outcome::check(
        age >= min_age as i32,
        "V00874",
        "license_category",
        format!(
            "Applicant is {age}; category {} requires a minimum age of {min_age}",
            s.license_category
        ),
    )
}

fn submission_from_active_status(s: &TransitionSnapshot, c: &CountryConfig) -> Outcome {
    if s.requested != ApplicationStatus::Submitted || c.is_active_status(s.current) {
        return Outcome::Pass;
    }
    Outcome::fail(
        "V00489",
        "status",
        format!(
            "Application in status {} cannot be submitted in {}",
            s.current, c.code
        ),
    )
}

fn issued_cannot_be_cancelled(s: &TransitionSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        !(s.current == ApplicationStatus::Issued && s.requested == ApplicationStatus::Cancelled),
        "V00490",
        "status",
        "An issued record cannot be cancelled",
    )
}

fn suspension_requires_valid(s: &TransitionSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        s.requested != ApplicationStatus::Suspended || s.current == ApplicationStatus::Valid,
        "V00491",
        "status",
        format!("Only a valid record can be suspended, current status is {}", s.current),
    )
}
