use crate::country::CountryConfig;
use crate::status::RegistrationStatus;
use crate::validation::{Outcome, Rule};

/// Registration facts of a region at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSnapshot {
    pub registration_status: RegistrationStatus,
    /// Unix seconds; a suspension in force until then
    pub suspended_until: Option<i64>,
    pub now: i64,
}

/// Whether a region may operate (capture tests, issue documents).
pub const OPERATING_RULES: &[Rule<RegionSnapshot>] = &[
    Rule {
        code: "V00489",
        check: registered,
    },
    Rule {
        code: "V00490",
        check: not_cancelled,
    },
    Rule {
        code: "V00491",
        check: not_suspended,
    },
];

fn registered(s: &RegionSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        !s.registration_status.is_unregistered(),
        "V00489",
        "registration_status",
        format!(
            "Region is not registered to operate (registration status {})",
            s.registration_status
        ),
    )
}

fn not_cancelled(s: &RegionSnapshot, _: &CountryConfig) -> Outcome {
    Outcome::check(
        s.registration_status != RegistrationStatus::Cancelled,
        "V00490",
        "registration_status",
        "Region registration has been cancelled",
    )
}

fn not_suspended(s: &RegionSnapshot, _: &CountryConfig) -> Outcome {
    let suspended = s.registration_status == RegistrationStatus::Suspended
        || s.suspended_until.is_some_and(|until| until >= s.now);
    Outcome::check(
        !suspended,
        "V00491",
        "suspended_until",
        "Region is suspended",
    )
}
