//! Named business rules checked before a write is committed.
//!
//! A rule is a plain function over an immutable snapshot and the country
//! configuration. [`run`] evaluates a whole rule set and returns every
//! failure in rule order, so the caller can report all violations at once.

pub mod application;
pub mod person;
pub mod region;

use serde::Serialize;

use crate::country::CountryConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleFailure {
    pub rule_code: &'static str,
    pub field: &'static str,
    pub message: String,
}

impl RuleFailure {
    pub fn new(rule_code: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule_code,
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail(RuleFailure),
}

impl Outcome {
    pub fn fail(rule_code: &'static str, field: &'static str, message: impl Into<String>) -> Self {
        Outcome::Fail(RuleFailure::new(rule_code, field, message))
    }

    pub fn check(
        ok: bool,
        rule_code: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        if ok {
            Outcome::Pass
        } else {
            Outcome::fail(rule_code, field, message)
        }
    }
}

pub struct Rule<S> {
    pub code: &'static str,
    pub check: fn(&S, &CountryConfig) -> Outcome,
}

pub fn run<S>(rules: &[Rule<S>], snapshot: &S, country: &CountryConfig) -> Vec<RuleFailure> {
    rules
        .iter()
        .filter_map(|rule| match (rule.check)(snapshot, country) {
            Outcome::Pass => None,
            Outcome::Fail(failure) => Some(failure),
        })
        .collect()
}

pub fn codes(failures: &[RuleFailure]) -> Vec<&'static str> {
    failures.iter().map(|f| f.rule_code).collect()
}

/// Codes of a rule set, in evaluation order.
pub fn rule_codes<S>(rules: &[Rule<S>]) -> Vec<&'static str> {
    rules.iter().map(|r| r.code).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::CountryCode;
    use crate::country::CountryRegistry;

    struct Snapshot {
        a: bool,
        b: bool,
    }

    fn rule_a(s: &Snapshot, _: &CountryConfig) -> Outcome {
        Outcome::check(s.a, "T00001", "a", "a must hold")
    }

    fn rule_b(s: &Snapshot, _: &CountryConfig) -> Outcome {
        Outcome::check(s.b, "T00002", "b", "b must hold")
    }

    const RULES: &[Rule<Snapshot>] = &[
        Rule {
            code: "T00001",
            check: rule_a,
        },
        Rule {
            code: "T00002",
            check: rule_b,
        },
    ];

    #[test]
    fn test_run_collects_every_failure_in_order() {
        let registry = CountryRegistry::builtin();
        let za = registry.get(&CountryCode::parse("ZA").unwrap()).unwrap();

        let failures = run(RULES, &Snapshot { a: false, b: false }, &za);
        assert_eq!(codes(&failures), vec!["T00001", "T00002"]);

        assert!(run(RULES, &Snapshot { a: true, b: true }, &za).is_empty());
        assert_eq!(
            codes(&run(RULES, &Snapshot { a: true, b: false }, &za)),
            vec!["T00002"]
        );
    }

    #[test]
    fn test_rule_codes_follow_declaration_order() {
        assert_eq!(rule_codes(RULES), vec!["T00001", "T00002"]);
        assert_eq!(
            rule_codes(application::TRANSITION_RULES),
            vec!["V00489", "V00490", "V00491"]
        );
        assert_eq!(rule_codes(person::RULES).len(), 13);
        assert_eq!(
            rule_codes(region::OPERATING_RULES),
            vec!["V00489", "V00490", "V00491"]
        );
    }
}
