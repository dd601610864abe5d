//! Authority resolution: who may see or change which records.
//!
//! The engine is pure. Callers build an [`types::ActorContext`] from the
//! authenticated user and a [`types::TargetResource`] from the record's owning
//! group, then apply the returned [`types::Scope`] as a query predicate.

pub mod engine;
pub mod types;
pub mod web;

pub use engine::{authorize, can_create_group, can_grant_helpdesk, effective_scope, scope_contains};
pub use types::{
    Action, ActorContext, AuthorityLevel, Decision, HelpdeskFlags, ProvinceScope, Scope,
    TargetResource,
};
