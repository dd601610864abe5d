use crate::authz::types::{
    Action, ActorContext, AuthorityLevel, Decision, HelpdeskFlags, ProvinceScope, Scope,
    TargetResource,
};
use crate::codes::ProvinceCode;

/// Decide whether `actor` may perform `action` on `target`.
///
/// The actor's effective scope is computed first, one resolver per authority
/// level; the target is allowed iff it falls inside that scope. Anything not
/// explicitly allowed is denied.
///
/// Helpdesk flags only widen [`Action::Read`]: a national-helpdesk actor gets
/// an UNRESTRICTED read regardless of level or province, but writes are
/// decided by the authority level alone.
pub fn authorize(actor: &ActorContext, target: &TargetResource, action: Action) -> Decision {
    match effective_scope(actor, action) {
        Some(scope) if scope_contains(&scope, target) => Decision::allow(scope),
        _ => Decision::deny(),
    }
}

/// The filter to apply to list queries. `None` means the actor can see
/// nothing at all.
pub fn effective_scope(actor: &ActorContext, action: Action) -> Option<Scope> {
    let by_level = match actor.authority_level {
        AuthorityLevel::National => resolve_national(actor),
        AuthorityLevel::Provincial => resolve_provincial(actor),
        AuthorityLevel::Local => resolve_local(actor),
        AuthorityLevel::Office => resolve_office(actor),
    };

    match action {
        // Helpdesk flags grant visibility, never write authority
        Action::Write => by_level,
        Action::Read => broader(by_level, resolve_helpdesk(actor)),
    }
}

pub fn scope_contains(scope: &Scope, target: &TargetResource) -> bool {
    match scope {
        Scope::Unrestricted => true,
        Scope::Province(code) => matches!(&target.province, ProvinceScope::Code(p) if p == code),
        Scope::OwnGroup(group_id) => target.owning_user_group_id == Some(*group_id),
    }
}

/// Whether `actor` may create a user group at `level` in `province`.
/// Nobody can create a group broader than their own, provincial actors stay
/// inside their province, and own-group actors cannot create groups at all.
pub fn can_create_group(
    actor: &ActorContext,
    level: AuthorityLevel,
    province: Option<&ProvinceCode>,
) -> bool {
    if level.rank() > actor.authority_level.rank() {
        return false;
    }
    match actor.authority_level {
        AuthorityLevel::National => true,
        AuthorityLevel::Provincial => match (&actor.province_code, province) {
            (Some(own), Some(requested)) => own == requested,
            _ => false,
        },
        AuthorityLevel::Local | AuthorityLevel::Office => false,
    }
}

/// Whether `actor` may set `flags` on a group. A flag may never grant a read
/// scope broader than the actor's own level already has.
pub fn can_grant_helpdesk(actor: &ActorContext, flags: HelpdeskFlags) -> bool {
    let needs = if flags.national {
        AuthorityLevel::National
    } else if flags.provincial {
        AuthorityLevel::Provincial
    } else {
        return true;
    };
    actor.authority_level.rank() >= needs.rank()
}

fn resolve_national(_actor: &ActorContext) -> Option<Scope> {
    Some(Scope::Unrestricted)
}

fn resolve_provincial(actor: &ActorContext) -> Option<Scope> {
    actor.province_code.clone().map(Scope::Province)
}

fn resolve_local(actor: &ActorContext) -> Option<Scope> {
    actor.user_group_id.map(Scope::OwnGroup)
}

fn resolve_office(actor: &ActorContext) -> Option<Scope> {
    actor.user_group_id.map(Scope::OwnGroup)
}

fn resolve_helpdesk(actor: &ActorContext) -> Option<Scope> {
    if actor.flags.national {
        Some(Scope::Unrestricted)
    } else if actor.flags.provincial {
        actor.province_code.clone().map(Scope::Province)
    } else {
        None
    }
}

fn breadth(scope: &Scope) -> u8 {
    match scope {
        Scope::Unrestricted => 2,
        Scope::Province(_) => 1,
        Scope::OwnGroup(_) => 0,
    }
}

/// Flag wins ties: the more permissive of the two scopes is used.
fn broader(a: Option<Scope>, b: Option<Scope>) -> Option<Scope> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if breadth(&b) >= breadth(&a) { b } else { a }),
        (a, None) => a,
        (None, b) => b,
    }
}
