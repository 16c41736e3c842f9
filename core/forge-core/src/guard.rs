//! Route Guard: decides what to render for a route given the auth phase.
//!
//! | Access     | Loading     | Authenticated           | Anonymous        |
//! |------------|-------------|-------------------------|------------------|
//! | Public     | Render      | Render                  | Render           |
//! | Protected  | Placeholder | Render                  | Redirect /login  |
//! | PublicOnly | Placeholder | Redirect last/fallback  | Render           |
//!
//! Loading always yields a placeholder for guarded routes so nothing flashes
//! and no redirect fires before the session restore resolves.

use serde::Serialize;

use crate::route_memory::RouteMemory;
use crate::routes::{RouteAccess, LOGIN_ROUTE};
use crate::session::AuthPhase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "to", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Neutral loading indicator.
    Placeholder,
    Render,
    Redirect(String),
}

pub fn protected(phase: AuthPhase) -> GuardOutcome {
    match phase {
        AuthPhase::Loading => GuardOutcome::Placeholder,
        AuthPhase::Authenticated => GuardOutcome::Render,
        AuthPhase::Anonymous => GuardOutcome::Redirect(LOGIN_ROUTE.to_string()),
    }
}

pub fn public_only(phase: AuthPhase, memory: &RouteMemory, fallback: &str) -> GuardOutcome {
    match phase {
        AuthPhase::Loading => GuardOutcome::Placeholder,
        AuthPhase::Authenticated => GuardOutcome::Redirect(memory.get_or(fallback)),
        AuthPhase::Anonymous => GuardOutcome::Render,
    }
}

pub fn evaluate(
    access: RouteAccess,
    phase: AuthPhase,
    memory: &RouteMemory,
    fallback: &str,
) -> GuardOutcome {
    match access {
        RouteAccess::Public => GuardOutcome::Render,
        RouteAccess::Protected => protected(phase),
        RouteAccess::PublicOnly => public_only(phase, memory, fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;
    use crate::routes::DEFAULT_LANDING_ROUTE;
    use std::sync::Arc;

    fn memory() -> RouteMemory {
        RouteMemory::new(Arc::new(MemoryKeyValueStore::new()))
    }

    #[test]
    fn protected_waits_while_loading() {
        assert_eq!(protected(AuthPhase::Loading), GuardOutcome::Placeholder);
    }

    #[test]
    fn protected_renders_for_authenticated() {
        assert_eq!(protected(AuthPhase::Authenticated), GuardOutcome::Render);
    }

    #[test]
    fn protected_redirects_anonymous_to_login() {
        assert_eq!(
            protected(AuthPhase::Anonymous),
            GuardOutcome::Redirect("/login".to_string())
        );
    }

    #[test]
    fn public_only_waits_while_loading() {
        let memory = memory();
        memory.set("/friends").unwrap();
        assert_eq!(
            public_only(AuthPhase::Loading, &memory, DEFAULT_LANDING_ROUTE),
            GuardOutcome::Placeholder
        );
    }

    #[test]
    fn public_only_redirects_to_remembered_route() {
        let memory = memory();
        memory.set("/friends").unwrap();
        assert_eq!(
            public_only(AuthPhase::Authenticated, &memory, DEFAULT_LANDING_ROUTE),
            GuardOutcome::Redirect("/friends".to_string())
        );
    }

    #[test]
    fn public_only_falls_back_to_landing_route() {
        assert_eq!(
            public_only(AuthPhase::Authenticated, &memory(), DEFAULT_LANDING_ROUTE),
            GuardOutcome::Redirect("/dashboard".to_string())
        );
    }

    #[test]
    fn public_only_renders_for_anonymous() {
        assert_eq!(
            public_only(AuthPhase::Anonymous, &memory(), DEFAULT_LANDING_ROUTE),
            GuardOutcome::Render
        );
    }

    #[test]
    fn public_routes_always_render() {
        for phase in [AuthPhase::Loading, AuthPhase::Authenticated, AuthPhase::Anonymous] {
            assert_eq!(
                evaluate(RouteAccess::Public, phase, &memory(), DEFAULT_LANDING_ROUTE),
                GuardOutcome::Render
            );
        }
    }
}
