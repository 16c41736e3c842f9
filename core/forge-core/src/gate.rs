//! Conditional UI gate for the floating chat affordance.

use crate::routes::MESSAGES_ROUTE;

/// Show the floating chat button only to signed-in users outside the
/// messages section. Pure; callers re-evaluate on every render.
pub fn show_floating_chat(is_authenticated: bool, current_path: &str) -> bool {
    is_authenticated && !current_path.contains(MESSAGES_ROUTE)
}
