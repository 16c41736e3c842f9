//! One-shot subcommands: run the controller on the calling thread, perform
//! each effect inline, print the result and exit.

use std::time::Instant;

use skillforge_core::{
    AuthPhase, ClientStatus, ConversationService, Effect, IdentityService, Navigation,
    SessionController,
};
use tracing::info;

use crate::context::ClientContext;

/// Performs effects until none remain. Returns the last navigation made.
fn drive(
    controller: &mut SessionController,
    effects: Vec<Effect>,
    ctx: &ClientContext,
) -> Option<Navigation> {
    let mut last_navigation = None;
    let mut queue = effects;
    while !queue.is_empty() {
        let mut next = Vec::new();
        for effect in queue {
            let now = Instant::now();
            match effect {
                Effect::RestoreSession { ticket } => {
                    let result = ctx.api.restore(ticket.token());
                    next.extend(controller.session_restored(&ticket, result, now));
                }
                Effect::RefreshConversations { ticket, token } => {
                    let result = ctx.api.list(&token);
                    controller.conversations_refreshed(ticket, result, now);
                }
                Effect::Navigate { path } => {
                    last_navigation = Some(controller.navigate(&path));
                }
            }
        }
        queue = next;
    }
    last_navigation
}

fn restored(ctx: &ClientContext) -> SessionController {
    let mut controller = ctx.controller();
    let effects = controller.start(Instant::now());
    drive(&mut controller, effects, ctx);
    controller
}

pub fn login(ctx: &ClientContext, token: &str) -> Result<ClientStatus, String> {
    let token = token.trim();
    if token.is_empty() {
        return Err("Token must not be empty".to_string());
    }

    let mut controller = ctx.controller();
    let effects = controller.sign_in(token, Instant::now())?;
    drive(&mut controller, effects, ctx);

    let status = controller.status();
    controller.shutdown();
    if status.phase != AuthPhase::Authenticated {
        return Err("Sign-in failed: the server did not accept the token".to_string());
    }
    info!(
        username = status.user.as_ref().map(|user| user.username.as_str()).unwrap_or_default(),
        "Signed in"
    );
    Ok(status)
}

pub fn logout(ctx: &ClientContext) {
    let mut controller = ctx.controller();
    controller.logout(Instant::now());
    controller.shutdown();
}

pub fn status(ctx: &ClientContext) -> ClientStatus {
    let mut controller = restored(ctx);
    let status = controller.status();
    controller.shutdown();
    status
}

pub fn open(ctx: &ClientContext, path: &str) -> Navigation {
    let mut controller = restored(ctx);
    let navigation = controller.navigate(path);
    controller.shutdown();
    navigation
}
