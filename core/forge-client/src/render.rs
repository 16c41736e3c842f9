//! Terminal output: one line of text per item, or JSON with `--json`.

use serde::Serialize;
use skillforge_core::{AuthPhase, ClientStatus, ClientUpdate, GuardOutcome, Navigation};

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    json: bool,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn status(&self, status: &ClientStatus) {
        self.emit(status, || format_status(status));
    }

    pub fn navigation(&self, navigation: &Navigation) {
        self.emit(navigation, || format_navigation(navigation));
    }

    pub fn update(&self, update: &ClientUpdate) {
        self.emit(update, || format_update(update));
    }

    pub fn message(&self, text: &str) {
        self.emit(&serde_json::json!({ "message": text }), || text.to_string());
    }

    fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) {
        if self.json {
            match serde_json::to_string(value) {
                Ok(line) => println!("{}", line),
                Err(err) => tracing::warn!(error = %err, "Failed to serialize output"),
            }
        } else {
            println!("{}", text());
        }
    }
}

fn phase_label(phase: AuthPhase) -> &'static str {
    match phase {
        AuthPhase::Loading => "loading",
        AuthPhase::Authenticated => "signed in",
        AuthPhase::Anonymous => "signed out",
    }
}

pub fn format_status(status: &ClientStatus) -> String {
    let mut line = match &status.user {
        Some(user) => format!("{} as {}", phase_label(status.phase), user.username),
        None => phase_label(status.phase).to_string(),
    };
    if status.phase == AuthPhase::Authenticated {
        line.push_str(&format!(
            " | {} conversations, {} unread",
            status.conversations, status.unread_total
        ));
    }
    if let Some(route) = &status.last_route {
        line.push_str(&format!(" | last route {}", route));
    }
    line
}

pub fn format_navigation(navigation: &Navigation) -> String {
    let landing = match &navigation.outcome {
        GuardOutcome::Placeholder => format!("{} (waiting for session)", navigation.path),
        GuardOutcome::Render => navigation.path.clone(),
        GuardOutcome::Redirect(target) => format!("{} (redirect loop at {})", navigation.path, target),
    };
    if navigation.redirects.is_empty() {
        format!("-> {}", landing)
    } else {
        format!("{} -> {}", navigation.requested, landing)
    }
}

pub fn format_update(update: &ClientUpdate) -> String {
    match update {
        ClientUpdate::Session(session) => match &session.user {
            Some(user) => format!("session: {} as {}", phase_label(session.phase()), user.username),
            None => format!("session: {}", phase_label(session.phase())),
        },
        ClientUpdate::NotificationOpened(view) => {
            let link = view.link.as_deref().unwrap_or("-");
            format!("new message from {}: {} [{}]", view.title, view.body, link)
        }
        ClientUpdate::NotificationClosed => "notification closed".to_string(),
        ClientUpdate::Navigated(navigation) => format_navigation(navigation),
        ClientUpdate::Status(status) => format_status(status),
        ClientUpdate::CommandFailed(reason) => format!("error: {}", reason),
        ClientUpdate::Stopped => "stopped".to_string(),
    }
}
