use skillforge_core::runtime::{self, ClientUpdate, RuntimeCommand, Services};
use skillforge_core::services::test_utils::{conversation, user, FakeConversations, FakeIdentity};
use skillforge_core::{AuthPhase, ClientConfig, MemoryKeyValueStore, SessionController};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn fast_config() -> ClientConfig {
    ClientConfig {
        poll_interval_ms: 20,
        notification_auto_hide_ms: 60_000,
        ..ClientConfig::default()
    }
}

fn wait_for(
    updates: &Receiver<ClientUpdate>,
    mut predicate: impl FnMut(&ClientUpdate) -> bool,
) -> Option<ClientUpdate> {
    let deadline = Instant::now() + WAIT;
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match updates.recv_timeout(remaining) {
            Ok(update) if predicate(&update) => return Some(update),
            Ok(_) => continue,
            Err(_) => return None,
        }
    }
    None
}

fn is_phase(update: &ClientUpdate, phase: AuthPhase) -> bool {
    matches!(update, ClientUpdate::Session(session) if session.phase() == phase)
}

struct Harness {
    identity: Arc<FakeIdentity>,
    conversations: Arc<FakeConversations>,
}

impl Harness {
    fn new() -> Self {
        Self {
            identity: Arc::new(FakeIdentity::new().with_user("tok", user("u1", "ada"))),
            conversations: Arc::new(FakeConversations::new()),
        }
    }

    fn spawn(
        &self,
        token: Option<&str>,
    ) -> (runtime::RuntimeHandle, Receiver<ClientUpdate>) {
        let kv = Arc::new(match token {
            Some(token) => MemoryKeyValueStore::with_entries([("token", token)]),
            None => MemoryKeyValueStore::new(),
        });
        let controller = SessionController::new(fast_config(), kv);
        let services = Services {
            identity: self.identity.clone(),
            conversations: self.conversations.clone(),
        };
        runtime::spawn(controller, services).expect("spawn runtime")
    }
}

#[test]
fn restores_session_and_surfaces_new_message() {
    let harness = Harness::new();
    harness
        .conversations
        .push(Ok(vec![conversation("c1", 0, None)]));
    harness
        .conversations
        .push(Ok(vec![conversation("c1", 1, Some("ready for practice?"))]));

    let (handle, updates) = harness.spawn(Some("tok"));

    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Authenticated)).is_some());
    let opened = wait_for(&updates, |u| matches!(u, ClientUpdate::NotificationOpened(_)));
    match opened {
        Some(ClientUpdate::NotificationOpened(view)) => {
            assert_eq!(view.body, "ready for practice?");
            assert_eq!(view.link.as_deref(), Some("/messages/c1"));
        }
        other => panic!("expected notification, got {other:?}"),
    }

    assert!(handle.send(RuntimeCommand::ClickNotification));
    let navigated = wait_for(&updates, |u| matches!(u, ClientUpdate::Navigated(_)));
    match navigated {
        Some(ClientUpdate::Navigated(navigation)) => assert_eq!(navigation.path, "/messages/c1"),
        other => panic!("expected navigation, got {other:?}"),
    }
    assert!(wait_for(&updates, |u| *u == ClientUpdate::NotificationClosed).is_some());

    handle.shutdown();
    handle.join().expect("join");
}

#[test]
fn anonymous_start_never_polls() {
    let harness = Harness::new();
    let (handle, updates) = harness.spawn(None);

    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Anonymous)).is_some());
    thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.conversations.calls(), 0);
    assert_eq!(harness.identity.calls(), 0);

    handle.shutdown();
    handle.join().expect("join");
}

#[test]
fn logout_stops_polling() {
    let harness = Harness::new();
    let (handle, updates) = harness.spawn(Some("tok"));
    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Authenticated)).is_some());

    handle.send(RuntimeCommand::Logout);
    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Anonymous)).is_some());

    // Let any request already in flight finish.
    thread::sleep(Duration::from_millis(50));
    let calls = harness.conversations.calls();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(harness.conversations.calls(), calls);

    handle.shutdown();
    let controller = handle.join().expect("join");
    assert!(!controller.is_polling());
}

#[test]
fn no_refresh_after_shutdown() {
    let harness = Harness::new();
    let (handle, updates) = harness.spawn(Some("tok"));
    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Authenticated)).is_some());

    handle.shutdown();
    assert!(wait_for(&updates, |u| *u == ClientUpdate::Stopped).is_some());
    let controller = handle.join().expect("join");
    assert!(controller.is_shut_down());

    thread::sleep(Duration::from_millis(50));
    let calls = harness.conversations.calls();
    thread::sleep(Duration::from_millis(150));
    assert_eq!(harness.conversations.calls(), calls);
}

#[test]
fn sign_in_command_authenticates() {
    let harness = Harness::new();
    let (handle, updates) = harness.spawn(None);
    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Anonymous)).is_some());

    handle.send(RuntimeCommand::SignIn("tok".to_string()));
    assert!(wait_for(&updates, |u| is_phase(u, AuthPhase::Authenticated)).is_some());

    handle.send(RuntimeCommand::Status);
    match wait_for(&updates, |u| matches!(u, ClientUpdate::Status(_))) {
        Some(ClientUpdate::Status(status)) => {
            assert_eq!(status.phase, AuthPhase::Authenticated);
            assert!(status.polling);
        }
        other => panic!("expected status, got {other:?}"),
    }

    handle.shutdown();
    handle.join().expect("join");
}
