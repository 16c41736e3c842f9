use skillforge_core::services::test_utils::{conversation, user, FakeConversations, FakeIdentity};
use skillforge_core::{
    AuthPhase, ClientConfig, ConversationService, Effect, FileKeyValueStore, GuardOutcome,
    IdentityService, KeyValueSlot, SessionController, StorageConfig, View,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_secs(15);

/// Performs effects synchronously against the fakes, the way the runtime does
/// on worker threads.
fn drive(
    controller: &mut SessionController,
    effects: Vec<Effect>,
    identity: &FakeIdentity,
    conversations: &FakeConversations,
    now: Instant,
) -> Vec<String> {
    let mut navigations = Vec::new();
    let mut queue = effects;
    while !queue.is_empty() {
        let mut next = Vec::new();
        for effect in queue {
            match effect {
                Effect::RestoreSession { ticket } => {
                    let result = identity.restore(ticket.token());
                    next.extend(controller.session_restored(&ticket, result, now));
                }
                Effect::RefreshConversations { ticket, token } => {
                    let result = conversations.list(&token);
                    controller.conversations_refreshed(ticket, result, now);
                }
                Effect::Navigate { path } => {
                    navigations.push(controller.navigate(&path).path);
                }
            }
        }
        queue = next;
    }
    navigations
}

fn open_store(storage: &StorageConfig) -> Arc<FileKeyValueStore> {
    Arc::new(FileKeyValueStore::open(&storage.local_storage_file()))
}

#[test]
fn sign_in_poll_notify_and_follow_deep_link() {
    let temp = tempfile::tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let identity = FakeIdentity::new().with_user("tok", user("u1", "ada"));
    let conversations = FakeConversations::new();
    conversations.push(Ok(vec![conversation("c1", 0, None), conversation("c2", 0, None)]));
    conversations.push(Ok(vec![
        conversation("c1", 0, None),
        conversation("c2", 2, Some("practice tonight?")),
    ]));

    let mut controller = SessionController::new(ClientConfig::default(), open_store(&storage));
    let start = Instant::now();
    let effects = controller.start(start);
    drive(&mut controller, effects, &identity, &conversations, start);
    assert_eq!(controller.session().phase(), AuthPhase::Anonymous);

    let effects = controller.sign_in("tok", start).unwrap();
    drive(&mut controller, effects, &identity, &conversations, start);
    assert_eq!(controller.session().phase(), AuthPhase::Authenticated);
    assert_eq!(conversations.calls(), 1);
    assert!(!controller.notification().is_open());

    let at = start + POLL;
    let effects = controller.tick(at);
    drive(&mut controller, effects, &identity, &conversations, at);

    let view = controller.notification().view().expect("notification view");
    assert!(view.open);
    assert_eq!(view.title, "friend-c2");
    assert_eq!(view.body, "practice tonight?");

    let effect = controller.click_notification().expect("deep link");
    let navigations = drive(&mut controller, vec![effect], &identity, &conversations, at);
    assert_eq!(navigations, vec!["/messages/c2".to_string()]);
    assert!(!controller.show_floating_chat());
}

#[test]
fn restart_restores_session_and_last_route() {
    let temp = tempfile::tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let identity = FakeIdentity::new().with_user("tok", user("u1", "ada"));
    let conversations = FakeConversations::new();
    let now = Instant::now();

    {
        let mut controller = SessionController::new(ClientConfig::default(), open_store(&storage));
        let effects = controller.sign_in("tok", now).unwrap();
        drive(&mut controller, effects, &identity, &conversations, now);
        assert!(controller.navigate("/achievements").recorded);
        assert_eq!(controller.navigate("/login").path, "/achievements");
        controller.shutdown();
    }

    let mut controller = SessionController::new(ClientConfig::default(), open_store(&storage));
    let effects = controller.start(now);
    assert!(matches!(effects.as_slice(), [Effect::RestoreSession { .. }]));

    // Before the restore resolves, guarded routes wait.
    assert_eq!(controller.navigate("/login").outcome, GuardOutcome::Placeholder);

    let navigations = drive(&mut controller, effects, &identity, &conversations, now);
    assert_eq!(navigations, vec!["/achievements".to_string()]);
    assert_eq!(controller.location(), Some("/achievements"));
}

#[test]
fn expired_token_on_restart_lands_on_login() {
    let temp = tempfile::tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let store = open_store(&storage);
    store.set("token", "stale").unwrap();

    let identity = FakeIdentity::new();
    let conversations = FakeConversations::new();
    let now = Instant::now();

    let mut controller = SessionController::new(ClientConfig::default(), store.clone());
    let effects = controller.start(now);
    drive(&mut controller, effects, &identity, &conversations, now);

    assert_eq!(store.get("token"), None);
    let navigation = controller.navigate("/profile");
    assert_eq!(navigation.view, Some(View::Login));
    assert_eq!(conversations.calls(), 0);
}

#[test]
fn logout_mid_poll_discards_late_response() {
    let temp = tempfile::tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().to_path_buf());
    let identity = FakeIdentity::new().with_user("tok", user("u1", "ada"));
    let conversations = FakeConversations::new();
    conversations.push(Ok(vec![conversation("c1", 0, None)]));
    let now = Instant::now();

    let mut controller = SessionController::new(ClientConfig::default(), open_store(&storage));
    let effects = controller.sign_in("tok", now).unwrap();
    drive(&mut controller, effects, &identity, &conversations, now);

    let in_flight = controller.tick(now + POLL);
    controller.logout(now + POLL);
    drive(&mut controller, in_flight, &identity, &conversations, now + POLL);

    assert!(controller.conversations().is_empty());
    assert!(!controller.notification().is_open());
    for step in 2..6 {
        assert!(controller.tick(now + POLL * step).is_empty());
    }
}
