//! Remote collaborator interfaces.
//!
//! The identity and conversation APIs are external; the core only depends on
//! these traits. Implementors should:
//! - Map a rejected token to `ServiceError::Unauthorized`
//! - Never panic; report every failure as a `ServiceError`
//! - Be callable from worker threads (`Send + Sync`)

use skillforge_protocol::{Conversation, UserRef};

use crate::error::ServiceError;

/// Validates a credential token and returns the user it belongs to.
pub trait IdentityService: Send + Sync {
    fn restore(&self, token: &str) -> Result<UserRef, ServiceError>;
}

/// Lists the current user's conversations.
pub trait ConversationService: Send + Sync {
    fn list(&self, token: &str) -> Result<Vec<Conversation>, ServiceError>;
}

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils {
    //! Scripted fakes for the service traits.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Identity fake: known tokens map to users, everything else is unauthorized.
    #[derive(Default)]
    pub struct FakeIdentity {
        users: Mutex<HashMap<String, UserRef>>,
        failure: Mutex<Option<ServiceError>>,
        calls: AtomicUsize,
    }

    impl FakeIdentity {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_user(self, token: &str, user: UserRef) -> Self {
            self.users.lock().unwrap().insert(token.to_string(), user);
            self
        }

        /// Every call fails with `error` until cleared.
        pub fn fail_with(&self, error: Option<ServiceError>) {
            *self.failure.lock().unwrap() = error;
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IdentityService for FakeIdentity {
        fn restore(&self, token: &str) -> Result<UserRef, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failure.lock().unwrap().clone() {
                return Err(error);
            }
            self.users
                .lock()
                .unwrap()
                .get(token)
                .cloned()
                .ok_or_else(|| ServiceError::Unauthorized("Token is not valid".to_string()))
        }
    }

    /// Conversation fake: serves queued responses in order, then repeats the
    /// last successful snapshot.
    #[derive(Default)]
    pub struct FakeConversations {
        responses: Mutex<VecDeque<Result<Vec<Conversation>, ServiceError>>>,
        last: Mutex<Vec<Conversation>>,
        calls: AtomicUsize,
    }

    impl FakeConversations {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, response: Result<Vec<Conversation>, ServiceError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ConversationService for FakeConversations {
        fn list(&self, _token: &str) -> Result<Vec<Conversation>, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop_front() {
                Some(Ok(conversations)) => {
                    *self.last.lock().unwrap() = conversations.clone();
                    Ok(conversations)
                }
                Some(Err(error)) => Err(error),
                None => Ok(self.last.lock().unwrap().clone()),
            }
        }
    }

    pub fn user(id: &str, username: &str) -> UserRef {
        UserRef {
            id: id.to_string(),
            username: username.to_string(),
            avatar: None,
        }
    }

    /// Conversation with `unread` unread messages and an optional text preview.
    pub fn conversation(id: &str, unread: u32, content: Option<&str>) -> Conversation {
        Conversation {
            id: id.to_string(),
            user: user(&format!("user-{id}"), &format!("friend-{id}")),
            last_message: content.map(|text| skillforge_protocol::LastMessage {
                content: Some(text.to_string()),
                media_url: None,
                created_at: None,
            }),
            unread_count: unread,
        }
    }
}
