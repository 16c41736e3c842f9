//! # skillforge-core
//!
//! Client-side session controller for SkillForge: restores the signed-in
//! session, polls conversations, raises new-message notifications and guards
//! navigation by authentication state.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Timers take an explicit `Instant`.
//! - **Single writer**: [`SessionController`] owns all state; [`runtime`] drives it
//!   from one thread and runs service calls on workers.
//! - **Graceful degradation**: Missing or corrupt local files yield defaults, and
//!   failed refreshes keep the previous snapshot.
//! - **Three-valued auth**: `Loading` is never treated as signed out.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use skillforge_core::{ClientConfig, FileKeyValueStore, SessionController, StorageConfig};
//!
//! let storage = StorageConfig::resolve()?;
//! let kv = Arc::new(FileKeyValueStore::open(&storage.local_storage_file()));
//! let mut controller = SessionController::new(ClientConfig::default(), kv);
//! let effects = controller.start(Instant::now());
//! ```

pub mod config;
pub mod controller;
pub mod conversations;
pub mod detector;
pub mod error;
pub mod gate;
pub mod guard;
pub mod kv;
pub mod notification;
pub mod route_memory;
pub mod routes;
pub mod runtime;
pub mod scheduler;
pub mod services;
pub mod session;
pub mod storage;

// Re-export commonly used items at crate root
pub use config::{load_client_config, ClientConfig};
pub use controller::{ClientStatus, Effect, Navigation, SessionController};
pub use conversations::{CommitOutcome, ConversationStore, RefreshTicket};
pub use detector::{detect_new_message, ChangeDetector};
pub use error::{ForgeError, Result, ServiceError};
pub use gate::show_floating_chat;
pub use guard::GuardOutcome;
pub use kv::{FileKeyValueStore, KeyValueSlot, MemoryKeyValueStore};
pub use notification::{NotificationMessage, NotificationSlot, NotificationState, NotificationView};
pub use route_memory::RouteMemory;
pub use routes::{RouteAccess, RouteTable, View};
pub use runtime::{ClientUpdate, RuntimeCommand, RuntimeCommander, RuntimeHandle, Services};
pub use scheduler::{PollScheduler, PollState, PollTransition};
pub use services::{ConversationService, IdentityService};
pub use session::{AuthPhase, RestoreStep, RestoreTicket, Session, SessionStore};
pub use storage::StorageConfig;
