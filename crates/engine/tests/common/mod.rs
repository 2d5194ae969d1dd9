//! Common test utilities for engine integration tests.
//!
//! Builds the coordination services against the in-memory store and the
//! mock notification dispatcher.

// Allow dead code in this module - these are helper utilities that may not
// be used by all integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;

use domain::services::MockNotifier;
use flock_engine::config::EngineConfig;
use flock_engine::{CommandService, FindRequestService, MembershipManager};
use store::{InMemoryStore, RemoteStore};

/// All coordination services wired to one shared in-memory store.
pub struct TestEngine {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<MockNotifier>,
    pub membership: MembershipManager,
    pub commands: CommandService,
    pub find_requests: FindRequestService,
}

/// Builds an engine with default configuration.
pub fn build_engine() -> TestEngine {
    build_engine_with(EngineConfig::default())
}

/// Builds an engine with the given configuration.
pub fn build_engine_with(config: EngineConfig) -> TestEngine {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(MockNotifier::new());

    let store_dyn: Arc<dyn RemoteStore> = store.clone();
    let notifier_dyn: Arc<dyn domain::services::Notifier> = notifier.clone();

    TestEngine {
        membership: MembershipManager::new(Arc::clone(&store_dyn), config.invites.clone()),
        commands: CommandService::new(
            Arc::clone(&store_dyn),
            Arc::clone(&notifier_dyn),
            config.commands.clone(),
        ),
        find_requests: FindRequestService::new(
            Arc::clone(&store_dyn),
            notifier_dyn,
            config.find_requests.clone(),
        ),
        store,
        notifier,
    }
}

/// A fresh user id.
pub fn user_id() -> Uuid {
    Uuid::new_v4()
}

/// A fake display name.
pub fn display_name() -> String {
    Name().fake()
}
