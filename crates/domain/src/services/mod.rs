//! Domain services.

pub mod notifier;

pub use notifier::{LocalNotification, MockNotifier, Notifier, NotifierResult};
