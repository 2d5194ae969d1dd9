//! Flock: a real-time group coordination engine.
//!
//! Coordinates a small group of mobile participants (a leader and
//! followers) sharing live location. The engine owns:
//! - membership lifecycle with leader election ([`membership`])
//! - command broadcast and notification fan-out ([`commands`])
//! - the find-request authorization state machine ([`find_requests`])
//! - the debounced distance-computation scheduler ([`distance`])
//!
//! All services are explicitly constructed against a [`store::RemoteStore`]
//! and a [`domain::services::Notifier`] and passed around by the embedding
//! application; nothing here is a process-wide singleton.

pub mod commands;
pub mod config;
pub mod distance;
pub mod error;
pub mod find_requests;
pub mod membership;
pub mod telemetry;

mod notifications;

pub use commands::{CommandFeed, CommandService};
pub use config::EngineConfig;
pub use distance::{DistanceCallback, DistanceScheduler, DistanceUpdate};
pub use error::CoordinationError;
pub use find_requests::FindRequestService;
pub use membership::MembershipManager;
