//! Domain layer for the Flock coordination engine.
//!
//! This crate contains:
//! - Domain models (Group, Member, Command, FindRequest, NotificationRecord)
//! - Document encode/decode with required-field validation
//! - The local notification dispatcher abstraction

pub mod document;
pub mod error;
pub mod models;
pub mod services;

pub use error::DomainError;
