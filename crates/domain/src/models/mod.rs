//! Domain models for the Flock coordination engine.

pub mod command;
pub mod find_request;
pub mod group;
pub mod invite;
pub mod location;
pub mod member;
pub mod notification;

pub use command::{Command, CommandKind};
pub use find_request::{FindRequest, FindRequestStatus};
pub use group::{Group, GroupSettings, MemberRole};
pub use location::Coordinate;
pub use member::{Member, MemberStatus};
pub use notification::{NotificationKind, NotificationRecord};
