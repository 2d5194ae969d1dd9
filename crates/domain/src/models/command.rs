//! Command domain models for group-wide broadcasts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// How many commands the live view exposes. Older commands stay in storage
/// but are excluded from the window.
pub const DEFAULT_COMMAND_WINDOW: usize = 50;

/// Kind of a broadcast command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Gather,
    Depart,
    Rest,
    Caution,
    Custom,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Gather => "gather",
            CommandKind::Depart => "depart",
            CommandKind::Rest => "rest",
            CommandKind::Caution => "caution",
            CommandKind::Custom => "custom",
        }
    }

    /// The built-in message for non-custom kinds.
    pub fn default_message(&self) -> Option<&'static str> {
        match self {
            CommandKind::Gather => Some("Gather at the meeting point"),
            CommandKind::Depart => Some("Departing now"),
            CommandKind::Rest => Some("Taking a break"),
            CommandKind::Caution => Some("Caution ahead, slow down"),
            CommandKind::Custom => None,
        }
    }
}

impl FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gather" => Ok(CommandKind::Gather),
            "depart" => Ok(CommandKind::Depart),
            "rest" => Ok(CommandKind::Rest),
            "caution" => Ok(CommandKind::Caution),
            "custom" => Ok(CommandKind::Custom),
            _ => Err(format!("Invalid command kind: {}", s)),
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A broadcast command. Immutable once created; append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Command {
    pub id: Uuid,
    pub group_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub kind: CommandKind,
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Request payload for sending a command.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SendCommandRequest {
    pub kind: CommandKind,

    /// Required for custom commands, ignored otherwise.
    #[validate(length(
        min = 1,
        max = 200,
        message = "Message must be between 1 and 200 characters"
    ))]
    pub message: Option<String>,
}

impl SendCommandRequest {
    /// Resolves the broadcast text: the custom message for custom commands,
    /// the built-in text otherwise. None when a custom command has no message.
    pub fn resolved_message(&self) -> Option<String> {
        match self.kind {
            CommandKind::Custom => self.message.clone(),
            kind => kind.default_message().map(str::to_string),
        }
    }
}
