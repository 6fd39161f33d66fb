//! WebSocket message types for the live dashboard channel.
//!
//! DESIGN
//! ======
//! One JSON object per message, discriminated by a `type` tag. The server
//! routes on the tag only. The protocol is deliberately tiny: the browser
//! selects a user or deletes a task, the server pushes full task snapshots.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::Task;

/// Browser → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Switch the live subscription to this user's tasks.
    SelectUser { user_id: String },
    /// Drop the current subscription without selecting another user.
    ClearSelection,
    /// Delete one task of the currently selected user.
    DeleteTask { task_id: String },
}

/// Server → browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First message after upgrade.
    Connected { client_id: Uuid, email: String },
    /// Selection acknowledged; snapshots for this user follow.
    Selected { user_id: String },
    SelectionCleared,
    /// Full replacement snapshot of the selected user's tasks.
    Tasks { user_id: String, tasks: Vec<Task> },
    /// Delete accepted by the backend. The updated list arrives as a
    /// `tasks` snapshot, not here.
    TaskDeleted { task_id: String },
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

#[cfg(test)]
#[path = "msg_test.rs"]
mod tests;
