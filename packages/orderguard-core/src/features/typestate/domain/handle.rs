/*
 * Handles
 *
 * A handle is one abstract resource instance. Its metadata never changes
 * after creation; its state lives in the per-path state table, keyed by the
 * alias class the handle belongs to.
 */

use serde::{Deserialize, Serialize};

use crate::shared::models::Location;

/// Unique handle identity within one analysis run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HandleId(pub u32);

impl HandleId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Handle metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handle {
    pub id: HandleId,

    /// Protocol name (registry key)
    pub protocol: String,

    /// Creation site
    pub created_at: Location,

    /// Function the handle was created in
    pub function: String,

    /// Variable the handle was first bound to (for messages)
    pub binding: Option<String>,
}

impl Handle {
    /// Name used in messages: first binding, else the id
    pub fn display_name(&self) -> String {
        self.binding
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}
