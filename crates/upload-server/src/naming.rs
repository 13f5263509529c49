//! Session identifiers and object path derivation.
//!
//! The object path always ends in the session's own id, so two sessions
//! can never be handed the same object regardless of which worker thread
//! runs them.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-generated identity of one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Layout of object paths under the namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathLayout {
    /// `{namespace}/{session_id}`
    #[default]
    Flat,
    /// `{namespace}/{worker}/{session_id}`, grouping objects by the name of
    /// the runtime thread that opened them.
    WorkerNamespaced,
}

/// Assigns ids and object paths to new sessions.
#[derive(Debug, Clone)]
pub struct SessionNamer {
    namespace: String,
    layout: PathLayout,
}

impl SessionNamer {
    pub fn new(namespace: impl Into<String>, layout: PathLayout) -> Self {
        Self {
            namespace: namespace.into(),
            layout,
        }
    }

    /// Generates a fresh id and derives its object path.
    pub fn assign(&self) -> (SessionId, String) {
        let id = SessionId::generate();
        let path = self.path_for(&id);
        (id, path)
    }

    /// Object path for `id` under this namer's layout.
    pub fn path_for(&self, id: &SessionId) -> String {
        match self.layout {
            PathLayout::Flat => format!("{}/{id}", self.namespace),
            PathLayout::WorkerNamespaced => {
                format!("{}/{}/{id}", self.namespace, worker_label())
            }
        }
    }
}

/// Name of the current thread, reduced to characters safe in a path segment.
fn worker_label() -> String {
    let label: String = std::thread::current()
        .name()
        .unwrap_or("worker")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if label.is_empty() || label.chars().all(|c| c == '_') {
        "worker".into()
    } else {
        label
    }
}
