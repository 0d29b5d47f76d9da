//! Mutation kinds.
//!
//! Every mutation is one of three operations. The kind decides which extra
//! context lands in a [`MutationError`](crate::MutationError) and which verb
//! appears in the user-facing message.
//!
//! | Operation | Verb | Error context |
//! |-----------|------|---------------|
//! | **Create** | add | `data` |
//! | **Update** | update | `id`, `data` |
//! | **Delete** | delete | `id` |

use serde::{Deserialize, Serialize};

/// Kind of mutation being performed.
///
/// # Examples
///
/// ```
/// use mutation_kit::operation::Operation;
///
/// assert_eq!(Operation::Create.verb(), "add");
/// assert_eq!(Operation::Delete.to_string(), "delete");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Insert a new resource.
    Create,
    /// Modify an existing resource.
    Update,
    /// Remove a resource.
    Delete,
}

impl Operation {
    /// Verb used in user-facing messages.
    pub fn verb(self) -> &'static str {
        match self {
            Operation::Create => "add",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Update => write!(f, "update"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}
