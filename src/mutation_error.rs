//! The error every failed mutation or batch operation surfaces as.
//!
//! Raw failures (a rejected remote call, a cache write that failed) are never
//! handed to callers directly. They are wrapped into a [`MutationError`]
//! together with the operation kind, the key involved and the payload, so the
//! caller can classify and present them.

use crate::key::StructuredKey;
use crate::operation::Operation;
use chrono::Utc;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Discriminator carried by every [`MutationError`].
pub const MUTATION_ERROR_NAME: &str = "MutationError";

/// Cause name that marks a network failure.
pub const NETWORK_ERROR_NAME: &str = "NetworkError";

const NETWORK_HINTS: [&str; 3] = ["fetch", "network", "timeout"];
const VALIDATION_HINTS: [&str; 3] = ["validation", "invalid", "required"];

/// Context attached to every mutation failure.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MutationErrorContext {
    pub operation: Operation,
    pub key: Option<StructuredKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Milliseconds since the Unix epoch at failure time.
    pub timestamp: i64,
}

impl MutationErrorContext {
    /// Context stamped with the current time.
    pub fn new(operation: Operation, key: Option<StructuredKey>) -> Self {
        MutationErrorContext {
            operation,
            key,
            data: None,
            id: None,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_data(mut self, data: Option<Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }
}

/// The original failure behind a [`MutationError`].
#[derive(Clone)]
pub enum Cause {
    /// A typed error. Still downcastable through [`Cause::as_error`].
    Error {
        name: String,
        error: Arc<dyn StdError + Send + Sync>,
    },
    /// A failure that is not an error value, kept in string form.
    Message(String),
}

impl Cause {
    /// Wrap a typed error, resolving its name.
    ///
    /// Crate [`Error`](crate::Error) values use their discriminator,
    /// connection-class `std::io::Error`s are named `NetworkError`, everything
    /// else uses its short type name.
    pub fn from_error<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let name = error_name(&error, std::any::type_name::<E>());
        Cause::Error {
            name,
            error: Arc::new(error),
        }
    }

    /// A cause that is not an error value.
    pub fn message(message: impl Into<String>) -> Self {
        Cause::Message(message.into())
    }

    /// Name of an error-like cause.
    pub fn name(&self) -> Option<&str> {
        match self {
            Cause::Error { name, .. } => Some(name),
            Cause::Message(_) => None,
        }
    }

    /// Message of an error-like cause.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Cause::Error { error, .. } => Some(error.to_string()),
            Cause::Message(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Cause::Error { error, .. } => Some(error.as_ref()),
            Cause::Message(_) => None,
        }
    }

    /// Rendered chain of underlying sources, if any.
    pub fn trace(&self) -> Option<String> {
        let Cause::Error { error, .. } = self else {
            return None;
        };
        let mut lines = Vec::new();
        let mut source = error.source();
        while let Some(inner) = source {
            lines.push(format!("Caused by: {}", inner));
            source = inner.source();
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cause::Error { name, error } => json!({
                "name": name,
                "message": error.to_string(),
                "stack": self.trace(),
            }),
            Cause::Message(message) => Value::String(message.clone()),
        }
    }
}

impl From<crate::Error> for Cause {
    fn from(error: crate::Error) -> Self {
        Cause::from_error(error)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Error { error, .. } => write!(f, "{}", error),
            Cause::Message(message) => write!(f, "{}", message),
        }
    }
}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Error { name, error } => f
                .debug_struct("Error")
                .field("name", name)
                .field("error", error)
                .finish(),
            Cause::Message(message) => f.debug_tuple("Message").field(message).finish(),
        }
    }
}

fn error_name(error: &(dyn StdError + 'static), type_name: &str) -> String {
    if let Some(own) = error.downcast_ref::<crate::Error>() {
        return own.name().to_string();
    }
    if let Some(io) = error.downcast_ref::<std::io::Error>() {
        return crate::Error::from(std::io::Error::from(io.kind()))
            .name()
            .to_string();
    }
    short_type_name(type_name).to_string()
}

fn short_type_name(type_name: &str) -> &str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Typed mutation failure.
///
/// Never fails while being built or inspected.
///
/// # Example
///
/// ```
/// use mutation_kit::{Error, MutationError, StructuredKey};
/// use mutation_kit::mutation_error::{Cause, MutationErrorContext};
/// use mutation_kit::operation::Operation;
/// use serde_json::json;
///
/// let context = MutationErrorContext::new(
///     Operation::Create,
///     Some(StructuredKey::new("todos", json!("/api/todos"))),
/// );
/// let err = MutationError::new(
///     "create mutation failed",
///     context,
///     Some(Cause::from(Error::NetworkError("connection reset".into()))),
/// );
///
/// assert_eq!(err.user_message(), "Failed to add todos. Please try again.");
/// assert!(err.is_network_error());
/// ```
#[derive(Clone)]
pub struct MutationError {
    message: String,
    context: MutationErrorContext,
    original: Option<Cause>,
    backtrace: Arc<Backtrace>,
}

impl MutationError {
    pub fn new(
        message: impl Into<String>,
        context: MutationErrorContext,
        original: Option<Cause>,
    ) -> Self {
        MutationError {
            message: message.into(),
            context,
            original,
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// Always [`MUTATION_ERROR_NAME`].
    pub fn name(&self) -> &'static str {
        MUTATION_ERROR_NAME
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &MutationErrorContext {
        &self.context
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.original.as_ref()
    }

    /// The raw failure, downcastable to its concrete type.
    pub fn original_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.original.as_ref().and_then(Cause::as_error)
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        let target = self
            .context
            .key
            .as_ref()
            .map(|key| key.id())
            .unwrap_or("resource");
        format!(
            "Failed to {} {}. Please try again.",
            self.context.operation.verb(),
            target
        )
    }

    /// The cause is a network failure: named `NetworkError`, or its message
    /// mentions fetch, network or timeout.
    pub fn is_network_error(&self) -> bool {
        let Some(cause) = &self.original else {
            return false;
        };
        if cause.name() == Some(NETWORK_ERROR_NAME) {
            return true;
        }
        message_mentions(cause, &NETWORK_HINTS)
    }

    /// The cause message mentions validation, invalid or required.
    pub fn is_validation_error(&self) -> bool {
        self.original
            .as_ref()
            .is_some_and(|cause| message_mentions(cause, &VALIDATION_HINTS))
    }

    /// Captured backtrace, present only when backtraces are enabled.
    pub fn stack(&self) -> Option<String> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => Some(self.backtrace.to_string()),
            _ => None,
        }
    }

    /// Plain JSON form of this error.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            json!({
                "name": MUTATION_ERROR_NAME,
                "message": self.message,
            })
        })
    }
}

fn message_mentions(cause: &Cause, hints: &[&str]) -> bool {
    cause.error_message().is_some_and(|message| {
        let message = message.to_lowercase();
        hints.iter().any(|hint| message.contains(hint))
    })
}

impl Serialize for MutationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MutationError", 5)?;
        state.serialize_field("name", MUTATION_ERROR_NAME)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("context", &self.context)?;
        state.serialize_field("originalError", &self.original.as_ref().map(Cause::to_json))?;
        state.serialize_field("stack", &self.stack())?;
        state.end()
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationError")
            .field("message", &self.message)
            .field("context", &self.context)
            .field("original", &self.original)
            .finish()
    }
}

impl StdError for MutationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.original_error()
            .map(|error| error as &(dyn StdError + 'static))
    }
}
