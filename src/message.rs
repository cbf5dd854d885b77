//! This module contains the definition of a [Message] type, which describes
//! the requests that can be routed through a dispatcher, such as a
//! [Domain Command][crate::command::Envelope] or a [Domain Query][crate::query::Envelope].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Represents a piece of domain data that flows through the system.
///
/// Each Message has a specific name to it, which should ideally be
/// unique within the domain you're operating in. Example: a Domain Command
/// that creates a new Order can have a `name()`: `"CreateOrder"`.
pub trait Message {
    /// Returns the domain name of the [Message].
    fn name(&self) -> &'static str;
}

/// Optional metadata to attach to an [Envelope] to provide additional context
/// to the [Message] carried out, such as a correlation id.
pub type Metadata = HashMap<String, String>;

/// Represents a [Message] packaged for dispatching to the rest of the system.
///
/// It carries both the actual message (i.e. a payload) and some optional [Metadata].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T>
where
    T: Message,
{
    /// The message payload.
    pub message: T,
    /// Optional metadata to provide additional context to the message.
    pub metadata: Metadata,
}

impl<T> Envelope<T>
where
    T: Message,
{
    /// Adds a new entry in the [Envelope]'s [Metadata].
    #[must_use]
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

impl<T> From<T> for Envelope<T>
where
    T: Message,
{
    fn from(message: T) -> Self {
        Envelope {
            message,
            metadata: Metadata::default(),
        }
    }
}

impl<T> PartialEq for Envelope<T>
where
    T: Message + PartialEq,
{
    fn eq(&self, other: &Envelope<T>) -> bool {
        self.message == other.message
    }
}
