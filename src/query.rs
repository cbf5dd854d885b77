//! Module `query` contains types and helpful abstractions to model Domain Queries
//! and implement Domain Query Handlers.
//!
//! Differently from a [Domain Command][crate::command::Envelope], a [Query]
//! produces a **result**: the [Output][Query::Output] type associated with
//! the Query itself. A [Dispatch][crate::dispatch::Dispatch] implementation
//! uses that association to derive the result type of a dispatch call from
//! the concrete Query type.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message;

/// A [Message][message::Message] carrying the Domain Query itself as payload
/// and other relevant information as metadata.
pub type Envelope<T> = message::Envelope<T>;

/// Shared [Handler] reference, the shape under which Query Handlers are
/// registered in a [`ServiceProvider`][crate::provider::ServiceProvider].
///
/// Exactly one Handler registration is expected for each concrete Query type.
pub type HandlerRef<T> = Arc<dyn Handler<T>>;

/// A [Message][message::Message] that expects a result back from its [Handler].
pub trait Query: message::Message {
    /// The result type produced when the Query is evaluated.
    type Output: Send + Sync + 'static;
}

/// An Handler describes an implementation that is able to handle specific
/// [Queries][Envelope].
///
/// The Handler evaluates the Domain Query and produces a **result**, described
/// by the [Output][Query::Output] type associated with the Query.
#[async_trait]
pub trait Handler<T>: Send + Sync
where
    T: Query,
{
    /// Evaluates the [Query][Envelope] provided and returns its result,
    /// observing the provided cancellation token while doing so.
    ///
    /// # Errors
    ///
    /// As the Handler can fail to evaluate the Query, an error
    /// can be returned instead.
    async fn handle(
        &self,
        query: &Envelope<T>,
        token: &CancellationToken,
    ) -> anyhow::Result<T::Output>;
}
