//! Module containing support for Domain [Command]s.
//!
//! Following the Domain-driven Design definition, a [Command] expresses the
//! intent of an Actor (e.g. a Customer, a User, a System, etc.) to modify
//! the state of the system in some way, and carries no result back to
//! the caller.
//!
//! Commands are routed to their [Handler] by a
//! [Dispatch][crate::dispatch::Dispatch] implementation, based on the
//! concrete Command type.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::message;

/// A Command represents an intent by an Actor (e.g. a User, or a System)
/// to mutate the state of the system.
///
/// It is represented as a [Message], wrapped in an [Envelope].
pub type Envelope<T> = message::Envelope<T>;

/// Shared [Handler] reference, the shape under which Command Handlers are
/// registered in a [`ServiceProvider`][crate::provider::ServiceProvider].
///
/// Exactly one Handler registration is expected for each concrete
/// Command type.
pub type HandlerRef<T> = Arc<dyn Handler<T>>;

/// A software component that is able to handle [Command]s of a certain type,
/// and mutate the state as a result of the command handling, or fail.
#[async_trait]
pub trait Handler<T>: Send + Sync
where
    T: message::Message,
{
    /// Handles a [Command], observing the provided cancellation token
    /// while doing so.
    ///
    /// Since [Command]s are solely modifying the state of the system,
    /// they do not return anything to the caller but the result of
    /// the operation (expressed by a [Result] type).
    ///
    /// # Errors
    ///
    /// An error is returned if the handling of the [Command] has failed.
    async fn handle(&self, command: &Envelope<T>, token: &CancellationToken)
        -> anyhow::Result<()>;
}
