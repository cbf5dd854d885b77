//! Module `sender` contains the [Sender] facade, the entry point callers use
//! to submit requests without depending on a concrete dispatcher type.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatch, Error};
use crate::{command, message, query};

/// Pass-through facade over a [Dispatch] implementation.
///
/// A Sender carries no logic of its own: both operations forward to the
/// wrapped dispatcher unchanged, including the cancellation token and the
/// result type. It exists so that callers can be handed a Sender built
/// elsewhere, and substitute the dispatcher underneath it -- e.g. with a
/// test double -- through the [Dispatch] bound.
#[derive(Debug, Clone)]
pub struct Sender<D> {
    dispatcher: D,
}

impl<D> Sender<D>
where
    D: Dispatch,
{
    /// Creates a new [Sender] forwarding to the provided dispatcher.
    pub fn new(dispatcher: D) -> Self {
        Self { dispatcher }
    }
}

impl<D> From<D> for Sender<D>
where
    D: Dispatch,
{
    fn from(dispatcher: D) -> Self {
        Self::new(dispatcher)
    }
}

#[async_trait]
impl<D> Dispatch for Sender<D>
where
    D: Dispatch,
{
    async fn send<T>(
        &self,
        command: command::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<(), Error>
    where
        T: message::Message + Send + Sync + 'static,
    {
        self.dispatcher.send(command, token).await
    }

    async fn query<T>(
        &self,
        query: query::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<T::Output, Error>
    where
        T: query::Query + Send + Sync + 'static,
    {
        self.dispatcher.query(query, token).await
    }
}
