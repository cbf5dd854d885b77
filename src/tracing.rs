//! Module containing some extension traits to support code instrumentation
//! using the `tracing` crate.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::dispatch::{Dispatch, Error};
use crate::{command, message, query};

/// [Dispatch] type wrapper that provides instrumentation features
/// through the `tracing` crate.
#[derive(Debug, Clone)]
pub struct Instrumented<D>
where
    D: Dispatch,
{
    inner: D,
}

#[async_trait]
impl<D> Dispatch for Instrumented<D>
where
    D: Dispatch,
{
    #[instrument(
        name = "Dispatch.send",
        skip_all,
        fields(message.name = command.message.name()),
        err
    )]
    async fn send<T>(
        &self,
        command: command::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<(), Error>
    where
        T: message::Message + Send + Sync + 'static,
    {
        self.inner.send(command, token).await
    }

    #[instrument(
        name = "Dispatch.query",
        skip_all,
        fields(message.name = query.message.name()),
        err
    )]
    async fn query<T>(
        &self,
        query: query::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<T::Output, Error>
    where
        T: query::Query + Send + Sync + 'static,
    {
        self.inner.query(query, token).await
    }
}

/// Extension trait for any [Dispatch] type to provide instrumentation
/// features through the `tracing` crate.
pub trait DispatchExt: Dispatch + Sized {
    /// Returns an instrumented version of the [Dispatch] instance.
    fn with_tracing(self) -> Instrumented<Self> {
        Instrumented { inner: self }
    }
}

impl<D> DispatchExt for D where D: Dispatch {}
