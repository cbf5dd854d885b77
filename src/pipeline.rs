//! Module `pipeline` contains the middleware abstractions used to wrap the
//! handling of a request with cross-cutting concerns, such as logging,
//! validation or metrics collection.
//!
//! Zero or more [Behavior]s can be registered for a request type. During a
//! dispatch call, the registered Behaviors are composed into a single
//! invocation chain, walking the registration list last to first so that,
//! at runtime, Behaviors execute in registration order, strictly nested,
//! with the request [Handler][crate::command::Handler] as the innermost link.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::message;

/// Shared [Behavior] reference, the shape under which Behavior chains are
/// registered in a [`ServiceProvider`][crate::provider::ServiceProvider]:
/// a single `Vec<BehaviorRef<T, R>>` value, in a significant order.
pub type BehaviorRef<T, R> = Arc<dyn Behavior<T, R>>;

/// The continuation of a dispatch call: invoking it runs the remainder of
/// the pipeline -- later [Behavior]s first, the request Handler last -- and
/// yields its result.
///
/// A continuation is constructed fresh for each dispatch call and consumed
/// by [run][Next::run], so it can neither be stored nor invoked twice.
pub struct Next<R>(Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<R>> + Send>);

impl<R> Next<R> {
    /// Creates a new continuation out of the provided closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Next(Box::new(move || f().boxed()))
    }

    /// Runs the remainder of the pipeline, consuming the continuation.
    ///
    /// # Errors
    ///
    /// Any error raised by downstream [Behavior]s, or by the request Handler
    /// itself, is propagated unchanged.
    pub async fn run(self) -> anyhow::Result<R> {
        (self.0)().await
    }
}

/// A middleware component that wraps the handling of requests of a
/// certain type.
///
/// A Behavior can run arbitrary logic before and after invoking [Next],
/// transform the result flowing back up the chain, or short-circuit the
/// pipeline entirely by never invoking [Next] -- in which case neither the
/// downstream Behaviors nor the request Handler execute.
///
/// `R` is the result type flowing through the chain: `()` for
/// [Domain Commands][crate::command::Envelope], the
/// [Output][crate::query::Query::Output] type for
/// [Domain Queries][crate::query::Envelope].
#[async_trait]
pub trait Behavior<T, R>: Send + Sync
where
    T: message::Message,
    R: Send,
{
    /// Wraps the handling of the given request.
    ///
    /// The same cancellation token handed to the dispatch call is provided
    /// to every Behavior in the chain.
    ///
    /// # Errors
    ///
    /// An error returned by the Behavior itself, or propagated out of
    /// [Next::run], is surfaced to the previous link of the chain.
    async fn handle(
        &self,
        request: &message::Envelope<T>,
        next: Next<R>,
        token: &CancellationToken,
    ) -> anyhow::Result<R>;
}

/// Composes the invocation chain for a dispatch call.
///
/// The provided continuation becomes the innermost link; each [Behavior] is
/// wrapped around the current chain walking the list last to first, each wrap
/// capturing the previous continuation as its `next`. Runtime invocation
/// order is thus the registration order, first to last.
pub(crate) fn assemble<T, R>(
    request: Arc<message::Envelope<T>>,
    behaviors: Vec<BehaviorRef<T, R>>,
    token: &CancellationToken,
    innermost: Next<R>,
) -> Next<R>
where
    T: message::Message + Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    let mut next = innermost;

    for behavior in behaviors.into_iter().rev() {
        let request = Arc::clone(&request);
        let token = token.clone();
        let current = next;

        next = Next::new(move || async move { behavior.handle(&request, current, &token).await });
    }

    next
}
