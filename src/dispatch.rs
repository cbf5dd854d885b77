//! Module `dispatch` contains the Request Dispatcher, the core component that
//! routes Domain [Command][command::Envelope]s and Domain
//! [Query][query::Envelope]s to the [Handler][command::Handler] registered
//! for their concrete type, optionally through a chain of
//! [Behavior][crate::pipeline::Behavior]s.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::provider::{ResolveError, ServiceProvider, ServiceProviderExt};
use crate::{command, message, pipeline, query};

/// All possible error types returned by a [Dispatch] operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error returned when the Handler for the request type could not be
    /// resolved from the [`ServiceProvider`]. Surfaced before any Behavior
    /// or Handler code runs.
    #[error("failed to resolve the request handler: {0}")]
    Handler(#[source] ResolveError),
    /// Error returned when the Behavior chain registered for the request type
    /// violates the [`ServiceProvider`] contract. Surfaced before any
    /// Behavior or Handler code runs.
    #[error("failed to resolve the pipeline behaviors: {0}")]
    Pipeline(#[source] ResolveError),
    /// Error raised from inside a request Handler or a
    /// [Behavior][crate::pipeline::Behavior], propagated to the caller unchanged.
    #[error(transparent)]
    Failed(anyhow::Error),
}

/// Dispatching capability, exposing the two entry points callers use to
/// submit requests: [send][Dispatch::send] for Domain Commands and
/// [query][Dispatch::query] for Domain Queries.
///
/// Implemented by [`RequestDispatcher`] and by the
/// [`Sender`][crate::sender::Sender] facade; test code can substitute
/// either with a double through this same trait.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// Routes a Domain Command to the [Handler][command::Handler] registered
    /// for its concrete type, through the registered
    /// [Behavior][crate::pipeline::Behavior] chain.
    ///
    /// The provided cancellation token is forwarded to every Behavior and to
    /// the Handler; observing it is their responsibility.
    ///
    /// # Errors
    ///
    /// Returns an [Error] if the Handler could not be resolved, if the
    /// Behavior registrations are malformed, or if the pipeline itself
    /// failed while handling the Command.
    async fn send<T>(
        &self,
        command: command::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<(), Error>
    where
        T: message::Message + Send + Sync + 'static;

    /// Routes a Domain Query to the [Handler][query::Handler] registered for
    /// its concrete type, through the registered
    /// [Behavior][crate::pipeline::Behavior] chain, and returns its result.
    ///
    /// # Errors
    ///
    /// Returns an [Error] if the Handler could not be resolved, if the
    /// Behavior registrations are malformed, or if the pipeline itself
    /// failed while evaluating the Query.
    async fn query<T>(
        &self,
        query: query::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<T::Output, Error>
    where
        T: query::Query + Send + Sync + 'static;
}

/// [Dispatch] implementation that resolves Handlers and Behaviors at call
/// time through a [`ServiceProvider`].
///
/// The dispatcher owns no Handler or Behavior instance: it borrows them from
/// the provider for the duration of a single call. Since every dispatch call
/// builds its own invocation chain, the dispatcher holds no mutable state
/// and can be shared freely between concurrent callers.
#[derive(Debug, Clone)]
pub struct RequestDispatcher<P> {
    provider: P,
}

impl<P> RequestDispatcher<P>
where
    P: ServiceProvider,
{
    /// Creates a new dispatcher resolving against the provided [`ServiceProvider`].
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P> From<P> for RequestDispatcher<P>
where
    P: ServiceProvider,
{
    fn from(provider: P) -> Self {
        Self::new(provider)
    }
}

#[async_trait]
impl<P> Dispatch for RequestDispatcher<P>
where
    P: ServiceProvider,
{
    async fn send<T>(
        &self,
        command: command::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<(), Error>
    where
        T: message::Message + Send + Sync + 'static,
    {
        let handler = self
            .provider
            .require::<command::HandlerRef<T>>()
            .map_err(Error::Handler)?;

        let behaviors = self
            .provider
            .collect::<pipeline::BehaviorRef<T, ()>>()
            .map_err(Error::Pipeline)?;

        let command = Arc::new(command);

        let innermost = pipeline::Next::new({
            let command = Arc::clone(&command);
            let token = token.clone();
            move || async move { handler.handle(&command, &token).await }
        });

        pipeline::assemble(command, behaviors, token, innermost)
            .run()
            .await
            .map_err(Error::Failed)
    }

    async fn query<T>(
        &self,
        query: query::Envelope<T>,
        token: &CancellationToken,
    ) -> Result<T::Output, Error>
    where
        T: query::Query + Send + Sync + 'static,
    {
        let handler = self
            .provider
            .require::<query::HandlerRef<T>>()
            .map_err(Error::Handler)?;

        let behaviors = self
            .provider
            .collect::<pipeline::BehaviorRef<T, T::Output>>()
            .map_err(Error::Pipeline)?;

        let query = Arc::new(query);

        let innermost = pipeline::Next::new({
            let query = Arc::clone(&query);
            let token = token.clone();
            move || async move { handler.handle(&query, &token).await }
        });

        pipeline::assemble(query, behaviors, token, innermost)
            .run()
            .await
            .map_err(Error::Failed)
    }
}

#[cfg(test)]
mod test {
    use std::any::TypeId;

    use super::*;
    use crate::pipeline::{Behavior, BehaviorRef, Next};
    use crate::test::provider::InMemory;
    use crate::test::scenario::Scenario;
    use crate::test::Probe;

    struct CreateUser {
        email: String,
    }

    impl message::Message for CreateUser {
        fn name(&self) -> &'static str {
            "CreateUser"
        }
    }

    struct CreateUserHandler(Probe);

    #[async_trait]
    impl command::Handler<CreateUser> for CreateUserHandler {
        async fn handle(
            &self,
            command: &command::Envelope<CreateUser>,
            _token: &CancellationToken,
        ) -> anyhow::Result<()> {
            self.0.record(format!("handler:{}", command.message.email));
            Ok(())
        }
    }

    struct FindUserEmail;

    impl message::Message for FindUserEmail {
        fn name(&self) -> &'static str {
            "FindUserEmail"
        }
    }

    impl query::Query for FindUserEmail {
        type Output = String;
    }

    struct FindUserEmailHandler;

    #[async_trait]
    impl query::Handler<FindUserEmail> for FindUserEmailHandler {
        async fn handle(
            &self,
            _query: &query::Envelope<FindUserEmail>,
            _token: &CancellationToken,
        ) -> anyhow::Result<String> {
            Ok("test@test.com".to_owned())
        }
    }

    struct MarkingBehavior {
        name: &'static str,
        probe: Probe,
    }

    #[async_trait]
    impl<T> Behavior<T, ()> for MarkingBehavior
    where
        T: message::Message + Send + Sync + 'static,
    {
        async fn handle(
            &self,
            _request: &message::Envelope<T>,
            next: Next<()>,
            _token: &CancellationToken,
        ) -> anyhow::Result<()> {
            self.probe.record(format!("{}:pre", self.name));
            let result = next.run().await;
            self.probe.record(format!("{}:post", self.name));
            result
        }
    }

    #[tokio::test]
    async fn it_dispatches_a_command_to_its_registered_handler() {
        let probe = Probe::default();

        Scenario
            .given(
                InMemory::default()
                    .with_command_handler::<CreateUser, _>(CreateUserHandler(probe.clone())),
            )
            .when(command::Envelope::from(CreateUser {
                email: "test@test.com".to_owned(),
            }))
            .then_completes()
            .assert()
            .await;

        assert_eq!(vec!["handler:test@test.com".to_owned()], probe.marks());
    }

    #[tokio::test]
    async fn it_dispatches_a_query_and_returns_the_handler_result() {
        Scenario
            .given(
                InMemory::default().with_query_handler::<FindUserEmail, _>(FindUserEmailHandler),
            )
            .when_query(query::Envelope::from(FindUserEmail))
            .then_returns("test@test.com".to_owned())
            .assert()
            .await;
    }

    #[tokio::test]
    async fn it_fails_to_dispatch_a_command_when_no_handler_is_registered() {
        let probe = Probe::default();

        let dispatcher = RequestDispatcher::new(
            InMemory::default().with_command_behavior::<CreateUser, _>(MarkingBehavior {
                name: "behavior",
                probe: probe.clone(),
            }),
        );

        let error = dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &CancellationToken::new(),
            )
            .await
            .expect_err("dispatching without a registered handler should fail");

        assert!(matches!(
            error,
            Error::Handler(ResolveError::NotRegistered(_))
        ));

        // The registered behavior must not have run.
        assert!(probe.marks().is_empty());
    }

    #[tokio::test]
    async fn behaviors_execute_in_registration_order_around_the_handler() {
        let probe = Probe::default();

        let dispatcher = RequestDispatcher::new(
            InMemory::default()
                .with_command_handler::<CreateUser, _>(CreateUserHandler(probe.clone()))
                .with_command_behavior::<CreateUser, _>(MarkingBehavior {
                    name: "first",
                    probe: probe.clone(),
                })
                .with_command_behavior::<CreateUser, _>(MarkingBehavior {
                    name: "second",
                    probe: probe.clone(),
                }),
        );

        dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &CancellationToken::new(),
            )
            .await
            .expect("the dispatch should complete");

        assert_eq!(
            vec![
                "first:pre".to_owned(),
                "second:pre".to_owned(),
                "handler:test@test.com".to_owned(),
                "second:post".to_owned(),
                "first:post".to_owned(),
            ],
            probe.marks(),
        );
    }

    #[tokio::test]
    async fn a_behavior_that_never_invokes_next_short_circuits_the_pipeline() {
        let probe = Probe::default();

        struct ShortCircuit(Probe);

        #[async_trait]
        impl Behavior<CreateUser, ()> for ShortCircuit {
            async fn handle(
                &self,
                _request: &message::Envelope<CreateUser>,
                next: Next<()>,
                _token: &CancellationToken,
            ) -> anyhow::Result<()> {
                self.0.record("short-circuit");
                drop(next);
                Ok(())
            }
        }

        let dispatcher = RequestDispatcher::new(
            InMemory::default()
                .with_command_handler::<CreateUser, _>(CreateUserHandler(probe.clone()))
                .with_command_behavior::<CreateUser, _>(ShortCircuit(probe.clone()))
                .with_command_behavior::<CreateUser, _>(MarkingBehavior {
                    name: "downstream",
                    probe: probe.clone(),
                }),
        );

        dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &CancellationToken::new(),
            )
            .await
            .expect("the short-circuited dispatch should still complete");

        // Neither the downstream behavior nor the handler have executed.
        assert_eq!(vec!["short-circuit".to_owned()], probe.marks());
    }

    #[tokio::test]
    async fn the_cancellation_token_reaches_every_link_of_the_pipeline() {
        let probe = Probe::default();

        struct CancellationAwareBehavior(Probe);

        #[async_trait]
        impl Behavior<CreateUser, ()> for CancellationAwareBehavior {
            async fn handle(
                &self,
                _request: &message::Envelope<CreateUser>,
                next: Next<()>,
                token: &CancellationToken,
            ) -> anyhow::Result<()> {
                self.0
                    .record(format!("behavior:cancelled={}", token.is_cancelled()));
                next.run().await
            }
        }

        struct CancellationAwareHandler(Probe);

        #[async_trait]
        impl command::Handler<CreateUser> for CancellationAwareHandler {
            async fn handle(
                &self,
                _command: &command::Envelope<CreateUser>,
                token: &CancellationToken,
            ) -> anyhow::Result<()> {
                self.0
                    .record(format!("handler:cancelled={}", token.is_cancelled()));
                Ok(())
            }
        }

        let dispatcher = RequestDispatcher::new(
            InMemory::default()
                .with_command_handler::<CreateUser, _>(CancellationAwareHandler(probe.clone()))
                .with_command_behavior::<CreateUser, _>(CancellationAwareBehavior(probe.clone())),
        );

        let token = CancellationToken::new();
        token.cancel();

        dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &token,
            )
            .await
            .expect("the dispatch should complete");

        // Every link observed the caller's cancellation signal.
        assert_eq!(
            vec![
                "behavior:cancelled=true".to_owned(),
                "handler:cancelled=true".to_owned(),
            ],
            probe.marks(),
        );
    }

    #[tokio::test]
    async fn handler_failures_propagate_to_the_caller_unchanged() {
        struct RejectingHandler;

        #[async_trait]
        impl command::Handler<CreateUser> for RejectingHandler {
            async fn handle(
                &self,
                _command: &command::Envelope<CreateUser>,
                _token: &CancellationToken,
            ) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("the email is already taken"))
            }
        }

        let dispatcher = RequestDispatcher::new(
            InMemory::default().with_command_handler::<CreateUser, _>(RejectingHandler),
        );

        let error = dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &CancellationToken::new(),
            )
            .await
            .expect_err("the handler failure should surface");

        match error {
            Error::Failed(err) => assert_eq!("the email is already taken", err.to_string()),
            other => panic!("expected a handler failure, received: {other}"),
        }
    }

    #[tokio::test]
    async fn a_query_behavior_can_transform_the_result_flowing_back() {
        struct UppercaseEmail;

        #[async_trait]
        impl Behavior<FindUserEmail, String> for UppercaseEmail {
            async fn handle(
                &self,
                _request: &message::Envelope<FindUserEmail>,
                next: Next<String>,
                _token: &CancellationToken,
            ) -> anyhow::Result<String> {
                let email = next.run().await?;
                Ok(email.to_uppercase())
            }
        }

        Scenario
            .given(
                InMemory::default()
                    .with_query_handler::<FindUserEmail, _>(FindUserEmailHandler)
                    .with_query_behavior::<FindUserEmail, _>(UppercaseEmail),
            )
            .when_query(query::Envelope::from(FindUserEmail))
            .then_returns("TEST@TEST.COM".to_owned())
            .assert()
            .await;
    }

    #[tokio::test]
    async fn malformed_behavior_registrations_fail_before_anything_runs() {
        use std::any::Any;

        let probe = Probe::default();

        // A provider that resolves the handler correctly, but answers the
        // behavior-chain lookup with a value of the wrong shape.
        struct MalformedPipeline(InMemory);

        impl ServiceProvider for MalformedPipeline {
            fn service(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)> {
                if id == TypeId::of::<Vec<BehaviorRef<CreateUser, ()>>>() {
                    return Some(&0_u64);
                }

                self.0.service(id)
            }
        }

        let dispatcher = RequestDispatcher::new(MalformedPipeline(
            InMemory::default()
                .with_command_handler::<CreateUser, _>(CreateUserHandler(probe.clone())),
        ));

        let error = dispatcher
            .send(
                command::Envelope::from(CreateUser {
                    email: "test@test.com".to_owned(),
                }),
                &CancellationToken::new(),
            )
            .await
            .expect_err("a malformed behavior registration should fail the dispatch");

        assert!(matches!(
            error,
            Error::Pipeline(ResolveError::Mismatched(_))
        ));

        // The handler was resolved, but never invoked.
        assert!(probe.marks().is_empty());
    }
}
