//! Module `provider` contains the [`ServiceProvider`] abstraction a
//! [`RequestDispatcher`][crate::dispatch::RequestDispatcher] uses to look up
//! request [Handler][crate::command::Handler]s and
//! [Behavior][crate::pipeline::Behavior]s, together with the required-lookup
//! helpers built on top of it.
//!
//! This crate does not implement a dependency injection container: handler
//! and behavior instances are owned and lifetime-managed elsewhere, and any
//! type able to map a [`TypeId`] to the registered instances can act as a
//! [`ServiceProvider`] -- including a plain map, such as the
//! [`InMemory`][crate::test::provider::InMemory] implementation used for testing.

use std::any::{type_name, Any, TypeId};

/// A minimal service-locator capability: given a type identity, yield the
/// instance registered for it, if any.
///
/// Registrations follow a convention shared with the
/// [`RequestDispatcher`][crate::dispatch::RequestDispatcher]:
///
/// * a single instance of type `T` is stored under `TypeId::of::<T>()`,
/// * multiple instances of type `T` are stored as one `Vec<T>` value
///   under `TypeId::of::<Vec<T>>()`, in a significant order.
pub trait ServiceProvider: Send + Sync {
    /// Returns the instance registered under the given type identity,
    /// or `None` when no registration exists.
    fn service(&self, id: TypeId) -> Option<&(dyn Any + Send + Sync)>;
}

/// All possible error types returned by the lookup operations
/// in [`ServiceProviderExt`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Error returned when no registration exists for the requested type.
    #[error("no service registered for type '{0}'")]
    NotRegistered(&'static str),
    /// Error returned when a registration exists for the requested type
    /// identity, but the value found does not have the requested type.
    ///
    /// This is a violation of the [`ServiceProvider`] contract, not a
    /// normal runtime path.
    #[error("service registered for type '{0}' does not match the requested type")]
    Mismatched(&'static str),
}

/// Extension trait adding required-lookup semantics on top of the
/// optional [`ServiceProvider::service`] capability.
pub trait ServiceProviderExt: ServiceProvider {
    /// Resolves exactly one instance of the requested type,
    /// or fails if the [`ServiceProvider`] cannot produce one.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotRegistered`] when no registration exists
    /// for `T`, or [`ResolveError::Mismatched`] when the registered value
    /// is not a `T`.
    fn require<T>(&self) -> Result<T, ResolveError>
    where
        T: Clone + 'static,
    {
        let service = self
            .service(TypeId::of::<T>())
            .ok_or(ResolveError::NotRegistered(type_name::<T>()))?;

        service
            .downcast_ref::<T>()
            .cloned()
            .ok_or(ResolveError::Mismatched(type_name::<T>()))
    }

    /// Resolves all the instances registered for the requested type,
    /// in registration order.
    ///
    /// Multiple registrations are conventionally stored as a single `Vec<T>`
    /// value. A missing `Vec<T>` registration means "no instances", and
    /// resolves to an empty list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Mismatched`] when the value registered under
    /// the `Vec<T>` identity is not a `Vec<T>`.
    fn collect<T>(&self) -> Result<Vec<T>, ResolveError>
    where
        T: Clone + 'static,
    {
        match self.service(TypeId::of::<Vec<T>>()) {
            None => Ok(Vec::new()),
            Some(service) => service
                .downcast_ref::<Vec<T>>()
                .cloned()
                .ok_or(ResolveError::Mismatched(type_name::<Vec<T>>())),
        }
    }
}

impl<P> ServiceProviderExt for P where P: ServiceProvider + ?Sized {}
