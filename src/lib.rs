#![deny(unsafe_code, unused_qualifications, trivial_casts)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Mediately is a minimalistic crate that exposes a few building blocks to
//! route application requests to their handlers (also known as the
//! Mediator pattern).
//!
//! Callers submit requests -- Domain [Command][command::Envelope]s carrying
//! no result, or Domain [Query][query::Envelope]s carrying a typed result --
//! without knowing which [Handler][command::Handler] services them. A
//! [Dispatch][dispatch::Dispatch] implementation resolves the Handler
//! registered for the request type at call time, and routes the call through
//! an ordered chain of [Behavior][pipeline::Behavior]s wrapping the Handler
//! execution.
//!
//! Handler and Behavior instances are owned by an external
//! [`ServiceProvider`][provider::ServiceProvider], which this crate only
//! consumes: any dependency injection mechanism able to map a type identity
//! to registered instances can back a [`RequestDispatcher`][dispatch::RequestDispatcher].

pub mod command;
pub mod dispatch;
pub mod message;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod sender;
#[cfg(feature = "tracing")]
pub mod tracing;
