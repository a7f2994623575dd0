//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Errors
pub use crate::error::{Error, HandlerError, HandlerResult, Result};
// Event names & events
pub use crate::event::{Event, EventName, IntoEventNames};
// Hub
pub use crate::hub::{ObserverHub, ObserverSlot, Observers, Subject};
// Observer trait and adapters
pub use crate::observer::{from_event_fn, from_fn, Handler, Handlers, Observer, ObserverRef};
// Subscribers
pub use crate::subscriber::{ArgSource, CallArg, Callable, Flatten, Handle, Token};
pub use crate::{
  options::{AttachOptions, OnOptions},
  payload::Payload,
};
