//! Error types surfaced by the observer hub.
//!
//! Validation failures ([`Error::NoEvents`], [`Error::InvalidBoolean`]) are
//! programmer errors reported synchronously to the caller. Handler failures are
//! carried through [`Error::Handler`] without being inspected or retried.

use thiserror::Error;

/// Error returned by a handler or callable to abort the running broadcast.
pub type HandlerError = Box<dyn std::error::Error + 'static>;

/// Result of a single handler invocation.
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the hub, the dispatcher and event-name validation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
  /// A "required" entry point received an empty (or all-`None`) event list.
  #[error("no events (expected at least 1)")]
  NoEvents,

  /// The changed flag was given something other than `true` or `false`.
  #[error("expected a boolean (true, false)")]
  InvalidBoolean,

  /// A subscriber failed; the remainder of the broadcast was skipped.
  #[error(transparent)]
  Handler(HandlerError),
}

impl Error {
  /// Returns a short stable label (snake_case) for use in logs.
  ///
  /// # Example
  /// ```
  /// use observers::Error;
  ///
  /// assert_eq!(Error::NoEvents.as_label(), "no_events");
  /// ```
  pub fn as_label(&self) -> &'static str {
    match self {
      Error::NoEvents => "no_events",
      Error::InvalidBoolean => "invalid_boolean",
      Error::Handler(_) => "handler_failed",
    }
  }

  /// Returns `true` when the error came from a subscriber rather than from
  /// argument validation.
  pub fn is_handler(&self) -> bool { matches!(self, Error::Handler(_)) }
}

impl From<HandlerError> for Error {
  fn from(err: HandlerError) -> Self { Error::Handler(err) }
}
