//! Event identifiers and the structured [`Event`] handed to subscribers.

use std::{borrow::Cow, fmt};

use crate::payload::Payload;

pub mod names;

pub use names::{EventNames, IntoEventNames};

/// Application-defined identifier naming a kind of occurrence.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventName(Cow<'static, str>);

impl EventName {
  /// The implicit event fired by `call`/`call_unconditional` when no name is
  /// given, and the only event a [`from_fn`](crate::observer::from_fn)
  /// observer answers.
  pub const CALL: EventName = EventName(Cow::Borrowed("call"));

  pub const fn from_static(name: &'static str) -> Self { Self(Cow::Borrowed(name)) }

  #[inline]
  pub fn as_str(&self) -> &str { &self.0 }

  /// Whether the name can be used to bind a callable subscriber.
  ///
  /// Valid names are non-empty, do not start with a digit and are made of
  /// ASCII alphanumerics or `_`, optionally ending in a single `?` or `!`.
  pub fn is_valid(&self) -> bool {
    let name = self.as_str();
    let body = name.strip_suffix(&['?', '!'][..]).unwrap_or(name);
    let mut chars = body.chars();
    match chars.next() {
      Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
      _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
  }
}

impl fmt::Debug for EventName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, ":{}", self.0) }
}

impl fmt::Display for EventName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for EventName {
  fn as_ref(&self) -> &str { self.as_str() }
}

impl From<&'static str> for EventName {
  fn from(name: &'static str) -> Self { Self(Cow::Borrowed(name)) }
}

impl From<String> for EventName {
  fn from(name: String) -> Self { Self(Cow::Owned(name)) }
}

impl From<&EventName> for EventName {
  fn from(name: &EventName) -> Self { name.clone() }
}

impl PartialEq<str> for EventName {
  fn eq(&self, other: &str) -> bool { self.as_str() == other }
}

impl PartialEq<&str> for EventName {
  fn eq(&self, other: &&str) -> bool { self.as_str() == *other }
}

/// Structured notification passed to two-argument handlers and callables.
///
/// An `Event` only lives for the duration of one invocation: it borrows the
/// subject and the payloads of the broadcast that produced it.
pub struct Event<'a, S: ?Sized> {
  name: EventName,
  subject: &'a S,
  context: Option<&'a Payload>,
  data: Option<&'a Payload>,
}

impl<'a, S: ?Sized> Event<'a, S> {
  pub fn new(
    name: EventName, subject: &'a S, context: Option<&'a Payload>, data: Option<&'a Payload>,
  ) -> Self {
    Self { name, subject, context, data }
  }

  /// Name of the event currently being broadcast.
  #[inline]
  pub fn name(&self) -> &EventName { &self.name }

  #[inline]
  pub fn subject(&self) -> &'a S { self.subject }

  /// Value registered with the subscription (`context` option).
  #[inline]
  pub fn context(&self) -> Option<&'a Payload> { self.context }

  /// Value supplied at the call site of `notify`/`call`.
  #[inline]
  pub fn data(&self) -> Option<&'a Payload> { self.data }

  /// Typed view of [`context`](Self::context).
  pub fn context_as<T: 'static>(&self) -> Option<&'a T> { self.context.and_then(Payload::get::<T>) }

  /// Typed view of [`data`](Self::data).
  pub fn data_as<T: 'static>(&self) -> Option<&'a T> { self.data.and_then(Payload::get::<T>) }
}

impl<S: ?Sized + fmt::Debug> fmt::Debug for Event<'_, S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Event")
      .field("name", &self.name)
      .field("subject", &self.subject)
      .field("context", &self.context)
      .field("data", &self.data)
      .finish()
  }
}
