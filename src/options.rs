//! Option records accepted by `attach` and `on`/`once`.

use crate::{
  error::HandlerResult,
  event::{Event, EventName},
  payload::Payload,
  subscriber::{ArgSource, CallArg, Callable},
};

/// Options for attaching observers.
///
/// ```rust
/// use observers::AttachOptions;
///
/// let opts = AttachOptions::default().context("audit").once();
/// assert!(opts.once && !opts.allow_duplication);
/// ```
#[derive(Clone, Debug, Default)]
pub struct AttachOptions {
  /// Handed to two-argument handlers as [`Event::context`].
  pub context: Option<Payload>,
  /// Remove the observer after the first broadcast in which it fires.
  pub once: bool,
  /// Append even if the same observer handle is already attached.
  pub allow_duplication: bool,
}

impl AttachOptions {
  pub fn context<T: 'static>(mut self, context: T) -> Self {
    self.context = Some(Payload::new(context));
    self
  }

  pub fn once(mut self) -> Self {
    self.once = true;
    self
  }

  pub fn allow_duplication(mut self) -> Self {
    self.allow_duplication = true;
    self
  }
}

/// Options for binding a callable to one event.
///
/// A record missing its `event` or `call` (or carrying an event name that is
/// not a valid identifier) registers nothing.
pub struct OnOptions<S: ?Sized> {
  pub event: Option<EventName>,
  pub call: Option<Callable<S>>,
  pub with: ArgSource<S>,
  pub context: Option<Payload>,
}

impl<S: ?Sized> OnOptions<S> {
  pub fn new(event: impl Into<EventName>, call: Callable<S>) -> Self {
    Self { event: Some(event.into()), call: Some(call), ..Self::default() }
  }

  /// Shortcut for [`new`](Self::new) with a closure.
  pub fn call(
    event: impl Into<EventName>, f: impl Fn(CallArg<'_, S>) -> HandlerResult + 'static,
  ) -> Self {
    Self::new(event, Callable::new(f))
  }

  /// Pass `value` to the callable instead of the [`Event`].
  pub fn with_value<T: 'static>(mut self, value: T) -> Self {
    self.with = ArgSource::value(value);
    self
  }

  /// Pass `f(event)` to the callable instead of the [`Event`].
  pub fn with_producer(mut self, f: impl Fn(&Event<'_, S>) -> Payload + 'static) -> Self {
    self.with = ArgSource::producer(f);
    self
  }

  pub fn context<T: 'static>(mut self, context: T) -> Self {
    self.context = Some(Payload::new(context));
    self
  }

  /// Whether `on`/`once` would register anything for this record.
  pub fn is_valid(&self) -> bool {
    self.call.is_some() && self.event.as_ref().is_some_and(EventName::is_valid)
  }
}

impl<S: ?Sized> Default for OnOptions<S> {
  fn default() -> Self { Self { event: None, call: None, with: ArgSource::None, context: None } }
}
