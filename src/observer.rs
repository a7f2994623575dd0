//! Observer trait and adapters
//!
//! An observer is an object that may implement many events. For each event name
//! it either declines ([`Observer::handler`] returns `None`) or hands back a
//! [`Handler`] whose variant fixes the argument shape:
//!
//! - [`Handler::Subject`]: invoked with the subject only.
//! - [`Handler::SubjectAndEvent`]: invoked with the subject and the structured
//!   [`Event`].
//!
//! Plain closures are adapted with [`from_fn`] / [`from_event_fn`] and answer
//! only the `call` event. [`Handlers`] is a table-driven observer for the
//! common "one method per event" shape.

use std::{borrow::Cow, fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
  error::HandlerResult,
  event::{Event, EventName},
};

// ============================================================================
// Observer Trait
// ============================================================================

/// A subscriber object attached to a subject's hub.
///
/// # Example
///
/// ```rust
/// use observers::prelude::*;
///
/// struct Audit;
///
/// impl Observer<String> for Audit {
///   fn handler(&self, name: &EventName) -> Option<Handler<'_, String>> {
///     match name.as_str() {
///       "saved" => Some(Handler::subject(|s: &String| {
///         println!("saved {s}");
///         Ok(())
///       })),
///       "deleted" => Some(Handler::with_event(|_: &String, e: &Event<'_, String>| {
///         println!("deleted with {:?}", e.data());
///         Ok(())
///       })),
///       _ => None,
///     }
///   }
/// }
/// ```
pub trait Observer<S: ?Sized> {
  /// Return the handler for `name`, or `None` when this observer does not
  /// support the event.
  fn handler(&self, name: &EventName) -> Option<Handler<'_, S>>;

  /// Text used by diagnostics to identify this observer.
  fn label(&self) -> Cow<'_, str> { Cow::Borrowed(std::any::type_name::<Self>()) }
}

/// Argument shape selected by an observer for one event.
pub enum Handler<'h, S: ?Sized> {
  Subject(Box<dyn Fn(&S) -> HandlerResult + 'h>),
  SubjectAndEvent(Box<dyn Fn(&S, &Event<'_, S>) -> HandlerResult + 'h>),
}

impl<'h, S: ?Sized> Handler<'h, S> {
  /// A handler receiving only the subject.
  pub fn subject(f: impl Fn(&S) -> HandlerResult + 'h) -> Self { Handler::Subject(Box::new(f)) }

  /// A handler receiving the subject and the structured event.
  pub fn with_event(f: impl Fn(&S, &Event<'_, S>) -> HandlerResult + 'h) -> Self {
    Handler::SubjectAndEvent(Box::new(f))
  }

  /// Invoke the handler. `event` is only built for the two-argument shape.
  pub(crate) fn invoke<'a>(
    &self, subject: &'a S, event: impl FnOnce() -> Event<'a, S>,
  ) -> HandlerResult {
    match self {
      Handler::Subject(f) => f(subject),
      Handler::SubjectAndEvent(f) => f(subject, &event()),
    }
  }
}

// ============================================================================
// ObserverRef - identity handle
// ============================================================================

/// Reference-counted observer handle.
///
/// Identity (for de-duplication, `detach` and `includes`) is the address of the
/// shared observer, so clones of one handle are the same observer while two
/// separately allocated observers never are.
pub struct ObserverRef<S: ?Sized>(Rc<dyn Observer<S>>);

impl<S: ?Sized> ObserverRef<S> {
  /// Allocate a new handle for `observer`.
  pub fn new<O: Observer<S> + 'static>(observer: O) -> Self { Self(Rc::new(observer)) }

  /// Wrap an already type-erased observer.
  pub fn from_dyn(observer: Rc<dyn Observer<S>>) -> Self { Self(observer) }

  #[inline]
  pub fn observer(&self) -> &dyn Observer<S> { &*self.0 }

  #[inline]
  pub(crate) fn addr(&self) -> *const () { Rc::as_ptr(&self.0) as *const () }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.addr() == other.addr() }
}

impl<S: ?Sized> Clone for ObserverRef<S> {
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<S: ?Sized, O: Observer<S> + 'static> From<Rc<O>> for ObserverRef<S> {
  fn from(observer: Rc<O>) -> Self { Self(observer) }
}

impl<S: ?Sized, O: Observer<S> + 'static> From<&Rc<O>> for ObserverRef<S> {
  fn from(observer: &Rc<O>) -> Self { Self(observer.clone()) }
}

impl<S: ?Sized> fmt::Debug for ObserverRef<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0.label()) }
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Observer built from a closure; answers only [`EventName::CALL`].
pub struct FnObserver<F>(F);

/// Observer built from a two-argument closure; answers only
/// [`EventName::CALL`].
pub struct FnEventObserver<F>(F);

/// Adapt `f(subject)` into an observer handle.
pub fn from_fn<S, F>(f: F) -> ObserverRef<S>
where
  S: ?Sized,
  F: Fn(&S) -> HandlerResult + 'static,
{
  ObserverRef::new(FnObserver(f))
}

/// Adapt `f(subject, event)` into an observer handle.
pub fn from_event_fn<S, F>(f: F) -> ObserverRef<S>
where
  S: ?Sized,
  F: Fn(&S, &Event<'_, S>) -> HandlerResult + 'static,
{
  ObserverRef::new(FnEventObserver(f))
}

impl<S: ?Sized, F> Observer<S> for FnObserver<F>
where
  F: Fn(&S) -> HandlerResult,
{
  fn handler(&self, name: &EventName) -> Option<Handler<'_, S>> {
    (*name == EventName::CALL).then(|| Handler::subject(&self.0))
  }

  fn label(&self) -> Cow<'_, str> { Cow::Borrowed(std::any::type_name::<F>()) }
}

impl<S: ?Sized, F> Observer<S> for FnEventObserver<F>
where
  F: Fn(&S, &Event<'_, S>) -> HandlerResult,
{
  fn handler(&self, name: &EventName) -> Option<Handler<'_, S>> {
    (*name == EventName::CALL).then(|| Handler::with_event(&self.0))
  }

  fn label(&self) -> Cow<'_, str> { Cow::Borrowed(std::any::type_name::<F>()) }
}

// ============================================================================
// Handlers - table observer
// ============================================================================

enum Method<S: ?Sized> {
  Subject(Rc<dyn Fn(&S) -> HandlerResult>),
  SubjectAndEvent(Rc<dyn Fn(&S, &Event<'_, S>) -> HandlerResult>),
}

impl<S: ?Sized> Clone for Method<S> {
  fn clone(&self) -> Self {
    match self {
      Method::Subject(f) => Method::Subject(f.clone()),
      Method::SubjectAndEvent(f) => Method::SubjectAndEvent(f.clone()),
    }
  }
}

/// Observer that maps event names to handlers.
///
/// Later registrations for the same name replace earlier ones. [`alias`]
/// exposes an existing handler under a second name.
///
/// ```rust
/// use observers::prelude::*;
///
/// let upcase = Handlers::<String>::new("PrintUpcasedWord")
///   .on("call", |word: &String| {
///     println!("{}", word.to_uppercase());
///     Ok(())
///   })
///   .alias("word_has_been_changed", "call");
///
/// assert!(upcase.responds_to(&"word_has_been_changed".into()));
/// assert!(!upcase.responds_to(&"deleted".into()));
/// ```
///
/// [`alias`]: Handlers::alias
pub struct Handlers<S: ?Sized> {
  label: Cow<'static, str>,
  methods: SmallVec<[(EventName, Method<S>); 4]>,
}

impl<S: ?Sized> Handlers<S> {
  pub fn new(label: impl Into<Cow<'static, str>>) -> Self {
    Self { label: label.into(), methods: SmallVec::new() }
  }

  /// Handle `name` with a subject-only handler.
  pub fn on(
    mut self, name: impl Into<EventName>, f: impl Fn(&S) -> HandlerResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), Method::Subject(Rc::new(f))));
    self
  }

  /// Handle `name` with a handler that also receives the [`Event`].
  pub fn on_event(
    mut self, name: impl Into<EventName>, f: impl Fn(&S, &Event<'_, S>) -> HandlerResult + 'static,
  ) -> Self {
    self.methods.push((name.into(), Method::SubjectAndEvent(Rc::new(f))));
    self
  }

  /// Answer `name` with the handler currently registered for `existing`.
  /// Does nothing if `existing` is not handled.
  pub fn alias(mut self, name: impl Into<EventName>, existing: impl Into<EventName>) -> Self {
    if let Some(method) = self.method(&existing.into()).cloned() {
      self.methods.push((name.into(), method));
    }
    self
  }

  pub fn responds_to(&self, name: &EventName) -> bool { self.method(name).is_some() }

  /// Wrap into a shareable handle.
  pub fn into_ref(self) -> ObserverRef<S>
  where
    S: 'static,
  {
    ObserverRef::new(self)
  }

  fn method(&self, name: &EventName) -> Option<&Method<S>> {
    self
      .methods
      .iter()
      .rev()
      .find(|(n, _)| n == name)
      .map(|(_, m)| m)
  }
}

impl<S: ?Sized> Observer<S> for Handlers<S> {
  fn handler(&self, name: &EventName) -> Option<Handler<'_, S>> {
    self.method(name).map(|method| match method {
      Method::Subject(f) => Handler::subject(move |s: &S| f(s)),
      Method::SubjectAndEvent(f) => Handler::with_event(move |s: &S, e: &Event<'_, S>| f(s, e)),
    })
  }

  fn label(&self) -> Cow<'_, str> { Cow::Borrowed(&self.label) }
}
