//! The per-subject observer hub.
//!
//! [`Observers`] owns the state for one subject: the subscriber registry and
//! the "subject changed" flag. [`ObserverHub`] binds that state to the subject
//! and is the façade callers use. Subjects that embed an [`ObserverSlot`] and
//! implement [`Subject`] get their state created lazily on first access.
//!
//! # Changed gate
//!
//! The flag has two states, clean (`false`, initial) and dirty (`true`):
//!
//! | operation                    | clean            | dirty                    |
//! |------------------------------|------------------|--------------------------|
//! | `mark_changed()`             | → dirty          | → dirty                  |
//! | `set_subject_changed(false)` | → clean          | → clean                  |
//! | `notify` / `call`            | no-op            | broadcast, → clean       |
//! | `*_unconditional`            | broadcast        | broadcast                |
//!
//! A gated dispatch on a hub with no subscribers does nothing and leaves the
//! flag as it is. If a handler fails, the error is returned and the flag stays
//! dirty.

use std::{
  any::Any,
  cell::{Cell, RefCell},
  fmt,
};

use once_cell::unsync::OnceCell;
use tracing::debug;

use crate::{
  broadcast,
  error::{Error, HandlerResult, Result},
  event::{names, EventName, IntoEventNames},
  observer::ObserverRef,
  options::{AttachOptions, OnOptions},
  payload::Payload,
  registry::Registry,
  subscriber::{CallArg, Flatten, Handle, Token},
};

const CALL_EVENT: [EventName; 1] = [EventName::CALL];

// ============================================================================
// Observers - hub state
// ============================================================================

/// Registry and changed flag for one subject.
///
/// The state belongs to a single subject for its whole life: always
/// [`bind`](Self::bind) it to that same subject. Binding it to another value
/// would hand that value to subscribers registered for the first one.
/// [`ObserverSlot`] keeps the pairing by storing the state inside the subject.
///
/// ```rust
/// use observers::prelude::*;
///
/// let subject = String::from("report");
/// let state = Observers::<String>::new();
///
/// let hub = state.bind(&subject);
/// hub.on_fn("saved", |_| Ok(()));
/// assert!(std::ptr::eq(hub.subject(), &subject));
/// assert_eq!(state.bind(&subject).count(), 1);
/// ```
pub struct Observers<S: ?Sized> {
  subject_changed: Cell<bool>,
  registry: RefCell<Registry<S>>,
}

impl<S: ?Sized> Default for Observers<S> {
  fn default() -> Self {
    Self { subject_changed: Cell::new(false), registry: RefCell::new(Registry::new()) }
  }
}

impl<S: ?Sized> Observers<S> {
  pub fn new() -> Self { Self::default() }

  /// State pre-populated with `observers` (default attach options).
  pub fn with_subscribers(observers: impl Flatten<ObserverRef<S>>) -> Self {
    let state = Self::default();
    state
      .registry
      .borrow_mut()
      .attach(observers.into_list(), &AttachOptions::default());
    state
  }

  /// Bind this state to `subject`, which must be the subject it was created
  /// for.
  #[inline]
  pub fn bind<'a>(&'a self, subject: &'a S) -> ObserverHub<'a, S> {
    ObserverHub { subject, state: self }
  }

  #[inline]
  pub fn count(&self) -> usize { self.registry.borrow().len() }

  #[inline]
  pub fn subject_changed(&self) -> bool { self.subject_changed.get() }
}

impl<S: ?Sized> fmt::Debug for Observers<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Observers")
      .field("subject_changed", &self.subject_changed.get())
      .field("subscribers", &self.registry.borrow().handles())
      .finish()
  }
}

// ============================================================================
// ObserverSlot & Subject - lazily created per-subject state
// ============================================================================

/// Storage for a subject's [`Observers`], created on first access.
///
/// Cloning a slot yields an empty slot: observers never follow a cloned
/// subject.
pub struct ObserverSlot<S: ?Sized>(OnceCell<Observers<S>>);

impl<S: ?Sized> ObserverSlot<S> {
  pub const fn new() -> Self { Self(OnceCell::new()) }

  pub fn get_or_init(&self) -> &Observers<S> { self.0.get_or_init(Observers::new) }

  /// Whether the state has been created yet.
  pub fn is_initialized(&self) -> bool { self.0.get().is_some() }
}

impl<S: ?Sized> Default for ObserverSlot<S> {
  fn default() -> Self { Self::new() }
}

impl<S: ?Sized> Clone for ObserverSlot<S> {
  fn clone(&self) -> Self { Self::new() }
}

impl<S: ?Sized> fmt::Debug for ObserverSlot<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0.get() {
      Some(state) => f.debug_tuple("ObserverSlot").field(state).finish(),
      None => f.write_str("ObserverSlot(<uninit>)"),
    }
  }
}

/// A type that carries its own observer hub.
///
/// ```rust
/// use observers::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Person {
///   name: String,
///   slot: ObserverSlot<Person>,
/// }
///
/// impl Subject for Person {
///   fn observer_slot(&self) -> &ObserverSlot<Self> { &self.slot }
/// }
///
/// let person = Person::default();
/// person.observers().attach(from_fn(|p: &Person| {
///   println!("{}", p.name);
///   Ok(())
/// }));
/// assert_eq!(person.observers().count(), 1);
/// ```
pub trait Subject {
  fn observer_slot(&self) -> &ObserverSlot<Self>;

  /// The hub bound to this subject, created on first access.
  fn observers(&self) -> ObserverHub<'_, Self> { ObserverHub::of(self) }
}

// ============================================================================
// ObserverHub - façade
// ============================================================================

/// [`Observers`] bound to its subject.
///
/// Every method runs to completion on the caller's thread. Mutating methods
/// take `&self` so handlers, which receive the subject, can re-enter the hub.
pub struct ObserverHub<'a, S: ?Sized> {
  subject: &'a S,
  state: &'a Observers<S>,
}

impl<S: ?Sized> Clone for ObserverHub<'_, S> {
  fn clone(&self) -> Self { *self }
}

impl<S: ?Sized> Copy for ObserverHub<'_, S> {}

impl<'a, S: Subject + ?Sized> ObserverHub<'a, S> {
  /// Obtain (creating on first access) the hub of `subject`.
  pub fn of(subject: &'a S) -> Self { subject.observer_slot().get_or_init().bind(subject) }
}

impl<'a, S: ?Sized> ObserverHub<'a, S> {
  #[inline]
  pub fn subject(&self) -> &'a S { self.subject }

  // --------------------------------------------------------------------------
  // Registry
  // --------------------------------------------------------------------------

  #[inline]
  pub fn count(&self) -> usize { self.state.count() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.count() == 0 }

  #[inline]
  pub fn has_any(&self) -> bool { !self.is_empty() }

  /// Identity lookup of an observer or callable.
  pub fn includes(&self, handle: impl Into<Handle<S>>) -> bool {
    self.state.registry.borrow().includes(&handle.into())
  }

  /// Attach observers with default options. Already attached observers are
  /// skipped.
  pub fn attach(&self, observers: impl Flatten<ObserverRef<S>>) -> &Self {
    self.attach_with(observers, AttachOptions::default())
  }

  pub fn attach_with(
    &self, observers: impl Flatten<ObserverRef<S>>, options: AttachOptions,
  ) -> &Self {
    let mut registry = self.state.registry.borrow_mut();
    let added = registry.attach(observers.into_list(), &options);
    debug!(added, total = registry.len(), once = options.once, "attached observers");
    self
  }

  /// Remove every subscriber matching one of `handles`.
  pub fn detach(&self, handles: impl Flatten<Handle<S>>) -> &Self {
    let mut registry = self.state.registry.borrow_mut();
    let removed = registry.detach(handles.into_list());
    debug!(removed, total = registry.len(), "detached subscribers");
    self
  }

  /// Bind a callable to one event. Invalid records are silently ignored.
  pub fn on(&self, options: OnOptions<S>) -> &Self {
    self.state.registry.borrow_mut().on(options, false);
    self
  }

  /// Like [`on`](Self::on), removed after the first broadcast it fires in.
  pub fn once(&self, options: OnOptions<S>) -> &Self {
    self.state.registry.borrow_mut().on(options, true);
    self
  }

  /// Bind a closure to `event`; the closure receives the [`Event`].
  ///
  /// [`Event`]: crate::event::Event
  pub fn on_fn(
    &self, event: impl Into<EventName>, f: impl Fn(CallArg<'_, S>) -> HandlerResult + 'static,
  ) -> &Self {
    self.on(OnOptions::call(event, f))
  }

  pub fn once_fn(
    &self, event: impl Into<EventName>, f: impl Fn(CallArg<'_, S>) -> HandlerResult + 'static,
  ) -> &Self {
    self.once(OnOptions::call(event, f))
  }

  /// Event-name tokens drop the callables bound to that event; handle tokens
  /// drop that subscriber.
  pub fn off(&self, tokens: impl Flatten<Token<S>>) -> &Self {
    let mut registry = self.state.registry.borrow_mut();
    let removed = registry.off(tokens.into_list());
    debug!(removed, total = registry.len(), "off");
    self
  }

  // --------------------------------------------------------------------------
  // Changed gate
  // --------------------------------------------------------------------------

  #[inline]
  pub fn subject_changed(&self) -> bool { self.state.subject_changed.get() }

  pub fn set_subject_changed(&self, changed: bool) -> &Self {
    self.state.subject_changed.set(changed);
    self
  }

  /// Runtime-checked variant of [`set_subject_changed`] for dynamically typed
  /// callers.
  ///
  /// # Errors
  ///
  /// [`Error::InvalidBoolean`] if `value` is not a `bool`.
  ///
  /// [`set_subject_changed`]: Self::set_subject_changed
  pub fn try_set_subject_changed(&self, value: &dyn Any) -> Result<&Self> {
    let changed = value
      .downcast_ref::<bool>()
      .copied()
      .ok_or(Error::InvalidBoolean)?;
    Ok(self.set_subject_changed(changed))
  }

  pub fn mark_changed(&self) -> &Self { self.set_subject_changed(true) }

  // --------------------------------------------------------------------------
  // Dispatch
  // --------------------------------------------------------------------------

  /// Broadcast `events` if the subject was marked changed, then mark it clean.
  ///
  /// # Errors
  ///
  /// [`Error::NoEvents`] if `events` is empty, or the first handler failure.
  pub fn notify(&self, events: impl IntoEventNames) -> Result<&Self> {
    self.broadcast_if_subject_changed(&names::fetch_required(events)?, None)
  }

  /// [`notify`](Self::notify) with call-site data exposed as
  /// [`Event::data`](crate::event::Event::data).
  pub fn notify_with(&self, events: impl IntoEventNames, data: Payload) -> Result<&Self> {
    self.broadcast_if_subject_changed(&names::fetch_required(events)?, Some(&data))
  }

  /// Broadcast `events` regardless of the changed flag, which is left as is.
  pub fn notify_unconditional(&self, events: impl IntoEventNames) -> Result<&Self> {
    self.broadcast(&names::fetch_required(events)?, None)
  }

  pub fn notify_unconditional_with(
    &self, events: impl IntoEventNames, data: Payload,
  ) -> Result<&Self> {
    self.broadcast(&names::fetch_required(events)?, Some(&data))
  }

  /// Like [`notify`](Self::notify) but broadcasts `call` when `events` is
  /// empty.
  pub fn call(&self, events: impl IntoEventNames) -> Result<&Self> {
    self.broadcast_if_subject_changed(&names::normalize_or(events, &CALL_EVENT), None)
  }

  pub fn call_with(&self, events: impl IntoEventNames, data: Payload) -> Result<&Self> {
    self.broadcast_if_subject_changed(&names::normalize_or(events, &CALL_EVENT), Some(&data))
  }

  /// Like [`notify_unconditional`](Self::notify_unconditional) but broadcasts
  /// `call` when `events` is empty.
  pub fn call_unconditional(&self, events: impl IntoEventNames) -> Result<&Self> {
    self.broadcast(&names::normalize_or(events, &CALL_EVENT), None)
  }

  pub fn call_unconditional_with(
    &self, events: impl IntoEventNames, data: Payload,
  ) -> Result<&Self> {
    self.broadcast(&names::normalize_or(events, &CALL_EVENT), Some(&data))
  }

  fn broadcast_if_subject_changed(
    &self, events: &[EventName], data: Option<&Payload>,
  ) -> Result<&Self> {
    if self.is_empty() {
      return Ok(self);
    }
    if !self.subject_changed() {
      debug!(events = ?events, "subject unchanged, skipping broadcast");
      return Ok(self);
    }
    self.broadcast(events, data)?;
    self.set_subject_changed(false);
    Ok(self)
  }

  fn broadcast(&self, events: &[EventName], data: Option<&Payload>) -> Result<&Self> {
    broadcast::dispatch(&self.state.registry, self.subject, data, events)?;
    Ok(self)
  }
}

impl<S: ?Sized + fmt::Debug> ObserverHub<'_, S> {
  /// Diagnostic dump of the subject, the changed flag and the subscriber
  /// labels. Not a stable format.
  pub fn inspect(&self) -> String {
    let labels: Vec<String> = self
      .state
      .registry
      .borrow()
      .iter()
      .map(|subscriber| subscriber.label())
      .collect();
    format!(
      "#<Observers @subject={:?} @subject_changed={} @subscribers=[{}]>",
      self.subject,
      self.subject_changed(),
      labels.join(", ")
    )
  }
}

impl<S: ?Sized + fmt::Debug> fmt::Debug for ObserverHub<'_, S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ObserverHub")
      .field("subject", &self.subject)
      .field("subject_changed", &self.subject_changed())
      .field("subscribers", &self.state.registry.borrow().handles())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use super::*;
  use crate::{
    error::HandlerError,
    observer::{from_fn, Handlers},
    subscriber::Callable,
  };

  type Log = Rc<RefCell<Vec<String>>>;

  #[derive(Debug, Default)]
  struct Counter {
    slot: ObserverSlot<Counter>,
  }

  impl Subject for Counter {
    fn observer_slot(&self) -> &ObserverSlot<Self> { &self.slot }
  }

  fn tally(log: &Log) -> ObserverRef<Counter> {
    let log = log.clone();
    from_fn(move |_: &Counter| {
      log.borrow_mut().push("call".into());
      Ok(())
    })
  }

  #[test]
  fn hub_is_created_lazily_and_kept() {
    let counter = Counter::default();
    assert!(!counter.slot.is_initialized());

    counter.observers().attach(tally(&Log::default()));
    assert!(counter.slot.is_initialized());
    assert_eq!(ObserverHub::of(&counter).count(), 1);
  }

  #[test]
  fn cloned_slots_start_empty() {
    let slot = ObserverSlot::<Counter>::new();
    slot.get_or_init().subject_changed.set(true);

    assert!(!slot.clone().is_initialized());
  }

  #[test]
  fn gated_notify_fires_once_per_change() {
    let log = Log::default();
    let counter = Counter::default();
    let hub = counter.observers();
    hub.attach(tally(&log));

    hub.notify("call").unwrap();
    assert!(log.borrow().is_empty());

    hub.mark_changed().mark_changed();
    hub.notify("call").unwrap().notify("call").unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert!(!hub.subject_changed());
  }

  #[test]
  fn unconditional_dispatch_leaves_the_flag_alone() {
    let log = Log::default();
    let counter = Counter::default();
    let hub = counter.observers();
    hub.attach(tally(&log));

    hub.notify_unconditional("call").unwrap();
    hub.call_unconditional(()).unwrap();
    assert_eq!(log.borrow().len(), 2);
    assert!(!hub.subject_changed());

    hub.mark_changed();
    hub.call_unconditional(()).unwrap();
    assert!(hub.subject_changed());
    assert_eq!(log.borrow().len(), 3);
  }

  #[test]
  fn call_defaults_to_the_call_event() {
    let log = Log::default();
    let counter = Counter::default();
    let hub = counter.observers();
    hub.attach(tally(&log));

    hub.mark_changed();
    hub.call(()).unwrap();
    hub.mark_changed();
    hub.call(None::<&str>).unwrap();
    assert_eq!(log.borrow().len(), 2);

    assert!(matches!(hub.notify(()), Err(Error::NoEvents)));
    assert!(matches!(hub.notify_unconditional(vec![None::<&str>]), Err(Error::NoEvents)));
  }

  #[test]
  fn empty_hub_keeps_the_subject_dirty() {
    let counter = Counter::default();
    let hub = counter.observers();

    hub.mark_changed();
    hub.notify("call").unwrap();
    assert!(hub.subject_changed());
  }

  #[test]
  fn failing_handler_keeps_the_subject_dirty() {
    let counter = Counter::default();
    let hub = counter.observers();
    hub.attach(from_fn(|_: &Counter| Err(HandlerError::from("nope"))));

    hub.mark_changed();
    let err = hub.notify("call").unwrap_err();
    assert_eq!(err.as_label(), "handler_failed");
    assert!(hub.subject_changed());
  }

  #[test]
  fn changed_flag_is_strictly_boolean() {
    let counter = Counter::default();
    let hub = counter.observers();

    assert!(hub.try_set_subject_changed(&true).unwrap().subject_changed());
    assert!(!hub.try_set_subject_changed(&false).unwrap().subject_changed());

    let values: [&dyn Any; 3] = [&1_i32, &"true", &Some(true)];
    for value in values {
      let err = hub.try_set_subject_changed(value).unwrap_err();
      assert!(matches!(err, Error::InvalidBoolean));
      assert_eq!(err.to_string(), "expected a boolean (true, false)");
    }
  }

  #[test]
  fn on_with_invalid_record_is_a_silent_no_op() {
    let counter = Counter::default();
    let hub = counter.observers();

    hub
      .on(OnOptions::default())
      .on(OnOptions::call("not an identifier", |_| Ok(())));
    assert!(hub.is_empty());

    hub.on_fn("saved", |_| Ok(())).once_fn("saved", |_| Ok(()));
    assert_eq!(hub.count(), 2);
    assert!(hub.has_any());
  }

  #[test]
  fn includes_and_detach_by_callable() {
    let counter = Counter::default();
    let hub = counter.observers();
    let callable = Callable::new(|_| Ok(()));
    let observer = tally(&Log::default());

    hub
      .attach(&observer)
      .on(OnOptions::new("saved", callable.clone()));
    assert!(hub.includes(&callable));
    assert!(hub.includes(&observer));

    hub.detach(vec![Handle::from(&callable), Handle::from(&observer)]);
    assert!(hub.is_empty());
  }

  #[test]
  fn standalone_state_with_initial_subscribers() {
    let log = Log::default();
    let subject = String::from("plain");
    let printer = Handlers::new("Printer")
      .on("call", {
        let log = log.clone();
        move |s: &String| {
          log.borrow_mut().push(s.clone());
          Ok(())
        }
      })
      .into_ref();
    let state = Observers::with_subscribers(vec![Some(printer), None]);

    state.bind(&subject).call_unconditional(()).unwrap();
    assert_eq!(*log.borrow(), vec!["plain"]);
    assert_eq!(
      state.bind(&subject).inspect(),
      "#<Observers @subject=\"plain\" @subject_changed=false @subscribers=[Printer]>"
    );
  }

  #[test]
  fn inspect_without_subscribers() {
    let subject = String::from("hello");
    let state = Observers::<String>::new();

    assert_eq!(
      state.bind(&subject).inspect(),
      "#<Observers @subject=\"hello\" @subject_changed=false @subscribers=[]>"
    );
  }
}
