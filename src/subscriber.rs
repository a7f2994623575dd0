//! Subscriber variants stored by the registry, plus the identity handles used
//! to look them up.

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
  error::HandlerResult,
  event::{Event, EventName},
  observer::{Observer, ObserverRef},
  payload::Payload,
};

// ============================================================================
// Callable
// ============================================================================

/// What a [`Callable`] receives when its event fires.
pub enum CallArg<'a, S: ?Sized> {
  /// A literal `with` value, or the result of a `with` producer.
  Value(Payload),
  /// No `with` source was registered.
  Event(Event<'a, S>),
}

impl<'a, S: ?Sized> CallArg<'a, S> {
  pub fn payload(&self) -> Option<&Payload> {
    match self {
      CallArg::Value(payload) => Some(payload),
      CallArg::Event(_) => None,
    }
  }

  /// Typed view of a [`CallArg::Value`].
  pub fn value<T: 'static>(&self) -> Option<&T> { self.payload().and_then(Payload::get::<T>) }

  pub fn event(&self) -> Option<&Event<'a, S>> {
    match self {
      CallArg::Event(event) => Some(event),
      CallArg::Value(_) => None,
    }
  }
}

/// Reference-counted function bound to one event through `on`/`once`.
///
/// Identity is the shared allocation: keep a clone to `detach` it later.
pub struct Callable<S: ?Sized> {
  f: Rc<dyn Fn(CallArg<'_, S>) -> HandlerResult>,
  label: &'static str,
}

impl<S: ?Sized> Callable<S> {
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(CallArg<'_, S>) -> HandlerResult + 'static,
  {
    Self { f: Rc::new(f), label: std::any::type_name::<F>() }
  }

  #[inline]
  pub fn call(&self, arg: CallArg<'_, S>) -> HandlerResult { (self.f)(arg) }

  #[inline]
  pub(crate) fn addr(&self) -> *const () { Rc::as_ptr(&self.f) as *const () }

  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { self.addr() == other.addr() }

  pub fn label(&self) -> &'static str { self.label }
}

impl<S: ?Sized> Clone for Callable<S> {
  fn clone(&self) -> Self { Self { f: self.f.clone(), label: self.label } }
}

impl<S: ?Sized> fmt::Debug for Callable<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label) }
}

/// Source of the argument handed to a [`Callable`].
pub enum ArgSource<S: ?Sized> {
  /// Pass the [`Event`] itself.
  None,
  /// Pass this value verbatim.
  Value(Payload),
  /// Pass the result of applying the producer to the [`Event`].
  Producer(Rc<dyn Fn(&Event<'_, S>) -> Payload>),
}

impl<S: ?Sized> ArgSource<S> {
  pub fn value<T: 'static>(value: T) -> Self { ArgSource::Value(Payload::new(value)) }

  pub fn producer(f: impl Fn(&Event<'_, S>) -> Payload + 'static) -> Self {
    ArgSource::Producer(Rc::new(f))
  }

  /// Resolve the argument for one invocation; the event is only built when
  /// the source needs it.
  pub(crate) fn resolve<'a>(&self, event: impl FnOnce() -> Event<'a, S>) -> CallArg<'a, S> {
    match self {
      ArgSource::Value(payload) => CallArg::Value(payload.clone()),
      ArgSource::Producer(produce) => CallArg::Value(produce(&event())),
      ArgSource::None => CallArg::Event(event()),
    }
  }
}

impl<S: ?Sized> Default for ArgSource<S> {
  fn default() -> Self { ArgSource::None }
}

impl<S: ?Sized> Clone for ArgSource<S> {
  fn clone(&self) -> Self {
    match self {
      ArgSource::None => ArgSource::None,
      ArgSource::Value(payload) => ArgSource::Value(payload.clone()),
      ArgSource::Producer(f) => ArgSource::Producer(f.clone()),
    }
  }
}

impl<S: ?Sized> fmt::Debug for ArgSource<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArgSource::None => f.write_str("None"),
      ArgSource::Value(payload) => f.debug_tuple("Value").field(payload).finish(),
      ArgSource::Producer(_) => f.write_str("Producer(..)"),
    }
  }
}

// ============================================================================
// Subscriber
// ============================================================================

/// One registry entry.
pub enum Subscriber<S: ?Sized> {
  /// An observer object, matched against every broadcast event name.
  Observer { observer: ObserverRef<S>, context: Option<Payload>, once: bool },
  /// A callable bound to exactly one event name.
  Callable {
    event: EventName,
    callable: Callable<S>,
    with: ArgSource<S>,
    context: Option<Payload>,
    once: bool,
  },
}

impl<S: ?Sized> Subscriber<S> {
  #[inline]
  pub fn is_once(&self) -> bool {
    match self {
      Subscriber::Observer { once, .. } | Subscriber::Callable { once, .. } => *once,
    }
  }

  /// Identity used for de-duplication and removal: the observer or the
  /// callable, never the whole entry.
  #[inline]
  pub(crate) fn addr(&self) -> *const () {
    match self {
      Subscriber::Observer { observer, .. } => observer.addr(),
      Subscriber::Callable { callable, .. } => callable.addr(),
    }
  }

  pub fn handle(&self) -> Handle<S> {
    match self {
      Subscriber::Observer { observer, .. } => Handle::Observer(observer.clone()),
      Subscriber::Callable { callable, .. } => Handle::Callable(callable.clone()),
    }
  }

  pub fn label(&self) -> String {
    match self {
      Subscriber::Observer { observer, .. } => observer.observer().label().into_owned(),
      Subscriber::Callable { callable, .. } => callable.label().to_owned(),
    }
  }
}

// ============================================================================
// Handles and tokens
// ============================================================================

/// Identity of an attached subscriber.
pub enum Handle<S: ?Sized> {
  Observer(ObserverRef<S>),
  Callable(Callable<S>),
}

impl<S: ?Sized> Handle<S> {
  #[inline]
  pub(crate) fn addr(&self) -> *const () {
    match self {
      Handle::Observer(observer) => observer.addr(),
      Handle::Callable(callable) => callable.addr(),
    }
  }
}

impl<S: ?Sized> Clone for Handle<S> {
  fn clone(&self) -> Self {
    match self {
      Handle::Observer(observer) => Handle::Observer(observer.clone()),
      Handle::Callable(callable) => Handle::Callable(callable.clone()),
    }
  }
}

impl<S: ?Sized> fmt::Debug for Handle<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Handle::Observer(observer) => fmt::Debug::fmt(observer, f),
      Handle::Callable(callable) => fmt::Debug::fmt(callable, f),
    }
  }
}

impl<S: ?Sized> From<ObserverRef<S>> for Handle<S> {
  fn from(observer: ObserverRef<S>) -> Self { Handle::Observer(observer) }
}

impl<S: ?Sized> From<&ObserverRef<S>> for Handle<S> {
  fn from(observer: &ObserverRef<S>) -> Self { Handle::Observer(observer.clone()) }
}

impl<S: ?Sized> From<Callable<S>> for Handle<S> {
  fn from(callable: Callable<S>) -> Self { Handle::Callable(callable) }
}

impl<S: ?Sized> From<&Callable<S>> for Handle<S> {
  fn from(callable: &Callable<S>) -> Self { Handle::Callable(callable.clone()) }
}

impl<S: ?Sized, O: Observer<S> + 'static> From<&Rc<O>> for Handle<S> {
  fn from(observer: &Rc<O>) -> Self { Handle::Observer(observer.into()) }
}

/// Argument of `off`: an event name drops every callable bound to it, a handle
/// drops that subscriber.
pub enum Token<S: ?Sized> {
  Event(EventName),
  Handle(Handle<S>),
}

// ============================================================================
// Flatten - nested, nil-tolerant input lists
// ============================================================================

/// Input accepted wherever a list of observers, handles or tokens is expected:
/// a single item, `Option`s (where `None` is skipped) and arbitrarily nested
/// `Vec`s or arrays of those.
pub trait Flatten<T> {
  fn flatten_into(self, out: &mut SmallVec<[T; 2]>);

  fn into_list(self) -> SmallVec<[T; 2]>
  where
    Self: Sized,
  {
    let mut out = SmallVec::new();
    self.flatten_into(&mut out);
    out
  }
}

impl<T, I: Flatten<T>> Flatten<T> for Option<I> {
  fn flatten_into(self, out: &mut SmallVec<[T; 2]>) {
    if let Some(items) = self {
      items.flatten_into(out);
    }
  }
}

impl<T, I: Flatten<T>> Flatten<T> for Vec<I> {
  fn flatten_into(self, out: &mut SmallVec<[T; 2]>) {
    self
      .into_iter()
      .for_each(|items| items.flatten_into(out));
  }
}

impl<T, I: Flatten<T>, const N: usize> Flatten<T> for [I; N] {
  fn flatten_into(self, out: &mut SmallVec<[T; 2]>) {
    self
      .into_iter()
      .for_each(|items| items.flatten_into(out));
  }
}

macro_rules! impl_flatten_leaf {
  ($item:ident <$s:ident> for $ty:ty => |$v:ident| $conv:expr) => {
    impl<$s: ?Sized> Flatten<$item<$s>> for $ty {
      #[inline]
      fn flatten_into(self, out: &mut SmallVec<[$item<$s>; 2]>) {
        let $v = self;
        out.push($conv);
      }
    }
  };
}

impl_flatten_leaf!(ObserverRef<S> for ObserverRef<S> => |o| o);
impl_flatten_leaf!(ObserverRef<S> for &ObserverRef<S> => |o| o.clone());

impl_flatten_leaf!(Handle<S> for Handle<S> => |h| h);
impl_flatten_leaf!(Handle<S> for ObserverRef<S> => |o| Handle::Observer(o));
impl_flatten_leaf!(Handle<S> for &ObserverRef<S> => |o| Handle::Observer(o.clone()));
impl_flatten_leaf!(Handle<S> for Callable<S> => |c| Handle::Callable(c));
impl_flatten_leaf!(Handle<S> for &Callable<S> => |c| Handle::Callable(c.clone()));

impl_flatten_leaf!(Token<S> for Token<S> => |t| t);
impl_flatten_leaf!(Token<S> for Handle<S> => |h| Token::Handle(h));
impl_flatten_leaf!(Token<S> for ObserverRef<S> => |o| Token::Handle(Handle::Observer(o)));
impl_flatten_leaf!(Token<S> for &ObserverRef<S> => |o| Token::Handle(Handle::Observer(o.clone())));
impl_flatten_leaf!(Token<S> for Callable<S> => |c| Token::Handle(Handle::Callable(c)));
impl_flatten_leaf!(Token<S> for &Callable<S> => |c| Token::Handle(Handle::Callable(c.clone())));
impl_flatten_leaf!(Token<S> for EventName => |e| Token::Event(e));
impl_flatten_leaf!(Token<S> for &'static str => |e| Token::Event(e.into()));
impl_flatten_leaf!(Token<S> for String => |e| Token::Event(e.into()));

impl<S: ?Sized, O: Observer<S> + 'static> Flatten<ObserverRef<S>> for Rc<O> {
  fn flatten_into(self, out: &mut SmallVec<[ObserverRef<S>; 2]>) { out.push(self.into()); }
}

impl<S: ?Sized, O: Observer<S> + 'static> Flatten<Handle<S>> for Rc<O> {
  fn flatten_into(self, out: &mut SmallVec<[Handle<S>; 2]>) {
    out.push(Handle::Observer(self.into()));
  }
}

impl<S: ?Sized, O: Observer<S> + 'static> Flatten<Token<S>> for Rc<O> {
  fn flatten_into(self, out: &mut SmallVec<[Token<S>; 2]>) {
    out.push(Token::Handle(Handle::Observer(self.into())));
  }
}
