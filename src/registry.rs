use std::rc::Rc;

use smallvec::SmallVec;
use tracing::debug;

use crate::{
  observer::ObserverRef,
  options::{AttachOptions, OnOptions},
  subscriber::{Handle, Subscriber, Token},
};

/// Registry entry: a per-registry unique id plus the shared subscriber.
pub(crate) type Entry<S> = (usize, Rc<Subscriber<S>>);

/// Snapshot of the registry taken at the start of a broadcast.
pub(crate) type Snapshot<S> = SmallVec<[Entry<S>; 4]>;

/// Ordered set of subscribers attached to one subject.
///
/// # Design
///
/// - **Registration order**: entries are appended and never reordered, so the
///   broadcast order is the registration order.
/// - **Entry ids**: every entry gets a unique id when it is added. Removal of
///   one-shot subscribers during a broadcast goes through the id, so with
///   duplication allowed only the entries that actually fired are removed.
/// - **Shared entries**: subscribers are stored behind `Rc` so a broadcast can
///   work on a cheap snapshot and never hold a borrow of the registry while a
///   handler runs.
/// - **SmallVec**: most subjects have one or two subscribers, which then live
///   inline without a heap allocation.
pub struct Registry<S: ?Sized> {
  next_id: usize,
  items: SmallVec<[Entry<S>; 2]>,
}

impl<S: ?Sized> Default for Registry<S> {
  fn default() -> Self { Self { next_id: 0, items: SmallVec::new() } }
}

impl<S: ?Sized> Registry<S> {
  #[inline]
  pub fn new() -> Self { Self::default() }

  /// Append a subscriber and return its entry id.
  #[inline]
  pub fn add(&mut self, subscriber: Subscriber<S>) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.items.push((id, Rc::new(subscriber)));
    id
  }

  /// Append an [`Subscriber::Observer`] for each observer not already present
  /// (unless duplication is allowed). Returns how many entries were added.
  pub fn attach<I>(&mut self, observers: I, options: &AttachOptions) -> usize
  where
    I: IntoIterator<Item = ObserverRef<S>>,
  {
    let mut added = 0;
    for observer in observers {
      if !options.allow_duplication && self.includes_observer(&observer) {
        debug!(observer = ?observer, "observer already attached, skipping");
        continue;
      }
      self.add(Subscriber::Observer {
        observer,
        context: options.context.clone(),
        once: options.once,
      });
      added += 1;
    }
    added
  }

  /// Register a callable bound to one event. Invalid records are ignored and
  /// `false` is returned.
  pub fn on(&mut self, options: OnOptions<S>, once: bool) -> bool {
    let OnOptions { event, call, with, context } = options;
    let (Some(event), Some(callable)) = (event, call) else {
      debug!("on: missing event or callable, nothing registered");
      return false;
    };
    if !event.is_valid() {
      debug!(event = %event, "on: invalid event name, nothing registered");
      return false;
    }
    self.add(Subscriber::Callable { event, callable, with, context, once });
    true
  }

  /// Remove every entry whose identity matches one of `handles`. Returns how
  /// many entries were removed.
  pub fn detach<I>(&mut self, handles: I) -> usize
  where
    I: IntoIterator<Item = Handle<S>>,
  {
    let before = self.items.len();
    for handle in handles {
      let addr = handle.addr();
      self
        .items
        .retain(|(_, subscriber)| subscriber.addr() != addr);
    }
    before - self.items.len()
  }

  /// Remove callables bound to event-name tokens and subscribers matching
  /// handle tokens. Returns how many entries were removed.
  pub fn off<I>(&mut self, tokens: I) -> usize
  where
    I: IntoIterator<Item = Token<S>>,
  {
    let before = self.items.len();
    for token in tokens {
      match token {
        Token::Event(name) => self.items.retain(|(_, subscriber)| {
          !matches!(&**subscriber, Subscriber::Callable { event, .. } if *event == name)
        }),
        Token::Handle(handle) => {
          self.detach([handle]);
        }
      }
    }
    before - self.items.len()
  }

  /// Identity lookup of an observer or callable.
  pub fn includes(&self, handle: &Handle<S>) -> bool {
    let addr = handle.addr();
    self
      .items
      .iter()
      .any(|(_, subscriber)| subscriber.addr() == addr)
  }

  fn includes_observer(&self, observer: &ObserverRef<S>) -> bool {
    let addr = observer.addr();
    self.items.iter().any(|(_, subscriber)| {
      matches!(&**subscriber, Subscriber::Observer { .. }) && subscriber.addr() == addr
    })
  }

  /// Remove an entry by id.
  pub(crate) fn remove(&mut self, id: usize) -> Option<Rc<Subscriber<S>>> {
    self
      .items
      .iter()
      .position(|(i, _)| *i == id)
      .map(|pos| self.items.remove(pos).1)
  }

  #[inline]
  pub fn len(&self) -> usize { self.items.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Iterate over subscribers in registration order.
  #[inline]
  pub fn iter(&self) -> impl Iterator<Item = &Subscriber<S>> {
    self.items.iter().map(|(_, subscriber)| &**subscriber)
  }

  #[inline]
  pub(crate) fn snapshot(&self) -> Snapshot<S> { self.items.iter().cloned().collect() }

  /// Handles of all subscribers, in registration order.
  pub fn handles(&self) -> Vec<Handle<S>> { self.iter().map(Subscriber::handle).collect() }
}
