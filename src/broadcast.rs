//! Broadcast of event names to a registry.
//!
//! [`dispatch`] walks event names in call order (outer loop) and, for each,
//! the subscribers in registration order (inner loop). Matching and one-shot
//! bookkeeping are kept apart: a one-shot subscriber leaves the registry the
//! first time it fires, yet may still fire for every event name of that same
//! call.

use std::cell::RefCell;

use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::{
  error::{Error, Result},
  event::{Event, EventName},
  payload::Payload,
  registry::Registry,
  subscriber::Subscriber,
};

/// Invoke every subscriber of `registry` that matches one of `event_names`.
///
/// - Observers fire when they return a handler for the event name; callables
///   fire when their bound event name equals it.
/// - The subscriber list is snapshotted once, before the first invocation, and
///   the registry is not borrowed while handlers run. Handlers may therefore
///   attach or detach; such changes take effect from the next dispatch.
/// - The first handler error aborts the dispatch and is returned as
///   [`Error::Handler`]. Subscribers later in the order are not invoked.
/// - A one-shot subscriber is removed from the registry right before its first
///   invocation, so nested dispatches started by handlers never see it again.
///   The dispatch that removed it keeps invoking it for its remaining event
///   names. A failing one-shot subscriber counts as fired.
pub fn dispatch<S: ?Sized>(
  registry: &RefCell<Registry<S>>, subject: &S, data: Option<&Payload>, event_names: &[EventName],
) -> Result<()> {
  let snapshot = {
    let registry = registry.borrow();
    if registry.is_empty() {
      return Ok(());
    }
    registry.snapshot()
  };

  let mut one_shot = OneShot { registry, fired: SmallVec::new() };

  for name in event_names {
    for (id, subscriber) in snapshot.iter() {
      match &**subscriber {
        Subscriber::Observer { observer, context, once } => {
          let Some(handler) = observer.observer().handler(name) else { continue };
          if !one_shot.admit(*id, *once) {
            continue;
          }
          trace!(event = %name, observer = ?observer, "notify observer");
          handler
            .invoke(subject, || Event::new(name.clone(), subject, context.as_ref(), data))
            .map_err(Error::Handler)?;
        }
        Subscriber::Callable { event, callable, with, context, once } => {
          if event != name || !one_shot.admit(*id, *once) {
            continue;
          }
          trace!(event = %name, callable = ?callable, "notify callable");
          let arg = with.resolve(|| Event::new(name.clone(), subject, context.as_ref(), data));
          callable.call(arg).map_err(Error::Handler)?;
        }
      }
    }
  }

  Ok(())
}

/// One-shot subscribers fired by the running dispatch.
struct OneShot<'r, S: ?Sized> {
  registry: &'r RefCell<Registry<S>>,
  fired: SmallVec<[usize; 4]>,
}

impl<S: ?Sized> OneShot<'_, S> {
  /// Whether entry `id` may fire now. The first firing of a one-shot entry
  /// takes it out of the registry; an entry no longer registered (fired by
  /// another dispatch, or detached) is skipped.
  fn admit(&mut self, id: usize, once: bool) -> bool {
    if !once || self.fired.contains(&id) {
      return true;
    }
    if self.registry.borrow_mut().remove(id).is_none() {
      trace!(id, "one-shot subscriber no longer registered, skipping");
      return false;
    }
    debug!(id, "one-shot subscriber fired, removed");
    self.fired.push(id);
    true
  }
}

#[cfg(test)]
mod tests {
  use std::rc::Rc;

  use bencher::{benchmark_group, Bencher};

  use super::*;
  use crate::{
    error::{HandlerError, HandlerResult},
    observer::{Handlers, ObserverRef},
    options::{AttachOptions, OnOptions},
    subscriber::CallArg,
  };

  type Log = Rc<RefCell<Vec<String>>>;

  fn recorder(log: &Log, label: &'static str, events: &[&'static str]) -> ObserverRef<String> {
    let mut table = Handlers::new(label);
    for &event in events {
      let log = log.clone();
      table = table.on(event, move |s: &String| {
        log.borrow_mut().push(format!("{label}:{event}:{s}"));
        Ok(())
      });
    }
    table.into_ref()
  }

  fn names(names: &[&'static str]) -> Vec<EventName> {
    names.iter().map(|&n| EventName::from(n)).collect()
  }

  #[test]
  fn outer_loop_is_event_names_inner_is_registration_order() {
    let log = Log::default();
    let registry = RefCell::new(Registry::new());
    registry.borrow_mut().attach(
      [recorder(&log, "a", &["x", "y"]), recorder(&log, "b", &["y", "x"])],
      &AttachOptions::default(),
    );

    dispatch(&registry, &String::from("s"), None, &names(&["y", "x"])).unwrap();

    assert_eq!(*log.borrow(), vec!["a:y:s", "b:y:s", "a:x:s", "b:x:s"]);
  }

  #[test]
  fn one_shot_fires_for_every_event_name_of_the_call() {
    let log = Log::default();
    let registry = RefCell::new(Registry::new());
    registry
      .borrow_mut()
      .attach([recorder(&log, "o", &["a", "b"])], &AttachOptions::default().once());

    dispatch(&registry, &String::from("s"), None, &names(&["a", "b"])).unwrap();
    assert_eq!(*log.borrow(), vec!["o:a:s", "o:b:s"]);
    assert!(registry.borrow().is_empty());

    dispatch(&registry, &String::from("s"), None, &names(&["a", "b"])).unwrap();
    assert_eq!(log.borrow().len(), 2);
  }

  #[test]
  fn unmatched_one_shot_subscribers_stay() {
    let log = Log::default();
    let registry = RefCell::new(Registry::new());
    registry
      .borrow_mut()
      .attach([recorder(&log, "o", &["a"])], &AttachOptions::default().once());

    dispatch(&registry, &String::new(), None, &names(&["b"])).unwrap();
    assert_eq!(registry.borrow().len(), 1);
  }

  #[test]
  fn two_argument_handlers_receive_the_event() {
    let seen = Rc::new(RefCell::new(vec![]));
    let c_seen = seen.clone();
    let registry = RefCell::new(Registry::new());
    let observer = Handlers::new("Evented")
      .on_event("saved", move |_: &String, e: &Event<'_, String>| {
        c_seen.borrow_mut().push((
          e.name().to_string(),
          e.subject().clone(),
          e.context_as::<&str>().copied(),
          e.data_as::<i32>().copied(),
        ));
        Ok(())
      })
      .into_ref();
    registry
      .borrow_mut()
      .attach([observer], &AttachOptions::default().context("ctx"));

    let data = Payload::new(5_i32);
    dispatch(&registry, &String::from("subj"), Some(&data), &names(&["saved"])).unwrap();

    assert_eq!(
      *seen.borrow(),
      vec![("saved".to_string(), "subj".to_string(), Some("ctx"), Some(5))]
    );
  }

  #[test]
  fn callable_argument_resolution() {
    let seen = Rc::new(RefCell::new(vec![]));
    let registry = RefCell::new(Registry::<String>::new());
    fn push(seen: &Rc<RefCell<Vec<String>>>) -> impl Fn(CallArg<'_, String>) -> HandlerResult {
      let seen = seen.clone();
      move |arg: CallArg<'_, String>| {
        let text = match (arg.value::<&str>(), arg.value::<String>(), arg.event()) {
          (Some(v), ..) => format!("literal:{v}"),
          (_, Some(v), _) => format!("produced:{v}"),
          (.., Some(e)) => format!("event:{}:{}", e.name(), e.subject()),
          _ => unreachable!(),
        };
        seen.borrow_mut().push(text);
        Ok(())
      }
    }

    let mut r = registry.borrow_mut();
    r.on(OnOptions::call("go", push(&seen)).with_value("file.txt"), false);
    r.on(
      OnOptions::call("go", push(&seen))
        .with_producer(|e: &Event<'_, String>| Payload::new(e.subject().to_uppercase())),
      false,
    );
    r.on(OnOptions::call("go", push(&seen)), false);
    r.on(OnOptions::call("other", push(&seen)), false);
    drop(r);

    dispatch(&registry, &String::from("abc"), None, &names(&["go"])).unwrap();

    assert_eq!(*seen.borrow(), vec!["literal:file.txt", "produced:ABC", "event:go:abc"]);
  }

  #[test]
  fn handler_error_aborts_and_still_removes_what_fired() {
    let log = Log::default();
    let registry = RefCell::new(Registry::new());
    let failing = Handlers::new("Failing")
      .on("a", |_: &String| Err(HandlerError::from("boom")))
      .into_ref();
    {
      let mut r = registry.borrow_mut();
      r.attach([recorder(&log, "first", &["a"])], &AttachOptions::default().once());
      r.attach([failing], &AttachOptions::default().once());
      r.attach([recorder(&log, "last", &["a"])], &AttachOptions::default().once());
    }

    let err = dispatch(&registry, &String::from("s"), None, &names(&["a"])).unwrap_err();

    assert!(err.is_handler());
    assert_eq!(err.to_string(), "boom");
    assert_eq!(*log.borrow(), vec!["first:a:s"]);
    assert_eq!(registry.borrow().len(), 1);
    assert_eq!(registry.borrow().iter().next().map(Subscriber::label).as_deref(), Some("last"));
  }

  #[test]
  fn handlers_may_mutate_the_registry() {
    let registry = Rc::new(RefCell::new(Registry::<String>::new()));
    let log = Log::default();
    let late = recorder(&log, "late", &["a"]);
    let c_registry = registry.clone();
    let c_late = late.clone();
    let adder = Handlers::new("Adder")
      .on("a", move |_: &String| {
        c_registry
          .borrow_mut()
          .attach([c_late.clone()], &AttachOptions::default());
        Ok(())
      })
      .into_ref();
    registry
      .borrow_mut()
      .attach([adder], &AttachOptions::default());

    dispatch(&registry, &String::from("s"), None, &names(&["a"])).unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(registry.borrow().len(), 2);

    dispatch(&registry, &String::from("s"), None, &names(&["a"])).unwrap();
    assert_eq!(*log.borrow(), vec!["late:a:s"]);
  }

  #[test]
  fn nested_dispatch_does_not_refire_one_shot_subscribers() {
    let registry = Rc::new(RefCell::new(Registry::<String>::new()));
    let fired = Rc::new(RefCell::new(0));
    let nested = Rc::new(RefCell::new(false));

    let (c_registry, c_nested) = (registry.clone(), nested.clone());
    let reentrant = Handlers::new("Reentrant")
      .on("a", move |s: &String| {
        if c_nested.replace(true) {
          return Ok(());
        }
        dispatch(&c_registry, s, None, &names(&["a"])).map_err(HandlerError::from)
      })
      .into_ref();
    let c_fired = fired.clone();
    let once = Handlers::new("Once")
      .on("a", move |_: &String| {
        *c_fired.borrow_mut() += 1;
        Ok(())
      })
      .into_ref();
    {
      let mut r = registry.borrow_mut();
      r.attach([reentrant], &AttachOptions::default());
      r.attach([once], &AttachOptions::default().once());
    }

    dispatch(&registry, &String::from("s"), None, &names(&["a"])).unwrap();

    assert_eq!(*fired.borrow(), 1);
    assert_eq!(registry.borrow().len(), 1);
  }

  #[test]
  fn one_shot_fired_by_the_outer_dispatch_is_hidden_from_nested_ones() {
    let registry = Rc::new(RefCell::new(Registry::<String>::new()));
    let log = Log::default();

    let once = recorder(&log, "once", &["a", "b"]);
    let c_registry = registry.clone();
    let reentrant = Handlers::new("Reentrant")
      .on("a", move |s: &String| {
        dispatch(&c_registry, s, None, &names(&["b"])).map_err(HandlerError::from)
      })
      .into_ref();
    {
      let mut r = registry.borrow_mut();
      r.attach([once], &AttachOptions::default().once());
      r.attach([recorder(&log, "b", &["b"])], &AttachOptions::default());
      r.attach([reentrant], &AttachOptions::default());
    }

    dispatch(&registry, &String::from("s"), None, &names(&["a"])).unwrap();

    assert_eq!(*log.borrow(), vec!["once:a:s", "b:b:s"]);
    assert_eq!(registry.borrow().len(), 2);
  }

  #[test]
  fn empty_registry_is_a_no_op() {
    let registry = RefCell::new(Registry::<String>::new());
    assert!(dispatch(&registry, &String::new(), None, &names(&["a"])).is_ok());
  }

  #[test]
  fn benchmark() { do_bench(); }

  benchmark_group!(do_bench, bench_fan_out);

  fn bench_fan_out(b: &mut Bencher) {
    let log = Log::default();
    let registry = RefCell::new(Registry::new());
    let observers: Vec<_> = (0..8).map(|_| recorder(&log, "o", &["a", "b"])).collect();
    registry
      .borrow_mut()
      .attach(observers, &AttachOptions::default());
    let subject = String::from("s");
    let events = names(&["a", "b"]);

    b.iter(|| {
      log.borrow_mut().clear();
      dispatch(&registry, &subject, None, &events)
    });
  }
}
