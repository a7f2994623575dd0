//! Normalization of heterogeneous event-name input.
//!
//! Entry points accept anything implementing [`IntoEventNames`]: single names,
//! arbitrarily nested sequences of names, and `Option`s whose `None` entries are
//! discarded. The result is always a flat list in input order.
//!
//! ```rust
//! use observers::event::names;
//!
//! let flat = names::normalize(vec![vec![Some("a")], vec![None, Some("b")]]);
//! assert_eq!(flat.as_slice(), ["a", "b"]);
//!
//! assert!(names::fetch_required(None::<&str>).is_err());
//! ```

use smallvec::SmallVec;

use super::EventName;
use crate::error::{Error, Result};

/// Flat, ordered list of event names.
pub type EventNames = SmallVec<[EventName; 2]>;

/// Anything that can be flattened into a list of event names.
pub trait IntoEventNames {
  /// Append every name in `self` to `out`, depth first, skipping `None`.
  fn collect_names(self, out: &mut EventNames);
}

impl IntoEventNames for EventName {
  #[inline]
  fn collect_names(self, out: &mut EventNames) { out.push(self); }
}

impl IntoEventNames for &EventName {
  #[inline]
  fn collect_names(self, out: &mut EventNames) { out.push(self.clone()); }
}

impl IntoEventNames for &'static str {
  #[inline]
  fn collect_names(self, out: &mut EventNames) { out.push(self.into()); }
}

impl IntoEventNames for String {
  #[inline]
  fn collect_names(self, out: &mut EventNames) { out.push(self.into()); }
}

impl IntoEventNames for () {
  #[inline]
  fn collect_names(self, _: &mut EventNames) {}
}

impl<T: IntoEventNames> IntoEventNames for Option<T> {
  fn collect_names(self, out: &mut EventNames) {
    if let Some(names) = self {
      names.collect_names(out);
    }
  }
}

impl<T: IntoEventNames> IntoEventNames for Vec<T> {
  fn collect_names(self, out: &mut EventNames) {
    self
      .into_iter()
      .for_each(|names| names.collect_names(out));
  }
}

impl<T: IntoEventNames, const N: usize> IntoEventNames for [T; N] {
  fn collect_names(self, out: &mut EventNames) {
    self
      .into_iter()
      .for_each(|names| names.collect_names(out));
  }
}

impl<T: IntoEventNames + Clone> IntoEventNames for &[T] {
  fn collect_names(self, out: &mut EventNames) {
    self
      .iter()
      .cloned()
      .for_each(|names| names.collect_names(out));
  }
}

impl IntoEventNames for EventNames {
  fn collect_names(self, out: &mut EventNames) { out.extend(self); }
}

/// Flatten `raw`, discarding `None` entries. May return an empty list.
pub fn normalize(raw: impl IntoEventNames) -> EventNames {
  let mut out = EventNames::new();
  raw.collect_names(&mut out);
  out
}

/// Flatten `raw`, falling back to `default` when nothing is left.
pub fn normalize_or(raw: impl IntoEventNames, default: &[EventName]) -> EventNames {
  let out = normalize(raw);
  if out.is_empty() { default.iter().cloned().collect() } else { out }
}

/// Flatten `raw`, failing with [`Error::NoEvents`] when nothing is left.
pub fn fetch_required(raw: impl IntoEventNames) -> Result<EventNames> {
  let out = normalize(raw);
  if out.is_empty() { Err(Error::NoEvents) } else { Ok(out) }
}
