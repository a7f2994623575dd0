use std::{any::Any, fmt, rc::Rc};

/// Opaque value carried through a broadcast.
///
/// Used for subscription `context`, call-site `data`, literal `with` values
/// and the results of `with` producers. Cloning only bumps a reference count,
/// so the same payload can be handed to every subscriber of a broadcast.
///
/// ```rust
/// use observers::Payload;
///
/// let payload = Payload::new(42_u32);
/// assert_eq!(payload.get::<u32>(), Some(&42));
/// assert_eq!(payload.get::<String>(), None);
/// ```
#[derive(Clone)]
pub struct Payload(Rc<dyn Any>);

impl Payload {
  pub fn new<T: Any>(value: T) -> Self { Self(Rc::new(value)) }

  /// Borrow the inner value if it is a `T`.
  #[inline]
  pub fn get<T: Any>(&self) -> Option<&T> { self.0.downcast_ref::<T>() }

  #[inline]
  pub fn is<T: Any>(&self) -> bool { self.0.is::<T>() }

  /// Whether both payloads point at the same value.
  #[inline]
  pub fn ptr_eq(&self, other: &Payload) -> bool {
    Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
  }
}

impl fmt::Debug for Payload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(s) = self.get::<&'static str>() {
      return f.debug_tuple("Payload").field(s).finish();
    }
    if let Some(s) = self.get::<String>() {
      return f.debug_tuple("Payload").field(s).finish();
    }
    f.write_str("Payload(..)")
  }
}
