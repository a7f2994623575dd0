//! # observers: subject-bound publish/notify
//!
//! Attach observers to a subject, mark the subject as changed, and broadcast
//! named events to everything attached, in registration order.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//!
//! use observers::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Word {
//!   text: RefCell<String>,
//!   slot: ObserverSlot<Word>,
//! }
//!
//! impl Subject for Word {
//!   fn observer_slot(&self) -> &ObserverSlot<Self> { &self.slot }
//! }
//!
//! impl Word {
//!   fn set(&self, text: &str) -> observers::Result<()> {
//!     *self.text.borrow_mut() = text.to_string();
//!     self.observers().mark_changed().notify("text_changed")?;
//!     Ok(())
//!   }
//! }
//!
//! let printer = Handlers::new("Printer")
//!   .on("text_changed", |w: &Word| {
//!     println!("{}", w.text.borrow());
//!     Ok(())
//!   })
//!   .into_ref();
//!
//! let word = Word::default();
//! word.observers().attach(&printer);
//! word.set("hello").unwrap();
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Observer`] | Answers an event name with an optional handler |
//! | [`ObserverHub`] | Per-subject façade: attach, detach, `on`/`once`, notify |
//! | [`ObserverSlot`] / [`Subject`] | Lazily created hub embedded in a subject |
//! | [`Event`] | Name, subject, context and data handed to two-argument handlers |
//!
//! ## Dispatch rules
//!
//! - `notify`/`call` only broadcast when the subject was marked changed, and
//!   mark it clean afterwards. The `*_unconditional` variants always
//!   broadcast and never touch the flag.
//! - Event names are the outer loop, subscribers (in registration order) the
//!   inner loop.
//! - One-shot subscribers are removed after the broadcast in which they fired.
//! - The first handler error aborts the broadcast and is returned.
//!
//! Everything is single-threaded: hubs are `!Send` and `!Sync`.
//!
//! [`Observer`]: observer::Observer
//! [`ObserverHub`]: hub::ObserverHub
//! [`ObserverSlot`]: hub::ObserverSlot
//! [`Subject`]: hub::Subject
//! [`Event`]: event::Event

pub mod broadcast;
pub mod error;
pub mod event;
pub mod hub;
pub mod observer;
pub mod options;
pub mod payload;
pub mod prelude;
pub mod registry;
pub mod subscriber;

pub use crate::{
  error::{Error, HandlerError, HandlerResult, Result},
  options::{AttachOptions, OnOptions},
  payload::Payload,
};

// Bring README.md into Cargo-driven doctests.
#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
