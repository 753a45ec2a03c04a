//! In-memory session mirror and the signals the client sends to its presentation layer.
//!
//! The client never reaches into UI state. Whoever constructs it injects a [`SessionObserver`]
//! that receives notifications, renewals, and (at most once per unauthorized episode) a
//! [`LoginRedirect`].

pub mod observer;
pub mod state;

pub use observer::*;
pub use state::*;
