//! Session state machine and the controller that drives it.

#[cfg(feature = "desktop")]
pub mod commands;
pub mod controller;
pub mod state;

pub use controller::{SessionController, SessionSnapshot};
pub use state::{SessionError, SessionState};
