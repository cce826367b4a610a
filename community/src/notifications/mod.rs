//! Device-local notification log.
//!
//! - [`reducer`]: state, actions and the reducer that persists through effects
//! - [`NotificationLog`]: the reducer running in a runtime store
//! - [`view`]: search, unread and relative-time helpers

mod log;
pub mod reducer;
pub mod view;

pub use log::NotificationLog;
pub use reducer::{NotificationAction, NotificationEnvironment, NotificationReducer, NotificationState};
