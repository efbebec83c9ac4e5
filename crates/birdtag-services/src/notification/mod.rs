//! Subscription topics and notification fan-out
//!
//! `MessageBus` is the narrow contract over the messaging backend (AWS SNS in
//! production, a log-only bus for local runs). `NotificationDispatcher` turns one
//! record change into one message per (subscriber, matched tag).

pub mod bus;
pub mod dispatcher;

#[cfg(feature = "messaging-sns")]
pub use bus::SnsMessageBus;
pub use bus::{LogMessageBus, MessageBus, Notification};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
