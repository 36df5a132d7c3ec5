//! # Event subscribers.
//!
//! Progress reporting for launched containers: the supervisor publishes events
//! on its [`Bus`](crate::events::Bus), a listener fans them out through
//! [`SubscriberSet`] to every [`Subscribe`] implementation.
//!
//! ```text
//! ContainerSupervisor ── publish(Event) ──► Bus ──► SubscriberSet::listen
//!                                                        │
//!                                             ┌──────────┼──────────┐
//!                                             ▼          ▼          ▼
//!                                         LogWriter   Custom       ...
//! ```

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
