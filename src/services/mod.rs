//! External Services
//!
//! This module contains the seams to external systems and the loop that
//! drives them:
//! - gateway: daemon API and credential traits
//! - notify: notification sink trait and the logging sink
//! - scheduler: clock and restartable ticker
//! - poller: refresh cycles, cancellation and commands

pub mod gateway;
pub mod notify;
pub mod poller;
pub mod scheduler;

// Re-export commonly used types for convenience
pub use gateway::{CredentialProvider, Credentials, DaemonConfig, StatusGateway};
pub use notify::{NotificationSink, TracingNotifier};
pub use poller::Poller;
pub use scheduler::{Clock, SystemClock, Ticker};
