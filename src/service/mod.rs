//! Cross-cutting services.

mod notifier;

pub use notifier::{CycleSummary, Event, LogNotifier, Notifier, NotifierRegistry, NullNotifier};
