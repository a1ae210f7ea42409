pub mod dispatcher;
pub mod event_service;
pub mod scheduler;

pub use dispatcher::{DispatchError, DispatchStats, NotificationDispatcher};
pub use event_service::{DeletedEventStats, EventService};
pub use scheduler::NotificationScheduler;
