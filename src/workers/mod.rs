pub mod rate_limit_sweep;
pub mod service_reminders;

pub use rate_limit_sweep::rate_limit_sweep_worker;
pub use service_reminders::service_reminder_worker;
