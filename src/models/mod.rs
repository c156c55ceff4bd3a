pub mod bank_details;
pub mod clients;
pub mod dashboard;
pub mod nannys;
pub mod notifications;
pub mod payments;
pub mod ratings;
pub mod services;
pub mod users;
