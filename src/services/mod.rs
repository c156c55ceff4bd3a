pub mod ai_tips;
pub mod bank_details;
pub mod bookings;
pub mod clients;
pub mod cookies;
pub mod dashboard;
pub mod email;
pub mod jwt;
pub mod nannys;
pub mod notifications;
pub mod payments;
pub mod profile;
pub mod ratings;
pub mod storage;
pub mod users;
