pub mod auth;
pub mod rate_limit;

pub use auth::{AuthenticatedUser, jwt_auth_middleware};
pub use rate_limit::{RateLimiter, rate_limit_middleware};
