pub mod auth;
pub mod rate_limit;

pub use auth::{admin_auth_middleware, customer_auth_middleware, issue_token, Claims, Role};
pub use rate_limit::rate_limit_middleware;
