pub mod claims;
pub mod jwt;
pub mod password;

pub use jwt::{CallerIdentity, CurrentUser};
