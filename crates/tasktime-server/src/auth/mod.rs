//! Password hashing, bearer tokens, and the request guard that resolves them.

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, TokenKeys};
pub use middleware::{AuthUser, require_auth};
pub use password::{hash_password, verify_password};
