//! User records and credentials
//!
//! - [`User`]: the durable record held by the store
//! - [`SessionUser`]: the same record minus the password hash, as carried in
//!   session cookies and invitation tokens
//! - [`crypto`]: Argon2id password hashing

pub mod crypto;
pub mod errors;
mod types;

pub use errors::UserError;
pub use types::{SessionUser, User, UserId};
