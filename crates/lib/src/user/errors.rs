//! Error types for the user system
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UserError {
    /// The invitation token did not decode, or names no known record.
    #[error("Invalid invitation")]
    InvalidInvitation,

    #[error("Invitation for {id} was already accepted")]
    AlreadyAccepted { id: String },

    #[error("Name already taken: {name}")]
    NameTaken { name: String },

    #[error("Already initialized: users exist")]
    AlreadyInitialized,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Password must not be empty")]
    EmptyPassword,

    /// Login failed. Carries no detail on purpose.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Password hashing failed: {reason}")]
    PasswordHashing { reason: String },
}

impl UserError {
    /// Check if this error should be answered with 401.
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            UserError::Unauthorized | UserError::InvalidInvitation | UserError::AlreadyAccepted { .. }
        )
    }

    /// Check if this error is a name conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            UserError::NameTaken { .. } | UserError::AlreadyInitialized
        )
    }

    /// Check if this error was caused by invalid caller input.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, UserError::EmptyUsername | UserError::EmptyPassword)
    }
}

impl From<UserError> for crate::Error {
    fn from(err: UserError) -> Self {
        crate::Error::User(err)
    }
}
