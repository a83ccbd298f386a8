//! Error taxonomy for the portal.
//!
//! Every variant except [`AppError::Internal`] is a user-visible outcome: the
//! handler that hit it re-renders its form with [`AppError::user_message`].
//! Underlying causes (relay refusals, decode failures) are logged at the site
//! that observed them, not carried here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Username already exists")]
    DuplicateUsername,

    /// Unknown user and wrong password collapse into one message so the
    /// response does not leak which field was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Email not found")]
    EmailNotFound,

    /// The relay refused or the connection failed. Dispatch is never retried.
    #[error("Failed to send OTP. Try again.")]
    Dispatch,

    #[error("Invalid OTP")]
    InvalidOtp,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Could not read the uploaded image")]
    InvalidImage,

    #[error("Classification service is unavailable. Try again later.")]
    ModelUnavailable,

    #[error("Login required")]
    Unauthenticated,

    #[error("Username must be 1-64 characters without commas or line breaks")]
    InvalidUsername,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message rendered on the form that produced the error. Internal
    /// failures get a generic line; their detail stays in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Internal(_) => "Something went wrong. Try again later.".to_string(),
            other => other.to_string(),
        }
    }
}
