//! One-time code dispatch.
//!
//! [`OtpMailer`] generates the code and hands it to the transport in one
//! step, so a caller can never respond before the code exists. Production
//! uses [`RelayMailer`]; without a configured relay the server falls back to
//! [`LogMailer`], which prints the code instead of delivering it.

use crate::error::AppError;
use async_trait::async_trait;
use rand::Rng;
use tracing::info;

pub mod relay;

pub use relay::RelayMailer;

pub const OTP_SUBJECT: &str = "OTP for Password Reset";

/// Uniformly random 6-digit code. Fixed-width formatting keeps leading
/// zeros, so "004217" is a valid code.
#[must_use]
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

#[must_use]
pub fn otp_body(code: &str) -> String {
    format!("Your OTP to reset password is: {code}")
}

#[async_trait]
pub trait OtpMailer: Send + Sync {
    /// Generate and deliver a reset code to `email`, returning the code that
    /// went out. Failures surface as [`AppError::Dispatch`] and are never
    /// retried.
    async fn send_otp(&self, email: &str) -> Result<String, AppError>;
}

/// Logs the code instead of delivering it. Development stand-in for the
/// relay.
pub struct LogMailer;

#[async_trait]
impl OtpMailer for LogMailer {
    async fn send_otp(&self, email: &str) -> Result<String, AppError> {
        let code = generate_otp();
        info!(to_email = %email, code = %code, "otp send stub");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_is_six_ascii_digits() {
        for _ in 0..200 {
            let code = generate_otp();
            assert_eq!(code.len(), 6, "got {code}");
            assert!(code.chars().all(|c| c.is_ascii_digit()), "got {code}");
        }
    }

    #[test]
    fn test_otp_body_wording() {
        assert_eq!(
            otp_body("042137"),
            "Your OTP to reset password is: 042137"
        );
    }

    #[tokio::test]
    async fn test_log_mailer_returns_a_valid_code() {
        let code = LogMailer
            .send_otp("a@x.com")
            .await
            .expect("log mailer never fails");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
