//! HTTP submission to the external mail relay.

use super::{OTP_SUBJECT, OtpMailer, generate_otp, otp_body};
use crate::error::AppError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: String,
}

pub struct RelayMailer {
    client: reqwest::Client,
    endpoint: Url,
    from: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl RelayMailer {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        endpoint: Url,
        from: String,
        username: Option<String>,
        password: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build mail relay client")?;

        Ok(Self {
            client,
            endpoint,
            from,
            username,
            password,
        })
    }
}

#[async_trait]
impl OtpMailer for RelayMailer {
    async fn send_otp(&self, email: &str) -> Result<String, AppError> {
        let code = generate_otp();
        let message = RelayMessage {
            from: &self.from,
            to: email,
            subject: OTP_SUBJECT,
            body: otp_body(&code),
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&message);
        if let Some(username) = &self.username {
            request = request.basic_auth(
                username,
                self.password.as_ref().map(ExposeSecret::expose_secret),
            );
        }

        // A failed dispatch is not retried.
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!(to_email = %email, error = %err, "otp dispatch failed");
                return Err(AppError::Dispatch);
            }
        };

        if let Err(err) = response.error_for_status_ref() {
            error!(to_email = %email, error = %err, "otp dispatch rejected by relay");
            return Err(AppError::Dispatch);
        }

        info!(to_email = %email, "otp dispatched");
        Ok(code)
    }
}
