//! HTTP scoring backend.
//!
//! The model is served out of process; this client holds the endpoint and
//! turns a preprocessed tensor into a score. Connecting probes the endpoint
//! once so a missing model is fatal at startup instead of surfacing as
//! per-request failures.

use crate::classify::{DependencyStatus, Scorer};
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};
use url::Url;

#[derive(Serialize)]
struct ScoreRequest<'a> {
    inputs: &'a [f32],
}

#[derive(Deserialize)]
struct ScoreResponse {
    score: f32,
}

#[derive(Debug, Clone)]
pub struct RemoteScorer {
    client: reqwest::Client,
    endpoint: Url,
}

impl RemoteScorer {
    /// Build the client and probe the endpoint once.
    ///
    /// # Errors
    /// Fails when the client cannot be built or the endpoint does not
    /// answer the probe. Callers treat this as fatal.
    pub async fn connect(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("could not build scoring client")?;

        let scorer = Self { client, endpoint };

        scorer
            .probe()
            .await
            .context("scoring endpoint did not answer startup probe")?;

        info!(endpoint = %scorer.endpoint, "scoring endpoint ready");

        Ok(scorer)
    }

    async fn probe(&self) -> Result<(), reqwest::Error> {
        self.client
            .get(self.endpoint.clone())
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl Scorer for RemoteScorer {
    async fn score(&self, inputs: &[f32]) -> Result<f32, AppError> {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .json(&ScoreRequest { inputs })
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint, "scoring request failed");
                return Err(AppError::ModelUnavailable);
            }
        };

        if let Err(err) = response.error_for_status_ref() {
            error!(error = %err, endpoint = %self.endpoint, "scoring endpoint rejected request");
            return Err(AppError::ModelUnavailable);
        }

        match response.json::<ScoreResponse>().await {
            Ok(body) => Ok(body.score),
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint, "scoring response was not valid");
                Err(AppError::ModelUnavailable)
            }
        }
    }

    async fn dependency_status(&self) -> DependencyStatus {
        match self.probe().await {
            Ok(()) => DependencyStatus::Ok,
            Err(err) => {
                error!(error = %err, endpoint = %self.endpoint, "scoring endpoint unreachable");
                DependencyStatus::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_request_wire_shape() {
        let inputs = vec![0.0, 0.5, 1.0];
        let value = serde_json::to_value(ScoreRequest { inputs: &inputs }).expect("serialize");
        assert_eq!(value, serde_json::json!({ "inputs": [0.0, 0.5, 1.0] }));
    }

    #[test]
    fn test_score_response_parses_bare_score() {
        let body: ScoreResponse = serde_json::from_str(r#"{"score":0.73}"#).expect("deserialize");
        assert!((body.score - 0.73).abs() < f32::EPSILON);
    }

    #[test]
    fn test_score_response_ignores_extra_fields() {
        let body: ScoreResponse =
            serde_json::from_str(r#"{"score":0.1,"model":"leaf-v2"}"#).expect("deserialize");
        assert!((body.score - 0.1).abs() < f32::EPSILON);
    }
}
