//! Challenge-solving collaborator
//!
//! Contact reveal occasionally runs into a human-verification challenge.
//! Detection and sitekey extraction live in the browser module; actually
//! solving the challenge is an external capability behind the
//! `ChallengeSolver` trait. The returned token is opaque to this crate:
//! it is threaded into the reveal result for the caller, and no automatic
//! challenge completion is attempted.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Opaque solve result returned by a challenge-solving service
#[derive(Debug, Clone, Deserialize)]
pub struct SolvedChallenge {
    /// Solve token
    pub token: String,
    /// Service-assigned key for the solve
    pub key: String,
}

/// External capability that solves a human-verification challenge
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Solve the challenge identified by `site_key` as presented on
    /// `page_url`, using `user_agent` for fingerprint consistency.
    async fn solve(
        &self,
        site_key: &str,
        page_url: &str,
        user_agent: &str,
    ) -> Result<SolvedChallenge>;
}

/// HTTP client for a hosted challenge-solving service
pub struct HttpChallengeSolver {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpChallengeSolver {
    /// Create a solver client against `endpoint` authenticated by `api_key`
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Solves routinely take tens of seconds.
            .timeout(Duration::from_secs(180))
            .build()
            .context("failed to build solver HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl ChallengeSolver for HttpChallengeSolver {
    async fn solve(
        &self,
        site_key: &str,
        page_url: &str,
        user_agent: &str,
    ) -> Result<SolvedChallenge> {
        let payload = json!({
            "api_key": self.api_key,
            "site_key": site_key,
            "page_url": page_url,
            "user_agent": user_agent,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("solver request failed")?
            .error_for_status()
            .context("solver returned an error status")?;

        response
            .json::<SolvedChallenge>()
            .await
            .context("solver returned an unexpected payload")
    }
}
