//! Statistical layer (Layer 2).
//!
//! Scores the text with the Perspective comment analyzer and gates on the
//! `TOXICITY` summary score. The other requested attributes are recorded
//! for logging only.
//!
//! Upstream failures fail **closed**: this is the last line of defense.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{http_client, StatisticalConfig};
use crate::error::{ConfigError, LayerError, Result};
use crate::gate::SafetyLayer;
use crate::verdict::SafetyVerdict;

/// Toxicity above this score (strictly) is unsafe.
pub const TOXICITY_THRESHOLD: f64 = 0.7;

/// Language hint sent with every request.
const LANGUAGE: &str = "en";

const TOXICITY: &str = "TOXICITY";
const SEVERE_TOXICITY: &str = "SEVERE_TOXICITY";
const PROFANITY: &str = "PROFANITY";
const SEXUALLY_EXPLICIT: &str = "SEXUALLY_EXPLICIT";

const REQUESTED_ATTRIBUTES: [&str; 4] = [TOXICITY, SEVERE_TOXICITY, PROFANITY, SEXUALLY_EXPLICIT];

/// Summary scores returned by the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeScores {
    /// Drives the decision.
    pub toxicity: f64,
    /// `SEVERE_TOXICITY`, logged only.
    pub severe_toxicity: Option<f64>,
    /// `PROFANITY`, logged only.
    pub profanity: Option<f64>,
    /// `SEXUALLY_EXPLICIT`, logged only.
    pub sexually_explicit: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    comment: Comment<'a>,
    languages: [&'a str; 1],
    requested_attributes: HashMap<&'a str, EmptyObject>,
}

#[derive(Debug, Serialize)]
struct Comment<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct EmptyObject {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    #[serde(default)]
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: Option<SummaryScore>,
}

#[derive(Debug, Deserialize)]
struct SummaryScore {
    value: Option<f64>,
}

impl AnalyzeResponse {
    fn summary(&self, attribute: &str) -> Option<f64> {
        self.attribute_scores
            .get(attribute)?
            .summary_score
            .as_ref()?
            .value
            .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
    }

    fn into_scores(self) -> Result<AttributeScores> {
        let toxicity = self
            .summary(TOXICITY)
            .ok_or_else(|| LayerError::Malformed("missing or invalid TOXICITY score".to_string()))?;

        Ok(AttributeScores {
            toxicity,
            severe_toxicity: self.summary(SEVERE_TOXICITY),
            profanity: self.summary(PROFANITY),
            sexually_explicit: self.summary(SEXUALLY_EXPLICIT),
        })
    }
}

/// Adapter for the toxicity scoring service.
#[derive(Debug, Clone)]
pub struct StatisticalLayer {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl StatisticalLayer {
    /// Creates an adapter. The API key is bound into the request URL here.
    pub fn new(config: StatisticalConfig) -> std::result::Result<Self, ConfigError> {
        let url = reqwest::Url::parse_with_params(&config.endpoint, &[("key", &config.api_key)])
            .map_err(|e| ConfigError::InvalidEndpoint(config.endpoint.clone(), e.to_string()))?;

        Ok(Self {
            client: http_client(config.timeout)?,
            url,
        })
    }

    /// Returns the decision threshold.
    pub fn threshold(&self) -> f64 {
        TOXICITY_THRESHOLD
    }

    /// Requests toxicity-family scores for `text`.
    pub async fn score(&self, text: &str) -> Result<AttributeScores> {
        let body = AnalyzeRequest {
            comment: Comment { text },
            languages: [LANGUAGE],
            requested_attributes: REQUESTED_ATTRIBUTES
                .iter()
                .map(|attr| (*attr, EmptyObject {}))
                .collect(),
        };

        let response = self.client.post(self.url.clone()).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(LayerError::status(status, &raw));
        }

        let parsed: AnalyzeResponse = serde_json::from_str(&raw)?;
        let scores = parsed.into_scores()?;
        debug!(
            toxicity = scores.toxicity,
            severe_toxicity = ?scores.severe_toxicity,
            profanity = ?scores.profanity,
            sexually_explicit = ?scores.sexually_explicit,
            "Toxicity scores received"
        );
        Ok(scores)
    }
}

#[async_trait]
impl SafetyLayer for StatisticalLayer {
    async fn evaluate(&self, text: &str) -> SafetyVerdict {
        match self.score(text).await {
            Ok(scores) => SafetyVerdict::statistical(scores.toxicity, TOXICITY_THRESHOLD),
            Err(e) => {
                warn!(
                    timeout = e.is_timeout(),
                    "Statistical layer failed, failing closed: {}", e
                );
                SafetyVerdict::statistical_fail_closed()
            }
        }
    }

    fn name(&self) -> &'static str {
        "statistical"
    }
}
