//! Semantic layer (Layer 1).
//!
//! Asks a Llama Guard style model, through an OpenAI-compatible
//! chat-completions endpoint, whether the text violates the policy.
//! The model answers `safe`, or `unsafe` followed by a line of
//! comma-separated category codes.
//!
//! Upstream failures fail **open**: the statistical layer still runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{http_client, SemanticConfig};
use crate::error::{ConfigError, LayerError, Result};
use crate::gate::SafetyLayer;
use crate::policy::PolicyDocument;
use crate::verdict::SafetyVerdict;

/// Outcome of a successful semantic classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    /// The first line began with `safe`.
    Safe,
    /// Anything else. Holds the codes from the second line, possibly empty.
    Unsafe(Vec<String>),
}

/// Builds the classifier prompt for `text` under `policy`.
pub fn build_prompt(policy: &PolicyDocument, text: &str) -> String {
    format!(
        "[INST] Task: Check if there is unsafe content in 'User' messages according to the following policy:\n\
         {policy}\n\
         <BEGIN CONVERSATION>\n\
         User: {text}\n\
         <END CONVERSATION>\n\n\
         Provide your safety assessment for User in the above conversation:\n\
         - First line must read 'safe' or 'unsafe'.\n\
         - If unsafe, a second line must include a comma-separated list of violated categories. [/INST]\n",
        policy = policy.render(),
    )
}

/// Parses the model's reply.
///
/// Safe iff the trimmed first line begins with `safe`. For unsafe replies the
/// second line is split on commas; blank entries are dropped.
pub fn parse_assessment(output: &str) -> Assessment {
    let mut lines = output.trim().lines();
    let first = lines.next().unwrap_or_default().trim();

    if first.starts_with("safe") {
        return Assessment::Safe;
    }

    let categories = lines
        .next()
        .map(|line| {
            line.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Assessment::Unsafe(categories)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Adapter for the semantic classification service.
#[derive(Debug, Clone)]
pub struct SemanticLayer {
    client: reqwest::Client,
    config: SemanticConfig,
    policy: &'static PolicyDocument,
}

impl SemanticLayer {
    /// Creates an adapter using the built-in policy.
    pub fn new(config: SemanticConfig) -> std::result::Result<Self, ConfigError> {
        reqwest::Url::parse(&config.endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(config.endpoint.clone(), e.to_string()))?;

        Ok(Self {
            client: http_client(config.timeout)?,
            config,
            policy: PolicyDocument::default_policy(),
        })
    }

    /// Returns the policy shown to the classifier.
    pub fn policy(&self) -> &'static PolicyDocument {
        self.policy
    }

    /// Returns the model identifier.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Calls the classifier and parses its reply.
    ///
    /// Decoding is deterministic (temperature 0) so the same text yields the
    /// same assessment across calls.
    pub async fn classify(&self, text: &str) -> Result<Assessment> {
        let prompt = build_prompt(self.policy, text);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.0,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(LayerError::status(status, &raw));
        }

        let reply: ChatResponse = serde_json::from_str(&raw)?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LayerError::Malformed("no message content in reply".to_string()))?;

        if content.trim().is_empty() {
            return Err(LayerError::Malformed("empty assessment".to_string()));
        }

        debug!(reply = %content.trim(), "Semantic classifier replied");
        Ok(parse_assessment(&content))
    }
}

#[async_trait]
impl SafetyLayer for SemanticLayer {
    async fn evaluate(&self, text: &str) -> SafetyVerdict {
        match self.classify(text).await {
            Ok(Assessment::Safe) => SafetyVerdict::semantic_safe(),
            Ok(Assessment::Unsafe(categories)) => SafetyVerdict::semantic_unsafe(categories),
            Err(e) => {
                warn!(
                    timeout = e.is_timeout(),
                    "Semantic layer failed, failing open to statistical layer: {}", e
                );
                SafetyVerdict::semantic_fail_open()
            }
        }
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}
