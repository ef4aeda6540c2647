//! Gate configuration.
//!
//! Endpoints and credentials come from the environment and are resolved once,
//! at construction time. Adapters never read the environment themselves.

use std::time::Duration;

use crate::error::ConfigError;

/// Default Llama Guard model identifier.
pub const DEFAULT_SEMANTIC_MODEL: &str = "meta-llama/Llama-Guard-3-8B";

/// Default Perspective API endpoint.
pub const DEFAULT_STATISTICAL_ENDPOINT: &str =
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Chat-completions URL of the semantic classifier (required).
pub const ENV_SEMANTIC_ENDPOINT: &str = "LLAMAGUARD_ENDPOINT";
/// Bearer token for the semantic classifier (optional).
pub const ENV_SEMANTIC_API_KEY: &str = "LLAMAGUARD_API_KEY";
/// Overrides [`DEFAULT_SEMANTIC_MODEL`].
pub const ENV_SEMANTIC_MODEL: &str = "LLAMAGUARD_MODEL";
/// API key for the toxicity scorer (required).
pub const ENV_STATISTICAL_KEY: &str = "PERSPECTIVE_KEY";
/// Overrides [`DEFAULT_STATISTICAL_ENDPOINT`].
pub const ENV_STATISTICAL_ENDPOINT: &str = "PERSPECTIVE_ENDPOINT";
/// Per-call timeout in whole seconds; overrides [`DEFAULT_TIMEOUT`].
pub const ENV_TIMEOUT_SECS: &str = "SAFETY_GATE_TIMEOUT_SECS";

/// Semantic classifier (chat-completions) settings.
#[derive(Debug, Clone)]
pub struct SemanticConfig {
    /// Full chat-completions URL.
    pub endpoint: String,
    /// Bearer token, if the provider requires one.
    pub api_key: Option<String>,
    /// Model identifier sent with each request.
    pub model: String,
    /// Upper bound on a single call.
    pub timeout: Duration,
}

impl SemanticConfig {
    /// Creates a config for the given endpoint with default model and timeout.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: DEFAULT_SEMANTIC_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Toxicity scorer (Perspective) settings.
#[derive(Debug, Clone)]
pub struct StatisticalConfig {
    /// `comments:analyze` URL.
    pub endpoint: String,
    /// API key, sent as the `key` query parameter.
    pub api_key: String,
    /// Upper bound on a single call.
    pub timeout: Duration,
}

impl StatisticalConfig {
    /// Creates a config for the public Perspective endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_STATISTICAL_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configuration for both layers.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub semantic: SemanticConfig,
    pub statistical: StatisticalConfig,
}

impl GateConfig {
    /// Creates a config from already-built layer configs.
    pub fn new(semantic: SemanticConfig, statistical: StatisticalConfig) -> Self {
        Self {
            semantic,
            statistical,
        }
    }

    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout = match get(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: ENV_TIMEOUT_SECS,
                        value: raw,
                    })
                }
            },
            None => DEFAULT_TIMEOUT,
        };

        let endpoint =
            get(ENV_SEMANTIC_ENDPOINT).ok_or(ConfigError::MissingVar(ENV_SEMANTIC_ENDPOINT))?;
        let mut semantic = SemanticConfig::new(endpoint).with_timeout(timeout);
        if let Some(key) = get(ENV_SEMANTIC_API_KEY) {
            semantic = semantic.with_api_key(key);
        }
        if let Some(model) = get(ENV_SEMANTIC_MODEL) {
            semantic = semantic.with_model(model);
        }

        let key = get(ENV_STATISTICAL_KEY).ok_or(ConfigError::MissingVar(ENV_STATISTICAL_KEY))?;
        let mut statistical = StatisticalConfig::new(key).with_timeout(timeout);
        if let Some(endpoint) = get(ENV_STATISTICAL_ENDPOINT) {
            statistical = statistical.with_endpoint(endpoint);
        }

        Ok(Self::new(semantic, statistical))
    }
}

/// Builds the HTTP client shared by one adapter's calls.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    let client = reqwest::Client::builder()
        .user_agent(format!("bastion/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}
