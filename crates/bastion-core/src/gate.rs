//! Two-layer gate.
//!
//! Runs the layers strictly in sequence with short-circuit evaluation:
//! 1. Semantic layer. An unsafe verdict is returned immediately.
//! 2. Statistical layer, reached only when layer 1 said safe (including
//!    its fail-open case). An unsafe verdict is returned.
//! 3. Otherwise the text is `Clean`.
//!
//! The gate makes no decisions of its own; each layer owns its recovery
//! policy and always yields a verdict.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::GateConfig;
use crate::error::ConfigError;
use crate::policy::PolicyDocument;
use crate::semantic::SemanticLayer;
use crate::statistical::StatisticalLayer;
use crate::verdict::SafetyVerdict;

/// Number of characters of input shown in log lines.
const PREVIEW_CHARS: usize = 20;

/// A single safety check in the pipeline.
///
/// Implementations must not fail: upstream errors are recovered locally
/// into a verdict.
#[async_trait]
pub trait SafetyLayer: Send + Sync {
    /// Evaluates `text` and returns this layer's verdict.
    async fn evaluate(&self, text: &str) -> SafetyVerdict;

    /// Returns the name of this layer for logging.
    fn name(&self) -> &'static str;
}

/// Statistics about a single gate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Time spent in the semantic layer (microseconds), if run.
    pub semantic_duration_us: Option<u64>,
    /// Time spent in the statistical layer (microseconds), if run.
    pub statistical_duration_us: Option<u64>,
    /// Whether the semantic layer's unsafe verdict skipped the statistical layer.
    pub short_circuited: bool,
    /// Layers whose verdict was a failure substitution, in run order.
    pub degraded_layers: Vec<&'static str>,
}

impl GateStats {
    /// Returns the total time spent in layers (microseconds).
    pub fn total_duration_us(&self) -> u64 {
        self.semantic_duration_us.unwrap_or(0) + self.statistical_duration_us.unwrap_or(0)
    }

    /// Returns true if any layer fell back to its recovery verdict.
    pub fn degraded(&self) -> bool {
        !self.degraded_layers.is_empty()
    }
}

/// The content-safety gate.
pub struct ContentGate<S = SemanticLayer, T = StatisticalLayer> {
    semantic: S,
    statistical: T,
}

impl ContentGate {
    /// Creates a gate talking to the configured upstream services.
    pub fn new(config: GateConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_layers(
            SemanticLayer::new(config.semantic)?,
            StatisticalLayer::new(config.statistical)?,
        ))
    }

    /// Creates a gate from environment variables.
    ///
    /// See [`GateConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(GateConfig::from_env()?)
    }
}

impl<S, T> ContentGate<S, T>
where
    S: SafetyLayer,
    T: SafetyLayer,
{
    /// Creates a gate from explicit layers.
    pub fn with_layers(semantic: S, statistical: T) -> Self {
        Self {
            semantic,
            statistical,
        }
    }

    /// Returns the first layer.
    pub fn semantic(&self) -> &S {
        &self.semantic
    }

    /// Returns the second layer.
    pub fn statistical(&self) -> &T {
        &self.statistical
    }

    /// Decides whether `text` may pass downstream.
    pub async fn validate_content(&self, text: &str) -> SafetyVerdict {
        self.validate_content_with_stats(text).await.0
    }

    /// Same as [`validate_content`](Self::validate_content), also reporting
    /// per-layer timings.
    pub async fn validate_content_with_stats(&self, text: &str) -> (SafetyVerdict, GateStats) {
        let mut stats = GateStats::default();

        debug!("Analyzing safety for: \"{}...\"", preview(text));

        // Layer 1
        let start = Instant::now();
        let layer1 = self.semantic.evaluate(text).await;
        stats.semantic_duration_us = Some(start.elapsed().as_micros() as u64);
        if layer1.is_degraded() {
            stats.degraded_layers.push(self.semantic.name());
        }

        if !layer1.is_safe() {
            stats.short_circuited = true;
            log_blocked(self.semantic.name(), &layer1);
            return (layer1, stats);
        }

        // Layer 2
        let start = Instant::now();
        let layer2 = self.statistical.evaluate(text).await;
        stats.statistical_duration_us = Some(start.elapsed().as_micros() as u64);
        if layer2.is_degraded() {
            stats.degraded_layers.push(self.statistical.name());
        }

        if !layer2.is_safe() {
            log_blocked(self.statistical.name(), &layer2);
            return (layer2, stats);
        }

        (SafetyVerdict::clean(), stats)
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

fn log_blocked(layer: &str, verdict: &SafetyVerdict) {
    let categories = verdict
        .flagged_categories()
        .map(|codes| {
            codes
                .iter()
                .map(|code| match PolicyDocument::default_policy().category(code) {
                    Some(category) => format!("{} ({})", code, category.name),
                    None => code.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    info!(
        layer,
        source = verdict.source_name(),
        score = ?verdict.score(),
        degraded = verdict.is_degraded(),
        categories = %categories,
        "Content blocked"
    );
}
