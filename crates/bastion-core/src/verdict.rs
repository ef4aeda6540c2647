//! Safety verdicts produced by the gate.

use serde::{Deserialize, Serialize};

use crate::error::VerdictError;

/// Category reported when the semantic layer says `unsafe` without naming any.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Which layer had the final word, with that layer's evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum VerdictSource {
    /// The semantic classifier decided.
    SemanticLayer {
        /// Violated category codes. Empty when the text was judged safe.
        #[serde(
            rename = "flaggedCategories",
            default,
            skip_serializing_if = "Vec::is_empty"
        )]
        flagged_categories: Vec<String>,
    },
    /// The toxicity scorer decided.
    StatisticalLayer {
        /// Observed toxicity score. Absent when the scorer could not be reached.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        score: Option<f64>,
    },
    /// Both layers passed the text.
    Clean,
}

/// Immutable result of evaluating a piece of text.
///
/// Constructed only through the named constructors, which keep the
/// invariant that an unsafe verdict always says why: flagged categories,
/// a score, or the `degraded` marker for a fail-closed substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "WireVerdict")]
pub struct SafetyVerdict {
    is_safe: bool,
    #[serde(flatten)]
    source: VerdictSource,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    degraded: bool,
}

/// Unchecked wire form; validated into a [`SafetyVerdict`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireVerdict {
    is_safe: bool,
    #[serde(flatten)]
    source: VerdictSource,
    #[serde(default)]
    degraded: bool,
}

impl TryFrom<WireVerdict> for SafetyVerdict {
    type Error = VerdictError;

    fn try_from(wire: WireVerdict) -> Result<Self, Self::Error> {
        match (wire.source, wire.is_safe, wire.degraded) {
            (VerdictSource::Clean, true, false) => Ok(Self::clean()),
            (VerdictSource::Clean, _, _) => Err(VerdictError::InconsistentClean),
            (VerdictSource::SemanticLayer { .. }, true, false) => Ok(Self::semantic_safe()),
            (VerdictSource::SemanticLayer { .. }, true, true) => Ok(Self::semantic_fail_open()),
            (VerdictSource::SemanticLayer { flagged_categories }, false, false) => {
                Ok(Self::semantic_unsafe(flagged_categories))
            }
            (VerdictSource::SemanticLayer { .. }, false, true) => {
                Err(VerdictError::DegradedSemanticBlock)
            }
            (VerdictSource::StatisticalLayer { score: None }, false, true) => {
                Ok(Self::statistical_fail_closed())
            }
            (VerdictSource::StatisticalLayer { score: Some(score) }, is_safe, false) => {
                if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                    return Err(VerdictError::ScoreOutOfRange(score));
                }
                Ok(Self {
                    is_safe,
                    source: VerdictSource::StatisticalLayer { score: Some(score) },
                    degraded: false,
                })
            }
            (VerdictSource::StatisticalLayer { .. }, _, _) => Err(VerdictError::MissingScore),
        }
    }
}

impl SafetyVerdict {
    /// Both layers passed the text.
    pub fn clean() -> Self {
        Self {
            is_safe: true,
            source: VerdictSource::Clean,
            degraded: false,
        }
    }

    /// The semantic classifier answered `safe`.
    pub fn semantic_safe() -> Self {
        Self {
            is_safe: true,
            source: VerdictSource::SemanticLayer {
                flagged_categories: Vec::new(),
            },
            degraded: false,
        }
    }

    /// The semantic classifier answered `unsafe`.
    ///
    /// An empty category list becomes `["Unknown"]`.
    pub fn semantic_unsafe(categories: Vec<String>) -> Self {
        let flagged_categories = if categories.is_empty() {
            vec![UNKNOWN_CATEGORY.to_string()]
        } else {
            categories
        };
        Self {
            is_safe: false,
            source: VerdictSource::SemanticLayer { flagged_categories },
            degraded: false,
        }
    }

    /// The semantic classifier could not be consulted; let the text through
    /// to the next layer.
    pub fn semantic_fail_open() -> Self {
        Self {
            is_safe: true,
            source: VerdictSource::SemanticLayer {
                flagged_categories: Vec::new(),
            },
            degraded: true,
        }
    }

    /// The toxicity scorer returned `score`; unsafe iff `score > threshold`.
    pub fn statistical(score: f64, threshold: f64) -> Self {
        Self {
            is_safe: score <= threshold,
            source: VerdictSource::StatisticalLayer { score: Some(score) },
            degraded: false,
        }
    }

    /// The toxicity scorer could not be consulted; reject the text.
    pub fn statistical_fail_closed() -> Self {
        Self {
            is_safe: false,
            source: VerdictSource::StatisticalLayer { score: None },
            degraded: true,
        }
    }

    /// Returns true if the text may pass downstream.
    pub fn is_safe(&self) -> bool {
        self.is_safe
    }

    /// Returns the layer that produced this verdict.
    pub fn source(&self) -> &VerdictSource {
        &self.source
    }

    /// Returns the source tag as it appears on the wire.
    pub fn source_name(&self) -> &'static str {
        match self.source {
            VerdictSource::SemanticLayer { .. } => "SemanticLayer",
            VerdictSource::StatisticalLayer { .. } => "StatisticalLayer",
            VerdictSource::Clean => "Clean",
        }
    }

    /// Violated categories. Present only on unsafe semantic verdicts.
    pub fn flagged_categories(&self) -> Option<&[String]> {
        match &self.source {
            VerdictSource::SemanticLayer { flagged_categories } if !self.is_safe => {
                Some(flagged_categories)
            }
            _ => None,
        }
    }

    /// Toxicity score. Present only on statistical verdicts that reached the scorer.
    pub fn score(&self) -> Option<f64> {
        match self.source {
            VerdictSource::StatisticalLayer { score } => score,
            _ => None,
        }
    }

    /// Returns true if this verdict was substituted after an upstream failure.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}
