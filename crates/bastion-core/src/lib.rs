//! Bastion Core - two-layer content-safety gate.
//!
//! Decides whether user-submitted text may pass downstream. The semantic
//! layer (a Llama Guard style classifier) runs first; if it finds nothing,
//! the statistical layer (Perspective toxicity scoring) runs second.
//!
//! The layers recover from upstream failures with opposite polarity:
//! - Semantic layer fails **open** (the statistical layer still runs)
//! - Statistical layer fails **closed** (the text is rejected)
//!
//! ## Example
//!
//! ```no_run
//! use bastion_core::ContentGate;
//!
//! # async fn run() -> Result<(), bastion_core::ConfigError> {
//! let gate = ContentGate::from_env()?;
//! let verdict = gate.validate_content("hello there").await;
//! if !verdict.is_safe() {
//!     println!("blocked by {}", verdict.source_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod policy;
pub mod semantic;
pub mod statistical;
pub mod verdict;

pub use config::{GateConfig, SemanticConfig, StatisticalConfig};
pub use error::{ConfigError, LayerError, VerdictError};
pub use gate::{ContentGate, GateStats, SafetyLayer};
pub use policy::{PolicyCategory, PolicyDocument};
pub use semantic::SemanticLayer;
pub use statistical::{StatisticalLayer, TOXICITY_THRESHOLD};
pub use verdict::{SafetyVerdict, VerdictSource, UNKNOWN_CATEGORY};
