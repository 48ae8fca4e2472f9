use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dataset::PreviewMode;

/// How frame previews are scored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Preview", inline)]
#[serde(default)]
pub struct PreviewOptions {
    /// Scoring strategy.
    #[schemars(title = "Mode")]
    pub mode: PreviewMode,
    /// Neighbors compared per point.
    #[schemars(title = "Neighbors", range(min = 1, max = 100))]
    pub k: usize,
    /// Overlap at or above which a point is not previewed.
    #[schemars(title = "Similarity Threshold", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub similarity_threshold: f64,
    /// Seed for the tie-break order of top-k queries; random when unset.
    #[schemars(skip)]
    pub shuffle_seed: Option<u64>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            mode: PreviewMode::default(),
            k: 10,
            similarity_threshold: 0.5,
            shuffle_seed: None,
        }
    }
}
