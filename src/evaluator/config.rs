//! Evaluator configuration
//!
//! Every field is optional in JSON; absent fields take the defaults below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{EvaluationError, EvaluationResult};

fn default_page_size() -> usize {
    20
}

fn default_parallel_impact() -> bool {
    true
}

/// Settings shared by every evaluation of one evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorConfig {
    /// Page size used when the query requests no slice
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Hard cap on requested page sizes; exceeding it rejects the query
    #[serde(default)]
    pub max_page_size: Option<usize>,

    /// Fixes `random` ordering
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Fixed clock for `priceValidInNow` and `attributeInRangeNow`.
    ///
    /// When absent the wall clock is read once per evaluation.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,

    /// Run facet impact counterfactuals on the rayon pool
    #[serde(default = "default_parallel_impact")]
    pub parallel_impact: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: None,
            random_seed: None,
            now: None,
            parallel_impact: default_parallel_impact(),
        }
    }
}

impl EvaluatorConfig {
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_default_page_size(mut self, size: usize) -> Self {
        self.default_page_size = size;
        self
    }

    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = Some(max);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel_impact = false;
        self
    }

    pub fn validate(&self) -> EvaluationResult<()> {
        if self.default_page_size == 0 {
            return Err(EvaluationError::InvalidConfig(
                "defaultPageSize must be > 0".to_string(),
            ));
        }
        if let Some(max) = self.max_page_size {
            if max == 0 {
                return Err(EvaluationError::InvalidConfig(
                    "maxPageSize must be > 0".to_string(),
                ));
            }
            if self.default_page_size > max {
                return Err(EvaluationError::InvalidConfig(format!(
                    "defaultPageSize {} exceeds maxPageSize {}",
                    self.default_page_size, max
                )));
            }
        }
        Ok(())
    }
}
