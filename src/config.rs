//! Engine configuration
//!
//! Hosts pass a JSON object; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::errors::ChartResult;
use crate::timeline::event_list::DEFAULT_MAX_BUCKETS;

/// Default number of undo steps kept
pub const DEFAULT_UNDO_LIMIT: usize = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Maximum number of entries on the undo stack; the oldest are dropped
    pub undo_limit: usize,
    /// Upper bound on jump index buckets per event list
    pub max_buckets: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            undo_limit: DEFAULT_UNDO_LIMIT,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> ChartResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        Ok(config)
    }
}
