//! # Configuration
//!
//! Builder configuration is managed by [`confique`], the same way a host application would
//! layer its own settings.
//!
//! ## Sources
//!
//! Resolved in priority order by [`IndexerConfig::load`]:
//! 1. **Environment variables**: `AVPINDEX_MAX_DEPTH`.
//! 2. **Config file**: a TOML file such as `avpindex.toml`. A missing file is skipped.
//! 3. **Compiled Defaults**: via `#[config(default = ...)]`.
//!
//! Hosts that keep their settings elsewhere can embed the struct through serde instead
//! ([`IndexerConfig::from_json`]) or build it in code ([`IndexerConfig::with_max_depth`]).
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `max_depth` | `64` | Deepest grouped-AVP nesting accepted; root AVPs are depth 1 |

use crate::error::Result;
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_MAX_DEPTH: usize = 64;

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Configuration for [`crate::AvpIndex::build_with`].
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Maximum nesting depth before the tree is rejected as malformed.
    #[config(default = 64, env = "AVPINDEX_MAX_DEPTH")]
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl IndexerConfig {
    /// Layer the environment over `file` over the compiled defaults.
    pub fn load(file: impl AsRef<Path>) -> Result<Self> {
        let config = Self::builder().env().file(file.as_ref()).load()?;
        let max_depth = config.max_depth;
        Ok(config.with_max_depth(max_depth))
    }

    /// Parse a JSON config fragment. Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the maximum depth. Zero is raised to one so root-level AVPs are always accepted.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }
}
