//! Configuration for multi-path datasets

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a multi-path dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiConfig {
    /// Check at construction that every path exposes every dimension
    pub validate_schemas: bool,

    /// Minimum number of paths before per-path work is spread over the rayon
    /// pool; 0 disables it. Only read with the `parallel` feature.
    pub parallel_threshold: usize,
}

impl Default for MultiConfig {
    fn default() -> Self {
        Self {
            validate_schemas: false,
            parallel_threshold: 64,
        }
    }
}

impl MultiConfig {
    /// Parse a configuration from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
