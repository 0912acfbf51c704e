//! Configuration for the chunk splitter

use serde::{Deserialize, Serialize};

/// Configuration for [`ChunkSplitter`](crate::ChunkSplitter)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Maximum segment length before length-based re-splitting (characters)
    pub chunk_size: usize,

    /// Characters shared by consecutive length-split windows
    pub overlap: usize,

    /// Chunk count above which smart merging kicks in
    pub max_chunks: usize,

    /// Similarity groups opened before the remaining chunks are packed by length
    pub merge_target: usize,

    /// Maximum chunks per similarity group
    pub max_group_size: usize,

    /// Keyword similarity required to join a group
    pub similarity_threshold: f64,

    /// Lower threshold used when both chunks are short
    pub short_similarity_threshold: f64,

    /// Length below which a chunk counts as short (characters)
    pub short_chunk_len: usize,

    /// Character budget of a length-packed group
    pub pack_target_len: usize,
}

impl SplitterConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.overlap >= self.chunk_size {
            return Err("overlap must be smaller than chunk_size".to_string());
        }
        if self.max_chunks == 0 {
            return Err("max_chunks must be greater than 0".to_string());
        }
        if self.merge_target == 0 || self.merge_target > self.max_chunks {
            return Err("merge_target must be between 1 and max_chunks".to_string());
        }
        if self.max_group_size < 2 {
            return Err("max_group_size must be at least 2".to_string());
        }
        for (name, value) in [
            ("similarity_threshold", self.similarity_threshold),
            ("short_similarity_threshold", self.short_similarity_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 1.0", name));
            }
        }
        Ok(())
    }

    /// Small windows, for services with short context
    pub fn fine() -> Self {
        Self {
            chunk_size: 300,
            overlap: 60,
            ..Self::default()
        }
    }

    /// Large windows and fewer merges, for long-context services
    pub fn coarse() -> Self {
        Self {
            chunk_size: 1200,
            overlap: 200,
            max_chunks: 60,
            merge_target: 50,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            overlap: 100,
            max_chunks: 30,
            merge_target: 25,
            max_group_size: 8,
            similarity_threshold: 0.3,
            short_similarity_threshold: 0.1,
            short_chunk_len: 200,
            pack_target_len: 1500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(SplitterConfig::default().validate().is_ok());
        assert!(SplitterConfig::fine().validate().is_ok());
        assert!(SplitterConfig::coarse().validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_window() {
        let config = SplitterConfig {
            overlap: 400,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_target_bounded_by_max_chunks() {
        let config = SplitterConfig {
            merge_target: 31,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SplitterConfig::from_toml("chunk_size = 800\n").unwrap();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.overlap, 100);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SplitterConfig::coarse();
        let parsed = SplitterConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
    }
}
