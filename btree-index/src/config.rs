//! Navigator configuration.
//!
//! Configuration can be built in code or loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `BTREE_INDEX_MAX_DEPTH`: Deepest level a descent or walk may reach below
//!   the root (default: `64`)
//!
//! # Invariants
//!
//! - `max_depth` is always at least 1

/// Limits applied while navigating a tree.
///
/// Pages are only loosely validated, so a corrupt child pointer can point back
/// up the tree. Every descent and every recursive walk gives up once it has
/// gone `max_depth` levels below the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    /// Maximum number of parent-to-child steps from the root.
    pub max_depth: usize,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}

impl IndexConfig {
    /// Default depth limit. Real B-trees stay far below this.
    pub const DEFAULT_MAX_DEPTH: usize = 64;

    /// Environment variable overriding `max_depth`.
    pub const MAX_DEPTH_VAR: &'static str = "BTREE_INDEX_MAX_DEPTH";

    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `BTREE_INDEX_MAX_DEPTH` is set but is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_depth = Self::load_max_depth(std::env::var(Self::MAX_DEPTH_VAR).ok().as_deref())?;
        Ok(Self { max_depth })
    }

    /// Parse the max depth setting, defaulting when unset.
    fn load_max_depth(value: Option<&str>) -> Result<usize, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::DEFAULT_MAX_DEPTH);
        };

        match value.trim().parse::<usize>() {
            Ok(depth) if depth > 0 => Ok(depth),
            _ => Err(ConfigError::InvalidValue {
                name: Self::MAX_DEPTH_VAR.to_string(),
                message: format!("'{value}' is not a positive integer"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(IndexConfig::DEFAULT_MAX_DEPTH, 64);
        assert_eq!(IndexConfig::default().max_depth, 64);
    }

    #[test]
    fn test_load_max_depth_unset() {
        assert_eq!(IndexConfig::load_max_depth(None), Ok(64));
    }

    #[test]
    fn test_load_max_depth_valid() {
        assert_eq!(IndexConfig::load_max_depth(Some("8")), Ok(8));
        assert_eq!(IndexConfig::load_max_depth(Some(" 12 ")), Ok(12));
    }

    #[test]
    fn test_from_env_reads_max_depth_var() {
        let value = std::env::var(IndexConfig::MAX_DEPTH_VAR).ok();
        let expected =
            IndexConfig::load_max_depth(value.as_deref()).map(|max_depth| IndexConfig { max_depth });
        assert_eq!(IndexConfig::from_env(), expected);
    }

    #[test]
    fn test_load_max_depth_invalid() {
        for bad in ["0", "-3", "deep", ""] {
            let error = IndexConfig::load_max_depth(Some(bad))
                .expect_err("should reject");
            assert_eq!(
                error.to_string(),
                format!("invalid value for BTREE_INDEX_MAX_DEPTH: '{bad}' is not a positive integer")
            );
        }
    }
}
