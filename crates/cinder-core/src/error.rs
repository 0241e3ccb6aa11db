use thiserror::Error;

/// Top-level error type for the cinder crates.
#[derive(Debug, Error)]
pub enum CinderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Scene tree errors.
///
/// Soft rejections (duplicate component tag, removing a missing tag)
/// surface as `bool` returns, not as variants here; these cover lookups
/// with stale or foreign node ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("No node at index {index} (stale or foreign NodeId)")]
    NodeNotFound { index: usize },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_wraps_into_cinder_error() {
        let err = ConfigError::InvalidValue {
            field: "substeps",
            message: "must be >= 1".into(),
        };
        let top: CinderError = err.into();
        assert!(matches!(top, CinderError::Config(_)));
    }

    #[test]
    fn scene_error_display_names_index() {
        let err = SceneError::NodeNotFound { index: 7 };
        assert!(err.to_string().contains('7'));
    }
}
