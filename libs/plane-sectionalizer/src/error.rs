//! # Sectionalizer Errors
//!
//! Error types for scene loading, the sectionalizer pipeline and export.

use thiserror::Error;
use tile_mesh::MeshError;

/// Errors that can occur while sectionalizing.
#[derive(Debug, Error)]
pub enum SectionalizeError {
    /// Nothing is selected.
    #[error("No active object: select at least one mesh object")]
    NoActiveObject,

    /// A selected or referenced object does not exist.
    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    /// A selected object has no faces.
    #[error("Object '{0}' has no mesh data")]
    NoMeshData(String),

    /// Settings failed validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// The selection is flat along a grid axis in by-number mode.
    #[error("Degenerate bounds: {width} x {height} cannot be divided into cells")]
    DegenerateBounds { width: f64, height: f64 },

    /// Geometry toolkit failure.
    #[error(transparent)]
    Mesh(#[from] MeshError),

    /// A tile material exceeds the engine's vertex budget.
    #[error(
        "Vertex budget exceeded: '{material}' of {section} has {count} vertices (max {max})"
    )]
    VertexBudgetExceeded {
        section: String,
        material: String,
        count: usize,
        max: usize,
    },

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene manifest is malformed.
    #[error("Manifest error: {0}")]
    Manifest(String),
}

impl SectionalizeError {
    /// Creates an invalid settings error.
    pub fn invalid_settings(message: impl Into<String>) -> Self {
        Self::InvalidSettings(message.into())
    }

    /// Creates a manifest error.
    pub fn manifest(message: impl Into<String>) -> Self {
        Self::Manifest(message.into())
    }

    /// True for errors raised before the scene is touched.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoActiveObject
                | Self::ObjectNotFound(_)
                | Self::NoMeshData(_)
                | Self::InvalidSettings(_)
                | Self::DegenerateBounds { .. }
        )
    }
}

impl From<toml::de::Error> for SectionalizeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Manifest(err.to_string())
    }
}

/// Result alias for sectionalizer operations.
pub type Result<T> = std::result::Result<T, SectionalizeError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SectionalizeError::VertexBudgetExceeded {
            section: "Plane_SECT.000".to_string(),
            material: "Grass".to_string(),
            count: 4096,
            max: 4095,
        };
        let text = err.to_string();
        assert!(text.contains("4096"));
        assert!(text.contains("Plane_SECT.000"));
    }

    #[test]
    fn test_precondition_classification() {
        assert!(SectionalizeError::NoActiveObject.is_precondition());
        assert!(SectionalizeError::invalid_settings("x").is_precondition());
        assert!(!SectionalizeError::from(MeshError::BisectMissed).is_precondition());
    }
}
