//! # Mesh Errors
//!
//! Error types for mesh editing operations.

use thiserror::Error;

/// Errors that can occur while editing or loading meshes.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Invalid mesh topology
    #[error("Invalid topology: {message}")]
    InvalidTopology { message: String },

    /// Degenerate geometry
    #[error("Degenerate geometry: {message}")]
    DegenerateGeometry { message: String },

    /// The cutting plane does not separate any geometry
    #[error("Bisect missed: plane leaves all geometry on one side")]
    BisectMissed,

    /// Malformed mesh file
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Reading or writing a mesh file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MeshError {
    /// Creates an invalid topology error.
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Creates a degenerate geometry error.
    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            message: message.into(),
        }
    }

    /// Creates a parse error for the given 1-based line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}
