//! Error types for annotation conversion

use std::path::PathBuf;
use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// An annotation source points at an image that is not on disk
    #[error("missing image: {name}")]
    MissingImage { name: String },

    /// Polygon with fewer than 3 points, or a box with inverted bounds
    #[error("malformed geometry in {subject}: {reason}")]
    MalformedGeometry { subject: String, reason: String },

    /// Label not present in the configured category vocabulary
    #[error("unknown category: {label}")]
    UnknownCategory { label: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parse error in {}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Image header could not be read to get its dimensions
    #[error("cannot read image header of {}: {source}", .path.display())]
    ImageHeader {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Strict run aborted; carries every collected diagnostic
    #[error("conversion rejected with {} failure(s)", .0.failure_count())]
    Rejected(Diagnostics),
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedGeometry {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly name of the error kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::MissingImage { .. } => "MissingImageError",
            ConvertError::MalformedGeometry { .. } => "MalformedGeometryError",
            ConvertError::UnknownCategory { .. } => "UnknownCategoryError",
            ConvertError::Io { .. } => "IOError",
            ConvertError::Xml { .. } => "XmlError",
            ConvertError::Json { .. } => "JsonError",
            ConvertError::ImageHeader { .. } => "ImageHeaderError",
            ConvertError::Config(_) => "ConfigError",
            ConvertError::Rejected(_) => "Rejected",
        }
    }
}
