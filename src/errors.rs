//! Error Types
//!
//! This module defines the error types used throughout the viewer core.
//!
//! # Overview
//!
//! Failures are split by how far they are allowed to travel:
//!
//! - [`AssetError`]: load-time failures (network, decode, parse). These are the
//!   only errors that cross into user-visible state; the viewer reacts by
//!   installing a placeholder scene.
//! - [`ShaderError`]: a catalog or compile failure for one shader. Isolated to
//!   that shader; every other render mode keeps working.
//!
//! Missing attributes (normals, vertex colors) and degenerate colliders are not
//! errors at all: they are recovered locally with safe defaults.
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`.

use thiserror::Error;

/// Load-time failures for meshes and textures.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The requested resource could not be found.
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// HTTP response with a non-success status code.
    #[error("HTTP response error: status {status} for {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Transport-level network failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The bytes were fetched but are not a valid file of the expected format.
    #[error("{format} parse error: {message}")]
    Parse {
        /// Format name (OBJ, STL, PLY, OFF, glTF)
        format: &'static str,
        /// What went wrong
        message: String,
    },

    /// The file parsed but holds no drawable geometry.
    #[error("Mesh contains no geometry: {0}")]
    EmptyMesh(String),

    /// Image decoding error.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Feature not enabled at compile time (e.g. HTTP).
    #[error("Feature not enabled: {0}")]
    FeatureNotEnabled(String),
}

/// Per-shader failures. Never fatal for the viewer as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// No descriptor with this id in the catalog.
    #[error("Unknown shader id: {0}")]
    UnknownShader(String),

    /// The shader source failed validation or compilation.
    #[error("Shader '{id}' failed to compile: {message}")]
    CompileFailed {
        /// Shader id
        id: String,
        /// Compiler diagnostic
        message: String,
    },

    /// Template rendering for a generated shader failed.
    #[error("Shader template error: {0}")]
    Template(String),

    /// An override or control edit does not fit the uniform schema.
    #[error("Shader '{id}': invalid uniform '{name}': {message}")]
    InvalidUniform {
        /// Shader id
        id: String,
        /// Uniform name
        name: String,
        /// What is wrong with it
        message: String,
    },

    /// The catalog itself is malformed.
    #[error("Shader catalog error: {0}")]
    Catalog(String),
}

/// The main error type for the viewer core.
#[derive(Error, Debug)]
pub enum Error {
    /// Load-time failure.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// Shader failure.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Base64 decoding error (glTF data URIs).
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Invalid user-supplied configuration value.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this failure happened while loading bytes or parsing a file.
    #[must_use]
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Asset(_) | Self::Io(_) | Self::Url(_) | Self::Base64(_))
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Asset(AssetError::ImageDecode(err.to_string()))
    }
}

impl From<gltf::Error> for Error {
    fn from(err: gltf::Error) -> Self {
        Error::Asset(AssetError::Parse {
            format: "glTF",
            message: err.to_string(),
        })
    }
}

impl From<tobj::LoadError> for Error {
    fn from(err: tobj::LoadError) -> Self {
        Error::Asset(AssetError::Parse {
            format: "OBJ",
            message: err.to_string(),
        })
    }
}

impl From<minijinja::Error> for Error {
    fn from(err: minijinja::Error) -> Self {
        Error::Shader(ShaderError::Template(err.to_string()))
    }
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand for a parse failure of a given format.
pub(crate) fn parse_error(format: &'static str, message: impl Into<String>) -> Error {
    Error::Asset(AssetError::Parse {
        format,
        message: message.into(),
    })
}
