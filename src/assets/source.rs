//! Mesh source addressing.
//!
//! A mesh is addressed as `base / category / filename ? v=token`. The token
//! busts HTTP caches when a file is rewritten in place (e.g. after a repair).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::{Error, Result};

/// Which backend bucket a mesh lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshCategory {
    /// User uploads.
    Input,
    /// Produced by a generator (text/image to 3D).
    Generated,
    /// Simplified output.
    Output,
    /// Retopologized output.
    Retopo,
    Segmented,
    /// Quality-analysis overlays.
    Quality,
    /// Side-by-side comparison exports.
    Compared,
}

impl MeshCategory {
    pub const ALL: [MeshCategory; 7] = [
        Self::Input,
        Self::Generated,
        Self::Output,
        Self::Retopo,
        Self::Segmented,
        Self::Quality,
        Self::Compared,
    ];

    /// URL path segment.
    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Generated => "generated",
            Self::Output => "output",
            Self::Retopo => "retopo",
            Self::Segmented => "segmented",
            Self::Quality => "quality",
            Self::Compared => "compared",
        }
    }
}

impl fmt::Display for MeshCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for MeshCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.segment().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown mesh category '{s}'")))
    }
}

/// A mesh file reachable by URL.
///
/// Two sources with the same filename in different categories (or with
/// different cache tokens) are distinct meshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshSource {
    pub base: String,
    pub category: MeshCategory,
    pub filename: String,
    pub cache_token: Option<String>,
}

impl MeshSource {
    #[must_use]
    pub fn new(base: impl Into<String>, category: MeshCategory, filename: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            category,
            filename: filename.into(),
            cache_token: None,
        }
    }

    #[must_use]
    pub fn with_cache_token(mut self, token: impl Into<String>) -> Self {
        self.cache_token = Some(token.into());
        self
    }

    /// Lower-cased extension without the dot; empty if the filename has none.
    #[must_use]
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn stem(&self) -> &str {
        std::path::Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }

    /// Path relative to the base: `category/filename`.
    #[must_use]
    pub fn relative_path(&self) -> String {
        format!("{}/{}", self.category.segment(), self.filename)
    }

    /// Full address, including the cache token as a `v` query parameter.
    ///
    /// Remote bases are validated as URLs; anything else is treated as a
    /// filesystem root and joined with `/`.
    pub fn url(&self) -> Result<String> {
        let base = self.base.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            let mut url = Url::parse(&format!("{base}/"))?.join(&self.relative_path())?;
            if let Some(token) = &self.cache_token {
                url.query_pairs_mut().append_pair("v", token);
            }
            Ok(url.into())
        } else {
            let mut path = format!("{base}/{}", self.relative_path());
            if let Some(token) = &self.cache_token {
                path.push_str("?v=");
                path.push_str(token);
            }
            Ok(path)
        }
    }

    /// The GLB companion used for display (`bunny.obj` → `bunny.glb`).
    ///
    /// glTF sources are already viewable and are returned unchanged.
    #[must_use]
    pub fn viewing_path(&self) -> MeshSource {
        match self.extension().as_str() {
            "glb" | "gltf" => self.clone(),
            _ => MeshSource {
                filename: format!("{}.glb", self.stem()),
                ..self.clone()
            },
        }
    }
}
