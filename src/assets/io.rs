use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::errors::{AssetError, Result};

/// Asynchronous byte source for mesh and texture files.
pub trait AssetReader: Send + Sync {
    /// Reads the resource at `uri`, relative to the reader's root.
    fn read_bytes(&self, uri: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}

/// Strips a `?query` suffix (cache tokens are meaningless on disk).
fn strip_query(uri: &str) -> &str {
    uri.split_once('?').map_or(uri, |(path, _)| path)
}

/// Local filesystem reader.
#[cfg(not(target_arch = "wasm32"))]
pub struct FileAssetReader {
    root_path: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileAssetReader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let root_path = if path.is_file() {
            path.parent().unwrap_or(Path::new(".")).to_path_buf()
        } else {
            path.to_path_buf()
        };
        Self { root_path }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let path = self.root_path.join(strip_query(uri));
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.display().to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// HTTP reader backed by `ehttp`.
#[cfg(feature = "http")]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    pub fn new(url_str: &str) -> Result<Self> {
        let url = url::Url::parse(url_str)?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };

        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        let url = self.root_url.join(uri)?;
        let request = ehttp::Request::get(url.as_str());
        let response = ehttp::fetch_async(request)
            .await
            .map_err(AssetError::Network)?;

        if !response.ok {
            return Err(AssetError::HttpStatus {
                status: response.status,
                url: url.to_string(),
            }
            .into());
        }
        Ok(response.bytes)
    }
}

/// In-memory reader. Used for tests and for bytes handed over by the host
/// (drag-and-drop, clipboard).
#[derive(Default, Clone)]
pub struct MemoryAssetReader {
    files: FxHashMap<String, Arc<Vec<u8>>>,
}

impl MemoryAssetReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(uri.into(), Arc::new(bytes.into()));
    }

    #[must_use]
    pub fn with_file(mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }
}

impl AssetReader for MemoryAssetReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.files
            .get(strip_query(uri))
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| AssetError::NotFound(uri.to_string()).into())
    }
}

/// Reader variants, dispatched statically.
#[derive(Clone)]
pub enum AssetReaderVariant {
    #[cfg(not(target_arch = "wasm32"))]
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
    Memory(Arc<MemoryAssetReader>),
}

impl AssetReaderVariant {
    /// Picks a reader for a base path or URL.
    pub fn from_source(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            #[cfg(feature = "http")]
            {
                let base = if source.ends_with('/') {
                    source.to_string()
                } else {
                    format!("{source}/")
                };
                Ok(Self::Http(Arc::new(HttpAssetReader::new(&base)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(AssetError::FeatureNotEnabled(
                    "HTTP feature is not enabled. Enable it with `features = [\"http\"]`".into(),
                )
                .into())
            }
        } else {
            #[cfg(not(target_arch = "wasm32"))]
            {
                Ok(Self::File(Arc::new(FileAssetReader::new(source))))
            }
            #[cfg(target_arch = "wasm32")]
            {
                Err(AssetError::FeatureNotEnabled("filesystem access on wasm32".into()).into())
            }
        }
    }

    #[must_use]
    pub fn memory(reader: MemoryAssetReader) -> Self {
        Self::Memory(Arc::new(reader))
    }

    pub async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Self::File(r) => r.read_bytes(uri).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read_bytes(uri).await,
            Self::Memory(r) => r.read_bytes(uri).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_stripped() {
        assert_eq!(strip_query("input/a.obj?v=3"), "input/a.obj");
        assert_eq!(strip_query("input/a.obj"), "input/a.obj");
    }

    #[test]
    fn memory_reader_ignores_cache_token() {
        let reader = MemoryAssetReader::new().with_file("input/a.obj", b"v 0 0 0".to_vec());
        let bytes = pollster::block_on(reader.read_bytes("input/a.obj?v=7")).unwrap();
        assert_eq!(bytes, b"v 0 0 0");
    }
}
