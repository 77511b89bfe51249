//! Mesh acquisition: addressing, byte readers, format loaders and the
//! normalized [`MeshHandle`].

pub mod io;
pub mod loaders;
pub mod mesh_handle;
pub mod source;

pub use io::{AssetReader, AssetReaderVariant, MemoryAssetReader};
#[cfg(not(target_arch = "wasm32"))]
pub use io::FileAssetReader;
#[cfg(feature = "http")]
pub use io::HttpAssetReader;
pub use loaders::{FormatLoader, LoadContext, MeshFormat, ParsedMesh, ParsedPart};
pub use mesh_handle::{CapturedMaterials, MaterialKey, MeshHandle, SubMesh};
pub use source::{MeshCategory, MeshSource};
