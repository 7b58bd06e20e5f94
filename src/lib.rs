//! Chunked streaming loaders for OBJ, PLY and STL meshes.
//!
//! A [`Loader`] is bound to a seekable source and produces bounded
//! [`DataChunk`]s through a pull iterator, re-reading passed vertex records
//! through a stream position cache instead of keeping the mesh in memory.

pub mod config;
pub mod error;
pub mod listener;
pub mod loader;
mod material;
pub mod mesh;
pub mod source;
pub mod utils;
pub mod writer;

pub use config::{
    LoaderConfig, VertexKey, DEFAULT_MAX_STREAM_POSITIONS, DEFAULT_MAX_VERTICES_IN_CHUNK,
    MIN_MAX_VERTICES_IN_CHUNK, MIN_STREAM_POSITIONS,
};
pub use error::{LoaderError, Result};
pub use listener::{LoaderListener, MaterialError, MaterialListener, MaterialLoader, TextureListener};
pub use loader::{Loader, LoaderIterator};
pub use mesh::MeshFormat;
pub use source::MeshSource;
pub use writer::convert;

pub use ms_format::{DataChunk, Illumination, Material, MeshStats, MeshWriter, Texture};
