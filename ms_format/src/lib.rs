pub mod binary;
pub mod chunk;
pub mod error;
pub mod json;
pub mod material;
pub mod stats;

pub use chunk::DataChunk;
pub use error::{FormatError, Result};
pub use material::{Illumination, Material, Texture};
pub use stats::MeshStats;

/// Sink for a serialized mesh. Materials go first, then any number of chunks,
/// then [`MeshWriter::finish`].
pub trait MeshWriter {
    fn write_materials(&mut self, materials: &[Material]) -> Result<()>;
    fn write_chunk(&mut self, chunk: &DataChunk) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}
