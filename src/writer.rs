use log::info;
use ms_format::{MeshStats, MeshWriter};

use crate::error::Result;
use crate::loader::Loader;

/// Runs a full load cycle of `loader` into `writer` and returns the totals of
/// the written chunks.
pub fn convert<W: MeshWriter + ?Sized>(loader: &mut Loader, writer: &mut W) -> Result<MeshStats> {
    let mut chunks = loader.load()?;
    writer.write_materials(chunks.materials())?;

    let mut stats = MeshStats::default();
    while chunks.has_next() {
        let chunk = chunks.next_chunk()?;
        stats.add(&chunk);
        writer.write_chunk(&chunk)?;
    }
    let skipped = chunks.skipped_faces();
    drop(chunks);

    writer.finish()?;
    info!(
        "Converted {} vertices, {} faces in {} chunks ({} faces skipped)",
        stats.vertex_count, stats.face_count, stats.chunk_count, skipped
    );
    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mesh::MeshFormat;
    use ms_format::binary::{BinaryMeshReader, BinaryMeshWriter};
    use ms_format::json::{JsonMeshWriter, MeshDocument};
    use std::io::Cursor;

    const QUAD: &str = "v 0 0 0\nv 2 0 0\nv 2 1 0\nv 0 1 -1\nf 1 2 3 4\n";

    #[test]
    fn test_convert_binary() -> Result<()> {
        let mut loader = Loader::from_reader(Cursor::new(QUAD.as_bytes().to_vec()), MeshFormat::Obj)?;
        let mut writer = BinaryMeshWriter::new(Vec::new())?;
        let stats = convert(&mut loader, &mut writer)?;
        assert_eq!(stats.vertex_count, 4);
        assert_eq!(stats.face_count, 2);
        assert_eq!(stats.min, Some([0.0, 0.0, -1.0]));
        assert_eq!(stats.max, Some([2.0, 1.0, 0.0]));

        let reader = BinaryMeshReader::new(Cursor::new(writer.into_inner()))?;
        let chunks = reader.collect::<ms_format::Result<Vec<_>>>()?;
        assert_eq!(MeshStats::from_chunks(&chunks), stats);
        Ok(())
    }

    #[test]
    fn test_convert_json() -> Result<()> {
        let mut loader = Loader::from_reader(Cursor::new(QUAD.as_bytes().to_vec()), MeshFormat::Obj)?;
        let mut writer = JsonMeshWriter::new(Vec::new());
        let stats = convert(&mut loader, &mut writer)?;

        let document = MeshDocument::from_reader(writer.into_inner().as_slice())?;
        assert!(document.materials.is_empty());
        assert_eq!(MeshStats::from_chunks(&document.chunks), stats);
        assert!(!loader.is_locked());
        Ok(())
    }
}
