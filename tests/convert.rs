mod common;

use std::fs::File;
use std::io::BufWriter;

use common::{init_logger, triangle_set, write_file, Grid};
use anyhow::{Context, Result};
use meshstream::{convert, Loader, MeshStats};
use ms_format::binary::{BinaryMeshReader, BinaryMeshWriter};
use ms_format::json::{JsonMeshWriter, MeshDocument};

#[test]
fn test_binary_round_trip() -> Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let grid = Grid::new(10);
    let path = write_file(dir.path(), "grid.ply", &grid.to_little_endian_ply()?)?;
    let out = dir.path().join("grid.mshb");

    let mut loader = Loader::from_path(&path)?;
    loader.set_max_vertices_in_chunk(50)?;
    let stats = {
        let mut writer = BinaryMeshWriter::new(BufWriter::new(File::create(&out)?))?;
        convert(&mut loader, &mut writer)?
    };
    assert_eq!(stats.face_count, 2 * 81);
    assert_eq!(stats.min, Some([0.0, 0.0, 0.0]));
    assert_eq!(stats.max, Some([9.0, 9.0, 0.5]));

    let reader = BinaryMeshReader::from_file(&out).context("reopen binary mesh")?;
    assert!(reader.materials().is_empty());
    let chunks = reader.collect::<ms_format::Result<Vec<_>>>()?;
    assert_eq!(MeshStats::from_chunks(&chunks), stats);
    assert!(chunks.iter().all(|c| c.vertex_count() <= 50));

    let direct: Vec<_> = loader.load()?.collect::<meshstream::Result<_>>()?;
    assert_eq!(direct, chunks);
    Ok(())
}

#[test]
fn test_json_round_trip() -> Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let grid = Grid::new(6);
    let path = write_file(dir.path(), "grid.obj", grid.to_obj().as_bytes())?;
    write_file(dir.path(), "obj.toml", b"max_vertices_in_chunk = 6\nallow_duplicate_vertices_in_chunk = true\n")?;
    let out = dir.path().join("grid.json");

    let mut loader = Loader::from_path(&path)?;
    assert!(loader.allow_duplicate_vertices_in_chunk());
    let stats = {
        let mut writer = JsonMeshWriter::new(BufWriter::new(File::create(&out)?));
        convert(&mut loader, &mut writer)?
    };
    // two triangles per chunk
    assert_eq!(stats.chunk_count, 25);
    assert_eq!(stats.vertex_count, 25 * 6);

    let document = MeshDocument::from_file(&out).context("reopen json mesh")?;
    assert_eq!(MeshStats::from_chunks(&document.chunks), stats);

    loader.set_allow_duplicate_vertices_in_chunk(false)?;
    let direct: Vec<_> = loader.load()?.collect::<meshstream::Result<_>>()?;
    assert_eq!(triangle_set(&direct), triangle_set(&document.chunks));
    Ok(())
}
