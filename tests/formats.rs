mod common;

use std::io::Cursor;

use common::{assert_chunk_invariants, binary_stl, init_logger, load_all, triangle_set, Grid};
use meshstream::{
    Loader, LoaderError, MaterialError, MaterialListener, MaterialLoader, Material, MeshFormat,
    Result, Texture, TextureListener,
};

fn loader(data: Vec<u8>, format: MeshFormat) -> Result<Loader> {
    Loader::from_reader(Cursor::new(data), format)
}

#[test]
fn test_cross_format_equivalence() -> Result<()> {
    init_logger();
    let grid = Grid::new(8);
    let sources = vec![
        ("obj", grid.to_obj().into_bytes(), MeshFormat::Obj),
        ("ascii ply", grid.to_ascii_ply(), MeshFormat::Ply),
        ("little endian ply", grid.to_little_endian_ply()?, MeshFormat::Ply),
        ("big endian ply", grid.to_big_endian_ply()?, MeshFormat::Ply),
    ];

    for capacity in [3, 10, 1000] {
        let mut reference = None;
        for (name, data, format) in &sources {
            let mut loader = loader(data.clone(), *format)?;
            assert!(loader.is_valid_file()?, "{}", name);
            loader.set_max_vertices_in_chunk(capacity)?;
            let chunks = load_all(&mut loader)?;
            assert_chunk_invariants(&chunks, capacity);

            let vertices: usize = chunks.iter().map(|c| c.vertex_count()).sum();
            let summary = (chunks.len(), vertices, triangle_set(&chunks));
            match &reference {
                None => reference = Some(summary),
                Some(expected) => assert_eq!(&summary, expected, "{} at {}", name, capacity),
            }
        }
    }
    Ok(())
}

#[test]
fn test_ply_point_cloud_with_colors() -> Result<()> {
    let data = "ply\nformat ascii 1.0\nelement vertex 3\nproperty double x\nproperty double y\nproperty double z\nproperty uchar red\nproperty uchar green\nproperty uchar blue\nproperty uchar alpha\nend_header\n1 2 3 10 20 30 40\n4 5 6 0 0 0 255\n-1 -2 -3 255 255 255 0\n";
    let mut loader = loader(data.as_bytes().to_vec(), MeshFormat::Ply)?;
    let chunks = load_all(&mut loader)?;

    assert_eq!(chunks.len(), 1);
    let chunk = &chunks[0];
    assert_eq!(chunk.vertex_count(), 3);
    assert_eq!(chunk.color_components, 4);
    assert_eq!(
        chunk.colors.as_deref(),
        Some(&[10, 20, 30, 40, 0, 0, 0, 255, 255, 255, 255, 0][..])
    );
    assert_eq!(chunk.bounds(), Some(([-1.0, -2.0, -3.0], [4.0, 5.0, 6.0])));
    Ok(())
}

#[test]
fn test_malformed_ply() -> Result<()> {
    for data in [
        "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n0 0\n",
        "ply\nformat ascii 1.0\nproperty float x\nend_header\n",
        "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\n",
        "ply\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n",
        "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n",
    ] {
        let mut loader = loader(data.as_bytes().to_vec(), MeshFormat::Ply)?;
        let result = load_all(&mut loader);
        assert!(matches!(result, Err(LoaderError::Malformed(_))), "{:?}", data);
        assert!(!loader.is_locked());
    }
    Ok(())
}

#[test]
fn test_stl_ascii_and_binary() -> Result<()> {
    init_logger();
    let triangles = [
        [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    ];

    let mut ascii = String::from("solid corner\n");
    for triangle in &triangles {
        ascii.push_str("  facet normal 0 0 0\n    outer loop\n");
        for [x, y, z] in triangle {
            ascii.push_str(&format!("      vertex {} {} {}\n", x, y, z));
        }
        ascii.push_str("    endloop\n  endfacet\n");
    }
    ascii.push_str("endsolid corner\n");

    let mut ascii_loader = loader(ascii.into_bytes(), MeshFormat::Stl)?;
    let mut binary_loader = loader(binary_stl("corner", &triangles)?, MeshFormat::Stl)?;
    assert!(ascii_loader.is_valid_file()?);
    assert!(binary_loader.is_valid_file()?);

    let ascii_chunks = load_all(&mut ascii_loader)?;
    let binary_chunks = load_all(&mut binary_loader)?;
    assert_eq!(ascii_chunks, binary_chunks);
    assert_eq!(ascii_chunks[0].vertex_count(), 5);
    assert_eq!(ascii_loader.comments(), ["corner"]);
    assert_eq!(binary_loader.comments(), ["corner"]);

    binary_loader.set_max_vertices_in_chunk(3)?;
    let chunks = load_all(&mut binary_loader)?;
    assert_eq!(chunks.len(), 3);
    assert_eq!(triangle_set(&chunks), triangle_set(&ascii_chunks));
    Ok(())
}

struct Library;

impl MaterialListener for Library {
    fn on_material_loader_requested(&mut self, path: &str) -> Option<Box<dyn MaterialLoader>> {
        let path = path.to_owned();
        Some(Box::new(move || match path.as_str() {
            "scene.mtl" => {
                let mut brick = Material::named("brick");
                brick.diffuse_texture_map = Some(Texture::new(0, "brick.png"));
                brick.bump_texture_map = Some(Texture::new(0, "brick.tga"));
                Ok(vec![brick, Material::named("glass")])
            }
            "broken.mtl" => Err(MaterialError::Invalid("bad syntax".into())),
            "fatal.mtl" => Err(MaterialError::Fatal("disk on fire".into())),
            _ => Err(MaterialError::NotFound(path.clone())),
        }))
    }
}

struct PngOnly;

impl TextureListener for PngOnly {
    fn on_validate_texture(&mut self, texture: &mut Texture) -> bool {
        texture.width = Some(64);
        texture.file_name.ends_with(".png")
    }
}

#[test]
fn test_materials() -> Result<()> {
    init_logger();
    let data = "mtllib scene.mtl broken.mtl missing.mtl\n\
                v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n\
                usemtl brick\nf 1 2 3\nf 1 3 4\n\
                usemtl glass\nf 1 2 4\n\
                usemtl unknown\nf 2 3 4\n";

    let mut loader = loader(data.as_bytes().to_vec(), MeshFormat::Obj)?;
    loader.set_material_listener(Some(Box::new(Library)))?;
    loader.set_texture_listener(Some(Box::new(PngOnly)))?;

    let chunks = load_all(&mut loader)?;
    let materials: Vec<Option<u32>> = chunks.iter().map(|c| c.material_id).collect();
    assert_eq!(materials, vec![Some(0), Some(1), None]);
    assert_eq!(chunks[0].face_count(), 2);

    let loaded = loader.materials();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].id, 1);
    assert_eq!(loaded[1].name.as_deref(), Some("glass"));
    let diffuse = loaded[0].diffuse_texture_map.as_ref().map(|t| (t.valid, t.width));
    let bump = loaded[0].bump_texture_map.as_ref().map(|t| t.valid);
    assert_eq!(diffuse, Some((true, Some(64))));
    assert_eq!(bump, Some(false));

    // without a listener the geometry still loads
    loader.set_material_listener(None)?;
    let chunks = load_all(&mut loader)?;
    assert_eq!(chunks.len(), 1);
    assert!(loader.materials().is_empty());
    Ok(())
}

#[test]
fn test_fatal_material_error() -> Result<()> {
    let data = "mtllib fatal.mtl\nv 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n";
    let mut loader = loader(data.as_bytes().to_vec(), MeshFormat::Obj)?;
    loader.set_material_listener(Some(Box::new(Library)))?;

    assert!(matches!(loader.load(), Err(LoaderError::Material(_))));
    assert!(!loader.is_locked());
    Ok(())
}
