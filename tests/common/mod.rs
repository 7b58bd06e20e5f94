#![allow(dead_code)]

use std::fmt::Write as _;
use std::io::Write;

use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};
use meshstream::{DataChunk, Loader, Result};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A `size × size` vertex grid made of quads. Rows alternate between `z = 0`
/// and `z = 0.5` so every quad stays planar.
pub struct Grid {
    pub size: u32,
}

impl Grid {
    pub fn new(size: u32) -> Self {
        Grid { size }
    }

    pub fn vertices(&self) -> Vec<[f32; 3]> {
        let mut vertices = Vec::new();
        for y in 0..self.size {
            for x in 0..self.size {
                vertices.push([x as f32, y as f32, (y % 2) as f32 * 0.5]);
            }
        }
        vertices
    }

    /// Zero-based, counter-clockwise quads.
    pub fn quads(&self) -> Vec<[u32; 4]> {
        let mut quads = Vec::new();
        for y in 0..self.size - 1 {
            for x in 0..self.size - 1 {
                let a = y * self.size + x;
                quads.push([a, a + 1, a + 1 + self.size, a + self.size]);
            }
        }
        quads
    }

    pub fn to_obj(&self) -> String {
        let mut out = String::from("# grid\n");
        for [x, y, z] in self.vertices() {
            let _ = writeln!(out, "v {} {} {}", x, y, z);
        }
        for quad in self.quads() {
            let _ = writeln!(
                out,
                "f {} {} {} {}",
                quad[0] + 1,
                quad[1] + 1,
                quad[2] + 1,
                quad[3] + 1
            );
        }
        out
    }

    fn ply_header(&self, format: &str) -> String {
        format!(
            "ply\nformat {} 1.0\ncomment grid\nelement vertex {}\nproperty float x\nproperty float y\nproperty float z\nelement face {}\nproperty list uchar int vertex_indices\nend_header\n",
            format,
            self.vertices().len(),
            self.quads().len()
        )
    }

    pub fn to_ascii_ply(&self) -> Vec<u8> {
        let mut out = self.ply_header("ascii");
        for [x, y, z] in self.vertices() {
            let _ = writeln!(out, "{} {} {}", x, y, z);
        }
        for quad in self.quads() {
            let _ = writeln!(out, "4 {} {} {} {}", quad[0], quad[1], quad[2], quad[3]);
        }
        out.into_bytes()
    }

    pub fn to_binary_ply<E: ByteOrder>(&self, format: &str) -> Result<Vec<u8>> {
        let mut out = self.ply_header(format).into_bytes();
        for vertex in self.vertices() {
            for value in vertex {
                out.write_f32::<E>(value)?;
            }
        }
        for quad in self.quads() {
            out.write_u8(4)?;
            for index in quad {
                out.write_i32::<E>(index as i32)?;
            }
        }
        Ok(out)
    }

    pub fn to_little_endian_ply(&self) -> Result<Vec<u8>> {
        self.to_binary_ply::<LittleEndian>("binary_little_endian")
    }

    pub fn to_big_endian_ply(&self) -> Result<Vec<u8>> {
        self.to_binary_ply::<BigEndian>("binary_big_endian")
    }
}

/// Binary STL of the given triangles with a zero normal per facet.
pub fn binary_stl(header: &str, triangles: &[[[f32; 3]; 3]]) -> Result<Vec<u8>> {
    let mut out = vec![0u8; 80];
    out[..header.len()].copy_from_slice(header.as_bytes());
    out.write_u32::<LittleEndian>(triangles.len() as u32)?;
    for triangle in triangles {
        for _ in 0..3 {
            out.write_f32::<LittleEndian>(0.0)?;
        }
        for vertex in triangle {
            for value in vertex {
                out.write_f32::<LittleEndian>(*value)?;
            }
        }
        out.write_u16::<LittleEndian>(0)?;
    }
    Ok(out)
}

pub fn write_file(dir: &std::path::Path, name: &str, data: &[u8]) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    std::fs::File::create(&path)?.write_all(data)?;
    Ok(path)
}

pub fn load_all(loader: &mut Loader) -> Result<Vec<DataChunk>> {
    loader.load()?.collect()
}

/// Triangles of all chunks resolved to positions (scaled to integers), sorted,
/// so chunkings of the same mesh compare equal.
pub fn triangle_set(chunks: &[DataChunk]) -> Vec<[[i32; 3]; 3]> {
    let mut triangles: Vec<[[i32; 3]; 3]> = chunks
        .iter()
        .flat_map(|chunk| {
            chunk.triangles().map(move |t| {
                t.map(|index| {
                    let p = chunk.vertex(index as usize).unwrap_or_default();
                    p.map(|v| (v * 2.0).round() as i32)
                })
            })
        })
        .collect();
    triangles.sort_unstable();
    triangles
}

/// Checks the per-chunk invariants: vertex bound, local indices and a bounding
/// box that matches the vertices.
pub fn assert_chunk_invariants(chunks: &[DataChunk], capacity: usize) {
    for chunk in chunks {
        let count = chunk.vertex_count();
        assert!(count <= capacity, "{} vertices exceed {}", count, capacity);
        assert_eq!(chunk.indices.len() % 3, 0);
        assert!(chunk.indices.iter().all(|i| (*i as usize) < count));

        if count == 0 {
            assert_eq!(chunk.bounds(), None);
            continue;
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for i in 0..count {
            let p = chunk.vertex(i).unwrap_or_default();
            for n in 0..3 {
                min[n] = min[n].min(p[n]);
                max[n] = max[n].max(p[n]);
            }
        }
        assert_eq!(chunk.bounds(), Some((min, max)));
    }
}
