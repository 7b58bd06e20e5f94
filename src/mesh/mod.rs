//! Chunked readers for the supported mesh formats and the pieces they share.

pub(crate) mod builder;
pub(crate) mod dedup;
pub mod obj;
pub mod ply;
pub(crate) mod position_cache;
pub mod stl;
pub(crate) mod triangulate;

use std::collections::VecDeque;
use std::io::Read;
use std::path::Path;

use log::warn;
use ms_format::DataChunk;

use crate::error::Result;
use crate::source::MeshSource;
use crate::utils;

use self::builder::{ChunkBuilder, Vertex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Obj,
    Ply,
    Stl,
}

impl MeshFormat {
    /// Detect format from file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        utils::extension(path).and_then(|ext| match ext.as_str() {
            "obj" => Some(MeshFormat::Obj),
            "ply" => Some(MeshFormat::Ply),
            "stl" => Some(MeshFormat::Stl),
            _ => None,
        })
    }

    /// Detect format from the content of `source`, restoring its position.
    pub(crate) fn sniff(source: &mut MeshSource) -> Result<Option<Self>> {
        for format in [MeshFormat::Ply, MeshFormat::Stl, MeshFormat::Obj] {
            if is_valid(format, source)? {
                return Ok(Some(format));
            }
        }
        Ok(None)
    }
}

/// Lightweight signature check of `source` for `format`; the read position is
/// restored afterwards.
pub(crate) fn is_valid(format: MeshFormat, source: &mut MeshSource) -> Result<bool> {
    let position = source.position();
    source.seek_to(0)?;
    let valid = match format {
        MeshFormat::Obj => obj::is_valid(source),
        MeshFormat::Ply => ply::is_valid(source),
        MeshFormat::Stl => stl::is_valid(source),
    };
    source.seek_to(position)?;
    valid
}

/// State of one load cycle of a single format.
pub(crate) trait ChunkReader {
    fn has_next(&self) -> bool;

    /// Consumed share of the body in `[0, 1]`, never decreasing.
    fn progress(&self) -> f32;

    /// Runs one bounded pass over `source`.
    fn read_chunk(&mut self, source: &mut MeshSource) -> Result<DataChunk>;

    fn skipped_faces(&self) -> usize {
        0
    }
}

/// Moves pending triangles into `builder` until one does not fit. Returns
/// `false` when the chunk is full.
pub(crate) fn drain_triangles(builder: &mut ChunkBuilder, pending: &mut VecDeque<[Vertex; 3]>) -> bool {
    while let Some(triangle) = pending.front() {
        if !builder.fits(triangle) {
            return false;
        }
        builder.push_triangle(triangle);
        pending.pop_front();
    }
    true
}

/// Triangulates a face. A failing face is skipped and counted when
/// `continue_on_error` is set.
pub(crate) fn face_triangles(
    face: &[Vertex],
    continue_on_error: bool,
    skipped: &mut usize,
) -> Result<Vec<[Vertex; 3]>> {
    let positions: Vec<[f32; 3]> = face.iter().map(|v| v.position).collect();
    match triangulate::triangulate(&positions) {
        Ok(triangles) => Ok(triangles
            .iter()
            .map(|t| [face[t[0]], face[t[1]], face[t[2]]])
            .collect()),
        Err(err) if continue_on_error => {
            warn!("Skipping face: {}", err);
            *skipped += 1;
            Ok(Vec::new())
        }
        Err(err) => Err(err),
    }
}

pub(crate) fn ratio(done: u64, total: u64) -> f32 {
    if total == 0 {
        1.0
    } else {
        (done as f32 / total as f32).min(1.0)
    }
}

/// Reads up to `buf.len()` bytes, fewer only at the end of the source.
pub(crate) fn read_prefix(source: &mut MeshSource, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = source.read(&mut buf[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

/// Scales a color channel to `0..=255`, treating floating point channels as
/// `0.0..=1.0`.
pub(crate) fn color_channel(value: f64, is_float: bool) -> u8 {
    let value = if is_float { value * 255.0 } else { value };
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::LoaderError;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            MeshFormat::from_path(Path::new("test.PLY")),
            Some(MeshFormat::Ply)
        );
        assert_eq!(
            MeshFormat::from_path(Path::new("a/b/test.obj")),
            Some(MeshFormat::Obj)
        );
        assert_eq!(
            MeshFormat::from_path(Path::new("test.stl")),
            Some(MeshFormat::Stl)
        );
        assert_eq!(MeshFormat::from_path(Path::new("test.xyz")), None);
    }

    #[test]
    fn test_face_triangles_skip() -> Result<()> {
        let degenerate = [Vertex::default(); 2];
        let mut skipped = 0;
        assert!(face_triangles(&degenerate, true, &mut skipped)?.is_empty());
        assert_eq!(skipped, 1);
        assert!(matches!(
            face_triangles(&degenerate, false, &mut skipped),
            Err(LoaderError::Triangulation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_color_channel() {
        assert_eq!(color_channel(1.0, true), 255);
        assert_eq!(color_channel(0.5, true), 128);
        assert_eq!(color_channel(300.0, false), 255);
        assert_eq!(color_channel(-4.0, false), 0);
        assert_eq!(color_channel(17.0, false), 17);
    }
}
