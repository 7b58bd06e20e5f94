use std::collections::{HashMap, VecDeque};

use log::{debug, info, warn};
use ms_format::{DataChunk, Material};

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::listener::{MaterialListener, TextureListener};
use crate::material::MaterialLibrary;
use crate::mesh::builder::{Attributes, ChunkBuilder, Vertex};
use crate::mesh::position_cache::StreamPositionCache;
use crate::mesh::{drain_triangles, face_triangles, ratio, ChunkReader};
use crate::source::MeshSource;

use super::parser::{parse_face, parse_line, resolve_index, split_token, FaceIndex, Kind, Statement};

/// A decoded `v`, `vt` or `vn` record.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Record {
    Position([f32; 3], Option<[u8; 3]>),
    TextureCoordinate([f32; 2]),
    Normal([f32; 3]),
}

impl Record {
    fn apply(self, vertex: &mut Vertex) {
        match self {
            Record::Position(position, color) => {
                vertex.position = position;
                vertex.color = color.map(|[r, g, b]| [r, g, b, 255]);
            }
            Record::TextureCoordinate(uv) => vertex.uv = Some(uv),
            Record::Normal(normal) => vertex.normal = Some(normal),
        }
    }
}

/// Everything the pre-scan learns about an OBJ body.
#[derive(Debug, Default)]
struct Prescan {
    totals: [u64; 3],
    faces: u64,
    colors: bool,
    comments: Vec<String>,
}

/// Chunked reader of a Wavefront OBJ body.
///
/// Every pass walks the body lines in order from where the previous pass
/// stopped. `v`, `vt` and `vn` lines are only counted and their offsets cached;
/// faces read the records they reference by seeking back to them.
pub(crate) struct ObjChunkReader {
    config: LoaderConfig,
    attributes: Attributes,
    library: MaterialLibrary,
    totals: [u64; 3],
    defined: [u64; 3],
    face_count: u64,
    faces_done: u64,
    vertices_done: u64,
    cursor: u64,
    material: Option<u32>,
    caches: [StreamPositionCache; 3],
    memo: HashMap<(Kind, u64), Record>,
    pending: VecDeque<[Vertex; 3]>,
    skipped: usize,
    line: String,
}

impl ObjChunkReader {
    /// Pre-scans the body and resolves `mtllib` references. Returns the reader
    /// and the comments of the file.
    pub(crate) fn open(
        source: &mut MeshSource,
        config: LoaderConfig,
        mut materials: Option<&mut Box<dyn MaterialListener>>,
        mut textures: Option<&mut Box<dyn TextureListener>>,
    ) -> Result<(Self, Vec<String>)> {
        source.seek_to(0)?;
        let mut library = MaterialLibrary::default();
        let mut scan = Prescan::default();
        let mut line = String::new();

        while source.read_content_line(&mut line)?.is_some() {
            match parse_line(&line)? {
                Statement::Vertex(_, color) => {
                    scan.totals[Kind::Position as usize] += 1;
                    scan.colors |= color.is_some();
                }
                Statement::TextureCoordinate(_) => scan.totals[Kind::TextureCoordinate as usize] += 1,
                Statement::Normal(_) => scan.totals[Kind::Normal as usize] += 1,
                Statement::Face(_) => scan.faces += 1,
                Statement::MaterialLibrary(paths) => {
                    for path in paths {
                        library.request(path, materials.as_deref_mut(), textures.as_deref_mut())?;
                    }
                }
                Statement::Comment(text) => scan.comments.push(text.to_owned()),
                Statement::UseMaterial(_) | Statement::Ignored => {}
            }
        }

        info!(
            "OBJ: {} vertices, {} texture coordinates, {} normals, {} faces, {} materials",
            scan.totals[0],
            scan.totals[1],
            scan.totals[2],
            scan.faces,
            library.materials().len()
        );

        let attributes = Attributes {
            normals: scan.totals[Kind::Normal as usize] > 0,
            uvs: scan.totals[Kind::TextureCoordinate as usize] > 0,
            color_components: if scan.colors { 3 } else { 0 },
        };

        let mut reader = ObjChunkReader {
            config,
            attributes,
            library,
            totals: scan.totals,
            defined: [0; 3],
            face_count: scan.faces,
            faces_done: 0,
            vertices_done: 0,
            cursor: 0,
            material: None,
            caches: Kind::ALL.map(|_| StreamPositionCache::new(config.max_stream_positions)),
            memo: HashMap::new(),
            pending: VecDeque::new(),
            skipped: 0,
            line,
        };
        reader.read_ahead(source)?;
        Ok((reader, scan.comments))
    }

    pub(crate) fn materials(&self) -> &[Material] {
        self.library.materials()
    }

    fn is_point_cloud(&self) -> bool {
        self.face_count == 0
    }

    fn vertex_count(&self) -> u64 {
        self.totals[Kind::Position as usize]
    }

    /// Positions `source` at the line of the `ordinal`-th record of `kind`.
    fn locate(&mut self, source: &mut MeshSource, kind: Kind, ordinal: u64) -> Result<()> {
        let cache = &mut self.caches[kind as usize];
        if let Some(offset) = cache.get(ordinal) {
            source.seek_to(offset)?;
            return Ok(());
        }

        let (mut next, offset) = cache.floor(ordinal).unwrap_or((0, 0));
        source.seek_to(offset)?;
        loop {
            let start = source
                .read_content_line(&mut self.line)?
                .ok_or_else(|| LoaderError::malformed(format!("missing {:?} {}", kind, ordinal)))?;
            let (token, _) = split_token(&self.line);
            if Kind::of(token) != Some(kind) {
                continue;
            }
            cache.insert(next, start);
            if next == ordinal {
                source.seek_to(start)?;
                return Ok(());
            }
            next += 1;
        }
    }

    fn parse_record(&self, kind: Kind) -> Result<Record> {
        Ok(match (kind, parse_line(&self.line)?) {
            (Kind::Position, Statement::Vertex(position, color)) => Record::Position(position, color),
            (Kind::TextureCoordinate, Statement::TextureCoordinate(uv)) => {
                Record::TextureCoordinate(uv)
            }
            (Kind::Normal, Statement::Normal(normal)) => Record::Normal(normal),
            _ => {
                return Err(LoaderError::malformed(format!(
                    "expected {:?} record, found {:?}",
                    kind, self.line
                )))
            }
        })
    }

    fn record(&mut self, source: &mut MeshSource, kind: Kind, index: i64) -> Result<Record> {
        let slot = kind as usize;
        let ordinal = resolve_index(index, self.defined[slot], self.totals[slot])?;
        if let Some(record) = self.memo.get(&(kind, ordinal)) {
            return Ok(*record);
        }

        self.locate(source, kind, ordinal)?;
        if source.read_content_line(&mut self.line)?.is_none() {
            return Err(LoaderError::malformed("unexpected end of file"));
        }
        let record = self.parse_record(kind)?;

        if self.memo.len() < self.config.max_vertices_in_chunk {
            self.memo.insert((kind, ordinal), record);
        }
        Ok(record)
    }

    fn face_vertices(&mut self, source: &mut MeshSource, indices: &[FaceIndex]) -> Result<Vec<Vertex>> {
        let mut face = Vec::with_capacity(indices.len());
        for index in indices {
            let mut vertex = Vertex::default();
            self.record(source, Kind::Position, index.vertex)?
                .apply(&mut vertex);
            if let Some(uv) = index.uv {
                self.record(source, Kind::TextureCoordinate, uv)?
                    .apply(&mut vertex);
            }
            if let Some(normal) = index.normal {
                self.record(source, Kind::Normal, normal)?
                    .apply(&mut vertex);
            }
            face.push(vertex);
        }
        Ok(face)
    }

    fn resolve_material(&self, name: &str) -> Option<u32> {
        let material = self.library.resolve(name);
        if material.is_none() {
            warn!("Unknown material {:?}, faces use none", name);
        }
        material
    }

    fn read_faces(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        let mut builder = ChunkBuilder::new(&self.config, self.attributes);
        builder.set_material_id(self.material);
        self.memo.clear();

        while drain_triangles(&mut builder, &mut self.pending) && self.faces_done < self.face_count {
            if self.advance(source)? {
                // a chunk carries a single material
                if !builder.is_empty() {
                    debug!("Material change closes chunk");
                    break;
                }
                builder.set_material_id(self.material);
            }
        }
        self.read_ahead(source)?;
        Ok(builder.build())
    }

    /// Handles the next body line of a face pass. Returns whether it switched
    /// the current material.
    fn advance(&mut self, source: &mut MeshSource) -> Result<bool> {
        source.seek_to(self.cursor)?;
        let start = source
            .read_content_line(&mut self.line)?
            .ok_or_else(|| LoaderError::malformed("fewer faces than counted"))?;
        self.cursor = source.position();

        let (token, value) = split_token(&self.line);
        if let Some(kind) = Kind::of(token) {
            let slot = kind as usize;
            self.caches[slot].insert(self.defined[slot], start);
            self.defined[slot] += 1;
            return Ok(false);
        }

        match token {
            "usemtl" => {
                let material = self.resolve_material(value);
                let changed = material != self.material;
                self.material = material;
                Ok(changed)
            }
            "f" => {
                let indices = parse_face(value)?;
                self.faces_done += 1;
                let face = self.face_vertices(source, &indices)?;
                let triangles = face_triangles(
                    &face,
                    self.config.continue_if_triangulation_error,
                    &mut self.skipped,
                )?;
                self.pending.extend(triangles);
                Ok(false)
            }
            _ => Ok(false),
        }
    }

    /// Reads on until a face yields a triangle. Material switches on the way
    /// apply to the next chunk.
    fn read_ahead(&mut self, source: &mut MeshSource) -> Result<()> {
        while self.pending.is_empty() && self.faces_done < self.face_count {
            self.advance(source)?;
        }
        Ok(())
    }

    fn read_points(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        let mut builder = ChunkBuilder::new(&self.config, self.attributes);
        source.seek_to(self.cursor)?;

        while !builder.is_full() && self.vertices_done < self.vertex_count() {
            if source.read_content_line(&mut self.line)?.is_none() {
                return Err(LoaderError::malformed("fewer vertices than counted"));
            }
            if split_token(&self.line).0 != "v" {
                continue;
            }
            let mut vertex = Vertex::default();
            self.parse_record(Kind::Position)?.apply(&mut vertex);
            builder.push_point(&vertex);
            self.vertices_done += 1;
        }
        self.cursor = source.position();
        Ok(builder.build())
    }
}

impl ChunkReader for ObjChunkReader {
    fn has_next(&self) -> bool {
        if self.is_point_cloud() {
            self.vertices_done < self.vertex_count()
        } else {
            self.faces_done < self.face_count || !self.pending.is_empty()
        }
    }

    fn progress(&self) -> f32 {
        if !self.has_next() {
            return 1.0;
        }
        if self.is_point_cloud() {
            return ratio(self.vertices_done, self.vertex_count());
        }
        let partial = !self.pending.is_empty() as u64;
        ratio(self.faces_done.saturating_sub(partial), self.face_count)
    }

    fn read_chunk(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        if self.is_point_cloud() {
            self.read_points(source)
        } else {
            self.read_faces(source)
        }
    }

    fn skipped_faces(&self) -> usize {
        self.skipped
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::listener::{MaterialError, MaterialLoader};
    use std::io::Cursor;

    fn source(data: &str) -> MeshSource {
        MeshSource::new(Box::new(Cursor::new(data.as_bytes().to_vec()))).unwrap()
    }

    fn config(capacity: usize) -> LoaderConfig {
        LoaderConfig {
            max_vertices_in_chunk: capacity,
            ..LoaderConfig::default()
        }
    }

    fn open(source: &mut MeshSource, config: LoaderConfig) -> Result<ObjChunkReader> {
        Ok(ObjChunkReader::open(source, config, None, None)?.0)
    }

    fn read_all(reader: &mut ObjChunkReader, source: &mut MeshSource) -> Result<Vec<DataChunk>> {
        let mut chunks = Vec::new();
        while reader.has_next() {
            chunks.push(reader.read_chunk(source)?);
        }
        Ok(chunks)
    }

    const CUBE_SIDE: &str = "# two quads\nv 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\n\
                             vt 0 0\nvt 1 1\nf 1/1/1 2/1/1 3/2/1 4/2/1\n\
                             v 2 0 0\nv 2 1 0\nf -5//1 -2//1 -1//1 -4//1\n";

    #[test]
    fn test_prescan() -> Result<()> {
        let mut source = source(CUBE_SIDE);
        let (reader, comments) = ObjChunkReader::open(&mut source, config(16), None, None)?;
        assert_eq!(comments, vec!["two quads"]);
        assert_eq!(reader.totals, [6, 2, 1]);
        assert_eq!(reader.face_count, 2);
        assert!(reader.attributes.normals);
        assert!(reader.attributes.uvs);
        assert_eq!(reader.attributes.color_components, 0);
        Ok(())
    }

    #[test]
    fn test_relative_indices() -> Result<()> {
        let mut source = source(CUBE_SIDE);
        let mut reader = open(&mut source, config(16))?;
        let chunks = read_all(&mut reader, &mut source)?;

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.face_count(), 4);
        // (1, 0, 0) is shared, (1, 1, 0) differs in its texture coordinate
        assert_eq!(chunk.vertex_count(), 7);
        assert_eq!(chunk.bounds(), Some(([0.0, 0.0, 0.0], [2.0, 1.0, 0.0])));
        assert_eq!(chunk.normal(6), Some([0.0, 0.0, 1.0]));
        Ok(())
    }

    #[test]
    fn test_small_chunks_and_cache() -> Result<()> {
        let mut source = source(CUBE_SIDE);
        let config = LoaderConfig {
            max_stream_positions: 1,
            allow_duplicate_vertices_in_chunk: true,
            ..config(3)
        };
        let mut reader = open(&mut source, config)?;

        let mut progress = Vec::new();
        let mut chunks = Vec::new();
        while reader.has_next() {
            chunks.push(reader.read_chunk(&mut source)?);
            progress.push(reader.progress());
        }
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.vertex_count() == 3));
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&1.0));
        Ok(())
    }

    #[test]
    fn test_material_change_closes_chunk() -> Result<()> {
        struct Library;
        impl MaterialListener for Library {
            fn on_material_loader_requested(&mut self, _path: &str) -> Option<Box<dyn MaterialLoader>> {
                Some(Box::new(|| -> std::result::Result<Vec<Material>, MaterialError> {
                    Ok(vec![Material::named("red"), Material::named("blue")])
                }))
            }
        }

        let data = "mtllib colors.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\n\
                    usemtl blue\nf 1 2 3\nusemtl red\nf 2 4 3\nusemtl red\nusemtl gold\nf 3 2 1\n";
        let mut source = source(data);
        let mut listener: Box<dyn MaterialListener> = Box::new(Library);
        let (mut reader, _) = ObjChunkReader::open(&mut source, config(100), Some(&mut listener), None)?;
        assert_eq!(reader.materials().len(), 2);

        let chunks = read_all(&mut reader, &mut source)?;
        let materials: Vec<Option<u32>> = chunks.iter().map(|c| c.material_id).collect();
        assert_eq!(materials, vec![Some(1), Some(0), None]);
        assert!(chunks.iter().all(|c| c.face_count() == 1));
        Ok(())
    }

    #[test]
    fn test_point_cloud_with_colors() -> Result<()> {
        let data = "v 0 0 0 1 0 0\nv 1 0 0\n# gap\nv 2 0 0 0 0 1\nv 3 0 0\nv 4 0 0\n";
        let mut source = source(data);
        let mut reader = open(&mut source, config(3))?;
        let chunks = read_all(&mut reader, &mut source)?;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].vertex_count(), 3);
        assert_eq!(chunks[1].vertex_count(), 2);
        assert_eq!(
            chunks[0].colors,
            Some(vec![255, 0, 0, 0, 0, 0, 0, 0, 255])
        );
        assert!(chunks[0].indices.is_empty());
        Ok(())
    }

    #[test]
    fn test_skip_degenerate_face() -> Result<()> {
        let data = "v 0 0 0\nv 1 0 0\nv 2 0 0\nv 0 1 0\nf 1 2\nf 1 2 4\n";

        let mut source = source(data);
        // the first face is read ahead when opening
        assert!(matches!(
            open(&mut source, config(16)),
            Err(LoaderError::Triangulation(_))
        ));

        let config = LoaderConfig {
            continue_if_triangulation_error: true,
            ..config(16)
        };
        let mut reader = open(&mut source, config)?;
        let chunks = read_all(&mut reader, &mut source)?;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].face_count(), 1);
        assert_eq!(reader.skipped_faces(), 1);
        Ok(())
    }

    #[test]
    fn test_skipped_faces_after_full_chunk() -> Result<()> {
        let data = "v 0 0 0\nv 1 0 0\nv 2 0 0\nv 0 1 0\nf 1 2 4\nf 2 3 4\nf 1 2\nf 1 2 3 2\n";
        let config = LoaderConfig {
            continue_if_triangulation_error: true,
            ..config(3)
        };
        let mut source = source(data);
        let mut reader = open(&mut source, config)?;

        let chunks = read_all(&mut reader, &mut source)?;
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.face_count() == 1));
        assert_eq!(reader.skipped_faces(), 2);
        assert_eq!(reader.progress(), 1.0);

        let mut source = self::source("v 0 0 0\nv 1 0 0\nf 1 2\nf 2 1\n");
        let reader = open(&mut source, config)?;
        assert!(!reader.has_next());
        assert_eq!(reader.skipped_faces(), 2);
        Ok(())
    }

    #[test]
    fn test_index_out_of_range() -> Result<()> {
        let mut source = source("v 0 0 0\nv 1 0 0\nf 1 2 3\n");
        assert!(matches!(
            open(&mut source, config(16)),
            Err(LoaderError::Malformed(_))
        ));
        Ok(())
    }
}
