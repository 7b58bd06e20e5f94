use std::collections::{HashMap, VecDeque};

use log::{debug, info};
use ms_format::DataChunk;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::mesh::builder::{Attributes, ChunkBuilder, Vertex};
use crate::mesh::position_cache::StreamPositionCache;
use crate::mesh::{color_channel, drain_triangles, face_triangles, ratio, ChunkReader};
use crate::source::MeshSource;

use super::header::{parse_header, Element, PlyFormat, PlyHeader, Property};
use super::value::{read_record, AsciiValues, BinaryValues, ValueReaders, ValueSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Position(usize),
    Normal(usize),
    Uv(usize),
    Color(usize, bool),
}

fn role(name: &str, is_float: bool) -> Option<Role> {
    Some(match name {
        "x" => Role::Position(0),
        "y" => Role::Position(1),
        "z" => Role::Position(2),
        "nx" => Role::Normal(0),
        "ny" => Role::Normal(1),
        "nz" => Role::Normal(2),
        "u" | "s" | "texture_u" => Role::Uv(0),
        "v" | "t" | "texture_v" => Role::Uv(1),
        "red" | "diffuse_red" => Role::Color(0, is_float),
        "green" | "diffuse_green" => Role::Color(1, is_float),
        "blue" | "diffuse_blue" => Role::Color(2, is_float),
        "alpha" | "diffuse_alpha" => Role::Color(3, is_float),
        _ => return None,
    })
}

fn has_roles(roles: &[Option<Role>], wanted: &[Role]) -> bool {
    wanted.iter().all(|r| roles.contains(&Some(*r)))
}

/// Role of every vertex property and the attributes they add up to.
struct VertexLayout {
    roles: Vec<Option<Role>>,
    attributes: Attributes,
}

impl VertexLayout {
    fn new(element: &Element) -> Result<Self> {
        let roles: Vec<Option<Role>> = element
            .properties
            .iter()
            .map(|p| match p {
                Property::Scalar { name, data_type } => role(name, data_type.is_float()),
                Property::List { .. } => None,
            })
            .collect();

        let has_color = |channel: usize| {
            roles
                .iter()
                .any(|r| matches!(r, Some(Role::Color(c, _)) if *c == channel))
        };

        if !has_roles(&roles, &[Role::Position(0), Role::Position(1), Role::Position(2)]) {
            return Err(LoaderError::malformed("vertex element lacks x, y or z"));
        }

        let color_components = if (0..3).all(has_color) {
            if has_color(3) {
                4
            } else {
                3
            }
        } else {
            0
        };

        let attributes = Attributes {
            normals: has_roles(&roles, &[Role::Normal(0), Role::Normal(1), Role::Normal(2)]),
            uvs: has_roles(&roles, &[Role::Uv(0), Role::Uv(1)]),
            color_components,
        };
        Ok(VertexLayout { roles, attributes })
    }

    fn decode<S: ValueSource + ?Sized>(&self, element: &Element, values: &mut S) -> Result<Vertex> {
        let mut position = [0.0f32; 3];
        let mut normal = [0.0f32; 3];
        let mut uv = [0.0f32; 2];
        let mut color = [0u8, 0, 0, 255];

        read_record(element, values, |index, value| match self.roles[index] {
            Some(Role::Position(axis)) => position[axis] = value as f32,
            Some(Role::Normal(axis)) => normal[axis] = value as f32,
            Some(Role::Uv(axis)) => uv[axis] = value as f32,
            Some(Role::Color(channel, is_float)) => color[channel] = color_channel(value, is_float),
            None => {}
        })?;

        let attributes = &self.attributes;
        Ok(Vertex {
            position,
            normal: if attributes.normals { Some(normal) } else { None },
            uv: if attributes.uvs { Some(uv) } else { None },
            color: if attributes.color_components > 0 {
                Some(color)
            } else {
                None
            },
        })
    }
}

/// Chunked reader of a PLY body in any of the three encodings.
pub(crate) struct PlyChunkReader {
    config: LoaderConfig,
    header: PlyHeader,
    readers: Option<ValueReaders>,
    layout: VertexLayout,
    vertex_element: usize,
    vertex_offset: u64,
    vertex_record_size: Option<u64>,
    face_element: Option<usize>,
    index_property: usize,
    face_count: u64,
    faces_done: u64,
    face_cursor: u64,
    vertices_done: u64,
    vertex_cursor: u64,
    pending: VecDeque<[Vertex; 3]>,
    cache: StreamPositionCache,
    memo: HashMap<u64, Vertex>,
    skipped: usize,
    line: String,
}

impl PlyChunkReader {
    /// Parses the header and pre-scans the body. Returns the reader and the
    /// header comments.
    pub(crate) fn open(source: &mut MeshSource, config: LoaderConfig) -> Result<(Self, Vec<String>)> {
        source.seek_to(0)?;
        let header = parse_header(source)?;
        let readers = ValueReaders::for_format(header.format);

        let vertex_element = header
            .element_index("vertex")
            .ok_or_else(|| LoaderError::malformed("missing vertex element"))?;
        let layout = VertexLayout::new(&header.elements[vertex_element])?;
        let vertex_record_size = match header.format {
            PlyFormat::Ascii => None,
            _ => header.elements[vertex_element].record_size(),
        };

        let face_element = header.element_index("face");
        let index_property = match face_element {
            Some(face) => face_index_property(&header.elements[face])?,
            None => 0,
        };
        let face_count = face_element.map_or(0, |face| header.elements[face].count);

        let comments = header.comments.clone();
        let mut reader = PlyChunkReader {
            config,
            readers,
            layout,
            vertex_element,
            vertex_offset: header.body_offset,
            vertex_record_size,
            face_element,
            index_property,
            face_count,
            faces_done: 0,
            face_cursor: header.body_offset,
            vertices_done: 0,
            vertex_cursor: header.body_offset,
            pending: VecDeque::new(),
            cache: StreamPositionCache::new(config.max_stream_positions),
            memo: HashMap::new(),
            skipped: 0,
            line: String::new(),
            header,
        };
        reader.prescan(source)?;
        reader.read_ahead(source)?;

        info!(
            "PLY {:?}: {} vertices, {} faces",
            reader.header.format,
            reader.vertex_count(),
            reader.face_count
        );
        Ok((reader, comments))
    }

    fn vertex_count(&self) -> u64 {
        self.header.elements[self.vertex_element].count
    }

    fn is_point_cloud(&self) -> bool {
        self.face_count == 0
    }

    /// Walks all elements once to find where each starts. Vertex records
    /// leave evenly spaced anchors in the position cache.
    fn prescan(&mut self, source: &mut MeshSource) -> Result<()> {
        let stride = {
            let count = self.vertex_count();
            let capacity = self.config.max_stream_positions as u64;
            (count / capacity + u64::from(count % capacity != 0)).max(1)
        };

        for index in 0..self.header.elements.len() {
            let start = source.position();
            let count = self.header.elements[index].count;

            if index == self.vertex_element {
                self.vertex_offset = start;
                self.vertex_cursor = start;
            } else if Some(index) == self.face_element {
                self.face_cursor = start;
            }

            let record_size = match self.header.format {
                PlyFormat::Ascii => None,
                _ => self.header.elements[index].record_size(),
            };
            if let Some(size) = record_size {
                let end = size
                    .checked_mul(count)
                    .and_then(|length| start.checked_add(length))
                    .filter(|end| *end <= source.len())
                    .ok_or_else(|| LoaderError::malformed("body is shorter than declared"))?;
                source.seek_to(end)?;
                continue;
            }

            for ordinal in 0..count {
                let offset = source.position();
                if index == self.vertex_element && ordinal % stride == 0 {
                    self.cache.insert(ordinal, offset);
                }
                self.skip_record(source, index)?;
            }
        }

        if source.position() > source.len() {
            return Err(LoaderError::malformed("body is shorter than declared"));
        }
        debug!("Pre-scan cached {} vertex positions", self.cache.len());
        Ok(())
    }

    fn skip_record(&mut self, source: &mut MeshSource, element: usize) -> Result<()> {
        let element = &self.header.elements[element];
        match &self.readers {
            None => {
                if source.read_content_line(&mut self.line)?.is_none() {
                    return Err(LoaderError::malformed(format!(
                        "missing {} records",
                        element.name
                    )));
                }
                Ok(())
            }
            Some(readers) => {
                let mut values = BinaryValues::new(source, readers);
                read_record(element, &mut values, |_, _| {})
            }
        }
    }

    /// Decodes the vertex record at the current position.
    fn decode_vertex(&mut self, source: &mut MeshSource) -> Result<Vertex> {
        let element = &self.header.elements[self.vertex_element];
        match &self.readers {
            None => {
                if source.read_content_line(&mut self.line)?.is_none() {
                    return Err(LoaderError::malformed("missing vertex records"));
                }
                self.layout.decode(element, &mut AsciiValues::new(&self.line))
            }
            Some(readers) => self
                .layout
                .decode(element, &mut BinaryValues::new(source, readers)),
        }
    }

    /// Reads the vertex with the given ordinal, seeking back when its record
    /// was already passed.
    fn read_vertex(&mut self, source: &mut MeshSource, ordinal: u64) -> Result<Vertex> {
        if ordinal >= self.vertex_count() {
            return Err(LoaderError::malformed(format!(
                "vertex index {} out of range",
                ordinal
            )));
        }
        if let Some(vertex) = self.memo.get(&ordinal) {
            return Ok(*vertex);
        }

        if let Some(size) = self.vertex_record_size {
            source.seek_to(self.vertex_offset + ordinal * size)?;
        } else {
            let (mut current, offset) = self
                .cache
                .floor(ordinal)
                .unwrap_or((0, self.vertex_offset));
            source.seek_to(offset)?;
            while current < ordinal {
                self.skip_record(source, self.vertex_element)?;
                current += 1;
                self.cache.insert(current, source.position());
            }
        }

        let vertex = self.decode_vertex(source)?;
        if self.memo.len() < self.config.max_vertices_in_chunk {
            self.memo.insert(ordinal, vertex);
        }
        Ok(vertex)
    }

    fn read_face(&mut self, source: &mut MeshSource) -> Result<Vec<u64>> {
        let element = match self.face_element {
            Some(face) => &self.header.elements[face],
            None => return Ok(Vec::new()),
        };

        let index_property = self.index_property;
        let mut indices = Vec::new();
        let mut invalid = None;
        let mut collect = |property: usize, value: f64| {
            if property != index_property {
                return;
            }
            if value < 0.0 || value.fract() != 0.0 {
                if invalid.is_none() {
                    invalid = Some(value);
                }
            } else {
                indices.push(value as u64);
            }
        };

        match &self.readers {
            None => {
                if source.read_content_line(&mut self.line)?.is_none() {
                    return Err(LoaderError::malformed("missing face records"));
                }
                read_record(element, &mut AsciiValues::new(&self.line), &mut collect)?;
            }
            Some(readers) => {
                read_record(element, &mut BinaryValues::new(source, readers), &mut collect)?;
            }
        }

        if let Some(value) = invalid {
            return Err(LoaderError::malformed(format!(
                "invalid vertex index {}",
                value
            )));
        }
        Ok(indices)
    }

    fn read_faces(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        let mut builder = ChunkBuilder::new(&self.config, self.layout.attributes);
        self.memo.clear();

        while drain_triangles(&mut builder, &mut self.pending) && self.faces_done < self.face_count {
            self.triangulate_next_face(source)?;
        }
        self.read_ahead(source)?;
        Ok(builder.build())
    }

    fn triangulate_next_face(&mut self, source: &mut MeshSource) -> Result<()> {
        source.seek_to(self.face_cursor)?;
        let indices = self.read_face(source)?;
        self.face_cursor = source.position();
        self.faces_done += 1;

        let mut face = Vec::with_capacity(indices.len());
        for ordinal in indices {
            face.push(self.read_vertex(source, ordinal)?);
        }
        let triangles = face_triangles(
            &face,
            self.config.continue_if_triangulation_error,
            &mut self.skipped,
        )?;
        self.pending.extend(triangles);
        Ok(())
    }

    /// Reads on until a face yields a triangle, so a skipped tail never
    /// shows up as an empty chunk.
    fn read_ahead(&mut self, source: &mut MeshSource) -> Result<()> {
        while self.pending.is_empty() && self.faces_done < self.face_count {
            self.triangulate_next_face(source)?;
        }
        Ok(())
    }

    fn read_points(&mut self, source: &mut MeshSource) -> Result<DataChunk> {
        let mut builder = ChunkBuilder::new(&self.config, self.layout.attributes);
        source.seek_to(self.vertex_cursor)?;

        while !builder.is_full() && self.vertices_done < self.vertex_count() {
            let vertex = self.decode_vertex(source)?;
            builder.push_point(&vertex);
            self.vertices_done += 1;
        }
        self.vertex_cursor = source.position();
        Ok(builder.build())
    }
}

/// Index list of a face element: `vertex_indices`, `vertex_index` or the first
/// list property.
fn face_index_property(element: &Element) -> Result<usize> {
    element
        .property_index("vertex_indices")
        .or_else(|| element.property_index("vertex_index"))
        .filter(|&i| matches!(element.properties[i], Property::List { .. }))
        .or_else(|| {
            element
                .properties
                .iter()
                .position(|p| matches!(p, Property::List { .. }))
        })
        .ok_or_else(|| LoaderError::malformed("face element has no index list"))
}

impl ChunkReader for PlyChunkReader {
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
        // a face with triangles left over is not consumed yet
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
