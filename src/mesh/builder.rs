use ms_format::DataChunk;

use crate::config::LoaderConfig;

use super::dedup::DuplicateVertexIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Vertex {
    pub(crate) position: [f32; 3],
    pub(crate) normal: Option<[f32; 3]>,
    pub(crate) uv: Option<[f32; 2]>,
    pub(crate) color: Option<[u8; 4]>,
}

/// Optional attribute arrays carried by every vertex of a chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Attributes {
    pub(crate) normals: bool,
    pub(crate) uvs: bool,
    /// 0 when the source has no colors, else 3 or 4.
    pub(crate) color_components: u8,
}

/// Collects vertices and triangles of one chunk up to a fixed vertex capacity.
#[derive(Debug)]
pub(crate) struct ChunkBuilder {
    capacity: usize,
    attributes: Attributes,
    dedup: Option<DuplicateVertexIndex>,
    chunk: DataChunk,
    vertex_count: usize,
}

impl ChunkBuilder {
    pub(crate) fn new(config: &LoaderConfig, attributes: Attributes) -> Self {
        let dedup = if config.allow_duplicate_vertices_in_chunk {
            None
        } else {
            Some(DuplicateVertexIndex::new(config.vertex_key))
        };

        let mut chunk = DataChunk::default();
        if attributes.normals {
            chunk.normals = Some(Vec::new());
        }
        if attributes.uvs {
            chunk.texture_coordinates = Some(Vec::new());
        }
        if attributes.color_components > 0 {
            chunk.colors = Some(Vec::new());
            chunk.color_components = attributes.color_components;
        }

        ChunkBuilder {
            capacity: config.max_vertices_in_chunk,
            attributes,
            dedup,
            chunk,
            vertex_count: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }

    pub(crate) fn is_full(&self) -> bool {
        self.vertex_count >= self.capacity
    }

    pub(crate) fn set_material_id(&mut self, material_id: Option<u32>) {
        self.chunk.material_id = material_id;
    }

    /// Number of vertices appending `triangle` would add.
    pub(crate) fn new_vertices_needed(&self, triangle: &[Vertex; 3]) -> usize {
        let dedup = match &self.dedup {
            Some(dedup) => dedup,
            None => return 3,
        };

        let mut needed = 0;
        for i in 0..3 {
            if dedup.get(&triangle[i]).is_some() {
                continue;
            }
            if (0..i).any(|j| dedup.same(&triangle[i], &triangle[j])) {
                continue;
            }
            needed += 1;
        }
        needed
    }

    pub(crate) fn fits(&self, triangle: &[Vertex; 3]) -> bool {
        self.vertex_count + self.new_vertices_needed(triangle) <= self.capacity
    }

    /// Appends a triangle, reusing vertices already in the chunk when
    /// duplicates are disallowed. Callers check [`ChunkBuilder::fits`] first.
    pub(crate) fn push_triangle(&mut self, triangle: &[Vertex; 3]) {
        for vertex in triangle {
            let index = self.push_vertex(vertex);
            self.chunk.indices.push(index);
        }
    }

    /// Appends a vertex or returns the index of its duplicate.
    pub(crate) fn push_vertex(&mut self, vertex: &Vertex) -> u32 {
        if let Some(index) = self.dedup.as_ref().and_then(|d| d.get(vertex)) {
            return index;
        }

        let index = self.vertex_count as u32;
        self.append(vertex);
        if let Some(dedup) = &mut self.dedup {
            dedup.insert(vertex, index);
        }
        index
    }

    /// Appends a point cloud vertex, duplicates included.
    pub(crate) fn push_point(&mut self, vertex: &Vertex) {
        self.append(vertex);
    }

    fn append(&mut self, vertex: &Vertex) {
        let [x, y, z] = vertex.position;
        if self.vertex_count == 0 {
            self.chunk.min_x = x;
            self.chunk.min_y = y;
            self.chunk.min_z = z;
            self.chunk.max_x = x;
            self.chunk.max_y = y;
            self.chunk.max_z = z;
        } else {
            self.chunk.min_x = self.chunk.min_x.min(x);
            self.chunk.min_y = self.chunk.min_y.min(y);
            self.chunk.min_z = self.chunk.min_z.min(z);
            self.chunk.max_x = self.chunk.max_x.max(x);
            self.chunk.max_y = self.chunk.max_y.max(y);
            self.chunk.max_z = self.chunk.max_z.max(z);
        }
        self.chunk.vertices_coordinates.extend_from_slice(&vertex.position);

        if let Some(normals) = &mut self.chunk.normals {
            normals.extend_from_slice(&vertex.normal.unwrap_or_default());
        }
        if let Some(uvs) = &mut self.chunk.texture_coordinates {
            uvs.extend_from_slice(&vertex.uv.unwrap_or_default());
        }
        if let Some(colors) = &mut self.chunk.colors {
            let color = vertex.color.unwrap_or([0, 0, 0, 255]);
            let components = self.attributes.color_components as usize;
            colors.extend_from_slice(&color[..components]);
        }

        self.vertex_count += 1;
    }

    pub(crate) fn build(self) -> DataChunk {
        self.chunk
    }
}
