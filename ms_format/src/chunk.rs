use serde::{Deserialize, Serialize};

/// One bounded slab of mesh data as produced by a loader pass.
///
/// Every entry of `indices` is local to this chunk and always smaller than
/// [`DataChunk::vertex_count`]. Optional attribute arrays hold one record per
/// vertex when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataChunk {
    /// `x, y, z` per vertex.
    pub vertices_coordinates: Vec<f32>,
    /// `nx, ny, nz` per vertex.
    pub normals: Option<Vec<f32>>,
    /// `u, v` per vertex.
    pub texture_coordinates: Option<Vec<f32>>,
    /// `color_components` channel values per vertex.
    pub colors: Option<Vec<u8>>,
    pub color_components: u8,
    /// Triangle list.
    pub indices: Vec<u32>,
    pub material_id: Option<u32>,
    pub min_x: f32,
    pub min_y: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_y: f32,
    pub max_z: f32,
}

impl DataChunk {
    pub fn vertex_count(&self) -> usize {
        self.vertices_coordinates.len() / 3
    }

    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices_coordinates.is_empty()
    }

    /// Position of the vertex at the chunk-local `index`.
    pub fn vertex(&self, index: usize) -> Option<[f32; 3]> {
        let v = self.vertices_coordinates.get(index * 3..index * 3 + 3)?;
        Some([v[0], v[1], v[2]])
    }

    pub fn normal(&self, index: usize) -> Option<[f32; 3]> {
        let n = self.normals.as_ref()?.get(index * 3..index * 3 + 3)?;
        Some([n[0], n[1], n[2]])
    }

    /// The bounding box as `(min, max)`, `None` for an empty chunk.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        if self.is_empty() {
            None
        } else {
            Some((
                [self.min_x, self.min_y, self.min_z],
                [self.max_x, self.max_y, self.max_z],
            ))
        }
    }

    /// Triangles as chunk-local index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn triangle() -> DataChunk {
        DataChunk {
            vertices_coordinates: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, -1.0],
            normals: Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
            indices: vec![0, 1, 2],
            min_x: 0.0,
            min_y: 0.0,
            min_z: -1.0,
            max_x: 1.0,
            max_y: 2.0,
            max_z: 0.0,
            ..DataChunk::default()
        }
    }

    #[test]
    fn test_counts() {
        let chunk = triangle();
        assert_eq!(chunk.vertex_count(), 3);
        assert_eq!(chunk.face_count(), 1);
        assert_eq!(chunk.triangles().collect::<Vec<_>>(), vec![[0, 1, 2]]);
        assert_eq!(chunk.vertex(2), Some([0.0, 2.0, -1.0]));
        assert_eq!(chunk.vertex(3), None);
        assert_eq!(chunk.normal(1), Some([0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_bounds() {
        assert_eq!(DataChunk::default().bounds(), None);
        assert_eq!(
            triangle().bounds(),
            Some(([0.0, 0.0, -1.0], [1.0, 2.0, 0.0]))
        );
    }
}
