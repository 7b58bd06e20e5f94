use std::collections::HashMap;

use crate::config::VertexKey;

use super::builder::Vertex;

type KeyBits = [u32; 9];

/// Chunk-local index of every vertex already emitted into the current chunk,
/// keyed by the vertex attributes selected through [`VertexKey`].
#[derive(Debug)]
pub(crate) struct DuplicateVertexIndex {
    key: VertexKey,
    indices: HashMap<KeyBits, u32>,
}

impl DuplicateVertexIndex {
    pub(crate) fn new(key: VertexKey) -> Self {
        DuplicateVertexIndex {
            key,
            indices: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, vertex: &Vertex) -> Option<u32> {
        self.indices.get(&self.key_bits(vertex)).copied()
    }

    pub(crate) fn insert(&mut self, vertex: &Vertex, index: u32) {
        let bits = self.key_bits(vertex);
        self.indices.insert(bits, index);
    }

    /// Whether `a` and `b` would be merged.
    pub(crate) fn same(&self, a: &Vertex, b: &Vertex) -> bool {
        self.key_bits(a) == self.key_bits(b)
    }

    fn key_bits(&self, vertex: &Vertex) -> KeyBits {
        let mut bits = [0u32; 9];
        for n in 0..3 {
            bits[n] = float_bits(vertex.position[n]);
        }
        if self.key == VertexKey::Full {
            if let Some(normal) = vertex.normal {
                for n in 0..3 {
                    bits[3 + n] = float_bits(normal[n]);
                }
            }
            if let Some(uv) = vertex.uv {
                bits[6] = float_bits(uv[0]);
                bits[7] = float_bits(uv[1]);
            }
            // missing attributes compare like the values a chunk stores for them
            bits[8] = u32::from_le_bytes(vertex.color.unwrap_or([0, 0, 0, 255]));
        }
        bits
    }
}

// -0.0 and 0.0 hash alike
fn float_bits(value: f32) -> u32 {
    (value + 0.0).to_bits()
}
