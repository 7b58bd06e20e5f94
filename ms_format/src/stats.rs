use serde::{Deserialize, Serialize};

use crate::chunk::DataChunk;

/// Totals accumulated over a sequence of chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshStats {
    pub chunk_count: usize,
    pub vertex_count: usize,
    pub face_count: usize,
    pub min: Option<[f32; 3]>,
    pub max: Option<[f32; 3]>,
}

impl MeshStats {
    pub fn add(&mut self, chunk: &DataChunk) {
        self.chunk_count += 1;
        self.vertex_count += chunk.vertex_count();
        self.face_count += chunk.face_count();

        if let Some((min, max)) = chunk.bounds() {
            let (curr_min, curr_max) = match (self.min, self.max) {
                (Some(a), Some(b)) => (a, b),
                _ => (min, max),
            };
            let mut new_min = curr_min;
            let mut new_max = curr_max;
            for n in 0..3 {
                new_min[n] = new_min[n].min(min[n]);
                new_max[n] = new_max[n].max(max[n]);
            }
            self.min = Some(new_min);
            self.max = Some(new_max);
        }
    }

    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a DataChunk>) -> Self {
        let mut stats = MeshStats::default();
        for chunk in chunks {
            stats.add(chunk);
        }
        stats
    }
}
