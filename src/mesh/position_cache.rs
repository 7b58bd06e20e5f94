use std::collections::{BTreeMap, VecDeque};

/// Bounded map from a record ordinal to the byte offset where the record
/// starts. The oldest inserted entry is evicted first.
#[derive(Debug, Default)]
pub(crate) struct StreamPositionCache {
    positions: BTreeMap<u64, u64>,
    order: VecDeque<u64>,
    capacity: usize,
}

impl StreamPositionCache {
    pub(crate) fn new(capacity: usize) -> Self {
        StreamPositionCache {
            positions: BTreeMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn insert(&mut self, ordinal: u64, offset: u64) {
        if self.positions.insert(ordinal, offset).is_some() {
            return;
        }
        self.order.push_back(ordinal);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.positions.remove(&oldest);
            }
        }
    }

    pub(crate) fn get(&self, ordinal: u64) -> Option<u64> {
        self.positions.get(&ordinal).copied()
    }

    /// The cached entry with the largest ordinal not above `ordinal`.
    pub(crate) fn floor(&self, ordinal: u64) -> Option<(u64, u64)> {
        self.positions
            .range(..=ordinal)
            .next_back()
            .map(|(k, v)| (*k, *v))
    }

    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }
}
