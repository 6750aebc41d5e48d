use crate::normalize::Coordinate;

/// Delimiter between canonical coordinates, both in chunk keys and in the
/// upstream `locations` query parameter.
pub const CHUNK_DELIMITER: &str = "|";

/// An ordered, non-empty group of coordinates sent upstream in one call.
/// Owned transiently by a single orchestration pass, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    coords: Vec<Coordinate>,
}

impl Chunk {
    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coords
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Deterministic identity of this chunk's exact ordered content. Chunks
    /// with identical content share a cache entry regardless of which
    /// request produced them.
    pub fn key(&self) -> String {
        self.coords
            .iter()
            .map(Coordinate::canonical)
            .collect::<Vec<_>>()
            .join(CHUNK_DELIMITER)
    }
}

/// Partition coordinates into contiguous chunks of at most `batch_size`,
/// preserving the original order. The last chunk may be shorter. Pure and
/// deterministic; `batch_size` must be positive (enforced by config
/// validation).
pub fn chunk_coordinates(coords: &[Coordinate], batch_size: usize) -> Vec<Chunk> {
    coords
        .chunks(batch_size)
        .map(|c| Chunk { coords: c.to_vec() })
        .collect()
}
