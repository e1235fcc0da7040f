//! Nearest-first ordering for chunk builds

use crate::core::types::Vec3;
use crate::streaming::coord::ChunkCoord;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Priority information for a chunk
#[derive(Clone, Copy, Debug)]
pub struct ChunkPriority {
    pub coord: ChunkCoord,
    pub priority: f32, // Higher = more important
    pub distance: f32, // Horizontal distance from camera to chunk center
}

impl ChunkPriority {
    /// Priority of `coord` for a camera at `camera_pos`; closer chunks win
    pub fn calculate(coord: ChunkCoord, camera_pos: Vec3, chunk_size: u32) -> Self {
        let center = coord.world_center(chunk_size);
        let distance = Vec3::new(camera_pos.x, 0.0, camera_pos.z).distance(center);
        let priority = 1.0 / (distance + 1.0);

        Self {
            coord,
            priority,
            distance,
        }
    }
}

// Implement Ord/PartialOrd for BinaryHeap (max-heap by default)
impl Eq for ChunkPriority {}

impl PartialEq for ChunkPriority {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
    }
}

impl Ord for ChunkPriority {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken on the coordinate so the order is reproducible
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for ChunkPriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of chunks waiting to be built
#[derive(Default)]
pub struct ChunkPriorityQueue {
    heap: BinaryHeap<ChunkPriority>,
}

impl ChunkPriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all queued chunks
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Add a chunk to the queue
    pub fn push(&mut self, priority: ChunkPriority) {
        self.heap.push(priority);
    }

    /// Get the highest priority chunk
    pub fn pop(&mut self) -> Option<ChunkPriority> {
        self.heap.pop()
    }

    /// Get the number of queued chunks
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Refill with every chunk within Chebyshev `radius` of the camera chunk
    /// for which `skip` returns false.
    pub fn update(
        &mut self,
        camera_pos: Vec3,
        chunk_size: u32,
        radius: i32,
        skip: impl Fn(ChunkCoord) -> bool,
    ) {
        self.clear();

        let camera_chunk = ChunkCoord::from_world_pos(camera_pos, chunk_size);
        for coord in camera_chunk.square(radius) {
            if skip(coord) {
                continue;
            }
            self.push(ChunkPriority::calculate(coord, camera_pos, chunk_size));
        }
    }

    /// Pop everything, highest priority first
    pub fn drain_ordered(&mut self) -> Vec<ChunkPriority> {
        let mut out = Vec::with_capacity(self.heap.len());
        while let Some(p) = self.heap.pop() {
            out.push(p);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_priority_ordering() {
        let camera_pos = Vec3::new(16.0, 100.0, 16.0);
        let p1 = ChunkPriority::calculate(ChunkCoord::new(0, 0), camera_pos, 32);
        let p2 = ChunkPriority::calculate(ChunkCoord::new(3, 3), camera_pos, 32);

        assert!(p1.distance < 1e-5, "height must not count");
        assert!(p1.priority > p2.priority);
        assert!(p1 > p2);
    }

    #[test]
    fn test_update_pops_nearest_first() {
        let mut queue = ChunkPriorityQueue::new();
        let camera_pos = Vec3::new(10.0, 0.0, 10.0);
        queue.update(camera_pos, 32, 2, |_| false);
        assert_eq!(queue.len(), 25);

        let ordered = queue.drain_ordered();
        assert_eq!(ordered[0].coord, ChunkCoord::new(0, 0));
        for pair in ordered.windows(2) {
            assert!(pair[0].distance <= pair[1].distance + 1e-4);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_update_skips_loaded() {
        let mut queue = ChunkPriorityQueue::new();
        queue.update(Vec3::ZERO, 32, 1, |c| c.x == 0);
        assert_eq!(queue.len(), 6);
        while let Some(p) = queue.pop() {
            assert_ne!(p.coord.x, 0);
        }
    }
}
