//! Chunk grid coordinates

use std::fmt;

use glam::Vec3;

/// Integer coordinate of a chunk on the XZ grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk containing the world position `(x, z)`
    pub fn from_world(x: f32, z: f32, chunk_size: u32) -> Self {
        let size = chunk_size.max(1) as f32;
        Self {
            x: (x / size).floor() as i32,
            z: (z / size).floor() as i32,
        }
    }

    /// Chunk containing a world-space point
    pub fn from_world_pos(pos: Vec3, chunk_size: u32) -> Self {
        Self::from_world(pos.x, pos.z, chunk_size)
    }

    /// max(|dx|, |dz|)
    pub fn chebyshev_distance(&self, other: ChunkCoord) -> i32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx.max(dz).min(i32::MAX as u64) as i32
    }

    /// World-space corner of this chunk at y = 0
    pub fn world_origin(&self, chunk_size: u32) -> Vec3 {
        Vec3::new(
            (self.x as i64 * chunk_size as i64) as f32,
            0.0,
            (self.z as i64 * chunk_size as i64) as f32,
        )
    }

    /// World-space center of this chunk at y = 0
    pub fn world_center(&self, chunk_size: u32) -> Vec3 {
        let half = chunk_size as f32 * 0.5;
        self.world_origin(chunk_size) + Vec3::new(half, 0.0, half)
    }

    /// Every coordinate within Chebyshev distance `radius`, row by row
    pub fn square(self, radius: i32) -> impl Iterator<Item = ChunkCoord> {
        let r = radius.max(0);
        (-r..=r).flat_map(move |dz| (-r..=r).map(move |dx| ChunkCoord::new(self.x + dx, self.z + dz)))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world_floors_negative() {
        assert_eq!(ChunkCoord::from_world(0.0, 0.0, 32), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world(31.9, 0.0, 32), ChunkCoord::new(0, 0));
        assert_eq!(ChunkCoord::from_world(32.0, -0.1, 32), ChunkCoord::new(1, -1));
        assert_eq!(ChunkCoord::from_world(-64.0, -65.0, 32), ChunkCoord::new(-2, -3));
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = ChunkCoord::new(0, 0);
        assert_eq!(a.chebyshev_distance(ChunkCoord::new(3, -1)), 3);
        assert_eq!(a.chebyshev_distance(ChunkCoord::new(-2, 5)), 5);
        assert_eq!(a.chebyshev_distance(a), 0);
    }

    #[test]
    fn test_square() {
        let coords: Vec<_> = ChunkCoord::new(10, 0).square(2).collect();
        assert_eq!(coords.len(), 25);
        assert!(coords.iter().all(|c| c.chebyshev_distance(ChunkCoord::new(10, 0)) <= 2));
        assert_eq!(ChunkCoord::new(0, 0).square(0).count(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(ChunkCoord::new(3, -4).to_string(), "(3, -4)");
    }

    #[test]
    fn test_world_origin() {
        let c = ChunkCoord::new(-2, 3);
        assert_eq!(c.world_origin(64), Vec3::new(-128.0, 0.0, 192.0));
        assert_eq!(c.world_center(64), Vec3::new(-96.0, 0.0, 224.0));
    }
}
