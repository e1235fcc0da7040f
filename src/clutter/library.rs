//! Shared decoration meshes.
//!
//! One mesh per decoration kind, built once at startup and drawn for every
//! instance with a per-instance model matrix. Meshes use the terrain vertex
//! layout with flat face normals. Pure white vertices are tintable: the
//! renderer multiplies them by the per-draw tint (flower petals use this).

use std::f32::consts::TAU;

use glam::Vec3;

use crate::core::types::Result;
use crate::render::buffer::{BufferAllocator, GpuMesh};
use crate::terrain::{MeshData, TerrainVertex};

/// Vertex color that picks up the per-draw tint
pub const TINTABLE: Vec3 = Vec3::ONE;

const WOOD_DARK: Vec3 = Vec3::new(0.40, 0.25, 0.15);
const WOOD_LIGHT: Vec3 = Vec3::new(0.50, 0.35, 0.20);
const ROOF: Vec3 = Vec3::new(0.35, 0.20, 0.10);
const DOOR: Vec3 = Vec3::new(0.30, 0.15, 0.08);
const WINDOW: Vec3 = Vec3::new(0.60, 0.70, 0.80);
const FOLIAGE: Vec3 = Vec3::new(0.13, 0.45, 0.18);
const FOLIAGE_TOP: Vec3 = Vec3::new(0.18, 0.55, 0.22);
const STEM: Vec3 = Vec3::new(0.25, 0.55, 0.20);
const FLOWER_CENTER: Vec3 = Vec3::new(0.95, 0.80, 0.15);
const HULL: Vec3 = Vec3::new(0.45, 0.28, 0.16);
const DECK: Vec3 = Vec3::new(0.62, 0.48, 0.30);
const SAIL: Vec3 = Vec3::new(0.94, 0.93, 0.88);

/// Accumulates flat-shaded triangles
#[derive(Default)]
struct MeshBuilder {
    mesh: MeshData,
}

impl MeshBuilder {
    /// Add a triangle whose normal faces along `outward`
    fn triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: Vec3, outward: Vec3) {
        let mut normal = (b - a).cross(c - a).normalize_or_zero();
        let (b, c) = if normal.dot(outward) < 0.0 {
            normal = -normal;
            (c, b)
        } else {
            (b, c)
        };

        let base = self.mesh.vertices.len() as u32;
        for p in [a, b, c] {
            self.mesh.vertices.push(TerrainVertex::new(p, normal, color));
        }
        self.mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    /// Triangle visible from both sides, for thin surfaces
    fn two_sided_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3, color: Vec3, outward: Vec3) {
        self.triangle(a, b, c, color, outward);
        self.triangle(a, b, c, color, -outward);
    }

    /// Quad a-b-c-d (in order around the edge)
    fn quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3, color: Vec3, outward: Vec3) {
        self.triangle(a, b, c, color, outward);
        self.triangle(a, c, d, color, outward);
    }

    /// Axis aligned box
    fn cuboid(&mut self, min: Vec3, max: Vec3, color: Vec3) {
        let p = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let (x0, y0, z0) = (min.x, min.y, min.z);
        let (x1, y1, z1) = (max.x, max.y, max.z);

        self.quad(p(x0, y0, z1), p(x1, y0, z1), p(x1, y1, z1), p(x0, y1, z1), color, Vec3::Z);
        self.quad(p(x0, y0, z0), p(x0, y1, z0), p(x1, y1, z0), p(x1, y0, z0), color, -Vec3::Z);
        self.quad(p(x1, y0, z0), p(x1, y1, z0), p(x1, y1, z1), p(x1, y0, z1), color, Vec3::X);
        self.quad(p(x0, y0, z0), p(x0, y0, z1), p(x0, y1, z1), p(x0, y1, z0), color, -Vec3::X);
        self.quad(p(x0, y1, z0), p(x0, y1, z1), p(x1, y1, z1), p(x1, y1, z0), color, Vec3::Y);
        self.quad(p(x0, y0, z0), p(x1, y0, z0), p(x1, y0, z1), p(x0, y0, z1), color, -Vec3::Y);
    }

    /// Open cylinder along +Y
    fn cylinder(&mut self, base_y: f32, radius: f32, height: f32, segments: u32, color: Vec3) {
        for i in 0..segments {
            let a0 = i as f32 / segments as f32 * TAU;
            let a1 = (i + 1) as f32 / segments as f32 * TAU;
            let d0 = Vec3::new(a0.cos(), 0.0, a0.sin());
            let d1 = Vec3::new(a1.cos(), 0.0, a1.sin());
            let outward = (d0 + d1).normalize_or_zero();

            let b0 = d0 * radius + Vec3::Y * base_y;
            let b1 = d1 * radius + Vec3::Y * base_y;
            let t0 = b0 + Vec3::Y * height;
            let t1 = b1 + Vec3::Y * height;
            self.quad(b0, b1, t1, t0, color, outward);
        }
    }

    /// Cone along +Y with a closed base
    fn cone(&mut self, base_y: f32, radius: f32, height: f32, segments: u32, side: Vec3, bottom: Vec3) {
        let apex = Vec3::Y * (base_y + height);
        let center = Vec3::Y * base_y;
        for i in 0..segments {
            let a0 = i as f32 / segments as f32 * TAU;
            let a1 = (i + 1) as f32 / segments as f32 * TAU;
            let b0 = Vec3::new(a0.cos() * radius, base_y, a0.sin() * radius);
            let b1 = Vec3::new(a1.cos() * radius, base_y, a1.sin() * radius);
            let outward = ((b0 + b1) * 0.5 - center).normalize_or_zero() + Vec3::Y * 0.5;
            self.triangle(b0, b1, apex, side, outward);
            self.triangle(center, b1, b0, bottom, -Vec3::Y);
        }
    }

    fn finish(self) -> MeshData {
        self.mesh
    }
}

/// Pine: trunk plus two stacked foliage cones
pub fn tree_mesh() -> MeshData {
    let mut b = MeshBuilder::default();
    b.cylinder(0.0, 0.2, 2.0, 8, WOOD_DARK);
    b.cone(1.5, 1.5, 3.0, 8, FOLIAGE, FOLIAGE * 0.7);
    b.cone(3.2, 1.0, 2.2, 8, FOLIAGE_TOP, FOLIAGE * 0.7);
    b.finish()
}

/// Log cabin with door, two windows and a pitched roof
pub fn cabin_mesh() -> MeshData {
    let (w, h, d) = (3.0, 3.0, 2.5);
    let roof_top = h + 2.5;
    let mut b = MeshBuilder::default();

    b.cuboid(Vec3::new(-w, 0.0, -d), Vec3::new(w, h, d), WOOD_LIGHT);

    // Door on the front face
    b.quad(
        Vec3::new(-0.6, 0.0, d + 0.05),
        Vec3::new(0.6, 0.0, d + 0.05),
        Vec3::new(0.6, 2.0, d + 0.05),
        Vec3::new(-0.6, 2.0, d + 0.05),
        DOOR,
        Vec3::Z,
    );

    // Side windows
    for side in [-1.0f32, 1.0] {
        let x = side * (w + 0.05);
        b.quad(
            Vec3::new(x, 1.5, -0.75),
            Vec3::new(x, 1.5, 0.75),
            Vec3::new(x, 2.5, 0.75),
            Vec3::new(x, 2.5, -0.75),
            WINDOW,
            Vec3::X * side,
        );
    }

    // Gables
    for side in [-1.0f32, 1.0] {
        let z = side * d;
        b.triangle(
            Vec3::new(-w, h, z),
            Vec3::new(w, h, z),
            Vec3::new(0.0, roof_top, z),
            WOOD_DARK,
            Vec3::Z * side,
        );
    }

    // Roof slopes with a small overhang
    let o = 0.3;
    for side in [-1.0f32, 1.0] {
        let eave_x = side * (w + o);
        let shade = if side < 0.0 { 0.8 } else { 0.9 };
        b.quad(
            Vec3::new(eave_x, h - 0.2, -d - o),
            Vec3::new(eave_x, h - 0.2, d + o),
            Vec3::new(0.0, roof_top, d + o),
            Vec3::new(0.0, roof_top, -d - o),
            ROOF * shade,
            Vec3::new(side, 1.0, 0.0),
        );
    }

    b.finish()
}

/// Stem, yellow center and five tintable petals
pub fn flower_mesh() -> MeshData {
    let mut b = MeshBuilder::default();
    b.cuboid(Vec3::new(-0.03, 0.0, -0.03), Vec3::new(0.03, 0.6, 0.03), STEM);
    b.cuboid(Vec3::new(-0.06, 0.6, -0.06), Vec3::new(0.06, 0.66, 0.06), FLOWER_CENTER);

    let y = 0.63;
    for i in 0..5 {
        let angle = i as f32 / 5.0 * TAU;
        let dir = Vec3::new(angle.cos(), 0.0, angle.sin());
        let perp = Vec3::new(-dir.z, 0.0, dir.x);
        let inner = dir * 0.05 + Vec3::Y * y;
        let outer = dir * 0.22 + Vec3::Y * (y + 0.03);
        let mid = dir * 0.13 + Vec3::Y * y;
        let (left, right) = (mid + perp * 0.06, mid - perp * 0.06);
        b.two_sided_triangle(inner, left, outer, TINTABLE, Vec3::Y);
        b.two_sided_triangle(inner, outer, right, TINTABLE, Vec3::Y);
    }

    b.finish()
}

/// Small sailboat: tapered hull, deck, mast and a triangular sail
pub fn boat_mesh() -> MeshData {
    let (half_len, half_beam, depth) = (2.0, 0.8, 0.6);
    let mut b = MeshBuilder::default();

    let bow = Vec3::new(0.0, 0.3, half_len + 0.6);
    let keel_bow = Vec3::new(0.0, -depth, half_len);
    let stern_l = Vec3::new(-half_beam, 0.3, -half_len);
    let stern_r = Vec3::new(half_beam, 0.3, -half_len);
    let mid_l = Vec3::new(-half_beam, 0.3, half_len * 0.5);
    let mid_r = Vec3::new(half_beam, 0.3, half_len * 0.5);
    let keel_stern_l = Vec3::new(-half_beam * 0.6, -depth, -half_len);
    let keel_stern_r = Vec3::new(half_beam * 0.6, -depth, -half_len);

    // Hull sides
    b.quad(stern_l, mid_l, keel_bow, keel_stern_l, HULL, -Vec3::X);
    b.triangle(mid_l, bow, keel_bow, HULL, -Vec3::X);
    b.quad(stern_r, keel_stern_r, keel_bow, mid_r, HULL, Vec3::X);
    b.triangle(mid_r, keel_bow, bow, HULL, Vec3::X);
    // Transom and bottom
    b.quad(stern_l, keel_stern_l, keel_stern_r, stern_r, HULL * 0.8, -Vec3::Z);
    b.triangle(keel_stern_l, keel_bow, keel_stern_r, HULL * 0.7, -Vec3::Y);
    // Deck
    b.quad(stern_l, stern_r, mid_r, mid_l, DECK, Vec3::Y);
    b.triangle(mid_l, mid_r, bow, DECK, Vec3::Y);

    // Mast and sail
    b.cuboid(Vec3::new(-0.05, 0.3, -0.05), Vec3::new(0.05, 3.5, 0.05), WOOD_DARK);
    b.two_sided_triangle(
        Vec3::new(0.0, 0.6, -1.6),
        Vec3::new(0.0, 0.6, -0.1),
        Vec3::new(0.0, 3.4, -0.1),
        SAIL,
        Vec3::X,
    );

    b.finish()
}

/// CPU meshes for every decoration kind
#[derive(Clone, Debug)]
pub struct DecorationLibrary {
    pub tree: MeshData,
    pub cabin: MeshData,
    pub flower: MeshData,
    pub boat: MeshData,
}

impl DecorationLibrary {
    pub fn build() -> Self {
        Self {
            tree: tree_mesh(),
            cabin: cabin_mesh(),
            flower: flower_mesh(),
            boat: boat_mesh(),
        }
    }
}

impl Default for DecorationLibrary {
    fn default() -> Self {
        Self::build()
    }
}

/// Decoration meshes uploaded to the GPU
#[derive(Debug)]
pub struct DecorationMeshes {
    pub tree: GpuMesh,
    pub cabin: GpuMesh,
    pub flower: GpuMesh,
    pub boat: GpuMesh,
}

impl DecorationMeshes {
    /// Upload every mesh of `library`
    pub fn upload(allocator: &dyn BufferAllocator, library: &DecorationLibrary) -> Result<Self> {
        let meshes = Self {
            tree: GpuMesh::upload(allocator, "tree", &library.tree)?,
            cabin: GpuMesh::upload(allocator, "cabin", &library.cabin)?,
            flower: GpuMesh::upload(allocator, "flower", &library.flower)?,
            boat: GpuMesh::upload(allocator, "boat", &library.boat)?,
        };
        log::info!(
            "Uploaded decoration meshes ({} bytes)",
            meshes.tree.size_bytes()
                + meshes.cabin.size_bytes()
                + meshes.flower.size_bytes()
                + meshes.boat.size_bytes()
        );
        Ok(meshes)
    }
}
