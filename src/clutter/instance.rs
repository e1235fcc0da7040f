//! Placement records produced by scattering.

use glam::{Mat4, Quat, Vec3};

/// Where and how one decoration instance sits in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    /// Radians about +Y
    pub rotation: f32,
    pub scale: f32,
}

impl Placement {
    /// `translate(position) * rotate_y(rotation) * scale(scale)`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.rotation),
            self.position,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlowerInstance {
    pub placement: Placement,
    pub petal_color: Vec3,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoatInstance {
    pub placement: Placement,
    /// Animation phase in [0, 2π)
    pub phase: f32,
}

impl BoatInstance {
    /// Model matrix with the time-driven bob and roll applied
    pub fn animated_matrix(&self, time: f32) -> Mat4 {
        let p = &self.placement;
        let bob = (time * 1.5 + self.phase).sin() * 0.3;
        let roll = (time * 1.1 + self.phase).sin() * 0.06;
        Mat4::from_translation(p.position + Vec3::Y * bob)
            * Mat4::from_rotation_y(p.rotation)
            * Mat4::from_rotation_z(roll)
            * Mat4::from_scale(Vec3::splat(p.scale))
    }
}

impl FlowerInstance {
    /// Model matrix with a small wind sway keyed on the flower's position
    pub fn animated_matrix(&self, time: f32) -> Mat4 {
        let p = &self.placement;
        let offset = p.position.x * 0.13 + p.position.z * 0.07;
        let sway = (time * 2.0 + offset).sin() * 0.08;
        Mat4::from_translation(p.position)
            * Mat4::from_rotation_y(p.rotation)
            * Mat4::from_rotation_x(sway)
            * Mat4::from_scale(Vec3::splat(p.scale))
    }
}

/// All decorations of one chunk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChunkInstances {
    pub trees: Vec<Placement>,
    pub cabins: Vec<Placement>,
    pub flowers: Vec<FlowerInstance>,
    pub boats: Vec<BoatInstance>,
}

impl ChunkInstances {
    pub fn total(&self) -> usize {
        self.trees.len() + self.cabins.len() + self.flowers.len() + self.boats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Every placement regardless of kind
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.trees
            .iter()
            .chain(self.cabins.iter())
            .chain(self.flowers.iter().map(|f| &f.placement))
            .chain(self.boats.iter().map(|b| &b.placement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matrix_order() {
        let p = Placement {
            position: Vec3::new(10.0, 2.0, -5.0),
            rotation: std::f32::consts::FRAC_PI_2,
            scale: 2.0,
        };
        let expected = Mat4::from_translation(p.position)
            * Mat4::from_rotation_y(p.rotation)
            * Mat4::from_scale(Vec3::splat(p.scale));
        assert!(p.model_matrix().abs_diff_eq(expected, 1e-5));

        // Local +X of length 1 lands 2 units along -Z from the origin
        let v = p.model_matrix().transform_point3(Vec3::X);
        assert!((v - Vec3::new(10.0, 2.0, -7.0)).length() < 1e-4);
    }

    #[test]
    fn test_boat_bob_is_bounded() {
        let boat = BoatInstance {
            placement: Placement { position: Vec3::new(0.0, -4.0, 0.0), rotation: 0.0, scale: 1.0 },
            phase: 1.0,
        };
        for i in 0..100 {
            let m = boat.animated_matrix(i as f32 * 0.1);
            let y = m.transform_point3(Vec3::ZERO).y;
            assert!((y - -4.0).abs() <= 0.3 + 1e-5);
        }
    }

    #[test]
    fn test_instance_counts() {
        let mut inst = ChunkInstances::default();
        assert!(inst.is_empty());
        inst.trees.push(Placement { position: Vec3::ZERO, rotation: 0.0, scale: 1.0 });
        inst.boats.push(BoatInstance {
            placement: Placement { position: Vec3::ONE, rotation: 0.0, scale: 1.0 },
            phase: 0.0,
        });
        assert_eq!(inst.total(), 2);
        assert_eq!(inst.placements().count(), 2);
    }
}
