use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::chain::Chain;
use crate::error::RigResult;
use crate::math::{aim_basis, Axis, Sign};
use crate::scene::Scene;

/// Axis convention used to orient a chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientAxes {
    pub aim: Axis,
    pub up: Axis,
    /// World-space up reference. Never mirrored.
    pub world_up: Vec3,
    pub reverse_aim: Sign,
    pub reverse_up: Sign,
}

impl Default for OrientAxes {
    fn default() -> Self {
        Self {
            aim: Axis::X,
            up: Axis::Y,
            world_up: Vec3::Y,
            reverse_aim: Sign::Positive,
            reverse_up: Sign::Positive,
        }
    }
}

impl OrientAxes {
    pub fn new(aim: Axis, up: Axis, world_up: Vec3) -> Self {
        Self {
            aim,
            up,
            world_up,
            ..Default::default()
        }
    }

    /// Flips both local axes, the convention for the mirrored side of a rig.
    pub fn mirrored(mut self, sign: Sign) -> Self {
        self.reverse_aim = sign;
        self.reverse_up = sign;
        self
    }

    pub fn with_reverse(mut self, reverse_aim: Sign, reverse_up: Sign) -> Self {
        self.reverse_aim = reverse_aim;
        self.reverse_up = reverse_up;
        self
    }

    pub fn local_aim(&self) -> Vec3 {
        self.reverse_aim.apply(self.aim.unit())
    }

    pub fn local_up(&self) -> Vec3 {
        self.reverse_up.apply(self.up.unit())
    }
}

pub struct OrientationSolver;

impl OrientationSolver {
    /// Rotates every joint but the last so its signed aim axis points at the
    /// next joint, then re-parents the chain joint by joint. World positions
    /// are preserved and the last joint ends with identity local rotation.
    ///
    /// `aim` and `up` must differ; a parallel configuration produces an
    /// arbitrary but valid basis.
    pub fn orient_chain(scene: &mut Scene, chain: &Chain, axes: &OrientAxes) -> RigResult<()> {
        for joint in chain.joints() {
            scene.transforms().get(*joint)?;
        }
        if chain.joint_count() < 2 {
            return Ok(());
        }
        if axes.aim == axes.up {
            log::warn!(
                "orienting `{}` with aim and up both on {:?}",
                chain.name(),
                axes.aim
            );
        }

        let local_aim = axes.local_aim();
        let local_up = axes.local_up();

        for (joint, next) in chain.segments() {
            scene.set_parent(next, None, true)?;

            let world = scene.world_transform(joint)?;
            let target = scene.world_position(next)?;
            let rotation = aim_basis(
                target - world.translation,
                axes.world_up,
                local_aim,
                local_up,
            );
            scene.set_world_matrix(
                joint,
                Mat4::from_scale_rotation_translation(world.scale, rotation, world.translation),
            )?;

            scene.set_parent(next, Some(joint), true)?;
        }

        scene.set_rotation(chain.end(), Quat::IDENTITY)?;
        log::debug!(
            "oriented `{}` ({} joints, aim {:?}{}, up {:?}{})",
            chain.name(),
            chain.joint_count(),
            axes.aim,
            sign_suffix(axes.reverse_aim),
            axes.up,
            sign_suffix(axes.reverse_up),
        );
        Ok(())
    }
}

fn sign_suffix(sign: Sign) -> &'static str {
    match sign {
        Sign::Positive => "",
        Sign::Negative => " reversed",
    }
}

#[cfg(test)]
mod tests {
    use glam::Mat3;

    use super::*;
    use crate::error::ErrorKind;
    use crate::id::NodeId;
    use crate::math::is_orthonormal;

    fn arm(scene: &mut Scene, positions: &[Vec3]) -> Chain {
        Chain::create(scene, "arm", positions, None).unwrap()
    }

    #[test]
    fn aim_axis_points_down_the_chain() {
        let mut scene = Scene::new();
        let positions = [Vec3::ZERO, Vec3::new(5.0, 0.0, -1.0), Vec3::new(10.0, 0.0, 0.0)];
        let chain = arm(&mut scene, &positions);

        OrientationSolver::orient_chain(&mut scene, &chain, &OrientAxes::default()).unwrap();

        for (i, (joint, next)) in chain.segments().enumerate() {
            let world = scene.world_matrix(joint).unwrap();
            let basis = Mat3::from_mat4(world);
            assert!(is_orthonormal(basis, 1e-4));
            let expected = (positions[i + 1] - positions[i]).normalize();
            assert!(basis.x_axis.abs_diff_eq(expected, 1e-4));
            assert!(scene
                .world_position(next)
                .unwrap()
                .abs_diff_eq(positions[i + 1], 1e-4));
        }
        assert_eq!(
            scene.rest_transform(chain.end()).unwrap().rotation,
            Quat::IDENTITY
        );
    }

    #[test]
    fn orienting_twice_changes_nothing() {
        let mut scene = Scene::new();
        let chain = arm(
            &mut scene,
            &[Vec3::ZERO, Vec3::new(3.0, 1.0, 0.5), Vec3::new(6.0, 0.0, 2.0)],
        );
        let axes = OrientAxes::new(Axis::Y, Axis::Z, Vec3::Z);

        OrientationSolver::orient_chain(&mut scene, &chain, &axes).unwrap();
        let first: Vec<Mat4> = chain
            .joints()
            .iter()
            .map(|j| scene.world_matrix(*j).unwrap())
            .collect();
        OrientationSolver::orient_chain(&mut scene, &chain, &axes).unwrap();

        for (joint, before) in chain.joints().iter().zip(first) {
            assert!(scene.world_matrix(*joint).unwrap().abs_diff_eq(before, 1e-4));
        }
    }

    #[test]
    fn single_joint_is_left_alone() {
        let mut scene = Scene::new();
        let rotation = Quat::from_rotation_z(0.3);
        let joint = scene
            .create_transform_at("solo", None, Mat4::from_quat(rotation))
            .unwrap();
        let chain = Chain::builder("solo").add_joint(joint).build().unwrap();

        OrientationSolver::orient_chain(&mut scene, &chain, &OrientAxes::default()).unwrap();
        assert!(scene
            .rest_transform(joint)
            .unwrap()
            .rotation
            .abs_diff_eq(rotation, 1e-6));
    }

    #[test]
    fn unknown_joint_is_a_missing_reference() {
        let mut scene = Scene::new();
        let chain = Chain::builder("ghost")
            .add_joint(NodeId(4))
            .add_joint(NodeId(5))
            .build()
            .unwrap();
        let err = OrientationSolver::orient_chain(&mut scene, &chain, &OrientAxes::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReference);
    }
}
