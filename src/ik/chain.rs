use glam::{Mat4, Vec3};

use crate::error::{RigError, RigResult};
use crate::id::NodeId;
use crate::scene::Scene;

/// Ordered run of joints, root first.
///
/// Consecutive joints are meant to be parent and child once the chain has
/// been oriented; the chain itself only records the order.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub(crate) name: String,
    pub(crate) joints: Vec<NodeId>,
}

impl Chain {
    pub fn builder(name: impl Into<String>) -> ChainBuilder {
        ChainBuilder::new(name)
    }

    /// Creates one joint per position, each parented under the previous
    /// one, and returns them as a chain. Joints are named `{name}_{i}`.
    pub fn create(
        scene: &mut Scene,
        name: impl Into<String>,
        positions: &[Vec3],
        parent: Option<NodeId>,
    ) -> RigResult<Chain> {
        let name = name.into();
        let mut joints = Vec::with_capacity(positions.len());
        let mut previous = parent;
        for (i, position) in positions.iter().enumerate() {
            let joint = scene.create_transform_at(
                format!("{name}_{i}"),
                previous,
                Mat4::from_translation(*position),
            )?;
            joints.push(joint);
            previous = Some(joint);
        }
        ChainBuilder::new(name).add_joints(joints).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> &[NodeId] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn root(&self) -> NodeId {
        self.joints[0]
    }

    pub fn end(&self) -> NodeId {
        self.joints[self.joints.len() - 1]
    }

    /// `(parent, child)` pairs along the chain.
    pub fn segments(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.joints.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn positions(&self, scene: &mut Scene) -> RigResult<Vec<Vec3>> {
        self.joints
            .iter()
            .map(|joint| scene.world_position(*joint))
            .collect()
    }

    /// Distances between consecutive joints in the current pose.
    pub fn segment_lengths(&self, scene: &mut Scene) -> RigResult<Vec<f32>> {
        let positions = self.positions(scene)?;
        Ok(positions.windows(2).map(|w| w[0].distance(w[1])).collect())
    }

    pub fn total_length(&self, scene: &mut Scene) -> RigResult<f32> {
        Ok(self.segment_lengths(scene)?.iter().sum())
    }

    pub(crate) fn require_joints(&self, context: &str, minimum: usize) -> RigResult<()> {
        if self.joints.len() < minimum {
            return Err(RigError::invalid(
                context,
                format!(
                    "chain `{}` has {} joints, at least {minimum} required",
                    self.name,
                    self.joints.len()
                ),
            ));
        }
        Ok(())
    }
}

pub struct ChainBuilder {
    name: String,
    joints: Vec<NodeId>,
}

impl ChainBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            joints: Vec::new(),
        }
    }

    pub fn add_joint(mut self, joint: NodeId) -> Self {
        self.joints.push(joint);
        self
    }

    pub fn add_joints(mut self, joints: impl IntoIterator<Item = NodeId>) -> Self {
        self.joints.extend(joints);
        self
    }

    pub fn build(self) -> RigResult<Chain> {
        if self.joints.is_empty() {
            return Err(RigError::invalid(
                format!("chain `{}`", self.name),
                "a chain needs at least one joint",
            ));
        }
        if let Some(duplicate) = self
            .joints
            .iter()
            .enumerate()
            .find(|(i, joint)| self.joints[..*i].contains(joint))
            .map(|(_, joint)| *joint)
        {
            return Err(RigError::invalid(
                format!("chain `{}`", self.name),
                format!("{duplicate} appears twice"),
            ));
        }
        Ok(Chain {
            name: self.name,
            joints: self.joints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_create_parents_joints_in_order() {
        let mut scene = Scene::new();
        let positions = [Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::new(8.0, 4.0, 0.0)];
        let chain = Chain::create(&mut scene, "arm", &positions, None).unwrap();

        assert_eq!(chain.joint_count(), 3);
        assert_eq!(scene.parent(chain.joints()[1]), Some(chain.root()));
        assert_eq!(scene.parent(chain.end()), Some(chain.joints()[1]));
        assert_eq!(scene.name(chain.end()), "arm_2");

        let lengths = chain.segment_lengths(&mut scene).unwrap();
        assert!((lengths[0] - 5.0).abs() < 1e-5);
        assert!((lengths[1] - 5.0).abs() < 1e-5);
        assert!((chain.total_length(&mut scene).unwrap() - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let err = Chain::builder("empty").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_repeated_joint_is_rejected() {
        let mut scene = Scene::new();
        let joint = scene.create_transform("j", None).unwrap();
        let err = Chain::builder("loop")
            .add_joint(joint)
            .add_joint(joint)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
