use glam::{Mat4, Quat, Vec3};

use super::{Plug, Scene};
use crate::error::RigResult;
use crate::expr::Value;
use crate::id::NodeId;
use crate::math::Transform;

/// Boundary contract between the rig core and a 3D host.
///
/// [`Scene`] implements it headlessly; a host binding mirrors the same
/// calls onto its own dependency graph.
pub trait SceneAdapter {
    fn create_transform(&mut self, name: &str, parent: Option<NodeId>) -> RigResult<NodeId>;

    fn set_local_transform(
        &mut self,
        node: NodeId,
        translate: Vec3,
        rotate: Quat,
        scale: Vec3,
    ) -> RigResult<()>;

    fn get_world_matrix(&mut self, node: NodeId) -> RigResult<Mat4>;

    fn connect(&mut self, src: Plug, dst: Plug) -> RigResult<()>;

    fn set_attribute(&mut self, plug: Plug, value: Value) -> RigResult<()>;

    fn get_attribute(&mut self, plug: Plug) -> RigResult<Value>;
}

impl SceneAdapter for Scene {
    fn create_transform(&mut self, name: &str, parent: Option<NodeId>) -> RigResult<NodeId> {
        Scene::create_transform(self, name, parent)
    }

    fn set_local_transform(
        &mut self,
        node: NodeId,
        translate: Vec3,
        rotate: Quat,
        scale: Vec3,
    ) -> RigResult<()> {
        Scene::set_local_transform(self, node, Transform::new(translate, rotate, scale))
    }

    fn get_world_matrix(&mut self, node: NodeId) -> RigResult<Mat4> {
        self.world_matrix(node)
    }

    fn connect(&mut self, src: Plug, dst: Plug) -> RigResult<()> {
        Scene::connect(self, src, dst)
    }

    fn set_attribute(&mut self, plug: Plug, value: Value) -> RigResult<()> {
        Scene::set_attribute(self, plug, value)
    }

    fn get_attribute(&mut self, plug: Plug) -> RigResult<Value> {
        self.evaluate(plug)
    }
}
