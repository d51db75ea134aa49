//! Scene module
//!
//! The [`Scene`] owns every transform node, attribute, expression node and
//! connection of a rig. It is the headless implementation of the
//! [`SceneAdapter`] contract and the pull-based evaluator for the whole
//! dependency graph.

mod adapter;
mod attribute;
mod deps;
mod eval;
mod plug;
mod transform_graph;

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

pub use adapter::SceneAdapter;
pub use attribute::{Attribute, AttributeRegistry, AttributeSpec};
pub use eval::EvalStats;
pub use plug::{Channel, ChannelGroup, Plug};
pub use transform_graph::{TransformGraph, TransformNode};

use crate::error::{RigError, RigResult};
use crate::expr::{safe_inverse, ExprNode, ExprOp, ExpressionGraph, Input, Value, ValueType};
use crate::id::{ExprId, NodeId};
use crate::math::Transform;
use eval::EvalCache;

/// Scene state captured before a build. See [`Scene::rollback`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    transforms: TransformGraph,
    attributes: AttributeRegistry,
    drivers: HashMap<Plug, Plug>,
    expressions: usize,
}

#[derive(Debug, Default)]
pub struct Scene {
    transforms: TransformGraph,
    expressions: ExpressionGraph,
    attributes: AttributeRegistry,
    /// Consumer → producer. One entry per consumer enforces fan-in = 1.
    drivers: HashMap<Plug, Plug>,
    cache: EvalCache,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transforms(&self) -> &TransformGraph {
        &self.transforms
    }

    pub fn expressions(&self) -> &ExpressionGraph {
        &self.expressions
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    pub fn name(&self, node: NodeId) -> &str {
        self.transforms.name(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.transforms.parent(node)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.transforms.children(node)
    }

    pub fn connection_count(&self) -> usize {
        self.drivers.len()
    }

    pub fn create_transform(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
    ) -> RigResult<NodeId> {
        self.create_transform_with(name, parent, Transform::IDENTITY)
    }

    pub fn create_transform_with(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        local: Transform,
    ) -> RigResult<NodeId> {
        let id = self.transforms.create(name, parent, local)?;
        self.cache.invalidate();
        Ok(id)
    }

    /// Creates a transform whose evaluated world matrix equals `world`.
    pub fn create_transform_at(
        &mut self,
        name: impl Into<String>,
        parent: Option<NodeId>,
        world: Mat4,
    ) -> RigResult<NodeId> {
        let id = self.create_transform(name, parent)?;
        self.set_world_matrix(id, world)?;
        Ok(id)
    }

    /// Rest (undriven) local transform.
    pub fn rest_transform(&self, node: NodeId) -> RigResult<Transform> {
        Ok(self.transforms.get(node)?.local)
    }

    pub fn set_local_transform(&mut self, node: NodeId, local: Transform) -> RigResult<()> {
        self.transforms.node_mut(node)?.local = local;
        self.cache.invalidate();
        Ok(())
    }

    pub fn set_translation(&mut self, node: NodeId, translation: Vec3) -> RigResult<()> {
        self.transforms.node_mut(node)?.local.translation = translation;
        self.cache.invalidate();
        Ok(())
    }

    pub fn set_rotation(&mut self, node: NodeId, rotation: Quat) -> RigResult<()> {
        self.transforms.node_mut(node)?.local.rotation = rotation.normalize();
        self.cache.invalidate();
        Ok(())
    }

    /// Rewrites the rest local transform so the node evaluates to `world`
    /// under its current parent.
    pub fn set_world_matrix(&mut self, node: NodeId, world: Mat4) -> RigResult<()> {
        self.transforms.get(node)?;
        let parent_world = self.eval_parent_world(node);
        let local = Transform::from_matrix(safe_inverse(parent_world) * world);
        self.set_local_transform(node, local)
    }

    /// Moves `child` under `parent`, optionally preserving its world pose.
    pub fn set_parent(
        &mut self,
        child: NodeId,
        parent: Option<NodeId>,
        keep_world: bool,
    ) -> RigResult<()> {
        self.transforms.get(child)?;
        if let Some(parent) = parent {
            self.transforms.get(parent)?;
            if self.reparent_creates_cycle(child, parent) {
                return Err(RigError::CyclicConnection {
                    from: self.name(parent).to_string(),
                    to: self.name(child).to_string(),
                });
            }
        }
        let world = self.eval_world(child);
        self.transforms.set_parent(child, parent)?;
        self.cache.invalidate();
        if keep_world {
            self.set_world_matrix(child, world)?;
        }
        Ok(())
    }

    pub fn add_attribute(&mut self, owner: NodeId, spec: AttributeSpec) -> RigResult<Plug> {
        self.transforms.get(owner)?;
        let id = self.attributes.define(owner, spec)?;
        Ok(Plug::Attr(id))
    }

    pub fn plug_type(&self, plug: Plug) -> RigResult<ValueType> {
        let missing = || RigError::MissingReference(format!("plug {plug}"));
        match plug {
            Plug::Output { node, index } => self
                .expressions
                .node(node)
                .and_then(|n| n.outputs.get(index as usize))
                .copied()
                .ok_or_else(missing),
            Plug::Attr(id) => self
                .attributes
                .get(id)
                .map(|a| a.spec.value_type)
                .ok_or_else(missing),
            Plug::Channel(node, channel) => {
                self.transforms.get(node)?;
                Ok(channel.value_type())
            }
            Plug::WorldMatrix(node)
            | Plug::WorldInverse(node)
            | Plug::ParentMatrix(node)
            | Plug::ParentInverse(node) => {
                self.transforms.get(node)?;
                Ok(ValueType::Matrix)
            }
            Plug::WorldPosition(node) => {
                self.transforms.get(node)?;
                Ok(ValueType::Vec3)
            }
        }
    }

    /// Human-readable plug path for error messages and logs.
    pub fn describe(&self, plug: Plug) -> String {
        match plug {
            Plug::Output { node, index } => {
                let op = self
                    .expressions
                    .node(node)
                    .map(|n| n.op.name())
                    .unwrap_or("<missing>");
                format!("{op}#{}.out[{index}]", node.0)
            }
            Plug::Attr(id) => match self.attributes.get(id) {
                Some(attr) => format!("{}.{}", self.name(attr.owner), attr.spec.name),
                None => format!("{id}"),
            },
            Plug::Channel(node, channel) => format!("{}.{channel:?}", self.name(node)),
            Plug::WorldMatrix(node) => format!("{}.worldMatrix", self.name(node)),
            Plug::WorldInverse(node) => format!("{}.worldInverseMatrix", self.name(node)),
            Plug::ParentMatrix(node) => format!("{}.parentMatrix", self.name(node)),
            Plug::ParentInverse(node) => format!("{}.parentInverseMatrix", self.name(node)),
            Plug::WorldPosition(node) => format!("{}.worldPosition", self.name(node)),
        }
    }

    pub fn driver(&self, consumer: Plug) -> Option<Plug> {
        self.drivers.get(&consumer).copied()
    }

    pub fn is_driven(&self, consumer: Plug) -> bool {
        self.drivers.contains_key(&consumer)
    }

    /// Connects `src` into the writable plug `dst`.
    pub fn connect(&mut self, src: Plug, dst: Plug) -> RigResult<()> {
        if !dst.is_writable() {
            return Err(RigError::ReadOnlyPlug(self.describe(dst)));
        }
        let src_type = self.plug_type(src)?;
        let dst_type = self.plug_type(dst)?;
        if src_type != dst_type {
            return Err(RigError::mismatch(
                format!("{} -> {}", self.describe(src), self.describe(dst)),
                dst_type,
                src_type,
            ));
        }
        if self.drivers.contains_key(&dst) {
            return Err(RigError::DuplicateConnection(self.describe(dst)));
        }
        if self.connection_creates_cycle(src, dst) {
            return Err(RigError::CyclicConnection {
                from: self.describe(src),
                to: self.describe(dst),
            });
        }

        log::trace!("connect {} -> {}", self.describe(src), self.describe(dst));
        self.drivers.insert(dst, src);
        self.cache.invalidate();
        Ok(())
    }

    /// Removes the incoming connection of `dst` and returns its former driver.
    pub fn disconnect(&mut self, dst: Plug) -> RigResult<Plug> {
        let src = self.drivers.remove(&dst).ok_or_else(|| {
            RigError::MissingReference(format!("connection into {}", self.describe(dst)))
        })?;
        log::trace!("disconnect {} -> {}", self.describe(src), self.describe(dst));
        self.cache.invalidate();
        Ok(src)
    }

    /// Connects a plug operand, or writes a constant operand as the value.
    pub fn drive(&mut self, value: impl Into<Input>, dst: Plug) -> RigResult<()> {
        match value.into() {
            Input::Plug(src) => self.connect(src, dst),
            Input::Const(constant) => self.set_attribute(dst, constant),
        }
    }

    /// Writes the stored value of an attribute or the rest value of a
    /// transform channel. Driven plugs reject writes.
    pub fn set_attribute(&mut self, plug: Plug, value: impl Into<Value>) -> RigResult<()> {
        let value = value.into();
        if !plug.is_writable() {
            return Err(RigError::ReadOnlyPlug(self.describe(plug)));
        }
        if self.drivers.contains_key(&plug) {
            return Err(RigError::ReadOnlyPlug(format!(
                "{} (driven by {})",
                self.describe(plug),
                self.describe(self.drivers[&plug])
            )));
        }
        let expected = self.plug_type(plug)?;
        if value.value_type() != expected {
            return Err(RigError::mismatch(
                self.describe(plug),
                expected,
                value.value_type(),
            ));
        }

        match plug {
            Plug::Attr(id) => {
                if let Some(attr) = self.attributes.get_mut(id) {
                    attr.value = attr.spec.clamp(value);
                }
            }
            Plug::Channel(node, channel) => {
                let local = &mut self.transforms.node_mut(node)?.local;
                match channel {
                    Channel::Translate => local.translation = value.as_vec3(),
                    Channel::Rotate => local.rotation = value.as_quat().normalize(),
                    Channel::Scale => local.scale = value.as_vec3(),
                    Channel::TranslateAxis(axis) => {
                        local.translation[axis.index()] = value.as_f32()
                    }
                    Channel::ScaleAxis(axis) => local.scale[axis.index()] = value.as_f32(),
                }
            }
            _ => unreachable!("writability checked above"),
        }
        self.cache.invalidate();
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            transforms: self.transforms.clone(),
            attributes: self.attributes.clone(),
            drivers: self.drivers.clone(),
            expressions: self.expressions.len(),
        }
    }

    /// Restores the scene to `checkpoint`. Everything created afterwards is
    /// dropped, along with connections, reparenting and rest edits.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.transforms = checkpoint.transforms;
        self.attributes = checkpoint.attributes;
        self.drivers = checkpoint.drivers;
        self.expressions.truncate(checkpoint.expressions);
        self.cache.invalidate();
    }

    /// Runs `build` and discards everything it did if it fails.
    pub fn transaction<T>(
        &mut self,
        build: impl FnOnce(&mut Self) -> RigResult<T>,
    ) -> RigResult<T> {
        let checkpoint = self.checkpoint();
        let result = build(self);
        if let Err(err) = &result {
            log::warn!("discarding partial build: {err}");
            self.rollback(checkpoint);
        }
        result
    }

    pub(crate) fn input_type(&self, input: &Input) -> RigResult<ValueType> {
        match input {
            Input::Plug(plug) => self.plug_type(*plug),
            Input::Const(value) => Ok(value.value_type()),
        }
    }

    pub(crate) fn push_expr(&mut self, op: ExprOp, inputs: Vec<Input>) -> RigResult<ExprId> {
        let types = inputs
            .iter()
            .map(|input| self.input_type(input))
            .collect::<RigResult<Vec<_>>>()?;
        let outputs = op.output_types(&types)?;
        let id = self.expressions.push(ExprNode {
            op,
            inputs,
            outputs,
        });
        log::trace!("expression {} #{}", op.name(), id.0);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::math::Axis;

    #[test]
    fn connections_have_fan_in_of_one() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let a = scene.add_attribute(node, AttributeSpec::float("a", 1.0)).unwrap();
        let b = scene.add_attribute(node, AttributeSpec::float("b", 2.0)).unwrap();
        let tx = Plug::Channel(node, Channel::TranslateAxis(Axis::X));

        scene.connect(a, tx).unwrap();
        let err = scene.connect(b, tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateConnection);
    }

    #[test]
    fn disconnect_frees_the_consumer() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let a = scene.add_attribute(node, AttributeSpec::float("a", 1.0)).unwrap();
        let b = scene.add_attribute(node, AttributeSpec::float("b", 2.0)).unwrap();
        let tx = Plug::Channel(node, Channel::TranslateAxis(Axis::X));

        scene.connect(a, tx).unwrap();
        assert_eq!(scene.disconnect(tx).unwrap(), a);
        scene.connect(b, tx).unwrap();
        assert_eq!(scene.local_transform(node).unwrap().translation.x, 2.0);

        let err = scene.disconnect(Plug::translate(node)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReference);
    }

    #[test]
    fn computed_plugs_are_read_only() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let err = scene
            .connect(Plug::WorldMatrix(node), Plug::WorldInverse(node))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyPlug);
    }

    #[test]
    fn connecting_incompatible_types_fails() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let err = scene
            .connect(Plug::WorldPosition(node), Plug::rotate(node))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AttributeTypeMismatch);
    }

    #[test]
    fn driven_attributes_reject_writes() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let a = scene.add_attribute(node, AttributeSpec::float("a", 1.0)).unwrap();
        let b = scene.add_attribute(node, AttributeSpec::float("b", 0.0)).unwrap();
        scene.connect(a, b).unwrap();
        let err = scene.set_attribute(b, 3.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyPlug);
    }

    #[test]
    fn unknown_nodes_are_missing_references() {
        let mut scene = Scene::new();
        let err = scene.create_transform("orphan", Some(NodeId(9))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingReference);
    }

    #[test]
    fn failed_transaction_restores_the_scene() {
        let mut scene = Scene::new();
        let node = scene.create_transform("node", None).unwrap();
        let a = scene.add_attribute(node, AttributeSpec::float("a", 1.0)).unwrap();
        let tx = Plug::Channel(node, Channel::TranslateAxis(Axis::X));
        scene.connect(a, tx).unwrap();
        let before = (
            scene.transforms().len(),
            scene.attributes().len(),
            scene.expressions().len(),
            scene.connection_count(),
        );

        let err = scene
            .transaction(|scene| {
                let child = scene.create_transform("child", Some(node))?;
                let b = scene.add_attribute(child, AttributeSpec::float("b", 4.0))?;
                let doubled = scene.multiply(b, 2.0)?;
                scene.connect(doubled, Plug::Channel(child, Channel::TranslateAxis(Axis::Y)))?;
                scene.set_translation(node, Vec3::Z)?;
                scene.connect(doubled, tx)
            })
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateConnection);
        let after = (
            scene.transforms().len(),
            scene.attributes().len(),
            scene.expressions().len(),
            scene.connection_count(),
        );
        assert_eq!(before, after);
        assert!(scene.children(node).is_empty());
        assert_eq!(scene.driver(tx), Some(a));
        assert_eq!(scene.local_transform(node).unwrap().translation, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn reparent_keeps_world_pose() {
        let mut scene = Scene::new();
        let a = scene
            .create_transform_with(
                "a",
                None,
                Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            )
            .unwrap();
        let b = scene
            .create_transform_at("b", None, Mat4::from_translation(Vec3::new(3.0, 2.0, 0.0)))
            .unwrap();

        scene.set_parent(b, Some(a), true).unwrap();
        assert_eq!(scene.parent(b), Some(a));
        assert!(scene
            .world_position(b)
            .unwrap()
            .abs_diff_eq(Vec3::new(3.0, 2.0, 0.0), 1e-5));
        assert!(scene
            .rest_transform(b)
            .unwrap()
            .translation
            .abs_diff_eq(Vec3::new(2.0, 2.0, 0.0), 1e-5));
    }
}
