use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use super::plug::{Channel, Plug};
use super::Scene;
use crate::error::RigResult;
use crate::expr::{safe_inverse, Input, Value};
use crate::id::{ExprId, NodeId};
use crate::math::{Axis, Transform};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    pub expression_evaluations: u64,
    pub cache_hits: u64,
}

/// Memoized values for the current generation. Any write to the scene
/// starts a new generation.
#[derive(Debug, Default)]
pub(super) struct EvalCache {
    locals: HashMap<NodeId, Transform>,
    worlds: HashMap<NodeId, Mat4>,
    outputs: HashMap<ExprId, Vec<Value>>,
    generation: u64,
    stats: EvalStats,
}

impl EvalCache {
    pub(super) fn invalidate(&mut self) {
        self.locals.clear();
        self.worlds.clear();
        self.outputs.clear();
        self.generation += 1;
    }
}

impl Scene {
    pub fn evaluate(&mut self, plug: Plug) -> RigResult<Value> {
        self.plug_type(plug)?;
        Ok(self.eval_plug(plug))
    }

    pub fn evaluate_f32(&mut self, plug: Plug) -> RigResult<f32> {
        Ok(self.evaluate(plug)?.as_f32())
    }

    pub fn evaluate_vec3(&mut self, plug: Plug) -> RigResult<Vec3> {
        Ok(self.evaluate(plug)?.as_vec3())
    }

    pub fn world_matrix(&mut self, node: NodeId) -> RigResult<Mat4> {
        self.transforms.get(node)?;
        Ok(self.eval_world(node))
    }

    pub fn world_position(&mut self, node: NodeId) -> RigResult<Vec3> {
        self.transforms.get(node)?;
        Ok(self.eval_position(node))
    }

    pub fn world_transform(&mut self, node: NodeId) -> RigResult<Transform> {
        Ok(Transform::from_matrix(self.world_matrix(node)?))
    }

    /// Local transform after drivers are applied.
    pub fn local_transform(&mut self, node: NodeId) -> RigResult<Transform> {
        self.transforms.get(node)?;
        Ok(self.eval_local(node))
    }

    /// Drops every memoized value. Call once per frame when inputs are
    /// changed behind the scene's back; writes through the scene already
    /// invalidate.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn generation(&self) -> u64 {
        self.cache.generation
    }

    pub fn stats(&self) -> EvalStats {
        self.cache.stats
    }

    pub(crate) fn eval_plug(&mut self, plug: Plug) -> Value {
        match plug {
            Plug::Output { node, index } => self.eval_output(node, index as usize),
            Plug::Attr(id) => match self.driver(plug) {
                Some(src) => self.eval_plug(src),
                None => self
                    .attributes
                    .get(id)
                    .map(|a| a.value)
                    .unwrap_or_default(),
            },
            Plug::Channel(node, channel) => match channel {
                Channel::Translate => Value::Vec3(self.eval_translation(node)),
                Channel::Rotate => Value::Quat(self.eval_rotation(node)),
                Channel::Scale => Value::Vec3(self.eval_scale(node)),
                Channel::TranslateAxis(axis) => {
                    Value::Float(self.eval_translation(node)[axis.index()])
                }
                Channel::ScaleAxis(axis) => Value::Float(self.eval_scale(node)[axis.index()]),
            },
            Plug::WorldMatrix(node) => Value::Matrix(self.eval_world(node)),
            Plug::WorldInverse(node) => Value::Matrix(safe_inverse(self.eval_world(node))),
            Plug::ParentMatrix(node) => Value::Matrix(self.eval_parent_world(node)),
            Plug::ParentInverse(node) => {
                Value::Matrix(safe_inverse(self.eval_parent_world(node)))
            }
            Plug::WorldPosition(node) => Value::Vec3(self.eval_position(node)),
        }
    }

    fn eval_input(&mut self, input: Input) -> Value {
        match input {
            Input::Plug(plug) => self.eval_plug(plug),
            Input::Const(value) => value,
        }
    }

    fn eval_output(&mut self, id: ExprId, index: usize) -> Value {
        if let Some(outputs) = self.cache.outputs.get(&id) {
            self.cache.stats.cache_hits += 1;
            return outputs.get(index).copied().unwrap_or_default();
        }
        let Some(node) = self.expressions.node(id) else {
            return Value::default();
        };
        let op = node.op;
        let inputs = node.inputs.clone();

        let values: Vec<Value> = inputs.into_iter().map(|i| self.eval_input(i)).collect();
        let outputs = op.evaluate(&values);
        self.cache.stats.expression_evaluations += 1;

        let value = outputs.get(index).copied().unwrap_or_default();
        self.cache.outputs.insert(id, outputs);
        value
    }

    fn driven(&mut self, node: NodeId, channel: Channel) -> Option<Value> {
        let src = self.driver(Plug::Channel(node, channel))?;
        Some(self.eval_plug(src))
    }

    fn rest(&self, node: NodeId) -> Transform {
        self.transforms
            .node(node)
            .map(|n| n.local)
            .unwrap_or_default()
    }

    fn eval_translation(&mut self, node: NodeId) -> Vec3 {
        if let Some(local) = self.cache.locals.get(&node) {
            return local.translation;
        }
        let mut translation = match self.driven(node, Channel::Translate) {
            Some(value) => value.as_vec3(),
            None => self.rest(node).translation,
        };
        for axis in Axis::ALL {
            if let Some(value) = self.driven(node, Channel::TranslateAxis(axis)) {
                translation[axis.index()] = value.as_f32();
            }
        }
        translation
    }

    fn eval_rotation(&mut self, node: NodeId) -> Quat {
        if let Some(local) = self.cache.locals.get(&node) {
            return local.rotation;
        }
        match self.driven(node, Channel::Rotate) {
            Some(value) => value.as_quat().normalize(),
            None => self.rest(node).rotation,
        }
    }

    fn eval_scale(&mut self, node: NodeId) -> Vec3 {
        if let Some(local) = self.cache.locals.get(&node) {
            return local.scale;
        }
        let mut scale = match self.driven(node, Channel::Scale) {
            Some(value) => value.as_vec3(),
            None => self.rest(node).scale,
        };
        for axis in Axis::ALL {
            if let Some(value) = self.driven(node, Channel::ScaleAxis(axis)) {
                scale[axis.index()] = value.as_f32();
            }
        }
        scale
    }

    fn eval_local(&mut self, node: NodeId) -> Transform {
        if let Some(local) = self.cache.locals.get(&node) {
            return *local;
        }
        let local = Transform::new(
            self.eval_translation(node),
            self.eval_rotation(node),
            self.eval_scale(node),
        );
        self.cache.locals.insert(node, local);
        local
    }

    pub(super) fn eval_parent_world(&mut self, node: NodeId) -> Mat4 {
        match self.parent(node) {
            Some(parent) => self.eval_world(parent),
            None => Mat4::IDENTITY,
        }
    }

    pub(super) fn eval_world(&mut self, node: NodeId) -> Mat4 {
        if let Some(world) = self.cache.worlds.get(&node) {
            return *world;
        }
        let local = self.eval_local(node).to_matrix();
        let world = self.eval_parent_world(node) * local;
        self.cache.worlds.insert(node, world);
        world
    }

    fn eval_position(&mut self, node: NodeId) -> Vec3 {
        let translation = self.eval_translation(node);
        self.eval_parent_world(node).transform_point3(translation)
    }
}
