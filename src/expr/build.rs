use glam::Vec3;

use super::op::{CompareOp, ExprOp};
use super::value::Input;
use crate::error::{RigError, RigResult};
use crate::id::ExprId;
use crate::math::Axis;
use crate::scene::{Plug, Scene};

/// Outputs of a `decompose_matrix` node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub translate: Plug,
    pub rotate: Plug,
    pub scale: Plug,
}

/// Outputs of a `two_bone_ik` node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBoneOutputs {
    pub mid: Plug,
    pub end: Plug,
}

fn output(node: ExprId, index: u8) -> Plug {
    Plug::Output { node, index }
}

impl Scene {
    fn single(&mut self, op: ExprOp, inputs: Vec<Input>) -> RigResult<Plug> {
        let id = self.push_expr(op, inputs)?;
        Ok(output(id, 0))
    }

    /// Sum of one or more floats or vectors.
    pub fn add(&mut self, operands: impl IntoIterator<Item = Input>) -> RigResult<Plug> {
        self.single(ExprOp::Add, operands.into_iter().collect())
    }

    pub fn subtract(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Subtract, vec![a.into(), b.into()])
    }

    pub fn multiply(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Multiply, vec![a.into(), b.into()])
    }

    /// `a / b`. A denominator that reaches zero is replaced by a signed
    /// epsilon at evaluation time.
    pub fn divide(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Divide, vec![a.into(), b.into()])
    }

    pub fn power(&mut self, base: impl Into<Input>, exponent: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Power, vec![base.into(), exponent.into()])
    }

    pub fn clamp(
        &mut self,
        value: impl Into<Input>,
        min: impl Into<Input>,
        max: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::Clamp, vec![value.into(), min.into(), max.into()])
    }

    /// `if a <op> b { if_true } else { if_false }`.
    pub fn condition(
        &mut self,
        a: impl Into<Input>,
        op: CompareOp,
        b: impl Into<Input>,
        if_true: impl Into<Input>,
        if_false: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(
            ExprOp::Condition(op),
            vec![a.into(), b.into(), if_true.into(), if_false.into()],
        )
    }

    pub fn minimum(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        let (a, b) = (a.into(), b.into());
        self.condition(a, CompareOp::Less, b, a, b)
    }

    pub fn maximum(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        let (a, b) = (a.into(), b.into());
        self.condition(a, CompareOp::Greater, b, a, b)
    }

    /// Linear interpolation from `a` (ratio 0) to `b` (ratio 1). Quaternions
    /// are slerped.
    pub fn blend2(
        &mut self,
        a: impl Into<Input>,
        b: impl Into<Input>,
        ratio: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::Blend2, vec![a.into(), b.into(), ratio.into()])
    }

    /// `1 - weight`, the lock-step partner of a switch weight.
    pub fn reverse(&mut self, weight: impl Into<Input>) -> RigResult<Plug> {
        self.subtract(1.0, weight)
    }

    pub fn distance(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Distance, vec![a.into(), b.into()])
    }

    pub fn decompose_matrix(&mut self, matrix: impl Into<Input>) -> RigResult<Decomposed> {
        let id = self.push_expr(ExprOp::DecomposeMatrix, vec![matrix.into()])?;
        Ok(Decomposed {
            translate: output(id, 0),
            rotate: output(id, 1),
            scale: output(id, 2),
        })
    }

    pub fn compose_matrix(
        &mut self,
        translate: impl Into<Input>,
        rotate: impl Into<Input>,
        scale: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(
            ExprOp::ComposeMatrix,
            vec![translate.into(), rotate.into(), scale.into()],
        )
    }

    /// Product in listed order, `list[0] * list[1] * ...`; the last matrix
    /// is applied to points first.
    pub fn multiply_matrix(
        &mut self,
        matrices: impl IntoIterator<Item = Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::MultiplyMatrix, matrices.into_iter().collect())
    }

    pub fn inverse_matrix(&mut self, matrix: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::InverseMatrix, vec![matrix.into()])
    }

    pub fn average_matrix(
        &mut self,
        matrices: impl IntoIterator<Item = Input>,
        weights: impl IntoIterator<Item = Input>,
    ) -> RigResult<Plug> {
        let mut inputs: Vec<Input> = matrices.into_iter().collect();
        let weights: Vec<Input> = weights.into_iter().collect();
        if inputs.len() != weights.len() {
            return Err(RigError::invalid(
                "average_matrix",
                format!("{} matrices but {} weights", inputs.len(), weights.len()),
            ));
        }
        inputs.extend(weights);
        self.single(ExprOp::AverageMatrix, inputs)
    }

    pub fn transform_point(
        &mut self,
        matrix: impl Into<Input>,
        point: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::TransformPoint, vec![matrix.into(), point.into()])
    }

    pub fn transform_vector(
        &mut self,
        matrix: impl Into<Input>,
        vector: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::TransformVector, vec![matrix.into(), vector.into()])
    }

    pub fn component(&mut self, vector: impl Into<Input>, axis: Axis) -> RigResult<Plug> {
        self.single(ExprOp::Component(axis), vec![vector.into()])
    }

    pub fn compose_vec3(
        &mut self,
        x: impl Into<Input>,
        y: impl Into<Input>,
        z: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::ComposeVec3, vec![x.into(), y.into(), z.into()])
    }

    pub fn normalize(&mut self, vector: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::Normalize, vec![vector.into()])
    }

    /// Rotation of `degrees` about `axis`.
    pub fn axis_angle(
        &mut self,
        axis: impl Into<Input>,
        degrees: impl Into<Input>,
    ) -> RigResult<Plug> {
        self.single(ExprOp::AxisAngle, vec![axis.into(), degrees.into()])
    }

    pub fn quat_multiply(&mut self, a: impl Into<Input>, b: impl Into<Input>) -> RigResult<Plug> {
        self.single(ExprOp::QuatMultiply, vec![a.into(), b.into()])
    }

    /// Degrees `rotation` turns about `axis`, swing removed.
    pub fn twist_angle(&mut self, rotation: impl Into<Input>, axis: Vec3) -> RigResult<Plug> {
        self.single(ExprOp::TwistAngle, vec![rotation.into(), axis.into()])
    }

    /// Local rotation aiming `local_aim` from `from` to `to`, with
    /// `local_up` kept toward the world-space `up` vector, expressed in the
    /// space of `parent_world`.
    pub fn aim_rotation(
        &mut self,
        from: impl Into<Input>,
        to: impl Into<Input>,
        up: impl Into<Input>,
        parent_world: impl Into<Input>,
        local_aim: Vec3,
        local_up: Vec3,
    ) -> RigResult<Plug> {
        self.single(
            ExprOp::AimRotation,
            vec![
                from.into(),
                to.into(),
                up.into(),
                parent_world.into(),
                local_aim.into(),
                local_up.into(),
            ],
        )
    }

    pub fn two_bone_ik(
        &mut self,
        root: impl Into<Input>,
        target: impl Into<Input>,
        pole: impl Into<Input>,
        upper: impl Into<Input>,
        lower: impl Into<Input>,
    ) -> RigResult<TwoBoneOutputs> {
        let id = self.push_expr(
            ExprOp::TwoBoneIk,
            vec![
                root.into(),
                target.into(),
                pole.into(),
                upper.into(),
                lower.into(),
            ],
        )?;
        Ok(TwoBoneOutputs {
            mid: output(id, 0),
            end: output(id, 1),
        })
    }
}
