use glam::{Mat4, Quat, Vec3};

use super::value::{Value, ValueType};
use crate::error::{RigError, RigResult};
use crate::math::{aim_basis, guard_denominator, two_bone_mid_position, Axis, EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
}

impl CompareOp {
    pub fn test(self, a: f32, b: f32) -> bool {
        match self {
            CompareOp::Equal => a == b,
            CompareOp::NotEqual => a != b,
            CompareOp::Greater => a > b,
            CompareOp::GreaterOrEqual => a >= b,
            CompareOp::Less => a < b,
            CompareOp::LessOrEqual => a <= b,
        }
    }
}

/// The pure function computed by an expression node.
///
/// Operand order is fixed per variant and documented on the matching
/// constructor in [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExprOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Clamp,
    Condition(CompareOp),
    Blend2,
    Distance,
    DecomposeMatrix,
    ComposeMatrix,
    MultiplyMatrix,
    InverseMatrix,
    /// `n` matrices followed by `n` float weights.
    AverageMatrix,
    TransformPoint,
    TransformVector,
    Component(Axis),
    ComposeVec3,
    Normalize,
    AxisAngle,
    QuatMultiply,
    /// Twist of a rotation about an axis, in degrees within [-180, 180].
    TwistAngle,
    /// from, to, world up vector, parent world matrix, local aim, local up.
    AimRotation,
    /// root, target, pole, upper length, lower length.
    TwoBoneIk,
}

use ValueType as T;

impl ExprOp {
    pub fn name(&self) -> &'static str {
        match self {
            ExprOp::Add => "add",
            ExprOp::Subtract => "subtract",
            ExprOp::Multiply => "multiply",
            ExprOp::Divide => "divide",
            ExprOp::Power => "power",
            ExprOp::Clamp => "clamp",
            ExprOp::Condition(_) => "condition",
            ExprOp::Blend2 => "blend2",
            ExprOp::Distance => "distance",
            ExprOp::DecomposeMatrix => "decompose_matrix",
            ExprOp::ComposeMatrix => "compose_matrix",
            ExprOp::MultiplyMatrix => "multiply_matrix",
            ExprOp::InverseMatrix => "inverse_matrix",
            ExprOp::AverageMatrix => "average_matrix",
            ExprOp::TransformPoint => "transform_point",
            ExprOp::TransformVector => "transform_vector",
            ExprOp::Component(_) => "component",
            ExprOp::ComposeVec3 => "compose_vec3",
            ExprOp::Normalize => "normalize",
            ExprOp::AxisAngle => "axis_angle",
            ExprOp::QuatMultiply => "quat_multiply",
            ExprOp::TwistAngle => "twist_angle",
            ExprOp::AimRotation => "aim_rotation",
            ExprOp::TwoBoneIk => "two_bone_ik",
        }
    }

    /// Checks operand types and returns the types of the node's outputs.
    pub fn output_types(&self, inputs: &[ValueType]) -> RigResult<Vec<ValueType>> {
        let name = self.name();
        let out = match self {
            ExprOp::Add => {
                let first = non_empty(name, inputs)?;
                numeric(name, first)?;
                all_same(name, first, inputs)?;
                first
            }
            ExprOp::Subtract => {
                arity(name, inputs, 2)?;
                numeric(name, inputs[0])?;
                all_same(name, inputs[0], inputs)?;
                inputs[0]
            }
            ExprOp::Multiply | ExprOp::Divide => {
                arity(name, inputs, 2)?;
                match (inputs[0], inputs[1]) {
                    (T::Float, T::Float) => T::Float,
                    (T::Vec3, T::Vec3) | (T::Vec3, T::Float) => T::Vec3,
                    (T::Float, T::Vec3) if *self == ExprOp::Multiply => T::Vec3,
                    (T::Float | T::Vec3, other) => {
                        return Err(RigError::mismatch(name, inputs[0], other))
                    }
                    (other, _) => return Err(RigError::mismatch(name, T::Float, other)),
                }
            }
            ExprOp::Power => {
                expect(name, inputs, &[T::Float, T::Float])?;
                T::Float
            }
            ExprOp::Clamp => {
                arity(name, inputs, 3)?;
                numeric(name, inputs[0])?;
                all_same(name, inputs[0], inputs)?;
                inputs[0]
            }
            ExprOp::Condition(_) => {
                arity(name, inputs, 4)?;
                for operand in &inputs[..2] {
                    if !matches!(operand, T::Float | T::Enum) {
                        return Err(RigError::mismatch(name, T::Float, *operand));
                    }
                }
                all_same(name, inputs[2], &inputs[2..])?;
                inputs[2]
            }
            ExprOp::Blend2 => {
                arity(name, inputs, 3)?;
                match inputs[0] {
                    T::Float | T::Vec3 | T::Quat => {}
                    other => return Err(RigError::mismatch(name, T::Float, other)),
                }
                all_same(name, inputs[0], &inputs[..2])?;
                expect(name, &inputs[2..], &[T::Float])?;
                inputs[0]
            }
            ExprOp::Distance => {
                arity(name, inputs, 2)?;
                match inputs[0] {
                    T::Vec3 | T::Matrix => {}
                    other => return Err(RigError::mismatch(name, T::Vec3, other)),
                }
                all_same(name, inputs[0], inputs)?;
                T::Float
            }
            ExprOp::DecomposeMatrix => {
                expect(name, inputs, &[T::Matrix])?;
                return Ok(vec![T::Vec3, T::Quat, T::Vec3]);
            }
            ExprOp::ComposeMatrix => {
                expect(name, inputs, &[T::Vec3, T::Quat, T::Vec3])?;
                T::Matrix
            }
            ExprOp::MultiplyMatrix => {
                non_empty(name, inputs)?;
                all_same(name, T::Matrix, inputs)?;
                T::Matrix
            }
            ExprOp::InverseMatrix => {
                expect(name, inputs, &[T::Matrix])?;
                T::Matrix
            }
            ExprOp::AverageMatrix => {
                non_empty(name, inputs)?;
                if inputs.len() % 2 != 0 {
                    return Err(RigError::invalid(
                        name,
                        "expected one weight per matrix",
                    ));
                }
                let (matrices, weights) = inputs.split_at(inputs.len() / 2);
                all_same(name, T::Matrix, matrices)?;
                all_same(name, T::Float, weights)?;
                T::Matrix
            }
            ExprOp::TransformPoint | ExprOp::TransformVector => {
                expect(name, inputs, &[T::Matrix, T::Vec3])?;
                T::Vec3
            }
            ExprOp::Component(_) => {
                expect(name, inputs, &[T::Vec3])?;
                T::Float
            }
            ExprOp::ComposeVec3 => {
                expect(name, inputs, &[T::Float, T::Float, T::Float])?;
                T::Vec3
            }
            ExprOp::Normalize => {
                expect(name, inputs, &[T::Vec3])?;
                T::Vec3
            }
            ExprOp::AxisAngle => {
                expect(name, inputs, &[T::Vec3, T::Float])?;
                T::Quat
            }
            ExprOp::QuatMultiply => {
                expect(name, inputs, &[T::Quat, T::Quat])?;
                T::Quat
            }
            ExprOp::TwistAngle => {
                expect(name, inputs, &[T::Quat, T::Vec3])?;
                T::Float
            }
            ExprOp::AimRotation => {
                expect(
                    name,
                    inputs,
                    &[T::Vec3, T::Vec3, T::Vec3, T::Matrix, T::Vec3, T::Vec3],
                )?;
                T::Quat
            }
            ExprOp::TwoBoneIk => {
                expect(
                    name,
                    inputs,
                    &[T::Vec3, T::Vec3, T::Vec3, T::Float, T::Float],
                )?;
                return Ok(vec![T::Vec3, T::Vec3]);
            }
        };
        Ok(vec![out])
    }

    /// Evaluates the node. Never fails: denominators are epsilon-guarded
    /// and non-finite results collapse to a neutral value.
    pub fn evaluate(&self, inputs: &[Value]) -> Vec<Value> {
        let out = match self {
            ExprOp::Add => match inputs.first() {
                Some(Value::Vec3(_)) => Value::Vec3(inputs.iter().map(Value::as_vec3).sum()),
                _ => Value::Float(inputs.iter().map(Value::as_f32).sum()),
            },
            ExprOp::Subtract => match inputs[0] {
                Value::Vec3(a) => Value::Vec3(a - inputs[1].as_vec3()),
                a => Value::Float(a.as_f32() - inputs[1].as_f32()),
            },
            ExprOp::Multiply => match (inputs[0], inputs[1]) {
                (Value::Float(a), Value::Float(b)) => Value::Float(a * b),
                (a, b) => Value::Vec3(a.as_vec3() * b.as_vec3()),
            },
            ExprOp::Divide => match (inputs[0], inputs[1]) {
                (Value::Float(a), Value::Float(b)) => Value::Float(a / guard_denominator(b)),
                (a, b) => {
                    let d = b.as_vec3();
                    Value::Vec3(
                        a.as_vec3()
                            / Vec3::new(
                                guard_denominator(d.x),
                                guard_denominator(d.y),
                                guard_denominator(d.z),
                            ),
                    )
                }
            },
            ExprOp::Power => {
                let result = inputs[0].as_f32().powf(inputs[1].as_f32());
                Value::Float(if result.is_finite() { result } else { 0.0 })
            }
            ExprOp::Clamp => match inputs[0] {
                Value::Vec3(v) => {
                    let (lo, hi) = (inputs[1].as_vec3(), inputs[2].as_vec3());
                    Value::Vec3(v.max(lo).min(hi))
                }
                v => {
                    let (lo, hi) = (inputs[1].as_f32(), inputs[2].as_f32());
                    Value::Float(v.as_f32().max(lo).min(hi))
                }
            },
            ExprOp::Condition(op) => {
                if op.test(inputs[0].as_f32(), inputs[1].as_f32()) {
                    inputs[2]
                } else {
                    inputs[3]
                }
            }
            ExprOp::Blend2 => {
                let ratio = inputs[2].as_f32();
                match inputs[0] {
                    Value::Vec3(a) => Value::Vec3(a.lerp(inputs[1].as_vec3(), ratio)),
                    Value::Quat(a) => Value::Quat(a.slerp(inputs[1].as_quat(), ratio)),
                    a => {
                        let a = a.as_f32();
                        Value::Float(a + (inputs[1].as_f32() - a) * ratio)
                    }
                }
            }
            ExprOp::Distance => Value::Float(inputs[0].as_vec3().distance(inputs[1].as_vec3())),
            ExprOp::DecomposeMatrix => {
                let (scale, rotation, translation) =
                    inputs[0].as_mat4().to_scale_rotation_translation();
                return vec![
                    Value::Vec3(translation),
                    Value::Quat(rotation.normalize()),
                    Value::Vec3(scale),
                ];
            }
            ExprOp::ComposeMatrix => Value::Matrix(Mat4::from_scale_rotation_translation(
                inputs[2].as_vec3(),
                inputs[1].as_quat().normalize(),
                inputs[0].as_vec3(),
            )),
            ExprOp::MultiplyMatrix => Value::Matrix(
                inputs
                    .iter()
                    .fold(Mat4::IDENTITY, |acc, m| acc * m.as_mat4()),
            ),
            ExprOp::InverseMatrix => Value::Matrix(safe_inverse(inputs[0].as_mat4())),
            ExprOp::AverageMatrix => {
                let (matrices, weights) = inputs.split_at(inputs.len() / 2);
                Value::Matrix(average_matrices(
                    matrices.iter().map(Value::as_mat4),
                    weights.iter().map(Value::as_f32),
                ))
            }
            ExprOp::TransformPoint => {
                Value::Vec3(inputs[0].as_mat4().transform_point3(inputs[1].as_vec3()))
            }
            ExprOp::TransformVector => {
                Value::Vec3(inputs[0].as_mat4().transform_vector3(inputs[1].as_vec3()))
            }
            ExprOp::Component(axis) => Value::Float(inputs[0].as_vec3()[axis.index()]),
            ExprOp::ComposeVec3 => Value::Vec3(Vec3::new(
                inputs[0].as_f32(),
                inputs[1].as_f32(),
                inputs[2].as_f32(),
            )),
            ExprOp::Normalize => Value::Vec3(inputs[0].as_vec3().normalize_or_zero()),
            ExprOp::AxisAngle => {
                let axis = inputs[0].as_vec3().normalize_or_zero();
                if axis == Vec3::ZERO {
                    Value::Quat(Quat::IDENTITY)
                } else {
                    Value::Quat(Quat::from_axis_angle(axis, inputs[1].as_f32().to_radians()))
                }
            }
            ExprOp::QuatMultiply => {
                Value::Quat((inputs[0].as_quat() * inputs[1].as_quat()).normalize())
            }
            ExprOp::TwistAngle => {
                Value::Float(twist_degrees(inputs[0].as_quat(), inputs[1].as_vec3()))
            }
            ExprOp::AimRotation => {
                let from = inputs[0].as_vec3();
                let to = inputs[1].as_vec3();
                let world = aim_basis(
                    to - from,
                    inputs[2].as_vec3(),
                    inputs[4].as_vec3(),
                    inputs[5].as_vec3(),
                );
                let parent = inputs[3].as_mat4().to_scale_rotation_translation().1;
                Value::Quat((parent.inverse() * world).normalize())
            }
            ExprOp::TwoBoneIk => {
                let solution = two_bone_mid_position(
                    inputs[0].as_vec3(),
                    inputs[1].as_vec3(),
                    inputs[2].as_vec3(),
                    inputs[3].as_f32(),
                    inputs[4].as_f32(),
                );
                return vec![Value::Vec3(solution.mid), Value::Vec3(solution.end)];
            }
        };
        vec![out]
    }
}

/// Swing-twist split: angle of the part of `rotation` that turns about
/// `axis`.
pub fn twist_degrees(rotation: Quat, axis: Vec3) -> f32 {
    let axis = axis.normalize_or_zero();
    let rotation = rotation.normalize();
    let (projected, w) = (Vec3::new(rotation.x, rotation.y, rotation.z).dot(axis), rotation.w);
    let (projected, w) = if w < 0.0 { (-projected, -w) } else { (projected, w) };
    (2.0 * projected.atan2(w)).to_degrees()
}

/// Inverse that falls back to identity for singular matrices.
pub fn safe_inverse(m: Mat4) -> Mat4 {
    if m.determinant().abs() < EPSILON * EPSILON {
        Mat4::IDENTITY
    } else {
        m.inverse()
    }
}

/// Weighted blend of decomposed matrices.
///
/// Translation and scale are averaged linearly, rotation by a normalized
/// weighted quaternion sum aligned to the first rotation's hemisphere.
/// Rotations roughly 180° apart can pop; that limitation is accepted.
pub fn average_matrices(
    matrices: impl IntoIterator<Item = Mat4>,
    weights: impl IntoIterator<Item = f32>,
) -> Mat4 {
    let mut total = 0.0;
    let mut translation = Vec3::ZERO;
    let mut scale = Vec3::ZERO;
    let mut rotation = glam::Vec4::ZERO;
    let mut first: Option<(Vec3, Quat, Vec3)> = None;

    for (m, w) in matrices.into_iter().zip(weights) {
        let (s, r, t) = m.to_scale_rotation_translation();
        let reference = first.get_or_insert((s, r, t)).1;
        let aligned = if r.dot(reference) < 0.0 { -r } else { r };
        total += w;
        translation += t * w;
        scale += s * w;
        rotation += glam::Vec4::from(aligned) * w;
    }

    let Some((s0, r0, t0)) = first else {
        return Mat4::IDENTITY;
    };
    if total.abs() < EPSILON {
        return Mat4::from_scale_rotation_translation(s0, r0, t0);
    }

    let rotation = if rotation.length_squared() < EPSILON {
        r0
    } else {
        Quat::from_vec4(rotation).normalize()
    };
    Mat4::from_scale_rotation_translation(scale / total, rotation, translation / total)
}

fn arity(name: &str, inputs: &[ValueType], expected: usize) -> RigResult<()> {
    if inputs.len() != expected {
        return Err(RigError::invalid(
            name,
            format!("expected {expected} operands, got {}", inputs.len()),
        ));
    }
    Ok(())
}

fn non_empty(name: &str, inputs: &[ValueType]) -> RigResult<ValueType> {
    inputs
        .first()
        .copied()
        .ok_or_else(|| RigError::invalid(name, "operand list is empty"))
}

fn numeric(name: &str, ty: ValueType) -> RigResult<()> {
    match ty {
        T::Float | T::Vec3 => Ok(()),
        other => Err(RigError::mismatch(name, T::Float, other)),
    }
}

fn all_same(name: &str, expected: ValueType, inputs: &[ValueType]) -> RigResult<()> {
    match inputs.iter().find(|ty| **ty != expected) {
        Some(found) => Err(RigError::mismatch(name, expected, *found)),
        None => Ok(()),
    }
}

fn expect(name: &str, inputs: &[ValueType], expected: &[ValueType]) -> RigResult<()> {
    arity(name, inputs, expected.len())?;
    for (found, wanted) in inputs.iter().zip(expected) {
        if found != wanted {
            return Err(RigError::mismatch(name, *wanted, *found));
        }
    }
    Ok(())
}
