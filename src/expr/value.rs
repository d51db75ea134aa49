use glam::{Mat4, Quat, Vec3};

use crate::scene::Plug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Float,
    Vec3,
    Quat,
    Matrix,
    Bool,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Float(f32),
    Vec3(Vec3),
    Quat(Quat),
    Matrix(Mat4),
    Bool(bool),
    /// Index into a closed list of choices.
    Enum(u32),
}

impl Default for Value {
    fn default() -> Self {
        Self::Float(0.0)
    }
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Float(_) => ValueType::Float,
            Value::Vec3(_) => ValueType::Vec3,
            Value::Quat(_) => ValueType::Quat,
            Value::Matrix(_) => ValueType::Matrix,
            Value::Bool(_) => ValueType::Bool,
            Value::Enum(_) => ValueType::Enum,
        }
    }

    // The accessors below coerce instead of failing: operand types are
    // checked when a node is built, so evaluation only ever sees the
    // expected variant.

    pub fn as_f32(&self) -> f32 {
        match self {
            Value::Float(f) => *f,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Enum(e) => *e as f32,
            Value::Vec3(v) => v.x,
            Value::Quat(_) | Value::Matrix(_) => 0.0,
        }
    }

    pub fn as_vec3(&self) -> Vec3 {
        match self {
            Value::Vec3(v) => *v,
            Value::Matrix(m) => m.w_axis.truncate(),
            Value::Float(_) | Value::Bool(_) | Value::Enum(_) => Vec3::splat(self.as_f32()),
            Value::Quat(_) => Vec3::ZERO,
        }
    }

    pub fn as_quat(&self) -> Quat {
        match self {
            Value::Quat(q) => *q,
            Value::Matrix(m) => m.to_scale_rotation_translation().1,
            _ => Quat::IDENTITY,
        }
    }

    pub fn as_mat4(&self) -> Mat4 {
        match self {
            Value::Matrix(m) => *m,
            Value::Vec3(v) => Mat4::from_translation(*v),
            Value::Quat(q) => Mat4::from_quat(*q),
            _ => Mat4::IDENTITY,
        }
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Value::Vec3(value)
    }
}

impl From<Quat> for Value {
    fn from(value: Quat) -> Self {
        Value::Quat(value)
    }
}

impl From<Mat4> for Value {
    fn from(value: Mat4) -> Self {
        Value::Matrix(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Operand of an expression node: another plug or a baked constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    Plug(Plug),
    Const(Value),
}

impl Input {
    pub fn plug(&self) -> Option<Plug> {
        match self {
            Input::Plug(plug) => Some(*plug),
            Input::Const(_) => None,
        }
    }
}

impl From<Plug> for Input {
    fn from(value: Plug) -> Self {
        Input::Plug(value)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Const(value)
    }
}

macro_rules! impl_const_input {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Input {
                fn from(value: $ty) -> Self {
                    Input::Const(Value::from(value))
                }
            }
        )*
    };
}

impl_const_input!(f32, Vec3, Quat, Mat4, bool);
