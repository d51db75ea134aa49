use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The axis carrying the largest component of `v`, with that component's sign.
    pub fn dominant(v: Vec3) -> (Axis, Sign) {
        let abs = v.abs();
        let axis = if abs.x >= abs.y && abs.x >= abs.z {
            Axis::X
        } else if abs.y >= abs.z {
            Axis::Y
        } else {
            Axis::Z
        };
        (axis, Sign::of(v[axis.index()]))
    }
}

/// Mirror multiplier applied to axis vectors, `+1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sign {
    #[default]
    Positive,
    Negative,
}

impl Sign {
    pub fn of(value: f32) -> Self {
        if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    pub fn factor(self) -> f32 {
        match self {
            Sign::Positive => 1.0,
            Sign::Negative => -1.0,
        }
    }

    pub fn apply(self, v: Vec3) -> Vec3 {
        v * self.factor()
    }
}
