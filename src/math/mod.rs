//! Math utilities module
//!
//! Provides convenient re-exports from glam plus the rig-specific helpers:
//! local transforms, signed axes and the aim basis shared by the orientation
//! solver and the live aim node.

mod axis;
mod basis;
mod transform;
mod two_bone;

pub use axis::{Axis, Sign};
pub use basis::{aim_basis, is_orthonormal, AIM_EPSILON};
pub use transform::Transform;
pub use two_bone::{two_bone_mid_position, TwoBoneSolution};

// Re-export commonly used glam types
pub use glam::{Mat3, Mat4, Quat, Vec3};

/// Smallest magnitude a live denominator is allowed to reach.
pub const EPSILON: f32 = 1.0e-5;

/// Replaces a near-zero denominator with a signed epsilon so per-frame
/// divisions never produce infinities.
pub fn guard_denominator(value: f32) -> f32 {
    if value.abs() < EPSILON {
        if value.is_sign_negative() {
            -EPSILON
        } else {
            EPSILON
        }
    } else {
        value
    }
}
