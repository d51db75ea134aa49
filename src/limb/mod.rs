//! Limb module
//!
//! Consumer of the lower-level solvers: turns three guide positions into a
//! complete FK/IK limb with stretch, pole pinning and optional ribbons.

mod assembler;
mod guide;

pub use assembler::{LimbAssembler, LimbAttributes, LimbConfig, LimbControls, LimbRig};
pub use guide::{GuideAxes, GuideInput, Side};
