//! Inverse Kinematics module
//!
//! Joint chains plus the two build-time solvers that prepare them for
//! animation: orientation from reference positions, and the stretch and
//! soft IK network that feeds live segment lengths to the joints.

pub mod chain;
pub mod orient;
pub mod stretch;

pub use chain::{Chain, ChainBuilder};
pub use orient::{OrientAxes, OrientationSolver};
pub use stretch::{SoftIkState, StretchRig, StretchSettings, StretchSolver};
