//! # rig-graph
//!
//! A procedural deformation graph for character rigs: joint hierarchies,
//! IK/FK solvers and a dependency graph of small math nodes, so that a
//! handful of controllers drive a full deformation skeleton.
//!
//! ## Features
//! - Transform hierarchy with typed attributes and single-driver connections
//! - Pull-based, memoized expression graph with build-time cycle detection
//! - Chain orientation from reference positions, mirror aware
//! - Stretch, squash and soft IK wired as live graph nodes
//! - Matrix switches for FK/IK blending and pole pinning
//! - Volume-preserving ribbons with regular or infinite twist
//!
//! ## Example
//! ```rust,ignore
//! use rig_graph::limb::{GuideInput, LimbAssembler, LimbConfig, Side};
//! use rig_graph::scene::Scene;
//! use glam::Vec3;
//!
//! let mut scene = Scene::new();
//! let guide = GuideInput::new(
//!     vec![Vec3::ZERO, Vec3::new(5.0, 0.0, -1.0), Vec3::new(10.0, 0.0, 0.0)],
//!     Side::Left,
//! );
//! let arm = LimbAssembler::build(&mut scene, &guide, &LimbConfig::new("arm"))?;
//!
//! // Switch to IK and pull the hand past full extension
//! scene.set_attribute(arm.attributes.fk_ik, 1.0)?;
//! scene.set_translation(arm.controls.ik_end, Vec3::new(12.0, 0.0, 0.0))?;
//! let wrist = scene.world_position(arm.deform.end())?;
//! ```

pub mod blend;
pub mod error;
pub mod expr;
pub mod id;
pub mod ik;
pub mod limb;
pub mod math;
pub mod ribbon;
pub mod scene;

pub use blend::{matrix_switch, Switch, SwitchChannels};
pub use error::{ErrorKind, RigError, RigResult};
pub use expr::{CompareOp, Input, Value, ValueType};
pub use id::{AttrId, ExprId, NodeId};
pub use ik::{
    Chain, ChainBuilder, OrientAxes, OrientationSolver, SoftIkState, StretchRig, StretchSettings,
    StretchSolver,
};
pub use limb::{GuideAxes, GuideInput, LimbAssembler, LimbConfig, LimbRig, Side};
pub use math::{Axis, Sign, Transform};
pub use ribbon::{RibbonConfig, RibbonDeformer, RibbonRig, StripProvider, TwistMode};
pub use scene::{AttributeSpec, Plug, Scene, SceneAdapter};
