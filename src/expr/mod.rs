//! Expression graph module
//!
//! A small library of pure dataflow nodes (arithmetic, clamp, condition,
//! blend, matrix compose/decompose, aim and two-bone solves) wired between
//! transform channels and attributes. Node constructors live on
//! [`Scene`](crate::scene::Scene) because operand types are resolved
//! against the whole scene.

mod build;
mod graph;
mod op;
mod value;

pub use build::{Decomposed, TwoBoneOutputs};
pub use graph::{ExprNode, ExpressionGraph};
pub use op::{average_matrices, safe_inverse, twist_degrees, CompareOp, ExprOp};
pub use value::{Input, Value, ValueType};
