//! Blend module
//!
//! Weighted switching between two transform sources, used for FK/IK
//! blending, pole-vector pinning and ribbon rail placement.

mod switch;

pub use switch::{matrix_switch, Switch, SwitchChannels};
