use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};
use crate::ik::OrientAxes;
use crate::math::{Axis, Sign};

/// Which side of the character a component sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    Left,
    Right,
    Center,
}

impl Side {
    /// Axis multiplier for this side. Right-side components mirror.
    pub fn sign(self) -> Sign {
        match self {
            Side::Right => Sign::Negative,
            Side::Left | Side::Center => Sign::Positive,
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
            Side::Center => "C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideAxes {
    pub aim: Axis,
    pub up: Axis,
    pub world_up: Vec3,
}

impl Default for GuideAxes {
    fn default() -> Self {
        Self {
            aim: Axis::X,
            up: Axis::Y,
            world_up: Vec3::Y,
        }
    }
}

/// Reference positions and axis convention for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideInput {
    pub positions: Vec<Vec3>,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub axes: GuideAxes,
}

impl GuideInput {
    pub fn new(positions: Vec<Vec3>, side: Side) -> Self {
        Self {
            positions,
            side,
            axes: GuideAxes::default(),
        }
    }

    pub fn with_axes(mut self, axes: GuideAxes) -> Self {
        self.axes = axes;
        self
    }

    /// Orientation convention with this side's mirroring applied.
    pub fn orient_axes(&self) -> OrientAxes {
        OrientAxes::new(self.axes.aim, self.axes.up, self.axes.world_up).mirrored(self.side.sign())
    }

    /// Same guide reflected across the YZ plane onto the other side.
    pub fn mirrored(&self) -> Self {
        let side = match self.side {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Center => Side::Center,
        };
        Self {
            positions: self
                .positions
                .iter()
                .map(|p| Vec3::new(-p.x, p.y, p.z))
                .collect(),
            side,
            axes: self.axes,
        }
    }

    pub(crate) fn require_positions(&self, context: &str, count: usize) -> RigResult<()> {
        if self.positions.len() != count {
            return Err(RigError::invalid(
                context,
                format!("expected {count} guide positions, got {}", self.positions.len()),
            ));
        }
        if self.axes.aim == self.axes.up {
            return Err(RigError::invalid(context, "aim and up axes must differ"));
        }
        if self.axes.world_up.length_squared() < f32::EPSILON {
            return Err(RigError::invalid(context, "world up reference is zero"));
        }
        Ok(())
    }
}
