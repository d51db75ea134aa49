use serde::{Deserialize, Serialize};

use crate::math::Axis;

/// How samples between the rails receive twist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TwistMode {
    /// Up vector interpolated between the rails. Stable up to about 180°.
    #[default]
    Regular,
    /// Rail twist about the aim axis plus the `twistStart` / `twistEnd`
    /// attributes, in degrees, interpolated along the strip. Unbounded.
    Infinite,
}

/// Weight of the volume effect along the strip, 0 at the rails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Falloff {
    /// `4t(1 - t)`.
    #[default]
    Parabolic,
    /// `sin(pi t)`.
    Sine,
}

impl Falloff {
    /// Every falloff, in the order of the ribbon's `falloff` attribute.
    pub const ALL: [Falloff; 2] = [Falloff::Parabolic, Falloff::Sine];

    pub fn index(self) -> u32 {
        match self {
            Falloff::Parabolic => 0,
            Falloff::Sine => 1,
        }
    }

    pub fn weight(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Falloff::Parabolic => 4.0 * t * (1.0 - t),
            Falloff::Sine => (std::f32::consts::PI * t).sin().max(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RibbonConfig {
    pub name: String,
    pub aim_axis: Axis,
    pub up_axis: Axis,
    pub twist_mode: TwistMode,
    pub volume_factor: f32,
    pub preserve_volume: bool,
    pub falloff: Falloff,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            name: "ribbon".to_string(),
            aim_axis: Axis::X,
            up_axis: Axis::Y,
            twist_mode: TwistMode::Regular,
            volume_factor: 1.0,
            preserve_volume: true,
            falloff: Falloff::Parabolic,
        }
    }
}

impl RibbonConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_axes(mut self, aim: Axis, up: Axis) -> Self {
        self.aim_axis = aim;
        self.up_axis = up;
        self
    }

    pub fn with_twist_mode(mut self, mode: TwistMode) -> Self {
        self.twist_mode = mode;
        self
    }

    pub fn with_volume_factor(mut self, factor: f32) -> Self {
        self.volume_factor = factor;
        self
    }

    pub fn with_preserve_volume(mut self, preserve: bool) -> Self {
        self.preserve_volume = preserve;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    /// The two axes that receive thickness scaling.
    pub fn cross_axes(&self) -> [Axis; 2] {
        match self.aim_axis {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falloff_is_zero_at_rails_and_one_at_midpoint() {
        for falloff in Falloff::ALL {
            assert!(falloff.weight(0.0).abs() < 1e-6);
            assert!(falloff.weight(1.0).abs() < 1e-6);
            assert!((falloff.weight(0.5) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn config_decodes_with_defaults() {
        let config: RibbonConfig =
            serde_json::from_str(r#"{ "name": "forearm", "twist_mode": "Infinite" }"#).unwrap();
        assert_eq!(config.name, "forearm");
        assert_eq!(config.twist_mode, TwistMode::Infinite);
        assert_eq!(config.aim_axis, Axis::X);
        assert!(config.preserve_volume);
    }
}
