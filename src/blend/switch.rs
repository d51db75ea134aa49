use serde::{Deserialize, Serialize};

use crate::error::{RigError, RigResult};
use crate::expr::{Decomposed, Input, ValueType};
use crate::id::NodeId;
use crate::scene::{Plug, Scene};

/// Which local channels of the driven transform a switch connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchChannels {
    pub position: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl Default for SwitchChannels {
    fn default() -> Self {
        Self::ALL
    }
}

impl SwitchChannels {
    pub const ALL: Self = Self {
        position: true,
        rotation: true,
        scale: true,
    };

    pub const POSITION: Self = Self {
        position: true,
        rotation: false,
        scale: false,
    };

    pub const ROTATION: Self = Self {
        position: false,
        rotation: true,
        scale: false,
    };

    pub fn with_position(mut self, enabled: bool) -> Self {
        self.position = enabled;
        self
    }

    pub fn with_rotation(mut self, enabled: bool) -> Self {
        self.rotation = enabled;
        self
    }

    pub fn with_scale(mut self, enabled: bool) -> Self {
        self.scale = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        !(self.position || self.rotation || self.scale)
    }
}

/// A wired two-source switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Switch {
    pub driven: NodeId,
    /// 0 selects source A, 1 selects source B.
    pub weight: Input,
    /// `1 - weight`, for visibility toggles and other lock-step consumers.
    pub reverse: Plug,
    /// Blended world matrix.
    pub blended: Plug,
    /// Blended matrix in the driven transform's parent space.
    pub local: Plug,
    pub channels: Decomposed,
}

/// Blends the world matrices of two sources into `driven`.
///
/// With `parent_cutoff`, both sources are brought into the cutoff's space
/// before blending and the result is taken back out, so blending happens
/// relative to that ancestor instead of the world origin.
pub fn matrix_switch(
    scene: &mut Scene,
    source_a: impl Into<Input>,
    source_b: impl Into<Input>,
    driven: NodeId,
    weight: impl Into<Input>,
    channels: SwitchChannels,
    parent_cutoff: Option<NodeId>,
) -> RigResult<Switch> {
    let (source_a, source_b, weight) = (source_a.into(), source_b.into(), weight.into());
    scene.transaction(|scene| {
        wire_switch(scene, source_a, source_b, driven, weight, channels, parent_cutoff)
    })
}

fn wire_switch(
    scene: &mut Scene,
    source_a: Input,
    source_b: Input,
    driven: NodeId,
    weight: Input,
    channels: SwitchChannels,
    parent_cutoff: Option<NodeId>,
) -> RigResult<Switch> {
    scene.transforms().get(driven)?;
    if channels.is_empty() {
        return Err(RigError::invalid(
            format!("matrix_switch on `{}`", scene.name(driven)),
            "no channel selected",
        ));
    }
    for source in [source_a, source_b] {
        let found = scene.input_type(&source)?;
        if found != ValueType::Matrix {
            return Err(RigError::mismatch("matrix_switch source", ValueType::Matrix, found));
        }
    }

    let reverse = scene.reverse(weight)?;
    let (blended, local) = match parent_cutoff {
        None => {
            let blended = scene.average_matrix([source_a, source_b], [reverse.into(), weight])?;
            let local = scene.multiply_matrix([Plug::ParentInverse(driven).into(), blended.into()])?;
            (blended, local)
        }
        Some(cutoff) => {
            scene.transforms().get(cutoff)?;
            let to_cutoff = Plug::WorldInverse(cutoff);
            let a = scene.multiply_matrix([to_cutoff.into(), source_a])?;
            let b = scene.multiply_matrix([to_cutoff.into(), source_b])?;
            let relative = scene.average_matrix([a.into(), b.into()], [reverse.into(), weight])?;
            let blended =
                scene.multiply_matrix([Plug::WorldMatrix(cutoff).into(), relative.into()])?;
            let local = scene.multiply_matrix([Plug::ParentInverse(driven).into(), blended.into()])?;
            (blended, local)
        }
    };

    let parts = scene.decompose_matrix(local)?;
    if channels.position {
        scene.connect(parts.translate, Plug::translate(driven))?;
    }
    if channels.rotation {
        scene.connect(parts.rotate, Plug::rotate(driven))?;
    }
    if channels.scale {
        scene.connect(parts.scale, Plug::scale(driven))?;
    }

    log::debug!(
        "matrix switch into `{}`{}",
        scene.name(driven),
        parent_cutoff
            .map(|c| format!(" relative to `{}`", scene.name(c)))
            .unwrap_or_default()
    );

    Ok(Switch {
        driven,
        weight,
        reverse,
        blended,
        local,
        channels: parts,
    })
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Quat, Vec3};

    use super::*;
    use crate::error::ErrorKind;
    use crate::math::Transform;
    use crate::scene::AttributeSpec;

    struct Setup {
        scene: Scene,
        a: NodeId,
        b: NodeId,
        driven: NodeId,
        weight: Plug,
    }

    fn setup() -> Setup {
        let mut scene = Scene::new();
        let a = scene
            .create_transform_at(
                "fk",
                None,
                Mat4::from_rotation_translation(Quat::from_rotation_z(0.8), Vec3::new(1.0, 2.0, 0.0)),
            )
            .unwrap();
        let b = scene
            .create_transform_at(
                "ik",
                None,
                Mat4::from_rotation_translation(Quat::from_rotation_y(-0.6), Vec3::new(-3.0, 0.5, 4.0)),
            )
            .unwrap();
        let parent = scene
            .create_transform_with(
                "offset",
                None,
                Transform::from_translation_rotation(Vec3::new(0.0, 5.0, 0.0), Quat::from_rotation_x(0.4)),
            )
            .unwrap();
        let driven = scene.create_transform("bind", Some(parent)).unwrap();
        let weight = scene
            .add_attribute(parent, AttributeSpec::float("fkIk", 0.0).with_range(0.0, 1.0))
            .unwrap();
        Setup {
            scene,
            a,
            b,
            driven,
            weight,
        }
    }

    #[test]
    fn endpoints_reproduce_sources() {
        let mut s = setup();
        matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ALL,
            None,
        )
        .unwrap();

        let a = s.scene.world_matrix(s.a).unwrap();
        assert!(s.scene.world_matrix(s.driven).unwrap().abs_diff_eq(a, 1e-4));

        s.scene.set_attribute(s.weight, 1.0).unwrap();
        let b = s.scene.world_matrix(s.b).unwrap();
        assert!(s.scene.world_matrix(s.driven).unwrap().abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn halfway_blends_positions() {
        let mut s = setup();
        let switch = matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ALL,
            None,
        )
        .unwrap();
        s.scene.set_attribute(s.weight, 0.5).unwrap();

        assert_eq!(s.scene.evaluate_f32(switch.reverse).unwrap(), 0.5);
        let position = s.scene.world_position(s.driven).unwrap();
        assert!(position.abs_diff_eq(Vec3::new(-1.0, 1.25, 2.0), 1e-4));
    }

    #[test]
    fn cutoff_keeps_endpoints_exact() {
        let mut s = setup();
        let cutoff = s
            .scene
            .create_transform_with(
                "hips",
                None,
                Transform::from_translation_rotation(Vec3::new(2.0, 1.0, 0.0), Quat::from_rotation_y(1.1)),
            )
            .unwrap();
        matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ALL,
            Some(cutoff),
        )
        .unwrap();

        let a = s.scene.world_matrix(s.a).unwrap();
        assert!(s.scene.world_matrix(s.driven).unwrap().abs_diff_eq(a, 1e-4));
        s.scene.set_attribute(s.weight, 1.0).unwrap();
        let b = s.scene.world_matrix(s.b).unwrap();
        assert!(s.scene.world_matrix(s.driven).unwrap().abs_diff_eq(b, 1e-4));
    }

    #[test]
    fn unselected_channels_stay_free() {
        let mut s = setup();
        s.scene.set_translation(s.driven, Vec3::new(0.0, 0.0, 9.0)).unwrap();
        matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ROTATION,
            None,
        )
        .unwrap();

        assert!(!s.scene.is_driven(Plug::translate(s.driven)));
        assert!(s.scene.is_driven(Plug::rotate(s.driven)));
        let local = s.scene.local_transform(s.driven).unwrap();
        assert_eq!(local.translation, Vec3::new(0.0, 0.0, 9.0));
    }

    #[test]
    fn failed_switch_releases_its_channels() {
        let mut s = setup();
        s.scene
            .connect(Plug::rotate(s.a), Plug::rotate(s.driven))
            .unwrap();
        let expressions = s.scene.expressions().len();

        let err = matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ALL,
            None,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateConnection);
        assert!(!s.scene.is_driven(Plug::translate(s.driven)));
        assert_eq!(s.scene.driver(Plug::rotate(s.driven)), Some(Plug::rotate(s.a)));
        assert_eq!(s.scene.expressions().len(), expressions);
    }

    #[test]
    fn empty_channel_set_is_rejected() {
        let mut s = setup();
        let none = SwitchChannels::ALL
            .with_position(false)
            .with_rotation(false)
            .with_scale(false);
        let err = matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.a),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            none,
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn switching_a_source_from_itself_is_a_cycle() {
        let mut s = setup();
        let err = matrix_switch(
            &mut s.scene,
            Plug::WorldMatrix(s.driven),
            Plug::WorldMatrix(s.b),
            s.driven,
            s.weight,
            SwitchChannels::ALL,
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CyclicConnection);
    }
}
