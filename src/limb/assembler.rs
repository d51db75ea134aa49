use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::guide::{GuideInput, Side};
use crate::blend::{matrix_switch, Switch, SwitchChannels};
use crate::error::{RigError, RigResult};
use crate::expr::safe_inverse;
use crate::id::NodeId;
use crate::ik::{Chain, OrientAxes, OrientationSolver, StretchRig, StretchSettings, StretchSolver};
use crate::math::{Sign, EPSILON};
use crate::ribbon::{RibbonConfig, RibbonDeformer, RibbonRig, TwistMode};
use crate::scene::{AttributeSpec, Channel, Plug, Scene};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimbConfig {
    pub name: String,
    /// Initial FK/IK weight, 0 = FK.
    pub fk_ik: f32,
    /// Distance of the pole controller from the mid guide, as a fraction
    /// of the limb length.
    pub pole_distance: f32,
    pub stretch: StretchSettings,
    /// Samples per ribbon. `None` builds no ribbons.
    pub ribbon_samples: Option<usize>,
    pub twist_mode: TwistMode,
    pub volume_factor: f32,
    pub preserve_volume: bool,
}

impl Default for LimbConfig {
    fn default() -> Self {
        Self {
            name: "limb".to_string(),
            fk_ik: 0.0,
            pole_distance: 0.5,
            stretch: StretchSettings::default(),
            ribbon_samples: None,
            twist_mode: TwistMode::Regular,
            volume_factor: 1.0,
            preserve_volume: true,
        }
    }
}

impl LimbConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_fk_ik(mut self, weight: f32) -> Self {
        self.fk_ik = weight;
        self
    }

    pub fn with_pole_distance(mut self, distance: f32) -> Self {
        self.pole_distance = distance;
        self
    }

    pub fn with_stretch(mut self, settings: StretchSettings) -> Self {
        self.stretch = settings;
        self
    }

    pub fn with_ribbons(mut self, samples: usize) -> Self {
        self.ribbon_samples = Some(samples);
        self
    }

    pub fn with_twist_mode(mut self, mode: TwistMode) -> Self {
        self.twist_mode = mode;
        self
    }
}

/// Abstract controllers created for one limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbControls {
    pub settings: NodeId,
    pub ik_root: NodeId,
    pub ik_end: NodeId,
    pub pole: NodeId,
    pub ik_handle: NodeId,
    /// Mid joint target blended between the rotate-plane solve and the pole.
    pub mid_target: NodeId,
}

/// Animator-facing attribute handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbAttributes {
    pub fk_ik: Plug,
    pub fk_visibility: Plug,
    pub ik_visibility: Plug,
    pub stretch: Plug,
    pub squash: Plug,
    pub soft_ik: Plug,
    pub stretch_limit: Plug,
    pub polevector: Plug,
    pub preserve_volume: Option<Plug>,
    pub volume_factor: Option<Plug>,
}

#[derive(Debug, Clone)]
pub struct LimbRig {
    pub name: String,
    pub side: Side,
    pub root: NodeId,
    pub deform: Chain,
    pub fk: Chain,
    pub ik: Chain,
    pub controls: LimbControls,
    pub attributes: LimbAttributes,
    pub stretch: StretchRig,
    /// One FK/IK switch per deform joint.
    pub switches: Vec<Switch>,
    pub ribbons: Vec<RibbonRig>,
    deformer_joints: Vec<NodeId>,
}

impl LimbRig {
    /// Joints that deform the mesh, in order from root to end.
    pub fn deformer_joints(&self) -> &[NodeId] {
        &self.deformer_joints
    }

    /// Looks up an animator attribute by its handle name.
    pub fn handle(&self, name: &str) -> Option<Plug> {
        let a = &self.attributes;
        match name {
            "fk_ik" | "fkIk" => Some(a.fk_ik),
            "fkVisibility" => Some(a.fk_visibility),
            "ikVisibility" => Some(a.ik_visibility),
            "stretch" => Some(a.stretch),
            "squash" => Some(a.squash),
            "softIK" | "soft_ik" => Some(a.soft_ik),
            "stretchLimit" | "stretch_limit" => Some(a.stretch_limit),
            "polevector" => Some(a.polevector),
            "preserve_volume" | "preserveVolume" => a.preserve_volume,
            "volume_factor" | "volumeFactor" => a.volume_factor,
            _ => None,
        }
    }
}

/// Builds three-guide limbs (arm, leg) out of the lower-level solvers.
pub struct LimbAssembler;

impl LimbAssembler {
    /// Builds the whole limb, or nothing if any step fails.
    pub fn build(scene: &mut Scene, guide: &GuideInput, config: &LimbConfig) -> RigResult<LimbRig> {
        scene.transaction(|scene| Self::assemble(scene, guide, config))
    }

    fn assemble(scene: &mut Scene, guide: &GuideInput, config: &LimbConfig) -> RigResult<LimbRig> {
        let name = format!("{}_{}", guide.side.prefix(), config.name);
        guide.require_positions(&format!("limb `{name}`"), 3)?;
        let axes = guide.orient_axes();
        let positions = &guide.positions;
        let limb_length = positions[0].distance(positions[1]) + positions[1].distance(positions[2]);
        if limb_length < EPSILON {
            return Err(RigError::DegenerateChain {
                chain: name,
                length: limb_length,
            });
        }

        let root = scene.create_transform(format!("{name}_rig"), None)?;

        let deform = Chain::create(scene, name.clone(), positions, Some(root))?;
        let fk = Chain::create(scene, format!("{name}_fk"), positions, Some(root))?;
        let ik = Chain::create(scene, format!("{name}_ik"), positions, Some(root))?;
        for chain in [&deform, &fk, &ik] {
            OrientationSolver::orient_chain(scene, chain, &axes)?;
        }

        let controls = Self::create_controls(scene, &name, root, &ik, guide, config, limb_length)?;

        let fk_ik = scene.add_attribute(
            controls.settings,
            AttributeSpec::float("fkIk", config.fk_ik).with_range(0.0, 1.0),
        )?;
        let polevector = scene.add_attribute(
            controls.ik_end,
            AttributeSpec::float("polevector", 0.0).with_range(0.0, 1.0),
        )?;

        let stretch = StretchSolver::build_with(
            scene,
            &ik,
            controls.ik_handle,
            controls.ik_root,
            controls.ik_end,
            &config.stretch,
        )?;
        Self::wire_ik(scene, &ik, &controls, &stretch, polevector, &axes)?;

        let mut switches = Vec::with_capacity(deform.joint_count());
        for ((bind, fk_joint), ik_joint) in deform.joints().iter().zip(fk.joints()).zip(ik.joints()) {
            switches.push(matrix_switch(
                scene,
                Plug::WorldMatrix(*fk_joint),
                Plug::WorldMatrix(*ik_joint),
                *bind,
                fk_ik,
                SwitchChannels::ALL,
                None,
            )?);
        }

        let fk_visibility = scene.add_attribute(
            controls.settings,
            AttributeSpec::float("fkVisibility", 1.0).with_range(0.0, 1.0),
        )?;
        let ik_visibility = scene.add_attribute(
            controls.settings,
            AttributeSpec::float("ikVisibility", 0.0).with_range(0.0, 1.0),
        )?;
        scene.connect(switches[0].reverse, fk_visibility)?;
        scene.connect(fk_ik, ik_visibility)?;

        let mut attributes = LimbAttributes {
            fk_ik,
            fk_visibility,
            ik_visibility,
            stretch: stretch.stretch,
            squash: stretch.squash,
            soft_ik: stretch.soft_ik,
            stretch_limit: stretch.stretch_limit,
            polevector,
            preserve_volume: None,
            volume_factor: None,
        };

        let mut ribbons = Vec::new();
        let mut deformer_joints = deform.joints().to_vec();
        if let Some(samples) = config.ribbon_samples {
            let (preserve, factor, built) =
                Self::build_ribbons(scene, &name, &deform, &controls, guide, config, samples)?;
            attributes.preserve_volume = Some(preserve);
            attributes.volume_factor = Some(factor);
            deformer_joints = built
                .iter()
                .flat_map(|ribbon| ribbon.deformer_joints().iter().copied())
                .chain(std::iter::once(deform.end()))
                .collect();
            ribbons = built;
        }

        log::debug!(
            "limb `{name}`: {} deformer joints, {} ribbons",
            deformer_joints.len(),
            ribbons.len()
        );

        Ok(LimbRig {
            name,
            side: guide.side,
            root,
            deform,
            fk,
            ik,
            controls,
            attributes,
            stretch,
            switches,
            ribbons,
            deformer_joints,
        })
    }

    fn create_controls(
        scene: &mut Scene,
        name: &str,
        root: NodeId,
        ik: &Chain,
        guide: &GuideInput,
        config: &LimbConfig,
        limb_length: f32,
    ) -> RigResult<LimbControls> {
        let positions = &guide.positions;
        let settings = scene.create_transform_at(
            format!("{name}_settings"),
            Some(root),
            Mat4::from_translation(positions[0]),
        )?;
        let ik_root = scene.create_transform_at(
            format!("{name}_ik_root"),
            Some(root),
            Mat4::from_translation(positions[0]),
        )?;
        let end_world = scene.world_matrix(ik.end())?;
        let ik_end = scene.create_transform_at(format!("{name}_ik_ctrl"), Some(root), end_world)?;

        let pole_position =
            positions[1] + pole_direction(positions, guide.axes.world_up) * config.pole_distance * limb_length;
        let pole = scene.create_transform_at(
            format!("{name}_pole"),
            Some(root),
            Mat4::from_translation(pole_position),
        )?;
        let ik_handle = scene.create_transform(format!("{name}_ik_handle"), Some(root))?;
        let mid_target = scene.create_transform_at(
            format!("{name}_mid_target"),
            Some(root),
            Mat4::from_translation(positions[1]),
        )?;

        Ok(LimbControls {
            settings,
            ik_root,
            ik_end,
            pole,
            ik_handle,
            mid_target,
        })
    }

    /// Rotate-plane solve with pole pinning, driving the IK chain.
    fn wire_ik(
        scene: &mut Scene,
        ik: &Chain,
        controls: &LimbControls,
        stretch: &StretchRig,
        polevector: Plug,
        axes: &OrientAxes,
    ) -> RigResult<()> {
        let joints = ik.joints();
        let (upper, mid, end) = (joints[0], joints[1], joints[2]);
        let local_aim = axes.local_aim();

        // Rest-pose directions toward the pole, in each joint's own frame.
        let pole_rest = scene.world_position(controls.pole)?;
        let upper_up = rest_pole_axis(scene, upper, pole_rest, axes)?;
        let mid_up = rest_pole_axis(scene, mid, pole_rest, axes)?;
        let end_offset = safe_inverse(scene.world_matrix(controls.ik_end)?) * scene.world_matrix(end)?;

        let root_local = scene.transform_point(
            Plug::ParentInverse(upper),
            Plug::WorldPosition(controls.ik_root),
        )?;
        scene.connect(root_local, Plug::translate(upper))?;

        let root_position = Plug::WorldPosition(upper);
        let handle = Plug::WorldPosition(controls.ik_handle);
        let pole = Plug::WorldPosition(controls.pole);
        let solve = scene.two_bone_ik(root_position, handle, pole, stretch.lengths[0], stretch.lengths[1])?;

        let solved_mid = scene.compose_matrix(solve.mid, Quat::IDENTITY, Vec3::ONE)?;
        matrix_switch(
            scene,
            solved_mid,
            Plug::WorldMatrix(controls.pole),
            controls.mid_target,
            polevector,
            SwitchChannels::POSITION,
            None,
        )?;
        let mid_position = Plug::WorldPosition(controls.mid_target);
        let end_position = scene.blend2(solve.end, handle, polevector)?;

        let upper_pole = scene.subtract(pole, root_position)?;
        let upper_rotation = scene.aim_rotation(
            root_position,
            mid_position,
            upper_pole,
            Plug::ParentMatrix(upper),
            local_aim,
            upper_up,
        )?;
        scene.connect(upper_rotation, Plug::rotate(upper))?;

        let mid_pole = scene.subtract(pole, mid_position)?;
        let mid_rotation = scene.aim_rotation(
            mid_position,
            end_position,
            mid_pole,
            Plug::ParentMatrix(mid),
            local_aim,
            mid_up,
        )?;
        scene.connect(mid_rotation, Plug::rotate(mid))?;

        // Pinned or not, each segment spans exactly its two targets.
        let upper_length = scene.distance(root_position, mid_position)?;
        let lower_length = scene.distance(mid_position, end_position)?;
        for ((joint, axis, sign), length) in stretch
            .driven_axes
            .iter()
            .zip([upper_length, lower_length])
        {
            let channel = Plug::Channel(*joint, Channel::TranslateAxis(*axis));
            scene.disconnect(channel)?;
            let signed = match sign {
                Sign::Positive => length,
                Sign::Negative => scene.multiply(length, -1.0)?,
            };
            scene.connect(signed, channel)?;
        }

        let end_world = scene.multiply_matrix([
            Plug::ParentInverse(end).into(),
            Plug::WorldMatrix(controls.ik_end).into(),
            end_offset.into(),
        ])?;
        let end_parts = scene.decompose_matrix(end_world)?;
        scene.connect(end_parts.rotate, Plug::rotate(end))?;
        Ok(())
    }

    fn build_ribbons(
        scene: &mut Scene,
        name: &str,
        deform: &Chain,
        controls: &LimbControls,
        guide: &GuideInput,
        config: &LimbConfig,
        samples: usize,
    ) -> RigResult<(Plug, Plug, Vec<RibbonRig>)> {
        let preserve = scene.add_attribute(
            controls.settings,
            AttributeSpec::float("preserveVolume", if config.preserve_volume { 1.0 } else { 0.0 })
                .with_range(0.0, 1.0),
        )?;
        let factor = scene.add_attribute(
            controls.settings,
            AttributeSpec::float("volumeFactor", config.volume_factor).with_min(0.0),
        )?;

        let mut ribbons = Vec::with_capacity(2);
        for (segment, (start, end)) in ["upper", "lower"].into_iter().zip(deform.segments()) {
            let ribbon_config = RibbonConfig::new(format!("{name}_{segment}_ribbon"))
                .with_axes(guide.axes.aim, guide.axes.up)
                .with_twist_mode(config.twist_mode)
                .with_volume_factor(config.volume_factor)
                .with_preserve_volume(config.preserve_volume);
            let ribbon = RibbonDeformer::build_with(
                scene,
                start,
                end,
                samples,
                guide.axes.world_up,
                &ribbon_config,
            )?;
            ribbon.follow(scene, start, end)?;
            scene.connect(preserve, ribbon.preserve_volume)?;
            scene.connect(factor, ribbon.volume_factor)?;
            ribbons.push(ribbon);
        }
        Ok((preserve, factor, ribbons))
    }
}

/// Direction from the root-to-end line toward the mid guide, or the world
/// up reference when the guides are collinear.
fn pole_direction(positions: &[Vec3], world_up: Vec3) -> Vec3 {
    let line = (positions[2] - positions[0]).normalize_or_zero();
    let offset = positions[1] - positions[0];
    let planar = offset - line * offset.dot(line);
    if planar.length_squared() > EPSILON {
        return planar.normalize();
    }
    let up = world_up - line * world_up.dot(line);
    if up.length_squared() > EPSILON {
        up.normalize()
    } else {
        line.any_orthonormal_vector()
    }
}

/// Local axis of `joint` that points at `pole` in the rest pose, with its
/// aim component removed.
fn rest_pole_axis(scene: &mut Scene, joint: NodeId, pole: Vec3, axes: &OrientAxes) -> RigResult<Vec3> {
    let world = scene.world_transform(joint)?;
    let local = world.rotation.inverse() * (pole - world.translation);
    let aim = axes.local_aim();
    let planar = local - aim * local.dot(aim);
    Ok(if planar.length_squared() > EPSILON {
        planar.normalize()
    } else {
        axes.local_up()
    })
}
