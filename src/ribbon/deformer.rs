use glam::{Mat4, Vec3};

use super::config::{Falloff, RibbonConfig, TwistMode};
use super::strip::{sample_params, LinearStrip, StripProvider};
use crate::blend::{matrix_switch, Switch, SwitchChannels};
use crate::error::{RigError, RigResult};
use crate::expr::{safe_inverse, CompareOp};
use crate::id::NodeId;
use crate::math::{aim_basis, EPSILON};
use crate::scene::{AttributeSpec, Channel, Plug, Scene};

/// Progress of a ribbon build. Only a `Ready` ribbon is handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RibbonStage {
    Created,
    SurfaceBuilt,
    SamplesPlaced,
    RailsRigged,
    VolumeWired,
    Ready,
}

/// A fully wired ribbon.
#[derive(Debug, Clone)]
pub struct RibbonRig {
    pub name: String,
    pub scale_group: NodeId,
    pub start_rail: NodeId,
    pub end_rail: NodeId,
    /// Sample drivers, one per parameter.
    pub samples: Vec<NodeId>,
    pub deformer_joints: Vec<NodeId>,
    pub params: Vec<f32>,
    pub rest_length: f32,
    pub current_length: Plug,
    /// Live cross-section scale per deformer joint.
    pub thickness: Vec<Plug>,
    pub preserve_volume: Plug,
    pub volume_factor: Plug,
    /// `Falloff` index selecting the volume weight curve.
    pub falloff: Plug,
    pub twist_start: Option<Plug>,
    pub twist_end: Option<Plug>,
}

impl RibbonRig {
    pub fn start_plug(&self) -> Plug {
        Plug::WorldMatrix(self.start_rail)
    }

    pub fn end_plug(&self) -> Plug {
        Plug::WorldMatrix(self.end_rail)
    }

    pub fn deformer_joints(&self) -> &[NodeId] {
        &self.deformer_joints
    }

    pub fn scale_group(&self) -> NodeId {
        self.scale_group
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Makes the rails follow two driver transforms, keeping the current
    /// offset between each rail and its driver.
    ///
    /// A `follow` attribute on the scale group blends each rail between its
    /// rest pose (0) and the driver (1). Driver twist about the aim axis
    /// reaches the samples through the rails.
    pub fn follow(
        &self,
        scene: &mut Scene,
        start_source: NodeId,
        end_source: NodeId,
    ) -> RigResult<(Switch, Switch)> {
        scene.transaction(|scene| {
            let weight = scene.add_attribute(
                self.scale_group,
                AttributeSpec::float("follow", 1.0).with_range(0.0, 1.0),
            )?;
            let start = follow_rail(scene, self.start_rail, start_source, weight)?;
            let end = follow_rail(scene, self.end_rail, end_source, weight)?;
            log::debug!(
                "ribbon `{}` follows `{}` and `{}`",
                self.name,
                scene.name(start_source),
                scene.name(end_source)
            );
            Ok((start, end))
        })
    }
}

fn follow_rail(scene: &mut Scene, rail: NodeId, source: NodeId, weight: Plug) -> RigResult<Switch> {
    let rest = scene.world_matrix(rail)?;
    let offset = safe_inverse(scene.world_matrix(source)?) * rest;
    let followed = scene.multiply_matrix([Plug::WorldMatrix(source).into(), offset.into()])?;
    matrix_switch(scene, rest, followed, rail, weight, SwitchChannels::ALL, None)
}

/// Rail twist about `local_aim` relative to the rest pose, plus `offset`.
fn rail_twist(scene: &mut Scene, rail: NodeId, local_aim: Vec3, offset: Plug) -> RigResult<Plug> {
    let rest = scene.rest_transform(rail)?.rotation.inverse();
    let delta = scene.quat_multiply(rest, Plug::rotate(rail))?;
    let degrees = scene.twist_angle(delta, local_aim)?;
    scene.add([degrees.into(), offset.into()])
}

#[derive(Debug, Clone, Copy)]
enum RailUp {
    Fixed(Plug),
    Blended(Plug, Plug),
}

pub struct RibbonDeformer;

impl RibbonDeformer {
    /// Builds a ribbon between two joints with the default configuration.
    pub fn build_ribbon(
        scene: &mut Scene,
        joint_start: NodeId,
        joint_end: NodeId,
        sample_count: usize,
        up_vector: Vec3,
    ) -> RigResult<RibbonRig> {
        Self::build_with(
            scene,
            joint_start,
            joint_end,
            sample_count,
            up_vector,
            &RibbonConfig::default(),
        )
    }

    pub fn build_with(
        scene: &mut Scene,
        joint_start: NodeId,
        joint_end: NodeId,
        sample_count: usize,
        up_vector: Vec3,
        config: &RibbonConfig,
    ) -> RigResult<RibbonRig> {
        let strip = LinearStrip::new(
            scene.world_position(joint_start)?,
            scene.world_position(joint_end)?,
        );
        Self::build_on_strip(scene, &strip, sample_count, up_vector, config)
    }

    /// Builds a ribbon whose rest samples are placed on `strip`.
    ///
    /// Samples ride the straight line between the rails plus their rest
    /// offset from it, carried in the start rail's frame. Nothing is left in
    /// the scene if any stage fails.
    pub fn build_on_strip(
        scene: &mut Scene,
        strip: &dyn StripProvider,
        sample_count: usize,
        up_vector: Vec3,
        config: &RibbonConfig,
    ) -> RigResult<RibbonRig> {
        scene.transaction(|scene| {
            let mut build = RibbonBuild::new(config);
            build.surface(scene, strip, sample_count, up_vector)?;
            build.place_samples(scene, strip, sample_count, up_vector)?;
            build.rig_rails(scene)?;
            build.wire_volume(scene)?;
            build.finish()
        })
    }
}

/// In-progress ribbon. Handles are filled in stage by stage.
struct RibbonBuild<'a> {
    config: &'a RibbonConfig,
    stage: RibbonStage,
    scale_group: Option<NodeId>,
    rails: Option<(NodeId, NodeId)>,
    rest_length: f32,
    params: Vec<f32>,
    samples: Vec<NodeId>,
    /// Rest offset of each sample from the rail line, in start rail space.
    offsets: Vec<Vec3>,
    falloff: Option<Plug>,
    deformer_joints: Vec<NodeId>,
    preserve_volume: Option<Plug>,
    volume_factor: Option<Plug>,
    twist: Option<(Plug, Plug)>,
    current_length: Option<Plug>,
    thickness: Vec<Plug>,
}

impl<'a> RibbonBuild<'a> {
    fn new(config: &'a RibbonConfig) -> Self {
        Self {
            config,
            stage: RibbonStage::Created,
            scale_group: None,
            rails: None,
            rest_length: 0.0,
            params: Vec::new(),
            samples: Vec::new(),
            offsets: Vec::new(),
            falloff: None,
            deformer_joints: Vec::new(),
            preserve_volume: None,
            volume_factor: None,
            twist: None,
            current_length: None,
            thickness: Vec::new(),
        }
    }

    fn advance(&mut self, next: RibbonStage) {
        debug_assert!(next > self.stage);
        log::debug!("ribbon `{}`: {:?} -> {:?}", self.config.name, self.stage, next);
        self.stage = next;
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.config.name)
    }

    fn group(&self) -> RigResult<NodeId> {
        self.scale_group.ok_or_else(|| self.out_of_order("scale group"))
    }

    fn rails(&self) -> RigResult<(NodeId, NodeId)> {
        self.rails.ok_or_else(|| self.out_of_order("rails"))
    }

    fn out_of_order(&self, missing: &str) -> RigError {
        RigError::invalid(
            format!("ribbon `{}`", self.config.name),
            format!("{missing} not built at stage {:?}", self.stage),
        )
    }

    /// Scale group, rails and animator attributes.
    fn surface(
        &mut self,
        scene: &mut Scene,
        strip: &dyn StripProvider,
        sample_count: usize,
        up_vector: Vec3,
    ) -> RigResult<()> {
        if sample_count < 2 {
            return Err(RigError::InsufficientResolution {
                context: format!("ribbon `{}`", self.config.name),
                requested: sample_count,
                minimum: 2,
            });
        }
        let (start, end) = (strip.position(0.0), strip.position(1.0));
        let length = strip.length();
        if length < EPSILON || start.distance(end) < EPSILON {
            return Err(RigError::DegenerateChain {
                chain: self.config.name.clone(),
                length,
            });
        }
        if (end - start).normalize().cross(up_vector).length_squared() < EPSILON {
            log::warn!(
                "ribbon `{}`: up vector is parallel to the strip",
                self.config.name
            );
        }

        let local_aim = self.config.aim_axis.unit();
        let local_up = self.config.up_axis.unit();
        let rail_rotation = aim_basis(end - start, up_vector, local_aim, local_up);

        let group = scene.create_transform(self.name("grp"), None)?;
        let start_rail = scene.create_transform_at(
            self.name("start"),
            Some(group),
            Mat4::from_rotation_translation(rail_rotation, start),
        )?;
        let end_rail = scene.create_transform_at(
            self.name("end"),
            Some(group),
            Mat4::from_rotation_translation(rail_rotation, end),
        )?;

        self.preserve_volume = Some(scene.add_attribute(
            group,
            AttributeSpec::float(
                "preserveVolume",
                if self.config.preserve_volume { 1.0 } else { 0.0 },
            )
            .with_range(0.0, 1.0),
        )?);
        self.volume_factor = Some(scene.add_attribute(
            group,
            AttributeSpec::float("volumeFactor", self.config.volume_factor).with_min(0.0),
        )?);
        if self.config.twist_mode == TwistMode::Infinite {
            let twist_start = scene.add_attribute(group, AttributeSpec::float("twistStart", 0.0))?;
            let twist_end = scene.add_attribute(group, AttributeSpec::float("twistEnd", 0.0))?;
            self.twist = Some((twist_start, twist_end));
        }

        self.scale_group = Some(group);
        self.rails = Some((start_rail, end_rail));
        self.rest_length = start.distance(end);
        self.advance(RibbonStage::SurfaceBuilt);
        Ok(())
    }

    /// One driver per parameter, each owning one deformer joint.
    fn place_samples(
        &mut self,
        scene: &mut Scene,
        strip: &dyn StripProvider,
        sample_count: usize,
        up_vector: Vec3,
    ) -> RigResult<()> {
        let group = self.group()?;
        let (start_rail, _) = self.rails()?;
        let local_aim = self.config.aim_axis.unit();
        let local_up = self.config.up_axis.unit();
        let (start, end) = (strip.position(0.0), strip.position(1.0));
        let to_rail = safe_inverse(scene.world_matrix(start_rail)?);

        self.params = sample_params(sample_count);
        for (k, t) in self.params.iter().enumerate() {
            let position = strip.position(*t);
            let rotation = aim_basis(strip.tangent(*t), up_vector, local_aim, local_up);
            let sample = scene.create_transform_at(
                self.name(&format!("sample_{k}")),
                Some(group),
                Mat4::from_rotation_translation(rotation, position),
            )?;
            let joint = scene.create_transform(self.name(&format!("jnt_{k}")), Some(sample))?;
            self.samples.push(sample);
            self.offsets
                .push(to_rail.transform_vector3(position - start.lerp(end, *t)));
            self.deformer_joints.push(joint);
        }

        self.advance(RibbonStage::SamplesPlaced);
        Ok(())
    }

    /// Drives every sample from the two rails.
    ///
    /// Regular twist blends the rails' up vectors. Infinite twist keeps the
    /// scale group's rest up and spins each sample by a blend of the rails'
    /// own twist about the aim axis plus the `twistStart`/`twistEnd` offsets,
    /// so it has no half-turn limit.
    fn rig_rails(&mut self, scene: &mut Scene) -> RigResult<()> {
        let group = self.group()?;
        let (start_rail, end_rail) = self.rails()?;
        let local_aim = self.config.aim_axis.unit();
        let local_up = self.config.up_axis.unit();

        let start = Plug::WorldPosition(start_rail);
        let end = Plug::WorldPosition(end_rail);
        let (up_source, twist) = match (self.config.twist_mode, self.twist) {
            (TwistMode::Infinite, Some((twist_start, twist_end))) => {
                let rest_up = scene.rest_transform(start_rail)?.rotation * local_up;
                let up = scene.transform_vector(Plug::WorldMatrix(group), rest_up)?;
                let start_twist = rail_twist(scene, start_rail, local_aim, twist_start)?;
                let end_twist = rail_twist(scene, end_rail, local_aim, twist_end)?;
                (RailUp::Fixed(up), Some((start_twist, end_twist)))
            }
            _ => {
                let start_up = scene.transform_vector(Plug::WorldMatrix(start_rail), local_up)?;
                let end_up = scene.transform_vector(Plug::WorldMatrix(end_rail), local_up)?;
                (RailUp::Blended(start_up, end_up), None)
            }
        };

        for ((sample, t), offset) in self.samples.iter().zip(&self.params).zip(&self.offsets) {
            let mut position = scene.blend2(start, end, *t)?;
            if offset.length_squared() > EPSILON * EPSILON {
                let carried = scene.transform_vector(Plug::WorldMatrix(start_rail), *offset)?;
                position = scene.add([position.into(), carried.into()])?;
            }
            let local_position = scene.transform_point(Plug::ParentInverse(*sample), position)?;
            scene.connect(local_position, Plug::translate(*sample))?;

            let up = match up_source {
                RailUp::Fixed(up) => up,
                RailUp::Blended(start_up, end_up) => {
                    let mixed = scene.blend2(start_up, end_up, *t)?;
                    scene.normalize(mixed)?
                }
            };
            let aim = scene.aim_rotation(
                start,
                end,
                up,
                Plug::ParentMatrix(*sample),
                local_aim,
                local_up,
            )?;
            let rotation = match twist {
                Some((start_twist, end_twist)) => {
                    let degrees = scene.blend2(start_twist, end_twist, *t)?;
                    let spin = scene.axis_angle(local_aim, degrees)?;
                    scene.quat_multiply(aim, spin)?
                }
                None => aim,
            };
            scene.connect(rotation, Plug::rotate(*sample))?;
        }

        self.advance(RibbonStage::RailsRigged);
        Ok(())
    }

    /// Thickness of every deformer joint from the live stretch ratio.
    fn wire_volume(&mut self, scene: &mut Scene) -> RigResult<()> {
        let group = self.group()?;
        let (start_rail, end_rail) = self.rails()?;
        let preserve = self
            .preserve_volume
            .ok_or_else(|| self.out_of_order("preserveVolume"))?;
        let factor = self
            .volume_factor
            .ok_or_else(|| self.out_of_order("volumeFactor"))?;

        let falloff = scene.add_attribute(
            group,
            AttributeSpec::enumeration(
                "falloff",
                self.config.falloff.index(),
                Falloff::ALL.len() as u32,
            ),
        )?;
        let current = scene.distance(Plug::WorldPosition(start_rail), Plug::WorldPosition(end_rail))?;
        let group_scale = scene.component(Plug::scale(group), self.config.aim_axis)?;
        let rest = scene.multiply(group_scale, self.rest_length)?;
        let ratio = scene.divide(current, rest)?;

        let cross_axes = self.config.cross_axes();
        for (joint, t) in self.deformer_joints.iter().zip(&self.params) {
            let [parabolic, sine] = Falloff::ALL.map(|curve| curve.weight(*t));
            let weight = scene.condition(
                falloff,
                CompareOp::Equal,
                Falloff::Sine.index() as f32,
                sine,
                parabolic,
            )?;
            let exponent = scene.multiply(factor, weight)?;
            let volume = scene.power(ratio, exponent)?;
            let thinned = scene.divide(1.0, volume)?;
            let thickness = scene.blend2(1.0, thinned, preserve)?;
            for axis in cross_axes {
                scene.connect(thickness, Plug::Channel(*joint, Channel::ScaleAxis(axis)))?;
            }
            self.thickness.push(thickness);
        }

        self.current_length = Some(current);
        self.falloff = Some(falloff);
        self.advance(RibbonStage::VolumeWired);
        Ok(())
    }

    fn finish(mut self) -> RigResult<RibbonRig> {
        let scale_group = self.group()?;
        let (start_rail, end_rail) = self.rails()?;
        let current_length = self
            .current_length
            .ok_or_else(|| self.out_of_order("volume network"))?;
        let preserve_volume = self
            .preserve_volume
            .ok_or_else(|| self.out_of_order("preserveVolume"))?;
        let volume_factor = self
            .volume_factor
            .ok_or_else(|| self.out_of_order("volumeFactor"))?;
        let falloff = self.falloff.ok_or_else(|| self.out_of_order("falloff"))?;
        self.advance(RibbonStage::Ready);

        Ok(RibbonRig {
            name: self.config.name.clone(),
            scale_group,
            start_rail,
            end_rail,
            samples: self.samples,
            deformer_joints: self.deformer_joints,
            params: self.params,
            rest_length: self.rest_length,
            current_length,
            thickness: self.thickness,
            preserve_volume,
            volume_factor,
            falloff,
            twist_start: self.twist.map(|(start, _)| start),
            twist_end: self.twist.map(|(_, end)| end),
        })
    }
}
