use serde::{Deserialize, Serialize};

use super::chain::Chain;
use crate::error::{RigError, RigResult};
use crate::expr::CompareOp;
use crate::id::NodeId;
use crate::math::{Axis, Sign, EPSILON};
use crate::scene::{AttributeSpec, Channel, Plug, Scene};

/// Animator-facing stretch values.
///
/// `soft_ik` is a percentage of the rest chain length: the last
/// `soft_ik / 100 * sum` units of reach are eased in exponentially.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StretchSettings {
    pub stretch: f32,
    pub squash: f32,
    /// Extra length each segment may gain. `None` means the rest chain length.
    pub stretch_limit: Option<f32>,
    pub soft_ik: f32,
    /// Per-segment multipliers. Missing entries are 1.
    pub segment_scales: Vec<f32>,
}

impl Default for StretchSettings {
    fn default() -> Self {
        Self {
            stretch: 1.0,
            squash: 0.0,
            stretch_limit: None,
            soft_ik: 0.0,
            segment_scales: Vec::new(),
        }
    }
}

impl StretchSettings {
    pub fn with_stretch(mut self, stretch: f32) -> Self {
        self.stretch = stretch;
        self
    }

    pub fn with_squash(mut self, squash: f32) -> Self {
        self.squash = squash;
        self
    }

    pub fn with_stretch_limit(mut self, limit: f32) -> Self {
        self.stretch_limit = Some(limit);
        self
    }

    pub fn with_soft_ik(mut self, soft_ik: f32) -> Self {
        self.soft_ik = soft_ik;
        self
    }

    pub fn with_segment_scales(mut self, scales: Vec<f32>) -> Self {
        self.segment_scales = scales;
        self
    }

    fn segment_scale(&self, index: usize) -> f32 {
        self.segment_scales
            .get(index)
            .copied()
            .unwrap_or(1.0)
            .max(MIN_SEGMENT_SCALE)
    }
}

const MIN_SEGMENT_SCALE: f32 = 0.01;

/// Largest soft-clamped reach. The exponential term vanishes in f32 long
/// before the reach gets there, so the curve is capped one ulp short.
fn soft_ceiling(sum: f32) -> f32 {
    sum * (1.0 - f32::EPSILON)
}

/// Per-evaluation soft IK and stretch values.
///
/// Derived from the controller distance every frame and never stored in
/// the graph. [`SoftIkState::solve`] reproduces the values the graph built
/// by [`StretchSolver::build_stretchy_chain`] computes.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftIkState {
    pub chain_length: f32,
    pub current_distance: f32,
    pub soft_distance: f32,
    pub clamped_distance: f32,
    pub stretch_factor: f32,
    pub scale: f32,
    pub lengths: Vec<f32>,
}

impl SoftIkState {
    pub fn solve(rest_lengths: &[f32], current: f32, settings: &StretchSettings) -> Self {
        let sum: f32 = rest_lengths.iter().sum();
        let soft = settings.soft_ik.clamp(0.0, 100.0) / 100.0 * sum;
        let soft_distance = sum - soft;

        let clamped = if soft > 0.0 {
            let softened = if current > soft_distance {
                sum - soft * (-(current - soft_distance) / soft.max(EPSILON)).exp()
            } else {
                current
            };
            current.min(softened).min(soft_ceiling(sum))
        } else {
            current
        };

        let factor = clamped / sum.max(EPSILON);
        let squash = settings.squash.clamp(0.0, 1.0);
        let stretch = settings.stretch.clamp(0.0, 1.0);
        let up = factor.max(1.0);
        let down = if factor < 1.0 {
            1.0 + (factor - 1.0) * squash
        } else {
            1.0
        };
        let scale = 1.0 + (up * down - 1.0) * stretch;

        let limit = settings.stretch_limit.unwrap_or(sum).max(0.0);
        let lengths = rest_lengths
            .iter()
            .enumerate()
            .map(|(i, rest)| (rest * scale * settings.segment_scale(i)).min(rest + limit))
            .collect();

        Self {
            chain_length: sum,
            current_distance: current,
            soft_distance,
            clamped_distance: clamped,
            stretch_factor: factor,
            scale,
            lengths,
        }
    }
}

/// Handles to the stretch network of one chain.
#[derive(Debug, Clone)]
pub struct StretchRig {
    pub squash: Plug,
    pub stretch: Plug,
    pub stretch_limit: Plug,
    pub soft_ik: Plug,
    pub segment_scales: Vec<Plug>,
    /// Live length of each segment, already limited.
    pub lengths: Vec<Plug>,
    pub rest_lengths: Vec<f32>,
    pub current_distance: Plug,
    pub clamped_distance: Plug,
    /// Joint translate axes driven by `lengths`, one per segment.
    pub driven_axes: Vec<(NodeId, Axis, Sign)>,
}

impl StretchRig {
    pub fn chain_length(&self) -> f32 {
        self.rest_lengths.iter().sum()
    }
}

pub struct StretchSolver;

impl StretchSolver {
    /// Wires stretch, squash and soft IK onto `chain`.
    ///
    /// Attributes are created on `end_controller`. Each segment length drives
    /// the translate axis of the child joint that carries it in the rest
    /// pose, and `ik_handle_target` is placed along the root-to-end line at
    /// the soft-clamped distance.
    pub fn build_stretchy_chain(
        scene: &mut Scene,
        chain: &Chain,
        ik_handle_target: NodeId,
        root_controller: NodeId,
        end_controller: NodeId,
    ) -> RigResult<StretchRig> {
        Self::build_with(
            scene,
            chain,
            ik_handle_target,
            root_controller,
            end_controller,
            &StretchSettings::default(),
        )
    }

    /// Same as [`build_stretchy_chain`](Self::build_stretchy_chain) with
    /// `settings` as the attribute defaults.
    pub fn build_with(
        scene: &mut Scene,
        chain: &Chain,
        ik_handle_target: NodeId,
        root_controller: NodeId,
        end_controller: NodeId,
        settings: &StretchSettings,
    ) -> RigResult<StretchRig> {
        scene.transaction(|scene| {
            Self::wire(
                scene,
                chain,
                ik_handle_target,
                root_controller,
                end_controller,
                settings,
            )
        })
    }

    fn wire(
        scene: &mut Scene,
        chain: &Chain,
        ik_handle_target: NodeId,
        root_controller: NodeId,
        end_controller: NodeId,
        settings: &StretchSettings,
    ) -> RigResult<StretchRig> {
        chain.require_joints("build_stretchy_chain", 2)?;
        for node in [ik_handle_target, root_controller, end_controller] {
            scene.transforms().get(node)?;
        }

        let rest_lengths = chain.segment_lengths(scene)?;
        let sum: f32 = rest_lengths.iter().sum();
        if sum < EPSILON {
            return Err(RigError::DegenerateChain {
                chain: chain.name().to_string(),
                length: sum,
            });
        }

        let squash = scene.add_attribute(
            end_controller,
            AttributeSpec::float("squash", settings.squash).with_range(0.0, 1.0),
        )?;
        let stretch = scene.add_attribute(
            end_controller,
            AttributeSpec::float("stretch", settings.stretch).with_range(0.0, 1.0),
        )?;
        let stretch_limit = scene.add_attribute(
            end_controller,
            AttributeSpec::float("stretchLimit", settings.stretch_limit.unwrap_or(sum))
                .with_min(0.0),
        )?;
        let soft_ik = scene.add_attribute(
            end_controller,
            AttributeSpec::float("softIK", settings.soft_ik).with_range(0.0, 100.0),
        )?;
        let segment_scales = (0..rest_lengths.len())
            .map(|i| {
                scene.add_attribute(
                    end_controller,
                    AttributeSpec::float(format!("segmentScale{i}"), settings.segment_scale(i))
                        .with_min(MIN_SEGMENT_SCALE),
                )
            })
            .collect::<RigResult<Vec<_>>>()?;

        let root = Plug::WorldPosition(root_controller);
        let end = Plug::WorldPosition(end_controller);
        let current = scene.distance(root, end)?;

        // Soft IK
        let soft = scene.multiply(soft_ik, sum / 100.0)?;
        let soft_distance = scene.subtract(sum, soft)?;
        let overshoot = scene.subtract(current, soft_distance)?;
        let safe_soft = scene.maximum(soft, EPSILON)?;
        let ratio = scene.divide(overshoot, safe_soft)?;
        let exponent = scene.multiply(ratio, -1.0)?;
        let falloff = scene.power(std::f32::consts::E, exponent)?;
        let eased = scene.multiply(soft, falloff)?;
        let eased = scene.subtract(sum, eased)?;
        let softened = scene.condition(current, CompareOp::Greater, soft_distance, eased, current)?;
        let softened = scene.minimum(current, softened)?;
        let softened = scene.minimum(softened, soft_ceiling(sum))?;
        let clamped = scene.condition(soft, CompareOp::Greater, 0.0, softened, current)?;

        // Squash and stretch
        let factor = scene.divide(clamped, sum)?;
        let up = scene.maximum(factor, 1.0)?;
        let squashed = scene.blend2(1.0, factor, squash)?;
        let down = scene.condition(factor, CompareOp::Less, 1.0, squashed, 1.0)?;
        let combined = scene.multiply(up, down)?;
        let scale = scene.blend2(1.0, combined, stretch)?;

        let mut lengths = Vec::with_capacity(rest_lengths.len());
        let mut driven_axes = Vec::with_capacity(rest_lengths.len());
        for (i, ((_, child), rest)) in chain.segments().zip(&rest_lengths).enumerate() {
            let scaled = scene.multiply(scale, *rest)?;
            let scaled = scene.multiply(scaled, segment_scales[i])?;
            let limit = scene.add([stretch_limit.into(), (*rest).into()])?;
            let length = scene.minimum(scaled, limit)?;

            let (axis, sign) = Axis::dominant(scene.rest_transform(child)?.translation);
            let signed = match sign {
                Sign::Positive => length,
                Sign::Negative => scene.multiply(length, -1.0)?,
            };
            scene.connect(signed, Plug::Channel(child, Channel::TranslateAxis(axis)))?;

            lengths.push(length);
            driven_axes.push((child, axis, sign));
        }

        // The IK target never sits further than the clamped reach.
        let offset = scene.subtract(end, root)?;
        let direction = scene.normalize(offset)?;
        let reach = scene.multiply(direction, clamped)?;
        let target = scene.add([root.into(), reach.into()])?;
        let local = scene.transform_point(Plug::ParentInverse(ik_handle_target), target)?;
        scene.connect(local, Plug::translate(ik_handle_target))?;

        log::debug!(
            "stretchy chain `{}`: {} segments, rest length {sum}",
            chain.name(),
            rest_lengths.len()
        );

        Ok(StretchRig {
            squash,
            stretch,
            stretch_limit,
            soft_ik,
            segment_scales,
            lengths,
            rest_lengths,
            current_distance: current,
            clamped_distance: clamped,
            driven_axes,
        })
    }
}
