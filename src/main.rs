use glam::Vec3;
use rig_graph::limb::{GuideInput, LimbAssembler, LimbConfig, LimbRig, Side};
use rig_graph::ribbon::TwistMode;
use rig_graph::scene::Scene;
use rig_graph::{RigResult, SoftIkState, StretchSettings};

const FRAMES: u32 = 24;

struct Demo {
    scene: Scene,
    arms: Vec<LimbRig>,
}

impl Demo {
    fn new() -> RigResult<Self> {
        let mut scene = Scene::new();
        let left = GuideInput::new(
            vec![
                Vec3::new(2.0, 14.0, 0.0),
                Vec3::new(7.0, 14.0, -1.0),
                Vec3::new(12.0, 14.0, 0.0),
            ],
            Side::Left,
        );
        let config = LimbConfig::new("arm")
            .with_fk_ik(1.0)
            .with_stretch(StretchSettings::default().with_soft_ik(5.0))
            .with_ribbons(5)
            .with_twist_mode(TwistMode::Infinite);

        let arms = vec![
            LimbAssembler::build(&mut scene, &left, &config)?,
            LimbAssembler::build(&mut scene, &left.mirrored(), &config)?,
        ];
        log::info!(
            "built {} transforms, {} expression nodes, {} connections",
            scene.transforms().len(),
            scene.expressions().len(),
            scene.connection_count()
        );
        for arm in &arms {
            let settings: Vec<&str> = scene
                .attributes()
                .on(arm.controls.settings)
                .map(|(_, attribute)| attribute.spec.name.as_str())
                .collect();
            log::debug!("{} settings: {}", arm.name, settings.join(", "));
        }
        Ok(Self { scene, arms })
    }

    /// Pulls each hand from 80% to 130% of the arm length.
    fn update(&mut self, frame: u32) -> RigResult<()> {
        let t = frame as f32 / (FRAMES - 1) as f32;
        for arm in &self.arms {
            let root = self.scene.world_position(arm.deform.root())?;
            let direction = match arm.side {
                Side::Right => Vec3::NEG_X,
                Side::Left | Side::Center => Vec3::X,
            };
            let reach = arm.stretch.chain_length() * (0.8 + 0.5 * t);
            let parent = self.scene.world_matrix(arm.root)?.inverse();
            let target = parent.transform_point3(root + direction * reach);
            self.scene.set_translation(arm.controls.ik_end, target)?;
        }
        Ok(())
    }

    fn report(&mut self, frame: u32) -> RigResult<()> {
        for arm in &self.arms {
            let wrist = self.scene.world_position(arm.deform.end())?;
            let distance = self.scene.evaluate_f32(arm.stretch.current_distance)?;
            let mut thinnest = f32::MAX;
            for ribbon in &arm.ribbons {
                for plug in &ribbon.thickness {
                    thinnest = thinnest.min(self.scene.evaluate_f32(*plug)?);
                }
            }
            let expected = SoftIkState::solve(
                &arm.stretch.rest_lengths,
                distance,
                &StretchSettings::default().with_soft_ik(5.0),
            );
            log::info!(
                "frame {frame:2} {}: wrist {wrist:.3}, reach {distance:.3} -> {:.3}, thinnest {thinnest:.3}",
                arm.name,
                expected.clamped_distance,
            );
        }
        Ok(())
    }
}

fn main() -> RigResult<()> {
    env_logger::init();

    let mut demo = Demo::new()?;
    for frame in 0..FRAMES {
        demo.update(frame)?;
        demo.report(frame)?;
    }
    let stats = demo.scene.stats();
    log::info!(
        "{} expression evaluations, {} cache hits",
        stats.expression_evaluations,
        stats.cache_hits
    );
    Ok(())
}
