use glam::{Mat3, Mat4, Quat, Vec3};
use rig_graph::blend::{matrix_switch, SwitchChannels};
use rig_graph::ik::{Chain, OrientAxes, OrientationSolver, StretchSolver};
use rig_graph::limb::{GuideInput, LimbAssembler, LimbConfig};
use rig_graph::math::{is_orthonormal, Axis, Sign};
use rig_graph::ribbon::RibbonDeformer;
use rig_graph::scene::{AttributeSpec, Plug, Scene};
use rig_graph::{ErrorKind, Transform};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mirror(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

fn world_basis(scene: &mut Scene, joint: rig_graph::NodeId) -> Mat3 {
    Mat3::from_mat4(scene.world_matrix(joint).unwrap())
}

const CHAINS: [[Vec3; 4]; 3] = [
    [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(3.0, 0.5, -0.5),
        Vec3::new(6.0, 0.0, 0.0),
        Vec3::new(7.0, -1.0, 0.5),
    ],
    [
        Vec3::new(1.0, 10.0, 0.0),
        Vec3::new(1.5, 6.0, 1.0),
        Vec3::new(1.2, 2.0, 0.0),
        Vec3::new(1.4, 0.0, 2.0),
    ],
    [
        Vec3::new(2.0, 14.0, 0.0),
        Vec3::new(6.0, 13.0, -2.0),
        Vec3::new(9.0, 14.5, 1.0),
        Vec3::new(11.0, 14.0, 1.0),
    ],
];

#[test]
fn oriented_bases_are_right_handed_and_orthonormal() {
    init_logger();
    let conventions = [
        OrientAxes::new(Axis::X, Axis::Y, Vec3::Y),
        OrientAxes::new(Axis::Y, Axis::Z, Vec3::Z),
        OrientAxes::new(Axis::Z, Axis::X, Vec3::X).with_reverse(Sign::Negative, Sign::Positive),
    ];
    for positions in CHAINS {
        for axes in conventions {
            let mut scene = Scene::new();
            let chain = Chain::create(&mut scene, "chain", &positions, None).unwrap();
            OrientationSolver::orient_chain(&mut scene, &chain, &axes).unwrap();

            for (i, joint) in chain.joints().iter().enumerate() {
                let basis = world_basis(&mut scene, *joint);
                assert!(is_orthonormal(basis, 1e-4), "joint {i} of {positions:?}");
                assert!(basis.determinant() > 0.0);
                assert!(scene
                    .world_position(*joint)
                    .unwrap()
                    .abs_diff_eq(positions[i], 1e-4));
            }
            for (i, (joint, _)) in chain.segments().enumerate() {
                let basis = world_basis(&mut scene, joint);
                let aim = basis * axes.local_aim();
                let expected = (positions[i + 1] - positions[i]).normalize();
                assert!(aim.abs_diff_eq(expected, 1e-4));
            }
        }
    }
}

#[test]
fn orientation_is_idempotent() {
    let mut scene = Scene::new();
    let chain = Chain::create(&mut scene, "spine", &CHAINS[1], None).unwrap();
    let axes = OrientAxes::new(Axis::Y, Axis::X, Vec3::Z);

    OrientationSolver::orient_chain(&mut scene, &chain, &axes).unwrap();
    let first: Vec<Quat> = chain
        .joints()
        .iter()
        .map(|j| scene.rest_transform(*j).unwrap().rotation)
        .collect();
    OrientationSolver::orient_chain(&mut scene, &chain, &axes).unwrap();
    for (joint, before) in chain.joints().iter().zip(first) {
        let after = scene.rest_transform(*joint).unwrap().rotation;
        assert!(after.abs_diff_eq(before, 1e-5) || after.abs_diff_eq(-before, 1e-5));
    }
}

#[test]
fn mirrored_chains_get_mirrored_bases() {
    init_logger();
    for positions in CHAINS {
        let mut scene = Scene::new();
        let left = Chain::create(&mut scene, "L_arm", &positions, None).unwrap();
        let mirrored: Vec<Vec3> = positions.iter().copied().map(mirror).collect();
        let right = Chain::create(&mut scene, "R_arm", &mirrored, None).unwrap();

        let axes = OrientAxes::new(Axis::X, Axis::Y, Vec3::Y);
        OrientationSolver::orient_chain(&mut scene, &left, &axes).unwrap();
        OrientationSolver::orient_chain(&mut scene, &right, &axes.mirrored(Sign::Negative))
            .unwrap();

        for (l, r) in left.joints().iter().zip(right.joints()) {
            let lb = world_basis(&mut scene, *l);
            let rb = world_basis(&mut scene, *r);
            assert!(rb.determinant() > 0.0);
            for k in 0..3 {
                let expected = -mirror(lb.col(k));
                assert!(
                    rb.col(k).abs_diff_eq(expected, 1e-4),
                    "axis {k}: {:?} vs {:?}",
                    rb.col(k),
                    expected
                );
            }
        }
    }
}

struct Leg {
    scene: Scene,
    end_ctrl: rig_graph::NodeId,
    lengths: Vec<Plug>,
    stretch: Plug,
    squash: Plug,
    soft_ik: Plug,
    stretch_limit: Plug,
    clamped: Plug,
}

impl Leg {
    fn new() -> Self {
        let mut scene = Scene::new();
        let chain = Chain::create(
            &mut scene,
            "leg",
            &[Vec3::ZERO, Vec3::new(0.0, -5.0, 0.0), Vec3::new(0.0, -10.0, 0.0)],
            None,
        )
        .unwrap();
        OrientationSolver::orient_chain(
            &mut scene,
            &chain,
            &OrientAxes::new(Axis::X, Axis::Z, Vec3::Z),
        )
        .unwrap();
        let root_ctrl = scene.create_transform("hip_ctrl", None).unwrap();
        let end_ctrl = scene
            .create_transform_at("foot_ctrl", None, Mat4::from_translation(Vec3::NEG_Y * 10.0))
            .unwrap();
        let handle = scene.create_transform("ik_handle", None).unwrap();
        let rig = StretchSolver::build_stretchy_chain(&mut scene, &chain, handle, root_ctrl, end_ctrl)
            .unwrap();
        Self {
            scene,
            end_ctrl,
            lengths: rig.lengths.clone(),
            stretch: rig.stretch,
            squash: rig.squash,
            soft_ik: rig.soft_ik,
            stretch_limit: rig.stretch_limit,
            clamped: rig.clamped_distance,
        }
    }

    fn pull_to(&mut self, distance: f32) {
        self.scene
            .set_translation(self.end_ctrl, Vec3::NEG_Y * distance)
            .unwrap();
    }

    fn lengths(&mut self) -> Vec<f32> {
        self.lengths
            .clone()
            .into_iter()
            .map(|plug| self.scene.evaluate_f32(plug).unwrap())
            .collect()
    }
}

fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-4, "{actual:?} != {expected:?}");
    }
}

#[test]
fn stretch_scenario_end_to_end() {
    init_logger();
    let mut leg = Leg::new();

    leg.pull_to(12.0);
    assert_close(&leg.lengths(), &[6.0, 6.0]);

    leg.pull_to(8.0);
    assert_close(&leg.lengths(), &[5.0, 5.0]);
    leg.scene.set_attribute(leg.squash, 1.0).unwrap();
    assert_close(&leg.lengths(), &[4.0, 4.0]);
}

#[test]
fn zero_stretch_ignores_the_controller() {
    let mut leg = Leg::new();
    leg.scene.set_attribute(leg.stretch, 0.0).unwrap();
    leg.scene.set_attribute(leg.squash, 1.0).unwrap();
    for distance in [0.5, 6.0, 10.0, 14.0, 100.0] {
        leg.pull_to(distance);
        assert_close(&leg.lengths(), &[5.0, 5.0]);
    }
}

#[test]
fn full_stretch_sum_tracks_distance_until_the_limit() {
    let mut leg = Leg::new();
    leg.scene.set_attribute(leg.stretch_limit, 4.0).unwrap();
    for distance in [10.0, 11.0, 13.5, 18.0, 30.0] {
        leg.pull_to(distance);
        let sum: f32 = leg.lengths().iter().sum();
        let expected = f32::min(distance, 10.0 + 2.0 * 4.0);
        assert!((sum - expected).abs() < 1e-3, "{distance}: {sum} != {expected}");
    }
}

#[test]
fn soft_ik_never_reaches_full_extension() {
    let mut leg = Leg::new();
    leg.scene.set_attribute(leg.soft_ik, 20.0).unwrap();
    leg.scene.set_attribute(leg.stretch, 0.0).unwrap();

    let mut previous = 0.0;
    for distance in [7.0, 9.0, 10.0, 11.0, 14.0, 20.0, 30.0, 100.0, 1000.0] {
        leg.pull_to(distance);
        let clamped = leg.scene.evaluate_f32(leg.clamped).unwrap();
        assert!(clamped < 10.0, "{distance}: {clamped}");
        assert!(clamped <= distance + 1e-5);
        assert!(clamped >= previous);
        previous = clamped;
    }
    assert!(previous > 9.99);
}

#[test]
fn switch_endpoints_hold_for_any_cutoff() {
    init_logger();
    for use_cutoff in [false, true] {
        let mut scene = Scene::new();
        let a = scene
            .create_transform_with(
                "fk",
                None,
                Transform::new(
                    Vec3::new(1.0, 2.0, 3.0),
                    Quat::from_euler(glam::EulerRot::XYZ, 0.3, -0.7, 1.2),
                    Vec3::splat(1.5),
                ),
            )
            .unwrap();
        let b = scene
            .create_transform_with(
                "ik",
                None,
                Transform::from_translation_rotation(Vec3::new(-4.0, 0.0, 2.0), Quat::from_rotation_z(2.5)),
            )
            .unwrap();
        let hips = scene
            .create_transform_with(
                "hips",
                None,
                Transform::from_translation_rotation(Vec3::new(0.0, 9.0, 0.0), Quat::from_rotation_y(0.9)),
            )
            .unwrap();
        let driven = scene.create_transform("bind", Some(hips)).unwrap();
        let settings = scene.create_transform("settings", None).unwrap();
        let weight = scene
            .add_attribute(settings, AttributeSpec::float("fkIk", 0.0).with_range(0.0, 1.0))
            .unwrap();

        let cutoff = use_cutoff.then_some(hips);
        matrix_switch(
            &mut scene,
            Plug::WorldMatrix(a),
            Plug::WorldMatrix(b),
            driven,
            weight,
            SwitchChannels::ALL,
            cutoff,
        )
        .unwrap();

        let expected_a = scene.world_matrix(a).unwrap();
        assert!(scene.world_matrix(driven).unwrap().abs_diff_eq(expected_a, 1e-4));
        scene.set_attribute(weight, 1.0).unwrap();
        let expected_b = scene.world_matrix(b).unwrap();
        assert!(scene.world_matrix(driven).unwrap().abs_diff_eq(expected_b, 1e-4));
    }
}

fn ribbon_scene() -> (Scene, rig_graph::RibbonRig) {
    let mut scene = Scene::new();
    let start = scene.create_transform("elbow", None).unwrap();
    let end = scene
        .create_transform_at("wrist", None, Mat4::from_translation(Vec3::X * 10.0))
        .unwrap();
    let rig = RibbonDeformer::build_ribbon(&mut scene, start, end, 5, Vec3::Y).unwrap();
    (scene, rig)
}

fn sample_scales(scene: &mut Scene, rig: &rig_graph::RibbonRig) -> Vec<Vec3> {
    rig.deformer_joints()
        .iter()
        .map(|joint| scene.local_transform(*joint).unwrap().scale)
        .collect()
}

#[test]
fn ribbon_thins_in_the_middle_when_stretched() {
    init_logger();
    let (mut scene, rig) = ribbon_scene();
    scene.set_attribute(rig.preserve_volume, 1.0).unwrap();
    scene.set_attribute(rig.volume_factor, 1.0).unwrap();
    scene.set_translation(rig.end_rail, Vec3::X * 20.0).unwrap();

    let scales = sample_scales(&mut scene, &rig);
    assert!(scales[0].abs_diff_eq(Vec3::ONE, 1e-5));
    assert!(scales[4].abs_diff_eq(Vec3::ONE, 1e-5));
    assert!(scales[2].y < 1.0 && scales[2].z < 1.0);
    assert!((scales[2].x - 1.0).abs() < 1e-5);
    assert!(scales[2].y < scales[1].y);
}

#[test]
fn ribbon_rails_keep_identity_scale() {
    let (mut scene, rig) = ribbon_scene();
    for (preserve, factor, length) in [(0.0, 3.0, 4.0), (1.0, 0.0, 25.0), (0.5, 2.5, 13.0)] {
        scene.set_attribute(rig.preserve_volume, preserve).unwrap();
        scene.set_attribute(rig.volume_factor, factor).unwrap();
        scene.set_translation(rig.end_rail, Vec3::X * length).unwrap();
        let scales = sample_scales(&mut scene, &rig);
        assert!(scales[0].abs_diff_eq(Vec3::ONE, 1e-5));
        assert!(scales[4].abs_diff_eq(Vec3::ONE, 1e-5));
    }
}

#[test]
fn unstretched_ribbon_is_identity() {
    let (mut scene, rig) = ribbon_scene();
    scene.set_attribute(rig.volume_factor, 4.0).unwrap();
    for scale in sample_scales(&mut scene, &rig) {
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-5));
    }
}

#[test]
fn build_errors_carry_their_kind() {
    let mut scene = Scene::new();
    let a = scene.create_transform("a", None).unwrap();
    let b = scene.create_transform("b", Some(a)).unwrap();

    let err = scene.set_parent(a, Some(b), true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CyclicConnection);

    let err = scene
        .connect(Plug::WorldPosition(a), Plug::rotate(b))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AttributeTypeMismatch);

    let err = scene.world_matrix(rig_graph::NodeId(99)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingReference);

    let err = RibbonDeformer::build_ribbon(&mut scene, a, b, 1, Vec3::Y).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientResolution);

    let err = RibbonDeformer::build_ribbon(&mut scene, a, b, 4, Vec3::Y).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateChain);
}

#[test]
fn limb_builds_from_a_decoded_guide() {
    init_logger();
    let guide: GuideInput = serde_json::from_str(
        r#"{
            "positions": [[-2.0, 14.0, 0.0], [-7.0, 14.0, -1.0], [-12.0, 14.0, 0.0]],
            "side": "Right"
        }"#,
    )
    .unwrap();
    let mut scene = Scene::new();
    let rig = LimbAssembler::build(&mut scene, &guide, &LimbConfig::new("arm").with_ribbons(3))
        .unwrap();

    assert_eq!(rig.name, "R_arm");
    assert_eq!(rig.deformer_joints().len(), 7);
    for (joint, position) in rig.deform.joints().iter().zip(&guide.positions) {
        assert!(scene.world_position(*joint).unwrap().abs_diff_eq(*position, 1e-3));
    }

    let fk_ik = rig.handle("fk_ik").unwrap();
    scene.set_attribute(fk_ik, 1.0).unwrap();
    scene
        .set_translation(rig.controls.ik_end, Vec3::new(-14.0, 14.0, 0.0))
        .unwrap();
    let wrist = scene.world_position(rig.deform.end()).unwrap();
    assert!(wrist.abs_diff_eq(Vec3::new(-14.0, 14.0, 0.0), 1e-3));
}

#[test]
fn scene_can_move_across_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Scene>();
    assert_send::<rig_graph::LimbRig>();
}
