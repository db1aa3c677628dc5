use glam::{Quat, Vec2, Vec3};
use skelanim::*;
use std::rc::Rc;
use wasm_bindgen_test::*;

mod common;

fn walk_controller() -> AnimationController {
    common::init_logger();
    let mut controller = AnimationController::new();
    controller.initialize(Rc::new(test_utils::two_bone_skeleton()));
    controller
        .add_animation("Walk", Rc::new(test_utils::walk_animation()))
        .unwrap();
    return controller;
}

#[test]
#[wasm_bindgen_test]
fn test_walk_end_to_end() {
    let mut controller = walk_controller();
    controller.play("Walk", 0.0).unwrap();
    controller.update(0.5);
    let pose = controller.evaluate_current_pose();
    assert!(pose.bone_transform("Root").position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
}

#[test]
#[wasm_bindgen_test]
fn test_layer_fade_out_removal() {
    let mut controller = walk_controller();
    controller.play("Walk", 0.0).unwrap();
    controller.update(1.0);
    assert!(controller.has_layer("Walk"));
    controller.stop("Walk", 0.5);
    controller.update(0.6);
    assert!(!controller.has_layer("Walk"));
}

#[test]
#[wasm_bindgen_test]
fn test_trigger_lives_one_update() {
    let mut controller = walk_controller();
    controller.set_trigger("Jump");
    controller.update(1.0 / 60.0);
    assert!(!controller.get_trigger("Jump"));
    assert_eq!(controller.get_parameter("Jump"), Some(AnimationParameter::Trigger(false)));
}

#[test]
#[wasm_bindgen_test]
fn test_1d_boundary_clamping() {
    let mut controller = walk_controller();
    let mut tree = BlendTree::new(BlendTreeType::Simple1D);
    tree.set_parameter("Speed");
    for threshold in [0.0, 2.0, 6.0] {
        tree.add_motion(common::hold("Clip", Vec3::ZERO), threshold, "").unwrap();
    }

    let cases = [(-5.0, [1.0, 0.0, 0.0]), (10.0, [0.0, 0.0, 1.0]), (4.0, [0.0, 0.5, 0.5])];
    for (speed, expected) in cases {
        controller.set_float("Speed", speed);
        let weights = tree.node_weights(&controller);
        for (weight, expected) in weights.iter().zip(expected) {
            assert!((weight - expected).abs() < 1e-5, "speed {}: {:?}", speed, weights);
        }
    }

    let mut cartesian = BlendTree::new(BlendTreeType::FreeformCartesian2D);
    cartesian.set_parameters("X", "Y");
    cartesian.add_motion_2d(common::hold("A", Vec3::ZERO), Vec2::X, "A").unwrap();
    cartesian.add_motion_2d(common::hold("B", Vec3::ZERO), -Vec2::X, "B").unwrap();
    controller.set_float("X", 1.0);
    controller.set_float("Y", 0.0);
    assert_eq!(cartesian.node_weights(&controller), vec![1.0, 0.0]);
}

#[test]
#[wasm_bindgen_test]
fn test_pose_identities() {
    let skeleton = Rc::new(test_utils::two_bone_skeleton());
    let mut a = Pose::new(&skeleton);
    a.set_bone_transform(
        "Root",
        BoneTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.7), Vec3::splat(1.5)),
    );
    let mut additive = Pose::new(&skeleton);
    additive.set_bone_transform("Root", BoneTransform::new(Vec3::X, Quat::from_rotation_x(0.2), Vec3::ONE));

    for weight in [0.0, 0.3, 0.5, 1.0] {
        assert!(Pose::blend(&a, &a, weight).abs_diff_eq(&a, 1e-5));
    }
    assert!(Pose::blend_additive(&a, &additive, 0.0).abs_diff_eq(&a, 0.0));

    let full = Pose::blend_additive(&a, &additive, 1.0);
    for name in skeleton.bone_names() {
        let expected = a.bone_transform(name) + additive.bone_transform(name);
        assert!(full.bone_transform(name).abs_diff_eq(&expected, 1e-6));
    }
}

#[test]
#[wasm_bindgen_test]
fn test_event_windows() {
    let mut clip = Animation::new("Clip");
    clip.set_duration(1.0);
    clip.add_event(AnimationEvent::new("Mid", 0.5, AnimationEventType::Generic));
    clip.add_event(AnimationEvent::new("Start", 0.05, AnimationEventType::Generic));

    let names = |events: Vec<AnimationEvent>| events.into_iter().map(|e| e.name).collect::<Vec<_>>();
    assert_eq!(names(clip.triggered_events(0.3, 0.6, false)), vec!["Mid"]);
    assert!(clip.triggered_events(0.6, 0.9, false).is_empty());
    assert_eq!(names(clip.triggered_events(0.9, 0.1, true)), vec!["Start"]);
}

#[test]
#[wasm_bindgen_test]
fn test_transition_gating() {
    let mut controller = walk_controller();
    let transition = TransitionBuilder::new("Idle", "Run")
        .exit_time(0.8)
        .when_float_greater("Speed", 1.0)
        .build();

    controller.set_float("Speed", 5.0);
    assert!(!transition.can_transition(&controller, 0.5));
    assert!(transition.can_transition(&controller, 0.85));
    controller.set_float("Speed", 0.0);
    assert!(!transition.can_transition(&controller, 0.85));
}
