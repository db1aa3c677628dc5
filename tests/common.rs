#![allow(dead_code)]

use glam::Vec3;
use skelanim::*;
use std::rc::Rc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `Hips` at the origin, `Spine` and `Head` stacked above it, one leg on each side.
pub fn humanoid() -> Rc<Skeleton> {
    let mut raw = RawSkeleton::new();
    raw.add_bone("Hips", None, BoneTransform::IDENTITY).unwrap();
    raw.add_bone("Spine", Some("Hips"), BoneTransform::from_position(Vec3::Y))
        .unwrap();
    raw.add_bone("Head", Some("Spine"), BoneTransform::from_position(Vec3::Y))
        .unwrap();
    raw.add_bone("LeftLeg", Some("Hips"), BoneTransform::from_position(Vec3::new(-0.2, -0.5, 0.0)))
        .unwrap();
    raw.add_bone("RightLeg", Some("Hips"), BoneTransform::from_position(Vec3::new(0.2, -0.5, 0.0)))
        .unwrap();
    return Rc::new(raw.build().unwrap());
}

/// One second clip holding `Hips` at `position`.
pub fn hold(name: &str, position: Vec3) -> Rc<Animation> {
    return Rc::new(test_utils::linear_clip(name, "Hips", position, position, 1.0));
}

/// Clip moving `Hips` from `from` to `to` over `duration` seconds.
pub fn moving(name: &str, from: Vec3, to: Vec3, duration: f32) -> Rc<Animation> {
    return Rc::new(test_utils::linear_clip(name, "Hips", from, to, duration));
}

pub fn hips(controller: &AnimationController) -> Vec3 {
    return controller.evaluate_current_pose().bone_transform("Hips").position;
}
