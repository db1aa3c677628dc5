//!
//! Fixtures shared by unit tests, integration tests and demos.
//!

use glam::Vec3;

use crate::animation::Animation;
use crate::pose::BoneTransform;
use crate::skeleton::{RawSkeleton, Skeleton};

/// Skeleton `{Root, Child}`, `Child` sits one unit above `Root`.
pub fn two_bone_skeleton() -> Skeleton {
    let mut raw = RawSkeleton::new();
    raw.add_bone("Root", None, BoneTransform::IDENTITY).unwrap();
    raw.add_bone("Child", Some("Root"), BoneTransform::from_position(Vec3::Y))
        .unwrap();
    return raw.build().unwrap();
}

/// Clip moving `bone` linearly from `from` to `to` over `duration` seconds.
pub fn linear_clip(name: &str, bone: &str, from: Vec3, to: Vec3, duration: f32) -> Animation {
    let mut anim = Animation::new(name);
    anim.add_position_keyframe(bone, 0.0, from);
    anim.add_position_keyframe(bone, duration, to);
    return anim;
}

/// "Walk": `Root` goes from the origin to `(1, 0, 0)` in one second.
pub fn walk_animation() -> Animation {
    return linear_clip("Walk", "Root", Vec3::ZERO, Vec3::X, 1.0);
}
