//!
//! Bone transform value type and the pose blending algebra.
//!

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::ops::{Add, Mul};
use std::rc::{Rc, Weak};

use crate::base::{BoneIndex, DeterministicState, WEIGHT_EPSILON};
use crate::math::quat_slerp;
use crate::skeleton::Skeleton;

/// Local transform of a single bone: position, rotation and scale.
///
/// The rotation is kept normalized after every interpolation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> BoneTransform {
        return BoneTransform::IDENTITY;
    }
}

impl BoneTransform {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: BoneTransform = BoneTransform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> BoneTransform {
        return BoneTransform {
            position,
            rotation,
            scale,
        };
    }

    #[inline]
    pub fn from_position(position: Vec3) -> BoneTransform {
        return BoneTransform {
            position,
            ..BoneTransform::IDENTITY
        };
    }

    /// Decomposes an affine matrix. Shearing is lost.
    pub fn from_matrix(matrix: &Mat4) -> BoneTransform {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        return BoneTransform {
            position,
            rotation: rotation.normalize(),
            scale,
        };
    }

    /// Composes `T * R * S`.
    #[inline]
    pub fn to_matrix(&self) -> Mat4 {
        return Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position);
    }

    /// Component lerp for position and scale, shortest-arc slerp for rotation.
    pub fn lerp(&self, other: &BoneTransform, t: f32) -> BoneTransform {
        return BoneTransform {
            position: self.position.lerp(other.position, t),
            rotation: quat_slerp(self.rotation, other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        };
    }

    /// Inverse transform, exact when the scale is uniform.
    pub fn inverse(&self) -> BoneTransform {
        let rotation = self.rotation.inverse();
        let scale = self.scale.recip();
        return BoneTransform {
            position: rotation * (-self.position * scale),
            rotation,
            scale,
        };
    }

    pub fn abs_diff_eq(&self, other: &BoneTransform, max_abs_diff: f32) -> bool {
        let same_rotation = self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
            || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff);
        return self.position.abs_diff_eq(other.position, max_abs_diff)
            && same_rotation
            && self.scale.abs_diff_eq(other.scale, max_abs_diff);
    }
}

/// Additive composition: positions add, rotations multiply, scales multiply.
impl Add for BoneTransform {
    type Output = BoneTransform;

    fn add(self, rhs: BoneTransform) -> BoneTransform {
        return BoneTransform {
            position: self.position + rhs.position,
            rotation: self.rotation * rhs.rotation,
            scale: self.scale * rhs.scale,
        };
    }
}

/// Weighted scaling toward the identity transform.
impl Mul<f32> for BoneTransform {
    type Output = BoneTransform;

    fn mul(self, weight: f32) -> BoneTransform {
        if weight <= 0.0 {
            return BoneTransform {
                position: Vec3::ZERO,
                ..BoneTransform::IDENTITY
            };
        }
        if weight >= 1.0 {
            return self;
        }
        return BoneTransform {
            position: self.position * weight,
            rotation: quat_slerp(Quat::IDENTITY, self.rotation, weight),
            scale: Vec3::ONE.lerp(self.scale, weight),
        };
    }
}

///
/// A set of per-bone local transforms at one instant.
///
/// Entries are keyed by bone name. The pose refers to its skeleton weakly: the skeleton
/// provides bind transforms for bones the pose does not hold, and its lifetime is managed
/// by whoever built it.
///
#[derive(Debug, Clone, Default)]
pub struct Pose {
    skeleton: Option<Weak<Skeleton>>,
    transforms: HashMap<String, BoneTransform, DeterministicState>,
}

impl Pose {
    /// Creates a pose holding the bind transform of every bone of `skeleton`.
    pub fn new(skeleton: &Rc<Skeleton>) -> Pose {
        let mut pose = Pose {
            skeleton: Some(Rc::downgrade(skeleton)),
            transforms: HashMap::with_capacity_and_hasher(skeleton.num_bones(), DeterministicState::new()),
        };
        pose.reset_to_bind_pose();
        return pose;
    }

    /// Creates a pose without skeleton and without bones.
    pub fn empty() -> Pose {
        return Pose::default();
    }

    /// Gets the skeleton of `Pose`, if it is still alive.
    #[inline]
    pub fn skeleton(&self) -> Option<Rc<Skeleton>> {
        return self.skeleton.as_ref().and_then(|s| s.upgrade());
    }

    /// Sets the skeleton of `Pose`. Existing entries are kept.
    #[inline]
    pub fn set_skeleton(&mut self, skeleton: &Rc<Skeleton>) {
        self.skeleton = Some(Rc::downgrade(skeleton));
    }

    /// Gets the number of bones held by `Pose`.
    #[inline]
    pub fn bone_count(&self) -> usize {
        return self.transforms.len();
    }

    #[inline]
    pub fn has_bone(&self, name: &str) -> bool {
        return self.transforms.contains_key(name);
    }

    /// Iterates `(bone name, transform)` pairs in an unspecified but deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneTransform)> {
        return self.transforms.iter().map(|(name, t)| (name.as_str(), t));
    }

    pub fn bone_names(&self) -> Vec<&str> {
        return self.transforms.keys().map(|name| name.as_str()).collect();
    }

    pub fn set_bone_transform(&mut self, name: &str, transform: BoneTransform) {
        if let Some(entry) = self.transforms.get_mut(name) {
            *entry = transform;
        } else {
            self.transforms.insert(name.to_string(), transform);
        }
    }

    /// Sets a bone transform by skeleton index. Returns false if the index can't be resolved.
    pub fn set_bone_transform_by_id(&mut self, id: impl BoneIndex, transform: BoneTransform) -> bool {
        let name = match self.skeleton().and_then(|s| s.bone_name(id.i32()).map(String::from)) {
            Some(name) => name,
            None => return false,
        };
        self.transforms.insert(name, transform);
        return true;
    }

    /// Gets a bone transform.
    ///
    /// Falls back to the skeleton bind transform, then to identity.
    pub fn bone_transform(&self, name: &str) -> BoneTransform {
        if let Some(transform) = self.transforms.get(name) {
            return *transform;
        }
        return self.bind_transform(name);
    }

    /// Gets a bone transform by skeleton index, with the same fallbacks as `bone_transform`.
    pub fn bone_transform_by_id(&self, id: impl BoneIndex) -> BoneTransform {
        let skeleton = match self.skeleton() {
            Some(skeleton) => skeleton,
            None => return BoneTransform::IDENTITY,
        };
        return match skeleton.bone_name(id.i32()) {
            Some(name) => self.bone_transform(name),
            None => BoneTransform::IDENTITY,
        };
    }

    /// Gets the bind transform of a bone from the skeleton, identity if unknown.
    pub fn bind_transform(&self, name: &str) -> BoneTransform {
        return bind_transform_of(self.skeleton().as_deref(), name);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.transforms.clear();
    }

    /// Replaces every entry by the skeleton bind transforms.
    pub fn reset_to_bind_pose(&mut self) {
        self.transforms.clear();
        if let Some(skeleton) = self.skeleton() {
            for (idx, name) in skeleton.bone_names().into_iter().enumerate() {
                self.transforms.insert(name.to_string(), *skeleton.bind_pose(idx));
            }
        }
    }

    /// Checks that every bone of the skeleton has an entry.
    pub fn validate_pose(&self) -> bool {
        let skeleton = match self.skeleton() {
            Some(skeleton) => skeleton,
            None => return false,
        };
        return skeleton.bone_names().iter().all(|name| self.transforms.contains_key(*name));
    }

    /// Local matrices in skeleton bone-index order.
    pub fn to_local_matrices(&self, skeleton: &Skeleton) -> Vec<Mat4> {
        let mut matrices = Vec::with_capacity(skeleton.num_bones());
        for (idx, name) in skeleton.bone_names().into_iter().enumerate() {
            let transform = match self.transforms.get(name) {
                Some(t) => *t,
                None => *skeleton.bind_pose(idx),
            };
            matrices.push(transform.to_matrix());
        }
        return matrices;
    }

    pub fn abs_diff_eq(&self, other: &Pose, max_abs_diff: f32) -> bool {
        if self.transforms.len() != other.transforms.len() {
            return false;
        }
        return self.transforms.iter().all(|(name, t)| match other.transforms.get(name) {
            Some(o) => t.abs_diff_eq(o, max_abs_diff),
            None => false,
        });
    }
}

impl Pose {
    /// Blends two poses bone by bone, `weight` 0 gives `a` and 1 gives `b`.
    ///
    /// A bone held by only one pose is blended against the bind transform.
    pub fn blend(a: &Pose, b: &Pose, weight: f32) -> Pose {
        let mut result = a.clone();
        if result.skeleton().is_none() {
            result.skeleton = b.skeleton.clone();
        }
        result.blend_with(b, weight);
        return result;
    }

    /// Applies `additive` on top of `base`: `base + additive * weight` for every bone of `additive`.
    pub fn blend_additive(base: &Pose, additive: &Pose, weight: f32) -> Pose {
        let mut result = base.clone();
        result.blend_additive_with(additive, weight);
        return result;
    }

    /// In place version of `Pose::blend`, `self` plays the role of `a`.
    pub fn blend_with(&mut self, other: &Pose, weight: f32) {
        let weight = weight.clamp(0.0, 1.0);
        let skeleton = other.skeleton().or_else(|| self.skeleton());
        for (name, transform) in self.transforms.iter_mut() {
            let target = match other.transforms.get(name) {
                Some(t) => *t,
                None => bind_transform_of(skeleton.as_deref(), name),
            };
            *transform = transform.lerp(&target, weight);
        }

        for (name, target) in other.transforms.iter() {
            if self.transforms.contains_key(name) {
                continue;
            }
            let from = bind_transform_of(skeleton.as_deref(), name);
            self.transforms.insert(name.clone(), from.lerp(target, weight));
        }
    }

    /// In place version of `Pose::blend_additive`.
    pub fn blend_additive_with(&mut self, additive: &Pose, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        for (name, delta) in additive.transforms.iter() {
            let base = self.bone_transform(name);
            self.transforms.insert(name.clone(), base + *delta * weight);
        }
    }
}

fn bind_transform_of(skeleton: Option<&Skeleton>, name: &str) -> BoneTransform {
    return skeleton
        .and_then(|s| s.bone_by_name(name).map(|idx| *s.bind_pose(idx)))
        .unwrap_or(BoneTransform::IDENTITY);
}

/// True when `weight` is too small to contribute to a blend.
#[inline]
pub(crate) fn is_negligible(weight: f32) -> bool {
    return weight <= WEIGHT_EPSILON;
}
