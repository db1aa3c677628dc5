//!
//! Skeleton data structure definition.
//!

use bimap::BiHashMap;
use glam::Mat4;

use crate::base::{AnimError, BoneIndex, SKELETON_MAX_BONES, SKELETON_NO_PARENT};
use crate::pose::BoneTransform;

/// One bone of a `RawSkeleton`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawBone {
    pub name: String,
    /// Index of the parent bone, `SKELETON_NO_PARENT` for a root.
    pub parent: i16,
    pub bind_pose: BoneTransform,
}

///
/// Offline skeleton description, the input of `Skeleton` building and the
/// serialized form of a `Skeleton`.
///
/// Bones are stored in index order, every parent appears before its children.
///
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSkeleton {
    pub bones: Vec<RawBone>,
}

impl RawSkeleton {
    pub fn new() -> RawSkeleton {
        return RawSkeleton::default();
    }

    /// Appends a bone and returns its index.
    ///
    /// * `parent` - Name of an already added bone, `None` for a root.
    pub fn add_bone(&mut self, name: &str, parent: Option<&str>, bind_pose: BoneTransform) -> Result<i16, AnimError> {
        if name.is_empty() {
            return Err(AnimError::EmptyName);
        }
        if self.bones.iter().any(|b| b.name == name) {
            return Err(AnimError::DuplicateBone(name.to_string()));
        }
        if self.bones.len() >= SKELETON_MAX_BONES as usize {
            return Err(AnimError::TooManyBones);
        }
        let parent = match parent {
            Some(parent) => match self.bones.iter().position(|b| b.name == parent) {
                Some(idx) => idx as i16,
                None => return Err(AnimError::UnknownBone(parent.to_string())),
            },
            None => SKELETON_NO_PARENT,
        };
        self.bones.push(RawBone {
            name: name.to_string(),
            parent,
            bind_pose,
        });
        return Ok((self.bones.len() - 1) as i16);
    }

    /// Builds the runtime `Skeleton`.
    pub fn build(&self) -> Result<Skeleton, AnimError> {
        return Skeleton::from_raw(self);
    }
}

///
/// Runtime skeleton: bone hierarchy, names and bind pose.
///
/// Bone parents are packed as an array of indices (16 bits) where a parent index is always
/// lower than its children's, so a single forward pass visits parents first. Bind poses are
/// stored in local space, along with the derived model-space bind matrices and their inverses.
///
/// A `Skeleton` is immutable once built and is meant to be shared through `Rc` by poses,
/// clips and controllers. Per-frame transforms live in the controller, not here.
///
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSkeleton", into = "RawSkeleton"))]
pub struct Skeleton {
    bone_parents: Vec<i16>,
    bone_names: BiHashMap<String, i16>,
    bind_poses: Vec<BoneTransform>,
    bind_matrices: Vec<Mat4>,
    inverse_bind_matrices: Vec<Mat4>,
}

impl PartialEq for Skeleton {
    fn eq(&self, other: &Skeleton) -> bool {
        return self.bone_parents == other.bone_parents
            && self.bone_names() == other.bone_names()
            && self.bind_poses == other.bind_poses;
    }
}

impl TryFrom<RawSkeleton> for Skeleton {
    type Error = AnimError;

    fn try_from(raw: RawSkeleton) -> Result<Skeleton, AnimError> {
        return Skeleton::from_raw(&raw);
    }
}

impl From<Skeleton> for RawSkeleton {
    fn from(skeleton: Skeleton) -> RawSkeleton {
        return skeleton.to_raw();
    }
}

impl Skeleton {
    /// Builds a `Skeleton` from its offline description.
    pub fn from_raw(raw: &RawSkeleton) -> Result<Skeleton, AnimError> {
        if raw.bones.len() > SKELETON_MAX_BONES as usize {
            return Err(AnimError::TooManyBones);
        }

        let num_bones = raw.bones.len();
        let mut bone_parents = Vec::with_capacity(num_bones);
        let mut bone_names = BiHashMap::with_capacity(num_bones);
        let mut bind_poses = Vec::with_capacity(num_bones);
        let mut bind_matrices: Vec<Mat4> = Vec::with_capacity(num_bones);

        for (idx, bone) in raw.bones.iter().enumerate() {
            if bone.name.is_empty() {
                return Err(AnimError::EmptyName);
            }
            if bone.parent != SKELETON_NO_PARENT && (bone.parent < 0 || bone.parent as usize >= idx) {
                return Err(AnimError::InvalidParent {
                    bone: bone.name.clone(),
                    parent: bone.parent as i32,
                });
            }
            if bone_names.insert_no_overwrite(bone.name.clone(), idx as i16).is_err() {
                return Err(AnimError::DuplicateBone(bone.name.clone()));
            }

            let local = bone.bind_pose.to_matrix();
            let model = match bone.parent {
                SKELETON_NO_PARENT => local,
                parent => bind_matrices[parent as usize] * local,
            };
            bone_parents.push(bone.parent);
            bind_poses.push(bone.bind_pose);
            bind_matrices.push(model);
        }

        let inverse_bind_matrices = bind_matrices.iter().map(|m| m.inverse()).collect();
        return Ok(Skeleton {
            bone_parents,
            bone_names,
            bind_poses,
            bind_matrices,
            inverse_bind_matrices,
        });
    }

    /// Rebuilds the offline description of `Skeleton`.
    pub fn to_raw(&self) -> RawSkeleton {
        let bones = (0..self.num_bones())
            .map(|idx| RawBone {
                name: self.bone_name(idx as i32).unwrap_or_default().to_string(),
                parent: self.bone_parents[idx],
                bind_pose: self.bind_poses[idx],
            })
            .collect();
        return RawSkeleton { bones };
    }
}

impl Skeleton {
    /// Gets the number of bones of `Skeleton`.
    #[inline]
    pub fn num_bones(&self) -> usize {
        return self.bone_parents.len();
    }

    /// Gets bone's parent indices range.
    #[inline]
    pub fn bone_parents(&self) -> &[i16] {
        return &self.bone_parents;
    }

    /// Gets bone's parent by index.
    #[inline]
    pub fn bone_parent(&self, idx: impl BoneIndex) -> i16 {
        return self.bone_parents[idx.usize()];
    }

    /// Gets bone's index by name.
    #[inline]
    pub fn bone_by_name(&self, name: &str) -> Option<i16> {
        return self.bone_names.get_by_left(name).copied();
    }

    /// Gets bone's name by index.
    #[inline]
    pub fn bone_name(&self, idx: impl BoneIndex) -> Option<&str> {
        let idx = idx.i32();
        if idx < 0 || idx > i16::MAX as i32 {
            return None;
        }
        return self.bone_names.get_by_right(&(idx as i16)).map(|name| name.as_str());
    }

    /// Gets all bone names in index order.
    pub fn bone_names(&self) -> Vec<&str> {
        return (0..self.num_bones())
            .filter_map(|idx| self.bone_name(idx))
            .collect();
    }

    /// Gets the direct children of a bone.
    pub fn bone_children(&self, idx: impl BoneIndex) -> Vec<i16> {
        let parent = idx.i32();
        return (idx.usize() + 1..self.num_bones())
            .filter(|child| self.bone_parents[*child] as i32 == parent)
            .map(|child| child as i16)
            .collect();
    }

    /// Gets the bones without parent.
    pub fn root_bones(&self) -> Vec<i16> {
        return (0..self.num_bones())
            .filter(|idx| self.bone_parents[*idx] == SKELETON_NO_PARENT)
            .map(|idx| idx as i16)
            .collect();
    }

    /// Gets the first root bone.
    #[inline]
    pub fn root_bone(&self) -> Option<i16> {
        return if self.num_bones() > 0 { Some(0) } else { None };
    }

    /// Gets the number of ancestors of a bone, 0 for roots.
    pub fn bone_depth(&self, idx: impl BoneIndex) -> usize {
        let mut depth = 0;
        let mut parent = self.bone_parents[idx.usize()];
        while parent != SKELETON_NO_PARENT {
            depth += 1;
            parent = self.bone_parents[parent as usize];
        }
        return depth;
    }

    /// Test if a bone has no children.
    #[inline]
    pub fn is_leaf(&self, idx: impl BoneIndex) -> bool {
        let parent = idx.i32();
        return !self.bone_parents[idx.usize() + 1..].iter().any(|p| *p as i32 == parent);
    }

    /// Gets bone's local bind transform.
    #[inline]
    pub fn bind_pose(&self, idx: impl BoneIndex) -> &BoneTransform {
        return &self.bind_poses[idx.usize()];
    }

    /// Gets all local bind transforms.
    #[inline]
    pub fn bind_poses(&self) -> &[BoneTransform] {
        return &self.bind_poses;
    }

    /// Gets bone's model-space bind matrix.
    #[inline]
    pub fn bind_matrix(&self, idx: impl BoneIndex) -> Mat4 {
        return self.bind_matrices[idx.usize()];
    }

    /// Gets bone's inverse model-space bind matrix.
    #[inline]
    pub fn inverse_bind_matrix(&self, idx: impl BoneIndex) -> Mat4 {
        return self.inverse_bind_matrices[idx.usize()];
    }

    #[inline]
    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        return &self.inverse_bind_matrices;
    }

    /// Checks that every parent precedes its children and names map one to one.
    pub fn validate_hierarchy(&self) -> bool {
        let parents_ok = self
            .bone_parents
            .iter()
            .enumerate()
            .all(|(idx, parent)| *parent == SKELETON_NO_PARENT || (*parent >= 0 && (*parent as usize) < idx));
        return parents_ok && self.bone_names.len() == self.num_bones();
    }

    /// Computes model-space matrices from local-space matrices in bone-index order.
    ///
    /// * `root` - Multiplied into every root bone, identity for model space.
    pub fn local_to_model(&self, root: &Mat4, locals: &[Mat4], models: &mut [Mat4]) -> Result<(), AnimError> {
        if locals.len() < self.num_bones() || models.len() < self.num_bones() {
            return Err(AnimError::InvalidJob);
        }
        for idx in 0..self.num_bones() {
            let parent = match self.bone_parents[idx] {
                SKELETON_NO_PARENT => *root,
                parent => models[parent as usize],
            };
            models[idx] = parent * locals[idx];
        }
        return Ok(());
    }
}
