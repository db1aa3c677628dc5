//!
//! Base types, constants and utils.
//!

use static_assertions::const_assert;
use std::collections::hash_map::DefaultHasher;
use std::hash::BuildHasher;
use thiserror::Error;

/// Animation error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimError {
    /// A name (state, bone, animation, parameter) was empty.
    #[error("Empty name")]
    EmptyName,
    /// The state is not registered in the state machine.
    #[error("Unknown state: {0}")]
    UnknownState(String),
    /// The bone is not part of the skeleton.
    #[error("Unknown bone: {0}")]
    UnknownBone(String),
    /// The animation is not registered in the controller.
    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),
    /// A bone with this name already exists.
    #[error("Duplicate bone: {0}")]
    DuplicateBone(String),
    /// A bone parent must be added before its children.
    #[error("Invalid parent {parent} for bone {bone}")]
    InvalidParent { bone: String, parent: i32 },
    /// Too many bones for a skeleton.
    #[error("Too many bones")]
    TooManyBones,
    /// A 1D motion was added to a 2D blend tree, or the reverse.
    #[error("Blend tree dimension mismatch")]
    DimensionMismatch,
    /// The controller has no skeleton.
    #[error("Not initialized")]
    NotInitialized,
    /// Validates job failed.
    #[error("Invalid job")]
    InvalidJob,
    /// Validation failed, holds every collected message.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

impl AnimError {
    pub fn is_empty_name(&self) -> bool {
        matches!(self, AnimError::EmptyName)
    }

    pub fn is_unknown_state(&self) -> bool {
        matches!(self, AnimError::UnknownState(_))
    }

    pub fn is_unknown_bone(&self) -> bool {
        matches!(self, AnimError::UnknownBone(_))
    }

    pub fn is_unknown_animation(&self) -> bool {
        matches!(self, AnimError::UnknownAnimation(_))
    }

    pub fn is_duplicate_bone(&self) -> bool {
        matches!(self, AnimError::DuplicateBone(_))
    }

    pub fn is_invalid_parent(&self) -> bool {
        matches!(self, AnimError::InvalidParent { .. })
    }

    pub fn is_too_many_bones(&self) -> bool {
        matches!(self, AnimError::TooManyBones)
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        matches!(self, AnimError::DimensionMismatch)
    }

    pub fn is_not_initialized(&self) -> bool {
        matches!(self, AnimError::NotInitialized)
    }

    pub fn is_invalid_job(&self) -> bool {
        matches!(self, AnimError::InvalidJob)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AnimError::Validation(_))
    }

    /// Turns a list of validation messages into a result.
    pub(crate) fn from_validation(errors: Vec<String>) -> Result<(), AnimError> {
        if errors.is_empty() {
            return Ok(());
        }
        return Err(AnimError::Validation(errors));
    }
}

/// Defines the maximum number of bones.
/// Bone indices are stored as `i16`, parents included.
pub const SKELETON_MAX_BONES: i32 = 1024;

/// Defines the index of the parent of a root bone (which has no parent in fact).
pub const SKELETON_NO_PARENT: i16 = -1;

const_assert!(SKELETON_MAX_BONES <= i16::MAX as i32);

/// Weights at or below this value are treated as zero when blending.
pub const WEIGHT_EPSILON: f32 = 0.001;

/// Default capacity of the controller event history.
pub const DEFAULT_EVENT_HISTORY_SIZE: usize = 100;

/// A hasher builder that creates `DefaultHasher` with default keys.
///
/// Maps keyed by names iterate in the same order on every run and platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicState;

impl DeterministicState {
    /// Creates a new `DeterministicState` that builds `DefaultHasher` with default keys.
    pub const fn new() -> DeterministicState {
        DeterministicState
    }
}

impl BuildHasher for DeterministicState {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> DefaultHasher {
        DefaultHasher::default()
    }
}

/// Allow usize/i32/i16 use as bone index.
pub trait BoneIndex {
    fn usize(&self) -> usize;
    fn i32(&self) -> i32;
}

macro_rules! bone_index {
    ($type:ty) => {
        impl BoneIndex for $type {
            #[inline(always)]
            fn usize(&self) -> usize {
                *self as usize
            }

            #[inline(always)]
            fn i32(&self) -> i32 {
                *self as i32
            }
        }
    };
}

bone_index!(usize);
bone_index!(i32);
bone_index!(i16);
