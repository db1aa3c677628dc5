//!
//! Skinning Job.
//!

use glam::Mat4;
use std::rc::Rc;

use crate::base::AnimError;
use crate::pose::Pose;
use crate::skeleton::Skeleton;

///
/// Computes skinning matrices from local-space bone matrices.
///
/// Job input is an array of local matrices ordered like the skeleton bones. The job walks the
/// hierarchy parent first to get model-space matrices, then multiplies each one by the inverse
/// bind matrix of its bone. Job output is one skinning matrix per bone, in skeleton order,
/// ready for vertex skinning.
///
#[derive(Debug, Default)]
pub struct SkinningJob {
    skeleton: Option<Rc<Skeleton>>,
    root: Mat4,
    input: Vec<Mat4>,
    models: Vec<Mat4>,
    output: Vec<Mat4>,
    verified: bool,
}

impl SkinningJob {
    /// Gets skeleton of `SkinningJob`.
    #[inline]
    pub fn skeleton(&self) -> Option<&Rc<Skeleton>> {
        return self.skeleton.as_ref();
    }

    /// Sets skeleton of `SkinningJob`.
    ///
    /// The skeleton gives the hierarchy and the inverse bind matrices.
    #[inline]
    pub fn set_skeleton(&mut self, skeleton: Rc<Skeleton>) {
        self.verified = false;
        self.skeleton = Some(skeleton);
    }

    /// Clears skeleton of `SkinningJob`.
    #[inline]
    pub fn clear_skeleton(&mut self) {
        self.verified = false;
        self.skeleton = None;
    }

    /// Gets root matrix of `SkinningJob`.
    #[inline]
    pub fn root(&self) -> &Mat4 {
        return &self.root;
    }

    /// Sets root matrix of `SkinningJob`.
    ///
    /// The root matrix will multiply every model-space matrix, default is identity.
    #[inline]
    pub fn set_root(&mut self, root: &Mat4) {
        self.root = *root;
    }

    /// Gets input of `SkinningJob`.
    #[inline]
    pub fn input(&self) -> &[Mat4] {
        return &self.input;
    }

    /// Sets input of `SkinningJob`.
    ///
    /// Local matrices, at least one per skeleton bone.
    #[inline]
    pub fn set_input(&mut self, input: Vec<Mat4>) {
        self.verified = false;
        self.input = input;
    }

    /// Sets input of `SkinningJob` from a pose, using the job skeleton for bone order.
    /// Bones missing from the pose take their bind transform.
    pub fn set_input_pose(&mut self, pose: &Pose) -> Result<(), AnimError> {
        let skeleton = self.skeleton.as_ref().ok_or(AnimError::InvalidJob)?;
        let input = pose.to_local_matrices(skeleton);
        self.set_input(input);
        return Ok(());
    }

    /// Gets model-space matrices computed by the last run.
    #[inline]
    pub fn model_matrices(&self) -> &[Mat4] {
        return &self.models;
    }

    /// Gets skinning matrices computed by the last run.
    #[inline]
    pub fn output(&self) -> &[Mat4] {
        return &self.output;
    }

    /// Validates `SkinningJob` parameters.
    pub fn validate(&self) -> bool {
        let skeleton = match &self.skeleton {
            Some(skeleton) => skeleton,
            None => return false,
        };
        return self.input.len() >= skeleton.num_bones();
    }

    /// Runs skinning job's task.
    /// The validate job before any operation is performed.
    pub fn run(&mut self) -> Result<(), AnimError> {
        if !self.verified {
            if !self.validate() {
                return Err(AnimError::InvalidJob);
            }
            self.verified = true;
        }

        let skeleton = self.skeleton.as_ref().ok_or(AnimError::InvalidJob)?;
        let num_bones = skeleton.num_bones();
        self.models.resize(num_bones, Mat4::IDENTITY);
        self.output.resize(num_bones, Mat4::IDENTITY);

        skeleton.local_to_model(&self.root, &self.input, &mut self.models)?;
        for (idx, (out, model)) in self.output.iter_mut().zip(self.models.iter()).enumerate() {
            *out = *model * skeleton.inverse_bind_matrix(idx);
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use wasm_bindgen_test::*;

    use super::*;
    use crate::pose::BoneTransform;
    use crate::test_utils::two_bone_skeleton;

    #[test]
    #[wasm_bindgen_test]
    fn test_validity() {
        let skeleton = Rc::new(two_bone_skeleton());

        // missing skeleton
        let mut job = SkinningJob::default();
        job.set_input(vec![Mat4::IDENTITY; 2]);
        assert!(!job.validate());
        assert!(job.set_input_pose(&Pose::empty()).unwrap_err().is_invalid_job());

        // input too small
        let mut job = SkinningJob::default();
        job.set_skeleton(skeleton.clone());
        job.set_input(vec![Mat4::IDENTITY; 1]);
        assert!(!job.validate());
        assert!(job.run().unwrap_err().is_invalid_job());

        // ok
        let mut job = SkinningJob::default();
        job.set_skeleton(skeleton.clone());
        job.set_input(vec![Mat4::IDENTITY; 3]);
        assert!(job.validate());
        assert!(job.run().is_ok());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_bind_pose_is_identity() {
        let skeleton = Rc::new(two_bone_skeleton());
        let mut job = SkinningJob::default();
        job.set_skeleton(skeleton.clone());
        job.set_input_pose(&Pose::new(&skeleton)).unwrap();
        job.run().unwrap();

        assert_eq!(job.output().len(), 2);
        for matrix in job.output() {
            assert!(matrix.abs_diff_eq(Mat4::IDENTITY, 1e-6));
        }
        assert!(job.model_matrices()[1].abs_diff_eq(Mat4::from_translation(Vec3::Y), 1e-6));
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_root_motion_propagates() {
        let skeleton = Rc::new(two_bone_skeleton());
        let mut pose = Pose::new(&skeleton);
        pose.set_bone_transform("Root", BoneTransform::from_position(Vec3::new(0.5, 0.0, 0.0)));

        let mut job = SkinningJob::default();
        job.set_skeleton(skeleton.clone());
        job.set_root(&Mat4::from_translation(Vec3::Z));
        job.set_input_pose(&pose).unwrap();
        job.run().unwrap();

        let expected = Mat4::from_translation(Vec3::new(0.5, 0.0, 1.0));
        assert!(job.output()[0].abs_diff_eq(expected, 1e-6));
        assert!(job.output()[1].abs_diff_eq(expected, 1e-6));
    }
}
