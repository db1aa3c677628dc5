//!
//! Parameter driven blend trees over clips and nested trees.
//!

use glam::Vec2;
use std::rc::Rc;

use crate::animation::Animation;
use crate::base::{AnimError, WEIGHT_EPSILON};
use crate::controller::AnimationController;
use crate::pose::{is_negligible, Pose};

/// Thresholds closer than this are duplicates.
const THRESHOLD_EPSILON: f32 = 0.001;

/// Blend space layout of a `BlendTree`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendTreeType {
    /// One parameter, nodes placed on a line by threshold.
    #[default]
    Simple1D,
    /// Two parameters read as a direction, one motion per direction.
    SimpleDirectional2D,
    /// Two parameters read as a direction, several motions per direction allowed.
    FreeformDirectional2D,
    /// Two parameters read as a position, inverse distance weighting.
    FreeformCartesian2D,
}

impl BlendTreeType {
    #[inline]
    pub fn is_1d(&self) -> bool {
        return matches!(self, BlendTreeType::Simple1D);
    }
}

/// Content of a blend tree node, a clip or a nested tree.
#[derive(Debug, Clone)]
pub enum BlendMotion {
    Animation(Rc<Animation>),
    Tree(Rc<BlendTree>),
}

impl BlendMotion {
    pub fn duration(&self) -> f32 {
        return match self {
            BlendMotion::Animation(anim) => anim.duration(),
            BlendMotion::Tree(tree) => tree.duration(),
        };
    }
}

/// One motion of a `BlendTree`.
#[derive(Debug, Clone)]
pub struct BlendTreeNode {
    pub name: String,
    pub motion: BlendMotion,
    /// Position on the line of a 1D tree.
    pub threshold: f32,
    /// Position in the plane of a 2D tree.
    pub position: Vec2,
}

/// A clip with the weight and time it should be played at.
#[derive(Debug, Clone)]
pub struct AnimationSample {
    pub animation: Rc<Animation>,
    pub weight: f32,
    pub time: f32,
}

///
/// Recursive weighted combination of clips and nested trees, driven by one (1D) or two (2D)
/// float parameters of the controller.
///
/// Trees are built once and shared read-only through `Rc`; weights are computed per call
/// and never stored on the tree.
///
#[derive(Debug, Clone, Default)]
pub struct BlendTree {
    name: String,
    tree_type: BlendTreeType,
    parameter_x: String,
    parameter_y: String,
    nodes: Vec<BlendTreeNode>,
}

impl BlendTree {
    pub fn new(tree_type: BlendTreeType) -> BlendTree {
        return BlendTree {
            tree_type,
            ..Default::default()
        };
    }

    #[inline]
    pub fn name(&self) -> &str {
        return &self.name;
    }

    #[inline]
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    #[inline]
    pub fn tree_type(&self) -> BlendTreeType {
        return self.tree_type;
    }

    /// Changes the layout. Existing nodes are dropped since their placement no longer applies.
    pub fn set_type(&mut self, tree_type: BlendTreeType) {
        if self.tree_type != tree_type {
            self.tree_type = tree_type;
            self.nodes.clear();
        }
    }

    #[inline]
    pub fn parameter_x(&self) -> &str {
        return &self.parameter_x;
    }

    #[inline]
    pub fn parameter_y(&self) -> &str {
        return &self.parameter_y;
    }

    /// Sets the parameter of a 1D tree.
    #[inline]
    pub fn set_parameter(&mut self, parameter: &str) {
        self.parameter_x = parameter.to_string();
    }

    /// Sets the parameters of a 2D tree.
    #[inline]
    pub fn set_parameters(&mut self, parameter_x: &str, parameter_y: &str) {
        self.parameter_x = parameter_x.to_string();
        self.parameter_y = parameter_y.to_string();
    }

    #[inline]
    pub fn nodes(&self) -> &[BlendTreeNode] {
        return &self.nodes;
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        return self.nodes.len();
    }

    pub fn node(&self, name: &str) -> Option<&BlendTreeNode> {
        return self.nodes.iter().find(|n| n.name == name);
    }
}

impl BlendTree {
    /// Adds a clip at `threshold` on a 1D tree. An empty name becomes `Motion_N`.
    pub fn add_motion(&mut self, animation: Rc<Animation>, threshold: f32, name: &str) -> Result<(), AnimError> {
        let name = self.node_name(name, "Motion");
        return self.push_1d(BlendMotion::Animation(animation), threshold, name);
    }

    /// Adds a clip at `position` on a 2D tree. An empty name becomes `Motion_N`.
    pub fn add_motion_2d(&mut self, animation: Rc<Animation>, position: Vec2, name: &str) -> Result<(), AnimError> {
        let name = self.node_name(name, "Motion");
        return self.push_2d(BlendMotion::Animation(animation), position, name);
    }

    /// Adds a nested tree at `threshold` on a 1D tree. An empty name becomes `ChildTree_N`.
    pub fn add_child_tree(&mut self, tree: Rc<BlendTree>, threshold: f32, name: &str) -> Result<(), AnimError> {
        let name = self.node_name(name, "ChildTree");
        return self.push_1d(BlendMotion::Tree(tree), threshold, name);
    }

    /// Adds a nested tree at `position` on a 2D tree. An empty name becomes `ChildTree_N`.
    pub fn add_child_tree_2d(&mut self, tree: Rc<BlendTree>, position: Vec2, name: &str) -> Result<(), AnimError> {
        let name = self.node_name(name, "ChildTree");
        return self.push_2d(BlendMotion::Tree(tree), position, name);
    }

    /// Removes every node with this name.
    pub fn remove_motion(&mut self, name: &str) -> bool {
        let len = self.nodes.len();
        self.nodes.retain(|n| n.name != name);
        return self.nodes.len() != len;
    }

    pub fn clear_motions(&mut self) {
        self.nodes.clear();
    }

    fn node_name(&self, name: &str, prefix: &str) -> String {
        if name.is_empty() {
            return format!("{}_{}", prefix, self.nodes.len());
        }
        return name.to_string();
    }

    fn push_1d(&mut self, motion: BlendMotion, threshold: f32, name: String) -> Result<(), AnimError> {
        if !self.tree_type.is_1d() {
            log::warn!("Blend tree '{}': 1D motion '{}' added to a 2D tree", self.name, name);
            return Err(AnimError::DimensionMismatch);
        }
        let idx = self.nodes.partition_point(|n| n.threshold <= threshold);
        self.nodes.insert(
            idx,
            BlendTreeNode {
                name,
                motion,
                threshold,
                position: Vec2::new(threshold, 0.0),
            },
        );
        return Ok(());
    }

    fn push_2d(&mut self, motion: BlendMotion, position: Vec2, name: String) -> Result<(), AnimError> {
        if self.tree_type.is_1d() {
            log::warn!("Blend tree '{}': 2D motion '{}' added to a 1D tree", self.name, name);
            return Err(AnimError::DimensionMismatch);
        }
        self.nodes.push(BlendTreeNode {
            name,
            motion,
            threshold: 0.0,
            position,
        });
        return Ok(());
    }
}

impl BlendTree {
    /// Computes the normalized weight of every node, in node order.
    pub fn node_weights(&self, controller: &AnimationController) -> Vec<f32> {
        let mut weights = vec![0.0; self.nodes.len()];
        if self.nodes.is_empty() {
            return weights;
        }
        if self.tree_type.is_1d() {
            self.weights_1d(controller.get_float(&self.parameter_x), &mut weights);
        } else {
            let input = Vec2::new(
                controller.get_float(&self.parameter_x),
                controller.get_float(&self.parameter_y),
            );
            let input = if input.is_finite() { input } else { Vec2::ZERO };
            match self.tree_type {
                BlendTreeType::FreeformCartesian2D => self.weights_cartesian(input, &mut weights),
                _ => self.weights_directional(input, &mut weights),
            }
        }
        normalize_weights(&mut weights);
        return weights;
    }

    fn weights_1d(&self, value: f32, weights: &mut [f32]) {
        let last = self.nodes.len() - 1;
        if last == 0 || value.is_nan() || value <= self.nodes[0].threshold {
            weights[0] = 1.0;
            return;
        }
        if value >= self.nodes[last].threshold {
            weights[last] = 1.0;
            return;
        }

        let high = self.nodes.partition_point(|n| n.threshold <= value);
        let low = high - 1;
        let range = self.nodes[high].threshold - self.nodes[low].threshold;
        if range > THRESHOLD_EPSILON {
            let t = (value - self.nodes[low].threshold) / range;
            weights[low] = 1.0 - t;
            weights[high] = t;
        } else {
            weights[low] = 1.0;
        }
    }

    fn weights_directional(&self, input: Vec2, weights: &mut [f32]) {
        let input_len = input.length();
        if input_len < WEIGHT_EPSILON {
            for (idx, node) in self.nodes.iter().enumerate() {
                if node.position.length() < WEIGHT_EPSILON {
                    weights[idx] = 1.0;
                }
            }
        } else {
            let input_dir = input / input_len;
            for (idx, node) in self.nodes.iter().enumerate() {
                let node_len = node.position.length();
                if node_len < WEIGHT_EPSILON {
                    continue;
                }
                let similarity = input_dir.dot(node.position / node_len).max(0.0);
                let magnitude = (1.0 - (input_len - node_len).abs() / input_len.max(node_len)).max(0.0);
                weights[idx] = similarity * magnitude;
            }
        }

        // Nothing matched: the closest node takes everything.
        if weights.iter().sum::<f32>() <= WEIGHT_EPSILON {
            weights.iter_mut().for_each(|w| *w = 0.0);
            weights[self.closest_node(input)] = 1.0;
        }
    }

    fn weights_cartesian(&self, input: Vec2, weights: &mut [f32]) {
        for (idx, node) in self.nodes.iter().enumerate() {
            let distance = input.distance(node.position);
            if distance < WEIGHT_EPSILON {
                weights.iter_mut().for_each(|w| *w = 0.0);
                weights[idx] = 1.0;
                return;
            }
            weights[idx] = 1.0 / (distance * distance);
        }
    }

    fn closest_node(&self, input: Vec2) -> usize {
        let mut best = 0;
        let mut best_distance = f32::MAX;
        for (idx, node) in self.nodes.iter().enumerate() {
            let distance = input.distance_squared(node.position);
            if distance < best_distance {
                best = idx;
                best_distance = distance;
            }
        }
        return best;
    }
}

/// Scales weights to sum to 1. Left untouched if the sum is negligible.
pub fn normalize_weights(weights: &mut [f32]) {
    let total: f32 = weights.iter().sum();
    if total > WEIGHT_EPSILON {
        weights.iter_mut().for_each(|w| *w /= total);
    }
}

impl BlendTree {
    /// Evaluates the tree into `pose` at `time` seconds.
    ///
    /// Each contributing clip is sampled at its own wrapped time. The first contributing node
    /// seeds `pose`, the next ones are blended in by their share of the accumulated weight.
    /// An empty or invalid tree leaves `pose` untouched.
    pub fn evaluate(&self, controller: &AnimationController, pose: &mut Pose, time: f32) {
        if !self.is_valid() {
            log::debug!("Blend tree '{}' skipped, invalid", self.name);
            return;
        }

        let weights = self.node_weights(controller);
        let mut accumulated = 0.0;
        for (node, weight) in self.nodes.iter().zip(weights) {
            if is_negligible(weight) {
                continue;
            }

            let mut node_pose = match pose.skeleton() {
                Some(skeleton) => Pose::new(&skeleton),
                None => Pose::empty(),
            };
            match &node.motion {
                BlendMotion::Animation(anim) => anim.evaluate(anim.wrap_time(time), &mut node_pose),
                BlendMotion::Tree(tree) => tree.evaluate(controller, &mut node_pose, time),
            }

            accumulated += weight;
            if accumulated == weight {
                *pose = node_pose;
            } else {
                pose.blend_with(&node_pose, weight / accumulated);
            }
        }
    }

    /// Flattens the tree into the clips to play. Nested weights are multiplied by their
    /// parent node weight.
    pub fn animation_samples(&self, controller: &AnimationController, time: f32) -> Vec<AnimationSample> {
        let mut samples = Vec::new();
        self.collect_samples(controller, time, 1.0, &mut samples);
        return samples;
    }

    fn collect_samples(&self, controller: &AnimationController, time: f32, scale: f32, out: &mut Vec<AnimationSample>) {
        let weights = self.node_weights(controller);
        for (node, weight) in self.nodes.iter().zip(weights) {
            if is_negligible(weight) {
                continue;
            }
            match &node.motion {
                BlendMotion::Animation(anim) => out.push(AnimationSample {
                    animation: anim.clone(),
                    weight: weight * scale,
                    time,
                }),
                BlendMotion::Tree(tree) => tree.collect_samples(controller, time, weight * scale, out),
            }
        }
    }

    /// Longest duration among the nodes, recursively.
    pub fn duration(&self) -> f32 {
        return self.nodes.iter().map(|n| n.motion.duration()).fold(0.0, f32::max);
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.nodes.is_empty() {
            errors.push(format!("Blend tree '{}' has no motions", self.name));
        }
        if self.tree_type.is_1d() {
            if self.parameter_x.is_empty() {
                errors.push("1D blend tree requires a parameter".to_string());
            }
        } else if self.parameter_x.is_empty() || self.parameter_y.is_empty() {
            errors.push("2D blend tree requires two parameters".to_string());
        }

        for node in self.nodes.iter() {
            if let BlendMotion::Tree(tree) = &node.motion {
                for error in tree.validation_errors() {
                    errors.push(format!("Child tree '{}': {}", node.name, error));
                }
            }
        }

        if self.tree_type.is_1d() {
            for pair in self.nodes.windows(2) {
                if (pair[1].threshold - pair[0].threshold).abs() < THRESHOLD_EPSILON {
                    errors.push(format!(
                        "Duplicate threshold {} for motions '{}' and '{}'",
                        pair[0].threshold, pair[0].name, pair[1].name
                    ));
                }
            }
        }
        return errors;
    }

    /// Same verdict as `validation_errors().is_empty()` without building the report.
    pub fn is_valid(&self) -> bool {
        if self.nodes.is_empty() {
            return false;
        }
        let has_parameters = match self.tree_type.is_1d() {
            true => !self.parameter_x.is_empty(),
            false => !self.parameter_x.is_empty() && !self.parameter_y.is_empty(),
        };
        if !has_parameters {
            return false;
        }
        let children_valid = self.nodes.iter().all(|node| match &node.motion {
            BlendMotion::Tree(tree) => tree.is_valid(),
            BlendMotion::Animation(_) => true,
        });
        if !children_valid {
            return false;
        }
        if self.tree_type.is_1d() {
            return self
                .nodes
                .windows(2)
                .all(|pair| (pair[1].threshold - pair[0].threshold).abs() >= THRESHOLD_EPSILON);
        }
        return true;
    }

    pub fn validate(&self) -> Result<(), AnimError> {
        return AnimError::from_validation(self.validation_errors());
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use wasm_bindgen_test::*;

    use super::*;
    use crate::test_utils::{linear_clip, two_bone_skeleton};

    fn clip(name: &str, x: f32) -> Rc<Animation> {
        return Rc::new(linear_clip(name, "Root", Vec3::new(x, 0.0, 0.0), Vec3::new(x, 0.0, 0.0), 1.0));
    }

    fn tree_1d(thresholds: &[f32]) -> BlendTree {
        let mut tree = BlendTree::new(BlendTreeType::Simple1D);
        tree.set_parameter("Speed");
        for (idx, t) in thresholds.iter().enumerate() {
            tree.add_motion(clip(&format!("m{}", idx), *t), *t, "").unwrap();
        }
        return tree;
    }

    fn assert_weights(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{:?} != {:?}", actual, expected);
        }
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_1d_weights() {
        let tree = tree_1d(&[6.0, 0.0, 2.0]);
        let thresholds: Vec<f32> = tree.nodes().iter().map(|n| n.threshold).collect();
        assert_eq!(thresholds, vec![0.0, 2.0, 6.0]);

        let mut controller = AnimationController::new();
        controller.set_float("Speed", -5.0);
        assert_weights(&tree.node_weights(&controller), &[1.0, 0.0, 0.0]);
        controller.set_float("Speed", 10.0);
        assert_weights(&tree.node_weights(&controller), &[0.0, 0.0, 1.0]);
        controller.set_float("Speed", 4.0);
        assert_weights(&tree.node_weights(&controller), &[0.0, 0.5, 0.5]);
        controller.set_float("Speed", 2.0);
        assert_weights(&tree.node_weights(&controller), &[0.0, 1.0, 0.0]);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_cartesian_weights() {
        let mut tree = BlendTree::new(BlendTreeType::FreeformCartesian2D);
        tree.set_parameters("X", "Y");
        tree.add_motion_2d(clip("a", 0.0), Vec2::new(-1.0, 0.0), "a").unwrap();
        tree.add_motion_2d(clip("b", 1.0), Vec2::new(1.0, 0.0), "b").unwrap();
        tree.add_motion_2d(clip("c", 2.0), Vec2::new(0.0, 1.0), "c").unwrap();

        let mut controller = AnimationController::new();
        controller.set_float("X", 1.0);
        assert_weights(&tree.node_weights(&controller), &[0.0, 1.0, 0.0]);

        controller.set_float("X", 0.0);
        let weights = tree.node_weights(&controller);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((weights[0] - weights[1]).abs() < 1e-6);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_directional_weights() {
        let mut tree = BlendTree::new(BlendTreeType::SimpleDirectional2D);
        tree.set_parameters("X", "Y");
        tree.add_motion_2d(clip("idle", 0.0), Vec2::ZERO, "idle").unwrap();
        tree.add_motion_2d(clip("fwd", 1.0), Vec2::new(0.0, 1.0), "fwd").unwrap();
        tree.add_motion_2d(clip("right", 2.0), Vec2::new(1.0, 0.0), "right").unwrap();

        let mut controller = AnimationController::new();
        assert_weights(&tree.node_weights(&controller), &[1.0, 0.0, 0.0]);

        controller.set_float("Y", 1.0);
        assert_weights(&tree.node_weights(&controller), &[0.0, 1.0, 0.0]);

        controller.set_float("X", 1.0);
        let weights = tree.node_weights(&controller);
        assert!((weights[1] - weights[2]).abs() < 1e-5);
        assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);

        // Pointing away from every motion falls back to the closest one.
        controller.set_float("X", 0.0);
        controller.set_float("Y", -0.1);
        assert_weights(&tree.node_weights(&controller), &[1.0, 0.0, 0.0]);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_dimension_mismatch() {
        let mut tree = BlendTree::new(BlendTreeType::Simple1D);
        assert!(tree
            .add_motion_2d(clip("a", 0.0), Vec2::ONE, "a")
            .unwrap_err()
            .is_dimension_mismatch());
        tree.set_type(BlendTreeType::FreeformCartesian2D);
        assert!(tree.add_motion(clip("a", 0.0), 1.0, "a").unwrap_err().is_dimension_mismatch());
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_evaluate_and_samples() {
        let skeleton = Rc::new(two_bone_skeleton());
        let mut controller = AnimationController::new();
        controller.set_float("Speed", 1.0);

        let tree = tree_1d(&[0.0, 2.0]);
        let mut pose = Pose::new(&skeleton);
        tree.evaluate(&controller, &mut pose, 0.5);
        assert!(pose.bone_transform("Root").position.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        assert!(pose.validate_pose());

        let samples = tree.animation_samples(&controller, 0.5);
        assert_eq!(samples.len(), 2);
        assert!((samples[0].weight - 0.5).abs() < 1e-6);
        assert_eq!(samples[1].animation.name(), "m1");
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_three_way_blend_is_weighted_average() {
        let skeleton = Rc::new(two_bone_skeleton());
        let mut tree = BlendTree::new(BlendTreeType::FreeformCartesian2D);
        tree.set_parameters("X", "Y");
        tree.add_motion_2d(clip("a", 0.0), Vec2::new(-1.0, -1.0), "a").unwrap();
        tree.add_motion_2d(clip("b", 3.0), Vec2::new(1.0, -1.0), "b").unwrap();
        tree.add_motion_2d(clip("c", 6.0), Vec2::new(0.0, 1.0), "c").unwrap();

        let mut controller = AnimationController::new();
        controller.set_float("X", 0.2);
        controller.set_float("Y", 0.1);
        let weights = tree.node_weights(&controller);
        let expected = weights[1] * 3.0 + weights[2] * 6.0;

        let mut pose = Pose::new(&skeleton);
        tree.evaluate(&controller, &mut pose, 0.0);
        assert!((pose.bone_transform("Root").position.x - expected).abs() < 1e-4);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_nested_samples_multiply() {
        let mut controller = AnimationController::new();
        controller.set_float("Speed", 1.0);
        controller.set_float("Lean", 1.5);

        let mut child = BlendTree::new(BlendTreeType::Simple1D);
        child.set_parameter("Lean");
        child.add_motion(clip("left", 0.0), 1.0, "left").unwrap();
        child.add_motion(clip("right", 0.0), 2.0, "right").unwrap();

        let mut tree = BlendTree::new(BlendTreeType::Simple1D);
        tree.set_parameter("Speed");
        tree.add_motion(clip("idle", 0.0), 0.0, "idle").unwrap();
        tree.add_child_tree(Rc::new(child), 2.0, "").unwrap();
        assert_eq!(tree.nodes()[1].name, "ChildTree_1");

        let samples = tree.animation_samples(&controller, 0.0);
        let weights: Vec<f32> = samples.iter().map(|s| s.weight).collect();
        assert_weights(&weights, &[0.5, 0.25, 0.25]);
        assert_eq!(tree.duration(), 1.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_validation_errors() {
        let skeleton = Rc::new(two_bone_skeleton());
        let controller = AnimationController::new();

        let empty = BlendTree::new(BlendTreeType::Simple1D);
        let errors = empty.validation_errors();
        assert_eq!(errors.len(), 2);
        let mut pose = Pose::new(&skeleton);
        pose.set_bone_transform("Root", crate::pose::BoneTransform::from_position(Vec3::Z));
        empty.evaluate(&controller, &mut pose, 0.0);
        assert_eq!(pose.bone_transform("Root").position, Vec3::Z);

        let mut dup = tree_1d(&[1.0, 1.0]);
        dup.set_name("dup");
        assert_eq!(dup.validation_errors().len(), 1);

        let mut planar = BlendTree::new(BlendTreeType::FreeformCartesian2D);
        planar.set_parameters("X", "");
        planar.add_child_tree_2d(Rc::new(BlendTree::new(BlendTreeType::Simple1D)), Vec2::ZERO, "inner").unwrap();
        let errors = planar.validation_errors();
        assert!(errors.contains(&"2D blend tree requires two parameters".to_string()));
        assert!(errors.iter().any(|e| e.starts_with("Child tree 'inner': ")));
        assert!(planar.validate().unwrap_err().is_validation());

        for tree in [&empty, &dup, &planar] {
            assert!(!tree.is_valid());
        }
        assert!(tree_1d(&[0.0, 2.0]).is_valid());
        let mut nested = tree_1d(&[0.0]);
        nested.add_child_tree(Rc::new(tree_1d(&[0.0, 2.0])), 1.0, "inner").unwrap();
        assert!(nested.is_valid());
        assert!(nested.validation_errors().is_empty());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_non_finite_parameters() {
        let skeleton = Rc::new(two_bone_skeleton());
        let tree = tree_1d(&[0.0, 2.0]);
        let mut controller = AnimationController::new();
        controller.set_float("Speed", f32::NAN);
        assert_weights(&tree.node_weights(&controller), &[1.0, 0.0]);
        let mut pose = Pose::new(&skeleton);
        tree.evaluate(&controller, &mut pose, 0.5);
        assert_eq!(pose.bone_transform("Root").position.x, 0.0);

        let mut planar = BlendTree::new(BlendTreeType::FreeformDirectional2D);
        planar.set_parameters("X", "Y");
        planar.add_motion_2d(clip("idle", 0.0), Vec2::ZERO, "idle").unwrap();
        planar.add_motion_2d(clip("fwd", 1.0), Vec2::Y, "fwd").unwrap();
        controller.set_float("X", f32::NAN);
        controller.set_float("Y", 1.0);
        assert_weights(&planar.node_weights(&controller), &[1.0, 0.0]);
    }
}
