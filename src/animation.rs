//!
//! Animation clip data structure definition.
//!

use glam::{Quat, Vec3};
use std::collections::HashMap;
use std::rc::Rc;

use crate::base::DeterministicState;
use crate::event::{AnimationEvent, AnimationEventManager};
use crate::math::{f32_ping_pong, f32_wrap};
use crate::pose::{BoneTransform, Pose};
use crate::skeleton::Skeleton;
use crate::track::{Interpolation, Keyframe, Track};

/// Tolerance used by `Animation::remove_redundant_keyframes`.
const REDUNDANT_KEY_TOLERANCE: f32 = 1e-4;

/// How time outside `[0, duration]` maps back into the clip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoopMode {
    /// Plays once and stops at the end.
    Once,
    #[default]
    Loop,
    /// Plays forward then backward.
    PingPong,
    /// Holds the last frame.
    Clamp,
}

/// Position, rotation and scale tracks of one bone. An empty track is an absent channel.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BoneTrack {
    pub position: Track<Vec3>,
    pub rotation: Track<Quat>,
    pub scale: Track<Vec3>,
}

impl BoneTrack {
    #[inline]
    pub fn has_any_track(&self) -> bool {
        return !self.position.is_empty() || !self.rotation.is_empty() || !self.scale.is_empty();
    }

    #[inline]
    pub fn keyframe_count(&self) -> usize {
        return self.position.len() + self.rotation.len() + self.scale.len();
    }

    #[inline]
    pub fn end_time(&self) -> f32 {
        return self
            .position
            .end_time()
            .max(self.rotation.end_time())
            .max(self.scale.end_time());
    }
}

/// Result of sampling one bone. Channels without track are flagged absent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub has_position: bool,
    pub has_rotation: bool,
    pub has_scale: bool,
}

impl Default for BonePose {
    fn default() -> BonePose {
        return BonePose {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            has_position: false,
            has_rotation: false,
            has_scale: false,
        };
    }
}

impl BonePose {
    /// Replaces the channels of `base` that this sample holds.
    pub fn apply_to(&self, base: BoneTransform) -> BoneTransform {
        return BoneTransform {
            position: if self.has_position { self.position } else { base.position },
            rotation: if self.has_rotation { self.rotation } else { base.rotation },
            scale: if self.has_scale { self.scale } else { base.scale },
        };
    }
}

///
/// A named skeletal animation clip: per-bone keyframe tracks and timeline events.
///
/// Sampling clamps to the keyframe range, wrapping according to `LoopMode` is up to the
/// caller (see `wrap_time`). Event times are normalized over the clip duration.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Animation {
    name: String,
    duration: f32,
    frame_rate: f32,
    loop_mode: LoopMode,
    bone_tracks: HashMap<String, BoneTrack, DeterministicState>,
    #[cfg_attr(feature = "serde", serde(default))]
    events: AnimationEventManager,
}

impl Animation {
    pub fn new(name: &str) -> Animation {
        return Animation {
            name: name.to_string(),
            duration: 0.0,
            frame_rate: 30.0,
            loop_mode: LoopMode::Loop,
            bone_tracks: HashMap::with_hasher(DeterministicState::new()),
            events: AnimationEventManager::new(),
        };
    }

    /// Gets the name of `Animation`.
    #[inline]
    pub fn name(&self) -> &str {
        return &self.name;
    }

    /// Sets the name of `Animation`.
    #[inline]
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Gets the duration of `Animation` in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        return self.duration;
    }

    /// Sets the duration of `Animation`, negative values are clamped to 0.
    #[inline]
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    #[inline]
    pub fn frame_rate(&self) -> f32 {
        return self.frame_rate;
    }

    #[inline]
    pub fn set_frame_rate(&mut self, frame_rate: f32) {
        self.frame_rate = frame_rate;
    }

    #[inline]
    pub fn loop_mode(&self) -> LoopMode {
        return self.loop_mode;
    }

    #[inline]
    pub fn set_loop_mode(&mut self, loop_mode: LoopMode) {
        self.loop_mode = loop_mode;
    }

    /// Loop and ping-pong clips wrap around, event windows must handle it.
    #[inline]
    pub fn is_looping(&self) -> bool {
        return matches!(self.loop_mode, LoopMode::Loop | LoopMode::PingPong);
    }

    #[inline]
    pub fn is_time_in_range(&self, time: f32) -> bool {
        return time >= 0.0 && time <= self.duration;
    }

    /// Maps any playback time into `[0, duration]` according to the loop mode.
    pub fn wrap_time(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        return match self.loop_mode {
            LoopMode::Once | LoopMode::Clamp => time.clamp(0.0, self.duration),
            LoopMode::Loop => {
                if time >= 0.0 && time <= self.duration {
                    time
                } else {
                    f32_wrap(time, self.duration)
                }
            }
            LoopMode::PingPong => f32_ping_pong(time, self.duration),
        };
    }
}

impl Animation {
    pub fn add_position_keyframe(&mut self, bone: &str, time: f32, position: Vec3) {
        self.add_position_keyframe_with(bone, time, position, Interpolation::Linear);
    }

    pub fn add_position_keyframe_with(&mut self, bone: &str, time: f32, position: Vec3, interpolation: Interpolation) {
        self.bone_track_mut(bone)
            .position
            .add_keyframe(Keyframe::with_interpolation(time, position, interpolation));
        self.extend_duration(time);
    }

    pub fn add_rotation_keyframe(&mut self, bone: &str, time: f32, rotation: Quat) {
        self.add_rotation_keyframe_with(bone, time, rotation, Interpolation::Linear);
    }

    pub fn add_rotation_keyframe_with(&mut self, bone: &str, time: f32, rotation: Quat, interpolation: Interpolation) {
        self.bone_track_mut(bone)
            .rotation
            .add_keyframe(Keyframe::with_interpolation(time, rotation.normalize(), interpolation));
        self.extend_duration(time);
    }

    pub fn add_scale_keyframe(&mut self, bone: &str, time: f32, scale: Vec3) {
        self.add_scale_keyframe_with(bone, time, scale, Interpolation::Linear);
    }

    pub fn add_scale_keyframe_with(&mut self, bone: &str, time: f32, scale: Vec3, interpolation: Interpolation) {
        self.bone_track_mut(bone)
            .scale
            .add_keyframe(Keyframe::with_interpolation(time, scale, interpolation));
        self.extend_duration(time);
    }

    /// Gets the tracks of a bone, created on first use.
    pub fn bone_track_mut(&mut self, bone: &str) -> &mut BoneTrack {
        return self.bone_tracks.entry(bone.to_string()).or_default();
    }

    #[inline]
    pub fn bone_track(&self, bone: &str) -> Option<&BoneTrack> {
        return self.bone_tracks.get(bone);
    }

    #[inline]
    pub fn has_bone(&self, bone: &str) -> bool {
        return self.bone_tracks.contains_key(bone);
    }

    pub fn remove_bone(&mut self, bone: &str) -> bool {
        return self.bone_tracks.remove(bone).is_some();
    }

    /// Gets the names of the bones with at least one track, sorted.
    pub fn animated_bone_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .bone_tracks
            .iter()
            .filter(|(_, track)| track.has_any_track())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        return names;
    }

    pub fn keyframe_count(&self) -> usize {
        return self.bone_tracks.values().map(|t| t.keyframe_count()).sum();
    }

    /// Sets the duration to the time of the last keyframe.
    pub fn recalculate_duration(&mut self) {
        self.duration = self.bone_tracks.values().map(|t| t.end_time()).fold(0.0, f32::max);
    }

    fn extend_duration(&mut self, time: f32) {
        if time > self.duration {
            self.duration = time;
        }
    }

    /// Samples every channel of a bone at `time` seconds.
    pub fn sample_bone(&self, bone: &str, time: f32) -> BonePose {
        let mut pose = BonePose::default();
        let track = match self.bone_tracks.get(bone) {
            Some(track) => track,
            None => return pose,
        };
        if let Some(position) = track.position.sample(time) {
            pose.position = position;
            pose.has_position = true;
        }
        if let Some(rotation) = track.rotation.sample(time) {
            pose.rotation = rotation;
            pose.has_rotation = true;
        }
        if let Some(scale) = track.scale.sample(time) {
            pose.scale = scale;
            pose.has_scale = true;
        }
        return pose;
    }

    /// Writes the sampled bones into `pose`. Absent channels keep the bone bind transform.
    pub fn evaluate(&self, time: f32, pose: &mut Pose) {
        for (bone, track) in self.bone_tracks.iter() {
            if !track.has_any_track() {
                continue;
            }
            let sample = self.sample_bone(bone, time);
            let base = pose.bind_transform(bone);
            pose.set_bone_transform(bone, sample.apply_to(base));
        }
    }

    /// Samples a full pose: bind pose with the animated bones overridden.
    pub fn sample_pose(&self, time: f32, skeleton: &Rc<Skeleton>) -> Pose {
        let mut pose = Pose::new(skeleton);
        self.evaluate(time, &mut pose);
        return pose;
    }
}

impl Animation {
    /// Drops keyframes that interpolation reproduces within `tolerance`, returns how many.
    pub fn optimize_keyframes(&mut self, tolerance: f32) -> usize {
        let mut removed = 0;
        for track in self.bone_tracks.values_mut() {
            removed += track.position.optimize(tolerance);
            removed += track.rotation.optimize(tolerance);
            removed += track.scale.optimize(tolerance);
        }
        return removed;
    }

    /// Drops keyframes carrying no information: constant tracks collapse to one key and
    /// collinear keys are removed.
    pub fn remove_redundant_keyframes(&mut self) -> usize {
        let mut removed = 0;
        for track in self.bone_tracks.values_mut() {
            removed += track.position.collapse_constant(REDUNDANT_KEY_TOLERANCE);
            removed += track.rotation.collapse_constant(REDUNDANT_KEY_TOLERANCE);
            removed += track.scale.collapse_constant(REDUNDANT_KEY_TOLERANCE);
        }
        removed += self.optimize_keyframes(REDUNDANT_KEY_TOLERANCE);
        log::debug!("Removed {} redundant keyframes from animation '{}'", removed, self.name);
        return removed;
    }

    /// Lossy in place compression, sampled values stay within `tolerance`.
    pub fn compress(&mut self, tolerance: f32) {
        let original = self.keyframe_count();
        self.optimize_keyframes(tolerance);
        let compressed = self.keyframe_count();
        let ratio = if original > 0 {
            compressed as f32 / original as f32
        } else {
            1.0
        };
        log::info!(
            "Compressed animation '{}': {} -> {} keyframes (ratio {:.3})",
            self.name,
            original,
            compressed,
            ratio
        );
    }

    /// Compressed clone named `<name>_compressed`. Bones without tracks are dropped.
    pub fn compressed_copy(&self, tolerance: f32) -> Animation {
        let mut copy = self.clone();
        copy.name = format!("{}_compressed", self.name);
        copy.bone_tracks.retain(|_, track| track.has_any_track());
        copy.compress(tolerance);
        return copy;
    }

    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.bone_tracks.is_empty() {
            errors.push(format!("Animation '{}' has no bone animations", self.name));
        } else if !self.bone_tracks.values().any(|t| t.has_any_track()) {
            errors.push(format!("Animation '{}' has no keyframe tracks", self.name));
        }
        if self.duration <= 0.0 {
            errors.push(format!("Animation '{}' has invalid duration {}", self.name, self.duration));
        }
        errors.extend(self.events.validation_errors());
        return errors;
    }

    /// Checks the clip has animated bones and a positive duration.
    pub fn validate_animation(&self) -> bool {
        return self.validation_errors().is_empty();
    }
}

impl Animation {
    #[inline]
    pub fn events(&self) -> &AnimationEventManager {
        return &self.events;
    }

    #[inline]
    pub fn events_mut(&mut self) -> &mut AnimationEventManager {
        return &mut self.events;
    }

    /// Adds an event at a normalized time. Returns false if the event is invalid.
    pub fn add_event(&mut self, event: AnimationEvent) -> bool {
        return self.events.add_event(event);
    }

    pub fn remove_event(&mut self, name: &str, time: f32) -> bool {
        return self.events.remove_event(name, time);
    }

    pub fn remove_all_events(&mut self, name: &str) -> usize {
        return self.events.remove_all_events(name);
    }

    #[inline]
    fn normalize_time(&self, time: f32) -> f32 {
        return if self.duration > 0.0 { time / self.duration } else { 0.0 };
    }

    /// Gets events between two clip times (seconds), sorted by time.
    pub fn events_in_time_range(&self, start: f32, end: f32) -> Vec<AnimationEvent> {
        return self
            .events
            .events_in_range(self.normalize_time(start), self.normalize_time(end));
    }

    /// Gets events fired when playback moves from `prev` to `curr` (seconds).
    pub fn triggered_events(&self, prev: f32, curr: f32, looping: bool) -> Vec<AnimationEvent> {
        if self.duration <= 0.0 {
            return Vec::new();
        }
        return self
            .events
            .triggered_events(self.normalize_time(prev), self.normalize_time(curr), looping);
    }

    /// Calls `callback` for each event fired when playback moves from `prev` to `curr` (seconds).
    pub fn process_events<F>(&self, prev: f32, curr: f32, looping: bool, callback: F)
    where
        F: FnMut(&AnimationEvent),
    {
        if self.duration <= 0.0 {
            return;
        }
        self.events
            .process_events(self.normalize_time(prev), self.normalize_time(curr), looping, callback);
    }
}

#[cfg(test)]
mod tests {
    use wasm_bindgen_test::*;

    use super::*;
    use crate::event::AnimationEventType;
    use crate::test_utils::{two_bone_skeleton, walk_animation};

    #[test]
    #[wasm_bindgen_test]
    fn test_keyframes_extend_duration() {
        let mut anim = Animation::new("Wave");
        assert_eq!(anim.duration(), 0.0);
        anim.add_rotation_keyframe("Arm", 0.0, Quat::IDENTITY);
        anim.add_rotation_keyframe("Arm", 1.5, Quat::from_rotation_x(1.0));
        anim.add_scale_keyframe("Hand", 0.5, Vec3::ONE);
        assert_eq!(anim.duration(), 1.5);
        assert_eq!(anim.keyframe_count(), 3);
        assert_eq!(anim.animated_bone_names(), vec!["Arm", "Hand"]);

        anim.set_duration(4.0);
        anim.recalculate_duration();
        assert_eq!(anim.duration(), 1.5);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_sample_bone_flags() {
        let anim = walk_animation();
        let pose = anim.sample_bone("Root", 0.25);
        assert!(pose.has_position);
        assert!(!pose.has_rotation);
        assert!(!pose.has_scale);
        assert!(pose.position.abs_diff_eq(Vec3::new(0.25, 0.0, 0.0), 1e-6));

        let none = anim.sample_bone("Child", 0.25);
        assert_eq!(none, BonePose::default());

        let clamped = anim.sample_bone("Root", 3.0);
        assert_eq!(clamped.position, Vec3::X);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_wrap_time() {
        let mut anim = walk_animation();
        anim.set_loop_mode(LoopMode::Loop);
        assert!((anim.wrap_time(1.25) - 0.25).abs() < 1e-6);
        assert!((anim.wrap_time(-0.25) - 0.75).abs() < 1e-6);
        assert_eq!(anim.wrap_time(1.0), 1.0);

        anim.set_loop_mode(LoopMode::PingPong);
        assert!((anim.wrap_time(1.25) - 0.75).abs() < 1e-6);

        anim.set_loop_mode(LoopMode::Once);
        assert_eq!(anim.wrap_time(1.25), 1.0);
        assert_eq!(anim.wrap_time(-1.0), 0.0);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_sample_pose_keeps_bind() {
        let skeleton = Rc::new(two_bone_skeleton());
        let anim = walk_animation();
        let pose = anim.sample_pose(0.5, &skeleton);
        assert!(pose.validate_pose());
        assert!(pose.bone_transform("Root").position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
        assert_eq!(pose.bone_transform("Child").position, Vec3::Y);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_clip_events_normalized() {
        let mut anim = walk_animation();
        anim.set_duration(2.0);
        assert!(anim.add_event(AnimationEvent::new("hit", 0.5, AnimationEventType::Combat)));
        assert!(anim.add_event(AnimationEvent::new("start", 0.05, AnimationEventType::Generic)));

        assert_eq!(anim.triggered_events(0.6, 1.2, false).len(), 1);
        assert!(anim.triggered_events(1.2, 1.8, false).is_empty());
        let wrapped = anim.triggered_events(1.8, 0.2, true);
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].name, "start");
        assert_eq!(anim.events_in_time_range(0.0, 2.0).len(), 2);

        let mut count = 0;
        anim.process_events(0.0, 2.0, false, |_| count += 1);
        assert_eq!(count, 2);

        assert!(anim.remove_event("hit", 0.5));
        assert_eq!(anim.events().len(), 1);
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_validation() {
        let empty = Animation::new("Empty");
        let errors = empty.validation_errors();
        assert_eq!(errors.len(), 2);
        assert!(!empty.validate_animation());
        assert!(walk_animation().validate_animation());
    }

    #[test]
    #[wasm_bindgen_test]
    fn test_compression() {
        let mut anim = Animation::new("Slide");
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            anim.add_position_keyframe("Root", t, Vec3::new(t * 2.0, 0.0, 0.0));
            anim.add_scale_keyframe("Root", t, Vec3::ONE);
        }
        anim.bone_track_mut("Empty");

        let copy = anim.compressed_copy(1e-4);
        assert_eq!(copy.name(), "Slide_compressed");
        assert_eq!(copy.keyframe_count(), 4);
        assert!(!copy.has_bone("Empty"));
        for i in 0..=20 {
            let t = i as f32 / 20.0;
            let a = anim.sample_bone("Root", t).position;
            let b = copy.sample_bone("Root", t).position;
            assert!(a.abs_diff_eq(b, 1e-4));
        }

        let removed = anim.remove_redundant_keyframes();
        assert_eq!(removed, 19);
        assert_eq!(anim.keyframe_count(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    #[wasm_bindgen_test]
    fn test_animation_serde() {
        let mut anim = walk_animation();
        anim.add_event(AnimationEvent::footstep("step", 0.5, "left", 1.0));
        let json = serde_json::to_string(&anim).unwrap();
        let back: Animation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, anim);
        assert!(back.validate_animation());
    }
}
