//!
//! Keyframe track data structure definition.
//!

use glam::{Quat, Vec3};
use std::fmt::Debug;

use crate::math::{f32_lerp, quat_slerp, vec3_catmull_rom};

/// Two keyframes closer than this are considered at the same time.
const KEY_TIME_EPSILON: f32 = 1e-6;

/// Interpolation mode used from a keyframe to the next one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Interpolation {
    /// Holds the keyframe value until the next keyframe.
    Step,
    #[default]
    Linear,
    /// Catmull-Rom, linear when a neighbour is missing.
    Cubic,
    /// Evaluated as linear.
    Bezier,
}

/// Value type that can be stored in a `Track`.
pub trait TrackValue
where
    Self: Debug + Copy + Clone + PartialEq,
{
    /// Linear interpolation between two values.
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Cubic interpolation between `p1` and `p2`.
    fn cubic(_p0: Self, p1: Self, p2: Self, _p3: Self, t: f32) -> Self {
        return Self::lerp(p1, p2, t);
    }

    // Compare two values with a maximum difference.
    fn abs_diff_eq(a: Self, b: Self, diff: f32) -> bool;
}

impl TrackValue for f32 {
    #[inline]
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        f32_lerp(a, b, t)
    }

    #[inline]
    fn cubic(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
        vec3_catmull_rom(Vec3::splat(p0), Vec3::splat(p1), Vec3::splat(p2), Vec3::splat(p3), t).x
    }

    #[inline]
    fn abs_diff_eq(a: f32, b: f32, diff: f32) -> bool {
        (a - b).abs() <= diff
    }
}

impl TrackValue for Vec3 {
    #[inline]
    fn lerp(a: Vec3, b: Vec3, t: f32) -> Vec3 {
        Vec3::lerp(a, b, t)
    }

    #[inline]
    fn cubic(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
        vec3_catmull_rom(p0, p1, p2, p3, t)
    }

    #[inline]
    fn abs_diff_eq(a: Vec3, b: Vec3, diff: f32) -> bool {
        Vec3::abs_diff_eq(a, b, diff)
    }
}

impl TrackValue for Quat {
    #[inline]
    fn lerp(a: Quat, b: Quat, t: f32) -> Quat {
        quat_slerp(a, b, t)
    }

    #[inline]
    fn abs_diff_eq(a: Quat, b: Quat, diff: f32) -> bool {
        Quat::abs_diff_eq(a, b, diff) || Quat::abs_diff_eq(a, -b, diff)
    }
}

/// A timed value and the interpolation used toward the next keyframe.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Keyframe<V: TrackValue> {
    pub time: f32,
    pub value: V,
    #[cfg_attr(feature = "serde", serde(default))]
    pub interpolation: Interpolation,
}

impl<V: TrackValue> Keyframe<V> {
    #[inline]
    pub fn new(time: f32, value: V) -> Keyframe<V> {
        return Keyframe {
            time,
            value,
            interpolation: Interpolation::Linear,
        };
    }

    #[inline]
    pub fn with_interpolation(time: f32, value: V, interpolation: Interpolation) -> Keyframe<V> {
        return Keyframe {
            time,
            value,
            interpolation,
        };
    }
}

///
/// Keyframes of one animated channel, sorted by time.
///
/// Sampling before the first keyframe returns the first value, after the last keyframe
/// the last value.
///
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track<V: TrackValue> {
    keyframes: Vec<Keyframe<V>>,
}

impl<V: TrackValue> Default for Track<V> {
    fn default() -> Track<V> {
        return Track { keyframes: Vec::new() };
    }
}

impl<V: TrackValue> Track<V> {
    pub fn new() -> Track<V> {
        return Track::default();
    }

    /// Inserts a keyframe, keeping the track sorted.
    /// A keyframe already at the same time is replaced.
    pub fn add_keyframe(&mut self, keyframe: Keyframe<V>) {
        let idx = self.keyframes.partition_point(|k| k.time < keyframe.time - KEY_TIME_EPSILON);
        match self.keyframes.get_mut(idx) {
            Some(existing) if (existing.time - keyframe.time).abs() <= KEY_TIME_EPSILON => *existing = keyframe,
            _ => self.keyframes.insert(idx, keyframe),
        }
    }

    /// Removes the keyframe at `idx`, returns it if it existed.
    pub fn remove_keyframe(&mut self, idx: usize) -> Option<Keyframe<V>> {
        if idx >= self.keyframes.len() {
            return None;
        }
        return Some(self.keyframes.remove(idx));
    }

    #[inline]
    pub fn keyframes(&self) -> &[Keyframe<V>] {
        return &self.keyframes;
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.keyframes.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.keyframes.is_empty();
    }

    #[inline]
    pub fn clear(&mut self) {
        self.keyframes.clear();
    }

    /// Gets the time of the first keyframe, 0 if empty.
    #[inline]
    pub fn start_time(&self) -> f32 {
        return self.keyframes.first().map(|k| k.time).unwrap_or(0.0);
    }

    /// Gets the time of the last keyframe, 0 if empty.
    #[inline]
    pub fn end_time(&self) -> f32 {
        return self.keyframes.last().map(|k| k.time).unwrap_or(0.0);
    }

    /// Samples the track at `time`. `None` if the track has no keyframe.
    pub fn sample(&self, time: f32) -> Option<V> {
        let keys = &self.keyframes;
        let (first, last) = match (keys.first(), keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return None,
        };
        if time.is_nan() || time <= first.time {
            return Some(first.value);
        }
        if time >= last.time {
            return Some(last.value);
        }

        let next = keys.partition_point(|k| k.time <= time);
        let prev = next - 1;
        let (k0, k1) = (&keys[prev], &keys[next]);
        let span = k1.time - k0.time;
        let t = if span > 0.0 { (time - k0.time) / span } else { 0.0 };

        let value = match k0.interpolation {
            Interpolation::Step => k0.value,
            Interpolation::Linear | Interpolation::Bezier => V::lerp(k0.value, k1.value, t),
            Interpolation::Cubic => {
                if prev > 0 && next + 1 < keys.len() {
                    V::cubic(keys[prev - 1].value, k0.value, k1.value, keys[next + 1].value, t)
                } else {
                    V::lerp(k0.value, k1.value, t)
                }
            }
        };
        return Some(value);
    }

    /// Removes keyframes that linear interpolation of the remaining neighbours reproduces
    /// within `tolerance`. Returns the number of removed keyframes.
    ///
    /// Only runs of linear keyframes are simplified, step and cubic keys are kept.
    pub fn optimize(&mut self, tolerance: f32) -> usize {
        let keys = &self.keyframes;
        if keys.len() <= 2 {
            return 0;
        }

        let mut kept = Vec::with_capacity(keys.len());
        kept.push(keys[0]);
        let mut anchor = 0;
        for idx in 1..keys.len() - 1 {
            let a = &keys[anchor];
            let b = &keys[idx + 1];
            let removable = a.interpolation == Interpolation::Linear
                && (anchor + 1..=idx).all(|j| {
                    let k = &keys[j];
                    let t = (k.time - a.time) / (b.time - a.time);
                    k.interpolation == Interpolation::Linear && V::abs_diff_eq(V::lerp(a.value, b.value, t), k.value, tolerance)
                });
            if !removable {
                kept.push(keys[idx]);
                anchor = idx;
            }
        }
        kept.push(keys[keys.len() - 1]);

        let removed = keys.len() - kept.len();
        self.keyframes = kept;
        return removed;
    }

    /// Collapses a track whose keyframes all hold the same value (within `tolerance`)
    /// into its first keyframe. Returns the number of removed keyframes.
    pub fn collapse_constant(&mut self, tolerance: f32) -> usize {
        let first = match self.keyframes.first() {
            Some(first) => first.value,
            None => return 0,
        };
        if !self.keyframes.iter().all(|k| V::abs_diff_eq(k.value, first, tolerance)) {
            return 0;
        }
        let removed = self.keyframes.len() - 1;
        self.keyframes.truncate(1);
        return removed;
    }
}
