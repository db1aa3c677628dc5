//!
//! Scalar and quaternion helpers shared by tracks, clips and poses.
//!

use glam::{Quat, Vec3};

/// Linear interpolation between two scalars.
#[inline]
pub(crate) fn f32_lerp(a: f32, b: f32, t: f32) -> f32 {
    return a + (b - a) * t;
}

/// Floating point remainder that always lands in `[0, m)`.
#[inline]
pub(crate) fn f32_wrap(v: f32, m: f32) -> f32 {
    let r = v % m;
    return if r < 0.0 { r + m } else { r };
}

/// Mirrors `v` back and forth over `[0, m]`.
#[inline]
pub(crate) fn f32_ping_pong(v: f32, m: f32) -> f32 {
    let r = f32_wrap(v, 2.0 * m);
    return if r > m { 2.0 * m - r } else { r };
}

/// Spherical interpolation along the shortest arc, result normalized.
#[inline]
pub(crate) fn quat_slerp(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    return a.slerp(b, t).normalize();
}

/// Catmull-Rom spline through `p1`..`p2`, `p0` and `p3` shape the tangents.
#[inline]
pub(crate) fn vec3_catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    return 0.5
        * ((2.0 * p1)
            + (p2 - p0) * t
            + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
            + (3.0 * p1 - p0 - 3.0 * p2 + p3) * t3);
}
