//! Unit quaternions for axis-angle rotation.
//!
//! A rotation of `angle` radians about a unit `axis` is encoded as
//! `(cos(angle/2), sin(angle/2) * axis)` and applied to a vector v as
//! `q * v * q.conjugate()` with v lifted to a pure quaternion.

use std::ops::Mul;

use super::vec3::Vec3;

/// A quaternion as a plain (w, x, y, z) tuple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Builds the rotation of `angle` radians about `axis`.
    /// The axis is expected to be unit length.
    pub fn from_axis_angle(angle: f32, axis: Vec3) -> Self {
        let half = angle / 2.0;
        let s = half.sin();
        Self {
            w: half.cos(),
            x: s * axis.x,
            y: s * axis.y,
            z: s * axis.z,
        }
    }

    /// Lifts a vector into a pure quaternion (w = 0).
    pub fn from_vector(v: Vec3) -> Self {
        Self {
            w: 0.0,
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }

    /// The vector part (x, y, z).
    pub fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotates a vector: q * v * q.conjugate().
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        (*self * Quaternion::from_vector(v) * self.conjugate()).vector()
    }
}

/// Hamilton product of two quaternions.
impl Mul<Quaternion> for Quaternion {
    type Output = Quaternion;

    fn mul(self, q: Quaternion) -> Self::Output {
        Quaternion {
            w: self.w * q.w - self.x * q.x - self.y * q.y - self.z * q.z,
            x: self.w * q.x + self.x * q.w + self.y * q.z - self.z * q.y,
            y: self.w * q.y - self.x * q.z + self.y * q.w + self.z * q.x,
            z: self.w * q.z + self.x * q.y - self.y * q.x + self.z * q.w,
        }
    }
}
