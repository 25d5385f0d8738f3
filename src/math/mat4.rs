//! 4x4 transformation matrix using column-major convention.
//!
//! # Convention
//! - Vectors are **column vectors** on the right: `Mat4 * Vec`
//! - Translation is stored in the **last column**
//! - Transforms chain **right-to-left**: `A * B * v` applies B first, then A

use std::ops::Mul;

use super::vec3::Vec3;
use super::vec4::Vec4;

/// 4x4 matrix stored as `data[row][col]` with column-major convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    data: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn new(data: [[f32; 4]; 4]) -> Self {
        Mat4 { data }
    }

    pub fn identity() -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a translation matrix.
    ///
    /// Translation is stored in the last column (column-major convention).
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        Mat4::new([
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Creates a uniform scale matrix.
    pub fn scaling(s: f32) -> Self {
        Mat4::new([
            [s, 0.0, 0.0, 0.0],
            [0.0, s, 0.0, 0.0],
            [0.0, 0.0, s, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Access element at [row][col].
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row][col]
    }

    /// Set element at [row][col].
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[row][col] = value;
    }
}

/// Matrix multiplication: Mat4 * Mat4.
///
/// For column-major convention, `A * B * v` applies B first, then A.
impl Mul<Mat4> for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut result = [[0.0f32; 4]; 4];

        for row in 0..4 {
            for col in 0..4 {
                result[row][col] = self.data[row][0] * rhs.data[0][col]
                    + self.data[row][1] * rhs.data[1][col]
                    + self.data[row][2] * rhs.data[2][col]
                    + self.data[row][3] * rhs.data[3][col];
            }
        }

        Mat4::new(result)
    }
}

/// Transform a Vec4 by a matrix: Mat4 * Vec4 (column vector).
impl Mul<Vec4> for Mat4 {
    type Output = Vec4;

    fn mul(self, v: Vec4) -> Self::Output {
        Vec4::new(
            self.data[0][0] * v.x
                + self.data[0][1] * v.y
                + self.data[0][2] * v.z
                + self.data[0][3] * v.w,
            self.data[1][0] * v.x
                + self.data[1][1] * v.y
                + self.data[1][2] * v.z
                + self.data[1][3] * v.w,
            self.data[2][0] * v.x
                + self.data[2][1] * v.y
                + self.data[2][2] * v.z
                + self.data[2][3] * v.w,
            self.data[3][0] * v.x
                + self.data[3][1] * v.y
                + self.data[3][2] * v.z
                + self.data[3][3] * v.w,
        )
    }
}

/// Transform a point: Mat4 * Vec3 (treats Vec3 as a column vector with w=1,
/// discarding the resulting w).
impl Mul<Vec3> for Mat4 {
    type Output = Vec3;

    fn mul(self, v: Vec3) -> Self::Output {
        (self * Vec4::from_point(v)).xyz()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_leaves_point_unchanged() {
        let p = Vec3::new(1.0, -2.0, 3.0);
        let out = Mat4::identity() * p;
        assert_relative_eq!(out.x, p.x);
        assert_relative_eq!(out.y, p.y);
        assert_relative_eq!(out.z, p.z);
    }

    #[test]
    fn translation_moves_point() {
        let out = Mat4::translation(1.0, 2.0, 3.0) * Vec3::ZERO;
        assert_relative_eq!(out.x, 1.0);
        assert_relative_eq!(out.y, 2.0);
        assert_relative_eq!(out.z, 3.0);
    }

    #[test]
    fn scale_then_translate_chains_right_to_left() {
        // scale * translate applies the translation first, then scales it
        let m = Mat4::scaling(2.0) * Mat4::translation(0.0, 0.0, 3.0);
        let out = m * Vec3::new(0.0, 0.0, 1.0);
        assert_relative_eq!(out.z, 8.0);
    }
}
