//! Free camera with an explicit orthonormal basis.
//!
//! # Coordinate System
//!
//! Left-handed view space: X right, Y up, Z forward into the screen. The
//! camera stores its position plus the (forward, up, right) basis directly
//! and rotates the basis vectors with quaternions. After every rotation the
//! basis is re-orthogonalized to absorb floating-point drift.

use crate::math::mat4::Mat4;
use crate::math::quaternion::Quaternion;
use crate::math::vec3::Vec3;

#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pos: Vec3,
    dir: Vec3,
    up: Vec3,
    right: Vec3,
    step: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    /// Creates a camera at (0, 0, -1) looking toward the origin.
    pub fn new() -> Self {
        Self::with_step(0.01)
    }

    /// Creates the default camera with a specific per-operation step.
    pub fn with_step(step: f32) -> Self {
        let mut camera = Self {
            pos: Vec3::new(0.0, 0.0, -1.0),
            dir: Vec3::FORWARD,
            up: Vec3::UP,
            right: Vec3::RIGHT,
            step: 0.0,
        };
        camera.set_step(step);
        camera
    }

    /// Sets the translation/rotation step, clamped to at most 1.
    pub fn set_step(&mut self, step: f32) {
        self.step = step.abs().min(1.0);
    }

    pub fn position(&self) -> Vec3 {
        self.pos
    }

    pub fn forward(&self) -> Vec3 {
        self.dir
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    // =========================================================================
    // Translation
    // =========================================================================

    pub fn zoom_in(&mut self) {
        self.pos = self.pos + self.dir * self.step;
    }

    pub fn zoom_out(&mut self) {
        self.pos = self.pos - self.dir * self.step;
    }

    pub fn strafe_left(&mut self) {
        self.pos = self.pos - self.right * self.step;
    }

    pub fn strafe_right(&mut self) {
        self.pos = self.pos + self.right * self.step;
    }

    pub fn raise(&mut self) {
        self.pos = self.pos + self.up * self.step;
    }

    pub fn lower(&mut self) {
        self.pos = self.pos - self.up * self.step;
    }

    // =========================================================================
    // Rotation
    // =========================================================================

    pub fn rot_left(&mut self) {
        let q = Quaternion::from_axis_angle(-self.step, self.up);
        self.dir = q.rotate(self.dir);
        self.right = q.rotate(self.right);
        self.force_align();
    }

    pub fn rot_right(&mut self) {
        let q = Quaternion::from_axis_angle(self.step, self.up);
        self.dir = q.rotate(self.dir);
        self.right = q.rotate(self.right);
        self.force_align();
    }

    pub fn rot_up(&mut self) {
        let q = Quaternion::from_axis_angle(-self.step, self.right);
        self.dir = q.rotate(self.dir);
        self.up = q.rotate(self.up);
        self.force_align();
    }

    pub fn rot_down(&mut self) {
        let q = Quaternion::from_axis_angle(self.step, self.right);
        self.dir = q.rotate(self.dir);
        self.up = q.rotate(self.up);
        self.force_align();
    }

    pub fn roll_left(&mut self) {
        let q = Quaternion::from_axis_angle(-self.step, self.dir);
        self.up = q.rotate(self.up);
        self.right = q.rotate(self.right);
        self.force_align();
    }

    pub fn roll_right(&mut self) {
        let q = Quaternion::from_axis_angle(self.step, self.dir);
        self.up = q.rotate(self.up);
        self.right = q.rotate(self.right);
        self.force_align();
    }

    /// Re-orthogonalizes the basis when rounding has crept in: up loses its
    /// projection onto the forward axis, and right is rebuilt as up x dir.
    fn force_align(&mut self) {
        if self.dir.dot(self.up) != 0.0
            || self.dir.dot(self.right) != 0.0
            || self.up.dot(self.right) != 0.0
        {
            self.up = self.up - self.dir * self.up.dot(self.dir);
            self.right = self.up.cross(self.dir);
        }
    }

    // =========================================================================
    // Matrix Generation
    // =========================================================================

    /// Look-at rotation with the camera translation folded into the last
    /// column. Transforms world-space points into view space, where the
    /// camera sits at the origin looking down +Z.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::new([
            [
                self.right.x,
                self.right.y,
                self.right.z,
                -self.pos.dot(self.right),
            ],
            [self.up.x, self.up.y, self.up.z, -self.pos.dot(self.up)],
            [self.dir.x, self.dir.y, self.dir.z, -self.pos.dot(self.dir)],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation-only companion of [`view_matrix`](Self::view_matrix), for
    /// transforming normals.
    pub fn normal_matrix(&self) -> Mat4 {
        Mat4::new([
            [self.right.x, self.right.y, self.right.z, 0.0],
            [self.up.x, self.up.y, self.up.z, 0.0],
            [self.dir.x, self.dir.y, self.dir.z, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }
}
