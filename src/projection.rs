//! Perspective projection with patchable parameters.
//!
//! The projection caches its scalar inputs (fov, near/far bounds, aspect
//! ratio) and the two derived factors next to the matrix itself, so the
//! setters can rewrite only the cells a parameter touches instead of
//! rebuilding the whole matrix.
//!
//! Applying the matrix to (x, y, z, 1) and dividing by the resulting w
//! yields NDC with x, y in [-1, 1] inside the frustum and z in [0, 1]
//! between the near and far planes.

use crate::math::mat4::Mat4;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;

#[derive(Clone, Copy, Debug)]
pub struct Projection {
    fov: f32,
    znear: f32,
    zfar: f32,
    aspect: f32,
    /// 1 / tan(fov / 2), the x/y scale factor.
    f: f32,
    /// zfar / (zfar - znear), the depth normalization factor.
    q: f32,
    mat: Mat4,
}

impl Projection {
    /// Builds a perspective projection.
    ///
    /// # Arguments
    /// * `fov` - field of view in radians
    /// * `znear`, `zfar` - clip plane distances
    /// * `aspect` - buffer height over width
    pub fn new(fov: f32, znear: f32, zfar: f32, aspect: f32) -> Self {
        let f = 1.0 / (fov / 2.0).tan();
        let q = zfar / (zfar - znear);
        let mat = Mat4::new([
            [aspect * f, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, q, -znear * q],
            [0.0, 0.0, 1.0, 0.0],
        ]);
        Self {
            fov,
            znear,
            zfar,
            aspect,
            f,
            q,
            mat,
        }
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn matrix(&self) -> &Mat4 {
        &self.mat
    }

    /// Updates the field of view, patching the two scale cells.
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.f = 1.0 / (fov / 2.0).tan();
        self.mat.set(0, 0, self.aspect * self.f);
        self.mat.set(1, 1, self.f);
    }

    /// Updates the aspect ratio, patching the x scale cell.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.mat.set(0, 0, aspect * self.f);
    }

    /// Updates the clip plane distances, patching the two depth cells.
    pub fn set_z_bound(&mut self, znear: f32, zfar: f32) {
        self.znear = znear;
        self.zfar = zfar;
        self.q = zfar / (zfar - znear);
        self.mat.set(2, 2, self.q);
        self.mat.set(2, 3, -znear * self.q);
    }

    /// Projects a view-space point into NDC, dividing by w when nonzero.
    pub fn project(&self, v: Vec3) -> Vec3 {
        let h = self.mat * Vec4::from_point(v);
        if h.w != 0.0 {
            Vec3::new(h.x / h.w, h.y / h.w, h.z / h.w)
        } else {
            h.xyz()
        }
    }
}
