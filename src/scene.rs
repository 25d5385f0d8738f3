//! Scene orchestration: models, their transforms, lights, camera, and the
//! per-frame draw pipeline.
//!
//! `draw` walks every model face through the full chain: model rotation,
//! local-to-world, world-to-view, near/far clipping, back-face culling,
//! perspective projection, screen-bound clipping, and finally wireframe or
//! lit-and-filled rasterization into the frame buffers.

use std::sync::Arc;

use log::warn;

use crate::camera::Camera;
use crate::clip::{clip_cascade, ClipTri, Plane};
use crate::color::Color;
use crate::math::mat4::Mat4;
use crate::math::quaternion::Quaternion;
use crate::math::triangle::Triangle;
use crate::math::vec3::Vec3;
use crate::math::vec4::Vec4;
use crate::model::Model;
use crate::projection::Projection;
use crate::render::framebuffer::FrameBuffers;
use crate::render::raster::{draw_wire_triangle, fill_triangle, ScreenVertex};
use crate::window::KeyLatches;

/// Per-model rotation state: one quaternion per axis, rebuilt from the
/// accumulated angle whenever an axis changes, applied in a configurable
/// order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Rotation {
    quats: [Quaternion; 3],
    angles: [f32; 3],
    order: [usize; 3],
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            quats: [Quaternion::IDENTITY; 3],
            angles: [0.0; 3],
            order: [0, 1, 2],
        }
    }
}

impl Rotation {
    const AXES: [Vec3; 3] = [Vec3::RIGHT, Vec3::UP, Vec3::FORWARD];

    fn add(&mut self, axis: usize, rads: f32) {
        self.angles[axis] += rads;
        self.quats[axis] = Quaternion::from_axis_angle(self.angles[axis], Self::AXES[axis]);
    }

    fn apply(&self, v: Vec3) -> Vec3 {
        let mut out = v;
        for &axis in &self.order {
            out = self.quats[axis].rotate(out);
        }
        out
    }
}

#[derive(Debug)]
pub struct Scene {
    models: Vec<Arc<Model>>,
    translates: Vec<Mat4>,
    scales: Vec<Mat4>,
    rotations: Vec<Rotation>,
    lights: Vec<Vec3>,
    projection: Projection,
    camera: Camera,
    wireframe: bool,
    cam_light: bool,
    cull_threshold: f32,
}

impl Scene {
    /// Creates an empty scene sized for a buffer of the given dimensions:
    /// 90 degree fov, z bounds [1, 10], wireframe and camera light on.
    pub fn new(width: u32, height: u32) -> Self {
        let aspect = height as f32 / width as f32;
        Self {
            models: Vec::new(),
            translates: Vec::new(),
            scales: Vec::new(),
            rotations: Vec::new(),
            lights: Vec::new(),
            projection: Projection::new(std::f32::consts::FRAC_PI_2, 1.0, 10.0, aspect),
            camera: Camera::new(),
            wireframe: true,
            cam_light: true,
            cull_threshold: -0.9999,
        }
    }

    /// Registers a model at a position and uniform scale. Returns its index.
    pub fn reg_model(&mut self, model: Arc<Model>, center: Vec3, scale: f32) -> usize {
        self.models.push(model);
        self.translates
            .push(Mat4::translation(center.x, center.y, center.z));
        self.scales.push(Mat4::scaling(scale));
        self.rotations.push(Rotation::default());
        self.models.len() - 1
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn model(&self, index: usize) -> &Arc<Model> {
        &self.models[index]
    }

    pub fn set_pos(&mut self, index: usize, center: Vec3) {
        let t = &mut self.translates[index];
        t.set(0, 3, center.x);
        t.set(1, 3, center.y);
        t.set(2, 3, center.z);
    }

    pub fn set_scale(&mut self, index: usize, scale: f32) {
        let s = &mut self.scales[index];
        s.set(0, 0, scale);
        s.set(1, 1, scale);
        s.set(2, 2, scale);
    }

    /// Sets the order the per-axis rotations are applied in; entries index
    /// the x, y, z axes.
    pub fn set_rot_order(&mut self, index: usize, order: [usize; 3]) {
        if order.iter().any(|&axis| axis > 2) {
            warn!("ignoring rotation order with out-of-range axis: {:?}", order);
            return;
        }
        self.rotations[index].order = order;
    }

    pub fn add_pitch(&mut self, index: usize, rads: f32) {
        self.rotations[index].add(0, rads);
    }

    pub fn add_yaw(&mut self, index: usize, rads: f32) {
        self.rotations[index].add(1, rads);
    }

    pub fn add_roll(&mut self, index: usize, rads: f32) {
        self.rotations[index].add(2, rads);
    }

    /// Adds a world-space point light. Returns its index.
    pub fn add_light(&mut self, p: Vec3) -> usize {
        self.lights.push(p);
        self.lights.len() - 1
    }

    pub fn lights(&self) -> &[Vec3] {
        &self.lights
    }

    pub fn set_wireframe(&mut self, wireframe: bool) {
        self.wireframe = wireframe;
    }

    pub fn is_wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn set_cam_light(&mut self, cam_light: bool) {
        self.cam_light = cam_light;
    }

    pub fn is_cam_light(&self) -> bool {
        self.cam_light
    }

    /// Back-face cull keep threshold on the dot product between the view
    /// ray and the face normal. The default of -0.9999 drops only faces
    /// pointing almost exactly away; 0.0 gives conventional culling.
    pub fn set_cull_threshold(&mut self, threshold: f32) {
        self.cull_threshold = threshold;
    }

    pub fn set_fov(&mut self, fov_rad: f32) {
        self.projection.set_fov(fov_rad);
    }

    pub fn set_z_bound(&mut self, znear: f32, zfar: f32) {
        self.projection.set_z_bound(znear, zfar);
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn set_cam_step(&mut self, step: f32) {
        self.camera.set_step(step);
    }

    /// Applies one camera operation per latched key and resets the latches.
    pub fn process_inputs(&mut self, keys: &mut KeyLatches) {
        if std::mem::take(&mut keys.up) {
            self.camera.rot_up();
        }
        if std::mem::take(&mut keys.down) {
            self.camera.rot_down();
        }
        if std::mem::take(&mut keys.left) {
            self.camera.rot_left();
        }
        if std::mem::take(&mut keys.right) {
            self.camera.rot_right();
        }
        if std::mem::take(&mut keys.w) {
            self.camera.zoom_in();
        }
        if std::mem::take(&mut keys.s) {
            self.camera.zoom_out();
        }
        if std::mem::take(&mut keys.a) {
            self.camera.strafe_left();
        }
        if std::mem::take(&mut keys.d) {
            self.camera.strafe_right();
        }
        if std::mem::take(&mut keys.z) {
            self.camera.roll_left();
        }
        if std::mem::take(&mut keys.c) {
            self.camera.roll_right();
        }
        if std::mem::take(&mut keys.tab) {
            self.camera.raise();
        }
        if std::mem::take(&mut keys.shift) {
            self.camera.lower();
        }
    }

    /// Renders every model into the frame buffers.
    pub fn draw(&self, frame: &mut FrameBuffers) {
        let view = self.camera.view_matrix();
        let normal_view = self.camera.normal_matrix();

        for (i, model) in self.models.iter().enumerate() {
            let local_to_world = self.scales[i] * self.translates[i];
            let rotation = &self.rotations[i];

            // Model space into view space, one triangle per face.
            let mut staged: Vec<ClipTri<1>> = Vec::with_capacity(model.faces().len());
            for (face, &face_normal) in model.faces().iter().zip(model.face_normals()) {
                let mut pos = [Vec3::ZERO; 3];
                let mut norm = [Vec3::ZERO; 3];
                for k in 0..3 {
                    let mut v = model.vertices()[face[k].vert as usize];
                    let mut n = if face[k].norm >= 0 {
                        model.vert_normals()[face[k].norm as usize]
                    } else {
                        Vec3::ZERO
                    };
                    v = rotation.apply(v);
                    n = rotation.apply(n);
                    v = local_to_world * v;
                    pos[k] = view * v;
                    norm[k] = (normal_view * Vec4::from_point(n)).xyz();
                }
                let f_norm = (normal_view * Vec4::from_point(rotation.apply(face_normal))).xyz();
                staged.push(ClipTri {
                    pos: Triangle {
                        points: pos,
                    },
                    attrs: [Triangle { points: norm }],
                    face_normal: f_norm,
                });
            }

            // Lights into view space; the camera light sits at the origin
            // there.
            let mut lights: Vec<Vec3> = self.lights.iter().map(|&l| view * l).collect();
            if self.cam_light {
                lights.push(Vec3::ZERO);
            }

            // Clip against the near and far planes.
            let z_planes = [
                Plane::new(
                    Vec3::new(0.0, 0.0, self.projection.znear()),
                    Vec3::FORWARD,
                ),
                Plane::new(Vec3::new(0.0, 0.0, self.projection.zfar()), Vec3::BACK),
            ];
            let staged = clip_cascade(&z_planes, staged);

            // Back-face cull; the camera is at the view-space origin.
            let staged: Vec<ClipTri<1>> = staged
                .into_iter()
                .filter(|tri| {
                    let to_camera = -tri.pos.centroid();
                    to_camera.normalize().dot(tri.face_normal.normalize()) >= self.cull_threshold
                })
                .collect();

            // Project into NDC, keeping the view-space positions for
            // lighting.
            let mut projected: Vec<ClipTri<2>> = Vec::with_capacity(staged.len());
            for tri in staged {
                let world = tri.pos;
                let points = tri.pos.points;
                let ndc = Triangle::new(
                    self.projection.project(points[0]),
                    self.projection.project(points[1]),
                    self.projection.project(points[2]),
                );
                projected.push(ClipTri {
                    pos: ndc,
                    attrs: [tri.attrs[0], world],
                    face_normal: tri.face_normal,
                });
            }

            // Clip against the screen-space x and y bounds.
            let xy_planes = [
                Plane::new(Vec3::new(-0.9, 0.0, 0.0), Vec3::RIGHT),
                Plane::new(Vec3::new(0.9, 0.0, 0.0), -Vec3::RIGHT),
                Plane::new(Vec3::new(0.0, -0.9, 0.0), Vec3::UP),
                Plane::new(Vec3::new(0.0, 0.9, 0.0), -Vec3::UP),
            ];
            let projected = clip_cascade(&xy_planes, projected);

            for tri in &projected {
                self.rasterize(frame, tri, &lights, model.color());
            }
        }
    }

    /// Maps one NDC triangle to pixels and draws it, either as a wireframe
    /// in the model color or filled with per-vertex lighting.
    fn rasterize(&self, frame: &mut FrameBuffers, tri: &ClipTri<2>, lights: &[Vec3], color: Color) {
        let width = frame.width() as f32;
        let height = frame.height() as f32;
        let norms = tri.attrs[0];
        let world = tri.attrs[1];

        let to_screen = |ndc: Vec3| {
            (
                ((ndc.x + 1.0) * width / 2.0) as i32,
                ((ndc.y + 1.0) * height / 2.0) as i32,
            )
        };

        if self.wireframe {
            let [a, b, c] = tri.pos.points.map(|p| {
                let (x, y) = to_screen(p);
                ScreenVertex::new(x, y, p.z, color)
            });
            draw_wire_triangle(frame, a, b, c);
            return;
        }

        let mut verts = [ScreenVertex::new(0, 0, 0.0, color); 3];
        for k in 0..3 {
            let mut lit = 0.0f32;
            for &light in lights {
                let to_light = (light - world.points[k]).normalize();
                lit += to_light.dot(norms.points[k].normalize()).max(0.0);
            }
            let shade = if lit >= 1.0 {
                color
            } else if lit <= 0.0 {
                Color::BLACK
            } else {
                color * lit
            };
            let (x, y) = to_screen(tri.pos.points[k]);
            verts[k] = ScreenVertex::new(x, y, tri.pos.points[k].z, shade);
        }
        fill_triangle(frame, verts[0], verts[1], verts[2]);
    }
}
