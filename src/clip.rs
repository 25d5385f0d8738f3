//! Triangle clipping against planes, Sutherland-Hodgman style.
//!
//! Each clip operates on a position triangle plus N parallel attribute
//! triangles (vertex normals, pre-projection positions). When an edge is
//! cut, every attribute is interpolated by the same factor as the position,
//! so the parallel triangles never drift out of step. A face normal rides
//! along untouched.
//!
//! Clipping one triangle against one plane yields zero, one, or two
//! triangles; cascading through K planes therefore fans out to at most 2^K.

use crate::math::triangle::Triangle;
use crate::math::vec3::Vec3;

/// A clip plane given as a point on the plane and its normal. The normal
/// points toward the kept half-space and is normalized on construction.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    point: Vec3,
    normal: Vec3,
}

impl Plane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Signed distance from a point to the plane. Non-negative means the
    /// point is on the kept side.
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        (p - self.point).dot(self.normal)
    }

    /// Where the segment from `from` to `to` crosses the plane, and the
    /// interpolation factor t measured from `from`.
    fn intersect(&self, from: Vec3, to: Vec3) -> (Vec3, f32) {
        let plane_d = -self.normal.dot(self.point);
        let ad = from.dot(self.normal);
        let bd = to.dot(self.normal);
        let t = (-plane_d - ad) / (bd - ad);
        (from + (to - from) * t, t)
    }
}

/// A position triangle with its parallel attribute triangles and the face
/// normal the cull stage reads.
#[derive(Clone, Copy, Debug)]
pub struct ClipTri<const N: usize> {
    pub pos: Triangle,
    pub attrs: [Triangle; N],
    pub face_normal: Vec3,
}

fn lerp(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    from + (to - from) * t
}

/// Clips one triangle against one plane, pushing the surviving triangles
/// into `out`.
pub fn clip_triangle<const N: usize>(plane: &Plane, tri: &ClipTri<N>, out: &mut Vec<ClipTri<N>>) {
    let points = tri.pos.points;
    let distances = [
        plane.signed_distance(points[0]),
        plane.signed_distance(points[1]),
        plane.signed_distance(points[2]),
    ];

    let mut inside = [0usize; 3];
    let mut outside = [0usize; 3];
    let mut num_inside = 0;
    let mut num_outside = 0;
    for (k, d) in distances.iter().enumerate() {
        if *d >= 0.0 {
            inside[num_inside] = k;
            num_inside += 1;
        } else {
            outside[num_outside] = k;
            num_outside += 1;
        }
    }

    match num_inside {
        0 => {}
        3 => out.push(*tri),
        2 => {
            // Two corners kept: the cut runs across the quad left behind,
            // which splits into two triangles.
            let (i1, i2, o) = (inside[0], inside[1], outside[0]);
            let (a, ta) = plane.intersect(points[i1], points[o]);
            let (b, tb) = plane.intersect(points[i2], points[o]);

            let mut first = ClipTri {
                pos: Triangle::new(a, points[i1], points[i2]),
                attrs: [Triangle::default(); N],
                face_normal: tri.face_normal,
            };
            let mut second = ClipTri {
                pos: Triangle::new(a, points[i2], b),
                attrs: [Triangle::default(); N],
                face_normal: tri.face_normal,
            };
            for (j, attr) in tri.attrs.iter().enumerate() {
                let cut_a = lerp(attr.points[i1], attr.points[o], ta);
                let cut_b = lerp(attr.points[i2], attr.points[o], tb);
                first.attrs[j] = Triangle::new(cut_a, attr.points[i1], attr.points[i2]);
                second.attrs[j] = Triangle::new(cut_a, attr.points[i2], cut_b);
            }
            out.push(first);
            out.push(second);
        }
        1 => {
            // One corner kept: both far corners pull back to the plane.
            let (i, o1, o2) = (inside[0], outside[0], outside[1]);
            let (a, ta) = plane.intersect(points[i], points[o1]);
            let (b, tb) = plane.intersect(points[i], points[o2]);

            let mut clipped = ClipTri {
                pos: Triangle::new(points[i], a, b),
                attrs: [Triangle::default(); N],
                face_normal: tri.face_normal,
            };
            for (j, attr) in tri.attrs.iter().enumerate() {
                clipped.attrs[j] = Triangle::new(
                    attr.points[i],
                    lerp(attr.points[i], attr.points[o1], ta),
                    lerp(attr.points[i], attr.points[o2], tb),
                );
            }
            out.push(clipped);
        }
        _ => unreachable!(),
    }
}

/// Runs every triangle through each plane in sequence, expanding the
/// working set as cuts produce extra triangles.
pub fn clip_cascade<const N: usize>(planes: &[Plane], tris: Vec<ClipTri<N>>) -> Vec<ClipTri<N>> {
    let mut work = tris;
    for plane in planes {
        let mut next = Vec::with_capacity(work.len() + 4);
        for tri in &work {
            clip_triangle(plane, tri, &mut next);
        }
        work = next;
    }
    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn near_plane(z: f32) -> Plane {
        Plane::new(Vec3::new(0.0, 0.0, z), Vec3::FORWARD)
    }

    fn bare(tri: Triangle) -> ClipTri<1> {
        ClipTri {
            pos: tri,
            attrs: [tri],
            face_normal: Vec3::UP,
        }
    }

    #[test]
    fn triangle_fully_inside_passes_through_unchanged() {
        let tri = bare(Triangle::new(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 3.0),
            Vec3::new(0.0, 1.0, 4.0),
        ));
        let mut out = Vec::new();
        clip_triangle(&near_plane(1.0), &tri, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].pos, tri.pos);
        assert_eq!(out[0].attrs[0], tri.attrs[0]);
    }

    #[test]
    fn triangle_fully_outside_is_discarded() {
        let tri = bare(Triangle::new(
            Vec3::new(0.0, 0.0, 0.2),
            Vec3::new(1.0, 0.0, 0.5),
            Vec3::new(0.0, 1.0, 0.9),
        ));
        let mut out = Vec::new();
        clip_triangle(&near_plane(1.0), &tri, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn one_outside_vertex_splits_into_two_triangles() {
        let tri = bare(Triangle::new(
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(-1.0, 0.0, 5.0),
            Vec3::new(1.0, 0.0, 5.0),
        ));
        let mut out = Vec::new();
        clip_triangle(&near_plane(1.0), &tri, &mut out);
        assert_eq!(out.len(), 2);
        for clipped in &out {
            for p in clipped.pos.points {
                assert!(p.z >= 1.0 - 1e-4);
            }
            let min_z = clipped
                .pos
                .points
                .iter()
                .map(|p| p.z)
                .fold(f32::INFINITY, f32::min);
            assert_relative_eq!(min_z, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn two_outside_vertices_shrink_to_one_triangle() {
        let tri = bare(Triangle::new(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ));
        let mut out = Vec::new();
        clip_triangle(&near_plane(1.0), &tri, &mut out);
        assert_eq!(out.len(), 1);
        // The kept corner survives; the two cut corners land on the plane.
        assert_relative_eq!(out[0].pos.points[0].z, 3.0);
        assert_relative_eq!(out[0].pos.points[1].z, 1.0, epsilon = 1e-5);
        assert_relative_eq!(out[0].pos.points[2].z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn boundary_vertices_follow_the_position_interpolation_factor() {
        // One inside vertex at z=2, both others outside at z=0. The cuts sit
        // at t = 0.5 along each edge, and the attribute triangle must be cut
        // by the same factor.
        let pos = Triangle::new(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(-2.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
        );
        let attr = Triangle::new(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        );
        let tri = ClipTri {
            pos,
            attrs: [attr],
            face_normal: Vec3::UP,
        };
        let mut out = Vec::new();
        clip_triangle(&near_plane(1.0), &tri, &mut out);
        assert_eq!(out.len(), 1);

        let clipped = &out[0];
        for k in 1..3 {
            let p = clipped.pos.points[k];
            // V = P_in + t (P_out - P_in) with t in [0, 1].
            let t = (p - pos.points[0]).magnitude() / (pos.points[k] - pos.points[0]).magnitude();
            assert!((0.0..=1.0).contains(&t));
            assert_relative_eq!(t, 0.5, epsilon = 1e-5);

            let expected = attr.points[0] + (attr.points[k] - attr.points[0]) * t;
            assert_relative_eq!(clipped.attrs[0].points[k].x, expected.x, epsilon = 1e-5);
            assert_relative_eq!(clipped.attrs[0].points[k].y, expected.y, epsilon = 1e-5);
            assert_relative_eq!(clipped.attrs[0].points[k].z, expected.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn cascade_through_crossed_planes_keeps_the_corner_region() {
        // A big square-ish triangle clipped to x >= 0 and y >= 0.
        let tri = bare(Triangle::new(
            Vec3::new(-2.0, -2.0, 1.0),
            Vec3::new(2.0, -2.0, 1.0),
            Vec3::new(0.0, 2.0, 1.0),
        ));
        let planes = [
            Plane::new(Vec3::ZERO, Vec3::RIGHT),
            Plane::new(Vec3::ZERO, Vec3::UP),
        ];
        let out = clip_cascade(&planes, vec![tri]);
        assert!(!out.is_empty());
        for clipped in &out {
            for p in clipped.pos.points {
                assert!(p.x >= -1e-5);
                assert!(p.y >= -1e-5);
            }
        }
    }

    #[test]
    fn non_unit_plane_normal_is_normalized() {
        let plane = Plane::new(Vec3::new(0.9, 0.0, 0.0), Vec3::new(-0.9, 0.0, 0.0));
        assert_relative_eq!(plane.signed_distance(Vec3::ZERO), 0.9, epsilon = 1e-5);
    }
}
