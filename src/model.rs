//! Mesh model: wavefront-style parsing and preprocessing.
//!
//! A [`Model`] is built from a restricted OBJ dialect (`v`, `vn`, `vt`, `f`;
//! anything else is ignored) and then pushed through a fixed pipeline:
//! vertex normalization into [-1, 1], ear-clip triangulation of polygon
//! faces, normal derivation when the file supplies none, renormalization of
//! every normal, and a centroid shift so the model is centered at the
//! origin. Models are immutable after construction and shared by the scene
//! through `Arc`.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, error, warn};

use crate::color::Color;
use crate::math::triangle::Triangle;
use crate::math::vec3::Vec3;

/// One corner of a face: indices into the vertex, texcoord, and normal
/// lists. Indices are 0-based; -1 marks an absent reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexRef {
    pub vert: i32,
    pub tex: i32,
    pub norm: i32,
}

/// A triangulated face.
pub type Face = [VertexRef; 3];

#[derive(Debug)]
pub enum MeshError {
    Io(io::Error),
    /// A face token had a delimiter but no leading vertex index, or a field
    /// that was not an integer.
    InvalidFaceToken { line: usize, token: String },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshError::Io(e) => write!(f, "failed to read mesh file: {}", e),
            MeshError::InvalidFaceToken { line, token } => {
                write!(f, "invalid face token '{}' on line {}", token, line)
            }
        }
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MeshError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for MeshError {
    fn from(e: io::Error) -> Self {
        MeshError::Io(e)
    }
}

#[derive(Clone, Debug)]
pub struct Model {
    vertices: Vec<Vec3>,
    texcoords: Vec<Vec3>,
    vert_normals: Vec<Vec3>,
    face_normals: Vec<Vec3>,
    faces: Vec<Face>,
    color: Color,
}

impl Model {
    /// Parses a mesh file from disk. A missing file surfaces as
    /// `MeshError::Io`; callers that have a fallback asset are expected to
    /// recover from that case themselves.
    pub fn from_obj(path: &Path) -> Result<Self, MeshError> {
        debug!("parsing mesh {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parses a mesh from any buffered reader and runs the preprocessing
    /// pipeline.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MeshError> {
        let mut vertices: Vec<Vec3> = Vec::new();
        let mut texcoords: Vec<Vec3> = Vec::new();
        let mut vert_normals: Vec<Vec3> = Vec::new();
        let mut rings: Vec<Vec<VertexRef>> = Vec::new();

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            let Some(directive) = tokens.next() else {
                continue;
            };
            match directive {
                "v" => vertices.push(read_vec3(&mut tokens)),
                "vn" => vert_normals.push(read_vec3(&mut tokens)),
                "vt" => {
                    let u = read_float(&mut tokens);
                    let v = read_float(&mut tokens);
                    texcoords.push(Vec3::new(u, v, 0.0));
                }
                "f" => {
                    let mut ring = Vec::new();
                    for token in tokens {
                        ring.push(parse_face_token(token, line_idx + 1)?);
                    }
                    rings.push(ring);
                }
                _ => debug!("ignoring directive '{}'", directive),
            }
        }

        let mut model = Model {
            vertices,
            texcoords,
            vert_normals,
            face_normals: Vec::new(),
            faces: Vec::new(),
            color: Color::WHITE,
        };
        model.normalize_vertices();
        model.faces = triangulate(rings, &model.vertices, model.texcoords.len(), model.vert_normals.len());
        model.derive_normals();
        model.renormalize_normals();
        model.center_vertices();
        debug!(
            "mesh loaded: {} vertices, {} faces",
            model.vertices.len(),
            model.faces.len()
        );
        Ok(model)
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn texcoords(&self) -> &[Vec3] {
        &self.texcoords
    }

    pub fn vert_normals(&self) -> &[Vec3] {
        &self.vert_normals
    }

    pub fn face_normals(&self) -> &[Vec3] {
        &self.face_normals
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Divides every vertex by the largest absolute component so the model
    /// fits in [-1, 1] on all axes.
    fn normalize_vertices(&mut self) {
        let largest = self
            .vertices
            .iter()
            .map(|v| v.x.abs().max(v.y.abs()).max(v.z.abs()))
            .fold(0.0f32, f32::max);
        if largest > 0.0 {
            for v in &mut self.vertices {
                *v = *v / largest;
            }
        }
    }

    /// Fills in face normals, and vertex normals too when the file did not
    /// supply any.
    fn derive_normals(&mut self) {
        if self.vert_normals.is_empty() {
            warn!("no vertex normals in file, deriving from face geometry");
            let centroid = average(&self.vertices);
            for face in &mut self.faces {
                let a = self.vertices[face[0].vert as usize];
                let b = self.vertices[face[1].vert as usize];
                let c = self.vertices[face[2].vert as usize];

                // Orient the cross product outward: flip it when it points
                // back toward the model centroid.
                let outward = (a + b + c) / 3.0 - centroid;
                let mut normal = (b - a).cross(c - a);
                if normal.dot(outward) < 0.0 {
                    normal = (c - a).cross(b - a);
                }
                let normal = normal.normalize();
                self.face_normals.push(normal);
                for corner in face.iter_mut() {
                    corner.norm = self.vert_normals.len() as i32;
                    self.vert_normals.push(normal);
                }
            }
        } else {
            let normals = &self.vert_normals;
            let lookup = |r: &VertexRef| {
                if r.norm >= 0 {
                    normals[r.norm as usize]
                } else {
                    Vec3::ZERO
                }
            };
            self.face_normals = self
                .faces
                .iter()
                .map(|f| (lookup(&f[0]) + lookup(&f[1]) + lookup(&f[2])).normalize())
                .collect();
        }
    }

    fn renormalize_normals(&mut self) {
        for n in &mut self.vert_normals {
            *n = n.normalize();
        }
        for n in &mut self.face_normals {
            *n = n.normalize();
        }
    }

    /// Shifts every vertex so the centroid lands on the origin.
    fn center_vertices(&mut self) {
        if self.vertices.is_empty() {
            return;
        }
        let centroid = average(&self.vertices);
        for v in &mut self.vertices {
            *v = *v - centroid;
        }
    }
}

fn average(points: &[Vec3]) -> Vec3 {
    let mut sum = Vec3::ZERO;
    for &p in points {
        sum = sum + p;
    }
    sum / points.len() as f32
}

fn read_float(tokens: &mut std::str::SplitWhitespace) -> f32 {
    tokens
        .next()
        .and_then(|t| t.parse().ok())
        .unwrap_or_default()
}

fn read_vec3(tokens: &mut std::str::SplitWhitespace) -> Vec3 {
    let x = read_float(tokens);
    let y = read_float(tokens);
    let z = read_float(tokens);
    Vec3::new(x, y, z)
}

/// Parses a face corner of the shape `i[/j[/k]]`. File indices are 1-based;
/// stored indices are 0-based with -1 for absent fields.
fn parse_face_token(token: &str, line: usize) -> Result<VertexRef, MeshError> {
    let invalid = || MeshError::InvalidFaceToken {
        line,
        token: token.to_string(),
    };

    let mut indices = [-1i32; 3];
    for (i, field) in token.split('/').take(3).enumerate() {
        if field.is_empty() {
            if i == 0 {
                // A delimiter with no leading vertex index cannot form a face.
                return Err(invalid());
            }
            continue;
        }
        let value: i32 = field.parse().map_err(|_| invalid())?;
        indices[i] = value - 1;
    }
    Ok(VertexRef {
        vert: indices[0],
        tex: indices[1],
        norm: indices[2],
    })
}

/// Turns raw polygon rings into triangles: short rings are dropped,
/// triangles pass through, and longer simple polygons are ear-clipped.
fn triangulate(
    rings: Vec<Vec<VertexRef>>,
    vertices: &[Vec3],
    num_texcoords: usize,
    num_normals: usize,
) -> Vec<Face> {
    let mut faces = Vec::new();
    for mut ring in rings {
        if ring.len() < 3 {
            warn!("dropping face with only {} vertices", ring.len());
            continue;
        }
        if !validate_ring(&mut ring, vertices.len(), num_texcoords, num_normals) {
            continue;
        }
        if ring.len() == 3 {
            faces.push([ring[0], ring[1], ring[2]]);
            continue;
        }
        ear_clip(ring, vertices, &mut faces);
    }
    faces
}

/// Checks every index in the ring. Faces that reference a missing vertex
/// are dropped; out-of-range texcoord or normal references degrade to -1.
fn validate_ring(
    ring: &mut [VertexRef],
    num_vertices: usize,
    num_texcoords: usize,
    num_normals: usize,
) -> bool {
    for corner in ring.iter_mut() {
        if corner.vert < 0 || corner.vert as usize >= num_vertices {
            warn!("dropping face with out-of-range vertex index {}", corner.vert);
            return false;
        }
        if corner.tex >= num_texcoords as i32 {
            corner.tex = -1;
        }
        if corner.norm >= num_normals as i32 {
            corner.norm = -1;
        }
    }
    true
}

/// Ear clipping over a simple polygon ring. Repeatedly finds a vertex whose
/// corner is convex and whose triangle contains no other ring vertex, emits
/// that triangle, and removes the vertex. Abandons the ring when a full
/// scan finds no ear.
fn ear_clip(mut ring: Vec<VertexRef>, vertices: &[Vec3], faces: &mut Vec<Face>) {
    let pos = |r: VertexRef| vertices[r.vert as usize];

    while ring.len() > 3 {
        let normal = ring_normal(&ring, vertices);
        let mut found = false;
        for a in 0..ring.len() {
            let b = if a == 0 { ring.len() - 1 } else { a - 1 };
            let c = if a == ring.len() - 1 { 0 } else { a + 1 };
            let tri = Triangle::new(pos(ring[a]), pos(ring[b]), pos(ring[c]));

            if !is_convex_corner(&tri, normal) {
                continue;
            }
            let blocked = (0..ring.len())
                .filter(|&j| j != a && j != b && j != c)
                .any(|j| point_in_triangle(&tri, pos(ring[j])));
            if blocked {
                continue;
            }

            faces.push([ring[a], ring[b], ring[c]]);
            ring.remove(a);
            found = true;
            break;
        }
        if !found {
            error!(
                "no ear found on face, abandoning remaining {} vertices",
                ring.len()
            );
            return;
        }
    }
    faces.push([ring[0], ring[1], ring[2]]);
}

/// Polygon normal by Newell's method; the direction encodes the ring
/// winding.
fn ring_normal(ring: &[VertexRef], vertices: &[Vec3]) -> Vec3 {
    let mut normal = Vec3::ZERO;
    for i in 0..ring.len() {
        let p = vertices[ring[i].vert as usize];
        let q = vertices[ring[(i + 1) % ring.len()].vert as usize];
        normal = normal + p.cross(q);
    }
    normal
}

/// The candidate triangle holds (A, B, C) with B the ring predecessor of A
/// and C the successor. The corner at A is convex when the turn from B-A
/// into A-C agrees with the ring winding.
fn is_convex_corner(tri: &Triangle, ring_normal: Vec3) -> bool {
    let [a, b, c] = tri.points;
    (a - b).cross(c - a).dot(ring_normal) > 0.0
}

/// Barycentric point-in-triangle test in the triangle's own plane.
/// Points off the plane are rejected.
/// Solution by W. Heidrich, Journal of Graphics, GPU, and Game Tools,
/// Volume 10, Issue 3, 2005.
fn point_in_triangle(tri: &Triangle, point: Vec3) -> bool {
    let [a, b, c] = tri.points;
    let u = b - a;
    let v = c - a;
    let n = u.cross(v);
    let w = point - a;

    if w.dot(n).abs() > 1e-6 {
        return false;
    }
    let nn = n.dot(n);
    if nn == 0.0 {
        return false;
    }

    let gamma = u.cross(w).dot(n) / nn;
    let beta = w.cross(v).dot(n) / nn;
    let alpha = 1.0 - gamma - beta;

    (0.0..=1.0).contains(&alpha) && (0.0..=1.0).contains(&beta) && (0.0..=1.0).contains(&gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CUBE_OBJ: &str = "\
v -1 -1 -1
v -1 1 -1
v 1 1 -1
v 1 -1 -1
v 1 1 1
v 1 -1 1
v -1 1 1
v -1 -1 1
f 1 2 3
f 1 3 4
f 4 3 5
f 4 5 6
f 6 5 7
f 6 7 8
f 8 7 2
f 8 2 1
f 2 7 5
f 2 5 3
f 6 8 1
f 6 1 4
";

    fn cube() -> Model {
        Model::from_reader(CUBE_OBJ.as_bytes()).unwrap()
    }

    #[test]
    fn cube_parses_fully() {
        let model = cube();
        assert_eq!(model.vertices().len(), 8);
        assert_eq!(model.faces().len(), 12);
        assert_eq!(model.face_normals().len(), 12);
    }

    #[test]
    fn vertices_stay_in_unit_bounds() {
        let model = cube();
        for v in model.vertices() {
            assert!(v.x.abs().max(v.y.abs()).max(v.z.abs()) <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn vertex_centroid_lands_on_origin() {
        let obj = "v 0 0 0\nv 4 0 0\nv 4 4 0\nf 1 2 3\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert!(average(model.vertices()).magnitude() <= 1e-4);
    }

    #[test]
    fn all_normals_are_unit_length() {
        let model = cube();
        for n in model.vert_normals().iter().chain(model.face_normals()) {
            assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn derived_face_normals_point_outward() {
        let model = cube();
        for (face, normal) in model.faces().iter().zip(model.face_normals()) {
            let center = (model.vertices()[face[0].vert as usize]
                + model.vertices()[face[1].vert as usize]
                + model.vertices()[face[2].vert as usize])
                / 3.0;
            assert!(normal.dot(center) > 0.0);
        }
    }

    #[test]
    fn quad_face_is_split_into_two_triangles() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.faces().len(), 2);
    }

    #[test]
    fn pentagon_face_is_split_into_three_triangles() {
        let obj = "\
v 0 1 0
v 0.95 0.31 0
v 0.59 -0.81 0
v -0.59 -0.81 0
v -0.95 0.31 0
f 1 2 3 4 5
";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.faces().len(), 3);
    }

    #[test]
    fn house_polygon_triangulates_completely() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0.5 1.5 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.faces().len(), 3);
        for face in model.faces() {
            assert!(face.iter().all(|r| r.vert >= 0));
        }
    }

    #[test]
    fn degenerate_face_is_dropped() {
        let obj = "v 0 0 0\nv 1 0 0\nf 1 2\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert!(model.faces().is_empty());
    }

    #[test]
    fn face_token_with_missing_lead_index_is_an_error() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf /1 2 3\n";
        assert!(matches!(
            Model::from_reader(obj.as_bytes()),
            Err(MeshError::InvalidFaceToken { .. })
        ));
    }

    #[test]
    fn face_token_fields_become_indices_or_absent() {
        let token = parse_face_token("3/7/2", 1).unwrap();
        assert_eq!(token, VertexRef { vert: 2, tex: 6, norm: 1 });

        let token = parse_face_token("3//2", 1).unwrap();
        assert_eq!(token, VertexRef { vert: 2, tex: -1, norm: 1 });

        let token = parse_face_token("3", 1).unwrap();
        assert_eq!(token, VertexRef { vert: 2, tex: -1, norm: -1 });
    }

    #[test]
    fn vertex_normals_read_three_components() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0.6 0.8
vn 0 0 1
vn 0 0 1
f 1//1 2//2 3//3
";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_relative_eq!(model.vert_normals()[0].z, 0.8, epsilon = 1e-5);
        // Face normal is the normalized sum of the corner normals.
        let expected = (Vec3::new(0.0, 0.6, 0.8) + Vec3::FORWARD + Vec3::FORWARD).normalize();
        assert_relative_eq!(model.face_normals()[0].y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(model.face_normals()[0].z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn empty_input_yields_empty_model() {
        let model = Model::from_reader("".as_bytes()).unwrap();
        assert!(model.vertices().is_empty());
        assert!(model.faces().is_empty());
    }

    #[test]
    fn unknown_directives_are_ignored() {
        let obj = "o thing\ns off\nv 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n";
        let model = Model::from_reader(obj.as_bytes()).unwrap();
        assert_eq!(model.faces().len(), 1);
    }

}
