use glam::Vec3;

/// CPU-side triangle mesh with interleaved `position.xyz | normal.xyz`
/// vertices, the layout the render pipelines consume.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub const FLOATS_PER_VERTEX: usize = 6;

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / Self::FLOATS_PER_VERTEX
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub(crate) fn push_vertex(&mut self, position: Vec3, normal: Vec3) {
        self.vertices
            .extend_from_slice(&[position.x, position.y, position.z]);
        self.vertices.extend_from_slice(&[normal.x, normal.y, normal.z]);
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * Self::FLOATS_PER_VERTEX;
        Vec3::new(
            self.vertices[base],
            self.vertices[base + 1],
            self.vertices[base + 2],
        )
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let base = index * Self::FLOATS_PER_VERTEX + 3;
        Vec3::new(
            self.vertices[base],
            self.vertices[base + 1],
            self.vertices[base + 2],
        )
    }

    /// Turns the mesh inside out: normals are negated and winding is
    /// reversed. Used for the background box so its interior faces the
    /// camera and survives back-face culling.
    pub fn inverted(mut self) -> Self {
        for vertex in self.vertices.chunks_exact_mut(Self::FLOATS_PER_VERTEX) {
            vertex[3] = -vertex[3];
            vertex[4] = -vertex[4];
            vertex[5] = -vertex[5];
        }
        for triangle in self.indices.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
        self
    }
}

/// Axis-aligned box of the given dimensions, each face subdivided into a
/// `resolution` x `resolution` grid. Faces are wound clockwise when viewed
/// from outside, matching the renderer's front-face convention.
pub fn subdivided_box(width: f32, height: f32, depth: f32, resolution: u32) -> Mesh {
    let resolution = resolution.max(1);
    let mut mesh = Mesh::default();
    let half = Vec3::new(0.5, 0.5, 0.5);
    let dims = Vec3::new(width, height, depth);

    // (normal, u, v) with u x v pointing along the outward normal.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    for (normal, u, v) in faces {
        let base = mesh.vertex_count() as u32;
        for j in 0..=resolution {
            for i in 0..=resolution {
                let fi = i as f32 / resolution as f32 - 0.5;
                let fj = j as f32 / resolution as f32 - 0.5;
                let position = (normal * half + u * fi + v * fj) * dims;
                mesh.push_vertex(position, normal);
            }
        }
        let stride = resolution + 1;
        for j in 0..resolution {
            for i in 0..resolution {
                let a = base + j * stride + i;
                let b = a + 1;
                let c = a + stride;
                let d = c + 1;
                // u x v faces outward, so (a, b, d) is counter-clockwise
                // from outside; emit the reversed order for clockwise.
                mesh.indices.extend_from_slice(&[a, d, b]);
                mesh.indices.extend_from_slice(&[a, c, d]);
            }
        }
    }

    mesh
}

/// UV sphere wound clockwise when viewed from outside.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32) -> Mesh {
    let segments = segments.max(3);
    let rings = rings.max(2);
    let mut mesh = Mesh::default();

    for ring in 0..=rings {
        let phi = -std::f32::consts::FRAC_PI_2
            + std::f32::consts::PI * ring as f32 / rings as f32;
        for segment in 0..=segments {
            let theta = std::f32::consts::TAU * segment as f32 / segments as f32;
            let normal = Vec3::new(
                phi.cos() * theta.cos(),
                phi.sin(),
                phi.cos() * theta.sin(),
            );
            mesh.push_vertex(normal * radius, normal);
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            // The theta tangent crossed with the phi tangent points inward
            // on this parameterization, so this order is already clockwise
            // from outside.
            mesh.indices.extend_from_slice(&[a, b, d]);
            mesh.indices.extend_from_slice(&[a, d, c]);
        }
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winding_sign(mesh: &Mesh) -> Vec<f32> {
        mesh.indices
            .chunks_exact(3)
            .map(|tri| {
                let a = mesh.position(tri[0] as usize);
                let b = mesh.position(tri[1] as usize);
                let c = mesh.position(tri[2] as usize);
                let face_normal = (b - a).cross(c - a);
                let vertex_normal =
                    mesh.normal(tri[0] as usize) + mesh.normal(tri[1] as usize);
                face_normal.dot(vertex_normal)
            })
            .collect()
    }

    #[test]
    fn box_has_expected_counts() {
        let mesh = subdivided_box(1.0, 1.0, 1.0, 24);
        assert_eq!(mesh.vertex_count(), 6 * 25 * 25);
        assert_eq!(mesh.triangle_count(), 6 * 24 * 24 * 2);
    }

    #[test]
    fn box_normals_are_unit_axes() {
        let mesh = subdivided_box(2.0, 4.0, 6.0, 2);
        for index in 0..mesh.vertex_count() {
            let normal = mesh.normal(index);
            assert!((normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn box_winding_is_clockwise_from_outside() {
        let mesh = subdivided_box(1.0, 1.0, 1.0, 3);
        for sign in winding_sign(&mesh) {
            assert!(sign < 0.0, "expected clockwise winding, got {sign}");
        }
    }

    #[test]
    fn inverted_box_faces_inward() {
        let mesh = subdivided_box(1.0, 1.0, 1.0, 3).inverted();
        for index in 0..mesh.vertex_count() {
            let normal = mesh.normal(index);
            let position = mesh.position(index);
            assert!(normal.dot(position) < 0.0, "normal should point inward");
        }
        for sign in winding_sign(&mesh) {
            assert!(sign < 0.0);
        }
    }

    #[test]
    fn sphere_vertices_sit_on_the_radius() {
        let mesh = uv_sphere(10.0, 12, 8);
        for index in 0..mesh.vertex_count() {
            assert!((mesh.position(index).length() - 10.0).abs() < 1e-3);
            assert!((mesh.normal(index).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn sphere_winding_is_clockwise_from_outside() {
        let mesh = uv_sphere(1.0, 8, 6);
        for sign in winding_sign(&mesh) {
            // Degenerate pole triangles collapse to zero area.
            assert!(sign <= 1e-6, "expected clockwise winding, got {sign}");
        }
    }
}
