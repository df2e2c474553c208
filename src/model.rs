use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::Vec3;
use log::info;
use thiserror::Error;

use crate::mesh::Mesh;

/// Ways loading a model can fail. Callers are expected to log and carry on
/// with fallback geometry rather than abort.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("could not read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("model does not define any vertices")]
    Empty,
}

/// Loads a triangle mesh from an OBJ file on disk.
pub fn load_model(path: &Path) -> Result<Mesh, ModelError> {
    let contents = fs::read_to_string(path)?;
    let mesh = parse_obj(&contents)?;
    info!(
        "loaded model {} ({} vertices, {} triangles)",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parses OBJ text into the crate's interleaved mesh format. Polygons are
/// fan-triangulated; vertices are deduplicated on (position, normal) pairs;
/// smooth normals are computed when the file supplies none.
pub fn parse_obj(contents: &str) -> Result<Mesh, ModelError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut builder = MeshBuilder::default();

    for (number, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => positions.push(read_vec3(fields, number)?),
            Some("vn") => normals.push(read_vec3(fields, number)?),
            Some("f") => builder.add_face(fields, &positions, &normals, number)?,
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(ModelError::Empty);
    }

    let mut mesh = builder.finish();
    if mesh.vertices.chunks_exact(Mesh::FLOATS_PER_VERTEX).any(|v| {
        v[3] == 0.0 && v[4] == 0.0 && v[5] == 0.0
    }) {
        smooth_normals(&mut mesh);
    }
    Ok(mesh)
}

fn read_vec3<'a>(
    mut fields: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Vec3, ModelError> {
    let mut component = |name: &str| -> Result<f32, ModelError> {
        fields
            .next()
            .ok_or_else(|| parse_error(line, format!("missing {name} component")))?
            .parse::<f32>()
            .map_err(|err| parse_error(line, format!("bad {name} component: {err}")))
    };
    Ok(Vec3::new(component("x")?, component("y")?, component("z")?))
}

fn parse_error(line: usize, message: String) -> ModelError {
    ModelError::Parse {
        line: line + 1,
        message,
    }
}

#[derive(Default)]
struct MeshBuilder {
    mesh: Mesh,
    dedup: HashMap<(usize, Option<usize>), u32>,
}

impl MeshBuilder {
    fn add_face<'a>(
        &mut self,
        fields: impl Iterator<Item = &'a str>,
        positions: &[Vec3],
        normals: &[Vec3],
        line: usize,
    ) -> Result<(), ModelError> {
        let mut corners = Vec::new();
        for field in fields {
            corners.push(self.corner(field, positions, normals, line)?);
        }
        if corners.len() < 3 {
            return Err(parse_error(
                line,
                "face references fewer than 3 vertices".into(),
            ));
        }
        for i in 1..corners.len() - 1 {
            self.mesh
                .indices
                .extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
        }
        Ok(())
    }

    // A corner is `v`, `v/vt`, `v//vn` or `v/vt/vn`; texture coordinates
    // are accepted and dropped.
    fn corner(
        &mut self,
        field: &str,
        positions: &[Vec3],
        normals: &[Vec3],
        line: usize,
    ) -> Result<u32, ModelError> {
        let mut refs = field.split('/');
        let position = refs
            .next()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i32>().ok())
            .and_then(|i| resolve_index(i, positions.len()))
            .ok_or_else(|| parse_error(line, format!("bad vertex reference '{field}'")))?;
        let normal = refs
            .nth(1)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse::<i32>().ok())
            .and_then(|i| resolve_index(i, normals.len()));

        let next = self.mesh.vertex_count() as u32;
        let index = *self.dedup.entry((position, normal)).or_insert_with(|| {
            self.mesh.push_vertex(
                positions[position],
                normal.map(|n| normals[n]).unwrap_or(Vec3::ZERO),
            );
            next
        });
        Ok(index)
    }

    fn finish(self) -> Mesh {
        self.mesh
    }
}

// OBJ indices are one-based; negative values count back from the end.
fn resolve_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let back = (-index) as usize;
        (back <= len).then(|| len - back)
    } else {
        None
    }
}

fn smooth_normals(mesh: &mut Mesh) {
    let stride = Mesh::FLOATS_PER_VERTEX;
    let mut accum = vec![Vec3::ZERO; mesh.vertex_count()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [a, b, c] = [
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        ];
        let face = (mesh.position(b) - mesh.position(a))
            .cross(mesh.position(c) - mesh.position(a));
        if face.length_squared() > f32::EPSILON {
            let face = face.normalize();
            accum[a] += face;
            accum[b] += face;
            accum[c] += face;
        }
    }
    for (index, normal) in accum.into_iter().enumerate() {
        let normal = normal.normalize_or_zero();
        mesh.vertices[index * stride + 3] = normal.x;
        mesh.vertices[index * stride + 4] = normal.y;
        mesh.vertices[index * stride + 5] = normal.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_a_triangle() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn triangulates_quads() {
        let obj = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn computes_missing_normals() {
        let mesh = parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        for index in 0..mesh.vertex_count() {
            assert!((mesh.normal(index).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn keeps_supplied_normals() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 -1\nf 1//1 2//1 3//1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.normal(0), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn negative_indices_count_from_the_end() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let mesh = parse_obj(obj).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_obj("# nothing\n"), Err(ModelError::Empty)));
    }

    #[test]
    fn bad_face_reference_reports_the_line() {
        let result = parse_obj("v 0 0 0\nf 1 2 9\n");
        match result {
            Err(ModelError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn load_model_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let mesh = load_model(file.path()).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_model(Path::new("/does/not/exist.obj"));
        assert!(matches!(result, Err(ModelError::Io(_))));
    }
}
