//! Mesh loading
//!
//! OBJ models are loaded with `tobj`, flattened into one indexed triangle
//! list and colored from their material's diffuse term.

use std::path::Path;

use cgmath::{Point3, Vector3};

use crate::error::SceneError;

/// Albedo for faces without a material.
pub const DEFAULT_ALBEDO: [f32; 3] = [0.8, 0.8, 0.8];

/// Vertex layout shared by the vertex buffers and the voxelization pass,
/// which pulls vertices as a flat `array<f32>` with a stride of nine floats.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub albedo: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Bounds {
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Longest edge.
    pub fn max_extent(&self) -> f32 {
        let e = self.extent();
        e.x.max(e.y).max(e.z)
    }
}

/// CPU-side triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .map_err(|source| SceneError::Model {
            path: path.display().to_string(),
            source,
        })?;

        let materials = materials.unwrap_or_else(|err| {
            log::warn!("no materials for {}: {}", path.display(), err);
            Vec::new()
        });

        let mesh = Self::from_models(&models, &materials);
        if mesh.triangle_count() == 0 {
            return Err(SceneError::EmptyModel(path.display().to_string()));
        }
        log::info!(
            "loaded {} ({} models, {} triangles)",
            path.display(),
            models.len(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Merges every model into one triangle list.
    pub fn from_models(models: &[tobj::Model], materials: &[tobj::Material]) -> Self {
        let mut data = MeshData::default();

        for model in models {
            let mesh = &model.mesh;
            let albedo = mesh
                .material_id
                .and_then(|id| materials.get(id))
                .and_then(|m| m.diffuse)
                .unwrap_or(DEFAULT_ALBEDO);

            let normals = if !mesh.normals.is_empty() && mesh.normals.len() == mesh.positions.len() {
                mesh.normals.clone()
            } else {
                calculate_face_normals(&mesh.positions, &mesh.indices)
            };

            let base = data.vertices.len() as u32;
            data.vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .zip(normals.chunks_exact(3))
                    .map(|(p, n)| Vertex {
                        position: [p[0], p[1], p[2]],
                        normal: [n[0], n[1], n[2]],
                        albedo,
                    }),
            );
            data.indices.extend(mesh.indices.iter().map(|i| base + i));
        }

        data
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.vertices.first()?;
        let mut min = Point3::from(first.position);
        let mut max = min;
        for v in &self.vertices[1..] {
            min.x = min.x.min(v.position[0]);
            min.y = min.y.min(v.position[1]);
            min.z = min.z.min(v.position[2]);
            max.x = max.x.max(v.position[0]);
            max.y = max.y.max(v.position[1]);
            max.z = max.z.max(v.position[2]);
        }
        Some(Bounds { min, max })
    }
}

/// Smooth per-vertex normals: area-weighted sum of adjacent face normals.
pub fn calculate_face_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let mut normals = vec![0.0; positions.len()];
    let vertex = |i: usize| Vector3::new(positions[i * 3], positions[i * 3 + 1], positions[i * 3 + 2]);

    for triangle in indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let face_normal = (vertex(i1) - vertex(i0)).cross(vertex(i2) - vertex(i0));
        for i in [i0, i1, i2] {
            normals[i * 3] += face_normal.x;
            normals[i * 3 + 1] += face_normal.y;
            normals[i * 3 + 2] += face_normal.z;
        }
    }

    for n in normals.chunks_exact_mut(3) {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len > f32::EPSILON {
            n.iter_mut().for_each(|c| *c /= len);
        } else {
            n.copy_from_slice(&[0.0, 1.0, 0.0]);
        }
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    const QUAD: &str = "\
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
f 1 3 2
f 1 4 3
";

    fn load(source: &str) -> MeshData {
        let (models, _) = tobj::load_obj_buf(
            &mut BufReader::new(source.as_bytes()),
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok((Vec::new(), Default::default())),
        )
        .unwrap();
        MeshData::from_models(&models, &[])
    }

    #[test]
    fn test_vertex_stride_matches_pulling() {
        assert_eq!(std::mem::size_of::<Vertex>(), 9 * 4);
    }

    #[test]
    fn test_missing_normals_are_computed() {
        let mesh = load(QUAD);
        assert_eq!(mesh.triangle_count(), 2);
        for v in &mesh.vertices {
            assert!((v.normal[1] - 1.0).abs() < 1e-5, "{:?}", v.normal);
            assert_eq!(v.albedo, DEFAULT_ALBEDO);
        }
    }

    #[test]
    fn test_bounds() {
        let mesh = load(QUAD);
        let bounds = mesh.bounds().unwrap();
        assert_eq!(bounds.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bounds.max, Point3::new(1.0, 0.0, 1.0));
        assert_eq!(bounds.max_extent(), 1.0);
        assert_eq!(bounds.center(), Point3::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_models_are_merged_with_offset_indices() {
        let mesh = load(
            "o a\nv 0 0 0\nv 1 0 0\nv 1 0 1\nf 1 3 2\n\
             o b\nv 0 1 0\nv 1 1 0\nv 1 1 1\nf 4 6 5\n",
        );
        assert_eq!(mesh.vertices.len(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.indices[..3].iter().all(|&i| i < 3));
        assert!(mesh.indices[3..].iter().all(|&i| (3..6).contains(&i)));
    }

    #[test]
    fn test_bundled_cornell_box_loads() {
        let path = crate::assets::AssetRoot::default().model_path("cornell.obj");
        let mesh = MeshData::load(&path).unwrap();
        assert!(mesh.triangle_count() >= 10);
        let bounds = mesh.bounds().unwrap();
        assert!(bounds.max_extent() > 0.0);
        // Colored walls come from the material library.
        assert!(mesh.vertices.iter().any(|v| v.albedo != DEFAULT_ALBEDO));
    }

    #[test]
    fn test_missing_file_is_a_model_error() {
        let err = MeshData::load(Path::new("/no/such/model.obj")).unwrap_err();
        assert!(matches!(err, SceneError::Model { .. }));
    }
}
