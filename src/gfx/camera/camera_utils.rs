use cgmath::{Matrix4, Point3, SquareMatrix};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Camera block read by every stage at `CAMERA_SLOT`.
///
/// MUST match `CameraUniform` in `common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct CameraUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub inv_view_proj: [[f32; 4]; 4],
    /// Eye position, homogeneous to keep 16 byte alignment.
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, eye: Point3<f32>) -> Self {
        let view_proj = projection * view;
        let inv_view_proj = view_proj.invert().unwrap_or_else(Matrix4::identity);
        Self {
            view: view.into(),
            projection: projection.into(),
            view_proj: view_proj.into(),
            inv_view_proj: inv_view_proj.into(),
            position: [eye.x, eye.y, eye.z, 1.0],
        }
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::identity().into();
        Self {
            view: identity,
            projection: identity,
            view_proj: identity,
            inv_view_proj: identity,
            position: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_uniform_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 272);
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
    }

    #[test]
    fn test_depth_is_remapped_to_zero_one() {
        let proj = OPENGL_TO_WGPU_MATRIX
            * cgmath::perspective(cgmath::Deg(45.0), 1.0, 1.0, 10.0);
        let near = proj * cgmath::Vector4::new(0.0, 0.0, -1.0, 1.0);
        let far = proj * cgmath::Vector4::new(0.0, 0.0, -10.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_depth_remap_keeps_w() {
        let p = OPENGL_TO_WGPU_MATRIX * cgmath::Vector4::new(0.25, -0.5, 0.6, 1.0);
        assert_eq!(p.x, 0.25);
        assert_eq!(p.y, -0.5);
        assert_eq!(p.w, 1.0);
        assert!((p.z - 0.8).abs() < 1e-6);
    }
}
