use cgmath::{ortho, perspective, Deg, InnerSpace, Matrix4, Point3, Rad, Vector3};

use super::camera_controller::{CameraController, CameraMotion};
use super::camera_utils::{CameraUniform, OPENGL_TO_WGPU_MATRIX};
use crate::error::GpuError;
use crate::gfx::backend::{BufferHandle, RenderBackend, Viewport, CAMERA_SLOT};

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// Visible volume of the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub fovy: Deg<f32>,
    pub near: f32,
    pub far: f32,
    pub width: u32,
    pub height: u32,
    /// Half height of the orthographic view volume.
    pub ortho_half_height: f32,
}

impl Frustum {
    pub fn new(viewport: Viewport, far: f32) -> Self {
        Self {
            fovy: Deg(45.0),
            near: 0.1,
            far,
            width: viewport.width(),
            height: viewport.height(),
            ortho_half_height: 1.5,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn projection(&self, use_ortho: bool) -> Matrix4<f32> {
        let aspect = self.aspect();
        let proj = if use_ortho {
            let h = self.ortho_half_height;
            ortho(-h * aspect, h * aspect, -h, h, self.near, self.far)
        } else {
            perspective(self.fovy, aspect, self.near, self.far)
        };
        OPENGL_TO_WGPU_MATRIX * proj
    }
}

/// First-person camera owning its uniform buffer at `CAMERA_SLOT`.
#[derive(Debug)]
pub struct Camera {
    position: Point3<f32>,
    yaw: Rad<f32>,
    pitch: Rad<f32>,
    frustum: Frustum,
    use_ortho: bool,
    uniform: CameraUniform,
    buffer: Option<BufferHandle>,
    frustum_revision: u64,
    controller: CameraController,
}

impl Camera {
    /// Camera at `position` looking down -Z.
    pub fn new(position: Point3<f32>, viewport: Viewport, far: f32) -> Self {
        let mut camera = Self {
            position,
            yaw: Rad(-std::f32::consts::FRAC_PI_2),
            pitch: Rad(0.0),
            frustum: Frustum::new(viewport, far),
            use_ortho: false,
            uniform: CameraUniform::default(),
            buffer: None,
            frustum_revision: 0,
            controller: CameraController::default(),
        };
        camera.update_uniform();
        camera
    }

    /// Allocates the camera buffer and uploads the initial matrices.
    pub fn init<B: RenderBackend>(&mut self, gpu: &mut B) -> Result<(), GpuError> {
        let size = std::mem::size_of::<CameraUniform>() as u64;
        let buffer = gpu.create_uniform_buffer(CAMERA_SLOT, size)?;
        self.buffer = Some(buffer);
        self.update_uniform();
        gpu.write_uniform(buffer, 0, bytemuck::bytes_of(&self.uniform))
    }

    /// Re-derives the projection for a new viewport.
    pub fn set_frustum(&mut self, viewport: Viewport) {
        self.frustum.width = viewport.width();
        self.frustum.height = viewport.height();
        self.frustum_revision += 1;
        self.update_uniform();
    }

    /// Applies pending input scaled by `dt` and uploads the matrices.
    pub fn update_camera<B: RenderBackend>(&mut self, gpu: &mut B, dt: f32) -> Result<(), GpuError> {
        let motion = self.controller.take_motion(dt);
        self.apply_motion(motion);
        self.update_uniform();

        let buffer = self.buffer.ok_or(GpuError::MissingGlobals(CAMERA_SLOT))?;
        gpu.write_uniform(buffer, 0, bytemuck::bytes_of(&self.uniform))
    }

    pub fn release<B: RenderBackend>(&mut self, gpu: &mut B) {
        if let Some(buffer) = self.buffer.take() {
            gpu.release_buffer(buffer);
        }
    }

    fn apply_motion(&mut self, motion: CameraMotion) {
        self.yaw += Rad(motion.yaw);
        self.pitch = Rad((self.pitch.0 + motion.pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT));

        let forward = self.forward();
        let right = forward.cross(Vector3::unit_y()).normalize();
        self.position += right * motion.right + Vector3::unit_y() * motion.up + forward * motion.forward;
    }

    fn update_uniform(&mut self) {
        self.uniform = CameraUniform::new(
            self.view_matrix(),
            self.frustum.projection(self.use_ortho),
            self.position,
        );
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        Vector3::new(cos_pitch * cos_yaw, sin_pitch, cos_pitch * sin_yaw).normalize()
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }

    pub fn set_use_ortho(&mut self, use_ortho: bool) {
        self.use_ortho = use_ortho;
        self.update_uniform();
    }

    pub fn use_ortho(&self) -> bool {
        self.use_ortho
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Incremented by every `set_frustum`.
    pub fn frustum_revision(&self) -> u64 {
        self.frustum_revision
    }

    pub fn uniform(&self) -> &CameraUniform {
        &self.uniform
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    pub fn controller_mut(&mut self) -> &mut CameraController {
        &mut self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn viewport(w: u32, h: u32) -> Viewport {
        Viewport::new(w, h).unwrap()
    }

    #[test]
    fn test_starts_looking_down_negative_z() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 3.0), viewport(800, 600), 500.0);
        let forward = camera.forward();
        assert!((forward - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-5);
    }

    #[test]
    fn test_set_frustum_tracks_viewport() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 3.0), viewport(800, 600), 500.0);
        camera.set_frustum(viewport(1920, 1080));
        assert_eq!(camera.frustum().width, 1920);
        assert_eq!(camera.frustum().height, 1080);
        assert_eq!(camera.frustum_revision(), 1);
        assert!((camera.frustum().aspect() - 16.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_ortho_changes_projection() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 3.0), viewport(800, 600), 500.0);
        let perspective = camera.uniform().projection;
        camera.set_use_ortho(true);
        assert_ne!(camera.uniform().projection, perspective);
        // Orthographic projections keep w = 1.
        assert_eq!(camera.uniform().projection[3][3], 1.0);
    }

    #[test]
    fn test_forward_motion_moves_along_view() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 3.0), viewport(800, 600), 500.0);
        camera.controller_mut().set_key(KeyCode::KeyW, true);
        let motion = camera.controller_mut().take_motion(0.5);
        camera.apply_motion(motion);
        assert!((camera.position().z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = Camera::new(Point3::new(0.0, 0.0, 3.0), viewport(800, 600), 500.0);
        camera.apply_motion(CameraMotion {
            pitch: 10.0,
            ..Default::default()
        });
        assert!(camera.pitch.0 <= PITCH_LIMIT);
    }
}
