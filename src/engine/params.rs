//! Per-frame parameter block shared by every program

use crate::gfx::backend::Viewport;

/// Contents of the uniform buffer at `PROGRAM_SLOT`.
///
/// MUST match `FrameParams` in `common.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameParams {
    pub current_t: f32,
    pub delta_t: f32,
    pub fps: f32,
    pub frame_index: u32,
    pub viewport: [f32; 2],
    pub use_ortho: u32,
    pub draw_voxel_overlay: u32,
}

impl FrameParams {
    pub fn new(viewport: Viewport, use_ortho: bool, draw_voxel_overlay: bool) -> Self {
        let mut params = Self::default();
        params.set_viewport(viewport);
        params.set_use_ortho(use_ortho);
        params.set_draw_voxel_overlay(draw_voxel_overlay);
        params
    }

    /// Records a new frame at `time` seconds, `delta` after the previous one.
    pub fn advance(&mut self, time: f32, delta: f32) {
        self.current_t = time;
        self.delta_t = delta;
        self.fps = if delta > 0.0 { 1.0 / delta } else { 0.0 };
        self.frame_index = self.frame_index.wrapping_add(1);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = [viewport.width() as f32, viewport.height() as f32];
    }

    pub fn set_use_ortho(&mut self, use_ortho: bool) {
        self.use_ortho = use_ortho as u32;
    }

    pub fn set_draw_voxel_overlay(&mut self, enabled: bool) {
        self.draw_voxel_overlay = enabled as u32;
    }

    pub fn size() -> u64 {
        std::mem::size_of::<Self>() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_two_vec4s() {
        assert_eq!(FrameParams::size(), 32);
    }

    #[test]
    fn test_advance_derives_fps_and_counts_frames() {
        let mut params = FrameParams::new(Viewport::new(800, 600).unwrap(), false, true);
        assert_eq!(params.viewport, [800.0, 600.0]);
        assert_eq!(params.draw_voxel_overlay, 1);

        params.advance(1.0, 0.02);
        assert!((params.fps - 50.0).abs() < 1e-3);
        assert_eq!(params.frame_index, 1);

        params.advance(1.0, 0.0);
        assert_eq!(params.fps, 0.0);
        assert_eq!(params.frame_index, 2);
    }
}
