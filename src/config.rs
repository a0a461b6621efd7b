//! Engine configuration
//!
//! Compiled-in defaults with builder-style overrides. There is no config file.

use cgmath::Point3;

use crate::assets::AssetRoot;

/// How the final shaded draw is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadingPath {
    /// Full-screen single triangle over the data-pass targets.
    #[default]
    Deferred,
    /// Scene geometry drawn again with the draw-scene program.
    Forward,
}

/// A scene to load during `Engine::init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDescriptor {
    pub name: String,
    /// Model file name inside the asset root's `models` folder.
    pub model: String,
}

impl SceneDescriptor {
    pub fn new(name: &str, model: &str) -> Self {
        Self {
            name: name.to_owned(),
            model: model.to_owned(),
        }
    }

    pub fn cornell() -> Self {
        Self::new("Cornell", "cornell.obj")
    }
}

/// Tuning constants fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub camera_start: Point3<f32>,
    pub camera_far: f32,
    pub clear_color: [f32; 4],
    pub scene_select: usize,
    pub use_ortho: bool,
    pub draw_voxel_overlay: bool,
    pub shading: ShadingPath,
    pub scenes: Vec<SceneDescriptor>,
    pub asset_root: AssetRoot,
    /// Edge length of the voxel volume, in voxels. Power of two.
    pub voxel_resolution: u32,
    pub shadow_map_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            camera_start: Point3::new(0.0, 0.0, 3.0),
            camera_far: 500.0,
            clear_color: [0.3, 0.0, 0.3, 1.0],
            scene_select: 0,
            use_ortho: false,
            draw_voxel_overlay: false,
            shading: ShadingPath::Deferred,
            scenes: vec![SceneDescriptor::cornell()],
            asset_root: AssetRoot::default(),
            voxel_resolution: 64,
            shadow_map_size: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_camera_start(mut self, position: Point3<f32>) -> Self {
        self.camera_start = position;
        self
    }

    pub fn with_camera_far(mut self, far: f32) -> Self {
        self.camera_far = far;
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Replaces the scene list.
    pub fn with_scenes(mut self, scenes: Vec<SceneDescriptor>) -> Self {
        self.scenes = scenes;
        self
    }

    pub fn with_scene(mut self, scene: SceneDescriptor) -> Self {
        self.scenes.push(scene);
        self
    }

    pub fn with_scene_select(mut self, index: usize) -> Self {
        self.scene_select = index;
        self
    }

    pub fn with_ortho(mut self, use_ortho: bool) -> Self {
        self.use_ortho = use_ortho;
        self
    }

    pub fn with_voxel_overlay(mut self, enabled: bool) -> Self {
        self.draw_voxel_overlay = enabled;
        self
    }

    pub fn with_shading(mut self, shading: ShadingPath) -> Self {
        self.shading = shading;
        self
    }

    pub fn with_asset_root(mut self, root: AssetRoot) -> Self {
        self.asset_root = root;
        self
    }

    /// Sets the voxel volume resolution, rounded up to a power of two.
    pub fn with_voxel_resolution(mut self, resolution: u32) -> Self {
        self.voxel_resolution = resolution.max(2).next_power_of_two();
        self
    }

    pub fn with_shadow_map_size(mut self, size: u32) -> Self {
        self.shadow_map_size = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_reference_setup() {
        let config = EngineConfig::default();
        assert_eq!(config.camera_start, Point3::new(0.0, 0.0, 3.0));
        assert_eq!(config.camera_far, 500.0);
        assert_eq!(config.scene_select, 0);
        assert!(!config.use_ortho);
        assert!(!config.draw_voxel_overlay);
        assert_eq!(config.scenes, vec![SceneDescriptor::cornell()]);
    }

    #[test]
    fn test_voxel_resolution_is_a_power_of_two() {
        let config = EngineConfig::default().with_voxel_resolution(100);
        assert_eq!(config.voxel_resolution, 128);
        let config = EngineConfig::default().with_voxel_resolution(0);
        assert_eq!(config.voxel_resolution, 2);
    }
}
