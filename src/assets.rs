//! Asset path resolution
//!
//! Maps logical folder/file names ("models", "cornell.obj") to loadable
//! paths under an asset root. The host forwards its asset location through
//! `Engine::set_asset_root`.

use std::path::{Path, PathBuf};

/// Folder holding scene models.
pub const MODEL_FOLDER: &str = "models";

/// Environment variable overriding the default asset root.
pub const ASSET_ROOT_ENV: &str = "VXGI_ASSET_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$VXGI_ASSET_ROOT` if set, otherwise the crate's bundled `assets/`.
    pub fn from_env() -> Self {
        match std::env::var_os(ASSET_ROOT_ENV) {
            Some(root) => Self::new(root),
            None => Self::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a folder and reports whether it exists.
    pub fn folder(&self, folder: &str) -> Option<PathBuf> {
        let path = self.root.join(folder);
        path.is_dir().then_some(path)
    }

    pub fn resolve(&self, folder: &str, file: &str) -> PathBuf {
        self.root.join(folder).join(file)
    }

    pub fn model_path(&self, file: &str) -> PathBuf {
        self.resolve(MODEL_FOLDER, file)
    }
}

impl Default for AssetRoot {
    fn default() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_paths_live_under_the_models_folder() {
        let assets = AssetRoot::new("/data/vxgi");
        assert_eq!(
            assets.model_path("cornell.obj"),
            PathBuf::from("/data/vxgi/models/cornell.obj")
        );
    }

    #[test]
    fn test_bundled_models_folder_exists() {
        let assets = AssetRoot::default();
        assert!(assets.folder(MODEL_FOLDER).is_some());
        assert!(assets.model_path("cornell.obj").is_file());
    }

    #[test]
    fn test_missing_folder_is_none() {
        let assets = AssetRoot::new("/definitely/not/here");
        assert!(assets.folder(MODEL_FOLDER).is_none());
    }
}
