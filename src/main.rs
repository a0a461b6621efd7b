use vxgi::{assets::AssetRoot, config::EngineConfig, logging};

fn main() -> anyhow::Result<()> {
    logging::init_logging(logging::LoggingConfig::default());

    let asset_root = match std::env::args_os().nth(1) {
        Some(root) => AssetRoot::new(root),
        None => AssetRoot::from_env(),
    };
    log::info!("asset root: {}", asset_root.root().display());

    vxgi::run(EngineConfig::default().with_asset_root(asset_root))
}
