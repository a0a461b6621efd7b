mod support;

use support::{engine, program_slot_buffers, Event, Log};
use vxgi::assets::AssetRoot;
use vxgi::error::{FrameError, InitError};
use vxgi::gfx::backend::{BlendMode, CAMERA_SLOT};
use vxgi::gfx::rendering::Stage;
use vxgi::gfx::shaders::{ShaderStage, ShaderSet};

fn assert_nothing_leaked(log: &Log) {
    assert!(log.live_buffers().is_empty(), "live buffers: {:?}", log.live_buffers());
    assert_eq!(log.compiled(), log.released_programs());
    assert_eq!(
        log.count(|e| matches!(e, Event::SceneLoad(_))),
        log.count(|e| matches!(e, Event::SceneRelease(_)))
    );
}

#[test]
fn test_init_clean_drop_releases_program_buffer_once() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.init().unwrap();
    let program_buffer = engine.program_buffer().unwrap();
    assert!(engine.camera().is_some());

    engine.clean();
    drop(engine);

    assert_eq!(program_slot_buffers(&log), vec![program_buffer.id()]);
    assert_eq!(
        log.count(|e| *e == Event::ReleaseBuffer(program_buffer.id())),
        1
    );
    assert_nothing_leaked(&log);
}

#[test]
fn test_drop_without_clean_releases_everything() {
    let (mut engine, log) = engine(&["a.obj", "b.obj"]);
    engine.init().unwrap();
    drop(engine);
    assert_nothing_leaked(&log);
    assert_eq!(log.count(|e| matches!(e, Event::SceneRelease(_))), 2);
}

#[test]
fn test_clean_is_idempotent() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.init().unwrap();
    engine.clean();
    let after_first = log.events().len();
    engine.clean();
    drop(engine);
    assert_eq!(log.events().len(), after_first);
}

#[test]
fn test_init_applies_standard_render_state_first() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.init().unwrap();

    let events = log.events();
    match &events[0] {
        Event::ApplyRenderState(state) => {
            assert!(state.depth_test);
            assert!(state.cull_back_faces);
            assert_eq!(state.blend, Some(BlendMode::SourceOver));
            assert_eq!(state.clear_color, [0.3, 0.0, 0.3, 1.0]);
        }
        other => panic!("first event was {:?}", other),
    }
    assert!(matches!(events[1], Event::CreateBuffer { slot: 0, size: 32, .. }));
}

#[test]
fn test_every_program_is_compiled() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.init().unwrap();
    assert_eq!(log.compiled(), ShaderStage::ALL.len());
}

#[test]
fn test_zero_scenes_fails() {
    let (mut engine, log) = engine(&[]);
    let err = engine.init().unwrap_err();
    assert!(matches!(err, InitError::NoScenes), "{:?}", err);
    assert!(!engine.is_initialized());
    assert_nothing_leaked(&log);
}

#[test]
fn test_scene_select_out_of_range_fails() {
    let log = Log::default();
    let config = support::config_with(&["a.obj"]).with_scene_select(3);
    let mut engine = support::TestEngine::new(support::RecordingBackend::new(log.clone()), config);
    let err = engine.init().unwrap_err();
    assert!(matches!(err, InitError::SceneSelect { index: 3, count: 1 }));
    assert_nothing_leaked(&log);
}

#[test]
fn test_shader_failure_names_stage_and_releases() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    log.fail(|f| f.compile = Some("voxelize"));

    let err = engine.init().unwrap_err();
    assert!(
        matches!(err, InitError::Shader { stage: ShaderStage::Voxelize, .. }),
        "{:?}",
        err
    );
    // Nothing after the programs ran.
    assert_eq!(log.count(|e| matches!(e, Event::SceneLoad(_))), 0);
    assert!(engine.camera().is_none());
    assert!(engine.program_buffer().is_none());
    assert_eq!(log.compiled(), 2);
    assert_nothing_leaked(&log);
}

#[test]
fn test_camera_failure_stops_init() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    log.fail(|f| f.buffer_slot = Some(CAMERA_SLOT));

    let err = engine.init().unwrap_err();
    assert!(matches!(err, InitError::Camera(_)), "{:?}", err);
    assert_eq!(log.count(|e| matches!(e, Event::SceneLoad(_))), 0);
    assert_nothing_leaked(&log);
}

#[test]
fn test_missing_asset_folder_fails() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.set_asset_root(AssetRoot::new("/definitely/not/here"));

    let err = engine.init().unwrap_err();
    assert!(matches!(err, InitError::AssetFolder { .. }), "{:?}", err);
    assert_nothing_leaked(&log);
}

#[test]
fn test_scene_failure_releases_earlier_scenes() {
    let (mut engine, log) = engine(&["a.obj", "broken.obj", "c.obj"]);
    log.fail(|f| f.model = Some("broken.obj"));

    let err = engine.init().unwrap_err();
    match err {
        InitError::Scene { name, .. } => assert_eq!(name, "broken"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(log.events().iter().filter(|e| matches!(e, Event::SceneLoad(_))).count(), 1);
    assert_eq!(log.count(|e| *e == Event::SceneRelease("a.obj".into())), 1);
    assert!(engine.scenes().is_empty());
    assert_nothing_leaked(&log);
}

#[test]
fn test_prepass_failure_names_scene_and_stage() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    log.fail(|f| f.stage = Some(Stage::Voxelize));

    let err = engine.init().unwrap_err();
    match err {
        InitError::PrePass { name, stage, .. } => {
            assert_eq!(name, "cornell");
            assert_eq!(stage, Stage::Voxelize);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(log.passes("cornell.obj"), vec![Stage::Shadow, Stage::Data, Stage::Voxelize]);
    assert_nothing_leaked(&log);
}

#[test]
fn test_reinit_tears_down_first() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    engine.init().unwrap();
    let first = engine.program_buffer().unwrap();

    engine.init().unwrap();
    let second = engine.program_buffer().unwrap();
    assert_ne!(first, second);

    let events = log.events();
    let released = events
        .iter()
        .position(|e| *e == Event::ReleaseBuffer(first.id()))
        .unwrap();
    let created = events
        .iter()
        .position(|e| matches!(e, Event::CreateBuffer { id, .. } if *id == second.id()))
        .unwrap();
    assert!(released < created);

    drop(engine);
    assert_nothing_leaked(&log);
}

#[test]
fn test_step_before_init_is_rejected() {
    let (mut engine, log) = engine(&["cornell.obj"]);
    assert!(matches!(engine.step(), Err(FrameError::NotInitialized)));
    assert!(log.events().is_empty());
}

#[test]
fn test_shader_set_compiles_against_any_backend() {
    let log = Log::default();
    let mut backend = support::RecordingBackend::new(log.clone());
    let shaders = ShaderSet::compile(&mut backend).unwrap();
    assert_ne!(shaders.voxelize, shaders.mipmap);
    shaders.release(&mut backend);
    assert_eq!(log.released_programs(), ShaderStage::ALL.len());
}
