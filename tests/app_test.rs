use glam::{Quat, Vec2, Vec3};
use image::{GrayImage, Luma};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stormvale::config::ThreadPoolConfig;
use stormvale::rendering::picking::{view_projection, Ray};
use stormvale::rendering::scene::NodeContent;
use stormvale::ui::{Param, ParamValue};
use stormvale::world::physics::{substeps, BodyHandle, BodyShape, PhysicsBackend};
use stormvale::world::terrain::TERRAIN_NODE_NAME;
use stormvale::{FrameTime, SceneApp, SceneGraph, SceneSettings, SceneSink};

const DT: f32 = 1.0 / 60.0;

#[derive(Default)]
struct Ballistic {
    bodies: Vec<(Vec3, Vec3)>,
    accumulator: f32,
}

impl PhysicsBackend for Ballistic {
    fn name(&self) -> &'static str {
        "ballistic"
    }

    fn create_body(&mut self, _shape: BodyShape, _mass: f32, position: Vec3, velocity: Vec3) -> BodyHandle {
        self.bodies.push((position, velocity));
        BodyHandle(self.bodies.len() - 1)
    }

    fn step(&mut self, fixed_dt: f32, real_dt: f32) {
        for _ in 0..substeps(&mut self.accumulator, fixed_dt, real_dt, 10) {
            for (position, velocity) in &mut self.bodies {
                *velocity += Vec3::new(0.0, -10.0, 0.0) * fixed_dt;
                *position += *velocity * fixed_dt;
            }
        }
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)> {
        self.bodies.get(handle.0).map(|(p, _)| (*p, Quat::IDENTITY))
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

/// Height map and prefabs written to a scratch directory
fn asset_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("stormvale-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let ramp = GrayImage::from_fn(64, 64, |x, _| Luma([(x * 4) as u8]));
    ramp.save(dir.join("image6.png")).unwrap();
    std::fs::write(
        dir.join("tree.json"),
        r#"{ "name": "tree", "children": [ { "name": "crown", "mesh": "leaf_cone" } ] }"#,
    )
    .unwrap();
    std::fs::write(dir.join("cloud.json"), r#"{ "name": "cloud", "mesh": "cloud_puff" }"#).unwrap();
    dir
}

fn scene_settings(root: &Path) -> SceneSettings {
    let mut settings = SceneSettings {
        seed: Some(42),
        ..SceneSettings::default()
    };
    settings.terrain.vertices_per_edge = 32;
    settings.terrain.tree_count = 20;
    settings.rain.count = 500;
    settings.lava.fire_particle_count = 100;
    settings.assets.root = root.to_path_buf();
    settings
}

fn pools() -> ThreadPoolConfig {
    ThreadPoolConfig {
        job_threads: 2,
        async_threads: 1,
        stack_size: None,
    }
}

fn ready_app(name: &str) -> SceneApp {
    let settings = scene_settings(&asset_dir(name));
    let mut app = SceneApp::with_scene(settings, SceneGraph::new(), pools()).unwrap();
    app.set_physics_backend(Box::new(Ballistic::default()));
    app.setup();
    assert_eq!(app.wait_for_assets(Duration::from_secs(10)), 3);
    app
}

#[test]
fn test_setup_builds_complete_scene() {
    let app = ready_app("setup");

    assert!(app.setup_failures().is_empty(), "{:?}", app.setup_failures());
    assert_eq!(app.pending_assets(), 0);
    assert_eq!(app.terrain().generation(), 1);
    assert_eq!(app.scene().count_named(TERRAIN_NODE_NAME), 1);
    assert!(!app.terrain().trees().is_empty());
    assert!(app.terrain().trees().len() <= 20);

    assert_eq!(app.clouds().len(), 13);
    for id in app.clouds() {
        let y = app.scene().node(*id).unwrap().transform.position.y;
        assert!((180.0..200.0).contains(&y));
    }

    assert!(app.lighting().sun().is_some());
    assert_eq!(app.lighting().helpers().len(), 3);
    assert!(app.water().node().is_some());
    assert!(app.lava().has_fire());
    assert_eq!(app.input().subscriber_count(), 1);
}

#[test]
fn test_missing_assets_leave_scene_running() {
    let root = std::env::temp_dir().join(format!("stormvale-missing-{}", std::process::id()));
    let mut app = SceneApp::with_scene(scene_settings(&root), SceneGraph::new(), pools()).unwrap();
    app.setup();
    app.wait_for_assets(Duration::from_secs(10));

    let failed: Vec<_> = app.setup_failures().iter().map(|f| f.step).collect();
    for step in ["height map", "tree template", "cloud template"] {
        assert!(failed.contains(&step), "{:?}", failed);
    }
    #[cfg(not(feature = "physics"))]
    assert!(app
        .setup_failures()
        .iter()
        .any(|f| f.step == "physics" && f.degraded));

    // A shape edit before the height map arrives is deferred, not an error
    app.edit(Param::HeightScale, ParamValue::Number(90.0));
    let failures = app.setup_failures().len();
    for frame in 0..10 {
        app.frame(FrameTime::fixed(frame, DT));
    }
    assert_eq!(app.setup_failures().len(), failures);
    assert_eq!(app.terrain().generation(), 0);
    assert!(app.clouds().is_empty());
}

/// Log sink shared between the subscriber and the test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_missing_asset_is_logged_once_as_error() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let root = std::env::temp_dir().join(format!("stormvale-quiet-{}", std::process::id()));
    tracing::subscriber::with_default(subscriber, || {
        let mut app = SceneApp::with_scene(scene_settings(&root), SceneGraph::new(), pools()).unwrap();
        app.setup();
        app.wait_for_assets(Duration::from_secs(10));
    });

    let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    let reports: Vec<&str> = text.lines().filter(|l| l.contains("image6.png")).collect();
    assert_eq!(reports.len(), 1, "{}", text);
    assert!(reports[0].contains("ERROR"), "{}", reports[0]);
}

#[test]
fn test_click_ejects_on_next_frame() {
    let mut app = ready_app("click");
    let center = app.lava().surface_center();

    assert!(app
        .pointer_ray(Vec2::ZERO, Ray::vertical(center.x + 100.0, center.z, 1000.0))
        .is_none());
    let hit = app
        .pointer_ray(Vec2::ZERO, Ray::vertical(center.x, center.z, 1000.0))
        .unwrap();
    assert!((hit - center).length() < 1e-3);
    assert!(app.lava().projectiles().is_empty(), "ejection waits for the frame");

    app.frame(FrameTime::fixed(1, DT));
    assert_eq!(app.lava().projectiles().len(), 1);
    let projectile = app.lava().projectiles()[0].clone();
    assert!(projectile.body.is_some());
    assert_eq!(app.physics().unwrap().body_count(), 1);

    let start = center + Vec3::new(0.0, 5.0, 0.0);
    for frame in 2..30 {
        app.frame(FrameTime::fixed(frame, DT));
    }
    let position = app.scene().node(projectile.node).unwrap().transform.position;
    assert!(position.distance(start) > 1.0, "projectile stuck at {:?}", position);
}

#[test]
fn test_camera_pick_through_screen_center() {
    let mut app = ready_app("camera");
    let center = app.lava().surface_center();
    let inverse = view_projection(&app.settings().camera, 16.0 / 9.0, center).inverse();

    let hit = app.pointer_down(Vec2::ZERO, inverse).unwrap();
    assert!((hit - center).length() < 0.5, "hit {:?} vs {:?}", hit, center);
}

#[test]
fn test_panel_burst_rebuilds_once() {
    let mut app = ready_app("panel");
    let before = app.terrain().generation();

    app.edit(Param::HeightScale, ParamValue::Number(80.0));
    app.edit(Param::HeightBias, ParamValue::Number(0.0));
    app.edit(Param::ThresholdMid, ParamValue::Number(0.3));
    app.frame(FrameTime::fixed(1, DT));
    assert_eq!(app.terrain().generation(), before + 1);
    assert_eq!(app.scene().count_named(TERRAIN_NODE_NAME), 1);

    // Grid resolution waits for the end of the drag
    app.edit(Param::VerticesPerEdge, ParamValue::Number(64.0));
    app.frame(FrameTime::fixed(2, DT));
    assert_eq!(app.terrain().generation(), before + 1);
    app.finish_edit(Param::VerticesPerEdge);
    app.frame(FrameTime::fixed(3, DT));
    assert_eq!(app.terrain().generation(), before + 2);
    assert_eq!(app.terrain().mesh().unwrap().segments, 64);
}

#[test]
fn test_live_edits_apply_immediately() {
    let mut app = ready_app("live");

    app.edit(Param::WaterAlpha, ParamValue::Number(0.5));
    let water = app.water().node().unwrap();
    match &app.scene().node(water).unwrap().content {
        NodeContent::Water(uniforms) => assert!((uniforms.alpha - 0.5).abs() < 1e-6),
        other => panic!("unexpected content {:?}", other),
    }

    app.edit(Param::RainEnabled, ParamValue::Toggle(true));
    assert!(app.rain().node().is_none(), "rain attaches on the next frame");
    app.frame(FrameTime::fixed(1, DT));
    assert!(app.rain().node().is_some());

    let drops = |app: &SceneApp| match &app.scene().node(app.rain().node().unwrap()).unwrap().content {
        NodeContent::Points { positions, .. } => positions.to_vec(),
        other => panic!("unexpected content {:?}", other),
    };
    let falling = drops(&app);

    app.edit(Param::WaterTime, ParamValue::Number(300.0));
    match &app.scene().node(water).unwrap().content {
        NodeContent::Water(uniforms) => assert!((uniforms.time - 300.0).abs() < 1e-3),
        other => panic!("unexpected content {:?}", other),
    }

    app.edit(Param::ShowHelpers, ParamValue::Toggle(false));
    app.frame(FrameTime::fixed(2, DT));
    assert_ne!(drops(&app), falling, "rain node must follow the simulation");
    assert_eq!(drops(&app), app.rain().positions());
    assert!(app.settings().water.time > 300.0);
    for id in app.lighting().helpers() {
        assert!(!app.scene().node(*id).unwrap().visible);
    }
}

#[test]
fn test_sun_follows_wall_clock() {
    let mut app = ready_app("sun");
    let orbit_speed = app.settings().panel.orbit_speed as f64;

    let mut time = FrameTime::fixed(1, DT);
    time.wall_clock_ms = std::f64::consts::FRAC_PI_2 / orbit_speed;
    app.frame(time);

    let sun = app.lighting().last_sun().unwrap();
    // Top of the tilted orbit
    assert!((sun.height_ratio - 2.0).abs() < 1e-3, "{:?}", sun);
    let node = app.scene().node(app.lighting().sun().unwrap()).unwrap();
    assert!((node.transform.position - sun.position).length() < 1e-3);
}

#[test]
fn test_lightning_timer_drives_light() {
    let mut app = ready_app("lightning");
    std::thread::sleep(Duration::from_millis(700));
    app.frame(FrameTime::fixed(1, DT));

    let light = app.lighting().lightning_light().unwrap();
    let intensity = app.scene().node(light).unwrap().light().unwrap().intensity;
    assert!(intensity == 0.0 || intensity == 15.0, "intensity {}", intensity);
}

#[test]
fn test_teardown_then_setup_keeps_one_listener() {
    let mut app = ready_app("resetup");

    app.teardown();
    assert!(app.scene().is_empty());
    assert_eq!(app.input().subscriber_count(), 0);

    app.setup();
    app.wait_for_assets(Duration::from_secs(10));
    assert_eq!(app.input().subscriber_count(), 1);
    assert_eq!(app.scene().count_named(TERRAIN_NODE_NAME), 1);

    let center = app.lava().surface_center();
    app.pointer_ray(Vec2::ZERO, Ray::vertical(center.x, center.z, 1000.0));
    app.frame(FrameTime::fixed(1, DT));
    assert_eq!(app.lava().projectiles().len(), 1);
}
