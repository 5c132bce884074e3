use crate::assets::{AssetEvent, AssetManager, AssetSlot, LoadedAsset};
use crate::config::{save_settings, ConcurrencyManager, SceneSettings, ThreadPoolConfig};
use crate::error::{SceneError, SceneResult};
use crate::rendering::light::LightingRig;
use crate::rendering::lightning::{LightningController, LightningTimer, LIGHTNING_INTERVAL};
use crate::rendering::picking::{camera_status, Ray};
use crate::rendering::scene::{NodeId, SceneGraph, SceneSink};
use crate::ui::{Effect, Param, ParamValue, TweakPanel};
use crate::world::events::{InputEvent, InputHub};
use crate::world::lava::LavaController;
use crate::world::physics::{detect_backend, PhysicsBackend};
use crate::world::rain::RainSimulator;
use crate::world::scatter;
use crate::world::terrain::TerrainManager;
use crate::world::water::WaterSurface;
use glam::{Mat4, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const CLOUD_NODE_NAME: &str = "cloud";

/// Per-frame clock supplied by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    pub delta_seconds: f32,
    pub elapsed_seconds: f32,
    /// Wall clock in milliseconds; drives the sun orbit
    pub wall_clock_ms: f64,
}

impl FrameTime {
    pub fn fixed(frame: u32, delta_seconds: f32) -> Self {
        let elapsed = frame as f32 * delta_seconds;
        Self {
            delta_seconds,
            elapsed_seconds: elapsed,
            wall_clock_ms: elapsed as f64 * 1000.0,
        }
    }
}

/// Wall-clock frame timing for interactive hosts
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl Default for FrameClock {
    fn default() -> Self {
        let now = Instant::now();
        Self { start: now, last: now }
    }
}

impl FrameClock {
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let delta = now.duration_since(self.last).as_secs_f32();
        self.last = now;
        let wall_clock_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or_default();
        FrameTime {
            delta_seconds: delta,
            elapsed_seconds: now.duration_since(self.start).as_secs_f32(),
            wall_clock_ms,
        }
    }
}

/// A setup step that failed and left its feature disabled
#[derive(Debug, Clone, PartialEq)]
pub struct SetupFailure {
    pub step: &'static str,
    pub reason: String,
    pub degraded: bool,
}

/// Independent random stream per subsystem, reproducible when a seed is set
fn rng_stream(seed: Option<u64>, stream: u64) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        None => StdRng::from_os_rng(),
    }
}

/// The whole procedural scene and its simulation
///
/// All scene mutation happens through [`frame`](SceneApp::frame) and the
/// input/edit entry points, on the caller's thread. Background work (asset
/// loads, the lightning timer, terrain displacement) reports back through
/// channels that are drained at the start of each frame.
pub struct SceneApp<S: SceneSink = SceneGraph> {
    settings: SceneSettings,
    scene: S,
    concurrency: ConcurrencyManager,
    assets: AssetManager,
    terrain: TerrainManager,
    rain: RainSimulator,
    water: WaterSurface,
    lava: LavaController,
    lighting: LightingRig,
    lightning_timer: Option<LightningTimer>,
    physics: Option<Box<dyn PhysicsBackend>>,
    input: InputHub,
    panel: TweakPanel,
    clouds: Vec<NodeId>,
    cloud_rng: StdRng,
    failures: Vec<SetupFailure>,
}

impl SceneApp<SceneGraph> {
    pub fn new(settings: SceneSettings) -> SceneResult<Self> {
        Self::with_scene(settings, SceneGraph::new(), ThreadPoolConfig::default())
    }
}

impl<S: SceneSink> SceneApp<S> {
    pub fn with_scene(settings: SceneSettings, scene: S, pools: ThreadPoolConfig) -> SceneResult<Self> {
        let concurrency = ConcurrencyManager::new(pools)?;
        let assets = AssetManager::new(concurrency.handle());
        let seed = settings.seed;

        let terrain = TerrainManager::new(settings.terrain.clone(), rng_stream(seed, 1));
        let rain = RainSimulator::new(settings.rain.clone(), &settings.wind, rng_stream(seed, 2));
        let water = WaterSurface::new(settings.water.clone());
        let lava = LavaController::new(settings.lava.clone(), rng_stream(seed, 3));
        let lightning = LightningController::new(
            settings.lighting.lightning_enabled,
            settings.lighting.lightning_intensity,
            rng_stream(seed, 4),
        );
        let lighting = LightingRig::new(settings.lighting.clone(), lightning);

        Ok(Self {
            terrain,
            rain,
            water,
            lava,
            lighting,
            assets,
            concurrency,
            scene,
            lightning_timer: None,
            physics: None,
            input: InputHub::new(),
            panel: TweakPanel::new(),
            clouds: Vec::new(),
            cloud_rng: rng_stream(seed, 5),
            failures: Vec::new(),
            settings,
        })
    }

    /// Provide a physics backend instead of the compiled-in one
    pub fn set_physics_backend(&mut self, backend: Box<dyn PhysicsBackend>) {
        self.physics = Some(backend);
    }

    /// Bring every subsystem up. Each step is guarded on its own: a failure is
    /// logged and recorded, and the remaining steps still run.
    pub fn setup(&mut self) {
        self.failures.clear();

        if self.physics.is_none() {
            let result = detect_backend(&self.settings.physics).map(|backend| {
                self.physics = Some(backend);
            });
            self.guard("physics", result);
        }

        self.lighting
            .install(&self.settings.lava, self.settings.panel.show_helpers, &mut self.scene);
        self.water.install(&mut self.scene);

        self.lava.install_surface(&mut self.scene);
        let fire = self.lava.install_fire(&mut self.scene).map(|_| ());
        self.guard("fire", fire);
        self.lava.subscribe(&self.input);

        if self.settings.rain.enabled {
            self.rain.set_enabled(true, &mut self.scene);
        }

        self.lightning_timer = Some(LightningTimer::start(&self.concurrency.handle(), LIGHTNING_INTERVAL));

        let assets = &self.settings.assets;
        self.assets.load_height_map(assets.resolve(&assets.height_map));
        self.assets
            .load_prefab(AssetSlot::TreeTemplate, assets.resolve(&assets.tree_prefab));
        self.assets
            .load_prefab(AssetSlot::CloudTemplate, assets.resolve(&assets.cloud_prefab));

        info!(
            "Scene setup finished: {} step(s) degraded, {} asset load(s) pending",
            self.failures.len(),
            self.assets.pending()
        );
    }

    fn guard(&mut self, step: &'static str, result: SceneResult<()>) {
        if let Err(e) = result {
            let degraded = e.is_degraded_mode();
            if e.report_level() == tracing::Level::WARN {
                warn!("{} unavailable: {}", step, e);
            } else {
                error!("{} setup failed: {}", step, e);
            }
            self.failures.push(SetupFailure {
                step,
                reason: e.to_string(),
                degraded,
            });
        }
    }

    /// Apply a finished asset load
    pub fn apply_asset(&mut self, event: AssetEvent) {
        let AssetEvent { slot, path, result } = event;
        let step = match slot {
            AssetSlot::HeightMap => "height map",
            AssetSlot::TreeTemplate => "tree template",
            AssetSlot::CloudTemplate => "cloud template",
        };
        let outcome = result.and_then(|asset| match (slot, asset) {
            (AssetSlot::HeightMap, LoadedAsset::HeightMap(field)) => {
                self.terrain.set_height_field(field);
                self.rebuild_terrain()
            }
            (AssetSlot::TreeTemplate, LoadedAsset::Prefab(node)) => {
                self.terrain.set_tree_template(node, &mut self.scene);
                Ok(())
            }
            (AssetSlot::CloudTemplate, LoadedAsset::Prefab(node)) => {
                self.place_clouds(&node);
                Ok(())
            }
            (slot, _) => Err(SceneError::AssetLoad {
                path: path.clone(),
                reason: format!("unexpected asset kind for {:?}", slot),
            }),
        });
        self.guard(step, outcome);
    }

    /// Apply completions until none are pending or `timeout` runs out
    pub fn wait_for_assets(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = 0;
        while self.assets.pending() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(event) = self.assets.wait_next(remaining) else {
                break;
            };
            self.apply_asset(event);
            applied += 1;
        }
        applied
    }

    fn place_clouds(&mut self, template: &crate::rendering::scene::SceneNode) {
        for id in self.clouds.drain(..) {
            self.scene.remove(id);
        }
        let clouds = scatter::scatter_in_volume(
            template,
            -250.0..550.0,
            180.0..200.0,
            -250.0..550.0,
            1.0..1.8,
            self.settings.assets.cloud_count,
            &mut self.cloud_rng,
        );
        for cloud in clouds {
            let mut node = cloud.node;
            node.name = CLOUD_NODE_NAME.to_string();
            self.clouds.push(self.scene.add(node));
        }
        debug!("Placed {} clouds", self.clouds.len());
    }

    /// Rebuild the terrain from the current settings on the job pool
    pub fn rebuild_terrain(&mut self) -> SceneResult<()> {
        self.terrain.set_settings(self.settings.terrain.clone());
        let terrain = &self.terrain;
        let mesh = self.concurrency.execute_job(|| terrain.build_mesh())?;
        self.terrain.install(mesh, &mut self.scene);
        Ok(())
    }

    /// Advance the scene by one frame
    pub fn frame(&mut self, time: FrameTime) {
        for event in self.assets.drain() {
            self.apply_asset(event);
        }
        for effect in self.panel.drain_effects() {
            self.apply_effect(effect);
        }

        let lightning_ticks = self.lightning_timer.as_ref().map_or(0, LightningTimer::drain);
        for _ in 0..lightning_ticks {
            self.lighting.lightning_tick(&mut self.scene);
        }

        self.lava.handle_input(self.physics.as_deref_mut(), &mut self.scene);
        if let Some(physics) = self.physics.as_deref_mut() {
            physics.step(self.settings.physics.fixed_step, time.delta_seconds);
        }

        self.water.update(&mut self.scene);
        self.settings.water.time = self.water.time();
        self.rain.tick(&self.settings.wind, &mut self.scene);
        self.lava.tick(time.delta_seconds, self.physics.as_deref(), &mut self.scene);
        self.lighting
            .set_lava_light_intensity(self.lava.light_intensity(), &mut self.scene);
        self.terrain
            .animate_trees(time.elapsed_seconds, &self.settings.wind, &mut self.scene);

        let orbit = (time.wall_clock_ms * self.settings.panel.orbit_speed as f64) % std::f64::consts::TAU;
        self.lighting.update_sun(orbit as f32, &mut self.scene);
    }

    /// Pointer press at normalized device coordinates
    pub fn pointer_down(&mut self, ndc: Vec2, inverse_view_projection: Mat4) -> Option<Vec3> {
        let ray = Ray::from_ndc(ndc, inverse_view_projection);
        self.pointer_ray(ndc, ray)
    }

    /// Route a pick ray; a lava hit is published and ejects on the next frame
    pub fn pointer_ray(&mut self, ndc: Vec2, ray: Ray) -> Option<Vec3> {
        let hit = self.lava.pick(&ray)?;
        debug!("Lava surface hit at {:?}", hit);
        self.input.publish(InputEvent::LavaHit { ndc, ray, hit });
        Some(hit)
    }

    /// Camera readout for the panel; the camera orbits the world origin
    pub fn camera_status(&self) -> String {
        camera_status(self.settings.camera.position, Vec3::ZERO)
    }

    /// Panel edit during interaction
    pub fn edit(&mut self, param: Param, value: ParamValue) {
        if self.panel.edit(&mut self.settings, param, value) {
            self.apply_live(param);
        }
    }

    /// Panel interaction with `param` ended
    pub fn finish_edit(&mut self, param: Param) {
        self.panel.finish(param);
    }

    fn apply_live(&mut self, param: Param) {
        match param {
            Param::LightningEnabled => self
                .lighting
                .set_lightning_enabled(self.settings.lighting.lightning_enabled),
            Param::WaterTime => self.water.seek(self.settings.water.time, &mut self.scene),
            Param::WaterDistortion | Param::WaterWaveSize | Param::WaterAlpha | Param::WaterTimeStep => {
                self.water.apply_settings(self.settings.water.clone(), &mut self.scene)
            }
            // Wind and orbit speed are read from the settings every frame
            _ => {}
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        debug!("Applying panel effect {:?}", effect);
        match effect {
            Effect::RebuildTerrain => match self.rebuild_terrain() {
                Ok(()) => {}
                Err(SceneError::NotReady { what }) => {
                    debug!("Terrain rebuild deferred until the {} loads", what)
                }
                Err(e) => error!("Terrain rebuild failed: {}", e),
            },
            Effect::ToggleRain => self.rain.set_enabled(self.settings.rain.enabled, &mut self.scene),
            Effect::ToggleHelpers => self
                .lighting
                .set_helpers_visible(self.settings.panel.show_helpers, &mut self.scene),
            Effect::RecolorWater => self.water.set_color(self.settings.water.color, &mut self.scene),
        }
    }

    pub fn save_settings(&self, path: &Path) -> SceneResult<()> {
        save_settings(&self.settings, path)
    }

    /// Detach everything and drop subscriptions and timers so that
    /// [`setup`](SceneApp::setup) can run again from scratch
    pub fn teardown(&mut self) {
        self.lightning_timer = None;
        self.lava.teardown(&mut self.scene);
        self.rain.teardown(&mut self.scene);
        self.water.teardown(&mut self.scene);
        self.terrain.teardown(&mut self.scene);
        self.lighting.teardown(&mut self.scene);
        for id in self.clouds.drain(..) {
            self.scene.remove(id);
        }
        info!("Scene torn down");
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn terrain(&self) -> &TerrainManager {
        &self.terrain
    }

    pub fn rain(&self) -> &RainSimulator {
        &self.rain
    }

    pub fn water(&self) -> &WaterSurface {
        &self.water
    }

    pub fn lava(&self) -> &LavaController {
        &self.lava
    }

    pub fn lighting(&self) -> &LightingRig {
        &self.lighting
    }

    pub fn panel(&self) -> &TweakPanel {
        &self.panel
    }

    pub fn input(&self) -> &InputHub {
        &self.input
    }

    pub fn physics(&self) -> Option<&dyn PhysicsBackend> {
        self.physics.as_deref()
    }

    pub fn clouds(&self) -> &[NodeId] {
        &self.clouds
    }

    pub fn setup_failures(&self) -> &[SetupFailure] {
        &self.failures
    }

    pub fn pending_assets(&self) -> usize {
        self.assets.pending()
    }
}
