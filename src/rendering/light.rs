use crate::config::{LavaSettings, LightingSettings};
use crate::rendering::lightning::LightningController;
use crate::rendering::scene::{
    HelperKind, LightData, LightKind, NodeContent, NodeId, SceneNode, SceneSink, ShadowFrustum,
    Transform,
};
use crate::utils::math::{lerp, Color};
use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use tracing::debug;

pub const SUN_SHADOW: ShadowFrustum = ShadowFrustum {
    extent: 800.0,
    near: 1.0,
    far: 1000.0,
    map_size: 2048,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position: [f32; 3],
    pub intensity: f32,
    pub color: [f32; 3],
    // Uniforms require 16 byte alignment
    pub _padding: u32,
}

impl LightUniform {
    pub fn new(position: Vec3, light: &LightData) -> Self {
        Self {
            position: position.to_array(),
            intensity: light.intensity,
            color: light.color.to_array(),
            _padding: 0,
        }
    }
}

/// Sun pose and light levels at one instant of the day cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunState {
    pub position: Vec3,
    pub height_ratio: f32,
    pub intensity: f32,
    pub ambient_intensity: f32,
    pub color: Color,
}

impl SunState {
    /// Pure function of orbit time `t` (wall clock in ms times orbit speed)
    ///
    /// Y and Z share the same `sin` term, so the orbit plane is tilted 45°.
    /// The height ratio reaches 2 at the top of the orbit and the blends are
    /// not clamped.
    pub fn at(t: f32, settings: &LightingSettings) -> Self {
        let r = settings.sun_orbit_radius;
        let position = Vec3::new(t.cos() * r, t.sin() * r, t.sin() * r);
        let height_ratio = (position.y / (r * 0.5)).max(0.0);
        Self {
            position,
            height_ratio,
            intensity: lerp(0.2, 1.2, height_ratio),
            ambient_intensity: lerp(0.2, 0.35, height_ratio),
            color: settings.night_color.lerp(&settings.day_color, height_ratio),
        }
    }
}

/// Something in the scene that refreshes itself from other nodes
pub trait Updatable: Send {
    fn update(&mut self, sink: &mut dyn SceneSink);
}

/// Marker that tracks a light's position and aim
struct LightHelper {
    helper: NodeId,
    light: NodeId,
}

impl Updatable for LightHelper {
    fn update(&mut self, sink: &mut dyn SceneSink) {
        let Some(light) = sink.node(self.light) else {
            return;
        };
        let position = light.transform.position;
        let rotation = match light.light().map(|l| l.kind) {
            Some(LightKind::Directional { target, .. }) => aim(position, target),
            _ => Quat::IDENTITY,
        };
        if let Some(helper) = sink.node_mut(self.helper) {
            helper.transform.position = position;
            helper.transform.rotation = rotation;
        }
    }
}

/// Outline of the sun's shadow frustum
struct ShadowCameraHelper {
    helper: NodeId,
    sun: NodeId,
}

impl Updatable for ShadowCameraHelper {
    fn update(&mut self, sink: &mut dyn SceneSink) {
        let Some(sun) = sink.node(self.sun) else {
            return;
        };
        let (position, target, frustum) = match sun.light().map(|l| l.kind) {
            Some(LightKind::Directional { target, shadow }) => (sun.transform.position, target, shadow),
            _ => return,
        };
        if let Some(helper) = sink.node_mut(self.helper) {
            helper.transform = Transform {
                position,
                rotation: aim(position, target),
                scale: Vec3::new(frustum.extent, frustum.extent, frustum.far - frustum.near),
            };
        }
    }
}

fn aim(from: Vec3, to: Vec3) -> Quat {
    let dir = (to - from).normalize_or_zero();
    if dir == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::NEG_Z, dir)
    }
}

/// Sun, ambient, lightning and lava lights plus their helpers
pub struct LightingRig {
    settings: LightingSettings,
    sun: Option<NodeId>,
    ambient: Option<NodeId>,
    lightning_light: Option<NodeId>,
    lava_light: Option<NodeId>,
    helpers: Vec<NodeId>,
    updatables: Vec<Box<dyn Updatable>>,
    lightning: LightningController,
    last_sun: Option<SunState>,
}

impl LightingRig {
    pub fn new(settings: LightingSettings, lightning: LightningController) -> Self {
        Self {
            settings,
            sun: None,
            ambient: None,
            lightning_light: None,
            lava_light: None,
            helpers: Vec::new(),
            updatables: Vec::new(),
            lightning,
            last_sun: None,
        }
    }

    /// Add every light and helper to the scene
    pub fn install(&mut self, lava: &LavaSettings, show_helpers: bool, sink: &mut dyn SceneSink) {
        self.teardown(sink);

        let sun = sink.add(light_node(
            "sun",
            Vec3::new(5.0, 350.0, 350.0),
            LightData {
                kind: LightKind::Directional {
                    target: Vec3::ZERO,
                    shadow: SUN_SHADOW,
                },
                color: self.settings.day_color,
                intensity: 2.0,
            },
            true,
        ));
        let ambient = sink.add(light_node(
            "ambient",
            Vec3::ZERO,
            LightData {
                kind: LightKind::Ambient,
                color: Color::WHITE,
                intensity: self.settings.ambient_intensity,
            },
            false,
        ));
        let lightning = sink.add(light_node(
            "lightning",
            self.lightning.position(),
            LightData {
                kind: LightKind::Point {
                    range: self.settings.lightning_range,
                },
                color: Color::WHITE,
                intensity: self.settings.lightning_intensity,
            },
            true,
        ));
        let lava_light = sink.add(light_node(
            "lava_light",
            lava.position - Vec3::new(0.0, 4.0, 0.0),
            LightData {
                kind: LightKind::Point {
                    range: lava.light_range,
                },
                color: Color::from_hex(0xff4500),
                intensity: lava.light_intensity,
            },
            true,
        ));

        let shadow_helper = sink.add(helper_node(HelperKind::ShadowCamera, show_helpers));
        let sun_helper = sink.add(helper_node(HelperKind::DirectionalLight, show_helpers));
        let lightning_helper = sink.add(helper_node(HelperKind::PointLight, show_helpers));

        self.updatables.push(Box::new(ShadowCameraHelper { helper: shadow_helper, sun }));
        self.updatables.push(Box::new(LightHelper { helper: sun_helper, light: sun }));
        self.updatables.push(Box::new(LightHelper { helper: lightning_helper, light: lightning }));
        self.helpers = vec![shadow_helper, sun_helper, lightning_helper];

        self.sun = Some(sun);
        self.ambient = Some(ambient);
        self.lightning_light = Some(lightning);
        self.lava_light = Some(lava_light);

        self.refresh_helpers(sink);
        debug!("Lighting rig installed with {} helpers", self.helpers.len());
    }

    /// Move the sun along its orbit and refresh dependent helpers
    pub fn update_sun(&mut self, t: f32, sink: &mut dyn SceneSink) -> SunState {
        let state = SunState::at(t, &self.settings);

        if let Some(node) = self.sun.and_then(|id| sink.node_mut(id)) {
            node.transform.position = state.position;
            if let Some(light) = node.light_mut() {
                light.intensity = state.intensity;
                light.color = state.color;
            }
        }
        if let Some(light) = self
            .ambient
            .and_then(|id| sink.node_mut(id))
            .and_then(|node| node.light_mut())
        {
            light.intensity = state.ambient_intensity;
        }

        self.refresh_helpers(sink);
        self.last_sun = Some(state);
        state
    }

    /// Apply one lightning interval to the lightning light
    pub fn lightning_tick(&mut self, sink: &mut dyn SceneSink) {
        self.lightning.fire();
        if let Some(node) = self.lightning_light.and_then(|id| sink.node_mut(id)) {
            node.transform.position = self.lightning.position();
            if let Some(light) = node.light_mut() {
                light.intensity = self.lightning.intensity();
            }
        }
    }

    pub fn set_lightning_enabled(&mut self, enabled: bool) {
        self.lightning.set_enabled(enabled);
        self.settings.lightning_enabled = enabled;
    }

    pub fn set_lava_light_intensity(&mut self, intensity: f32, sink: &mut dyn SceneSink) {
        if let Some(light) = self
            .lava_light
            .and_then(|id| sink.node_mut(id))
            .and_then(|node| node.light_mut())
        {
            light.intensity = intensity;
        }
    }

    pub fn set_helpers_visible(&mut self, visible: bool, sink: &mut dyn SceneSink) {
        for id in &self.helpers {
            if let Some(node) = sink.node_mut(*id) {
                node.visible = visible;
            }
        }
    }

    fn refresh_helpers(&mut self, sink: &mut dyn SceneSink) {
        for updatable in &mut self.updatables {
            updatable.update(sink);
        }
    }

    /// Uniform block entries for every installed light
    pub fn uniforms(&self, sink: &dyn SceneSink) -> Vec<LightUniform> {
        [self.sun, self.ambient, self.lightning_light, self.lava_light]
            .into_iter()
            .flatten()
            .filter_map(|id| sink.node(id))
            .filter_map(|node| node.light().map(|l| LightUniform::new(node.transform.position, l)))
            .collect()
    }

    pub fn settings(&self) -> &LightingSettings {
        &self.settings
    }

    pub fn last_sun(&self) -> Option<SunState> {
        self.last_sun
    }

    pub fn lightning(&self) -> &LightningController {
        &self.lightning
    }

    pub fn sun(&self) -> Option<NodeId> {
        self.sun
    }

    pub fn lightning_light(&self) -> Option<NodeId> {
        self.lightning_light
    }

    pub fn lava_light(&self) -> Option<NodeId> {
        self.lava_light
    }

    pub fn helpers(&self) -> &[NodeId] {
        &self.helpers
    }

    pub fn teardown(&mut self, sink: &mut dyn SceneSink) {
        self.updatables.clear();
        let lights = [
            self.sun.take(),
            self.ambient.take(),
            self.lightning_light.take(),
            self.lava_light.take(),
        ];
        for id in lights.into_iter().flatten().chain(self.helpers.drain(..)) {
            sink.remove(id);
        }
    }
}

fn light_node(name: &str, position: Vec3, light: LightData, cast_shadow: bool) -> SceneNode {
    SceneNode::new(name, NodeContent::Light(light))
        .with_transform(Transform::from_position(position))
        .with_shadows(cast_shadow, false)
}

fn helper_node(kind: HelperKind, visible: bool) -> SceneNode {
    let mut node = SceneNode::new("helper", NodeContent::Helper(kind));
    node.visible = visible;
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::scene::SceneGraph;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::FRAC_PI_2;

    fn rig() -> LightingRig {
        LightingRig::new(
            LightingSettings::default(),
            LightningController::new(true, 50.0, StdRng::seed_from_u64(3)),
        )
    }

    #[test]
    fn test_sun_at_horizon_is_night() {
        let settings = LightingSettings::default();
        let sun = SunState::at(0.0, &settings);
        assert_eq!(sun.position, Vec3::new(350.0, 0.0, 0.0));
        assert_eq!(sun.height_ratio, 0.0);
        assert!((sun.intensity - 0.2).abs() < 1e-6);
        assert!((sun.ambient_intensity - 0.2).abs() < 1e-6);
        assert_eq!(sun.color, settings.night_color);
    }

    #[test]
    fn test_sun_at_zenith_couples_y_and_z() {
        let settings = LightingSettings::default();
        let sun = SunState::at(FRAC_PI_2, &settings);
        assert!((sun.position.y - 350.0).abs() < 1e-3);
        assert!((sun.position.z - sun.position.y).abs() < 1e-6);
        assert!((sun.height_ratio - 2.0).abs() < 1e-5);
        assert!((sun.intensity - 2.2).abs() < 1e-4);
    }

    #[test]
    fn test_sun_below_horizon_clamps_ratio() {
        let sun = SunState::at(-FRAC_PI_2, &LightingSettings::default());
        assert_eq!(sun.height_ratio, 0.0);
    }

    #[test]
    fn test_helpers_follow_sun() {
        let mut graph = SceneGraph::new();
        let mut rig = rig();
        rig.install(&LavaSettings::default(), true, &mut graph);
        let state = rig.update_sun(1.0, &mut graph);

        let sun_helper = rig.helpers()[1];
        assert_eq!(graph.node(sun_helper).unwrap().transform.position, state.position);
        let sun = graph.node(rig.sun().unwrap()).unwrap();
        assert_eq!(sun.light().unwrap().intensity, state.intensity);
    }

    #[test]
    fn test_helper_visibility_toggle() {
        let mut graph = SceneGraph::new();
        let mut rig = rig();
        rig.install(&LavaSettings::default(), true, &mut graph);
        rig.set_helpers_visible(false, &mut graph);
        assert!(rig.helpers().iter().all(|id| !graph.node(*id).unwrap().visible));
    }

    #[test]
    fn test_uniforms_cover_all_lights_and_teardown_clears() {
        let mut graph = SceneGraph::new();
        let mut rig = rig();
        rig.install(&LavaSettings::default(), false, &mut graph);
        assert_eq!(rig.uniforms(&graph).len(), 4);
        rig.teardown(&mut graph);
        assert!(graph.is_empty());
    }
}
