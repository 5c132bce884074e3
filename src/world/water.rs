use crate::config::WaterSettings;
use crate::rendering::scene::{NodeContent, NodeId, SceneNode, SceneSink, Transform};
use crate::utils::math::Color;
use glam::{Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

pub const WATER_NODE_NAME: &str = "water";

/// Values the water shader reads every frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterUniforms {
    pub time: f32,
    pub color: Color,
    pub distortion: f32,
    pub wave_size: f32,
    pub alpha: f32,
    pub size: f32,
}

impl WaterUniforms {
    fn from_settings(settings: &WaterSettings, time: f32) -> Self {
        Self {
            time,
            color: settings.color,
            distortion: settings.distortion,
            wave_size: settings.wave_size,
            alpha: settings.alpha,
            size: settings.size,
        }
    }
}

/// Flat animated water plane
pub struct WaterSurface {
    settings: WaterSettings,
    time: f32,
    node: Option<NodeId>,
}

impl WaterSurface {
    pub fn new(settings: WaterSettings) -> Self {
        Self {
            settings,
            time: 0.0,
            node: None,
        }
    }

    pub fn install(&mut self, sink: &mut dyn SceneSink) -> NodeId {
        if let Some(id) = self.node {
            return id;
        }
        let node = SceneNode::new(
            WATER_NODE_NAME,
            NodeContent::Water(WaterUniforms::from_settings(&self.settings, self.time)),
        )
        .with_transform(Transform {
            position: Vec3::new(0.0, self.settings.elevation, 0.0),
            rotation: Quat::from_rotation_x(-FRAC_PI_2),
            scale: Vec3::ONE,
        })
        .with_shadows(false, true);
        let id = sink.add(node);
        self.node = Some(id);
        id
    }

    /// Advance the animation clock by one frame and push uniforms
    pub fn update(&mut self, sink: &mut dyn SceneSink) {
        self.time += self.settings.time_step;
        self.sync(sink);
    }

    /// Replace the editable parameters; the animation clock keeps running
    pub fn apply_settings(&mut self, settings: WaterSettings, sink: &mut dyn SceneSink) {
        self.settings = settings;
        self.sync(sink);
    }

    pub fn set_color(&mut self, color: Color, sink: &mut dyn SceneSink) {
        self.settings.color = color;
        self.sync(sink);
    }

    fn sync(&self, sink: &mut dyn SceneSink) {
        let Some(node) = self.node.and_then(|id| sink.node_mut(id)) else {
            return;
        };
        node.content = NodeContent::Water(WaterUniforms::from_settings(&self.settings, self.time));
    }

    /// Jump the animation clock to `time`
    pub fn seek(&mut self, time: f32, sink: &mut dyn SceneSink) {
        self.time = time;
        self.sync(sink);
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn teardown(&mut self, sink: &mut dyn SceneSink) {
        if let Some(id) = self.node.take() {
            sink.remove(id);
        }
    }
}
