use crate::config::RainSettings;
use crate::rendering::scene::{NodeContent, NodeId, SceneNode, SceneSink};
use crate::world::wind::WindField;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;
use tracing::info;

pub const RAIN_NODE_NAME: &str = "rain";

/// Particles below this height are respawned within the same tick
pub const RECYCLE_FLOOR: f32 = -50.0;
const SPAWN_HALF_EXTENT: f32 = 400.0;
const JITTER: f32 = 0.05;

/// Fixed pool of wind-driven rain drops
///
/// Positions and velocities live in parallel arrays indexed by particle.
/// The `y` velocity is a positive fall speed subtracted every tick.
pub struct RainSimulator {
    settings: RainSettings,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    node: Option<NodeId>,
    rng: StdRng,
}

impl RainSimulator {
    pub fn new(settings: RainSettings, wind: &WindField, rng: StdRng) -> Self {
        let mut rain = Self {
            settings,
            positions: Vec::new(),
            velocities: Vec::new(),
            node: None,
            rng,
        };
        rain.initialize(rain.settings.count, wind);
        rain
    }

    /// Reseed `count` particles across the whole spawn box
    pub fn initialize(&mut self, count: usize, wind: &WindField) {
        self.positions.clear();
        self.velocities.clear();
        self.positions.reserve(count);
        self.velocities.reserve(count);

        for _ in 0..count {
            let position = Vec3::new(
                self.rng.random_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
                self.rng.random_range(-300.0..200.0),
                self.rng.random_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
            );
            let velocity = roll_velocity(&mut self.rng, wind);
            self.positions.push(position);
            self.velocities.push(velocity);
        }
        self.settings.count = count;
    }

    /// Advance every particle by one frame and publish the new positions to
    /// the rain node. No-op while disabled.
    pub fn tick(&mut self, wind: &WindField, sink: &mut dyn SceneSink) {
        if !self.settings.enabled {
            return;
        }
        let (dx, dz) = wind.drift();

        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            position.x += dx;
            position.y -= velocity.y;
            position.z += dz;

            if position.y < RECYCLE_FLOOR {
                *position = Vec3::new(
                    self.rng.random_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
                    self.rng.random_range(100.0..600.0),
                    self.rng.random_range(-SPAWN_HALF_EXTENT..SPAWN_HALF_EXTENT),
                );
                *velocity = roll_velocity(&mut self.rng, wind);
            }
        }
        self.publish(sink);
    }

    fn publish(&self, sink: &mut dyn SceneSink) {
        let Some(node) = self.node.and_then(|id| sink.node_mut(id)) else {
            return;
        };
        if let NodeContent::Points { positions, .. } = &mut node.content {
            *positions = Arc::from(self.positions.as_slice());
        }
    }

    /// Attach or detach the rain node. Particle state is left untouched.
    pub fn set_enabled(&mut self, enabled: bool, sink: &mut dyn SceneSink) {
        self.settings.enabled = enabled;
        match (enabled, self.node) {
            (true, None) => {
                let node = SceneNode::new(
                    RAIN_NODE_NAME,
                    NodeContent::Points {
                        positions: Arc::from(self.positions.as_slice()),
                        size: self.settings.size,
                        color: self.settings.color,
                    },
                );
                self.node = Some(sink.add(node));
            }
            (false, Some(id)) => {
                sink.remove(id);
                self.node = None;
            }
            _ => {}
        }
        info!("Rain {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// Overwrite one particle, for scripted scenarios
    pub fn set_particle(&mut self, index: usize, position: Vec3, velocity: Vec3) {
        if let (Some(p), Some(v)) = (self.positions.get_mut(index), self.velocities.get_mut(index)) {
            *p = position;
            *v = velocity;
        }
    }

    pub fn teardown(&mut self, sink: &mut dyn SceneSink) {
        if let Some(id) = self.node.take() {
            sink.remove(id);
        }
    }
}

fn roll_velocity(rng: &mut StdRng, wind: &WindField) -> Vec3 {
    Vec3::new(
        wind.x + rng.random_range(-JITTER..JITTER),
        rng.random_range(0.4..0.6),
        wind.z + rng.random_range(-JITTER..JITTER),
    )
}
