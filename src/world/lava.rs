use crate::config::LavaSettings;
use crate::error::{SceneError, SceneResult};
use crate::rendering::picking::Ray;
use crate::rendering::scene::{NodeContent, NodeId, SceneNode, SceneSink, Transform};
use crate::utils::math::Color;
use crate::world::events::{InputEvent, InputHub, Subscription};
use crate::world::physics::{BodyHandle, BodyShape, PhysicsBackend};
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::FRAC_PI_2;
use tracing::{debug, info};

pub const LAVA_SURFACE_NODE_NAME: &str = "lava_surface";
pub const FIRE_NODE_NAME: &str = "lava_fire";
pub const PROJECTILE_NODE_NAME: &str = "lava_projectile";

const SURFACE_DROP: f32 = 4.0;
const LAUNCH_LIFT: f32 = 5.0;
const SIDE_SPEED: f32 = 27.0;
const BODY_RADIUS: f32 = 1.5;
const BODY_MASS: f32 = 3.0;
const PROXY_RADIUS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EjectionState {
    Idle,
    /// Set by an ejection and cleared by the next tick; never blocks another ejection
    Ejected,
}

/// Render proxy paired with an optional physics body
#[derive(Debug, Clone, PartialEq)]
pub struct LavaProjectile {
    pub node: NodeId,
    /// `None` in visual-only mode
    pub body: Option<BodyHandle>,
    pub launch_velocity: Vec3,
}

/// Clickable lava pool that throws debris
pub struct LavaController {
    settings: LavaSettings,
    state: EjectionState,
    projectiles: Vec<LavaProjectile>,
    surface: Option<NodeId>,
    fire: Option<NodeId>,
    fire_time: f32,
    flash_remaining: f32,
    subscription: Option<Subscription>,
    rng: StdRng,
}

impl LavaController {
    pub fn new(settings: LavaSettings, rng: StdRng) -> Self {
        Self {
            settings,
            state: EjectionState::Idle,
            projectiles: Vec::new(),
            surface: None,
            fire: None,
            fire_time: 0.0,
            flash_remaining: 0.0,
            subscription: None,
            rng,
        }
    }

    /// Center of the clickable lava disk
    pub fn surface_center(&self) -> Vec3 {
        self.settings.position - Vec3::new(0.0, SURFACE_DROP, 0.0)
    }

    pub fn surface_radius(&self) -> f32 {
        self.settings.surface_radius
    }

    pub fn install_surface(&mut self, sink: &mut dyn SceneSink) -> NodeId {
        if let Some(id) = self.surface {
            return id;
        }
        let node = SceneNode::new(
            LAVA_SURFACE_NODE_NAME,
            NodeContent::Disk {
                radius: self.settings.surface_radius,
                emissive: Color::from_hex(0xff4500),
                emissive_intensity: 0.2,
            },
        )
        .with_transform(Transform {
            position: self.surface_center(),
            rotation: Quat::from_rotation_x(-FRAC_PI_2),
            scale: Vec3::ONE,
        });
        let id = sink.add(node);
        self.surface = Some(id);
        id
    }

    /// Add the fire column above the pool
    pub fn install_fire(&mut self, sink: &mut dyn SceneSink) -> SceneResult<NodeId> {
        if let Some(id) = self.fire {
            return Ok(id);
        }
        if self.settings.fire_particle_count == 0 || self.settings.fire_radius <= 0.0 {
            return Err(SceneError::Config {
                reason: "fire column needs a positive radius and particle count".to_string(),
            });
        }
        let node = SceneNode::new(
            FIRE_NODE_NAME,
            NodeContent::Fire {
                radius: self.settings.fire_radius,
                height: self.settings.fire_height,
                particle_count: self.settings.fire_particle_count,
                time: self.fire_time,
            },
        )
        .with_transform(Transform::from_position(self.settings.position));
        let id = sink.add(node);
        self.fire = Some(id);
        info!("Lava fire column installed at {:?}", self.settings.position);
        Ok(id)
    }

    /// Listen for lava hits published on `hub`, replacing any previous listener
    pub fn subscribe(&mut self, hub: &InputHub) {
        self.subscription = Some(hub.subscribe());
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Hit point of `ray` on the lava disk
    pub fn pick(&self, ray: &Ray) -> Option<Vec3> {
        ray.intersect_disk(self.surface_center(), self.settings.surface_radius)
    }

    /// Eject at every hit received since the last call
    pub fn handle_input(
        &mut self,
        mut physics: Option<&mut (dyn PhysicsBackend + 'static)>,
        sink: &mut dyn SceneSink,
    ) -> usize {
        let events = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        for event in &events {
            let InputEvent::LavaHit { hit, .. } = *event;
            self.eject(hit, physics.as_deref_mut(), sink);
        }
        events.len()
    }

    /// Spawn a projectile launched from above `point`
    ///
    /// Without a physics backend the proxy is placed at the launch point and
    /// never moves.
    pub fn eject(
        &mut self,
        point: Vec3,
        physics: Option<&mut (dyn PhysicsBackend + 'static)>,
        sink: &mut dyn SceneSink,
    ) -> &LavaProjectile {
        self.state = EjectionState::Ejected;

        let start = point + Vec3::new(0.0, LAUNCH_LIFT, 0.0);
        let velocity = Vec3::new(
            (self.rng.random::<f32>() - 0.5) * SIDE_SPEED,
            10.0 + self.rng.random::<f32>() * 20.0,
            (self.rng.random::<f32>() - 0.5) * SIDE_SPEED,
        );

        let node = SceneNode::new(
            PROJECTILE_NODE_NAME,
            NodeContent::Sphere {
                radius: PROXY_RADIUS,
                color: Color::from_hex(0xff4500),
                emissive: Color::from_hex(0xff2200),
            },
        )
        .with_transform(Transform::from_position(start))
        .with_shadows(true, true);
        let node = sink.add(node);

        let body = physics.map(|backend| {
            backend.create_body(BodyShape::Sphere { radius: BODY_RADIUS }, BODY_MASS, start, velocity)
        });
        debug!(
            "Lava ejected at {:?} with velocity {:?} ({})",
            start,
            velocity,
            if body.is_some() { "physics" } else { "visual only" }
        );

        self.flash_remaining = self.settings.flash_seconds;
        self.projectiles.push(LavaProjectile {
            node,
            body,
            launch_velocity: velocity,
        });
        &self.projectiles[self.projectiles.len() - 1]
    }

    /// Per-frame update: fire animation, light flash timer and projectile poses
    pub fn tick(
        &mut self,
        delta_seconds: f32,
        physics: Option<&(dyn PhysicsBackend + 'static)>,
        sink: &mut dyn SceneSink,
    ) {
        self.state = EjectionState::Idle;
        self.flash_remaining = (self.flash_remaining - delta_seconds).max(0.0);

        if let Some(id) = self.fire {
            self.fire_time += delta_seconds / 2.0;
            if let Some(NodeContent::Fire { time, .. }) = sink.node_mut(id).map(|n| &mut n.content) {
                *time = self.fire_time;
            }
        }

        let Some(physics) = physics else {
            return;
        };
        for projectile in &self.projectiles {
            let Some(body) = projectile.body else {
                continue;
            };
            if let (Some((position, rotation)), Some(node)) =
                (physics.body_pose(body), sink.node_mut(projectile.node))
            {
                node.transform.position = position;
                node.transform.rotation = rotation;
            }
        }
    }

    /// Lava light intensity: the flash level while an ejection's flash is
    /// held, otherwise the base level. A new ejection restarts the hold.
    pub fn light_intensity(&self) -> f32 {
        if self.flash_remaining > 0.0 {
            self.settings.flash_intensity
        } else {
            self.settings.light_intensity
        }
    }

    pub fn state(&self) -> EjectionState {
        self.state
    }

    pub fn projectiles(&self) -> &[LavaProjectile] {
        &self.projectiles
    }

    pub fn fire_time(&self) -> f32 {
        self.fire_time
    }

    pub fn has_fire(&self) -> bool {
        self.fire.is_some()
    }

    pub fn settings(&self) -> &LavaSettings {
        &self.settings
    }

    /// Drop the input subscription and detach every node this controller added
    pub fn teardown(&mut self, sink: &mut dyn SceneSink) {
        self.subscription = None;
        for projectile in self.projectiles.drain(..) {
            sink.remove(projectile.node);
        }
        for id in [self.surface.take(), self.fire.take()].into_iter().flatten() {
            sink.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::scene::SceneGraph;
    use rand::SeedableRng;

    fn controller() -> LavaController {
        LavaController::new(LavaSettings::default(), StdRng::seed_from_u64(21))
    }

    #[test]
    fn test_launch_velocity_ranges() {
        let mut graph = SceneGraph::new();
        let mut lava = controller();
        for _ in 0..200 {
            let v = lava.eject(Vec3::ZERO, None, &mut graph).launch_velocity;
            assert!((-13.5..=13.5).contains(&v.x));
            assert!((-13.5..=13.5).contains(&v.z));
            assert!((10.0..=30.0).contains(&v.y));
        }
        assert_eq!(graph.count_named(PROJECTILE_NODE_NAME), 200);
    }

    #[test]
    fn test_state_returns_to_idle_on_tick() {
        let mut graph = SceneGraph::new();
        let mut lava = controller();
        lava.eject(Vec3::ZERO, None, &mut graph);
        assert_eq!(lava.state(), EjectionState::Ejected);
        lava.eject(Vec3::ZERO, None, &mut graph);
        assert_eq!(lava.projectiles().len(), 2);
        lava.tick(0.016, None, &mut graph);
        assert_eq!(lava.state(), EjectionState::Idle);
    }

    #[test]
    fn test_light_flash_holds_then_drops_to_base() {
        let mut graph = SceneGraph::new();
        let mut lava = controller();
        let base = lava.settings().light_intensity;
        assert_eq!(lava.light_intensity(), base);

        lava.eject(Vec3::ZERO, None, &mut graph);
        assert_eq!(lava.light_intensity(), 50.0);
        lava.tick(1.0, None, &mut graph);
        assert_eq!(lava.light_intensity(), 50.0);
        lava.tick(0.9, None, &mut graph);
        assert_eq!(lava.light_intensity(), 50.0);
        lava.tick(0.2, None, &mut graph);
        assert_eq!(lava.light_intensity(), base);
    }

    #[test]
    fn test_second_ejection_restarts_flash() {
        let mut graph = SceneGraph::new();
        let mut lava = controller();
        lava.eject(Vec3::ZERO, None, &mut graph);
        lava.tick(1.5, None, &mut graph);
        lava.eject(Vec3::ZERO, None, &mut graph);
        lava.tick(1.5, None, &mut graph);
        assert_eq!(lava.light_intensity(), 50.0);
        lava.tick(0.6, None, &mut graph);
        assert_eq!(lava.light_intensity(), lava.settings().light_intensity);
    }

    #[test]
    fn test_fire_time_advances_at_half_speed() {
        let mut graph = SceneGraph::new();
        let mut lava = controller();
        lava.install_fire(&mut graph).unwrap();
        lava.tick(0.5, None, &mut graph);
        assert!((lava.fire_time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_pick_uses_lowered_disk() {
        let lava = controller();
        let center = lava.surface_center();
        assert_eq!(center, Vec3::new(-174.0, 58.0, 88.0));
        let hit = lava.pick(&Ray::vertical(center.x + 5.0, center.z, 300.0));
        assert_eq!(hit, Some(Vec3::new(center.x + 5.0, 58.0, center.z)));
    }

    #[test]
    fn test_teardown_removes_everything() {
        let mut graph = SceneGraph::new();
        let hub = InputHub::new();
        let mut lava = controller();
        lava.install_surface(&mut graph);
        lava.install_fire(&mut graph).unwrap();
        lava.subscribe(&hub);
        lava.eject(Vec3::ZERO, None, &mut graph);

        lava.teardown(&mut graph);
        assert!(graph.is_empty());
        assert_eq!(hub.subscriber_count(), 0);
    }
}
