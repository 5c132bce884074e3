use super::{substeps, BodyHandle, BodyShape, PhysicsBackend};
use crate::config::PhysicsSettings;
use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use tracing::debug;

/// rapier3d world with a static ground halfspace at y = 0
pub struct RapierBackend {
    gravity: Vector<Real>,
    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    handles: Vec<RigidBodyHandle>,
    accumulator: f32,
    max_substeps: u32,
}

impl RapierBackend {
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut colliders = ColliderSet::new();
        let ground = ColliderBuilder::halfspace(Vector::y_axis())
            .restitution(settings.plane_restitution)
            .build();
        colliders.insert(ground);

        let mut params = IntegrationParameters::default();
        params.dt = settings.fixed_step;

        Self {
            gravity: vector![settings.gravity.x, settings.gravity.y, settings.gravity.z],
            params,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            handles: Vec::new(),
            accumulator: 0.0,
            max_substeps: settings.max_substeps,
        }
    }
}

impl PhysicsBackend for RapierBackend {
    fn name(&self) -> &'static str {
        "rapier3d"
    }

    fn create_body(&mut self, shape: BodyShape, mass: f32, position: Vec3, velocity: Vec3) -> BodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .linvel(vector![velocity.x, velocity.y, velocity.z])
            .build();
        let handle = self.bodies.insert(body);

        let collider = match shape {
            BodyShape::Sphere { radius } => ColliderBuilder::ball(radius),
        }
        .mass(mass)
        .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.handles.push(handle);
        debug!("Created rigid body {} at {:?}", self.handles.len() - 1, position);
        BodyHandle(self.handles.len() - 1)
    }

    fn step(&mut self, fixed_dt: f32, real_dt: f32) {
        self.params.dt = fixed_dt;
        let steps = substeps(&mut self.accumulator, fixed_dt, real_dt, self.max_substeps);
        for _ in 0..steps {
            self.pipeline.step(
                &self.gravity,
                &self.params,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &(),
                &(),
            );
        }
    }

    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)> {
        let body = self.bodies.get(*self.handles.get(handle.0)?)?;
        let t = body.translation();
        let q = body.rotation().into_inner().coords;
        Some((Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(q.x, q.y, q.z, q.w)))
    }

    fn body_count(&self) -> usize {
        self.handles.len()
    }
}
