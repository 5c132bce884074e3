//! Rigid-body physics as an opaque service: bodies in, poses out.
//!
//! The scene only needs to create dynamic bodies and read their pose each
//! frame. The rapier3d backend is compiled with the `physics` feature; without
//! it [`detect_backend`] reports the backend as unavailable and projectiles
//! stay visual-only.

#[cfg(feature = "physics")]
mod rapier_backend;

#[cfg(feature = "physics")]
pub use rapier_backend::RapierBackend;

use crate::config::PhysicsSettings;
use crate::error::SceneResult;
use glam::{Quat, Vec3};

/// Opaque handle to a body owned by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Sphere { radius: f32 },
}

pub trait PhysicsBackend: Send {
    fn name(&self) -> &'static str;

    /// Add a dynamic body with an initial linear velocity
    fn create_body(&mut self, shape: BodyShape, mass: f32, position: Vec3, velocity: Vec3) -> BodyHandle;

    /// Advance by whole `fixed_dt` steps covering the accumulated `real_dt`
    fn step(&mut self, fixed_dt: f32, real_dt: f32);

    /// Current position and orientation, `None` for an unknown handle
    fn body_pose(&self, handle: BodyHandle) -> Option<(Vec3, Quat)>;

    fn body_count(&self) -> usize;
}

/// Number of fixed steps to run for `real_dt`, updating the time accumulator
///
/// At most `max_substeps` steps run; time beyond that is dropped so a long
/// stall does not snowball into ever longer frames.
pub fn substeps(accumulator: &mut f32, fixed_dt: f32, real_dt: f32, max_substeps: u32) -> u32 {
    if fixed_dt <= 0.0 {
        return 0;
    }
    *accumulator += real_dt.max(0.0);
    let mut steps = 0;
    while *accumulator >= fixed_dt && steps < max_substeps {
        *accumulator -= fixed_dt;
        steps += 1;
    }
    if steps == max_substeps {
        *accumulator = accumulator.min(fixed_dt);
    }
    steps
}

/// Create the physics backend if one was compiled in
pub fn detect_backend(settings: &PhysicsSettings) -> SceneResult<Box<dyn PhysicsBackend>> {
    #[cfg(feature = "physics")]
    {
        let backend = RapierBackend::new(settings);
        tracing::info!("Physics backend detected: {}", backend.name());
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "physics"))]
    {
        let _ = settings;
        tracing::warn!("No physics backend compiled in, lava projectiles will be visual-only");
        Err(crate::error::SceneError::BackendUnavailable { backend: "rapier3d" })
    }
}
