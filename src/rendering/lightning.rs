use crossbeam_channel::{unbounded, Receiver};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

pub const LIGHTNING_INTERVAL: Duration = Duration::from_millis(200);
pub const FLASH_INTENSITY: f32 = 15.0;
pub const FLASH_PROBABILITY: f32 = 0.08;
pub const START_POSITION: Vec3 = Vec3::new(400.0, 230.0, 0.0);
const AREA_HALF_EXTENT: f32 = 400.0;

/// Randomized flicker of the lightning light
pub struct LightningController {
    enabled: bool,
    intensity: f32,
    position: Vec3,
    rng: StdRng,
}

impl LightningController {
    pub fn new(enabled: bool, initial_intensity: f32, rng: StdRng) -> Self {
        Self {
            enabled,
            intensity: initial_intensity,
            position: START_POSITION,
            rng,
        }
    }

    /// One interval step: flash or go dark at a new random spot, or stay
    /// dark in place when disabled.
    pub fn fire(&mut self) {
        if !self.enabled {
            self.intensity = 0.0;
            return;
        }
        self.intensity = if self.rng.random::<f32>() > FLASH_PROBABILITY {
            0.0
        } else {
            FLASH_INTENSITY
        };
        self.position = Vec3::new(
            self.rng.random_range(-AREA_HALF_EXTENT..AREA_HALF_EXTENT),
            300.0 + self.rng.random::<f32>() * 30.0,
            self.rng.random_range(-AREA_HALF_EXTENT..AREA_HALF_EXTENT),
        );
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}

/// Wall-clock ticker running on the tokio runtime
///
/// Ticks are queued on a channel and drained by the frame thread between
/// frames, so a tick never interleaves with a frame update. The task is
/// aborted when the timer is dropped.
pub struct LightningTimer {
    ticks: Receiver<()>,
    task: JoinHandle<()>,
}

impl LightningTimer {
    pub fn start(runtime: &Handle, period: Duration) -> Self {
        let (tx, rx) = unbounded();
        let task = runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(()).is_err() {
                    break;
                }
            }
        });
        debug!("Lightning timer started with period {:?}", period);
        Self { ticks: rx, task }
    }

    /// Number of ticks elapsed since the last drain
    pub fn drain(&self) -> usize {
        self.ticks.try_iter().count()
    }

    pub fn wait_tick(&self, timeout: Duration) -> bool {
        self.ticks.recv_timeout(timeout).is_ok()
    }
}

impl Drop for LightningTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_disabled_forces_darkness_in_place() {
        let mut lightning = LightningController::new(false, 50.0, StdRng::seed_from_u64(1));
        lightning.fire();
        assert_eq!(lightning.intensity(), 0.0);
        assert_eq!(lightning.position(), START_POSITION);
    }

    #[test]
    fn test_enabled_flashes_within_area() {
        let mut lightning = LightningController::new(true, 50.0, StdRng::seed_from_u64(7));
        let mut flashes = 0;
        for _ in 0..2000 {
            lightning.fire();
            let i = lightning.intensity();
            assert!(i == 0.0 || i == FLASH_INTENSITY);
            if i > 0.0 {
                flashes += 1;
            }
            let p = lightning.position();
            assert!((-400.0..400.0).contains(&p.x) && (-400.0..400.0).contains(&p.z));
            assert!((300.0..=330.0).contains(&p.y));
        }
        // Expected around 160 flashes out of 2000
        assert!((80..260).contains(&flashes), "flashes {}", flashes);
    }

    #[test]
    fn test_timer_ticks_on_runtime() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let timer = LightningTimer::start(runtime.handle(), Duration::from_millis(10));
        assert!(timer.wait_tick(Duration::from_secs(5)));
    }
}
