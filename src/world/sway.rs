use crate::world::scatter::Placement;
use crate::world::wind::WindField;
use glam::{EulerRot, Quat};

/// Tilt angle of one instance at `elapsed_seconds`
pub fn tilt(elapsed_seconds: f32, wind: &WindField, sway_offset: f32, sway_amplitude: f32) -> f32 {
    let phase = elapsed_seconds * 3.0 + sway_offset;
    phase.sin() * 0.15 * wind.speed * sway_amplitude
}

/// Orientation of a swaying instance: the tilt is split across X and Z by
/// the wind direction while the placement yaw is kept.
pub fn rotation(elapsed_seconds: f32, wind: &WindField, placement: &Placement) -> Quat {
    let tilt = tilt(
        elapsed_seconds,
        wind,
        placement.sway_offset,
        placement.sway_amplitude,
    );
    Quat::from_euler(EulerRot::XYZ, tilt * wind.z, placement.yaw, tilt * wind.x)
}
