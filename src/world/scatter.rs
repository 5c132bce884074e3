use crate::rendering::scene::{SceneNode, Transform};
use crate::utils::math::Color;
use crate::world::terrain::TerrainMesh;
use glam::{Quat, Vec3};
use rand::Rng;
use std::collections::HashSet;
use std::f32::consts::TAU;
use std::ops::Range;

/// RGB distance under which a vertex counts as the target band
pub const COLOR_TOLERANCE: f32 = 0.03;
/// Random draws per slot before that slot is given up
pub const MAX_RETRIES: usize = 50;
/// Vertical lift applied to every placement
pub const SURFACE_LIFT: f32 = 0.2;

const SCALE_RANGE: Range<f32> = 5.0..5.5;
const AMPLITUDE_RANGE: Range<f32> = 0.6..1.2;

/// Pose and sway seed chosen for one scattered instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub yaw: f32,
    pub scale: f32,
    /// Phase offset in [0, 2π)
    pub sway_offset: f32,
    /// Amplitude factor in [0.6, 1.2)
    pub sway_amplitude: f32,
}

/// A deep clone of the template, posed but not yet attached
#[derive(Debug, Clone)]
pub struct ScatterInstance {
    pub node: SceneNode,
    pub placement: Placement,
}

/// Local positions of every vertex whose color lies within `tolerance` of `target`
pub fn extract_candidates(mesh: &TerrainMesh, target: Color, tolerance: f32) -> Vec<Vec3> {
    mesh.vertices
        .iter()
        .filter(|v| v.color().distance(&target) < tolerance)
        .map(|v| v.position())
        .collect()
}

/// Pick up to `count` distinct candidates and pose a clone of `template` on each
///
/// Each slot draws a random index up to [`MAX_RETRIES`] times looking for
/// one not already taken; if all draws collide the slot is skipped, so the
/// result can hold fewer than `count` instances. No spacing is enforced.
pub fn scatter<R: Rng + ?Sized>(
    template: &SceneNode,
    candidates: &[Vec3],
    local_to_world: &Transform,
    count: usize,
    rng: &mut R,
) -> Vec<ScatterInstance> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut chosen = HashSet::with_capacity(count.min(candidates.len()));
    let mut instances = Vec::with_capacity(count.min(candidates.len()));

    for _ in 0..count {
        let picked = (0..MAX_RETRIES)
            .map(|_| rng.random_range(0..candidates.len()))
            .find(|index| !chosen.contains(index));
        let Some(index) = picked else {
            continue;
        };
        chosen.insert(index);

        let mut position = local_to_world.transform_point(candidates[index]);
        position.y += SURFACE_LIFT;

        let placement = Placement {
            position,
            yaw: rng.random_range(0.0..TAU),
            scale: rng.random_range(SCALE_RANGE),
            sway_offset: rng.random_range(0.0..TAU),
            sway_amplitude: rng.random_range(AMPLITUDE_RANGE),
        };
        instances.push(ScatterInstance {
            node: posed_clone(template, &placement),
            placement,
        });
    }

    instances
}

/// Clones scattered through an axis-aligned volume, used for clouds
pub fn scatter_in_volume<R: Rng + ?Sized>(
    template: &SceneNode,
    x: Range<f32>,
    y: Range<f32>,
    z: Range<f32>,
    scale: Range<f32>,
    count: usize,
    rng: &mut R,
) -> Vec<ScatterInstance> {
    (0..count)
        .map(|_| {
            let placement = Placement {
                position: Vec3::new(
                    rng.random_range(x.clone()),
                    rng.random_range(y.clone()),
                    rng.random_range(z.clone()),
                ),
                yaw: rng.random_range(0.0..TAU),
                scale: rng.random_range(scale.clone()),
                sway_offset: 0.0,
                sway_amplitude: 0.0,
            };
            ScatterInstance {
                node: posed_clone(template, &placement),
                placement,
            }
        })
        .collect()
}

fn posed_clone(template: &SceneNode, placement: &Placement) -> SceneNode {
    let mut node = template.clone();
    node.transform = Transform {
        position: placement.position,
        rotation: Quat::from_rotation_y(placement.yaw),
        scale: Vec3::splat(placement.scale),
    };
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template() -> SceneNode {
        SceneNode::group("tree").with_child(SceneNode::group("crown"))
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(3);
        let placed = scatter(&template(), &[], &Transform::IDENTITY, 10, &mut rng);
        assert!(placed.is_empty());
    }

    #[test]
    fn test_never_exceeds_count_and_never_repeats() {
        let candidates: Vec<Vec3> = (0..100).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let placed = scatter(&template(), &candidates, &Transform::IDENTITY, 40, &mut rng);

        assert!(placed.len() <= 40);
        let xs: HashSet<i32> = placed.iter().map(|p| p.placement.position.x as i32).collect();
        assert_eq!(xs.len(), placed.len());
    }

    #[test]
    fn test_small_pool_is_exhausted_not_overfilled() {
        let candidates = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        let mut rng = StdRng::seed_from_u64(5);
        let placed = scatter(&template(), &candidates, &Transform::IDENTITY, 20, &mut rng);
        // With 50 draws per slot all three are found with overwhelming probability
        assert_eq!(placed.len(), 3);
    }

    #[test]
    fn test_placement_ranges_and_lift() {
        let candidates = vec![Vec3::new(1.0, 2.0, 3.0)];
        let mut rng = StdRng::seed_from_u64(9);
        let placed = scatter(&template(), &candidates, &Transform::IDENTITY, 1, &mut rng);
        let p = placed[0].placement;

        assert!((p.position - Vec3::new(1.0, 2.2, 3.0)).length() < 1e-5);
        assert!((0.0..TAU).contains(&p.yaw));
        assert!(SCALE_RANGE.contains(&p.scale));
        assert!(AMPLITUDE_RANGE.contains(&p.sway_amplitude));
        assert_eq!(placed[0].node.children.len(), 1);
        assert_eq!(placed[0].node.transform.scale, Vec3::splat(p.scale));
    }

    #[test]
    fn test_volume_scatter_stays_in_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let clouds = scatter_in_volume(
            &template(),
            -250.0..550.0,
            180.0..200.0,
            -250.0..550.0,
            1.0..1.8,
            13,
            &mut rng,
        );
        assert_eq!(clouds.len(), 13);
        for cloud in &clouds {
            let p = cloud.placement.position;
            assert!((180.0..200.0).contains(&p.y));
            assert!((-250.0..550.0).contains(&p.x) && (-250.0..550.0).contains(&p.z));
        }
    }
}
