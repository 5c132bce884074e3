use crate::error::{SceneError, SceneResult};
use crate::rendering::scene::{NodeContent, SceneNode, Transform};
use async_trait::async_trait;
use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// One node of a posed mesh asset as stored on disk
#[derive(Debug, Clone, Deserialize)]
struct PrefabNode {
    name: String,
    /// Mesh drawn by this node; a plain group when absent
    #[serde(default)]
    mesh: Option<String>,
    #[serde(default)]
    position: [f32; 3],
    /// Euler angles in radians, XYZ order
    #[serde(default)]
    rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    scale: [f32; 3],
    #[serde(default)]
    children: Vec<PrefabNode>,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl PrefabNode {
    fn into_scene_node(self) -> SceneNode {
        let content = match self.mesh {
            Some(mesh) => NodeContent::Model { mesh },
            None => NodeContent::Group,
        };
        let [rx, ry, rz] = self.rotation;
        let mut node = SceneNode::new(self.name, content).with_transform(Transform {
            position: Vec3::from_array(self.position),
            rotation: Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            scale: Vec3::from_array(self.scale),
        });
        node.children = self
            .children
            .into_iter()
            .map(PrefabNode::into_scene_node)
            .collect();
        node
    }
}

/// Parse a JSON prefab into a scene node hierarchy
pub fn parse_prefab(json: &str, path: &Path) -> SceneResult<SceneNode> {
    let root: PrefabNode = serde_json::from_str(json).map_err(|e| SceneError::Prefab {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(root.into_scene_node())
}

/// Loads template objects (trees, clouds) that get cloned into the scene
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefabLoader;

#[async_trait]
impl super::manager::AssetLoader<SceneNode> for PrefabLoader {
    async fn load(&self, path: &Path) -> SceneResult<SceneNode> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SceneError::AssetLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let node = parse_prefab(&json, path)?;
        info!("Loaded prefab {:?} ({} nodes)", path, node.node_count());
        Ok(node)
    }
}
