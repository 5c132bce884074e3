pub mod graph;

pub use graph::{NodeId, SceneGraph, SceneSink};

use crate::utils::math::Color;
use crate::world::terrain::TerrainMesh;
use crate::world::water::WaterUniforms;
use glam::{Mat4, Quat, Vec3};
use std::sync::Arc;

/// Position, orientation and scale of a node relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::IDENTITY }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a point from this transform's local space into its parent space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * local)
    }
}

/// Shadow frustum carried on the sun for the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowFrustum {
    pub extent: f32,
    pub near: f32,
    pub far: f32,
    pub map_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional { target: Vec3, shadow: ShadowFrustum },
    Ambient,
    Point { range: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    pub kind: LightKind,
    pub color: Color,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperKind {
    DirectionalLight,
    ShadowCamera,
    PointLight,
}

/// What a node draws. The renderer owns GPU resources derived from this.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Group,
    /// Displaced heightfield; shared so the renderer can upload without copying
    Terrain(Arc<TerrainMesh>),
    /// Part of a posed mesh asset, identified by its source mesh name
    Model { mesh: String },
    /// Point cloud; the owning simulator republishes `positions` every tick
    Points { positions: Arc<[Vec3]>, size: f32, color: Color },
    Sphere { radius: f32, color: Color, emissive: Color },
    Disk { radius: f32, emissive: Color, emissive_intensity: f32 },
    Water(WaterUniforms),
    Fire { radius: f32, height: f32, particle_count: usize, time: f32 },
    Light(LightData),
    Helper(HelperKind),
}

/// A node in the retained scene, possibly with a child hierarchy
///
/// `Clone` is a deep clone of the whole hierarchy, which is what scatter
/// placement relies on.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub content: NodeContent,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, content: NodeContent) -> Self {
        Self {
            name: name.into(),
            transform: Transform::IDENTITY,
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            content,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeContent::Group)
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    /// Apply shadow flags to this node and every descendant
    pub fn set_shadows_recursive(&mut self, cast: bool, receive: bool) {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        for child in &mut self.children {
            child.set_shadows_recursive(cast, receive);
        }
    }

    /// Number of nodes in this hierarchy, including self
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }

    pub fn light(&self) -> Option<&LightData> {
        match &self.content {
            NodeContent::Light(light) => Some(light),
            _ => None,
        }
    }

    pub fn light_mut(&mut self) -> Option<&mut LightData> {
        match &mut self.content {
            NodeContent::Light(light) => Some(light),
            _ => None,
        }
    }
}
