use crate::config::TerrainSettings;
use crate::error::{SceneError, SceneResult};
use crate::rendering::scene::{NodeContent, NodeId, SceneNode, SceneSink, Transform};
use crate::utils::math::Color;
use crate::world::heightfield::HeightField;
use crate::world::scatter::{self, Placement};
use crate::world::sway;
use crate::world::wind::WindField;
use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TERRAIN_NODE_NAME: &str = "terrain";
pub const TREE_NODE_NAME: &str = "tree";

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    /// Local position; `z` is the displaced height
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl TerrainVertex {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn color(&self) -> Color {
        Color::new(self.color[0], self.color[1], self.color[2])
    }
}

/// Height band a vertex falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Low,
    Mid,
    High,
}

impl Band {
    /// Classify a normalized height against two thresholds.
    ///
    /// The thresholds are not checked for ordering: with `mid >= high` the
    /// mid band is unreachable. A NaN height (zero height scale) lands in
    /// `High` because both comparisons fail.
    pub fn classify(h: f32, threshold_mid: f32, threshold_high: f32) -> Band {
        if h < threshold_mid {
            Band::Low
        } else if h < threshold_high {
            Band::Mid
        } else {
            Band::High
        }
    }

    pub fn color(self, settings: &TerrainSettings) -> Color {
        match self {
            Band::Low => settings.color_low,
            Band::Mid => settings.color_mid,
            Band::High => settings.color_high,
        }
    }
}

/// `clamp((z - bias) / scale, 0, 1)`
pub fn normalized_height(z: f32, scale: f32, bias: f32) -> f32 {
    ((z - bias) / scale).clamp(0.0, 1.0)
}

/// Displaced, colored grid mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainMesh {
    pub segments: u32,
    pub width: f32,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    pub bands: Vec<Band>,
}

impl TerrainMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn band_count(&self, band: Band) -> usize {
        self.bands.iter().filter(|b| **b == band).count()
    }
}

/// Build a terrain mesh from a height field
///
/// The grid spans `width × width` with `(segments + 1)²` vertices laid out
/// row by row starting at the `+y` edge. Every vertex is a pure function of
/// its index, so the displacement pass runs in parallel and stays
/// deterministic.
pub fn build(field: &HeightField, settings: &TerrainSettings) -> TerrainMesh {
    let segments = settings.vertices_per_edge.max(1);
    let stride = segments as usize + 1;
    let half = settings.width / 2.0;
    let segment_size = settings.width / segments as f32;

    let (vertices, bands): (Vec<TerrainVertex>, Vec<Band>) = (0..stride * stride)
        .into_par_iter()
        .map(|i| {
            let ix = (i % stride) as f32;
            let iy = (i / stride) as f32;
            let u = ix / segments as f32;
            let v = 1.0 - iy / segments as f32;

            let grey = field.sample(u, v);
            let z = grey * settings.height_scale + settings.height_bias;
            let h = normalized_height(z, settings.height_scale, settings.height_bias);
            let band = Band::classify(h, settings.threshold_mid, settings.threshold_high);

            let vertex = TerrainVertex {
                position: [ix * segment_size - half, half - iy * segment_size, z],
                normal: [0.0, 0.0, 1.0],
                uv: [u, v],
                color: band.color(settings).to_array(),
            };
            (vertex, band)
        })
        .unzip();

    let mut indices = Vec::with_capacity(segments as usize * segments as usize * 6);
    for iy in 0..segments {
        for ix in 0..segments {
            let a = ix + (segments + 1) * iy;
            let b = ix + (segments + 1) * (iy + 1);
            let c = (ix + 1) + (segments + 1) * (iy + 1);
            let d = (ix + 1) + (segments + 1) * iy;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    let mut mesh = TerrainMesh {
        segments,
        width: settings.width,
        vertices,
        indices,
        bands,
    };
    compute_smooth_normals(&mut mesh);
    mesh
}

/// Area-weighted vertex normals from the displaced positions
fn compute_smooth_normals(mesh: &mut TerrainMesh) {
    let mut accum = vec![Vec3::ZERO; mesh.vertices.len()];
    for tri in mesh.indices.chunks_exact(3) {
        let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let a = mesh.vertices[ia].position();
        let b = mesh.vertices[ib].position();
        let c = mesh.vertices[ic].position();
        let face = (c - b).cross(a - b);
        accum[ia] += face;
        accum[ib] += face;
        accum[ic] += face;
    }

    mesh.vertices
        .par_iter_mut()
        .zip(accum.par_iter())
        .for_each(|(vertex, n)| {
            vertex.normal = n.normalize_or(Vec3::Z).to_array();
        });
}

/// A placed tree attached to the scene
#[derive(Debug, Clone, PartialEq)]
pub struct TreeInstance {
    pub node: NodeId,
    pub placement: Placement,
}

#[derive(Debug)]
struct InstalledTerrain {
    node: NodeId,
    mesh: Arc<TerrainMesh>,
}

/// Owns the terrain node and the trees scattered on it
///
/// A rebuild removes every tree and the previous terrain node before the new
/// mesh is attached, so repeated edits never accumulate nodes or meshes.
pub struct TerrainManager {
    settings: TerrainSettings,
    height_field: Option<Arc<HeightField>>,
    tree_template: Option<SceneNode>,
    installed: Option<InstalledTerrain>,
    trees: Vec<TreeInstance>,
    generation: u64,
    rng: StdRng,
}

impl TerrainManager {
    pub fn new(settings: TerrainSettings, rng: StdRng) -> Self {
        Self {
            settings,
            height_field: None,
            tree_template: None,
            installed: None,
            trees: Vec::new(),
            generation: 0,
            rng,
        }
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut TerrainSettings {
        &mut self.settings
    }

    pub fn set_settings(&mut self, settings: TerrainSettings) {
        self.settings = settings;
    }

    pub fn has_height_field(&self) -> bool {
        self.height_field.is_some()
    }

    pub fn set_height_field(&mut self, field: Arc<HeightField>) {
        self.height_field = Some(field);
    }

    /// Transform from terrain-local space to world space: the grid lies in
    /// the local XY plane and is tilted so that local `z` becomes world up.
    pub fn transform() -> Transform {
        Transform {
            rotation: Quat::from_rotation_x(-FRAC_PI_2),
            ..Transform::IDENTITY
        }
    }

    /// Build a mesh from the current settings without touching the scene
    pub fn build_mesh(&self) -> SceneResult<TerrainMesh> {
        let field = self
            .height_field
            .as_ref()
            .ok_or(SceneError::NotReady { what: "height map" })?;
        Ok(build(field, &self.settings))
    }

    /// Replace the installed terrain with `mesh` and rescatter trees
    pub fn install(&mut self, mesh: TerrainMesh, sink: &mut dyn SceneSink) {
        self.clear_trees(sink);
        if let Some(old) = self.installed.take() {
            // Dropping the removed node releases the last handle to its mesh
            drop(sink.remove(old.node));
        }

        let mesh = Arc::new(mesh);
        let node = SceneNode::new(TERRAIN_NODE_NAME, NodeContent::Terrain(Arc::clone(&mesh)))
            .with_transform(Self::transform())
            .with_shadows(true, true);
        let id = sink.add(node);
        self.installed = Some(InstalledTerrain { node: id, mesh });
        self.generation += 1;

        info!(
            "Terrain generation {} installed: {} vertices",
            self.generation,
            self.installed.as_ref().map_or(0, |t| t.mesh.vertex_count())
        );

        if self.tree_template.is_some() {
            self.scatter_trees(sink);
        }
    }

    /// Build and install in one step on the calling thread's rayon pool
    pub fn rebuild(&mut self, sink: &mut dyn SceneSink) -> SceneResult<()> {
        let mesh = self.build_mesh()?;
        self.install(mesh, sink);
        Ok(())
    }

    /// Register the tree template; trees are scattered onto the current
    /// terrain immediately if one is installed.
    pub fn set_tree_template(&mut self, mut template: SceneNode, sink: &mut dyn SceneSink) {
        template.set_shadows_recursive(true, true);
        self.tree_template = Some(template);
        if self.installed.is_some() {
            self.scatter_trees(sink);
        }
    }

    fn scatter_trees(&mut self, sink: &mut dyn SceneSink) {
        self.clear_trees(sink);
        let (Some(template), Some(installed)) = (&self.tree_template, &self.installed) else {
            return;
        };

        let candidates = scatter::extract_candidates(
            &installed.mesh,
            self.settings.color_mid,
            scatter::COLOR_TOLERANCE,
        );
        debug!("Tree candidates on mid band: {}", candidates.len());
        if candidates.is_empty() {
            warn!("No mid-band vertices to place trees on");
            return;
        }

        let placed = scatter::scatter(
            template,
            &candidates,
            &Self::transform(),
            self.settings.tree_count,
            &mut self.rng,
        );

        for instance in placed {
            let mut node = instance.node;
            node.name = TREE_NODE_NAME.to_string();
            let id = sink.add(node);
            self.trees.push(TreeInstance {
                node: id,
                placement: instance.placement,
            });
        }
        info!(
            "Scattered {} of {} trees on generation {}",
            self.trees.len(),
            self.settings.tree_count,
            self.generation
        );
    }

    fn clear_trees(&mut self, sink: &mut dyn SceneSink) {
        for tree in self.trees.drain(..) {
            sink.remove(tree.node);
        }
    }

    /// Apply the wind sway to every tree
    pub fn animate_trees(&self, elapsed_seconds: f32, wind: &WindField, sink: &mut dyn SceneSink) {
        for tree in &self.trees {
            if let Some(node) = sink.node_mut(tree.node) {
                node.transform.rotation =
                    sway::rotation(elapsed_seconds, wind, &tree.placement);
            }
        }
    }

    pub fn teardown(&mut self, sink: &mut dyn SceneSink) {
        self.clear_trees(sink);
        if let Some(old) = self.installed.take() {
            sink.remove(old.node);
        }
    }

    pub fn mesh(&self) -> Option<&Arc<TerrainMesh>> {
        self.installed.as_ref().map(|t| &t.mesh)
    }

    pub fn node(&self) -> Option<NodeId> {
        self.installed.as_ref().map(|t| t.node)
    }

    pub fn trees(&self) -> &[TreeInstance] {
        &self.trees
    }

    /// Number of terrains installed so far; 0 until the first build
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
