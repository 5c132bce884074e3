use super::cache::AssetCache;
use super::mesh::PrefabLoader;
use super::texture::HeightMapLoader;
use crate::error::SceneResult;
use crate::rendering::scene::SceneNode;
use crate::world::heightfield::HeightField;
use async_trait::async_trait;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

#[async_trait]
pub trait AssetLoader<A>: Send + Sync {
    async fn load(&self, path: &Path) -> SceneResult<A>;
}

/// What a completed load is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetSlot {
    HeightMap,
    TreeTemplate,
    CloudTemplate,
}

#[derive(Debug, Clone)]
pub enum LoadedAsset {
    HeightMap(Arc<HeightField>),
    Prefab(SceneNode),
}

/// Completion of one load, delivered on the frame thread
#[derive(Debug)]
pub struct AssetEvent {
    pub slot: AssetSlot,
    pub path: PathBuf,
    pub result: SceneResult<LoadedAsset>,
}

/// Starts loads on the async runtime and hands results back by channel
///
/// Nothing blocks waiting for a load: the frame loop calls [`drain`] and
/// runs the dependent step for each completion it receives. There is no
/// cancellation; a load always completes and is reported.
///
/// [`drain`]: AssetManager::drain
pub struct AssetManager {
    runtime: Handle,
    tx: Sender<AssetEvent>,
    rx: Receiver<AssetEvent>,
    pending: usize,
    height_maps: AssetCache<PathBuf, Arc<HeightField>>,
    prefabs: AssetCache<PathBuf, SceneNode>,
}

impl AssetManager {
    pub fn new(runtime: Handle) -> Self {
        let (tx, rx) = unbounded();
        Self {
            runtime,
            tx,
            rx,
            pending: 0,
            height_maps: AssetCache::new(),
            prefabs: AssetCache::new(),
        }
    }

    pub fn load_height_map(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(field) = self.height_maps.fetch(&path) {
            self.complete_now(AssetSlot::HeightMap, path, LoadedAsset::HeightMap(field));
            return;
        }
        self.spawn(AssetSlot::HeightMap, path, HeightMapLoader::new(), LoadedAsset::HeightMap);
    }

    pub fn load_prefab(&mut self, slot: AssetSlot, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(node) = self.prefabs.fetch(&path) {
            self.complete_now(slot, path, LoadedAsset::Prefab(node));
            return;
        }
        self.spawn(slot, path, PrefabLoader, LoadedAsset::Prefab);
    }

    /// Run `loader` for `path` on the runtime
    pub fn spawn<A, L>(&mut self, slot: AssetSlot, path: PathBuf, loader: L, wrap: fn(A) -> LoadedAsset)
    where
        A: Send + 'static,
        L: AssetLoader<A> + 'static,
    {
        debug!("Loading {:?} for {:?}", path, slot);
        let tx = self.tx.clone();
        self.pending += 1;
        self.runtime.spawn(async move {
            let result = loader.load(&path).await.map(wrap);
            // The receiver only goes away with the manager
            let _ = tx.send(AssetEvent { slot, path, result });
        });
    }

    fn complete_now(&mut self, slot: AssetSlot, path: PathBuf, asset: LoadedAsset) {
        debug!("Serving {:?} from cache", path);
        self.pending += 1;
        let _ = self.tx.send(AssetEvent {
            slot,
            path,
            result: Ok(asset),
        });
    }

    /// Every completion received so far, in arrival order
    pub fn drain(&mut self) -> Vec<AssetEvent> {
        let events: Vec<AssetEvent> = self.rx.try_iter().collect();
        for event in &events {
            self.record(event);
        }
        events
    }

    /// Block the calling thread for the next completion; for tools and tests
    pub fn wait_next(&mut self, timeout: Duration) -> Option<AssetEvent> {
        let event = self.rx.recv_timeout(timeout).ok()?;
        self.record(&event);
        Some(event)
    }

    fn record(&mut self, event: &AssetEvent) {
        self.pending = self.pending.saturating_sub(1);
        match &event.result {
            Ok(LoadedAsset::HeightMap(field)) => {
                self.height_maps.store(event.path.clone(), Arc::clone(field));
            }
            Ok(LoadedAsset::Prefab(node)) => {
                self.prefabs.store(event.path.clone(), node.clone());
            }
            // Reported once, by whoever applies the event
            Err(_) => debug!("Load for {:?} finished with an error", event.slot),
        }
    }

    /// Loads started but not yet drained
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn cached_count(&self) -> usize {
        self.height_maps.len() + self.prefabs.len()
    }

    /// Requests answered from the cache
    pub fn cache_hits(&self) -> usize {
        self.height_maps.stats().0 + self.prefabs.stats().0
    }
}
