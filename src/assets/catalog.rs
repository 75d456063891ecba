use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use rayon::prelude::*;

use crate::assets::media::{MediaAsset, MediaBackend};
use crate::foundation::core::{AssetId, IdGen};
use crate::foundation::error::{MontageError, MontageResult};
use crate::foundation::sync;

/// Registry of decodable media sources.
///
/// Probing runs outside the catalog lock, so registrations of independent locators proceed in
/// parallel and never block readers. An asset becomes visible to [`MediaCatalog::get`] only once
/// its registration has returned.
pub struct MediaCatalog {
    backend: Arc<dyn MediaBackend>,
    assets: RwLock<HashMap<AssetId, Arc<MediaAsset>>>,
    ids: IdGen,
}

impl MediaCatalog {
    /// Create an empty catalog probing through `backend`.
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            assets: RwLock::new(HashMap::new()),
            ids: IdGen::default(),
        }
    }

    /// Probe `locator` and register the resulting asset.
    ///
    /// Any probe failure is reported as [`MontageError::MediaUnreadable`]; other assets are
    /// unaffected.
    #[tracing::instrument(skip(self))]
    pub fn register(&self, locator: &str) -> MontageResult<AssetId> {
        if locator.trim().is_empty() {
            return Err(MontageError::media_unreadable(locator, "empty locator"));
        }
        let probe = self
            .backend
            .probe(locator)
            .and_then(|p| p.validate().map(|()| p))
            .map_err(|e| match e {
                MontageError::MediaUnreadable { .. } => e,
                other => MontageError::media_unreadable(locator, other.to_string()),
            })?;

        let id = AssetId(self.ids.next());
        let asset = Arc::new(MediaAsset::from_probe(id, locator, probe));
        tracing::debug!(
            %id,
            width = asset.resolution.width,
            height = asset.resolution.height,
            duration = asset.duration,
            "registered media"
        );
        sync::write(&self.assets).insert(id, asset);
        Ok(id)
    }

    /// Register several locators concurrently.
    ///
    /// Results are returned in input order; one failing locator does not affect the others.
    pub fn register_all<S>(&self, locators: &[S]) -> Vec<MontageResult<AssetId>>
    where
        S: AsRef<str> + Sync,
    {
        locators
            .par_iter()
            .map(|l| self.register(l.as_ref()))
            .collect()
    }

    /// Look up a registered asset.
    pub fn get(&self, id: AssetId) -> MontageResult<Arc<MediaAsset>> {
        sync::read(&self.assets)
            .get(&id)
            .cloned()
            .ok_or_else(|| MontageError::not_found(id))
    }

    /// `true` when `id` is registered.
    pub fn contains(&self, id: AssetId) -> bool {
        sync::read(&self.assets).contains_key(&id)
    }

    /// Number of registered assets.
    pub fn len(&self) -> usize {
        sync::read(&self.assets).len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered assets in id order.
    pub fn assets(&self) -> Vec<Arc<MediaAsset>> {
        let mut out: Vec<_> = sync::read(&self.assets).values().cloned().collect();
        out.sort_by_key(|a| a.id);
        out
    }

    /// Back end used for probing and decoding.
    pub fn backend(&self) -> Arc<dyn MediaBackend> {
        Arc::clone(&self.backend)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/catalog.rs"]
mod tests;
