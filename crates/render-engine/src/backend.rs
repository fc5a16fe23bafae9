//! The boundary between assembly and a media-composition backend.

use std::path::PathBuf;

use recast_common::error::{RecastError, RecastResult};
use recast_project_model::composition::{Asset, Composition, Layer, PlacedClip};

/// Trait for composition backends (GES projects, render pipelines, etc.).
///
/// A backend receives one fully assembled composition: project metadata,
/// then each layer in priority order followed by that layer's clips.
pub trait CompositionBackend {
    /// Backend name.
    fn name(&self) -> &str;

    /// Start a project for `composition` (canvas size, caps, assets).
    fn begin(&mut self, composition: &Composition) -> RecastResult<()>;

    /// Create the track for `layer`; `priority` 0 is topmost.
    fn add_layer(&mut self, layer: &Layer, priority: usize) -> RecastResult<()>;

    /// Place one clip on the most recently added layer.
    fn place(&mut self, asset: &Asset, clip: &PlacedClip) -> RecastResult<()>;

    /// Finish and persist the project, returning where it was written.
    fn commit(&mut self) -> RecastResult<PathBuf>;
}

/// Hand `composition` to `backend` in layer-priority order.
pub fn emit(composition: &Composition, backend: &mut dyn CompositionBackend) -> RecastResult<PathBuf> {
    tracing::info!(
        backend = backend.name(),
        layers = composition.layers.len(),
        clips = composition.clip_count(),
        "Emitting composition"
    );

    // Resolve every asset before touching the backend.
    for clip in composition.layers.iter().flat_map(|layer| &layer.clips) {
        if composition.asset(clip.asset).is_none() {
            return Err(RecastError::backend(format!(
                "{} clip references unregistered {}",
                clip.layer, clip.asset
            )));
        }
    }

    backend.begin(composition)?;
    for (priority, layer) in composition.layers.iter().enumerate() {
        backend.add_layer(layer, priority)?;
        for clip in &layer.clips {
            let asset = composition.asset(clip.asset).ok_or_else(|| {
                RecastError::backend(format!("unregistered {}", clip.asset))
            })?;
            backend.place(asset, clip)?;
        }
    }
    backend.commit()
}
