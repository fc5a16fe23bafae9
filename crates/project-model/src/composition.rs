//! The assembled output: layers of placed clips over registered assets.
//!
//! A [`Composition`] is handed once to a backend, which creates one track
//! per [`Layer`] (in priority order, topmost first) and places each clip.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::time::TimeNs;

/// Stable handle to an asset registered for one assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub usize);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// A rational frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub num: u32,
    pub den: u32,
}

/// Audio stream format of a time-based asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u32,
}

/// Intrinsic properties of a media file, as reported by a probe.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Pixel dimensions; `None` for non-visual media.
    pub dimensions: Option<(u32, u32)>,

    /// Intrinsic length; `None` for still images.
    pub duration: Option<TimeNs>,

    /// Whether the asset is a still image (no meaningful in-point).
    pub still_image: bool,

    /// Video frame rate, if any.
    #[serde(default)]
    pub framerate: Option<Fraction>,

    /// First audio stream, if any.
    #[serde(default)]
    pub audio: Option<AudioFormat>,
}

impl AssetInfo {
    /// A still image of the given size.
    pub fn image(width: u32, height: u32) -> Self {
        Self {
            dimensions: Some((width, height)),
            duration: None,
            still_image: true,
            framerate: None,
            audio: None,
        }
    }

    /// A video of the given size and length.
    pub fn video(width: u32, height: u32, duration: TimeNs) -> Self {
        Self {
            dimensions: Some((width, height)),
            duration: Some(duration),
            still_image: false,
            framerate: None,
            audio: None,
        }
    }
}

/// A registered external media reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    /// Path the asset was registered under (its identity).
    pub path: PathBuf,

    pub info: AssetInfo,
}

/// Destination rectangle in output pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }

    /// Whether this rectangle lies entirely inside `canvas`.
    pub fn is_within(&self, canvas: &Rect) -> bool {
        self.x >= canvas.x
            && self.y >= canvas.y
            && self.right() <= canvas.right()
            && self.bottom() <= canvas.bottom()
    }

    /// Shift this rectangle so it lies inside `canvas`, keeping its size.
    /// A rectangle larger than the canvas is pinned to the canvas origin.
    pub fn clamped_within(&self, canvas: &Rect) -> Rect {
        let max_x = (canvas.right() - self.width as i64).max(canvas.x);
        let max_y = (canvas.bottom() - self.height as i64).max(canvas.y);
        Rect {
            x: self.x.clamp(canvas.x, max_x),
            y: self.y.clamp(canvas.y, max_y),
            ..*self
        }
    }
}

/// The tracks of a composition, in priority order (topmost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Credits,
    Camera,
    Cursor,
    Annotations,
    Slides,
    Deskshare,
    Backdrop,
}

impl LayerKind {
    /// Track name written to the project.
    pub fn name(self) -> &'static str {
        match self {
            Self::Credits => "Credits",
            Self::Camera => "Camera",
            Self::Cursor => "Cursor",
            Self::Annotations => "Annotations",
            Self::Slides => "Slides",
            Self::Deskshare => "Deskshare",
            Self::Backdrop => "Backdrop",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-clip effects understood by backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipEffect {
    /// Crop the source to the given aspect ratio.
    AspectRatioCrop { num: u32, den: u32 },
}

/// A resolved clip placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedClip {
    pub asset: AssetId,
    pub layer: LayerKind,

    /// Position on the output timeline (already re-based).
    pub start: TimeNs,

    /// Offset into the asset's own timeline.
    pub inpoint: TimeNs,

    /// Always positive.
    pub duration: TimeNs,

    pub rect: Rect,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<ClipEffect>,
}

impl PlacedClip {
    pub fn end(&self) -> TimeNs {
        self.start + self.duration
    }
}

/// One track of non-overlapping clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub kind: LayerKind,
    pub clips: Vec<PlacedClip>,
}

impl Layer {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            clips: vec![],
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Whether clips are in temporal order and never overlap.
    pub fn is_disjoint(&self) -> bool {
        self.clips
            .windows(2)
            .all(|pair| pair[0].end() <= pair[1].start)
    }

    /// End of the last clip, or zero for an empty layer.
    pub fn end(&self) -> TimeNs {
        self.clips.iter().map(PlacedClip::end).max().unwrap_or(0)
    }
}

/// The complete assembled project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Display name of the session.
    pub name: Option<String>,

    /// Creation timestamp (ISO 8601).
    pub created_at: String,

    /// Output canvas size.
    pub width: u32,
    pub height: u32,

    /// Output frame rate, taken from the camera recording when known.
    pub framerate: Option<Fraction>,

    /// Output audio format, taken from the camera recording when known.
    pub audio: Option<AudioFormat>,

    /// Total length: opening credits, visible window, closing credits.
    pub duration: TimeNs,

    /// Layers in priority order, topmost first.
    pub layers: Vec<Layer>,

    /// Every asset referenced by a clip, indexed by [`AssetId`].
    pub assets: Vec<Asset>,
}

impl Composition {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            name: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            width,
            height,
            framerate: None,
            audio: None,
            duration: 0,
            layers: vec![],
            assets: vec![],
        }
    }

    /// The full output canvas.
    pub fn canvas(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.0).filter(|asset| asset.id == id)
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }

    pub fn clip_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.clips.len()).sum()
    }

    /// Drop assets no clip refers to, renumbering the rest in order.
    /// Returns how many were dropped.
    pub fn prune_unused_assets(&mut self) -> usize {
        let mut used = vec![false; self.assets.len()];
        for clip in self.layers.iter().flat_map(|layer| &layer.clips) {
            if let Some(flag) = used.get_mut(clip.asset.0) {
                *flag = true;
            }
        }

        let mut remap: Vec<Option<AssetId>> = vec![None; self.assets.len()];
        let mut kept = Vec::with_capacity(self.assets.len());
        for (position, asset) in std::mem::take(&mut self.assets).into_iter().enumerate() {
            if used[position] {
                let id = AssetId(kept.len());
                remap[position] = Some(id);
                kept.push(Asset { id, ..asset });
            }
        }

        for clip in self.layers.iter_mut().flat_map(|layer| layer.clips.iter_mut()) {
            if let Some(Some(id)) = remap.get(clip.asset.0) {
                clip.asset = *id;
            }
        }

        let dropped = used.len() - kept.len();
        self.assets = kept;
        dropped
    }
}
