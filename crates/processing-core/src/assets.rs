//! Deduplicated registration of external media.
//!
//! Each distinct file is probed once per assembly run. Paths are keyed
//! by their canonical form, so `slides/../slides/1.png` and
//! `slides/1.png` share one handle. Later lookups return the cached
//! handle without touching the media again.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use recast_common::error::{RecastError, RecastResult};
use recast_project_model::composition::{Asset, AssetId, AssetInfo};
use recast_project_model::time::TimeNs;

/// Source of intrinsic media properties.
pub trait MediaProbe {
    /// Inspect the file at `path`. Failure aborts the assembly run.
    fn probe(&self, path: &Path) -> RecastResult<AssetInfo>;
}

/// Append-only path → asset cache for one assembly run.
pub struct AssetRegistry<'p> {
    probe: &'p dyn MediaProbe,
    index: HashMap<PathBuf, AssetId>,
    assets: Vec<Asset>,
}

impl<'p> AssetRegistry<'p> {
    pub fn new(probe: &'p dyn MediaProbe) -> Self {
        Self {
            probe,
            index: HashMap::new(),
            assets: Vec::new(),
        }
    }

    /// Get-or-insert the asset registered under `path`.
    pub fn get(&mut self, path: impl AsRef<Path>) -> RecastResult<&Asset> {
        let path = path.as_ref();
        let key = canonical_key(path);
        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => {
                let info = self.probe.probe(path)?;
                self.insert(key, path, info)
            }
        };
        Ok(&self.assets[id.0])
    }

    /// Get-or-insert an asset whose properties are already known, such as
    /// a freshly rendered composite frame.
    pub fn get_known(&mut self, path: impl AsRef<Path>, info: AssetInfo) -> &Asset {
        let path = path.as_ref();
        let key = canonical_key(path);
        let id = match self.index.get(&key) {
            Some(&id) => id,
            None => self.insert(key, path, info),
        };
        &self.assets[id.0]
    }

    /// The asset keeps the spelling it was first registered under.
    fn insert(&mut self, key: PathBuf, path: &Path, info: AssetInfo) -> AssetId {
        let id = AssetId(self.assets.len());
        tracing::debug!(asset = %id, path = %path.display(), "Registered asset");
        self.assets.push(Asset {
            id,
            path: path.to_path_buf(),
            info,
        });
        self.index.insert(key, id);
        id
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn into_assets(self) -> Vec<Asset> {
        self.assets
    }
}

/// Identity of a file path: the resolved path when the file exists,
/// otherwise the absolute path with `.` and `..` folded away.
pub fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return resolved;
    }
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Pixel size of a visual asset.
pub fn visual_dimensions(asset: &Asset) -> RecastResult<(u32, u32)> {
    asset.info.dimensions.ok_or_else(|| {
        RecastError::input(format!(
            "{} has no video stream to place",
            asset.path.display()
        ))
    })
}

/// Length of a time-based asset.
pub fn intrinsic_duration(asset: &Asset) -> RecastResult<TimeNs> {
    asset.info.duration.ok_or_else(|| {
        RecastError::input(format!("{} has no known duration", asset.path.display()))
    })
}

/// Probe answering from a fixed table, for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    entries: HashMap<PathBuf, AssetInfo>,
}

impl StaticProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, info: AssetInfo) {
        self.entries.insert(path.into(), info);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, info: AssetInfo) -> Self {
        self.insert(path, info);
        self
    }
}

impl MediaProbe for StaticProbe {
    fn probe(&self, path: &Path) -> RecastResult<AssetInfo> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| RecastError::FileNotFound {
                path: path.to_path_buf(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingProbe {
        calls: Cell<usize>,
    }

    impl MediaProbe for CountingProbe {
        fn probe(&self, _path: &Path) -> RecastResult<AssetInfo> {
            self.calls.set(self.calls.get() + 1);
            Ok(AssetInfo::image(800, 600))
        }
    }

    #[test]
    fn test_same_path_probed_once() {
        let probe = CountingProbe {
            calls: Cell::new(0),
        };
        let mut registry = AssetRegistry::new(&probe);

        let first = registry.get("slides/1.png").unwrap().id;
        let second = registry.get("slides/1.png").unwrap().id;
        let other = registry.get("slides/2.png").unwrap().id;

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(probe.calls.get(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_equivalent_spellings_share_one_asset() {
        let probe = CountingProbe {
            calls: Cell::new(0),
        };
        let mut registry = AssetRegistry::new(&probe);

        let plain = registry.get("slides/1.png").unwrap().id;
        let dotted = registry.get("./slides/1.png").unwrap().id;
        let detour = registry.get("slides/../slides/1.png").unwrap().id;
        let absolute = registry
            .get(std::env::current_dir().unwrap().join("slides/1.png"))
            .unwrap()
            .id;

        assert_eq!(plain, dotted);
        assert_eq!(plain, detour);
        assert_eq!(plain, absolute);
        assert_eq!(probe.calls.get(), 1);
        assert_eq!(registry.assets()[0].path, PathBuf::from("slides/1.png"));
    }

    #[test]
    fn test_canonical_key_resolves_existing_files() {
        let dir = std::env::temp_dir().join(format!("recast-assets-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("dot.svg"), "<svg/>").unwrap();

        assert_eq!(
            canonical_key(&dir.join("nested/../dot.svg")),
            canonical_key(&dir.join("dot.svg"))
        );
        assert_eq!(
            canonical_key(Path::new("/a/./b/../c.png")),
            PathBuf::from("/a/c.png")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_probe_failure_is_fatal() {
        let probe = StaticProbe::new();
        let mut registry = AssetRegistry::new(&probe);
        let err = registry.get("missing.webm").unwrap_err();
        assert!(matches!(err, RecastError::FileNotFound { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_known_assets_skip_probe() {
        let probe = CountingProbe {
            calls: Cell::new(0),
        };
        let mut registry = AssetRegistry::new(&probe);

        let id = registry
            .get_known("annotations-s1-0.svg", AssetInfo::image(1600, 1200))
            .id;
        assert_eq!(registry.get("annotations-s1-0.svg").unwrap().id, id);
        assert_eq!(
            registry.assets()[0].info.dimensions,
            Some((1600, 1200))
        );
        assert_eq!(probe.calls.get(), 0);
    }

    #[test]
    fn test_missing_properties_are_input_errors() {
        let audio_only = Asset {
            id: AssetId(0),
            path: PathBuf::from("voice.ogg"),
            info: AssetInfo::default(),
        };
        assert!(matches!(
            visual_dimensions(&audio_only),
            Err(RecastError::Input { .. })
        ));
        assert!(matches!(
            intrinsic_duration(&audio_only),
            Err(RecastError::Input { .. })
        ));
    }
}
