use std::cell::RefCell;
use std::path::{Path, PathBuf};

use recast_common::config::AssemblyConfig;
use recast_common::error::RecastResult;
use recast_processing_core::assets::StaticProbe;
use recast_processing_core::timeline::{CompositeRenderer, TimelineBuilder};
use recast_project_model::composition::{AssetInfo, AudioFormat, Composition, Fraction, LayerKind};
use recast_project_model::session::{AnnotationShape, Session, SlideInfo};
use recast_project_model::time::SECOND;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-session")
}

fn load_fixture_session() -> Session {
    Session::load(fixture_dir()).expect("fixture session should load")
}

fn fixture_probe(session: &Session) -> StaticProbe {
    let mut webcam = AssetInfo::video(640, 480, 40 * SECOND);
    webcam.framerate = Some(Fraction { num: 15, den: 1 });
    webcam.audio = Some(AudioFormat {
        sample_rate: 48000,
        channels: 1,
    });

    StaticProbe::new()
        .with(session.resolve("video/webcams.webm"), webcam)
        .with(
            session.resolve("deskshare/deskshare.webm"),
            AssetInfo::video(1280, 720, 40 * SECOND),
        )
        .with(
            session.resolve("presentation/slide-1.png"),
            AssetInfo::image(1600, 1200),
        )
        .with(
            session.resolve("presentation/slide-2.png"),
            AssetInfo::image(1600, 1200),
        )
        .with(
            session.resolve("presentation/slide-3.png"),
            AssetInfo::image(1600, 1200),
        )
        .with("dot.svg", AssetInfo::image(16, 16))
}

#[derive(Default)]
struct StubRenderer {
    keys: RefCell<Vec<(String, usize, usize)>>,
}

impl CompositeRenderer for StubRenderer {
    fn render(
        &self,
        slide: &SlideInfo,
        _background: Option<&Path>,
        index: usize,
        shapes: &[&AnnotationShape],
    ) -> RecastResult<PathBuf> {
        self.keys
            .borrow_mut()
            .push((slide.id.clone(), index, shapes.len()));
        Ok(PathBuf::from("composites").join(format!("annotations-{}-{}.svg", slide.id, index)))
    }
}

fn assemble(config: AssemblyConfig, renderer: &StubRenderer) -> Composition {
    let session = load_fixture_session();
    let probe = fixture_probe(&session);
    TimelineBuilder::new(config, renderer)
        .expect("config should be valid")
        .with_cursor_dot("dot.svg")
        .build(&session, &probe)
        .expect("fixture should assemble")
}

fn full_config() -> AssemblyConfig {
    AssemblyConfig {
        annotations: true,
        ..AssemblyConfig::default()
    }
}

fn fnv1a_64(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in input.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn signature(composition: &Composition) -> String {
    composition
        .layers
        .iter()
        .flat_map(|layer| {
            layer.clips.iter().map(move |clip| {
                let file = composition
                    .asset(clip.asset)
                    .and_then(|asset| asset.path.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!(
                    "{}|{}|{}|{}|{}|{}|{}|{}|{}",
                    layer.name(),
                    clip.start,
                    clip.inpoint,
                    clip.duration,
                    clip.rect.x,
                    clip.rect.y,
                    clip.rect.width,
                    clip.rect.height,
                    file
                )
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn sample_session_signature_is_stable() {
    let renderer = StubRenderer::default();
    let composition = assemble(full_config(), &renderer);

    let kinds: Vec<_> = composition.layers.iter().map(|layer| layer.kind).collect();
    assert_eq!(
        kinds,
        vec![
            LayerKind::Camera,
            LayerKind::Cursor,
            LayerKind::Annotations,
            LayerKind::Slides,
            LayerKind::Deskshare,
        ]
    );

    assert_eq!(composition.name.as_deref(), Some("Quarterly Planning"));
    assert_eq!(composition.duration, 40 * SECOND);
    assert_eq!(composition.framerate, Some(Fraction { num: 15, den: 1 }));
    assert_eq!(composition.clip_count(), 13);
    assert_eq!(fnv1a_64(&signature(&composition)), 0x9a4637e2a9cd4ded);
}

#[test]
fn sample_session_respects_clip_invariants() {
    let renderer = StubRenderer::default();
    let composition = assemble(full_config(), &renderer);
    let canvas = composition.canvas();

    for layer in &composition.layers {
        assert!(layer.is_disjoint(), "{} layer overlaps", layer.name());
        for clip in &layer.clips {
            assert!(clip.duration > 0);
            assert!(clip.start >= 0);
            assert!(clip.rect.is_within(&canvas));
            assert!(composition.asset(clip.asset).is_some());
        }
    }
}

#[test]
fn sample_session_composites_are_keyed_deterministically() {
    let first = StubRenderer::default();
    assemble(full_config(), &first);
    let second = StubRenderer::default();
    assemble(full_config(), &second);

    let keys = first.keys.borrow().clone();
    assert_eq!(
        keys,
        vec![
            ("image1".to_string(), 0, 1),
            ("image1".to_string(), 1, 2),
            ("image1".to_string(), 2, 1),
            ("image4".to_string(), 0, 1),
        ]
    );
    assert_eq!(keys, *second.keys.borrow());
}

#[test]
fn trimmed_window_rebases_every_layer() {
    let renderer = StubRenderer::default();
    let composition = assemble(
        AssemblyConfig {
            start_secs: 5.0,
            end_secs: Some(15.0),
            ..full_config()
        },
        &renderer,
    );
    assert_eq!(composition.duration, 10 * SECOND);

    let camera = &composition.layer(LayerKind::Camera).unwrap().clips[0];
    assert_eq!(
        (camera.start, camera.inpoint, camera.duration),
        (0, 5 * SECOND, 10 * SECOND)
    );

    let slides = &composition.layer(LayerKind::Slides).unwrap().clips;
    let timings: Vec<_> = slides.iter().map(|c| (c.start, c.duration)).collect();
    assert_eq!(timings, vec![(0, 7 * SECOND), (7 * SECOND, 3 * SECOND)]);

    // screen share starts after the window
    assert!(composition.layer(LayerKind::Deskshare).is_none());

    let cursor = &composition.layer(LayerKind::Cursor).unwrap().clips;
    let timings: Vec<_> = cursor.iter().map(|c| (c.start, c.duration)).collect();
    assert_eq!(timings, vec![(0, 3 * SECOND), (8 * SECOND, 2 * SECOND)]);

    // spans keep their whole-slide numbering; the one before the window is skipped
    assert_eq!(
        *renderer.keys.borrow(),
        vec![("image1".to_string(), 1, 2), ("image1".to_string(), 2, 1)]
    );

    let mut referenced: Vec<_> = composition
        .layers
        .iter()
        .flat_map(|layer| &layer.clips)
        .map(|clip| clip.asset)
        .collect();
    referenced.sort();
    referenced.dedup();
    assert_eq!(referenced.len(), composition.assets.len());
    assert!(composition
        .assets
        .iter()
        .all(|asset| !asset.path.ends_with("deskshare.webm")));
}

#[test]
fn disabling_optional_layers() {
    let renderer = StubRenderer::default();
    let composition = assemble(
        AssemblyConfig {
            annotations: false,
            cursor: false,
            ..AssemblyConfig::default()
        },
        &renderer,
    );

    assert!(composition.layer(LayerKind::Annotations).is_none());
    assert!(composition.layer(LayerKind::Cursor).is_none());
    assert!(renderer.keys.borrow().is_empty());
    assert_eq!(composition.layers.len(), 3);
}
