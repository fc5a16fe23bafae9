//! GStreamer Editing Services project (`.xges`) writer.
//!
//! The written project opens in Pitivi and renders with `ges-launch-1.0
//! --load`. One video and one audio track carry restriction caps taken
//! from the composition; every composition layer becomes a GES layer
//! named through its `video::name` metadata.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::writer::Writer;

use recast_common::error::{RecastError, RecastResult};
use recast_processing_core::assets::canonical_key;
use recast_project_model::composition::{Asset, ClipEffect, Composition, Layer, PlacedClip};
use recast_project_model::time::TimeNs;

use crate::backend::CompositionBackend;

const TRACK_AUDIO: u32 = 2;
const TRACK_VIDEO: u32 = 4;
const VIDEO_TRACK_ID: u32 = 0;
const AUDIO_TRACK_ID: u32 = 1;

#[derive(Debug, Clone)]
struct Resource {
    uri: String,
    track_types: u32,
    duration: Option<TimeNs>,
    still_image: bool,
}

#[derive(Debug, Clone)]
struct ProjectHeader {
    name: Option<String>,
    video_caps: String,
    audio_caps: Option<String>,
    duration: TimeNs,
    resources: Vec<Resource>,
}

#[derive(Debug, Clone)]
struct XgesClip {
    resource: usize,
    clip: PlacedClip,
}

#[derive(Debug, Clone)]
struct XgesLayer {
    name: &'static str,
    priority: usize,
    clips: Vec<XgesClip>,
}

/// Collects a composition and writes it out as a `.xges` document on commit.
#[derive(Debug)]
pub struct XgesBackend {
    output: PathBuf,
    header: Option<ProjectHeader>,
    layers: Vec<XgesLayer>,
}

impl XgesBackend {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            header: None,
            layers: vec![],
        }
    }

    /// Serialize the collected project.
    fn to_document(&self) -> RecastResult<Vec<u8>> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| RecastError::backend("xges project committed before begin"))?;

        let mut doc = XmlDoc::new();
        doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        doc.open(element("ges", &[("version", "0.7")]))?;

        let project_meta = match &header.name {
            Some(name) => format!("metadatas, name=(string){};", gst_quote(name)),
            None => "metadatas;".to_string(),
        };
        doc.open(element(
            "project",
            &[("properties", "properties;"), ("metadatas", project_meta.as_str())],
        ))?;

        doc.open(element("ressources", &[]))?;
        for resource in &header.resources {
            let mut properties = format!(
                "properties, supported-formats=(int){}",
                resource.track_types
            );
            if let Some(duration) = resource.duration {
                properties.push_str(&format!(", duration=(guint64){duration}"));
            }
            properties.push(';');
            doc.empty(element(
                "asset",
                &[
                    ("id", resource.uri.as_str()),
                    ("extractable-type-name", "GESUriClip"),
                    ("properties", properties.as_str()),
                    ("metadatas", "metadatas;"),
                ],
            ))?;
        }
        doc.close("ressources")?;

        let timeline_meta = format!("metadatas, duration=(guint64){};", header.duration);
        doc.open(element(
            "timeline",
            &[
                (
                    "properties",
                    "properties, auto-transition=(boolean)false, snapping-distance=(guint64)0;",
                ),
                ("metadatas", timeline_meta.as_str()),
            ],
        ))?;

        let video_track = format!(
            "properties, restriction-caps=(string){};",
            gst_quote(&header.video_caps)
        );
        doc.empty(element(
            "track",
            &[
                ("caps", "video/x-raw(ANY)"),
                ("track-type", TRACK_VIDEO.to_string().as_str()),
                ("track-id", VIDEO_TRACK_ID.to_string().as_str()),
                ("properties", video_track.as_str()),
                ("metadatas", "metadatas;"),
            ],
        ))?;

        let audio_track = match &header.audio_caps {
            Some(caps) => format!("properties, restriction-caps=(string){};", gst_quote(caps)),
            None => "properties;".to_string(),
        };
        doc.empty(element(
            "track",
            &[
                ("caps", "audio/x-raw(ANY)"),
                ("track-type", TRACK_AUDIO.to_string().as_str()),
                ("track-id", AUDIO_TRACK_ID.to_string().as_str()),
                ("properties", audio_track.as_str()),
                ("metadatas", "metadatas;"),
            ],
        ))?;

        let mut clip_id = 0usize;
        for layer in &self.layers {
            let layer_meta = format!(
                "metadatas, volume=(float)1, video::name=(string){};",
                layer.name
            );
            doc.open(element(
                "layer",
                &[
                    ("priority", layer.priority.to_string().as_str()),
                    ("properties", "properties, auto-transition=(boolean)false;"),
                    ("metadatas", layer_meta.as_str()),
                ],
            ))?;

            for entry in &layer.clips {
                let resource = &header.resources[entry.resource];
                write_clip(&mut doc, clip_id, layer.priority, resource, &entry.clip)?;
                clip_id += 1;
            }
            doc.close("layer")?;
        }

        doc.open(element("groups", &[]))?;
        doc.close("groups")?;
        doc.close("timeline")?;
        doc.close("project")?;
        doc.close("ges")?;
        Ok(doc.finish())
    }
}

impl CompositionBackend for XgesBackend {
    fn name(&self) -> &str {
        "xges"
    }

    fn begin(&mut self, composition: &Composition) -> RecastResult<()> {
        let mut video_caps = format!(
            "video/x-raw(ANY), width=(int){}, height=(int){}",
            composition.width, composition.height
        );
        if let Some(rate) = composition.framerate {
            video_caps.push_str(&format!(", framerate=(fraction){}/{}", rate.num, rate.den));
        }
        let audio_caps = composition.audio.map(|audio| {
            format!(
                "audio/x-raw(ANY), rate=(int){}, channels=(int){}",
                audio.sample_rate, audio.channels
            )
        });

        let resources = composition
            .assets
            .iter()
            .map(|asset| Resource {
                uri: file_uri(&asset.path),
                track_types: track_types(asset),
                duration: asset.info.duration,
                still_image: asset.info.still_image,
            })
            .collect();

        self.header = Some(ProjectHeader {
            name: composition.name.clone(),
            video_caps,
            audio_caps,
            duration: composition.duration,
            resources,
        });
        self.layers.clear();
        Ok(())
    }

    fn add_layer(&mut self, layer: &Layer, priority: usize) -> RecastResult<()> {
        self.layers.push(XgesLayer {
            name: layer.name(),
            priority,
            clips: vec![],
        });
        Ok(())
    }

    fn place(&mut self, asset: &Asset, clip: &PlacedClip) -> RecastResult<()> {
        let resources = self
            .header
            .as_ref()
            .map(|header| header.resources.len())
            .ok_or_else(|| RecastError::backend("clip placed before begin"))?;
        if asset.id.0 >= resources {
            return Err(RecastError::backend(format!(
                "{} is not part of the project",
                asset.id
            )));
        }
        let layer = self
            .layers
            .last_mut()
            .ok_or_else(|| RecastError::backend("clip placed before any layer"))?;
        layer.clips.push(XgesClip {
            resource: asset.id.0,
            clip: clip.clone(),
        });
        Ok(())
    }

    fn commit(&mut self) -> RecastResult<PathBuf> {
        let document = self.to_document()?;
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.output, document)?;

        tracing::info!(
            path = %self.output.display(),
            layers = self.layers.len(),
            "Wrote GES project"
        );
        Ok(self.output.clone())
    }
}

fn write_clip(
    doc: &mut XmlDoc,
    id: usize,
    priority: usize,
    resource: &Resource,
    clip: &PlacedClip,
) -> RecastResult<()> {
    let properties = format!(
        "properties, name=(string)uriclip{id}, mute=(boolean)false, is-image=(boolean){};",
        resource.still_image
    );
    doc.open(element(
        "clip",
        &[
            ("id", id.to_string().as_str()),
            ("asset-id", resource.uri.as_str()),
            ("type-name", "GESUriClip"),
            ("layer-priority", priority.to_string().as_str()),
            ("track-types", resource.track_types.to_string().as_str()),
            ("start", clip.start.to_string().as_str()),
            ("duration", clip.duration.to_string().as_str()),
            ("inpoint", clip.inpoint.to_string().as_str()),
            ("rate", "0"),
            ("properties", properties.as_str()),
            ("metadatas", "metadatas;"),
        ],
    ))?;

    for effect in &clip.effects {
        match effect {
            ClipEffect::AspectRatioCrop { num, den } => {
                let description = format!("aspectratiocrop aspect-ratio={num}/{den}");
                let children = format!("properties, aspect-ratio=(fraction){num}/{den};");
                doc.empty(element(
                    "effect",
                    &[
                        ("asset-id", description.as_str()),
                        ("clip-id", id.to_string().as_str()),
                        ("type-name", "GESEffect"),
                        ("track-type", TRACK_VIDEO.to_string().as_str()),
                        ("track-id", VIDEO_TRACK_ID.to_string().as_str()),
                        ("properties", "properties, active=(boolean)true;"),
                        ("metadatas", "metadatas;"),
                        ("children-properties", children.as_str()),
                    ],
                ))?;
            }
        }
    }

    if resource.track_types & TRACK_VIDEO != 0 {
        let rect = clip.rect;
        let children = format!(
            "properties, posx=(int){}, posy=(int){}, width=(int){}, height=(int){};",
            rect.x, rect.y, rect.width, rect.height
        );
        doc.empty(element(
            "source",
            &[
                ("track-id", VIDEO_TRACK_ID.to_string().as_str()),
                ("children-properties", children.as_str()),
            ],
        ))?;
    }

    doc.close("clip")
}

fn track_types(asset: &Asset) -> u32 {
    let mut types = 0;
    if asset.info.dimensions.is_some() {
        types |= TRACK_VIDEO;
    }
    if asset.info.audio.is_some() {
        types |= TRACK_AUDIO;
    }
    types
}

fn element<'a>(name: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for &attribute in attributes {
        start.push_attribute(attribute);
    }
    start
}

/// Quote a string the way GstStructure serializes `(string)` values.
fn gst_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Bytes kept verbatim in a `file://` path; everything else is escaped.
const URI_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// `file://` URI for a local path, made absolute.
pub fn file_uri(path: &Path) -> String {
    let absolute = canonical_key(path);
    format!(
        "file://{}",
        percent_encode(absolute.to_string_lossy().as_bytes(), URI_PATH)
    )
}

struct XmlDoc {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlDoc {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> RecastResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| RecastError::backend(format!("Failed to write xges: {e}")))
    }

    fn open(&mut self, start: BytesStart<'_>) -> RecastResult<()> {
        self.event(Event::Start(start))
    }

    fn empty(&mut self, start: BytesStart<'_>) -> RecastResult<()> {
        self.event(Event::Empty(start))
    }

    fn close(&mut self, name: &str) -> RecastResult<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::emit;
    use recast_project_model::composition::{
        AssetId, AssetInfo, AudioFormat, Fraction, LayerKind, Rect,
    };
    use recast_project_model::time::SECOND;

    fn composition() -> Composition {
        let mut webcam = AssetInfo::video(640, 480, 20 * SECOND);
        webcam.audio = Some(AudioFormat {
            sample_rate: 48000,
            channels: 1,
        });

        let mut composition = Composition::new(1920, 1080);
        composition.name = Some("Lecture \"one\"".to_string());
        composition.framerate = Some(Fraction { num: 15, den: 1 });
        composition.audio = webcam.audio;
        composition.duration = 20 * SECOND;
        composition.assets = vec![
            Asset {
                id: AssetId(0),
                path: PathBuf::from("/sessions/demo/video/webcams.webm"),
                info: webcam,
            },
            Asset {
                id: AssetId(1),
                path: PathBuf::from("/sessions/demo/slide 1.png"),
                info: AssetInfo::image(1600, 1200),
            },
        ];

        let mut camera = Layer::new(LayerKind::Camera);
        camera.clips.push(PlacedClip {
            asset: AssetId(0),
            layer: LayerKind::Camera,
            start: 0,
            inpoint: 5 * SECOND,
            duration: 15 * SECOND,
            rect: Rect::new(1440, 0, 480, 270),
            effects: vec![ClipEffect::AspectRatioCrop { num: 16, den: 9 }],
        });
        let mut slides = Layer::new(LayerKind::Slides);
        slides.clips.push(PlacedClip {
            asset: AssetId(1),
            layer: LayerKind::Slides,
            start: 0,
            inpoint: 0,
            duration: 10 * SECOND,
            rect: Rect::new(0, 0, 1440, 1080),
            effects: vec![],
        });
        composition.layers = vec![camera, slides];
        composition
    }

    #[test]
    fn test_writes_project_document() {
        let dir = std::env::temp_dir().join(format!("recast-xges-{}", std::process::id()));
        let output = dir.join("lecture.xges");
        let mut backend = XgesBackend::new(&output);

        let written = emit(&composition(), &mut backend).unwrap();
        assert_eq!(written, output);

        let xml = std::fs::read_to_string(&output).unwrap();
        assert!(xml.contains("<ges version=\"0.7\">"));
        assert!(xml.contains("video::name=(string)Camera;"));
        assert!(xml.contains("video::name=(string)Slides;"));
        assert!(xml.contains("framerate=(fraction)15/1"));
        assert!(xml.contains("rate=(int)48000, channels=(int)1"));
        assert!(xml.contains("file:///sessions/demo/slide%201.png"));
        assert!(xml.contains("posx=(int)1440, posy=(int)0, width=(int)480, height=(int)270;"));
        assert!(xml.contains("aspectratiocrop aspect-ratio=16/9"));
        assert!(xml.contains("inpoint=\"5000000000\""));
        assert!(xml.contains("track-types=\"6\""));
        // camera layer is written above the slides layer
        let camera = xml.find("video::name=(string)Camera").unwrap();
        let slides = xml.find("video::name=(string)Slides").unwrap();
        assert!(camera < slides);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_commit_requires_begin() {
        let mut backend = XgesBackend::new("never-written.xges");
        assert!(matches!(
            backend.commit(),
            Err(RecastError::Backend { .. })
        ));
    }

    #[test]
    fn test_file_uri_escapes_reserved_bytes() {
        assert_eq!(
            file_uri(Path::new("/talks/q&a #3/slide 1.png")),
            "file:///talks/q%26a%20%233/slide%201.png"
        );
        assert_eq!(
            file_uri(Path::new("/talks/./day-1/../caf\u{e9}~v2.webm")),
            "file:///talks/caf%C3%A9~v2.webm"
        );
        assert!(file_uri(Path::new("relative/clip.webm")).starts_with("file:///"));
    }

    #[test]
    fn test_gst_quote_escapes() {
        assert_eq!(gst_quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }
}
