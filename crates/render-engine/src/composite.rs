//! Annotation composite frames as SVG documents.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use recast_common::error::{RecastError, RecastResult};
use recast_processing_core::timeline::CompositeRenderer;
use recast_project_model::session::{AnnotationShape, SlideInfo};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Writes one slide-sized SVG per annotation span.
///
/// Files are keyed by slide id and span index. An existing file for a key
/// is reused as-is, so re-running an export only renders new spans.
#[derive(Debug, Clone)]
pub struct SvgCompositeRenderer {
    output_dir: PathBuf,
}

impl SvgCompositeRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Where the composite for span `index` of `slide_id` lives.
    pub fn composite_path(&self, slide_id: &str, index: usize) -> PathBuf {
        self.output_dir
            .join(format!("annotations-{slide_id}-{index}.svg"))
    }
}

impl CompositeRenderer for SvgCompositeRenderer {
    fn render(
        &self,
        slide: &SlideInfo,
        background: Option<&Path>,
        index: usize,
        shapes: &[&AnnotationShape],
    ) -> RecastResult<PathBuf> {
        let path = self.composite_path(&slide.id, index);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Reusing rendered composite");
            return Ok(path);
        }

        let document = composite_svg(slide, background, shapes)?;
        std::fs::create_dir_all(&self.output_dir)?;

        let partial = path.with_extension("svg.partial");
        std::fs::write(&partial, document)?;
        std::fs::rename(&partial, &path)?;

        tracing::debug!(
            path = %path.display(),
            shapes = shapes.len(),
            "Rendered annotation composite"
        );
        Ok(path)
    }
}

/// Build the composite document: the slide image (if any) with each shape
/// payload layered on top, in order.
pub fn composite_svg(
    slide: &SlideInfo,
    background: Option<&Path>,
    shapes: &[&AnnotationShape],
) -> RecastResult<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let width = slide.width.to_string();
    let height = slide.height.to_string();
    let width_px = format!("{width}px");
    let height_px = format!("{height}px");
    let view_box = format!("0 0 {width} {height}");

    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", SVG_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    root.push_attribute(("version", "1.1"));
    root.push_attribute(("width", width_px.as_str()));
    root.push_attribute(("height", height_px.as_str()));
    root.push_attribute(("viewBox", view_box.as_str()));

    write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write(&mut writer, Event::Start(root))?;

    if let Some(background) = background {
        let href = background.to_string_lossy().into_owned();
        let mut image = BytesStart::new("image");
        image.push_attribute(("x", "0"));
        image.push_attribute(("y", "0"));
        image.push_attribute(("width", width.as_str()));
        image.push_attribute(("height", height.as_str()));
        image.push_attribute(("xlink:href", href.as_str()));
        write(&mut writer, Event::Empty(image))?;
    }

    for shape in shapes {
        // Payloads are already serialized SVG fragments.
        write(
            &mut writer,
            Event::Text(BytesText::from_escaped(shape.payload.as_str())),
        )?;
    }

    write(&mut writer, Event::End(BytesEnd::new("svg")))?;
    Ok(writer.into_inner().into_inner())
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> RecastResult<()> {
    writer
        .write_event(event)
        .map_err(|e| RecastError::render(format!("Failed to write composite SVG: {e}")))
}
