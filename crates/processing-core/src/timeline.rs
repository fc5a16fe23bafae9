//! Timeline Builder: turns a parsed session into a layered composition.
//!
//! Each layer is built by its own pass over the session streams. All
//! passes share the visible window and the opening-credits offset, which
//! are fixed before any recording-time clip is placed. Assembly either
//! produces every layer or fails; nothing is handed to a backend until
//! [`TimelineBuilder::build`] returns.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use recast_common::config::{AssemblyConfig, CreditSpec, DEFAULT_STILL_CREDIT_SECS};
use recast_common::error::{RecastError, RecastResult};
use recast_project_model::composition::{
    Asset, AssetInfo, ClipEffect, Composition, Layer, LayerKind, PlacedClip, Rect,
};
use recast_project_model::session::{AnnotationShape, Session, SlideEvent, SlideInfo};
use recast_project_model::time::{format_ns, secs_to_ns, TimeNs};

use crate::assets::{intrinsic_duration, visual_dimensions, AssetRegistry, MediaProbe};
use crate::geometry::{constrain, constrain_size, stretch_to_widescreen, CanvasLayout};
use crate::intervals::resolve_annotations;
use crate::window::{window_clip, ClipTiming, VisibleWindow};

/// Rasterizes the shapes active during one annotation span.
pub trait CompositeRenderer {
    /// Produce the composite for span `index` of `slide`, drawing `shapes`
    /// in order over `background` (when the slide has a real image).
    ///
    /// The same `(slide, index)` must always map to the same path.
    /// Returns the path of the rendered image, which has the slide's size.
    fn render(
        &self,
        slide: &SlideInfo,
        background: Option<&Path>,
        index: usize,
        shapes: &[&AnnotationShape],
    ) -> RecastResult<PathBuf>;
}

/// Timing context shared by every recording-time clip.
#[derive(Debug, Clone, Copy)]
struct Placement {
    window: VisibleWindow,

    /// Combined length of the opening credits.
    offset: TimeNs,
}

impl Placement {
    /// Window `timing` and append the clip to `layer`, returning the
    /// emitted clip.
    fn place<'l>(
        &self,
        layer: &'l mut Layer,
        asset: &Asset,
        timing: ClipTiming,
        rect: Rect,
        trim_end: bool,
    ) -> Option<&'l mut PlacedClip> {
        let Some(placed) = window_clip(
            timing,
            asset.info.still_image,
            &self.window,
            self.offset,
            trim_end,
        ) else {
            tracing::debug!(
                layer = %layer.kind,
                asset = %asset.id,
                start = %format_ns(timing.start),
                duration = %format_ns(timing.duration),
                "Clip outside visible window, skipped"
            );
            return None;
        };

        layer.clips.push(PlacedClip {
            asset: asset.id,
            layer: layer.kind,
            start: placed.start,
            inpoint: placed.inpoint,
            duration: placed.duration,
            rect,
            effects: vec![],
        });
        layer.clips.last_mut()
    }
}

/// Assembles compositions for one configuration.
pub struct TimelineBuilder<'a> {
    config: AssemblyConfig,
    layout: CanvasLayout,
    renderer: &'a dyn CompositeRenderer,
    cursor_dot: Option<PathBuf>,
}

impl<'a> TimelineBuilder<'a> {
    /// Validates `config` up front; an inconsistent configuration never
    /// reaches assembly.
    pub fn new(config: AssemblyConfig, renderer: &'a dyn CompositeRenderer) -> RecastResult<Self> {
        config.validate()?;
        let layout = CanvasLayout::from_config(&config);
        let cursor_dot = config.cursor_dot.clone();
        Ok(Self {
            config,
            layout,
            renderer,
            cursor_dot,
        })
    }

    /// Image used for the cursor dot. Overrides the configured one.
    pub fn with_cursor_dot(mut self, path: impl Into<PathBuf>) -> Self {
        self.cursor_dot = Some(path.into());
        self
    }

    pub fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    pub fn layout(&self) -> &CanvasLayout {
        &self.layout
    }

    /// Assemble `session` into a composition, probing media through `probe`.
    pub fn build(&self, session: &Session, probe: &dyn MediaProbe) -> RecastResult<Composition> {
        let mut registry = AssetRegistry::new(probe);

        // The camera recording defines the output caps and the default end.
        let webcam = registry.get(session.resolve(&session.webcam))?.clone();
        let recording_end = intrinsic_duration(&webcam)?;
        let window = VisibleWindow::from_config(&self.config, recording_end)?;

        tracing::info!(
            start = %format_ns(window.start),
            end = %format_ns(window.end),
            slides = session.slides.len(),
            cursor_events = session.cursor.len(),
            deskshare_events = session.deskshare.len(),
            annotation_groups = session.annotations.len(),
            "Assembling timeline"
        );

        let mut layers = Vec::new();

        let (credits, offset, closing_length) = self.build_credits(&mut registry, &window)?;
        layers.push(credits);

        let placement = Placement { window, offset };

        layers.push(self.build_camera(&webcam, &placement)?);

        let mut slides: Vec<_> = session.slides.iter().collect();
        slides.sort_by_key(|slide| slide.start);

        if self.config.cursor {
            layers.push(self.build_cursor(session, &slides, &mut registry, &placement)?);
        }
        if self.config.annotations {
            layers.push(self.build_annotations(session, &mut registry, &placement)?);
        }
        layers.push(self.build_slides(session, &slides, &mut registry, &placement)?);
        layers.push(self.build_deskshare(session, &mut registry, &placement)?);
        if let Some(backdrop) = &self.config.backdrop {
            layers.push(self.build_backdrop(backdrop, &mut registry, &placement)?);
        }

        layers.retain(|layer| !layer.is_empty());
        layers.sort_by_key(|layer| layer.kind);

        for layer in &layers {
            if !layer.is_disjoint() {
                return Err(RecastError::input(format!(
                    "{} layer has overlapping clips; check the session's event times",
                    layer.kind
                )));
            }
        }

        let mut composition = Composition::new(self.config.width, self.config.height);
        composition.name = session.name.clone();
        composition.framerate = webcam.info.framerate;
        composition.audio = webcam.info.audio;
        composition.duration = offset + window.duration() + closing_length;
        composition.layers = layers;
        composition.assets = registry.into_assets();
        let unused = composition.prune_unused_assets();
        if unused > 0 {
            tracing::debug!(unused, "Dropped assets outside the visible window");
        }

        tracing::info!(
            layers = composition.layers.len(),
            clips = composition.clip_count(),
            assets = composition.assets.len(),
            duration = %format_ns(composition.duration),
            "Timeline assembled"
        );

        Ok(composition)
    }

    /// Opening credits run back-to-back before the window, closing
    /// credits after it. Returns the layer plus both total lengths.
    fn build_credits(
        &self,
        registry: &mut AssetRegistry<'_>,
        window: &VisibleWindow,
    ) -> RecastResult<(Layer, TimeNs, TimeNs)> {
        let mut layer = Layer::new(LayerKind::Credits);

        let mut opening_length = 0;
        for credit in &self.config.opening_credits {
            let (asset, duration, rect) = self.credit_clip(credit, registry)?;
            let placement = Placement {
                window: *window,
                offset: opening_length,
            };
            placement.place(
                &mut layer,
                &asset,
                ClipTiming::new(window.start, 0, duration),
                rect,
                false,
            );
            opening_length += duration;
        }

        let placement = Placement {
            window: *window,
            offset: opening_length,
        };
        let mut closing_length = 0;
        for credit in &self.config.closing_credits {
            let (asset, duration, rect) = self.credit_clip(credit, registry)?;
            placement.place(
                &mut layer,
                &asset,
                ClipTiming::new(window.end + closing_length, 0, duration),
                rect,
                false,
            );
            closing_length += duration;
        }

        Ok((layer, opening_length, closing_length))
    }

    fn credit_clip(
        &self,
        credit: &CreditSpec,
        registry: &mut AssetRegistry<'_>,
    ) -> RecastResult<(Asset, TimeNs, Rect)> {
        let asset = registry.get(&credit.path)?.clone();
        let duration = match credit.duration_secs {
            Some(secs) => secs_to_ns(secs),
            None if asset.info.still_image => secs_to_ns(DEFAULT_STILL_CREDIT_SECS),
            None => intrinsic_duration(&asset)?,
        };
        let (width, height) =
            constrain_size(visual_dimensions(&asset)?, self.layout.canvas_bounds())?;
        Ok((asset, duration, Rect::new(0, 0, width, height)))
    }

    fn build_camera(&self, webcam: &Asset, placement: &Placement) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Camera);
        if self.layout.camera_column.width == 0 {
            tracing::debug!("No room reserved for the camera");
            return Ok(layer);
        }

        let dimensions = visual_dimensions(webcam)?;
        let source = if self.config.stretch_webcam || self.config.crop_webcam {
            stretch_to_widescreen(dimensions)
        } else {
            (dimensions.0 as f64, dimensions.1 as f64)
        };
        let size = constrain(source, self.layout.camera_bounds())?;
        let rect = self.layout.camera_rect(size);
        let duration = intrinsic_duration(webcam)?;

        if let Some(clip) = placement.place(
            &mut layer,
            webcam,
            ClipTiming::new(0, 0, duration),
            rect,
            true,
        ) {
            if self.config.crop_webcam {
                clip.effects.push(ClipEffect::AspectRatioCrop { num: 16, den: 9 });
            }
        }
        Ok(layer)
    }

    fn build_slides(
        &self,
        session: &Session,
        slides: &[&SlideEvent],
        registry: &mut AssetRegistry<'_>,
        placement: &Placement,
    ) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Slides);
        let window = placement.window;

        for slide in slides {
            if slide.end < window.start || slide.start > window.end {
                continue;
            }
            // Screen share is active; the deskshare layer shows it.
            if slide.is_deskshare_placeholder() {
                continue;
            }

            let asset = registry.get(session.resolve(&slide.href))?.clone();
            let size = constrain_size(visual_dimensions(&asset)?, self.layout.slides_bounds())?;
            placement.place(
                &mut layer,
                &asset,
                ClipTiming::new(slide.start, 0, slide.end - slide.start),
                self.layout.slide_rect(size),
                true,
            );
        }

        Ok(layer)
    }

    fn build_cursor(
        &self,
        session: &Session,
        slides: &[&SlideEvent],
        registry: &mut AssetRegistry<'_>,
        placement: &Placement,
    ) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Cursor);
        if session.cursor.is_empty() {
            return Ok(layer);
        }

        let dot_path = self.cursor_dot.as_ref().ok_or_else(|| {
            RecastError::config("cursor layer enabled but no cursor dot image configured")
        })?;
        let dot = registry.get(dot_path)?.clone();
        let (dot_width, dot_height) = visual_dimensions(&dot)?;

        let canvas = self.layout.canvas;
        let region = self.layout.slides_region;

        // Index one past the last slide that has started; only ever advances.
        let mut next_slide = 0;
        let mut skipped_before_slides = 0usize;

        for (i, event) in session.cursor.iter().enumerate() {
            while next_slide < slides.len() && slides[next_slide].start <= event.timestamp {
                next_slide += 1;
            }

            if event.is_hidden() {
                continue;
            }

            let end = session
                .cursor
                .get(i + 1)
                .map_or(placement.window.end, |next| next.timestamp);

            let Some(slide) = next_slide.checked_sub(1).map(|index| slides[index]) else {
                skipped_before_slides += 1;
                continue;
            };

            let (width, height) =
                constrain_size((slide.width, slide.height), self.layout.slides_bounds())?;
            let x = region.x
                + (width as f64 * event.x - dot_width as f64 / 2.0).round_ties_even() as i64;
            let y = region.y
                + (height as f64 * event.y - dot_height as f64 / 2.0).round_ties_even() as i64;
            let rect = Rect::new(x, y, dot_width, dot_height).clamped_within(&canvas);

            placement.place(
                &mut layer,
                &dot,
                ClipTiming::new(event.timestamp, 0, end - event.timestamp),
                rect,
                true,
            );
        }

        if skipped_before_slides > 0 {
            tracing::warn!(
                count = skipped_before_slides,
                "Cursor events before the first slide were dropped"
            );
        }

        Ok(layer)
    }

    fn build_annotations(
        &self,
        session: &Session,
        registry: &mut AssetRegistry<'_>,
        placement: &Placement,
    ) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Annotations);

        // Groups naming the same slide are drawn together.
        let mut order: Vec<&str> = Vec::new();
        let mut by_slide: HashMap<&str, Vec<AnnotationShape>> = HashMap::new();
        for group in &session.annotations {
            let shapes = by_slide.entry(group.slide.as_str()).or_insert_with(|| {
                order.push(group.slide.as_str());
                Vec::new()
            });
            shapes.extend(group.shapes.iter().cloned());
        }

        let mut slides = Vec::with_capacity(order.len());
        for id in order {
            let slide = session.slide(id).ok_or_else(|| {
                RecastError::input(format!("annotations reference unknown slide '{id}'"))
            })?;
            slides.push(slide);
        }
        slides.sort_by_key(|slide| slide.start);

        for slide in slides {
            let info = slide.info();
            let shapes = by_slide.get(slide.id.as_str()).map_or(&[][..], Vec::as_slice);
            let spans = resolve_annotations(&info, shapes, &placement.window);
            if spans.is_empty() {
                continue;
            }

            let size = constrain_size((info.width, info.height), self.layout.slides_bounds())?;
            let rect = self.layout.slide_rect(size);
            let background =
                (!slide.is_deskshare_placeholder()).then(|| session.resolve(&slide.href));

            tracing::debug!(slide = %info.id, spans = spans.len(), "Resolved annotation spans");

            for span in &spans {
                let path = self.renderer.render(
                    &info,
                    background.as_deref(),
                    span.index,
                    &span.visible_shapes(),
                )?;
                let asset = registry
                    .get_known(&path, AssetInfo::image(info.width, info.height))
                    .clone();
                placement.place(
                    &mut layer,
                    &asset,
                    ClipTiming::new(span.begin, 0, span.duration()),
                    rect,
                    true,
                );
            }
        }

        Ok(layer)
    }

    fn build_deskshare(
        &self,
        session: &Session,
        registry: &mut AssetRegistry<'_>,
        placement: &Placement,
    ) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Deskshare);
        if session.deskshare.is_empty() {
            return Ok(layer);
        }

        let asset = registry.get(session.resolve(&session.deskshare_video))?.clone();
        let size = constrain_size(visual_dimensions(&asset)?, self.layout.slides_bounds())?;
        let rect = self.layout.slide_rect(size);
        let length = intrinsic_duration(&asset)?;

        for event in &session.deskshare {
            let start = event.start_timestamp;
            if start > length {
                tracing::debug!(start = %format_ns(start), "Screen share past end of recording");
                continue;
            }
            let end = event.stop_timestamp.min(length);
            placement.place(
                &mut layer,
                &asset,
                ClipTiming::new(start, start, end - start),
                rect,
                true,
            );
        }

        Ok(layer)
    }

    fn build_backdrop(
        &self,
        backdrop: &Path,
        registry: &mut AssetRegistry<'_>,
        placement: &Placement,
    ) -> RecastResult<Layer> {
        let mut layer = Layer::new(LayerKind::Backdrop);
        let asset = registry.get(backdrop)?.clone();
        placement.place(
            &mut layer,
            &asset,
            ClipTiming::new(0, 0, placement.window.end),
            self.layout.canvas,
            true,
        );
        Ok(layer)
    }
}
