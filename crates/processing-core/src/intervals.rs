//! Annotation interval resolution.
//!
//! Shapes drawn on a slide appear and disappear independently. Each
//! rendered composite frame must show exactly the shapes visible during
//! its span, so the union of all shape spans is split at every boundary
//! and each piece is tagged with the shapes covering it. Neighbouring
//! pieces with identical shape sets are merged back together, which
//! yields one composite per maximal constant-shape-set span.
//!
//! # Algorithm
//!
//! 1. **Clamp** every shape to the slide's visible interval; a missing
//!    undo time means "until the slide ends". Empty spans are discarded.
//! 2. **Split** the union at every distinct begin/end point.
//! 3. **Tag** each elementary piece with the shapes covering it, in
//!    creation order.
//! 4. **Merge** touching pieces whose shape sets are identical.
//! 5. **Number** the merged spans over the whole slide, then drop spans
//!    outside the visible window. Numbers never depend on the window, so
//!    they can key rendered composites across differently trimmed runs.

use std::collections::HashMap;

use recast_project_model::session::{AnnotationShape, SlideInfo};
use recast_project_model::time::TimeNs;

use crate::window::VisibleWindow;

/// A half-open `[begin, end)` span with attached payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval<T> {
    pub begin: TimeNs,
    pub end: TimeNs,
    pub data: T,
}

impl<T> Interval<T> {
    pub fn new(begin: TimeNs, end: TimeNs, data: T) -> Self {
        Self { begin, end, data }
    }

    pub fn duration(&self) -> TimeNs {
        self.end - self.begin
    }
}

/// Partition the union of `spans` into non-overlapping pieces.
///
/// Each output interval carries the indices of the spans covering it, in
/// ascending index order. Empty and inverted spans are ignored. Output
/// is sorted by `begin`, and no two touching intervals carry the same
/// index set.
pub fn partition(spans: &[(TimeNs, TimeNs)]) -> Vec<Interval<Vec<usize>>> {
    let mut boundaries: Vec<TimeNs> = spans
        .iter()
        .filter(|(begin, end)| begin < end)
        .flat_map(|&(begin, end)| [begin, end])
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let mut result: Vec<Interval<Vec<usize>>> = Vec::new();
    for pair in boundaries.windows(2) {
        let (begin, end) = (pair[0], pair[1]);
        let active: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, &(b, e))| b < e && b <= begin && e >= end)
            .map(|(index, _)| index)
            .collect();

        if active.is_empty() {
            continue;
        }

        match result.last_mut() {
            Some(last) if last.end == begin && last.data == active => last.end = end,
            _ => result.push(Interval::new(begin, end, active)),
        }
    }

    result
}

/// A span of a slide during which a fixed set of shapes is visible.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeInterval<'a> {
    /// Position among all spans of the slide, visible or not.
    pub index: usize,

    pub begin: TimeNs,
    pub end: TimeNs,

    /// Active shapes in creation order (ties in document order).
    pub shapes: Vec<&'a AnnotationShape>,
}

impl<'a> ShapeInterval<'a> {
    pub fn duration(&self) -> TimeNs {
        self.end - self.begin
    }

    /// Shapes to draw: for a shape identity with several active versions,
    /// only the last version is kept.
    pub fn visible_shapes(&self) -> Vec<&'a AnnotationShape> {
        let mut last_version: HashMap<&str, usize> = HashMap::new();
        for (position, shape) in self.shapes.iter().enumerate() {
            if let Some(id) = shape.id.as_deref() {
                last_version.insert(id, position);
            }
        }

        self.shapes
            .iter()
            .enumerate()
            .filter(|(position, shape)| match shape.id.as_deref() {
                Some(id) => last_version.get(id) == Some(position),
                None => true,
            })
            .map(|(_, shape)| *shape)
            .collect()
    }
}

/// Clamp a shape's lifetime to the slide it was drawn on.
///
/// Returns `None` when nothing of the shape is visible.
pub fn clamp_to_slide(shape: &AnnotationShape, slide: &SlideInfo) -> Option<(TimeNs, TimeNs)> {
    let undo = shape.undo.unwrap_or(slide.end);
    let begin = shape.timestamp.clamp(slide.start, slide.end.max(slide.start));
    let end = undo.clamp(slide.start, slide.end.max(slide.start));
    (begin < end).then_some((begin, end))
}

/// Resolve the shapes drawn on `slide` into constant-shape-set spans.
///
/// Output spans are pairwise disjoint, sorted by begin time, and overlap
/// `window`. Each span's `index` is its position in the slide's full
/// partition, so the same span gets the same index for any window.
pub fn resolve_annotations<'a>(
    slide: &SlideInfo,
    shapes: &'a [AnnotationShape],
    window: &VisibleWindow,
) -> Vec<ShapeInterval<'a>> {
    let mut ordered: Vec<&'a AnnotationShape> = shapes.iter().collect();
    // stable: ties keep document order
    ordered.sort_by_key(|shape| shape.timestamp);

    let mut kept: Vec<&'a AnnotationShape> = Vec::with_capacity(ordered.len());
    let mut spans: Vec<(TimeNs, TimeNs)> = Vec::with_capacity(ordered.len());
    for shape in ordered {
        if let Some(span) = clamp_to_slide(shape, slide) {
            kept.push(shape);
            spans.push(span);
        }
    }

    partition(&spans)
        .into_iter()
        .enumerate()
        .filter(|(_, interval)| interval.end > window.start && interval.begin < window.end)
        .map(|(index, interval)| ShapeInterval {
            index,
            begin: interval.begin,
            end: interval.end,
            shapes: interval.data.iter().map(|&i| kept[i]).collect(),
        })
        .collect()
}
