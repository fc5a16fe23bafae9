//! Mapping clips from recording time onto the trimmed output timeline.
//!
//! The output shows the recording between `window.start` and
//! `window.end`, shifted so that `window.start` lands at `offset` (the
//! combined length of any opening credits).

use recast_common::config::AssemblyConfig;
use recast_common::error::{RecastError, RecastResult};
use recast_project_model::time::{format_ns, secs_to_ns, TimeNs};

/// The selected `[start, end)` range of the recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start: TimeNs,
    pub end: TimeNs,
}

impl VisibleWindow {
    pub fn new(start: TimeNs, end: TimeNs) -> RecastResult<Self> {
        if start < 0 || end <= start {
            return Err(RecastError::config(format!(
                "visible window [{}, {}) is empty",
                format_ns(start),
                format_ns(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Resolve the configured trim points; a missing end means the end of
    /// the recording.
    pub fn from_config(config: &AssemblyConfig, recording_end: TimeNs) -> RecastResult<Self> {
        let start = secs_to_ns(config.start_secs);
        let end = config.end_secs.map(secs_to_ns).unwrap_or(recording_end);
        Self::new(start, end)
    }

    pub fn duration(&self) -> TimeNs {
        self.end - self.start
    }
}

/// Timing of a clip: where it starts, where it starts reading its asset,
/// and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipTiming {
    pub start: TimeNs,
    pub inpoint: TimeNs,
    pub duration: TimeNs,
}

impl ClipTiming {
    pub fn new(start: TimeNs, inpoint: TimeNs, duration: TimeNs) -> Self {
        Self {
            start,
            inpoint,
            duration,
        }
    }

    pub fn end(&self) -> TimeNs {
        self.start + self.duration
    }
}

/// Re-base a clip from recording time onto the output timeline.
///
/// With `trim_end`, clips starting after the window are dropped and the
/// rest are cut at the window end. Clips ending before the window are
/// dropped; clips straddling the window start lose their elapsed head,
/// which for time-based media also advances the in-point.
///
/// Returns `None` when nothing of the clip is visible. An accepted clip
/// always has a positive duration and a non-negative start.
pub fn window_clip(
    timing: ClipTiming,
    still_image: bool,
    window: &VisibleWindow,
    offset: TimeNs,
    trim_end: bool,
) -> Option<ClipTiming> {
    let ClipTiming {
        mut start,
        mut inpoint,
        mut duration,
    } = timing;

    if trim_end {
        if start > window.end {
            return None;
        }
        duration = duration.min(window.end - start);
    }

    if start + duration < window.start {
        return None;
    }

    start -= window.start;
    if start < 0 {
        duration += start;
        if !still_image {
            inpoint -= start;
        }
        start = 0;
    }

    // Touching the window on either side leaves nothing to show.
    if duration <= 0 {
        return None;
    }

    Some(ClipTiming {
        start: start + offset,
        inpoint,
        duration,
    })
}
