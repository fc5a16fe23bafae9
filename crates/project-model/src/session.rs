//! Parsed event streams of a recorded conferencing session.
//!
//! A session directory holds the raw media (webcam recording, screen
//! share recording, slide images) plus `session.json`, the already-parsed
//! form of the recording's event documents. All paths in the document are
//! relative to the session directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::time::{self, TimeNs};

/// File name of the parsed session document inside a session directory.
pub const SESSION_FILE: &str = "session.json";

/// File name the recorder uses for "screen share is active" slides.
pub const DESKSHARE_PLACEHOLDER: &str = "deskshare.png";

/// Top-level parsed session (`session.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Directory the session was loaded from. Not serialized.
    #[serde(skip)]
    pub root: PathBuf,

    /// Display name of the meeting, passed through to the project.
    #[serde(default)]
    pub name: Option<String>,

    /// Webcam recording, spanning the whole session.
    #[serde(default = "default_webcam")]
    pub webcam: PathBuf,

    /// Screen share recording, in recording time.
    #[serde(default = "default_deskshare_video")]
    pub deskshare_video: PathBuf,

    /// Slide images in presentation order.
    #[serde(default)]
    pub slides: Vec<SlideEvent>,

    /// Pointer positions, non-decreasing by timestamp.
    #[serde(default)]
    pub cursor: Vec<CursorEvent>,

    /// Screen share start/stop events.
    #[serde(default)]
    pub deskshare: Vec<DeskshareEvent>,

    /// Hand-drawn shapes grouped by the slide they were drawn on.
    #[serde(default)]
    pub annotations: Vec<AnnotationGroup>,
}

fn default_webcam() -> PathBuf {
    PathBuf::from("video/webcams.webm")
}

fn default_deskshare_video() -> PathBuf {
    PathBuf::from("deskshare/deskshare.webm")
}

/// One slide image and the interval during which it was shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideEvent {
    pub id: String,

    /// Image path relative to the session directory.
    pub href: String,

    /// Position of the image in the presentation canvas.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,

    /// Pixel dimensions the slide was presented at.
    pub width: u32,
    pub height: u32,

    /// Shown from (inclusive).
    #[serde(rename = "in", with = "time::secs")]
    pub start: TimeNs,

    /// Shown until (exclusive).
    #[serde(rename = "out", with = "time::secs")]
    pub end: TimeNs,
}

/// Identity, size, and visible interval of a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideInfo {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub start: TimeNs,
    pub end: TimeNs,
}

impl SlideEvent {
    pub fn info(&self) -> SlideInfo {
        SlideInfo {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            start: self.start,
            end: self.end,
        }
    }

    /// Whether this image only marks that screen sharing was active.
    pub fn is_deskshare_placeholder(&self) -> bool {
        Path::new(&self.href)
            .file_name()
            .map(|name| name == DESKSHARE_PLACEHOLDER)
            .unwrap_or(false)
    }
}

/// Pointer position over the current slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorEvent {
    /// Normalized X in `[0.0, 1.0]`, negative when hidden.
    pub x: f64,
    /// Normalized Y in `[0.0, 1.0]`, negative when hidden.
    pub y: f64,
    #[serde(with = "time::secs")]
    pub timestamp: TimeNs,
}

impl CursorEvent {
    pub fn new(x: f64, y: f64, timestamp: TimeNs) -> Self {
        Self { x, y, timestamp }
    }

    /// Both coordinates negative means the presenter's pointer is hidden.
    pub fn is_hidden(&self) -> bool {
        self.x < 0.0 && self.y < 0.0
    }
}

/// A screen share span in recording time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskshareEvent {
    #[serde(with = "time::secs")]
    pub start_timestamp: TimeNs,
    #[serde(with = "time::secs")]
    pub stop_timestamp: TimeNs,
}

/// Shapes drawn on one slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationGroup {
    /// Id of the [`SlideEvent`] the shapes belong to.
    pub slide: String,

    /// Shapes in document order.
    #[serde(default)]
    pub shapes: Vec<AnnotationShape>,
}

/// A drawable annotation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationShape {
    /// Identity shared by successive versions of the same drawing
    /// (e.g. a line being extended). `None` means a one-off shape.
    #[serde(default)]
    pub id: Option<String>,

    /// Opaque drawable payload (an SVG fragment).
    pub payload: String,

    /// Creation time.
    #[serde(with = "time::secs")]
    pub timestamp: TimeNs,

    /// Deletion time; `None` means visible until the slide is replaced.
    #[serde(default, with = "time::undo_secs")]
    pub undo: Option<TimeNs>,
}

impl Session {
    /// Load a session from its directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, SessionError> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(SESSION_FILE);

        let content = std::fs::read_to_string(&path).map_err(|e| SessionError::IoError {
            path: path.clone(),
            source: e,
        })?;

        let mut session: Session =
            serde_json::from_str(&content).map_err(|e| SessionError::ParseError {
                path: path.clone(),
                source: e,
            })?;
        session.root = root;
        session.check_ordering()?;
        Ok(session)
    }

    /// Build a session in memory (tests, programmatic use).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            name: None,
            webcam: default_webcam(),
            deskshare_video: default_deskshare_video(),
            slides: vec![],
            cursor: vec![],
            deskshare: vec![],
            annotations: vec![],
        }
    }

    /// Resolve a session-relative path.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Look up a slide by id.
    pub fn slide(&self, id: &str) -> Option<&SlideEvent> {
        self.slides.iter().find(|slide| slide.id == id)
    }

    /// Earliest and latest timestamps mentioned by any stream.
    pub fn time_span(&self) -> Option<(TimeNs, TimeNs)> {
        let slide_times = self.slides.iter().flat_map(|s| [s.start, s.end]);
        let cursor_times = self.cursor.iter().map(|c| c.timestamp);
        let deskshare_times = self
            .deskshare
            .iter()
            .flat_map(|d| [d.start_timestamp, d.stop_timestamp]);

        let mut all = slide_times.chain(cursor_times).chain(deskshare_times);
        let first = all.next()?;
        Some(all.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// Reject streams whose ordering the assembly engine relies on.
    pub fn check_ordering(&self) -> Result<(), SessionError> {
        for slide in &self.slides {
            if slide.end < slide.start {
                return Err(SessionError::ValidationError {
                    message: format!(
                        "slide {} ends ({}) before it starts ({})",
                        slide.id,
                        time::format_ns(slide.end),
                        time::format_ns(slide.start)
                    ),
                });
            }
        }

        if let Some(pair) = self
            .cursor
            .windows(2)
            .find(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            return Err(SessionError::ValidationError {
                message: format!(
                    "cursor events go back in time at {}",
                    time::format_ns(pair[1].timestamp)
                ),
            });
        }

        Ok(())
    }

    /// Validate that all referenced media files exist.
    pub fn validate_sources(&self) -> Vec<String> {
        let mut errors = vec![];

        let webcam = self.resolve(&self.webcam);
        if !webcam.exists() {
            errors.push(format!("Webcam source missing: {}", self.webcam.display()));
        }

        if !self.deskshare.is_empty() && !self.resolve(&self.deskshare_video).exists() {
            errors.push(format!(
                "Deskshare source missing: {}",
                self.deskshare_video.display()
            ));
        }

        for slide in self.slides.iter().filter(|s| !s.is_deskshare_placeholder()) {
            if !self.resolve(&slide.href).exists() {
                errors.push(format!("Slide {} image missing: {}", slide.id, slide.href));
            }
        }

        for group in &self.annotations {
            if self.slide(&group.slide).is_none() {
                errors.push(format!(
                    "Annotations reference unknown slide: {}",
                    group.slide
                ));
            }
        }

        errors
    }
}

/// Errors that can occur when loading a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid session: {message}")]
    ValidationError { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::SECOND;

    const SAMPLE: &str = r#"{
        "name": "Weekly sync",
        "slides": [
            {"id": "image1", "href": "presentation/a/slide-1.png",
             "width": 1600, "height": 1200, "in": 0.0, "out": 12.5},
            {"id": "image2", "href": "presentation/deskshare.png",
             "width": 1280, "height": 720, "in": 12.5, "out": 20.0}
        ],
        "cursor": [
            {"x": 0.5, "y": 0.25, "timestamp": 1.0},
            {"x": -1.0, "y": -1.0, "timestamp": 2.0}
        ],
        "deskshare": [{"start_timestamp": 12.5, "stop_timestamp": 20.0}],
        "annotations": [
            {"slide": "image1", "shapes": [
                {"id": "s1", "payload": "<g/>", "timestamp": 3.0, "undo": -1},
                {"payload": "<g/>", "timestamp": 4.0, "undo": 6.0}
            ]}
        ]
    }"#;

    #[test]
    fn test_session_parses_seconds_to_ns() {
        let session: Session = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(session.name.as_deref(), Some("Weekly sync"));
        assert_eq!(session.slides[0].end, 12_500_000_000);
        assert_eq!(session.cursor[0].timestamp, SECOND);
        assert_eq!(session.webcam, PathBuf::from("video/webcams.webm"));
    }

    #[test]
    fn test_undo_sentinel_maps_to_none() {
        let session: Session = serde_json::from_str(SAMPLE).unwrap();
        let shapes = &session.annotations[0].shapes;
        assert_eq!(shapes[0].undo, None);
        assert_eq!(shapes[1].undo, Some(6 * SECOND));
        assert_eq!(shapes[1].id, None);
    }

    #[test]
    fn test_hidden_cursor_and_placeholder_detection() {
        let session: Session = serde_json::from_str(SAMPLE).unwrap();
        assert!(!session.cursor[0].is_hidden());
        assert!(session.cursor[1].is_hidden());
        assert!(!session.slides[0].is_deskshare_placeholder());
        assert!(session.slides[1].is_deskshare_placeholder());
    }

    #[test]
    fn test_time_span() {
        let session: Session = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(session.time_span(), Some((0, 20 * SECOND)));
        assert_eq!(Session::new("/tmp").time_span(), None);
    }

    #[test]
    fn test_backwards_cursor_rejected() {
        let mut session = Session::new("/tmp");
        session.cursor = vec![
            CursorEvent::new(0.1, 0.1, 2 * SECOND),
            CursorEvent::new(0.1, 0.1, SECOND),
        ];
        assert!(matches!(
            session.check_ordering(),
            Err(SessionError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_tied_cursor_timestamps_accepted() {
        let mut session = Session::new("/tmp");
        session.cursor = vec![
            CursorEvent::new(0.1, 0.1, SECOND),
            CursorEvent::new(0.2, 0.2, SECOND),
        ];
        session.check_ordering().unwrap();
    }

    #[test]
    fn test_load_and_validate_sources() {
        let dir = std::env::temp_dir().join("recast_test_session_load");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(SESSION_FILE), SAMPLE).unwrap();

        let session = Session::load(&dir).unwrap();
        assert_eq!(session.root, dir);

        let errors = session.validate_sources();
        assert!(errors.iter().any(|e| e.contains("Webcam source missing")));
        assert!(errors.iter().any(|e| e.contains("Deskshare source missing")));
        assert!(errors.iter().any(|e| e.contains("Slide image1 image missing")));
        // placeholder slides are never looked up on disk
        assert!(!errors.iter().any(|e| e.contains("image2")));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = Session::load("/nonexistent/recast-session").unwrap_err();
        assert!(err.to_string().contains(SESSION_FILE));
    }
}
