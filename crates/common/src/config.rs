//! Application and assembly configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RecastError, RecastResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default assembly settings, overridable per run.
    pub assembly: AssemblyConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Everything the timeline assembly engine needs to know about the
/// requested output, independent of the session being converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Output canvas size in pixels.
    pub width: u32,
    pub height: u32,

    /// Share of the canvas width reserved for the camera, in percent.
    pub webcam_size_percent: u32,

    /// Corner the camera is anchored to.
    pub webcam_corner: WebcamCorner,

    /// Stretch the camera to 16:9 before fitting it.
    pub stretch_webcam: bool,

    /// Stretch the camera to 16:9 and crop it with an aspect-ratio effect.
    pub crop_webcam: bool,

    /// Start of the visible window, seconds into the recording.
    pub start_secs: f64,

    /// End of the visible window; `None` means the end of the recording.
    pub end_secs: Option<f64>,

    /// Render annotation composites on top of the slides.
    pub annotations: bool,

    /// Render the presenter's pointer as a dot over the slides.
    pub cursor: bool,

    /// Optional cursor dot image; an embedded dot is used when unset.
    pub cursor_dot: Option<PathBuf>,

    /// Optional full-canvas background.
    pub backdrop: Option<PathBuf>,

    /// Clips played before the visible window, in order.
    pub opening_credits: Vec<CreditSpec>,

    /// Clips played after the visible window, in order.
    pub closing_credits: Vec<CreditSpec>,
}

/// Corner placement for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WebcamCorner {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

impl WebcamCorner {
    pub fn is_left(self) -> bool {
        matches!(self, Self::TopLeft | Self::BottomLeft)
    }

    pub fn is_top(self) -> bool {
        matches!(self, Self::TopLeft | Self::TopRight)
    }
}

impl FromStr for WebcamCorner {
    type Err = RecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "top-left" => Ok(Self::TopLeft),
            "top-right" => Ok(Self::TopRight),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(RecastError::config(format!(
                "Unknown webcam corner '{other}'. Use: top-left, top-right, bottom-left, bottom-right"
            ))),
        }
    }
}

/// A credit clip: a media file plus an optional explicit duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditSpec {
    pub path: PathBuf,

    /// Explicit duration in seconds. When unset, still images last
    /// [`DEFAULT_STILL_CREDIT_SECS`] and time-based media their own length.
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

/// Duration of a still-image credit without an explicit duration.
pub const DEFAULT_STILL_CREDIT_SECS: f64 = 3.0;

impl FromStr for CreditSpec {
    type Err = RecastError;

    /// Parse `FILE[:DURATION]`. The suffix after the last colon is only
    /// taken as a duration when it is a number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(RecastError::config("Empty credit argument"));
        }

        if let Some((path, duration)) = s.rsplit_once(':') {
            if let Ok(secs) = duration.trim().parse::<f64>() {
                if path.is_empty() {
                    return Err(RecastError::config(format!("Credit '{s}' has no file")));
                }
                return Ok(Self {
                    path: PathBuf::from(path),
                    duration_secs: Some(secs),
                });
            }
        }

        Ok(Self {
            path: PathBuf::from(s),
            duration_secs: None,
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "recast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Append log output to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            webcam_size_percent: 25,
            webcam_corner: WebcamCorner::TopRight,
            stretch_webcam: false,
            crop_webcam: false,
            start_secs: 0.0,
            end_secs: None,
            annotations: false,
            cursor: true,
            cursor_dot: None,
            backdrop: None,
            opening_credits: vec![],
            closing_credits: vec![],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AssemblyConfig {
    /// Reject inconsistent settings before any assembly work starts.
    pub fn validate(&self) -> RecastResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RecastError::config(format!(
                "Output size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }

        if self.webcam_size_percent >= 100 {
            return Err(RecastError::config(format!(
                "Webcam size must be below 100% of the width, got {}%",
                self.webcam_size_percent
            )));
        }

        if !self.start_secs.is_finite() || self.start_secs < 0.0 {
            return Err(RecastError::config(format!(
                "Start time must be a non-negative number of seconds, got {}",
                self.start_secs
            )));
        }

        if let Some(end) = self.end_secs {
            if !end.is_finite() || end <= self.start_secs {
                return Err(RecastError::config(format!(
                    "End time ({end}s) must be after start time ({}s)",
                    self.start_secs
                )));
            }
        }

        for credit in self.opening_credits.iter().chain(&self.closing_credits) {
            if let Some(secs) = credit.duration_secs {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(RecastError::config(format!(
                        "Credit {} has invalid duration {secs}",
                        credit.path.display()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Width of the camera column in pixels.
    pub fn camera_width(&self) -> u32 {
        (self.width as f64 * self.webcam_size_percent as f64 / 100.0).round_ties_even() as u32
    }

    /// Width of the slides column in pixels.
    pub fn slides_width(&self) -> u32 {
        self.width - self.camera_width()
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("recast").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AssemblyConfig::default();
        config.validate().unwrap();
        assert_eq!(config.camera_width(), 480);
        assert_eq!(config.slides_width(), 1440);
    }

    #[test]
    fn test_webcam_percent_at_limit_rejected() {
        let config = AssemblyConfig {
            webcam_size_percent: 100,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RecastError::Config { .. })
        ));
    }

    #[test]
    fn test_end_before_start_rejected() {
        let config = AssemblyConfig {
            start_secs: 20.0,
            end_secs: Some(10.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let equal = AssemblyConfig {
            start_secs: 10.0,
            end_secs: Some(10.0),
            ..Default::default()
        };
        assert!(equal.validate().is_err());
    }

    #[test]
    fn test_zero_canvas_rejected() {
        let config = AssemblyConfig {
            height: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credit_spec_parsing() {
        let plain: CreditSpec = "intro.png".parse().unwrap();
        assert_eq!(plain.path, PathBuf::from("intro.png"));
        assert_eq!(plain.duration_secs, None);

        let timed: CreditSpec = "intro.png:4.5".parse().unwrap();
        assert_eq!(timed.path, PathBuf::from("intro.png"));
        assert_eq!(timed.duration_secs, Some(4.5));

        let colon_in_name: CreditSpec = "clips/a:b.webm".parse().unwrap();
        assert_eq!(colon_in_name.path, PathBuf::from("clips/a:b.webm"));
        assert_eq!(colon_in_name.duration_secs, None);

        assert!(":3".parse::<CreditSpec>().is_err());
    }

    #[test]
    fn test_negative_credit_duration_rejected() {
        let config = AssemblyConfig {
            closing_credits: vec!["outro.png:-1".parse().unwrap()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_corner_parsing() {
        assert_eq!(
            "bottom_left".parse::<WebcamCorner>().unwrap(),
            WebcamCorner::BottomLeft
        );
        assert!("middle".parse::<WebcamCorner>().is_err());
        assert!(WebcamCorner::TopLeft.is_left());
        assert!(!WebcamCorner::BottomRight.is_top());
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let raw = r#"{"assembly":{"width":1280,"height":720,"annotations":true}}"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.assembly.width, 1280);
        assert!(config.assembly.annotations);
        assert_eq!(config.assembly.webcam_size_percent, 25);
        assert_eq!(config.logging.level, "info");
    }
}
