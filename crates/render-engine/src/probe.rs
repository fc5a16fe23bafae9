//! Media inspection through `ffprobe`, with a direct reader for SVG.

use std::path::Path;
use std::process::Command;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

use recast_common::error::{RecastError, RecastResult};
use recast_processing_core::assets::MediaProbe;
use recast_project_model::composition::{AssetInfo, AudioFormat, Fraction};
use recast_project_model::time::secs_to_ns;

/// Probes media files by running `ffprobe`.
///
/// SVG images are measured from their root element instead, since ffprobe
/// support for them depends on how ffmpeg was built.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            binary: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific ffprobe executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Check if the ffprobe binary can be run.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn run_ffprobe(&self, path: &Path) -> RecastResult<String> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=format_name,duration:stream=codec_type,width,height,avg_frame_rate,r_frame_rate,sample_rate,channels",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| RecastError::probe(path, format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecastError::probe(path, stderr.trim().to_string()));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| RecastError::probe(path, format!("non-UTF-8 ffprobe output: {e}")))
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> RecastResult<AssetInfo> {
        if !path.exists() {
            return Err(RecastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let is_svg = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

        let info = if is_svg {
            let content = std::fs::read_to_string(path)?;
            let (width, height) = svg_dimensions(&content)
                .map_err(|message| RecastError::probe(path, message))?;
            AssetInfo::image(width, height)
        } else {
            let json = self.run_ffprobe(path)?;
            parse_ffprobe_output(&json).map_err(|message| RecastError::probe(path, message))?
        };

        tracing::debug!(
            path = %path.display(),
            dimensions = ?info.dimensions,
            duration = ?info.duration,
            still = info.still_image,
            "Probed media"
        );
        Ok(info)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// Interpret `ffprobe -of json` output.
pub fn parse_ffprobe_output(json: &str) -> Result<AssetInfo, String> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| format!("unreadable ffprobe output: {e}"))?;

    let format_name = output
        .format
        .as_ref()
        .and_then(|format| format.format_name.as_deref())
        .unwrap_or_default();
    let still_image = format_name == "image2" || format_name.ends_with("_pipe");

    let video = output
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));
    let audio = output
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("audio"));

    if video.is_none() && audio.is_none() {
        return Err("no audio or video streams".to_string());
    }

    let dimensions = video
        .and_then(|stream| stream.width.zip(stream.height))
        .filter(|&(width, height)| width > 0 && height > 0);

    let duration = if still_image {
        None
    } else {
        output
            .format
            .as_ref()
            .and_then(|format| format.duration.as_deref())
            .and_then(|raw| raw.parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(secs_to_ns)
    };

    let framerate = video.and_then(|stream| {
        stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_fraction)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_fraction))
    });

    let audio = audio.and_then(|stream| {
        let sample_rate = stream.sample_rate.as_deref()?.parse::<u32>().ok()?;
        Some(AudioFormat {
            sample_rate,
            channels: stream.channels?,
        })
    });

    Ok(AssetInfo {
        dimensions,
        duration,
        still_image,
        framerate,
        audio,
    })
}

/// Parse `num/den`; unknown rates (`0/0`, `0/1`) yield `None`.
fn parse_fraction(raw: &str) -> Option<Fraction> {
    let (num, den) = raw.split_once('/')?;
    let num = num.trim().parse::<u32>().ok()?;
    let den = den.trim().parse::<u32>().ok()?;
    (num > 0 && den > 0).then_some(Fraction { num, den })
}

/// Read the pixel size of an SVG document from its root element.
///
/// Uses the `width`/`height` attributes (plain numbers or `px`), falling
/// back to the `viewBox` size.
pub fn svg_dimensions(content: &str) -> Result<(u32, u32), String> {
    let mut reader = Reader::from_str(content);

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                if element.local_name().as_ref() != b"svg" {
                    return Err("root element is not <svg>".to_string());
                }

                let mut width = None;
                let mut height = None;
                let mut view_box = None;
                for attr in element.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| format!("bad attribute value: {e}"))?;
                    match attr.key.local_name().as_ref() {
                        b"width" => width = parse_length(&value),
                        b"height" => height = parse_length(&value),
                        b"viewBox" => view_box = parse_view_box(&value),
                        _ => {}
                    }
                }

                return match (width, height, view_box) {
                    (Some(w), Some(h), _) => Ok((w, h)),
                    (_, _, Some(size)) => Ok(size),
                    _ => Err("SVG has no usable width/height or viewBox".to_string()),
                };
            }
            Ok(Event::Eof) => return Err("empty SVG document".to_string()),
            Ok(_) => {}
            Err(e) => return Err(format!("malformed SVG: {e}")),
        }
    }
}

fn parse_length(raw: &str) -> Option<u32> {
    let number = raw.trim().trim_end_matches("px").trim();
    let value = number.parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then(|| value.round() as u32)
}

fn parse_view_box(raw: &str) -> Option<(u32, u32)> {
    let parts: Vec<f64> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match parts.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((w.round() as u32, h.round() as u32)),
        _ => None,
    }
}
