//! Preset types.
//!
//! A preset is a named recipe for assembling one video. There are two
//! incompatible processing paths, so the preset is a tagged variant chosen
//! once when it is loaded:
//!
//! - [`StandardPreset`]: ordered segments, end clips, an outro, a sampled
//!   music bed and timed text overlays.
//! - [`ShortFormPreset`]: one source clip with a pair of translucent image
//!   overlays flashed at fixed times.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolution::Resolution;
use crate::store::PresetError;

/// Number of overlay images drawn for every short-form job.
pub const OVERLAY_PAIR: usize = 2;

/// A validated video-assembly recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Preset {
    Standard(StandardPreset),
    ShortForm(ShortFormPreset),
}

/// Multi-segment recipe with text overlays and a music bed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardPreset {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// How many videos one invocation should produce.
    #[serde(default = "default_count")]
    pub count: u32,

    /// Ordered primary segments.
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Short clips appended after the segments, drawn with repetition.
    #[serde(default)]
    pub end_videos: EndVideos,

    /// Closing clip appended last.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outro_video: Option<ClipSpec>,

    /// Music bed. Required; absence is reported by [`Preset::validate`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioSpec>,

    /// Text overlays in compositing order (later entries draw on top).
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,

    #[serde(default)]
    pub output: OutputSettings,
}

/// One source-directory + duration contribution to a composed video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,

    /// Directory to pick a random file from.
    pub source: PathBuf,

    /// Allowed suffixes (".mp4"); empty means the defaults for `kind`.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Seconds. Videos are trimmed to it, stills are held for it.
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Video,
    Image,
}

/// Repeated end clips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndVideos {
    pub source: PathBuf,
    pub count: u32,
    pub duration: f64,
    pub extensions: Vec<String>,
}

/// A single clip drawn from a directory and trimmed to `duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipSpec {
    pub source: PathBuf,
    pub duration: f64,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Music bed: a random file from `source`, sampled to `duration` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSpec {
    pub source: PathBuf,
    pub duration: f64,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A time-bounded caption drawn over the concatenated video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,

    #[serde(default)]
    pub x: Position,
    #[serde(default)]
    pub y: Position,

    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_text_color")]
    pub color: String,
    #[serde(default = "default_border_color")]
    pub border_color: String,
    #[serde(default)]
    pub border_width: u32,

    /// Draw a filled box behind the text.
    #[serde(rename = "box", default)]
    pub boxed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub box_border_width: Option<u32>,
}

/// Text placement along one axis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawPosition", into = "RawPosition")]
pub enum Position {
    /// Centre the rendered text box within the frame.
    #[default]
    Center,
    /// Absolute pixel offset from the top/left edge.
    Pixels(i64),
    /// Engine expression evaluated per frame, e.g. `h-300` or `h/2+50`.
    Expr(String),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawPosition {
    Number(f64),
    Text(String),
}

impl TryFrom<RawPosition> for Position {
    type Error = String;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        match raw {
            RawPosition::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Ok(Position::Pixels(n as i64))
            }
            RawPosition::Number(n) => Err(format!("position {n} is not a whole pixel value")),
            RawPosition::Text(s) => Position::parse(&s),
        }
    }
}

impl From<Position> for RawPosition {
    fn from(position: Position) -> Self {
        match position {
            Position::Center => RawPosition::Text("center".to_string()),
            Position::Pixels(n) => RawPosition::Number(n as f64),
            Position::Expr(expr) => RawPosition::Text(expr),
        }
    }
}

impl Position {
    /// Parse the string form used in preset files.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("position expression is empty".to_string());
        }
        if trimmed.eq_ignore_ascii_case("center") {
            return Ok(Position::Center);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Position::Pixels(n));
        }
        if let Some(bad) = trimmed.chars().find(|c| !is_expr_char(*c)) {
            return Err(format!(
                "position expression {trimmed:?} contains unsupported character {bad:?}"
            ));
        }
        Ok(Position::Expr(trimmed.to_string()))
    }
}

fn is_expr_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-' | '*' | '/' | '(' | ')' | '.' | ',' | ' ')
}

/// Source clip + overlay pair recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortFormPreset {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub source: SourceDirs,

    /// Timing/opacity for each overlay image; missing slots use defaults.
    #[serde(default)]
    pub edits: Vec<ImageOverlayEdit>,

    /// Free-form device/region/platform tags.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Source directories for short-form jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDirs {
    /// Directory of source clips.
    pub video: PathBuf,

    /// Shared overlay image pool.
    pub images: PathBuf,

    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

/// One translucent image flashed over the source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverlayEdit {
    pub start_time: f64,
    pub end_time: f64,

    /// Alpha multiplier in `[0.0, 1.0]`.
    #[serde(default = "default_overlay_opacity")]
    pub opacity: f64,

    /// Overlay x expression (`W`/`w` are background/overlay widths).
    #[serde(default = "default_overlay_x")]
    pub x: String,

    /// Overlay y expression (`H`/`h` are background/overlay heights).
    #[serde(default = "default_overlay_y")]
    pub y: String,
}

impl ImageOverlayEdit {
    /// Centred overlay visible between `start_time` and `end_time`.
    pub fn centered(start_time: f64, end_time: f64, opacity: f64) -> Self {
        Self {
            start_time,
            end_time,
            opacity,
            x: default_overlay_x(),
            y: default_overlay_y(),
        }
    }
}

/// Output encoding parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OutputSettings {
    /// `"<width>x<height>"`; required.
    pub resolution: String,
    pub fps: u32,
    pub codec: String,
    /// Encoder speed preset (`fast`, `medium` ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    /// Target video bitrate such as `12M`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_bitrate: Option<String>,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub pixel_format: String,
    /// Move the moov atom to the front for progressive playback.
    pub faststart: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            resolution: String::new(),
            fps: 25,
            codec: "libx264".to_string(),
            preset: None,
            crf: None,
            video_bitrate: None,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            pixel_format: "yuv420p".to_string(),
            faststart: false,
        }
    }
}

impl OutputSettings {
    /// Parsed output dimensions.
    pub fn resolution(&self) -> Result<Resolution, PresetError> {
        Resolution::parse(&self.resolution)
    }
}

impl Segment {
    /// Allowed suffixes, falling back to the defaults for the segment kind.
    pub fn effective_extensions(&self) -> Vec<String> {
        if self.extensions.is_empty() {
            match self.kind {
                SegmentKind::Video => default_video_extensions(),
                SegmentKind::Image => default_image_extensions(),
            }
        } else {
            self.extensions.clone()
        }
    }
}

impl EndVideos {
    pub fn effective_extensions(&self) -> Vec<String> {
        or_default(&self.extensions, default_video_extensions)
    }
}

impl ClipSpec {
    pub fn effective_extensions(&self) -> Vec<String> {
        or_default(&self.extensions, default_video_extensions)
    }
}

impl AudioSpec {
    pub fn effective_extensions(&self) -> Vec<String> {
        or_default(&self.extensions, default_audio_extensions)
    }
}

fn or_default(extensions: &[String], fallback: fn() -> Vec<String>) -> Vec<String> {
    if extensions.is_empty() {
        fallback()
    } else {
        extensions.to_vec()
    }
}

impl StandardPreset {
    /// Number of primary (concatenated) inputs this preset produces.
    pub fn primary_input_count(&self) -> usize {
        self.segments.len()
            + self.end_videos.count as usize
            + usize::from(self.outro_video.is_some())
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        self.output.resolution()?;
        validate_fps(self.output.fps)?;

        for (i, segment) in self.segments.iter().enumerate() {
            require_source(&segment.source, &format!("segment {}", i + 1))?;
            require_positive(segment.duration, &format!("segment {} duration", i + 1))?;
        }

        if self.end_videos.count > 0 {
            require_source(&self.end_videos.source, "endVideos")?;
            require_positive(self.end_videos.duration, "endVideos duration")?;
        }

        if let Some(outro) = &self.outro_video {
            require_source(&outro.source, "outroVideo")?;
            require_positive(outro.duration, "outroVideo duration")?;
        }

        if self.primary_input_count() == 0 {
            return Err(PresetError::invalid(
                "Preset has no segments, end videos, or outro to assemble",
            ));
        }

        let audio = self
            .audio
            .as_ref()
            .ok_or_else(|| PresetError::invalid("Missing audio configuration in preset"))?;
        require_source(&audio.source, "audio")?;
        require_positive(audio.duration, "audio duration")?;

        for (i, overlay) in self.text_overlays.iter().enumerate() {
            let label = format!("text overlay {}", i + 1);
            if overlay.text.is_empty() {
                return Err(PresetError::invalid(format!("{label} has empty text")));
            }
            validate_window(overlay.start_time, overlay.end_time, &label)?;
            if overlay.font_size == 0 {
                return Err(PresetError::invalid(format!("{label} font size must be > 0")));
            }
            let colors = [
                Some(&overlay.color),
                Some(&overlay.border_color),
                overlay.box_color.as_ref(),
            ];
            for color in colors.into_iter().flatten() {
                validate_color(color, &label)?;
            }
        }

        Ok(())
    }
}

impl ShortFormPreset {
    /// Timing for each image of the overlay pair, padded with defaults.
    pub fn overlay_edits(&self) -> Vec<ImageOverlayEdit> {
        let defaults = default_overlay_edits();
        (0..OVERLAY_PAIR)
            .map(|i| {
                self.edits
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| defaults[i].clone())
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        self.output.resolution()?;
        validate_fps(self.output.fps)?;
        require_source(&self.source.video, "source.video")?;
        require_source(&self.source.images, "source.images")?;

        if self.edits.len() > OVERLAY_PAIR {
            return Err(PresetError::invalid(format!(
                "Short-form presets take at most {OVERLAY_PAIR} overlay edits, found {}",
                self.edits.len()
            )));
        }

        for (i, edit) in self.edits.iter().enumerate() {
            let label = format!("overlay edit {}", i + 1);
            validate_window(edit.start_time, edit.end_time, &label)?;
            if !(0.0..=1.0).contains(&edit.opacity) {
                return Err(PresetError::invalid(format!(
                    "{label} opacity {} is outside [0, 1]",
                    edit.opacity
                )));
            }
            for expr in [&edit.x, &edit.y] {
                Position::parse(expr).map_err(|e| PresetError::invalid(format!("{label}: {e}")))?;
            }
        }

        Ok(())
    }
}

impl Preset {
    pub fn name(&self) -> &str {
        match self {
            Preset::Standard(p) => &p.name,
            Preset::ShortForm(p) => &p.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            Preset::Standard(p) => p.name = name,
            Preset::ShortForm(p) => p.name = name,
        }
    }

    pub fn output(&self) -> &OutputSettings {
        match self {
            Preset::Standard(p) => &p.output,
            Preset::ShortForm(p) => &p.output,
        }
    }

    /// Variant tag as stored on disk.
    pub fn kind(&self) -> &'static str {
        match self {
            Preset::Standard(_) => "standard",
            Preset::ShortForm(_) => "short_form",
        }
    }

    /// Check every field the renderer depends on. Runs before any media I/O.
    pub fn validate(&self) -> Result<(), PresetError> {
        match self {
            Preset::Standard(p) => p.validate(),
            Preset::ShortForm(p) => p.validate(),
        }
    }

    /// Decode a stored preset, classifying untagged legacy records once.
    ///
    /// Records without a `kind` tag are short-form when they name both a
    /// video and an image source directory or declare `metadata.platform ==
    /// "none"`; everything else is standard. A `{ "config": {...} }` wrapper
    /// is unwrapped first.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut value = match value {
            serde_json::Value::Object(mut map) if map.contains_key("config") => {
                let name = map.remove("name");
                let mut inner = map.remove("config").unwrap_or_default();
                if let (Some(name), Some(obj)) = (name, inner.as_object_mut()) {
                    obj.entry("name").or_insert(name);
                }
                inner
            }
            other => other,
        };

        if let Some(obj) = value.as_object_mut() {
            if !obj.contains_key("kind") {
                let kind = if looks_short_form(obj) {
                    "short_form"
                } else {
                    "standard"
                };
                obj.insert("kind".to_string(), serde_json::Value::from(kind));
            }
        }

        serde_json::from_value(value)
    }
}

fn looks_short_form(obj: &serde_json::Map<String, serde_json::Value>) -> bool {
    let has_sources = obj
        .get("source")
        .and_then(|s| s.as_object())
        .is_some_and(|s| s.contains_key("video") && s.contains_key("images"));
    let platform_none = obj
        .get("metadata")
        .and_then(|m| m.get("platform"))
        .and_then(|p| p.as_str())
        == Some("none");
    has_sources || platform_none
}

fn validate_fps(fps: u32) -> Result<(), PresetError> {
    if fps == 0 {
        return Err(PresetError::invalid("Output fps must be > 0"));
    }
    Ok(())
}

fn require_source(source: &std::path::Path, label: &str) -> Result<(), PresetError> {
    if source.as_os_str().is_empty() {
        return Err(PresetError::invalid(format!("{label} source directory is empty")));
    }
    Ok(())
}

fn require_positive(value: f64, label: &str) -> Result<(), PresetError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PresetError::invalid(format!("{label} must be > 0, got {value}")));
    }
    Ok(())
}

/// Colour names, `#rrggbb`/`0xrrggbb`, with optional `@alpha`.
fn validate_color(color: &str, label: &str) -> Result<(), PresetError> {
    let ok = !color.is_empty()
        && color
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '#' | '.' | '_'));
    if !ok {
        return Err(PresetError::invalid(format!("{label} has invalid colour {color:?}")));
    }
    Ok(())
}

fn validate_window(start: f64, end: f64, label: &str) -> Result<(), PresetError> {
    if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
        return Err(PresetError::invalid(format!(
            "{label} needs 0 <= startTime < endTime, got {start}..{end}"
        )));
    }
    Ok(())
}

fn default_count() -> u32 {
    1
}

fn default_font_size() -> u32 {
    70
}

fn default_text_color() -> String {
    "white".to_string()
}

fn default_border_color() -> String {
    "black".to_string()
}

fn default_overlay_opacity() -> f64 {
    0.5
}

fn default_overlay_x() -> String {
    "(W-w)/2".to_string()
}

fn default_overlay_y() -> String {
    "(H-h)/2".to_string()
}

pub fn default_video_extensions() -> Vec<String> {
    vec![".mp4".to_string(), ".mov".to_string()]
}

pub fn default_image_extensions() -> Vec<String> {
    vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()]
}

pub fn default_audio_extensions() -> Vec<String> {
    vec![".mp3".to_string(), ".wav".to_string()]
}

/// The two overlay flashes used when a short-form preset leaves them out.
pub fn default_overlay_edits() -> Vec<ImageOverlayEdit> {
    vec![
        ImageOverlayEdit::centered(1.2, 1.3, 0.5),
        ImageOverlayEdit::centered(2.7, 2.9, 0.5),
    ]
}

/// Built-in multi-segment preset seeded into an empty store.
pub fn default_standard_preset() -> Preset {
    let caption = |text: &str, start: f64, end: f64, y: Position| TextOverlay {
        text: text.to_string(),
        start_time: start,
        end_time: end,
        x: Position::Center,
        y,
        font_size: 70,
        color: "white".to_string(),
        border_color: "black".to_string(),
        border_width: 6,
        boxed: false,
        box_color: None,
        box_border_width: None,
    };

    let mut boxed = caption("Rinse and repeat", 3.6, 4.8, Position::Expr("h/2+50".to_string()));
    boxed.boxed = true;
    boxed.box_color = Some("black@1.0".to_string());
    boxed.box_border_width = Some(10);

    Preset::Standard(StandardPreset {
        name: "VideoEdit 1".to_string(),
        description: "Default video editing configuration".to_string(),
        count: 1,
        segments: vec![
            Segment {
                kind: SegmentKind::Video,
                source: PathBuf::from("clips"),
                extensions: default_video_extensions(),
                duration: 2.3,
            },
            Segment {
                kind: SegmentKind::Image,
                source: PathBuf::from("stills"),
                extensions: default_image_extensions(),
                duration: 1.3,
            },
            Segment {
                kind: SegmentKind::Image,
                source: PathBuf::from("shots"),
                extensions: default_image_extensions(),
                duration: 0.7,
            },
            Segment {
                kind: SegmentKind::Image,
                source: PathBuf::from("shots"),
                extensions: default_image_extensions(),
                duration: 0.5,
            },
        ],
        end_videos: EndVideos {
            source: PathBuf::from("broll"),
            count: 9,
            duration: 0.3778,
            extensions: default_video_extensions(),
        },
        outro_video: Some(ClipSpec {
            source: PathBuf::from("outro"),
            duration: 1.6,
            extensions: default_video_extensions(),
        }),
        audio: Some(AudioSpec {
            source: PathBuf::from("music"),
            duration: 10.6,
            extensions: default_audio_extensions(),
        }),
        text_overlays: vec![
            caption("Want to learn a new skill", 0.0, 2.3, Position::Pixels(180)),
            caption("in ten seconds?", 0.0, 2.3, Position::Pixels(240)),
            caption("Practice every day", 2.3, 3.6, Position::Expr("h-300".to_string())),
            boxed,
            caption("Enjoy the results", 4.8, 8.2, Position::Pixels(240)),
        ],
        output: OutputSettings {
            resolution: "1080x1920".to_string(),
            fps: 25,
            codec: "libx264".to_string(),
            preset: Some("fast".to_string()),
            crf: Some(23),
            ..OutputSettings::default()
        },
    })
}

/// Built-in short-form preset seeded into an empty store.
pub fn default_short_form_preset() -> Preset {
    let mut metadata = BTreeMap::new();
    metadata.insert("device".to_string(), serde_json::Value::from("iPhone 13"));
    metadata.insert("region".to_string(), serde_json::Value::from("Europe"));
    metadata.insert("platform".to_string(), serde_json::Value::from("none"));

    Preset::ShortForm(ShortFormPreset {
        name: "tiktok_iphone13_europe".to_string(),
        description: "Vertical re-encode with two overlay flashes".to_string(),
        source: SourceDirs {
            video: PathBuf::from("tiktokvideos"),
            images: PathBuf::from("tiktokimages"),
            video_extensions: default_video_extensions(),
            image_extensions: default_image_extensions(),
        },
        edits: default_overlay_edits(),
        metadata,
        output: OutputSettings {
            resolution: "1080x1920".to_string(),
            fps: 30,
            codec: "libx264".to_string(),
            video_bitrate: Some("12M".to_string()),
            faststart: true,
            ..OutputSettings::default()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn standard() -> StandardPreset {
        match default_standard_preset() {
            Preset::Standard(p) => p,
            Preset::ShortForm(_) => unreachable!(),
        }
    }

    #[test]
    fn test_defaults_validate() {
        default_standard_preset().validate().unwrap();
        default_short_form_preset().validate().unwrap();
    }

    #[test]
    fn test_missing_resolution_is_config_error() {
        let mut preset = standard();
        preset.output.resolution.clear();
        let err = Preset::Standard(preset).validate().unwrap_err();
        assert!(err.to_string().contains("Missing output resolution"));
    }

    #[test]
    fn test_overlay_window_must_be_ordered() {
        let mut preset = standard();
        preset.text_overlays[0].start_time = 3.0;
        preset.text_overlays[0].end_time = 3.0;
        assert!(Preset::Standard(preset).validate().is_err());
    }

    #[test]
    fn test_missing_audio_rejected() {
        let mut preset = standard();
        preset.audio = None;
        let err = Preset::Standard(preset).validate().unwrap_err();
        assert!(err.to_string().contains("audio"));
    }

    #[test]
    fn test_primary_input_count() {
        let preset = standard();
        assert_eq!(preset.primary_input_count(), 4 + 9 + 1);
    }

    #[test]
    fn test_position_parsing() {
        assert_eq!(Position::parse("center").unwrap(), Position::Center);
        assert_eq!(Position::parse("240").unwrap(), Position::Pixels(240));
        assert_eq!(
            Position::parse("h/2+50").unwrap(),
            Position::Expr("h/2+50".to_string())
        );
        assert!(Position::parse("h';drop").is_err());
        assert!(Position::parse("").is_err());
    }

    #[test]
    fn test_text_overlay_accepts_numbers_and_strings() {
        let overlay: TextOverlay = serde_json::from_value(json!({
            "text": "A",
            "startTime": 0,
            "endTime": 1,
            "x": "center",
            "y": 180,
            "box": true,
            "boxColor": "black@1.0"
        }))
        .unwrap();
        assert_eq!(overlay.x, Position::Center);
        assert_eq!(overlay.y, Position::Pixels(180));
        assert!(overlay.boxed);
        assert_eq!(overlay.font_size, 70);

        let value = serde_json::to_value(&overlay).unwrap();
        assert_eq!(value["x"], json!("center"));
        assert_eq!(value["box"], json!(true));
    }

    #[test]
    fn test_legacy_short_form_is_classified() {
        let preset = Preset::from_value(json!({
            "source": { "video": "tiktokvideos", "images": "tiktokimages" },
            "edits": [{ "type": "image_overlay", "startTime": 1.2, "endTime": 1.3, "opacity": 0.5, "randomImage": true }],
            "metadata": { "platform": "none" },
            "output": { "resolution": "1080x1920", "fps": 30, "codec": "libx264", "videoBitrate": "12M" }
        }))
        .unwrap();

        let Preset::ShortForm(short) = preset else {
            panic!("expected short-form preset");
        };
        let edits = short.overlay_edits();
        assert_eq!(edits.len(), OVERLAY_PAIR);
        assert_eq!(edits[0].start_time, 1.2);
        assert_eq!(edits[1].start_time, 2.7);
        assert_eq!(edits[1].x, "(W-w)/2");
    }

    #[test]
    fn test_legacy_standard_with_config_wrapper() {
        let preset = Preset::from_value(json!({
            "name": "Wrapped",
            "config": {
                "segments": [{ "type": "video", "source": "clips", "duration": 2.0 }],
                "audio": { "source": "music", "duration": 3.0 },
                "output": { "resolution": "640x360" }
            }
        }))
        .unwrap();
        assert_eq!(preset.kind(), "standard");
        assert_eq!(preset.name(), "Wrapped");
        preset.validate().unwrap();
    }

    #[test]
    fn test_tagged_round_trip_keeps_variant() {
        let value = serde_json::to_value(default_short_form_preset()).unwrap();
        assert_eq!(value["kind"], json!("short_form"));
        let back = Preset::from_value(value).unwrap();
        assert_eq!(back, default_short_form_preset());
    }

    #[test]
    fn test_short_form_rejects_extra_edits_and_bad_opacity() {
        let Preset::ShortForm(mut short) = default_short_form_preset() else {
            unreachable!()
        };
        short.edits.push(ImageOverlayEdit::centered(4.0, 5.0, 0.5));
        assert!(Preset::ShortForm(short.clone()).validate().is_err());

        short.edits.truncate(1);
        short.edits[0].opacity = 1.5;
        assert!(Preset::ShortForm(short).validate().is_err());
    }

    #[test]
    fn test_segment_default_extensions() {
        let segment: Segment =
            serde_json::from_value(json!({ "type": "image", "source": "stills", "duration": 1.0 }))
                .unwrap();
        assert_eq!(segment.effective_extensions(), default_image_extensions());
    }
}
