//! Render invocation: one filter graph, one engine process, one output file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use rand::Rng;
use reelsmith_common::clock::format_secs;
use reelsmith_common::config::EngineConfig;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_media_core::MediaSelector;
use reelsmith_preset_model::{OutputSettings, Resolution};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::builder::GraphPlan;

/// How many trailing stderr lines a render error carries.
const STDERR_TAIL_LINES: usize = 20;

/// One engine input file with optional seek/trim.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    pub path: PathBuf,
    /// `-ss` before the input.
    pub seek: Option<f64>,
    /// `-t` before the input.
    pub duration: Option<f64>,
}

impl MediaInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seek: None,
            duration: None,
        }
    }

    pub fn trimmed(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::new(path)
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(seek) = self.seek {
            args.push("-ss".to_string());
            args.push(format_secs(seek));
        }
        if let Some(duration) = self.duration {
            args.push("-t".to_string());
            args.push(format_secs(duration));
        }
        args.push("-i".to_string());
        args.push(self.path.to_string_lossy().into_owned());
        args
    }
}

/// Where the output's audio track comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// Silent output.
    None,
    /// A dedicated audio input appended after the graph inputs.
    Dedicated(MediaInput),
    /// The audio of one of the graph inputs, if it has any.
    FromInput(usize),
}

/// Output encoding parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputParams {
    pub codec: String,
    pub preset: Option<String>,
    pub crf: Option<u8>,
    pub video_bitrate: Option<String>,
    pub fps: u32,
    pub pixel_format: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub faststart: bool,
    /// Stop at the shortest mapped stream.
    pub shortest: bool,
}

impl OutputParams {
    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self {
            codec: settings.codec.clone(),
            preset: settings.preset.clone(),
            crf: settings.crf,
            video_bitrate: settings.video_bitrate.clone(),
            fps: settings.fps,
            pixel_format: settings.pixel_format.clone(),
            audio_codec: settings.audio_codec.clone(),
            audio_bitrate: settings.audio_bitrate.clone(),
            faststart: settings.faststart,
            shortest: false,
        }
    }

    fn args(&self, with_audio: bool) -> Vec<String> {
        let mut args = vec!["-c:v".to_string(), self.codec.clone()];
        if let Some(preset) = &self.preset {
            args.extend(["-preset".to_string(), preset.clone()]);
        }
        if let Some(crf) = self.crf {
            args.extend(["-crf".to_string(), crf.to_string()]);
        }
        if let Some(bitrate) = &self.video_bitrate {
            args.extend(["-b:v".to_string(), bitrate.clone()]);
        }
        args.extend([
            "-r".to_string(),
            self.fps.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
        ]);
        if with_audio {
            args.extend([
                "-c:a".to_string(),
                self.audio_codec.clone(),
                "-b:a".to_string(),
                self.audio_bitrate.clone(),
            ]);
        }
        if self.faststart {
            args.extend(["-movflags".to_string(), "+faststart".to_string()]);
        }
        if self.shortest {
            args.push("-shortest".to_string());
        }
        args
    }
}

/// Everything the engine needs for one output file.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// Graph inputs; input index `i` is `inputs[i]`.
    pub inputs: Vec<MediaInput>,
    pub audio: AudioSource,
    pub plan: GraphPlan,
    pub output: OutputParams,
    pub output_path: PathBuf,
}

impl RenderRequest {
    /// Engine input index of the dedicated audio input.
    pub fn audio_input_index(&self) -> Option<usize> {
        match self.audio {
            AudioSource::Dedicated(_) => Some(self.inputs.len()),
            _ => None,
        }
    }

    /// Expected output length, when it is known up front.
    pub fn expected_duration_secs(&self) -> Option<f64> {
        match &self.audio {
            AudioSource::Dedicated(input) => input.duration,
            _ => None,
        }
    }

    /// Engine arguments after the global flags.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for input in &self.inputs {
            args.extend(input.args());
        }
        if let AudioSource::Dedicated(audio) = &self.audio {
            args.extend(audio.args());
        }

        args.push("-filter_complex".to_string());
        args.push(self.plan.filter_complex());
        args.push("-map".to_string());
        args.push(self.plan.final_label.to_string());

        let with_audio = match &self.audio {
            AudioSource::None => false,
            AudioSource::Dedicated(_) => {
                args.push("-map".to_string());
                args.push(format!("{}:a", self.inputs.len()));
                true
            }
            AudioSource::FromInput(index) => {
                args.push("-map".to_string());
                args.push(format!("{index}:a?"));
                true
            }
        };

        args.extend(self.output.args(with_audio));
        args.push(self.output_path.to_string_lossy().into_owned());
        args
    }
}

/// Encoder progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    /// Current progress [0.0, 1.0]; 0 when the expected length is unknown.
    pub progress: f64,
    pub out_time_secs: f64,
    pub complete: bool,
}

/// Progress callback for a single encode.
pub type EncodeProgressCallback = Box<dyn Fn(EncodeProgress) + Send + Sync>;

/// The external encoding engine.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Run one encode to completion.
    async fn encode(
        &self,
        request: &RenderRequest,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<()>;

    /// Write a single frame at `at_secs` scaled into `size`.
    async fn extract_frame(
        &self,
        video: &Path,
        at_secs: f64,
        size: Resolution,
        output: &Path,
    ) -> ReelsmithResult<()>;

    /// First line of the engine's version banner.
    async fn version(&self) -> ReelsmithResult<String>;

    fn name(&self) -> &str;
}

/// Media duration probe.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration_secs(&self, path: &Path) -> ReelsmithResult<f64>;

    async fn version(&self) -> ReelsmithResult<String>;
}

/// Run `request` and return the written output path.
///
/// Fails with [`ReelsmithError::Render`] carrying the engine diagnostics.
pub async fn render(
    encoder: &dyn Encoder,
    request: &RenderRequest,
    progress: Option<EncodeProgressCallback>,
) -> ReelsmithResult<PathBuf> {
    if let Some(parent) = request.output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    tracing::info!(
        encoder = encoder.name(),
        inputs = request.inputs.len(),
        output = %request.output_path.display(),
        final_label = request.plan.final_label.as_str(),
        "Starting render"
    );
    let started = std::time::Instant::now();

    encoder.encode(request, progress).await?;

    if !request.output_path.exists() {
        return Err(ReelsmithError::render(format!(
            "{} reported success but {} was not written",
            encoder.name(),
            request.output_path.display()
        )));
    }

    tracing::info!(
        output = %request.output_path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Render finished"
    );
    Ok(request.output_path.clone())
}

/// Choose a uniformly random window of `required` seconds inside a track of
/// `total` seconds.
pub fn sample_audio_window<R: Rng>(
    path: &Path,
    total: f64,
    required: f64,
    selector: &mut MediaSelector<R>,
) -> ReelsmithResult<MediaInput> {
    if total < required {
        return Err(ReelsmithError::AudioTooShort {
            path: path.to_path_buf(),
            actual_secs: total,
            required_secs: required,
        });
    }
    let start = selector.offset_within(total - required);
    Ok(MediaInput {
        path: path.to_path_buf(),
        seek: Some(start),
        duration: Some(required),
    })
}

/// Probe `path` and sample a window of `required` seconds from it.
pub async fn probe_and_sample_audio<R: Rng + Send>(
    probe: &dyn MediaProbe,
    path: &Path,
    required: f64,
    selector: &mut MediaSelector<R>,
) -> ReelsmithResult<MediaInput> {
    let total = probe.duration_secs(path).await?;
    let input = sample_audio_window(path, total, required, selector)?;
    tracing::debug!(
        audio = %path.display(),
        total_secs = total,
        start_secs = input.seek.unwrap_or_default(),
        "Sampled audio window"
    );
    Ok(input)
}

/// ffmpeg driven through `tokio::process`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.ffmpeg_path)
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(
        &self,
        request: &RenderRequest,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<()> {
        let mut args: Vec<String> = ["-hide_banner", "-y", "-nostats", "-progress", "pipe:1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.extend(request.to_args());
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ReelsmithError::render(format!("Failed to start ffmpeg: {e}")))?;

        tracing::debug!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelsmithError::render("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelsmithError::render("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let expected = request.expected_duration_secs().unwrap_or(0.0);
        let mut state = ProgressState::default();
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ReelsmithError::render(format!("Failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let Some(cb) = &progress {
                    cb(state.report(expected));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ReelsmithError::render(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ReelsmithError::render(format!(
                "ffmpeg failed ({status}): {}",
                tail_lines(&stderr_output, STDERR_TAIL_LINES)
            )));
        }
        Ok(())
    }

    async fn extract_frame(
        &self,
        video: &Path,
        at_secs: f64,
        size: Resolution,
        output: &Path,
    ) -> ReelsmithResult<()> {
        let fit = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = size.width,
            h = size.height
        );
        let mut cmd = Command::new(&self.binary);
        let at = format_secs(at_secs);
        cmd.args(["-hide_banner", "-y", "-ss", at.as_str(), "-i"])
            .arg(video)
            .args(["-frames:v", "1", "-vf", fit.as_str()])
            .arg(output);
        run_to_completion(cmd, "ffmpeg").await.map(|_| ())
    }

    async fn version(&self) -> ReelsmithResult<String> {
        engine_version(&self.binary).await
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// ffprobe driven through `tokio::process`.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.ffprobe_path)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn duration_secs(&self, path: &Path) -> ReelsmithResult<f64> {
        let mut cmd = Command::new(&self.binary);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path);
        let stdout = run_to_completion(cmd, "ffprobe").await?;
        parse_duration(&stdout).ok_or_else(|| {
            ReelsmithError::render(format!(
                "ffprobe returned no duration for {}: {:?}",
                path.display(),
                stdout.trim()
            ))
        })
    }

    async fn version(&self) -> ReelsmithResult<String> {
        engine_version(&self.binary).await
    }
}

fn parse_duration(stdout: &str) -> Option<f64> {
    let secs = stdout.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs >= 0.0).then_some(secs)
}

/// First line of `<binary> -version`.
pub async fn engine_version(binary: &Path) -> ReelsmithResult<String> {
    let mut cmd = Command::new(binary);
    cmd.arg("-version");
    let name = binary.to_string_lossy().into_owned();
    let stdout = run_to_completion(cmd, &name).await?;
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

async fn run_to_completion(mut cmd: Command, name: &str) -> ReelsmithResult<String> {
    let output = cmd
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ReelsmithError::render(format!("Failed to start {name}: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReelsmithError::render(format!(
            "{name} failed ({}): {}",
            output.status,
            tail_lines(&stderr, STDERR_TAIL_LINES)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Both are microseconds despite the name.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn report(&self, expected_duration_secs: f64) -> EncodeProgress {
        let progress = if self.complete {
            1.0
        } else if expected_duration_secs <= 0.0 {
            0.0
        } else {
            (self.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
        };
        EncodeProgress {
            progress,
            out_time_secs: self.out_time_secs,
            complete: self.complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{GraphBuilder, GraphInput};
    use proptest::prelude::*;

    fn request(audio: AudioSource) -> RenderRequest {
        let plan = GraphBuilder::new(Resolution::new(640, 360))
            .build(&[GraphInput::Video, GraphInput::Still { duration: 1.0 }], &[])
            .unwrap();
        RenderRequest {
            inputs: vec![
                MediaInput::trimmed("clips/a.mp4", 2.0),
                MediaInput::new("stills/b_converted.jpg"),
            ],
            audio,
            plan,
            output: OutputParams {
                shortest: true,
                ..OutputParams::from_settings(&OutputSettings {
                    resolution: "640x360".to_string(),
                    preset: Some("fast".to_string()),
                    crf: Some(23),
                    ..OutputSettings::default()
                })
            },
            output_path: PathBuf::from("out/output_1.mp4"),
        }
    }

    #[test]
    fn test_dedicated_audio_is_mapped_after_inputs() {
        let audio = MediaInput {
            path: PathBuf::from("music/track.mp3"),
            seek: Some(4.25),
            duration: Some(10.6),
        };
        let req = request(AudioSource::Dedicated(audio));
        assert_eq!(req.audio_input_index(), Some(2));

        let args = req.to_args();
        let joined = args.join(" ");
        assert!(joined.starts_with(
            "-t 2 -i clips/a.mp4 -i stills/b_converted.jpg -ss 4.25 -t 10.6 -i music/track.mp3 -filter_complex "
        ));
        assert!(joined.contains("-map [cat] -map 2:a -c:v libx264 -preset fast -crf 23 -r 25 -pix_fmt yuv420p -c:a aac -b:a 192k -shortest out/output_1.mp4"));
    }

    #[test]
    fn test_source_audio_is_optional_map() {
        let args = request(AudioSource::FromInput(0)).to_args();
        let map_pos = args.iter().rposition(|a| a == "-map").unwrap();
        assert_eq!(args[map_pos + 1], "0:a?");
    }

    #[test]
    fn test_silent_output_has_no_audio_codec() {
        let args = request(AudioSource::None).to_args();
        assert!(!args.contains(&"-c:a".to_string()));
        assert_eq!(args.iter().filter(|a| *a == "-map").count(), 1);
    }

    #[test]
    fn test_audio_too_short() {
        let mut selector = MediaSelector::seeded(1);
        let err = sample_audio_window(Path::new("a.mp3"), 5.0, 10.0, &mut selector).unwrap_err();
        assert!(matches!(
            err,
            ReelsmithError::AudioTooShort {
                actual_secs,
                required_secs,
                ..
            } if actual_secs == 5.0 && required_secs == 10.0
        ));
    }

    #[test]
    fn test_exact_length_audio_starts_at_zero() {
        let mut selector = MediaSelector::seeded(1);
        let input = sample_audio_window(Path::new("a.mp3"), 10.0, 10.0, &mut selector).unwrap();
        assert_eq!(input.seek, Some(0.0));
        assert_eq!(input.duration, Some(10.0));
    }

    #[test]
    fn test_progress_state_parsing() {
        let mut state = ProgressState::default();
        state.update("out_time_us", "5000000");
        state.update("progress", "continue");
        let report = state.report(10.0);
        assert_eq!(report.out_time_secs, 5.0);
        assert_eq!(report.progress, 0.5);

        state.update("progress", "end");
        assert_eq!(state.report(10.0).progress, 1.0);
    }

    #[test]
    fn test_parse_duration_and_tail() {
        assert_eq!(parse_duration("20.500000\n"), Some(20.5));
        assert_eq!(parse_duration("N/A\n"), None);
        assert_eq!(tail_lines("a\nb\nc\n", 2), "b\nc");
    }

    proptest! {
        #[test]
        fn prop_audio_offset_within_window(total in 10.0f64..600.0, seed in any::<u64>()) {
            let required = 10.0;
            let mut selector = MediaSelector::seeded(seed);
            let input = sample_audio_window(Path::new("a.mp3"), total, required, &mut selector).unwrap();
            let start = input.seek.unwrap();
            prop_assert!(start >= 0.0 && start <= total - required);
        }
    }
}
