//! Single-video composition for both preset variants.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use reelsmith_common::clock::output_stamp;
use reelsmith_common::config::AppConfig;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_media_core::{media_pool, normalize_image, MediaSelector};
use reelsmith_preset_model::{
    Preset, Resolution, SegmentKind, ShortFormPreset, StandardPreset, OVERLAY_PAIR,
};

use crate::builder::{GraphBuilder, GraphInput};
use crate::render::{
    probe_and_sample_audio, render, AudioSource, EncodeProgressCallback, Encoder, FfmpegEncoder,
    FfprobeProbe, MediaInput, MediaProbe, OutputParams, RenderRequest,
};

/// Assembles videos from presets.
///
/// Owns the random source, so a seeded composer repeats its picks.
pub struct Composer<R = StdRng> {
    config: AppConfig,
    encoder: Arc<dyn Encoder>,
    probe: Arc<dyn MediaProbe>,
    selector: MediaSelector<R>,
}

impl Composer<StdRng> {
    /// Composer backed by the configured ffmpeg/ffprobe binaries.
    pub fn from_config(config: AppConfig, seed: Option<u64>) -> Self {
        let encoder = Arc::new(FfmpegEncoder::from_config(&config.engine));
        let probe = Arc::new(FfprobeProbe::from_config(&config.engine));
        let selector = match seed {
            Some(seed) => MediaSelector::seeded(seed),
            None => MediaSelector::from_entropy(),
        };
        Self::new(config, encoder, probe, selector)
    }
}

impl<R: Rng + Send> Composer<R> {
    pub fn new(
        config: AppConfig,
        encoder: Arc<dyn Encoder>,
        probe: Arc<dyn MediaProbe>,
        selector: MediaSelector<R>,
    ) -> Self {
        Self {
            config,
            encoder,
            probe,
            selector,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn encoder(&self) -> &dyn Encoder {
        self.encoder.as_ref()
    }

    /// Render one video from `preset`.
    ///
    /// Errors surface immediately; there is no per-step isolation here.
    pub async fn compose(
        &mut self,
        preset: &Preset,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<PathBuf> {
        tracing::info!(preset = preset.name(), kind = preset.kind(), "Composing video");
        match preset {
            Preset::Standard(standard) => self.compose_standard(standard, progress).await,
            Preset::ShortForm(short) => self.compose_short_form(short, progress).await,
        }
    }

    /// Segments, end clips and outro concatenated under a sampled music bed
    /// with timed captions.
    pub async fn compose_standard(
        &mut self,
        preset: &StandardPreset,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<PathBuf> {
        preset.validate()?;
        let resolution = preset.output.resolution()?;

        let mut inputs = Vec::with_capacity(preset.primary_input_count());
        let mut graph_inputs = Vec::with_capacity(preset.primary_input_count());

        for (i, segment) in preset.segments.iter().enumerate() {
            let dir = self.config.resolve(&segment.source);
            let picked = self.selector.select(&dir, &segment.effective_extensions())?;
            tracing::debug!(index = i, kind = ?segment.kind, input = %picked.display(), "Segment source");
            match segment.kind {
                SegmentKind::Video => {
                    inputs.push(MediaInput::trimmed(picked, segment.duration));
                    graph_inputs.push(GraphInput::Video);
                }
                SegmentKind::Image => {
                    inputs.push(MediaInput::new(normalize_image(picked).await?));
                    graph_inputs.push(GraphInput::Still {
                        duration: segment.duration,
                    });
                }
            }
        }

        let end = &preset.end_videos;
        if end.count > 0 {
            let dir = self.config.resolve(&end.source);
            let clips = self
                .selector
                .select_many(&dir, &end.effective_extensions(), end.count as usize)?;
            for clip in clips {
                inputs.push(MediaInput::trimmed(clip, end.duration));
                graph_inputs.push(GraphInput::Video);
            }
        }

        if let Some(outro) = &preset.outro_video {
            let dir = self.config.resolve(&outro.source);
            let clip = self.selector.select(&dir, &outro.effective_extensions())?;
            inputs.push(MediaInput::trimmed(clip, outro.duration));
            graph_inputs.push(GraphInput::Video);
        }

        for input in &inputs {
            if !input.path.exists() {
                return Err(ReelsmithError::not_found(&input.path));
            }
        }

        let audio_spec = preset
            .audio
            .as_ref()
            .ok_or_else(|| ReelsmithError::config("Missing audio configuration in preset"))?;
        let audio_dir = self.config.resolve(&audio_spec.source);
        let track = self
            .selector
            .select(&audio_dir, &audio_spec.effective_extensions())?;
        let audio = probe_and_sample_audio(
            self.probe.as_ref(),
            &track,
            audio_spec.duration,
            &mut self.selector,
        )
        .await?;

        let plan = self
            .graph_builder(resolution)
            .build(&graph_inputs, &preset.text_overlays)?;

        let request = RenderRequest {
            inputs,
            audio: AudioSource::Dedicated(audio),
            plan,
            output: OutputParams {
                shortest: true,
                ..OutputParams::from_settings(&preset.output)
            },
            output_path: self
                .config
                .resolve(&self.config.standard_output_dir)
                .join(format!("output_{}.mp4", output_stamp())),
        };
        render(self.encoder.as_ref(), &request, progress).await
    }

    /// One random source clip with the translucent overlay pair.
    pub async fn compose_short_form(
        &mut self,
        preset: &ShortFormPreset,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<PathBuf> {
        preset.validate()?;
        let resolution = preset.output.resolution()?;

        let video_dir = self.config.resolve(&preset.source.video);
        let source = self
            .selector
            .select(&video_dir, &preset.source.video_extensions)?;
        let images = media_pool(
            &self.config.resolve(&preset.source.images),
            &preset.source.image_extensions,
        )?;

        self.render_short_form_item(preset, &source, &images, resolution, progress)
            .await
    }

    /// The per-clip short-form pipeline shared with the batch controller:
    /// draw two distinct images, normalize them, build and render.
    pub(crate) async fn render_short_form_item(
        &mut self,
        preset: &ShortFormPreset,
        source: &Path,
        images: &[PathBuf],
        resolution: Resolution,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelsmithResult<PathBuf> {
        if !source.is_file() {
            return Err(ReelsmithError::not_found(source));
        }

        let (first, second) = self.selector.select_two_distinct(images)?;
        let picked = [first.clone(), second.clone()];

        let mut inputs = vec![MediaInput::new(source)];
        let mut graph_inputs = vec![GraphInput::Video];
        for (image, edit) in picked.into_iter().zip(preset.overlay_edits()) {
            let still = normalize_image(image).await?;
            inputs.push(MediaInput::new(still));
            graph_inputs.push(GraphInput::OverlayImage(edit));
        }
        debug_assert_eq!(inputs.len(), 1 + OVERLAY_PAIR);

        let plan = self.graph_builder(resolution).build(&graph_inputs, &[])?;

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        let request = RenderRequest {
            inputs,
            audio: AudioSource::FromInput(0),
            plan,
            output: OutputParams {
                faststart: true,
                ..OutputParams::from_settings(&preset.output)
            },
            output_path: self
                .config
                .resolve(&self.config.short_form_output_dir)
                .join(format!("tiktok_{stem}_{}.mp4", output_stamp())),
        };
        render(self.encoder.as_ref(), &request, progress).await
    }

    fn graph_builder(&self, resolution: Resolution) -> GraphBuilder {
        GraphBuilder::new(resolution).with_font_file(self.config.engine.font_file.clone())
    }
}
