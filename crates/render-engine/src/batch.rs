//! Sequential short-form batch controller.
//!
//! Items run strictly one after another. A failing item is logged, reported
//! through the [`ProgressSink`] and recorded in the [`BatchReport`]; the
//! batch then moves on. Only an unusable input list or overlay pool, both
//! checked before the first item starts, fail the batch as a whole.
//! Cancellation is polled before each item and never interrupts a render
//! that is already running.

use std::path::{Path, PathBuf};

use rand::Rng;
use reelsmith_common::clock::JobClock;
use reelsmith_common::error::{ReelsmithError, ReelsmithResult};
use reelsmith_media_core::{list_files, media_pool};
use reelsmith_preset_model::ShortFormPreset;
use serde::Serialize;

use crate::compose::Composer;

/// Lifecycle stage reported for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Processing,
    Completed,
    Error,
}

/// Structured progress event, emitted when an item starts and when it ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// 1-based position in the batch.
    pub current: usize,
    pub total: usize,
    /// File name of the source clip.
    pub item: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Receives progress events and answers cancellation queries.
pub trait ProgressSink {
    fn emit(&self, event: &ProgressEvent);

    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn emit(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards events and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Terminal outcome of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Completed { output: PathBuf },
    Failed { kind: String, error: String },
    /// Not started because the batch was cancelled first.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-item results of a batch run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl BatchReport {
    /// Output paths of the items that completed.
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                ItemOutcome::Completed { output } => Some(output.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn completed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Completed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}

/// Every source clip in `dir` (or its `user` subdirectory), sorted by name.
pub fn discover_sources(
    dir: &Path,
    user: Option<&str>,
    extensions: &[String],
) -> ReelsmithResult<Vec<PathBuf>> {
    let dir = match user {
        Some(user) => dir.join(user),
        None => dir.to_path_buf(),
    };
    list_files(&dir, extensions)
}

impl<R: Rng + Send> Composer<R> {
    /// Render `sources` one at a time with `preset`, isolating failures.
    ///
    /// Returns `Err` only for batch-level problems found before the first
    /// item: an empty source list, an invalid preset, or fewer than two
    /// overlay images.
    pub async fn run_batch(
        &mut self,
        preset: &ShortFormPreset,
        sources: &[PathBuf],
        sink: &dyn ProgressSink,
    ) -> ReelsmithResult<BatchReport> {
        if sources.is_empty() {
            return Err(ReelsmithError::config("No videos found to process"));
        }
        preset.validate()?;
        let resolution = preset.output.resolution()?;

        let images_dir = self.config().resolve(&preset.source.images);
        let images = match media_pool(&images_dir, &preset.source.image_extensions) {
            Ok(pool) => pool,
            Err(ReelsmithError::EmptyPool { .. }) => Vec::new(),
            Err(err) => return Err(err),
        };
        if images.len() < 2 {
            return Err(ReelsmithError::InsufficientPool {
                required: 2,
                available: images.len(),
            });
        }

        let clock = JobClock::start();
        let total = sources.len();
        let mut report = BatchReport::default();
        tracing::info!(
            preset = %preset.name,
            total,
            images = images.len(),
            started = clock.epoch_wall(),
            "Starting batch"
        );

        for (index, source) in sources.iter().enumerate() {
            if sink.is_cancelled() {
                tracing::warn!(remaining = total - index, "Batch cancelled");
                report.cancelled = true;
                report
                    .items
                    .extend(sources[index..].iter().map(|source| ItemReport {
                        source: source.clone(),
                        outcome: ItemOutcome::Skipped,
                    }));
                break;
            }

            let current = index + 1;
            let item = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| source.display().to_string());
            sink.emit(&ProgressEvent {
                current,
                total,
                item: item.clone(),
                status: ItemStatus::Processing,
                error: None,
            });

            let result = self
                .render_short_form_item(preset, source, &images, resolution, None)
                .await;

            let outcome = match result {
                Ok(output) => {
                    tracing::info!(current, total, output = %output.display(), "Batch item completed");
                    sink.emit(&ProgressEvent {
                        current,
                        total,
                        item,
                        status: ItemStatus::Completed,
                        error: None,
                    });
                    ItemOutcome::Completed { output }
                }
                Err(err) => {
                    tracing::warn!(
                        current,
                        total,
                        input = %source.display(),
                        kind = err.kind(),
                        error = %err,
                        "Batch item failed"
                    );
                    sink.emit(&ProgressEvent {
                        current,
                        total,
                        item,
                        status: ItemStatus::Error,
                        error: Some(err.to_string()),
                    });
                    ItemOutcome::Failed {
                        kind: err.kind().to_string(),
                        error: err.to_string(),
                    }
                }
            };
            report.items.push(ItemReport {
                source: source.clone(),
                outcome,
            });
        }

        report.elapsed_secs = clock.elapsed_secs();
        tracing::info!(
            completed = report.completed(),
            failed = report.failed(),
            skipped = report.skipped(),
            elapsed_secs = report.elapsed_secs,
            "Batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_png, RecordingEncoder, StaticProbe};
    use reelsmith_common::config::AppConfig;
    use reelsmith_media_core::MediaSelector;
    use reelsmith_preset_model::{default_short_form_preset, Preset};
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;

    fn short_form() -> ShortFormPreset {
        match default_short_form_preset() {
            Preset::ShortForm(p) => p,
            Preset::Standard(_) => unreachable!(),
        }
    }

    fn composer(root: &Path, encoder: Arc<RecordingEncoder>) -> Composer {
        let config = AppConfig {
            media_root: root.to_path_buf(),
            ..AppConfig::default()
        };
        Composer::new(
            config,
            encoder,
            Arc::new(StaticProbe(0.0)),
            MediaSelector::seeded(5),
        )
    }

    fn fixture(root: &Path, preset: &ShortFormPreset, clips: usize, images: usize) -> Vec<PathBuf> {
        let video_dir = root.join(&preset.source.video);
        std::fs::create_dir_all(&video_dir).unwrap();
        for i in 0..images {
            write_png(&root.join(&preset.source.images).join(format!("img{i}.png")));
        }
        (0..clips)
            .map(|i| {
                let path = video_dir.join(format!("clip{}.mp4", i + 1));
                std::fs::write(&path, b"clip").unwrap();
                path
            })
            .collect()
    }

    struct CancelAfter {
        starts: Cell<usize>,
        limit: usize,
    }

    impl ProgressSink for CancelAfter {
        fn emit(&self, event: &ProgressEvent) {
            if event.status == ItemStatus::Processing {
                self.starts.set(self.starts.get() + 1);
            }
        }

        fn is_cancelled(&self) -> bool {
            self.starts.get() >= self.limit
        }
    }

    #[tokio::test]
    async fn test_empty_source_list_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let preset = short_form();
        let err = composer(dir.path(), Arc::new(RecordingEncoder::default()))
            .run_batch(&preset, &[], &NullSink)
            .await
            .unwrap_err();
        assert!(err.is_batch_fatal());
        assert!(matches!(err, ReelsmithError::Config { .. }));
    }

    #[tokio::test]
    async fn test_single_image_pool_is_fatal_before_any_item() {
        let dir = tempfile::tempdir().unwrap();
        let preset = short_form();
        let sources = fixture(dir.path(), &preset, 3, 1);
        let encoder = Arc::new(RecordingEncoder::default());
        let events = RefCell::new(Vec::new());
        let sink = |e: &ProgressEvent| events.borrow_mut().push(e.clone());

        let err = composer(dir.path(), encoder.clone())
            .run_batch(&preset, &sources, &sink)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReelsmithError::InsufficientPool {
                required: 2,
                available: 1
            }
        ));
        assert!(events.borrow().is_empty());
        assert!(encoder.requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_item_does_not_stop_batch() {
        let dir = tempfile::tempdir().unwrap();
        let preset = short_form();
        let mut sources = fixture(dir.path(), &preset, 2, 3);
        sources.insert(1, dir.path().join("gone.mp4"));

        let report = composer(dir.path(), Arc::new(RecordingEncoder::default()))
            .run_batch(&preset, &sources, &NullSink)
            .await
            .unwrap();
        assert_eq!(report.completed(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            &report.items[1].outcome,
            ItemOutcome::Failed { kind, .. } if kind == "not_found"
        ));
    }

    #[tokio::test]
    async fn test_render_failure_is_reported_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let preset = short_form();
        let sources = fixture(dir.path(), &preset, 3, 2);
        let encoder = Arc::new(RecordingEncoder::failing_on("clip2"));
        let events = RefCell::new(Vec::new());
        let sink = |event: &ProgressEvent| events.borrow_mut().push(event.clone());

        let report = composer(dir.path(), encoder.clone())
            .run_batch(&preset, &sources, &sink)
            .await
            .unwrap();

        assert_eq!(encoder.requests().len(), 3);
        assert_eq!(report.completed(), 2);
        assert!(matches!(
            &report.items[1].outcome,
            ItemOutcome::Failed { kind, error } if kind == "render" && error.contains("moov atom")
        ));
        let events = events.borrow();
        assert_eq!(events.len(), 6);
        assert_eq!(events[3].status, ItemStatus::Error);
        assert_eq!(events[3].item, "clip2.mp4");
        assert!(events[3].error.is_some());
        assert_eq!(events[5].status, ItemStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancellation_skips_remaining_items() {
        let dir = tempfile::tempdir().unwrap();
        let preset = short_form();
        let sources = fixture(dir.path(), &preset, 4, 2);
        let sink = CancelAfter {
            starts: Cell::new(0),
            limit: 2,
        };

        let report = composer(dir.path(), Arc::new(RecordingEncoder::default()))
            .run_batch(&preset, &sources, &sink)
            .await
            .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.completed(), 2);
        assert_eq!(report.skipped(), 2);
        assert_eq!(report.outputs().len(), 2);
    }

    #[test]
    fn test_discover_sources_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let user_dir = dir.path().join("alice");
        std::fs::create_dir_all(&user_dir).unwrap();
        for name in ["b.mov", "a.mp4", "notes.txt"] {
            std::fs::write(user_dir.join(name), b"x").unwrap();
        }
        let exts = vec![".mp4".to_string(), ".mov".to_string()];

        let found = discover_sources(dir.path(), Some("alice"), &exts).unwrap();
        assert_eq!(found, vec![user_dir.join("a.mp4"), user_dir.join("b.mov")]);
        assert!(discover_sources(dir.path(), Some("bob"), &exts)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_progress_event_json_shape() {
        let event = ProgressEvent {
            current: 1,
            total: 5,
            item: "clip1.mp4".to_string(),
            status: ItemStatus::Processing,
            error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "processing");
        assert!(json.get("error").is_none());
    }
}
