//! Sequential short-form batch with Ctrl-C cancellation.

use std::path::PathBuf;

use reelsmith_common::config::AppConfig;
use reelsmith_preset_model::Preset;
use reelsmith_render_engine::{
    discover_sources, Composer, ItemStatus, JobRegistry, JobStatus, ProgressEvent,
};

pub async fn run(
    config: AppConfig,
    seed: Option<u64>,
    name: String,
    user: Option<String>,
    files: Vec<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let store = super::open_store(&config)?;
    let preset = match store
        .load(&name)
        .map_err(|e| anyhow::anyhow!("Failed to load preset: {e}"))?
    {
        Preset::ShortForm(preset) => preset,
        Preset::Standard(_) => {
            anyhow::bail!("Preset '{name}' is a standard preset; batch needs a short-form preset")
        }
    };

    let video_dir = config.resolve(&preset.source.video);
    let base_dir = match &user {
        Some(user) => video_dir.join(user),
        None => video_dir.clone(),
    };
    let sources = if files.is_empty() {
        discover_sources(&video_dir, user.as_deref(), &preset.source.video_extensions)?
    } else {
        files
            .into_iter()
            .map(|f| if f.is_absolute() || f.exists() { f } else { base_dir.join(f) })
            .collect()
    };

    println!(
        "Batch '{name}': {} clip(s) from {}",
        sources.len(),
        base_dir.display()
    );

    let registry = JobRegistry::new();
    let job = registry.register(format!("batch {name}"));
    let ctrl_c_registry = registry.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after the current clip...");
            ctrl_c_registry.cancel_all();
        }
    });

    let print_event = move |event: &ProgressEvent| {
        if json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
            return;
        }
        match event.status {
            ItemStatus::Processing => {
                println!("[{}/{}] {} ...", event.current, event.total, event.item)
            }
            ItemStatus::Completed => {
                println!("[{}/{}] {} done", event.current, event.total, event.item)
            }
            ItemStatus::Error => println!(
                "[{}/{}] {} FAILED: {}",
                event.current,
                event.total,
                event.item,
                event.error.as_deref().unwrap_or("unknown error")
            ),
        }
    };

    let mut composer = Composer::from_config(config, seed);
    let sink = job.sink(print_event);
    let report = match composer.run_batch(&preset, &sources, &sink).await {
        Ok(report) => report,
        Err(e) => {
            job.set_status(JobStatus::Failed {
                message: e.to_string(),
            });
            return Err(e.into());
        }
    };
    job.set_status(if report.cancelled {
        JobStatus::Cancelled
    } else {
        JobStatus::Finished
    });

    println!();
    println!(
        "Completed {} of {} ({} failed, {} skipped) in {:.1}s",
        report.completed(),
        report.items.len(),
        report.failed(),
        report.skipped(),
        report.elapsed_secs
    );
    for output in report.outputs() {
        println!("  {}", output.display());
    }

    Ok(())
}
