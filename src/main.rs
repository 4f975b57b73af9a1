mod cli;

use tunesmith::{
    archive::{ArchiveBuilder, UniqueNames},
    config,
    conversion::ConversionDispatcher,
    events::{Event, EventBus, QueueEvent},
    ingest,
    queue::{FileQueue, FileRecord, RecordStatus},
    AudioFormat, Error,
};
use tunesmith_av::{FfmpegLoader, SharedEngine, ToolRegistry};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ConvertArgs};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tunesmith=trace,tunesmith_av=trace,tunesmith_common=debug".to_string()
        } else {
            "tunesmith=info,tunesmith_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert(args, cli.config.as_deref()))
        }
        Commands::Formats => list_formats(),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tunesmith {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert(args: ConvertArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Command-line flags override the config file
    if let Some(format) = args.format {
        config.conversion.format = format;
    }
    if let Some(bitrate) = args.bitrate {
        config.conversion.bitrate = bitrate;
    }
    if let Some(jobs) = args.jobs {
        config.conversion.max_concurrent = jobs;
    }
    if let Some(ref dir) = args.out_dir {
        config.output.dir = dir.clone();
    }
    if let Some(name) = args.output.as_deref().and_then(Path::file_name) {
        config.output.archive_name = name.to_string_lossy().into_owned();
    }
    config::validate_config(&config)?;

    // `-o` with a directory part places the archive there; the output
    // directory still receives individual files.
    let archive_path = match args
        .output
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
    {
        Some(parent) => parent.join(&config.output.archive_name),
        None => config.output.archive_path(),
    };

    let files = ingest::load_paths(&args.files).await?;

    let events = Arc::new(EventBus::default());
    let queue = Arc::new(FileQueue::new(Arc::clone(&events)));
    let engine = Arc::new(SharedEngine::new(FfmpegLoader::new(config.tools.clone())));
    let dispatcher = ConversionDispatcher::new(
        Arc::clone(&queue),
        engine,
        config.conversion.max_concurrent,
    );

    let ids = ingest::accept_picked(&queue, files)?;
    tracing::info!(
        "Converting {} files to {} with up to {} at once",
        ids.len(),
        config.conversion.format,
        dispatcher.max_concurrent()
    );

    let reporter = tokio::spawn(report_progress(events.subscribe(), Arc::clone(&queue)));
    dispatcher.dispatch_idle(config.conversion.params());

    tokio::select! {
        _ = dispatcher.wait_all() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, discarding the batch");
            dispatcher.reset_all();
            reporter.abort();
            anyhow::bail!("Interrupted");
        }
    }
    reporter.abort();

    let records = queue.snapshot();
    print_summary(&records);

    match ArchiveBuilder::new().build(&records) {
        Ok(archive) => {
            archive
                .save(&archive_path)
                .await
                .with_context(|| format!("Failed to write archive {:?}", archive_path))?;
            println!(
                "\nWrote {} ({} files)",
                archive_path.display(),
                archive.len()
            );
            Ok(())
        }
        Err(Error::IncompleteArchive { pending, total }) => {
            write_outputs(&records, &config.output.dir).await?;
            let failed: Vec<&str> = records
                .iter()
                .filter(|r| r.status() != RecordStatus::Done)
                .map(|r| r.name())
                .collect();
            anyhow::bail!(
                "{} of {} files failed, no archive written: {}",
                pending,
                total,
                failed.join(", ")
            )
        }
        Err(e) => Err(e.into()),
    }
}

/// Log progress in 10% steps until the channel closes or the task is aborted.
async fn report_progress(mut rx: broadcast::Receiver<Event>, queue: Arc<FileQueue>) {
    let mut last_step: HashMap<tunesmith::RecordId, u32> = HashMap::new();
    let name_of = |id| {
        queue
            .get(id)
            .map(|r| r.name().to_string())
            .unwrap_or_else(|| id.to_string())
    };

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!("Progress reporter skipped {} events", n);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match event.payload {
            QueueEvent::ConversionProgress {
                record_id,
                progress,
            } => {
                let step = (progress / 10.0) as u32;
                if last_step.insert(record_id, step) != Some(step) {
                    tracing::info!("{}: {:.0}%", name_of(record_id), progress);
                }
            }
            QueueEvent::ConversionCompleted {
                record_id,
                output_name,
                size_bytes,
            } => {
                tracing::info!(
                    "{}: done -> {} ({} bytes)",
                    name_of(record_id),
                    output_name,
                    size_bytes
                );
            }
            QueueEvent::ConversionFailed { record_id, error } => {
                tracing::error!("{}: {}", name_of(record_id), error);
            }
            _ => {}
        }
    }
}

fn print_summary(records: &[FileRecord]) {
    println!();
    for record in records {
        let detail = match record.status() {
            RecordStatus::Done => record
                .output()
                .map(|o| format!("-> {} ({} bytes)", o.name, o.bytes.len()))
                .unwrap_or_default(),
            RecordStatus::Error => record.error().unwrap_or_default().to_string(),
            RecordStatus::Converting => {
                format!("{:.0}%", record.progress().unwrap_or_default())
            }
            RecordStatus::Idle => String::new(),
        };
        let mark = match record.status() {
            RecordStatus::Done => "✓",
            RecordStatus::Error => "✗",
            _ => "·",
        };
        println!("{} {:<40} {}", mark, record.name(), detail);
    }
}

/// Save every finished output as its own file in `dir`.
async fn write_outputs(records: &[FileRecord], dir: &Path) -> Result<()> {
    if records.iter().all(|r| r.output().is_none()) {
        return Ok(());
    }
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let mut names = UniqueNames::default();
    for output in records.iter().filter_map(|r| r.output()) {
        let path = dir.join(names.claim(&output.name));
        tokio::fs::write(&path, &output.bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn list_formats() -> Result<()> {
    println!("{:<6} {:<10} {:<12} {}", "FORMAT", "EXTENSION", "CONTAINER", "BITRATE");
    for format in AudioFormat::ALL {
        println!(
            "{:<6} {:<10} {:<12} {}",
            format.token(),
            format.extension(),
            format.container(),
            if format.is_lossy() { "yes" } else { "ignored" }
        );
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to convert files.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!("  Format: {}", config.conversion.format);
    println!("  Bitrate: {} kbps", config.conversion.bitrate);
    println!("  Max concurrent: {}", config.conversion.max_concurrent);
    println!("  Timeout: {}s", config.tools.timeout_secs);
    println!("  Archive: {}", config.output.archive_path().display());

    Ok(())
}
