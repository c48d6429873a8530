use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::sync::watch;

use hlvs::core::config::SummarizerConfig;
use hlvs::core::pipeline::{Orchestrator, PipelineSnapshot, RunStatus};
use hlvs::core::remote::GeminiTransport;
use hlvs::core::video::FfmpegSource;

#[derive(Parser)]
#[command(author, version, about = "Hierarchical logic-aware video summarization", long_about = None)]
struct Args {
    /// Video file to summarize
    video: PathBuf,
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides api.api_key / HLVS_API_KEY
    #[arg(long)]
    api_key: Option<String>,
    #[arg(short, long)]
    model: Option<String>,
    /// Number of frames to sample
    #[arg(short, long)]
    frames: Option<usize>,
    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    env_logger::builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .write_style(env_logger::WriteStyle::Auto)
        .target(env_logger::Target::Stderr)
        .init();

    let mut config = SummarizerConfig::load(args.config.as_deref())?;
    if let Some(key) = args.api_key {
        config.api.api_key = key;
    }
    if let Some(model) = args.model {
        config.api.model = model;
    }
    if let Some(frames) = args.frames {
        config.sampling.frame_count = frames;
    }
    config.validate()?;
    config.require_api_key()?;

    let source = FfmpegSource::open(&args.video, config.ffmpeg.clone())
        .await
        .with_context(|| format!("cannot open {}", args.video.display()))?;

    let transport = GeminiTransport::new(config.api.endpoint());
    let mut orchestrator = Orchestrator::from_config(transport, &config);
    orchestrator.set_video_source(Box::new(source));

    let printer = tokio::spawn(print_updates(orchestrator.subscribe()));
    let status = orchestrator.start().await;
    let snapshot = orchestrator.snapshot();
    drop(orchestrator);
    printer.await?;
    info!("Run finished: {}", status.name());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_results(&snapshot);
    }

    Ok(if status == RunStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// 把新增的日志行和进度写到 stderr，发送端关闭后退出
async fn print_updates(mut rx: watch::Receiver<PipelineSnapshot>) {
    let mut printed = 0;
    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        for entry in snapshot.logs.iter().skip(printed) {
            eprintln!("{:>3}% {}", snapshot.progress, entry);
        }
        printed = snapshot.logs.len();
    }
}

fn print_results(snapshot: &PipelineSnapshot) {
    println!("Status: {}", snapshot.status.name());
    if !snapshot.captions.is_empty() {
        println!("\n== Event captions ==");
        for caption in &snapshot.captions {
            println!("\n[{}]\n{}", caption.label(), caption.text);
        }
    }
    if let Some(chain) = &snapshot.logical_chain {
        println!("\n== Logical chain ==\n{}", chain);
    }
    if let Some(summary) = &snapshot.summary {
        println!("\n== Summary ==\n{}", summary);
    }
}
