mod analysis;
mod capture;
mod console;
mod error;
mod output;
mod session;

use analysis::{GeminiAnalyzer, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use anyhow::{bail, Context, Result};
use capture::{MediaController, NokhwaBackend, SurfaceMount};
use clap::{Parser, ValueEnum};
use output::{DashboardSink, JsonLinesSink, TerminalDashboard};
use session::{CycleOutcome, Session};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Terminal,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Analyze this image file instead of the camera
    #[arg(short, long)]
    upload: Option<PathBuf>,

    /// Number of live capture-and-analyze cycles
    #[arg(long, default_value_t = 1)]
    captures: u32,

    /// Seconds to wait between live captures
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Drive capture, upload and reset from stdin
    #[arg(short, long, conflicts_with = "upload")]
    interactive: bool,

    /// Gemini API key (falls back to API_KEY)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Analysis model name
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generative language API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    api_base_url: String,

    /// Abort an analysis request after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Presentation format
    #[arg(long, value_enum, default_value_t = OutputFormat::Terminal)]
    output: OutputFormat,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn gemini_config(&self) -> Result<GeminiConfig> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var("API_KEY").ok())
            .context("No API key: pass --api-key or set GEMINI_API_KEY")?;

        Ok(GeminiConfig {
            api_key,
            model: self.model.clone(),
            base_url: self.api_base_url.clone(),
            timeout: self.timeout_secs.map(Duration::from_secs),
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Lumina starting");

    let analyzer = GeminiAnalyzer::new(args.gemini_config()?)
        .context("Failed to initialize analysis client")?;

    // The dashboard is the preview surface; it is ready as soon as we start
    let surface = SurfaceMount::default();
    let controller = MediaController::new(Box::new(NokhwaBackend::new()), surface.clone());
    let session = Session::new(controller, Box::new(analyzer));

    let mut sink: Box<dyn DashboardSink> = match args.output {
        OutputFormat::Terminal => Box::new(TerminalDashboard::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
    };

    surface.mount();
    let result = run(&args, &session, &mut *sink).await;

    session.release_camera().await;
    surface.unmount();
    tracing::info!("Lumina stopped");

    result
}

async fn run(args: &Args, session: &Session, sink: &mut dyn DashboardSink) -> Result<()> {
    if let Some(path) = &args.upload {
        tracing::info!("Upload mode: {}", path.display());
        let outcome = session.accept_uploaded_file(path).await;
        sink.present(&session.snapshot())?;
        return match outcome {
            Ok(_) => Ok(()),
            Err(err) => bail!("Upload analysis failed: {}", err),
        };
    }

    let started = session.start().await;
    sink.present(&session.snapshot())?;

    if args.interactive {
        return console::run(session, sink).await;
    }

    if let Err(err) = started {
        bail!("Camera unavailable: {}", err);
    }

    run_captures(session, sink, args.captures, Duration::from_secs(args.interval_secs)).await
}

async fn run_captures(
    session: &Session,
    sink: &mut dyn DashboardSink,
    captures: u32,
    interval: Duration,
) -> Result<()> {
    tracing::info!("Running {} capture(s), {:?} apart", captures, interval);

    let mut analyzed = 0u32;
    for cycle in 0..captures {
        if cycle > 0 {
            tokio::time::sleep(interval).await;
        }

        match session.capture_and_analyze().await {
            Ok(CycleOutcome::Analyzed) => analyzed += 1,
            Ok(outcome) => tracing::info!("Cycle {}: {:?}", cycle + 1, outcome),
            Err(err) => tracing::warn!("Cycle {} failed: {}", cycle + 1, err),
        }

        sink.present(&session.snapshot())?;
    }

    if captures > 0 && analyzed == 0 {
        bail!("No capture was analyzed");
    }
    Ok(())
}
