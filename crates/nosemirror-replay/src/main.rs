//! Replay binary: `nosemirror-replay [TRACE] [--settings FILE]`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nosemirror_core::MirrorSettings;
use nosemirror_replay::{ReplayArgs, ReplayConfig, Replayer};

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;

    let args = ReplayArgs::parse(std::env::args().skip(1))?;
    let config = ReplayConfig::from_env();
    info!("Replay config: {:?}", config);

    let metrics = if config.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        Some(handle)
    } else {
        None
    };

    let settings_path = args.settings.as_deref().or(config.settings_path.as_deref());
    let settings = MirrorSettings::load(settings_path).context("Failed to load settings")?;

    let source = args
        .trace
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    let mut replayer =
        Replayer::new(settings, config.seed, &source)?.with_progress_every(config.progress_every);

    let input: Box<dyn io::BufRead> = match &args.trace {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open trace {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let output: Box<dyn Write> = match &config.output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let summary = replayer.run(input, output).context("Replay failed")?;
    info!(
        summary = %serde_json::to_string(&summary)?,
        "Replay summary"
    );

    if let Some(handle) = metrics {
        info!("Metrics:\n{}", handle.render());
    }

    Ok(())
}

/// Colored output for dev, JSON for production.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("nosemirror=info".parse()?);

    // Reports go to stdout, so logs always go to stderr
    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(io::stderr),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}
