use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilebox_generate::cli::{Cli, Config};
use tilebox_generate::{GenerationBackend, PluginBackend, RustBackend, TileboxClient, generate_dataset};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "generation failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> anyhow::Result<()> {
    let client = TileboxClient::new(&config.endpoint, &config.api_key)?;
    let backend: Box<dyn GenerationBackend> = match &config.plugin {
        Some(plugin) => Box::new(PluginBackend::new(plugin)),
        None => Box::new(RustBackend::new(config.extern_paths.clone())),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime
        .block_on(generate_dataset(&client, &backend, &config.dataset, &config.options))
        .map_err(|e| {
            let stage = e.stage();
            anyhow::Error::new(e).context(format!("{stage} stage failed"))
        })?;
    Ok(())
}
