use crate::application::use_cases::coordinator::GenerationCoordinator;
use crate::application::use_cases::run_summary::RunSummary;
use crate::domain::error::Result;
use crate::infrastructure::config::ConfigService;
use crate::infrastructure::export::{export_cases, write_manifest};
use crate::infrastructure::llm_clients::OpenAICompatibleClient;
use crate::infrastructure::openapi::load_spec;
use crate::interfaces::cli::Cli;
use clap::Parser;
use std::fs::OpenOptions;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = cli.log_file().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(err) => {
                eprintln!("cannot open log file {}: {}", path.display(), err);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();
}

async fn execute(cli: &Cli) -> Result<()> {
    ConfigService::load_dotenv();
    let config = ConfigService::new(cli.config.clone()).load(&cli.overrides())?;

    let spec = load_spec(&cli.spec).await?;
    let operations = spec.operations(&config.filters);
    tracing::info!(
        source = %cli.spec,
        version = ?spec.version,
        operations = operations.len(),
        "specification loaded"
    );
    if operations.is_empty() {
        tracing::warn!("no operations left after filtering");
    }

    let client = Arc::new(OpenAICompatibleClient::new());
    let coordinator = GenerationCoordinator::new(client, &config, spec.api_context());
    let run = coordinator
        .run_until(operations, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::warn!("interrupt received, cancelling outstanding operations");
        })
        .await;

    let summary = RunSummary::new(&run.cases, &run.manifest);
    summary.log();
    println!("{}", summary);

    export_cases(
        &cli.output,
        config.export.format,
        config.export.csv_layout,
        &run.cases,
        &run.manifest,
    )?;
    if let Some(path) = &cli.manifest {
        write_manifest(path, &run.manifest)?;
    }
    if run.cases.is_empty() {
        tracing::warn!(path = %cli.output.display(), "no test cases were generated");
    }
    Ok(())
}

