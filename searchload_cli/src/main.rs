use anyhow::{Context, Result};
use clap::Parser;
use searchload::{
    Config, Job, Reporter, Scenario, SearchMetrics, StageExecutor, Summary,
    http::SearchClient,
    report::{JsonFileReporter, StdoutReporter},
};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Cli;

fn init_tracing(log_level: Option<&str>) {
    let env_filter = log_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = Config::from(cli);
    config.validate()?;

    tracing::info!("Search Engine Load Test");
    tracing::info!("Base URL:     {}", config.base_url);
    tracing::info!("Scenario:     {}", config.scenario);
    match config.duration {
        Some(duration) => tracing::info!("Duration:     {}s", duration.as_secs()),
        None => tracing::info!("Requests:     {}", config.requests),
    }
    tracing::info!("Concurrent:   {}", config.concurrency);

    let client = SearchClient::new(&config.base_url, config.timeout)?;

    tracing::info!("Health check...");
    client
        .probe()
        .await
        .context("service is not healthy, aborting before the run")?;
    tracing::info!("Service is healthy");

    let execution = Scenario::<SearchMetrics, _, _, _>::builder()
        .name(config.scenario.to_string())
        .action(move |job: Job| {
            let client = client.clone();
            async move { client.search(job).await }
        })
        .executor(StageExecutor::builder().stages(config.stages()).build())
        .build()
        .run()
        .await?;

    let summary = Summary::new(execution.aggregate.into_snapshot(), execution.elapsed)?;
    StdoutReporter.report(&summary).await?;

    if let Some(path) = &config.output {
        JsonFileReporter::new(path)
            .report(&summary)
            .await
            .with_context(|| format!("failed to write results to {}", path.display()))?;
    }

    Ok(())
}
