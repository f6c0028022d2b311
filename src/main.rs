use clap::Parser;
use isoreach::domain::ports::{ProgressReporter, Storage};
use isoreach::utils::{logger, validation::Validate};
use isoreach::{
    feature_collection, AmapClient, CliConfig, IsochroneEngine, LocalStorage, RequestGovernor,
};

struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, current: usize, total: usize, status: &str) {
        tracing::info!(current, total, "{status}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting isoreach");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let oracle = AmapClient::from_config(&config);
    let governor = RequestGovernor::from_config(&config);
    let engine = IsochroneEngine::new(oracle)
        .with_governor(governor)
        .with_reporter(Box::new(LogProgress));

    // Ctrl-C sets the cancellation flag; the computation unwinds at the next
    // loop boundary with no partial result.
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, aborting computation");
            cancel.cancel();
        }
    });

    let results = engine
        .compute_isochrones(&config.facilities, config.time_minutes, &config.mode)
        .await?;

    let geojson = feature_collection(&results);
    let storage = LocalStorage::new(config.output_path.clone());
    storage
        .write_file(
            "isochrones.geojson",
            serde_json::to_string_pretty(&geojson)?.as_bytes(),
        )
        .await?;

    let polygons = results.iter().filter(|r| r.has_polygon()).count();
    tracing::info!(
        "✅ Computed {} isochrone(s), {} with a valid polygon",
        results.len(),
        polygons
    );
    println!(
        "✅ Computed {}/{} isochrone(s); output saved to {}/isochrones.geojson",
        results.len(),
        config.facilities.len(),
        config.output_path
    );

    Ok(())
}
