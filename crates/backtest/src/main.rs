mod config;
mod driver;
mod history_source;

use std::error::Error;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::from_env()?;
    tracing::info!(
        mode = config.mode.as_str(),
        seed = config.seed,
        output_dir = %config.output_dir,
        "starting backtest"
    );

    let runs = driver::run(&config).await?;
    for run in &runs {
        tracing::info!(
            strategy = %run.name,
            steps = run.summary.steps,
            final_pnl = run.summary.final_pnl,
            mean_abs_inventory = run.summary.mean_abs_inventory,
            "backtest result"
        );
    }
    Ok(())
}
