use crate::config::load_config;
use crate::pipeline::run_once;
use std::path::PathBuf;
use tracing::{error, info};

pub async fn run(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match &config_path {
        Some(path) => info!(config_path = %path.display(), "Loading configuration"),
        None => info!("No config file found, using defaults and environment"),
    }

    let config = load_config(config_path.as_deref())?;

    match run_once(&config).await {
        Ok(report) => {
            info!(
                job = %report.job_name,
                batches = report.summary.batches,
                recorded = %report.recorded,
                "Done"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Run aborted, watermark not advanced");
            Err(e.into())
        }
    }
}
