use crate::config::generate::generate_starter_config;
use crate::config::load_config;
use crate::delivery::Destination;
use std::fs;
use std::path::PathBuf;

pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = generate_starter_config();

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = dirs::home_dir()
        .map(|home| home.join(".config/caliper-relay/config.yml"))
        .unwrap_or_else(|| PathBuf::from("/etc/caliper-relay/config.yml"));

    if config_path.exists() {
        return Err(format!(
            "config file already exists at {} (remove it first or use --stdout)",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

/// Load the effective configuration (file + environment) and resolve the destination
pub fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match &config_path {
        Some(path) => println!("Validating config file: {}", path.display()),
        None => println!("Validating defaults and environment (no config file found)"),
    }

    let config = load_config(config_path.as_deref())?;
    let destination = Destination::from_config(&config.lrw)?;

    println!("✓ Config is valid");
    println!("  database:    {}", config.database.path.display());
    println!("  job:         {}", config.pipeline.job_name);
    println!("  batch size:  {}", config.pipeline.batch_size);
    println!("  destination: {} ({})", destination.kind, destination.redacted_endpoint());
    Ok(())
}
