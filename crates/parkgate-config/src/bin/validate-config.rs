//! Config validation CLI tool
//!
//! Validates a parkgate configuration file and reports any errors.

use parkgate_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a parkgate configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match parkgate_config::load_config(&config_path) {
        Ok(config) => {
            let settings = &config.default_settings;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", parkgate_config::CURRENT_CONFIG_VERSION);
            println!("  Default tenant: {}", config.service.default_tenant);
            println!("  Data directory: {}", config.service.data_dir.display());
            println!("  Grace period: {} min", settings.grace_period_minutes);
            match settings.baseline_hourly_rate {
                Some(rate) => println!("  Baseline hourly rate: {}", rate),
                None => println!("  Baseline hourly rate: (none)"),
            }

            if !settings.tariffs.is_empty() {
                println!();
                println!("Tariffs:");
                for (category, tiers) in settings.tariffs.iter() {
                    let mut tiers = tiers.to_vec();
                    tiers.sort_by_key(|t| t.threshold_hours);
                    let rendered: Vec<String> = tiers
                        .iter()
                        .map(|t| format!("{}h={}", t.threshold_hours, t.amount))
                        .collect();
                    println!("  - {}: {}", category, rendered.join(", "));
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                parkgate_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                parkgate_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                parkgate_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                parkgate_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        parkgate_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
