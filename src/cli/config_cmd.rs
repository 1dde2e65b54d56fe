use anyhow::Result;

use crate::cli::output::{OutputFormat, OutputOptions};
use crate::core::config::AppConfig;

pub fn init(opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if path.exists() {
        eprintln!("Config file already exists at {}", path.display());
        eprintln!("Remove it first if you want to regenerate.");
        return Ok(());
    }

    let path = AppConfig::default().save()?;
    match opts.format {
        OutputFormat::Text => {
            println!("Generated config at {}", path.display());
            println!("  Set [backend] base_url to your cost API before fetching data.");
        }
        OutputFormat::Json => opts.print_json(&serde_json::json!({ "path": path }))?,
    }
    Ok(())
}

pub fn check(opts: &OutputOptions) -> Result<()> {
    let path = AppConfig::config_path();
    if !path.exists() {
        eprintln!("No config file found at {} (defaults apply)", path.display());
        return Ok(());
    }

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    match opts.format {
        OutputFormat::Text => {
            if issues.is_empty() {
                println!("Config OK: {}", path.display());
            } else {
                println!("Config issues in {}:", path.display());
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
        OutputFormat::Json => opts.print_json(&serde_json::json!({
            "path": path,
            "valid": issues.is_empty(),
            "issues": issues,
        }))?,
    }
    if !issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
