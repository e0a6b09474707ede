//! ART runner
//!
//! Builds the configured environment on a virtualization engine, runs the
//! acceptance suites against it and writes a JSON report of the outcomes.

use std::io::BufRead;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod report;
mod runner;
mod suites;

use art_api::Engine;
use art_shared::{auth, ArtConfig, LoggingConfig};
use runner::Runner;

const USAGE: &str = "\
Usage:
  art --init [path]                  write a sample configuration
  art [config] [--list] [--filter <regex>]
  art [config] --store-password      save the default connection's password in the keyring";

#[derive(Debug, Default)]
struct Args {
    config_path: Option<String>,
    init: bool,
    list: bool,
    store_password: bool,
    filter: Option<String>,
}

impl Args {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut parsed = Args::default();
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--init" => parsed.init = true,
                "--list" => parsed.list = true,
                "--store-password" => parsed.store_password = true,
                "--filter" => {
                    let pattern = iter
                        .next()
                        .ok_or_else(|| "--filter needs a pattern".to_string())?;
                    parsed.filter = Some(pattern.clone());
                }
                "-h" | "--help" => return Err(USAGE.to_string()),
                flag if flag.starts_with("--") => return Err(format!("Unknown flag {flag}")),
                path => {
                    if parsed.config_path.is_some() {
                        return Err(format!("Unexpected argument {path}"));
                    }
                    parsed.config_path = Some(path.to_string());
                }
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let raw: Vec<String> = std::env::args().collect();
    let args = match Args::parse(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.init {
        return init_config(args.config_path.as_deref().unwrap_or("art.json"));
    }

    let config = match ArtConfig::load_or_default(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            eprintln!("Run `art --init` to create a sample configuration.");
            return Ok(ExitCode::FAILURE);
        }
    };

    init_logging(&config.logging)?;

    if args.list {
        let runner = Runner::new(config, args.filter.as_deref())?;
        for id in runner.list(&suites::registry()) {
            println!("{id}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let Some(connection) = config.get_default_connection().cloned() else {
        error!("No connections configured");
        eprintln!("Error: No connections configured.");
        eprintln!("Run `art --init` to create a sample configuration.");
        return Ok(ExitCode::FAILURE);
    };

    if args.store_password {
        let password = read_password()?;
        auth::store_password(&connection.username, &password)?;
        println!("Password for {} stored in the keyring", connection.username);
        return Ok(ExitCode::SUCCESS);
    }

    let engine = match Engine::connect(&config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("Failed to connect to {}: {}", connection.url, e);
            eprintln!("Error connecting to engine: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let results_dir = config.results_dir().or_else(report::default_results_dir);
    let runner = Runner::new(config, args.filter.as_deref())?;

    info!("Starting ART run against {}", connection.url);
    let report = runner.run(engine, suites::registry()).await;

    match results_dir {
        Some(dir) => {
            if let Err(e) = report.write_to(&dir) {
                error!("Failed to write report to {}: {}", dir.display(), e);
            }
        }
        None => error!("No results directory available; report not written"),
    }

    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))
}

fn init_config(config_path: &str) -> anyhow::Result<ExitCode> {
    if std::path::Path::new(config_path).exists() {
        eprintln!("Configuration file '{config_path}' already exists.");
        eprintln!("Remove it first if you want to create a new one.");
        return Ok(ExitCode::FAILURE);
    }

    if let Err(e) = ArtConfig::sample().save(config_path) {
        eprintln!("Failed to create configuration file: {e}");
        return Ok(ExitCode::FAILURE);
    }

    println!("Configuration file '{config_path}' created.");
    println!();
    println!("Edit the engine URL, hosts and storage, then either set the");
    println!("password in the file, export ART_PASSWORD, or run:");
    println!("  art {config_path} --store-password");
    println!();
    println!("To run the suites:");
    println!("  art {config_path}");
    Ok(ExitCode::SUCCESS)
}

/// Password from `ART_PASSWORD`, else the first line of stdin
fn read_password() -> anyhow::Result<String> {
    if let Ok(password) = std::env::var(auth::PASSWORD_ENV) {
        if !password.is_empty() {
            return Ok(password);
        }
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password given on stdin");
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("art")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_run_with_filter() {
        let args = Args::parse(&argv(&["art.json", "--filter", "^snapshots::"])).unwrap();
        assert_eq!(args.config_path.as_deref(), Some("art.json"));
        assert_eq!(args.filter.as_deref(), Some("^snapshots::"));
        assert!(!args.list && !args.init);
    }

    #[test]
    fn test_parse_init_path_after_flag() {
        let args = Args::parse(&argv(&["--init", "lab.json"])).unwrap();
        assert!(args.init);
        assert_eq!(args.config_path.as_deref(), Some("lab.json"));
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(Args::parse(&argv(&["--filter"])).is_err());
        assert!(Args::parse(&argv(&["--verbose"])).is_err());
        assert!(Args::parse(&argv(&["a.json", "b.json"])).is_err());
    }
}
