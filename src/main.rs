mod cli;
mod logging;
mod progress;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use hashkeep::{config, AppConfig, IndexService, ScanStatus};
use progress::ScanProgress;
use std::io::{self, Write};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let app_config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run) => run_daemon(app_config)?,
        Some(Commands::Scan) => run_scan(app_config)?,
        Some(Commands::Add { path }) => {
            let service = IndexService::open(app_config)?;
            service.add_directory(&path)?;
            print_pass_summary(&service.status());
        }
        Some(Commands::Remove { path }) => {
            match prompt_confirm(
                &format!("Stop monitoring '{}' and drop its index records?", path),
                Some(false),
            ) {
                Ok(true) => {
                    let service = IndexService::open(app_config)?;
                    let removed = service.remove_directory(&path)?;
                    println!("{} records removed", removed);
                }
                _ => process::exit(0),
            }
        }
        Some(Commands::Dirs) => {
            let service = IndexService::open(app_config)?;
            for dir in service.monitored_directories()? {
                println!("{}", dir);
            }
        }
        Some(Commands::Patterns) => {
            let service = IndexService::open(app_config)?;
            for pattern in service.ignore_patterns()? {
                println!("{}", pattern);
            }
        }
        Some(Commands::SetPatterns { patterns }) => {
            let service = IndexService::open(app_config)?;
            service.set_ignore_patterns(&patterns)?;
            let saved = service.ignore_patterns()?;
            println!("{} ignore patterns saved", saved.len());
        }
        Some(Commands::Lookup {
            fingerprint,
            reveal,
        }) => {
            let service = IndexService::open(app_config)?;
            match service.lookup_by_fingerprint(&fingerprint)? {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                    if reveal {
                        service.reveal(&fingerprint)?;
                    }
                }
                None => {
                    println!("No file indexed under {}", fingerprint);
                    process::exit(1);
                }
            }
        }
        Some(Commands::List {
            search,
            page,
            page_size,
        }) => {
            let service = IndexService::open(app_config)?;
            let (files, total) = service.list_files(search.as_deref(), page, page_size)?;
            let payload = serde_json::json!({ "files": files, "total": total });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", app_config);
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_daemon(app_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut service = IndexService::open(app_config)?;
    service.start()?;
    info!("hashkeep daemon running, press Ctrl-C to exit");
    loop {
        std::thread::park();
    }
}

fn run_scan(app_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let service = IndexService::open(app_config)?;
    let progress = ScanProgress::start(Arc::clone(service.engine()));
    let started = service.run_pass_now();
    progress.finish();

    if !started {
        println!("A scan is already in progress");
        return Ok(());
    }
    print_pass_summary(&service.status());
    Ok(())
}

fn print_pass_summary(status: &ScanStatus) {
    println!();
    info!(
        "Total: {}, processed: {}, skipped: {}, errors: {}, deleted: {}",
        format!("{}", status.total_files).green(),
        format!("{}", status.processed_files).green(),
        format!("{}", status.skipped_files).green(),
        format!("{}", status.error_files).red(),
        format!("{}", status.deleted_files).red(),
    );
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
