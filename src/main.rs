mod background;
mod connectivity;
mod location;
mod permission;
mod pipeline;
mod point;
mod sink;
mod store;
mod sync;
mod tracker;
mod web;

#[cfg(test)]
mod test_helpers;

use clap::{Parser, Subcommand};
use std::future::Future;
use std::process::ExitCode;

use crate::tracker::CaptureInterval;
use crate::web::Config;

#[derive(Parser)]
#[command(name = "trackpost")]
#[command(about = "Periodic position capture with an offline backlog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tracker behind the control API
    Serve { config: String },
    /// Track in the foreground until interrupted
    Run {
        config: String,
        /// Overrides the configured interval (10s, 5s, 3s or 1s)
        #[arg(long)]
        interval: Option<CaptureInterval>,
    },
    /// Validate a config file
    Validate { config: String },
    /// List the points waiting in the backlog
    Backlog { config: String },
    /// Try to upload the backlog once
    Flush { config: String },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => block_on(serve(&config)),
        Commands::Run { config, interval } => block_on(run(&config, interval)),
        Commands::Validate { config } => validate(&config),
        Commands::Backlog { config } => block_on(backlog(&config)),
        Commands::Flush { config } => block_on(flush(&config)),
    }
}

fn block_on<F: Future<Output = ExitCode>>(future: F) -> ExitCode {
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(future),
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &str) -> Option<Config> {
    match Config::from_file(path) {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Config error: {}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    println!("Config is valid");
    println!("  remote:    {}", config.remote.base_url);
    println!("  backlog:   {}", config.storage.backlog_path.display());
    println!("  interval:  {}", config.tracker.interval);
    println!("  gpsd:      {}", config.location.gpsd);
    println!("  api keys:  {}", config.api_keys.len());
    ExitCode::SUCCESS
}

async fn serve(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let pipeline = match pipeline::build(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match web::run_server(config, pipeline).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str, interval: Option<CaptureInterval>) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let mut pipeline = match pipeline::build(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let interval = interval.unwrap_or(config.tracker.interval);
    if let Err(e) = pipeline.tracker.start(interval).await {
        eprintln!("Could not start tracking: {}", e);
        return ExitCode::FAILURE;
    }
    println!("Tracking every {}, press Ctrl-C to stop", interval);

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for Ctrl-C: {}", e);
    }

    pipeline.tracker.stop().await;
    let status = pipeline.tracker.status();
    println!(
        "Stopped after {} ticks ({} failed captures)",
        status.ticks, status.failed_captures
    );
    ExitCode::SUCCESS
}

async fn backlog(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let coordinator = match pipeline::build_coordinator(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match coordinator.store().peek_all().await {
        Ok(points) => {
            println!("{} point(s) waiting", points.len());
            for point in points {
                let speed = match point.speed {
                    Some(s) => format!("{:.1} m/s", s),
                    None => "-".to_string(),
                };
                println!(
                    "  {} {} {:.6},{:.6} {}",
                    point.id, point.captured_at, point.latitude, point.longitude, speed
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Backlog error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn flush(path: &str) -> ExitCode {
    let Some(config) = load_config(path) else {
        return ExitCode::FAILURE;
    };

    let coordinator = match pipeline::build_coordinator(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match coordinator.flush().await {
        Ok(outcome) if !outcome.online => {
            println!("Offline, {} point(s) kept", outcome.report.remaining);
            ExitCode::FAILURE
        }
        Ok(outcome) => {
            let report = outcome.report;
            println!(
                "Delivered {}, {} remaining",
                report.delivered, report.remaining
            );
            if let Some(failure) = report.failure {
                println!("Stopped on: {}", failure);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Backlog error: {}", e);
            ExitCode::FAILURE
        }
    }
}
