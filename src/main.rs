use clap::Parser;
use saxofolio::application::sync::{SyncOutcome, SyncReport};
use saxofolio::cli::commands::{Cli, Commands};
use saxofolio::domain::error::DomainError;
use saxofolio::infrastructure::config::{Operation, Settings};
use saxofolio::infrastructure::telemetry;
use saxofolio::SaxoFolio;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_DEGRADED: i32 = 2;
const EXIT_SKIPPED: i32 = 3;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    telemetry::init(&log_level);

    let cli = Cli::parse();
    std::process::exit(run(cli.command).await);
}

async fn run(command: Option<Commands>) -> i32 {
    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("{e}");
            return EXIT_FAILED;
        }
    };

    let operation = command.map(operation_for).unwrap_or(settings.operation);
    if let Err(e) = settings.validate_for(operation) {
        error!("{e}");
        return EXIT_FAILED;
    }

    let app = match SaxoFolio::new(&settings) {
        Ok(app) => app,
        Err(e) => {
            error!("Error initializing saxofolio: {e}");
            return EXIT_FAILED;
        }
    };

    info!(operation = %operation, "Starting");
    match operation {
        Operation::Sync => match settings.schedule {
            None => sync_exit_code(&app.sync().await, true),
            Some(interval) => run_scheduled(&app, interval).await,
        },
        Operation::ListActivities => match app.list_activities().await {
            Ok(activities) => print_json(&activities),
            Err(e) => error_exit_code(&e),
        },
        Operation::DeleteActivities => match app.delete_all_activities().await {
            Ok(()) => EXIT_OK,
            Err(e) => error_exit_code(&e),
        },
        Operation::ListAccounts => match app.accounts().await {
            Ok(accounts) => print_json(&accounts),
            Err(e) => error_exit_code(&e),
        },
        Operation::Authorize => {
            let result = app
                .authorize(|url| {
                    println!("Open this URL in your browser to authorize saxofolio:\n\n{url}\n");
                })
                .await;
            match result {
                Ok(()) => EXIT_OK,
                Err(e) => error_exit_code(&e),
            }
        }
    }
}

fn operation_for(command: Commands) -> Operation {
    match command {
        Commands::Sync => Operation::Sync,
        Commands::Activities => Operation::ListActivities,
        Commands::DeleteActivities => Operation::DeleteActivities,
        Commands::Auth => Operation::Authorize,
        Commands::Accounts => Operation::ListAccounts,
    }
}

/// Run immediately, then every `interval` until ctrl-c. Each iteration
/// takes the run marker on its own. A run in flight is never cut short;
/// only the wait between runs is interruptible.
async fn run_scheduled(app: &SaxoFolio, interval: Duration) -> i32 {
    info!("Scheduled mode, syncing every {}s", interval.as_secs());
    loop {
        let (result, interrupted) = finish_run(app.sync(), tokio::signal::ctrl_c()).await;
        sync_exit_code(&result, false);
        if interrupted {
            info!("Interrupted, stopping after the finished run");
            return EXIT_OK;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return EXIT_OK;
            }
        }
    }
}

/// Drive `run` to completion. An interrupt arriving meanwhile is only noted.
async fn finish_run<T>(run: impl Future<Output = T>, interrupt: impl Future) -> (T, bool) {
    tokio::pin!(run);
    tokio::pin!(interrupt);
    let mut interrupted = false;
    loop {
        tokio::select! {
            out = &mut run => return (out, interrupted),
            _ = &mut interrupt, if !interrupted => {
                info!("Interrupt received, finishing the current run first");
                interrupted = true;
            }
        }
    }
}

fn sync_exit_code(result: &Result<SyncReport, DomainError>, print: bool) -> i32 {
    match result {
        Ok(report) => {
            if print {
                print_json(report);
            }
            match report.outcome() {
                SyncOutcome::Complete => EXIT_OK,
                SyncOutcome::Degraded => EXIT_DEGRADED,
                SyncOutcome::Failed => EXIT_FAILED,
            }
        }
        Err(e) => error_exit_code(e),
    }
}

fn error_exit_code(e: &DomainError) -> i32 {
    match e {
        DomainError::RunInProgress(_) => {
            warn!("{e}, skipping");
            EXIT_SKIPPED
        }
        _ => {
            error!("{e}");
            EXIT_FAILED
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            EXIT_OK
        }
        Err(e) => {
            error!("Failed to serialize output: {e}");
            EXIT_FAILED
        }
    }
}
