// revcheck/src/main.rs
use std::path::Path;
use std::process;

use clap::Parser;
use colored::Colorize;
use revcheck_common::config::Config;
use revcheck_common::error::Result as rcResult;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, warn};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod pipeline;
use cli::{CliArgs, Command};

const LOG_FILE_NAME: &str = "revcheck.log";
/// Conventional exit status after SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

fn init_tracing(verbose: u8, log_dir: Option<&Path>) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("REVCHECK_LOG")
        .from_env_lossy();

    match log_dir {
        Some(log_dir) => {
            let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
            let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

            let stderr_writer = std::io::stderr.with_max_level(max_log_level);
            let file_writer = non_blocking_appender.with_max_level(max_log_level);

            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(stderr_writer.and(file_writer))
                .with_ansi(true)
                .without_time()
                .try_init();

            Box::leak(Box::new(guard)); // Keep guard alive

            debug!(
                "Verbose logging enabled. Writing logs to: {}",
                log_dir.join(LOG_FILE_NAME).display()
            );
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .without_time()
                .try_init();
        }
    }
}

fn exit_with_error(e: &dyn std::fmt::Display) -> ! {
    eprintln!("{}: {:#}", "Error".red().bold(), e);
    process::exit(1);
}

#[tokio::main]
async fn main() -> rcResult<()> {
    let cli_args = CliArgs::parse();

    let mut config = Config::load().unwrap_or_else(|e| exit_with_error(&e));
    cli_args.command.configure(&mut config);

    // Verbose check runs also log into the results directory, so it has to
    // exist before logging starts.
    let log_dir = match cli_args.command {
        Command::Check(_) if cli_args.verbose > 0 => {
            let dir = config
                .prepare_results_dir()
                .unwrap_or_else(|e| exit_with_error(&e));
            config.results_directory = Some(dir.clone());
            Some(dir)
        }
        _ => None,
    };
    init_tracing(cli_args.verbose, log_dir.as_deref());

    let command_execution_result = tokio::select! {
        result = cli_args.command.run(&config) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted; abandoning remaining work");
            eprintln!("{} Interrupted", "Warning:".yellow().bold());
            process::exit(INTERRUPTED_EXIT_CODE);
        }
    };

    if let Err(e) = command_execution_result {
        error!("Command failed: {:#}", e);
        exit_with_error(&e);
    }

    debug!("Command completed successfully.");
    Ok(())
}
