//! Internet Speed Tester - Main CLI Application
//!
//! Runs one measurement session against an HTTP speed-test endpoint and
//! prints the report to stdout. Diagnostics go to stderr.

use clap::Parser;
use internet_speed_tester::{
    build_info,
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, ErrorReporter, Result},
    log_debug, log_info, log_warn,
    logging::LoggerFactory,
    output::OutputFormatterFactory,
    NetworkClient, SessionExecutor,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    match run_application(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            reporter.report_error(&e);
            process::exit(e.exit_code());
        }
    }
}

/// Main application logic; returns the process exit code
async fn run_application(cli: Cli) -> Result<i32> {
    cli.validate().map_err(AppError::config)?;

    if cli.env_help {
        println!("{}", cli.display_env_help());
        return Ok(0);
    }
    if let Some(path) = &cli.write_env_example {
        EnvManager::save_example_env_file(path)?;
        println!("Wrote example configuration to {}", path.display());
        return Ok(0);
    }

    let config = load_config(cli)?;
    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_logger("MAIN").await;

    log_debug!(logger, "{}", build_info());
    for line in display_config_summary(&config).lines() {
        log_debug!(logger, "config: {}", line);
    }
    for warning in validate_config(&config)? {
        match warning.level {
            ValidationLevel::Warning => log_warn!(logger, "{}", warning.message),
            ValidationLevel::Info => log_info!(logger, "{}", warning.message),
        }
    }

    let client = NetworkClient::with_timeout(config.timeout())?;
    let config = Arc::new(config);
    let mut session = SessionExecutor::new(Arc::clone(&config), Arc::new(client))
        .with_logger(factory.create_measurement_logger().await)
        .with_session_id(factory.session_id());

    log_info!(logger, "Testing against {}", config.url);

    let report = tokio::select! {
        report = session.run() => report?,
        // Interrupted errors exit with 130
        _ = tokio::signal::ctrl_c() => {
            let error = AppError::interrupted("session cancelled by user");
            logger.warn("Session interrupted").error_info(&error).log().await;
            return Err(error);
        }
    };

    let formatter = OutputFormatterFactory::from_config(&config);
    println!("{}", formatter.format_report(&report)?);

    if !report.has_success() {
        log_warn!(logger, "No sub-test produced a measurement");
    }
    Ok(report.exit_code())
}
