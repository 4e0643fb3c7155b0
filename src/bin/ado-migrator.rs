use clap::Parser;
use std::io;
use std::process::ExitCode as ProcessExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use ado_migrator::core::ExitCode;
use ado_migrator::core::output::{OutputFormatter, OutputWriter};
use ado_migrator::logging::{init_logging, parse_early_log_config};
use ado_migrator::{Args, AzureDevOpsClient, Config, MigratorError, Orchestrator};

#[tokio::main]
async fn main() -> ProcessExitCode {
    // Logging comes up before argument parsing so config errors get logged too
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = init_logging(parse_early_log_config(&raw_args));

    let args = Args::parse();

    // Handle --create-config flag
    if args.create_config {
        return match Config::create_sample_config() {
            Ok(path) => {
                println!("Sample configuration written to {}", path.display());
                ExitCode::Success.into()
            }
            Err(e) => fail(ExitCode::GeneralError, &e.to_string()),
        };
    }

    // Resolve configuration from CLI args, environment variables, and config file
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => return fail(ExitCode::GeneralError, &format!("{:#}", e)),
    };
    tracing::debug!(
        source = %config.source.label(),
        source_from = config.source.organization.source_name(),
        target = %config.target.label(),
        target_from = config.target.organization.source_name(),
        pr_status = %config.pr_status.value(),
        pr_status_from = config.pr_status.source_name(),
        work_items = *config.work_items.value(),
        max_concurrent_repos = *config.max_concurrent_repos.value(),
        work_dir = config.work_dir.as_ref().and_then(|dir| dir.original()),
        "Configuration resolved"
    );

    let clients = AzureDevOpsClient::new(&config.source)
        .and_then(|source| Ok((source, AzureDevOpsClient::new(&config.target)?)));
    let (source, target) = match clients {
        Ok(clients) => clients,
        Err(e) => {
            let error = MigratorError::from(e);
            return fail(ExitCode::for_error(&error), &error.to_string());
        }
    };

    let output = Arc::new(Mutex::new(OutputWriter::new(
        io::stdout(),
        config.output_format,
        config.quiet,
    )));
    let orchestrator = Orchestrator::new(config, Arc::new(source), Arc::new(target), output.clone());

    let report = match orchestrator.run().await {
        Ok(report) => report,
        Err(e) => return fail(ExitCode::for_error(&e), &e.to_string()),
    };

    let mut output = output.lock().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = output
        .write_summary(&report.summary())
        .and_then(|_| output.flush())
    {
        tracing::warn!("Failed to write summary: {}", e);
    }

    if report.aborted.is_some() {
        ExitCode::AuthenticationFailed.into()
    } else {
        ExitCode::Success.into()
    }
}

fn fail(code: ExitCode, message: &str) -> ProcessExitCode {
    tracing::error!(exit_code = code.code(), "{}", message);
    eprintln!("Error: {}", message);
    eprintln!("{}", code);
    code.into()
}
