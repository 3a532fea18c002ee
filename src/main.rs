mod cli;
mod commands;
mod content;
mod paths;
mod settings;
mod ui;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, OutputFormat, ResourceCommand};
use declarative::ApplyContext;
use portainer::transport::http::HttpTransport;
use serde_json::Map;
use settings::Settings;
use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "portainer-reconcile", &mut io::stdout());
            ExitCode::SUCCESS
        }
        Command::Resource(command) => {
            let ctx = ApplyContext::new(cli.check, cli.diff);
            reconcile(&cli.connection, command, &ctx, cli.output)
        }
    }
}

/// Connect, reconcile one resource and print the outcome
fn reconcile(
    connection: &cli::ConnectionArgs,
    command: ResourceCommand,
    ctx: &ApplyContext,
    format: OutputFormat,
) -> ExitCode {
    let settings = match Settings::resolve(connection) {
        Ok(settings) => settings,
        Err(e) => {
            ui::print_failure(&format!("{e:#}"), Map::new(), format);
            return ExitCode::FAILURE;
        }
    };
    log::debug!("Using Portainer at {}", settings.url);

    let transport = HttpTransport::new(
        &settings.url,
        &settings.token,
        settings.timeout,
        settings.insecure,
    );
    if !ctx.dry_run
        && let Err(e) = transport.ping()
    {
        ui::print_failure(&e.to_string(), e.context(), format);
        return ExitCode::FAILURE;
    }

    match commands::run(&transport, command, ctx) {
        Ok(report) => {
            ui::print_report(&report, format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            ui::print_failure(&e.to_string(), e.context(), format);
            ExitCode::FAILURE
        }
    }
}
