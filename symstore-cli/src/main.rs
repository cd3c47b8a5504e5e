mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // symstore info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("symstore", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Info { path } => commands::info::run(path, &cli.global),
        Command::Sources { path } => commands::sources::run(path, &cli.global),
        Command::Methods { path, source } => {
            commands::methods::run(path, source.as_deref(), &cli.global)
        }
        Command::Lines { path, token } => commands::lines::run(path, token, &cli.global),
        Command::Lookup {
            path,
            token,
            offset,
        } => commands::lookup::run(path, token, offset, &cli.global),
        Command::Scopes { path } => commands::scopes::run(path, &cli.global),
    }
}
