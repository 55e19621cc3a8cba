mod app;
mod commands;
mod output;

use clap::Parser;

use crate::app::{Cli, Command};

fn main() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        eprintln!("\nCancelled.");
        std::process::exit(130);
    })
    .expect("failed to set Ctrl+C handler");

    let cli = Cli::parse();

    // Show dexscope info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("dexscope", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    match &cli.command {
        Command::Info { path, debug } => {
            commands::info::run(path, debug.as_deref(), &cli.global)
        }
        Command::Disasm {
            path,
            debug,
            ids,
            output,
        } => commands::disasm::run(
            path,
            debug.as_deref(),
            ids.as_deref(),
            output.as_deref(),
            &cli.global,
        ),
        Command::Asm {
            path,
            output,
            debug_out,
            ids,
            ids_out,
        } => commands::asm::run(
            path,
            &commands::asm::AsmOptions {
                output,
                debug_out: debug_out.as_deref(),
                ids: ids.as_deref(),
                ids_out: ids_out.as_deref(),
                global: &cli.global,
            },
        ),
    }
}
