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

    // Show publicizer info+ on stderr unless --json; --verbose enables debug; RUST_LOG overrides
    if !cli.global.json {
        let level = if cli.global.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        env_logger::Builder::new()
            .filter_module("publicizer", level)
            .parse_default_env()
            .target(env_logger::Target::Stderr)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(false)
            .init();
    }

    let code = match &cli.command {
        Command::Run {
            config,
            work_dir,
            merge_tool,
            backend,
            backup,
            nested_visibility,
            no_cleanup,
            no_pause,
        } => commands::run::run(
            &commands::run::RunOptions {
                config: config.as_deref(),
                work_dir: work_dir.as_deref(),
                merge_tool: merge_tool.as_deref(),
                backend: *backend,
                backup: *backup,
                nested_visibility: *nested_visibility,
                cleanup: !*no_cleanup,
                pause: !*no_pause,
            },
            &cli.global,
        )?,
        Command::Patch {
            path,
            backend,
            backup,
            nested_visibility,
        } => commands::patch::run(path, *backend, *backup, *nested_visibility, &cli.global)?,
        Command::Types {
            path,
            backend,
            namespace,
        } => {
            commands::types::run(path, *backend, namespace.as_deref(), &cli.global)?;
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}
