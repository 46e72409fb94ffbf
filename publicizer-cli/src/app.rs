use std::path::PathBuf;

use clap::{Parser, Subcommand};
use publicizer::{backend::BackendKind, patcher::NestedVisibility};

/// publicizer - pack a .NET toolchain into one executable and open it up for extension
#[derive(Debug, Parser)]
#[command(name = "publicizer", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Merge every configured target with its libraries, then patch the packed result.
    Run {
        /// Pipeline configuration (JSON). Built-in defaults are used without one.
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory holding the inputs and the merge tool.
        #[arg(short, long, value_name = "DIR")]
        work_dir: Option<PathBuf>,

        /// Merge tool to run (default: ILRepack.exe).
        #[arg(long, value_name = "PATH")]
        merge_tool: Option<String>,

        /// Metadata backend: cil or manifest.
        #[arg(short, long, value_name = "KIND")]
        backend: Option<BackendKind>,

        /// Keep a .bak copy of each packed executable before patching it.
        #[arg(long)]
        backup: bool,

        /// Nested type visibility policy: replace or merge.
        #[arg(long, value_name = "POLICY")]
        nested_visibility: Option<NestedVisibility>,

        /// Keep the .pdb and .config files the merge tool leaves behind.
        #[arg(long)]
        no_cleanup: bool,

        /// Exit without waiting for Enter.
        #[arg(long)]
        no_pause: bool,
    },

    /// Publicize, unseal and virtualize a single module in place.
    Patch {
        /// Path to the module file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Metadata backend: cil or manifest.
        #[arg(short, long, default_value_t = BackendKind::Cil)]
        backend: BackendKind,

        /// Keep a .bak copy of the module before patching it.
        #[arg(long)]
        backup: bool,

        /// Nested type visibility policy: replace or merge.
        #[arg(long, default_value_t = NestedVisibility::Replace)]
        nested_visibility: NestedVisibility,
    },

    /// List type definitions with their visibility and modifiers.
    Types {
        /// Path to the module file.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Metadata backend: cil or manifest.
        #[arg(short, long, default_value_t = BackendKind::Cil)]
        backend: BackendKind,

        /// Filter by namespace (exact match).
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_overrides() {
        let cli = Cli::try_parse_from([
            "publicizer",
            "run",
            "--backend",
            "Manifest",
            "--nested-visibility",
            "merge",
            "--no-pause",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.global.verbose);
        match cli.command {
            Command::Run {
                config,
                backend,
                nested_visibility,
                no_cleanup,
                no_pause,
                ..
            } => {
                assert!(config.is_none());
                assert_eq!(backend, Some(BackendKind::Manifest));
                assert_eq!(nested_visibility, Some(NestedVisibility::Merge));
                assert!(!no_cleanup);
                assert!(no_pause);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn patch_defaults() {
        let cli = Cli::try_parse_from(["publicizer", "patch", "de4dotp.exe", "--json"]).unwrap();

        assert!(cli.global.json);
        match cli.command {
            Command::Patch {
                path,
                backend,
                backup,
                nested_visibility,
            } => {
                assert_eq!(path, PathBuf::from("de4dotp.exe"));
                assert_eq!(backend, BackendKind::Cil);
                assert!(!backup);
                assert_eq!(nested_visibility, NestedVisibility::Replace);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["publicizer", "types", "a.dll", "--backend", "dnlib"]).is_err());
    }
}
