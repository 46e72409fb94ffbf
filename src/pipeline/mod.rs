//! The merge-then-patch orchestrator.
//!
//! For every [`Target`] the pipeline runs the merge tool to produce the packed executable
//! and, only if the tool exits with code 0, patches the packed executable in place. Progress
//! banners go to the console writer; diagnostics are only printed when a target fails.
//! Targets are processed in order and the first failing target ends the run.
//!
//! # Examples
//!
//! ```rust,no_run
//! use publicizer::pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let report = pipeline.run(&mut std::io::stdout());
//! std::process::exit(report.exit_code());
//! ```

mod config;

use std::{
    fmt, fs,
    io::{self, Write},
};

use serde::Serialize;

pub use config::{PipelineConfig, Target, DEFAULT_DEPENDENCIES};

use crate::{
    patcher::{self, PatchSummary},
    Diagnostics, Error, ProcessRunner, FAILURE,
};

/// The line printed between pipeline stages
pub const SEPARATOR: &str = "============================================================";

/// How a target ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// The input did not exist, nothing was done
    Skipped,
    /// Merged and patched
    Succeeded,
    /// The merge tool was missing, could not run, or exited with a nonzero code
    MergeFailed,
    /// The packed executable could not be patched
    PatchFailed,
}

impl TargetStatus {
    /// Returns true unless the target failed.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, TargetStatus::Skipped | TargetStatus::Succeeded)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetStatus::Skipped => write!(f, "skipped"),
            TargetStatus::Succeeded => write!(f, "succeeded"),
            TargetStatus::MergeFailed => write!(f, "merge failed"),
            TargetStatus::PatchFailed => write!(f, "patch failed"),
        }
    }
}

/// What happened to one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    /// The target
    pub target: Target,
    /// How it ended
    pub status: TargetStatus,
    /// Exit code of the merge tool, if it ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_exit_code: Option<i32>,
    /// Patch counts, if the patch succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PatchSummary>,
    /// Diagnostics of the failing stage
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl TargetReport {
    fn new(target: &Target, status: TargetStatus) -> Self {
        TargetReport {
            target: target.clone(),
            status,
            merge_exit_code: None,
            summary: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Returns `0`, or [`FAILURE`] if the target failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.status.is_success() {
            0
        } else {
            FAILURE
        }
    }
}

/// The reports of all targets that were processed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// One report per processed target, in order
    pub targets: Vec<TargetReport>,
}

impl PipelineReport {
    /// Returns true if no target failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.targets.iter().all(|report| report.status.is_success())
    }

    /// Returns the process exit code: `0`, or [`FAILURE`] if any target failed.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            FAILURE
        }
    }
}

/// Writes console text, logging instead of failing when the console is gone.
struct Console<'a> {
    out: &'a mut dyn Write,
}

impl Console<'_> {
    fn line(&mut self, text: fmt::Arguments<'_>) {
        if let Err(error) = self.write_line(text) {
            log::warn!("Could not write to the console: {error}");
        }
    }

    fn write_line(&mut self, text: fmt::Arguments<'_>) -> io::Result<()> {
        self.out.write_fmt(text)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

/// Runs the merge tool and the patcher for each configured target.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    runner: ProcessRunner,
}

impl Pipeline {
    /// A pipeline running the merge tool in the configured working directory.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let runner = ProcessRunner::new().current_dir(&config.work_dir);
        Pipeline { config, runner }
    }

    /// Use `runner` to start the merge tool.
    #[must_use]
    pub fn with_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every target in order, stopping after the first failure.
    pub fn run(&self, out: &mut dyn Write) -> PipelineReport {
        let mut report = PipelineReport::default();

        for target in &self.config.targets {
            let target_report = self.run_target(target, out);
            let failed = !target_report.status.is_success();
            report.targets.push(target_report);

            if failed {
                log::debug!("Stopping after failed target {}", target.input);
                break;
            }
        }

        report
    }

    /// Merge and patch a single target.
    pub fn run_target(&self, target: &Target, out: &mut dyn Write) -> TargetReport {
        let mut console = Console { out };
        let work_dir = &self.config.work_dir;

        if !work_dir.join(&target.input).is_file() {
            log::info!("{} does not exist, skipping", target.input);
            return TargetReport::new(target, TargetStatus::Skipped);
        }

        console.line(format_args!("{SEPARATOR}"));
        console.line(format_args!(
            "Merging '{}' and DLLs into a packed executable '{}'...\n",
            target.input, target.output
        ));

        let args = self.config.merge_arguments(target);
        let merge = self.runner.run(&self.config.merge_tool, &args);
        let merge_exit_code = merge.exit_code();

        let mut report = if merge_exit_code == 0 {
            // merge output is dropped on success
            console.line(format_args!("{SEPARATOR}"));
            console.line(format_args!(
                "Patching '{}', (1) Publicizing classes/fields/methods, (2) unsealing classes, \
                 (3) virtualizing methods...\n",
                target.output
            ));

            let outcome = patcher::patch(
                &work_dir.join(&target.output),
                &self.config.patch_options(),
            );
            let (result, diagnostics) = outcome.into_parts();

            let mut report = match result {
                Ok(summary) => {
                    let mut report = TargetReport::new(target, TargetStatus::Succeeded);
                    report.summary = Some(summary);
                    report
                }
                Err(_) => TargetReport::new(target, TargetStatus::PatchFailed),
            };
            report.diagnostics = diagnostics;
            report
        } else {
            let mut report = TargetReport::new(target, TargetStatus::MergeFailed);
            let (_, mut diagnostics) = merge.into_parts();
            if !diagnostics.has_errors() {
                diagnostics.error(&Error::ToolFailed {
                    program: self.config.merge_tool.clone(),
                    code: merge_exit_code,
                });
            }
            report.diagnostics = diagnostics;
            report
        };
        report.merge_exit_code = Some(merge_exit_code);

        if !report.status.is_success() {
            console.line(format_args!("An error occurred:"));
            console.line(format_args!("{}", report.diagnostics));
        }

        console.line(format_args!("{SEPARATOR}"));
        if report.status.is_success() {
            console.line(format_args!(
                "{} packed and patched successfully!\n",
                target.input
            ));
        }

        if self.config.cleanup {
            self.remove_companions(target);
        }

        report
    }

    fn remove_companions(&self, target: &Target) {
        for name in target.companion_files() {
            let path = self.config.work_dir.join(name);
            if fs::remove_file(&path).is_ok() {
                log::debug!("Removed {}", path.display());
            }
        }
    }
}
