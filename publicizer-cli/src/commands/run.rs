use std::{
    io::{self, IsTerminal, Write},
    path::Path,
};

use anyhow::Context;
use publicizer::{
    backend::BackendKind,
    patcher::NestedVisibility,
    pipeline::{Pipeline, PipelineConfig},
};

use crate::app::GlobalOptions;

pub struct RunOptions<'a> {
    pub config: Option<&'a Path>,
    pub work_dir: Option<&'a Path>,
    pub merge_tool: Option<&'a str>,
    pub backend: Option<BackendKind>,
    pub backup: bool,
    pub nested_visibility: Option<NestedVisibility>,
    pub cleanup: bool,
    pub pause: bool,
}

/// Build the pipeline configuration: the file (or defaults), then command line overrides.
fn load_config(options: &RunOptions<'_>) -> anyhow::Result<PipelineConfig> {
    let mut config = match options.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("failed to read configuration: {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = options.work_dir {
        config.work_dir = dir.to_path_buf();
    }
    if let Some(tool) = options.merge_tool {
        config.merge_tool = tool.to_string();
    }
    if let Some(backend) = options.backend {
        config.backend = backend;
    }
    if let Some(policy) = options.nested_visibility {
        config.nested_visibility = policy;
    }
    config.backup |= options.backup;
    config.cleanup &= options.cleanup;

    Ok(config)
}

pub fn run(options: &RunOptions<'_>, opts: &GlobalOptions) -> anyhow::Result<i32> {
    let config = load_config(options)?;
    log::debug!(
        "Running {} target(s) in {} with '{}'",
        config.targets.len(),
        config.work_dir.display(),
        config.merge_tool
    );

    let pipeline = Pipeline::new(config);

    let report = if opts.json {
        let report = pipeline.run(&mut io::sink());
        println!("{}", serde_json::to_string_pretty(&report)?);
        report
    } else {
        pipeline.run(&mut io::stdout().lock())
    };

    if options.pause && !opts.json && io::stdin().is_terminal() {
        println!("Press Enter to exit...");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
    }

    Ok(report.exit_code())
}
