//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) describes the
//! classic setup: merge `de4dot.exe` and `de4dot-x64.exe` with their libraries through
//! `ILRepack.exe` and patch the packed results through the `cil` backend.
//!
//! ```json
//! {
//!   "work_dir": "C:/tools/de4dot",
//!   "backup": true,
//!   "targets": [{ "input": "de4dot.exe", "output": "de4dotp.exe" }]
//! }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    backend::BackendKind,
    patcher::{NestedVisibility, PatchOptions, PatchRules},
    Result,
};

/// Libraries merged into every packed executable by default
pub const DEFAULT_DEPENDENCIES: [&str; 7] = [
    "AssemblyData.dll",
    "AssemblyServer.exe",
    "de4dot.blocks.dll",
    "de4dot.code.dll",
    "de4dot.cui.dll",
    "de4dot.mdecrypt.dll",
    "dnlib.dll",
];

/// One executable to merge and the packed executable to produce from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Primary executable, relative to the working directory
    pub input: String,
    /// Packed executable, relative to the working directory
    pub output: String,
}

impl Target {
    /// Create a target.
    #[must_use]
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Target {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Returns the companion files the merge tool may leave next to the output:
    /// `<stem>.pdb`, with the stem cut at the first `.`, and `<output>.config`.
    #[must_use]
    pub fn companion_files(&self) -> [String; 2] {
        let stem = self.output.split('.').next().unwrap_or_default();
        [format!("{stem}.pdb"), format!("{}.config", self.output)]
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_merge_tool() -> String {
    "ILRepack.exe".to_string()
}

fn default_dependencies() -> Vec<String> {
    DEFAULT_DEPENDENCIES.iter().map(|dep| (*dep).to_string()).collect()
}

fn default_output_option() -> String {
    "/out:".to_string()
}

fn default_targets() -> Vec<Target> {
    vec![
        Target::new("de4dot.exe", "de4dotp.exe"),
        Target::new("de4dot-x64.exe", "de4dotp-x64.exe"),
    ]
}

fn default_cleanup() -> bool {
    true
}

/// Everything [`crate::pipeline::Pipeline`] needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the inputs; the merge tool runs here
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    /// The merge tool, found directly or on `PATH`
    #[serde(default = "default_merge_tool")]
    pub merge_tool: String,
    /// Modules merged into each target, in order
    #[serde(default = "default_dependencies")]
    pub dependencies: Vec<String>,
    /// Merge tool option prefixed to the output name
    #[serde(default = "default_output_option")]
    pub output_option: String,
    /// Targets processed in order
    #[serde(default = "default_targets")]
    pub targets: Vec<Target>,
    /// Backend the patcher uses
    #[serde(default)]
    pub backend: BackendKind,
    /// Keep a `.bak` copy of each packed executable before patching it
    #[serde(default)]
    pub backup: bool,
    /// Visibility policy for nested types
    #[serde(default)]
    pub nested_visibility: NestedVisibility,
    /// Delete the companion files after each target
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            work_dir: default_work_dir(),
            merge_tool: default_merge_tool(),
            dependencies: default_dependencies(),
            output_option: default_output_option(),
            targets: default_targets(),
            backend: BackendKind::default(),
            backup: false,
            nested_visibility: NestedVisibility::default(),
            cleanup: default_cleanup(),
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::Manifest`] if it is not a valid configuration and
    /// [`crate::Error::Malformed`] if the document is not a JSON object.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        if !value.is_object() {
            return Err(malformed_error!(
                "Configuration {} is not a JSON object",
                path.display()
            ));
        }
        let config = serde_json::from_value(value)?;

        log::debug!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Returns the patch options derived from this configuration.
    #[must_use]
    pub fn patch_options(&self) -> PatchOptions {
        PatchOptions {
            backend: self.backend,
            backup: self.backup,
            rules: PatchRules::with_nested_visibility(self.nested_visibility),
        }
    }

    /// Returns the merge tool arguments for `target`:
    /// the input, every dependency, then the output option.
    #[must_use]
    pub fn merge_arguments(&self, target: &Target) -> Vec<String> {
        let mut args = Vec::with_capacity(self.dependencies.len() + 2);
        args.push(target.input.clone());
        args.extend(self.dependencies.iter().cloned());
        args.push(format!("{}{}", self.output_option, target.output));
        args
    }
}
