//! Patching a module file in place.
//!
//! [`Patcher::patch`] is a single failure boundary around the whole operation:
//!
//! 1. the input must exist, otherwise the backend is never touched,
//! 2. optionally a `<file>.bak` copy is created, refusing to replace an existing backup,
//! 3. the backend loads the module,
//! 4. [`publicize`] rewrites the attributes,
//! 5. the backend writes the module back over the input.
//!
//! Any error is rendered into the returned [`Outcome`]'s diagnostics. A failing write is
//! not rolled back; keep a backup if the input matters.
//!
//! # Examples
//!
//! ```rust,no_run
//! use publicizer::{backend::CilBackend, patcher::Patcher};
//! use std::path::Path;
//!
//! let outcome = Patcher::new(CilBackend).with_backup(true).patch(Path::new("de4dotp.exe"));
//! match &outcome.result {
//!     Ok(summary) => println!("{} methods virtualized", summary.methods_virtualized),
//!     Err(_) => print!("{}", outcome.diagnostics),
//! }
//! ```

mod rules;

use std::{
    ffi::OsString,
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

pub use rules::{publicize, NestedVisibility, PatchRules, PatchSummary};

use crate::{
    backend::{BackendKind, CilBackend, ManifestBackend, MetadataBackend},
    Diagnostics, Error, Outcome, Result,
};

/// Run-time options of a patch, see [`patch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOptions {
    /// Backend used to load and write the module
    #[serde(default)]
    pub backend: BackendKind,
    /// Copy the input to `<file>.bak` first
    #[serde(default)]
    pub backup: bool,
    /// Rules of the publicize pass
    #[serde(default)]
    pub rules: PatchRules,
}

/// Returns the backup location of `path`: the same path with `.bak` appended.
#[must_use]
pub fn backup_path(path: &Path) -> PathBuf {
    let mut backup = OsString::from(path.as_os_str());
    backup.push(".bak");
    PathBuf::from(backup)
}

/// Patches module files through a [`MetadataBackend`].
#[derive(Debug, Clone)]
pub struct Patcher<B: MetadataBackend> {
    backend: B,
    backup: bool,
    rules: PatchRules,
}

impl<B: MetadataBackend> Patcher<B> {
    /// A patcher using `backend` with default rules and no backup.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Patcher {
            backend,
            backup: false,
            rules: PatchRules::default(),
        }
    }

    /// Enable or disable the `.bak` copy.
    #[must_use]
    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }

    /// Use `rules` for the publicize pass.
    #[must_use]
    pub fn with_rules(mut self, rules: PatchRules) -> Self {
        self.rules = rules;
        self
    }

    /// Returns the backend in use.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Patch the module at `path` in place.
    pub fn patch(&self, path: &Path) -> Outcome<PatchSummary> {
        let mut diagnostics = Diagnostics::new();

        if !path.is_file() {
            return Outcome::failure(Error::MissingInput(path.to_path_buf()), diagnostics);
        }

        let result = self.patch_existing(path, &mut diagnostics);
        Outcome::from_result(result, diagnostics)
    }

    fn patch_existing(&self, path: &Path, diagnostics: &mut Diagnostics) -> Result<PatchSummary> {
        if self.backup {
            let backup = backup_path(path);
            create_backup(path, &backup).map_err(|source| Error::BackupFailed {
                path: backup.clone(),
                source,
            })?;

            diagnostics.trace(format!("Created backup '{}'", backup.display()));
        }

        let mut module = self
            .backend
            .load_module(path)
            .map_err(|source| Error::Load {
                path: path.to_path_buf(),
                backend: self.backend.name(),
                source: Box::new(source),
            })?;

        let summary = publicize(&mut module, &self.rules);
        self.backend.write_module(module, path)?;

        log::info!(
            "Patched {}: {} types publicized, {} unsealed, {} methods virtualized",
            path.display(),
            summary.types_publicized,
            summary.types_unsealed,
            summary.methods_virtualized
        );

        Ok(summary)
    }
}

fn create_backup(path: &Path, backup: &Path) -> io::Result<()> {
    let mut source = fs::File::open(path)?;
    let mut target = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(backup)?;

    if let Err(error) = io::copy(&mut source, &mut target) {
        drop(target);
        let _ = fs::remove_file(backup);
        return Err(error);
    }

    target.sync_all()
}

/// Patch the module at `path` with the backend selected by `options`.
pub fn patch(path: &Path, options: &PatchOptions) -> Outcome<PatchSummary> {
    log::debug!("Patching {} with the {} backend", path.display(), options.backend);

    match options.backend {
        BackendKind::Cil => Patcher::new(CilBackend)
            .with_backup(options.backup)
            .with_rules(options.rules)
            .patch(path),
        BackendKind::Manifest => Patcher::new(ManifestBackend)
            .with_backup(options.backup)
            .with_rules(options.rules)
            .patch(path),
    }
}
