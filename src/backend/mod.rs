//! Metadata backends: how a module gets from disk into memory and back.
//!
//! The patcher only ever talks to [`MetadataBackend`]. Each backend decides how a file is
//! turned into a [`crate::module::Module`] and how the modified module is written back:
//!
//! - [`CilBackend`] reads PE images with .NET metadata and rewrites the attribute columns
//!   of the `TypeDef`, `Field` and `MethodDef` tables in place.
//! - [`ManifestBackend`] reads and writes a JSON description of a module.
//!
//! Backends are chosen at compile time through the generic parameter of
//! [`crate::patcher::Patcher`], or at run time through [`BackendKind`].

mod cil;
mod manifest;

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use cil::{CilBackend, CilModule};
pub use manifest::{ManifestBackend, ManifestModule};

use crate::{module::Module, Result};

/// Loads modules from disk and writes them back.
pub trait MetadataBackend {
    /// The module representation this backend produces
    type Module: Module;

    /// Returns a short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Load the module stored at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a module this backend
    /// understands.
    fn load_module(&self, path: &Path) -> Result<Self::Module>;

    /// Write `module` to `path`, replacing any existing file.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteFailed`] if the module is inconsistent or cannot be
    /// written.
    fn write_module(&self, module: Self::Module, path: &Path) -> Result<()>;
}

/// The backends available at run time.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// PE images with .NET metadata, see [`CilBackend`]
    #[default]
    Cil,
    /// JSON module manifests, see [`ManifestBackend`]
    Manifest,
}
