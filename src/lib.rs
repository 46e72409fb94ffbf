// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # publicizer
//!
//! Packs a .NET toolchain into a single executable and opens it up for extension.
//!
//! The crate does two things:
//!
//! 1. It runs an external merge tool (`ILRepack.exe` by default) that combines a primary
//!    executable and its libraries into one packed executable.
//! 2. It rewrites the metadata of the packed executable so that every type, field and
//!    method is public, classes are no longer sealed and instance methods are virtual.
//!    Delegates keep their visibility and sealed state.
//!
//! The rewrite never re-serializes the module. The [`backend::CilBackend`] locates the
//! `TypeDef`, `Field` and `MethodDef` tables of the image and stores the new attribute values
//! over the old ones, leaving every other byte of the file where it was.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use publicizer::prelude::*;
//!
//! // patch a single module in place, keeping a .bak copy
//! let options = PatchOptions { backup: true, ..PatchOptions::default() };
//! let outcome = patch(std::path::Path::new("de4dotp.exe"), &options);
//!
//! match &outcome.result {
//!     Ok(summary) => println!("{} types unsealed", summary.types_unsealed),
//!     Err(_) => print!("{}", outcome.diagnostics),
//! }
//! ```
//!
//! ```rust,no_run
//! use publicizer::prelude::*;
//!
//! // merge and patch every configured target
//! let pipeline = Pipeline::new(PipelineConfig::default());
//! let report = pipeline.run(&mut std::io::stdout());
//! std::process::exit(report.exit_code());
//! ```
//!
//! ## Architecture
//!
//! - [`process`] - Running the merge tool and capturing its output
//! - [`file`] / [`metadata`] - PE and ECMA-335 structures, read through bounds-checked helpers
//! - [`module`] - The type, field and method definitions the rewrite works on
//! - [`backend`] - Loading modules from disk and writing them back
//! - [`patcher`] - The publicize pass and the in-place patch around it
//! - [`pipeline`] - Merge, patch and clean up, target by target
//!
//! Every stage returns an [`Outcome`]: its result plus the [`Diagnostics`] it collected.
//! Errors never escape a stage; their text ends up in the diagnostics instead.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use publicizer::prelude::*;
///
/// let module = CilBackend.load_module(std::path::Path::new("de4dotp.exe"))?;
/// for ty in module.types() {
///     println!("{} {}", ty.token, module.qualified_name(ty));
/// }
/// # Ok::<(), publicizer::Error>(())
/// ```
pub mod prelude;

/// Image access: memory-mapped or in-memory PE files and little-endian I/O helpers.
pub mod file;

/// ECMA-335 metadata structures needed to locate and rewrite attribute columns.
///
/// # Examples
///
/// ```rust,no_run
/// use publicizer::{file::File, metadata::{layout::MetadataLayout, tables::TableId}};
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("de4dotp.exe"))?;
/// let layout = MetadataLayout::locate(&file)?;
/// println!("{} types", layout.header.rows(TableId::TypeDef));
/// # Ok::<(), publicizer::Error>(())
/// ```
pub mod metadata;

/// The module model: types, fields and methods with their attribute sets.
pub mod module;

/// Metadata backends and their run-time selection.
pub mod backend;

/// The publicize pass and in-place patching of module files.
pub mod patcher;

/// The merge-then-patch orchestrator and its configuration.
pub mod pipeline;

/// External process execution.
pub mod process;

mod diagnostics;

/// `publicizer` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `publicizer` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use publicizer::{backend::{CilBackend, MetadataBackend}, Error};
///
/// match CilBackend.load_module(std::path::Path::new("de4dotp.exe")) {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::NotSupported) => println!("No metadata tables"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics, Outcome, FAILURE};

/// Runs external programs, see [`process::ProcessRunner`].
pub use process::ProcessRunner;
