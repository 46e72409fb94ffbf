//! # publicizer Prelude
//!
//! The most commonly used types and traits of the publicizer library, for glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all publicizer operations
pub use crate::Error;

/// The result type used throughout publicizer
pub use crate::Result;

/// Stage results and the text they collected
pub use crate::{Diagnostics, Outcome, FAILURE};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Merge-then-patch orchestration
pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport, Target, TargetStatus};

/// Patching a single module
pub use crate::patcher::{patch, NestedVisibility, PatchOptions, PatchRules, PatchSummary, Patcher};

/// Running external programs
pub use crate::ProcessRunner;

// ================================================================================================
// Backends and the Module Model
// ================================================================================================

/// Backends and their run-time selection
pub use crate::backend::{
    BackendKind, CilBackend, CilModule, ManifestBackend, ManifestModule, MetadataBackend,
};

/// Module definitions
pub use crate::module::{FieldDefinition, MethodDefinition, Module, TypeDefinition};

/// Attribute sets
pub use crate::metadata::attributes::{FieldAttributes, MethodAttributes, TypeAttributes};

/// Metadata token type for referencing table entries
pub use crate::metadata::token::Token;
