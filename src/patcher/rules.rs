//! The publicize pass: the fixed rule set applied to every type of a module.
//!
//! For each type, in the order the backend enumerates them:
//!
//! 1. Classes that are not delegates become visible: nested types get nested-public
//!    visibility (see [`NestedVisibility`]), top-level types become public. Unless the
//!    type is abstract, it is unsealed.
//! 2. Every field becomes public.
//! 3. Every method becomes public. Methods that are neither static, abstract nor
//!    constructors become virtual.
//!
//! Steps 2 and 3 apply to delegates and interfaces as well. Applying the pass twice
//! leaves the module as the first application did.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
    metadata::attributes::{FieldAttributes, MethodAttributes, TypeAttributes},
    module::{Module, TypeDefinition},
};

/// How nested types are made visible.
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
pub enum NestedVisibility {
    /// Store `NESTED_PUBLIC` in the visibility field, whatever was there before
    #[default]
    Replace,
    /// Only OR the `NESTED_PUBLIC` bit into the visibility field.
    ///
    /// A nested private type stays nested private and a nested family type becomes
    /// family-and-assembly. Kept for output that must match older patched builds.
    Merge,
}

/// Options of the publicize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRules {
    /// Visibility policy for nested types
    #[serde(default)]
    pub nested_visibility: NestedVisibility,
}

impl PatchRules {
    /// Rules using `policy` for nested types.
    #[must_use]
    pub fn with_nested_visibility(policy: NestedVisibility) -> Self {
        PatchRules {
            nested_visibility: policy,
        }
    }
}

/// Counts of what one publicize pass changed.
///
/// Counters only count definitions whose attributes actually changed, except
/// `types_examined` and `delegates_skipped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSummary {
    /// Type definitions visited
    pub types_examined: usize,
    /// Types whose visibility changed
    pub types_publicized: usize,
    /// Types whose `SEALED` bit was cleared
    pub types_unsealed: usize,
    /// Classes left alone because they derive from `System.MulticastDelegate`
    pub delegates_skipped: usize,
    /// Fields whose access changed
    pub fields_publicized: usize,
    /// Methods whose access changed
    pub methods_publicized: usize,
    /// Methods that became virtual
    pub methods_virtualized: usize,
}

impl PatchSummary {
    /// Returns true if the pass changed nothing.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.types_publicized == 0
            && self.types_unsealed == 0
            && self.fields_publicized == 0
            && self.methods_publicized == 0
            && self.methods_virtualized == 0
    }
}

fn visible_flags(ty: &TypeDefinition, policy: NestedVisibility) -> TypeAttributes {
    if ty.is_nested() {
        match policy {
            NestedVisibility::Replace => ty.flags.with_visibility(TypeAttributes::NESTED_PUBLIC),
            NestedVisibility::Merge => ty.flags | TypeAttributes::NESTED_PUBLIC,
        }
    } else {
        ty.flags.with_visibility(TypeAttributes::PUBLIC)
    }
}

/// Apply the publicize pass to every type of `module`.
pub fn publicize<M: Module + ?Sized>(module: &mut M, rules: &PatchRules) -> PatchSummary {
    let mut summary = PatchSummary::default();

    for ty in module.types_mut() {
        summary.types_examined += 1;

        if ty.is_class() {
            if ty.is_delegate() {
                summary.delegates_skipped += 1;
            } else {
                let visible = visible_flags(ty, rules.nested_visibility);
                if visible.visibility() != ty.flags.visibility() {
                    summary.types_publicized += 1;
                }
                ty.flags = visible;

                if !ty.is_abstract() && ty.is_sealed() {
                    ty.flags.remove(TypeAttributes::SEALED);
                    summary.types_unsealed += 1;
                }
            }
        }

        for field in &mut ty.fields {
            if !field.is_public() {
                field.flags = field.flags.with_access(FieldAttributes::PUBLIC);
                summary.fields_publicized += 1;
            }
        }

        for method in &mut ty.methods {
            if !method.is_public() {
                method.flags = method.flags.with_access(MethodAttributes::PUBLIC);
                summary.methods_publicized += 1;
            }

            if !method.is_static()
                && !method.is_abstract()
                && !method.is_constructor()
                && !method.is_virtual()
            {
                method.flags.insert(MethodAttributes::VIRTUAL);
                summary.methods_virtualized += 1;
            }
        }
    }

    log::debug!(
        "{}: {} types examined, {} publicized, {} unsealed, {} fields, {} methods, {} virtualized",
        module.name(),
        summary.types_examined,
        summary.types_publicized,
        summary.types_unsealed,
        summary.fields_publicized,
        summary.methods_publicized,
        summary.methods_virtualized
    );

    summary
}
