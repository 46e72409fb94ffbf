//! The in-memory module model the patcher works on.
//!
//! A [`Module`] is whatever a [`crate::backend::MetadataBackend`] loads: an ordered list of
//! [`TypeDefinition`]s, each owning its [`FieldDefinition`]s and [`MethodDefinition`]s. The
//! patcher may change attribute sets through [`Module::types_mut`], but it cannot add,
//! remove or reorder definitions.

use serde::{Deserialize, Serialize};

use crate::metadata::{
    attributes::{FieldAttributes, MethodAttributes, TypeAttributes},
    token::Token,
};

/// Full name of the base type every delegate derives from
pub const MULTICAST_DELEGATE: &str = "System.MulticastDelegate";

/// One loaded binary module.
pub trait Module {
    /// Returns the module's name, usually its file name.
    fn name(&self) -> &str;

    /// Returns all type definitions in enumeration order.
    fn types(&self) -> &[TypeDefinition];

    /// Returns all type definitions for in-place modification.
    fn types_mut(&mut self) -> &mut [TypeDefinition];

    /// Returns the type definition with `token`.
    fn type_by_token(&self, token: Token) -> Option<&TypeDefinition> {
        self.types().iter().find(|ty| ty.token == token)
    }

    /// Returns the full name of `ty` with enclosing types joined by `/` (`Outer/Inner`).
    fn qualified_name(&self, ty: &TypeDefinition) -> String {
        let mut name = ty.full_name();
        let mut current = ty.declaring_type;
        let mut depth = 0;

        while let Some(token) = current {
            // Cycles only occur in damaged metadata.
            depth += 1;
            if depth > self.types().len() {
                break;
            }

            let Some(outer) = self.type_by_token(token) else {
                break;
            };
            name = format!("{}/{}", outer.full_name(), name);
            current = outer.declaring_type;
        }

        name
    }
}

/// A declared class, interface or value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
    /// `TypeDef` token
    pub token: Token,
    /// Namespace, empty for nested and global types
    #[serde(default)]
    pub namespace: String,
    /// Simple name
    pub name: String,
    /// Attribute set
    pub flags: TypeAttributes,
    /// Full name of the immediate base type, absent for interfaces and `System.Object`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    /// Token of the enclosing type for nested types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<Token>,
    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Methods in declaration order
    #[serde(default)]
    pub methods: Vec<MethodDefinition>,
}

impl TypeDefinition {
    /// Returns `Namespace.Name`, or just `Name` without a namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Returns true unless this is an interface. Value types and enums count as classes.
    #[must_use]
    pub fn is_class(&self) -> bool {
        !self.flags.is_interface()
    }

    /// Returns true if the type is declared inside another type.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.declaring_type.is_some()
    }

    /// Returns true for abstract types.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(TypeAttributes::ABSTRACT)
    }

    /// Returns true for sealed types.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.flags.contains(TypeAttributes::SEALED)
    }

    /// Returns true if the immediate base type is [`MULTICAST_DELEGATE`].
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        self.base_type.as_deref() == Some(MULTICAST_DELEGATE)
    }
}

/// A field owned by a [`TypeDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// `Field` token
    pub token: Token,
    /// Name
    pub name: String,
    /// Attribute set
    pub flags: FieldAttributes,
}

impl FieldDefinition {
    /// Returns true if the field is accessible by anyone who can see its type.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags.access() == FieldAttributes::PUBLIC.bits()
    }
}

/// A method owned by a [`TypeDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDefinition {
    /// `MethodDef` token
    pub token: Token,
    /// Name
    pub name: String,
    /// Attribute set
    pub flags: MethodAttributes,
}

impl MethodDefinition {
    /// Returns true if the method is accessible by anyone who can see its type.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.flags.access() == MethodAttributes::PUBLIC.bits()
    }

    /// Returns true for static methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodAttributes::STATIC)
    }

    /// Returns true for abstract methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(MethodAttributes::ABSTRACT)
    }

    /// Returns true for virtual methods.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags.contains(MethodAttributes::VIRTUAL)
    }

    /// Returns true for instance (`.ctor`) and type (`.cctor`) constructors.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.flags.contains(MethodAttributes::RT_SPECIAL_NAME)
            && (self.name == ".ctor" || self.name == ".cctor")
    }
}
