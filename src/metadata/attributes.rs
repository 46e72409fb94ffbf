//! Attribute bitmasks of types, fields and methods.
//!
//! The visibility and member access values are not independent bits but a 3-bit field,
//! so they are compared through their masks ([`TypeAttributes::visibility`],
//! [`FieldAttributes::access`], [`MethodAttributes::access`]) rather than with `contains`.
//! The multi-bit values are declared from the largest down so that a field value prints and
//! parses as its single name.
//!
//! # Reference
//! - [ECMA-335 II.23.1](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Bitmask for type visibility extraction
pub const TYPE_VISIBILITY_MASK: u32 = 0x0000_0007;
/// Bitmask for member access extraction, shared by fields and methods
pub const MEMBER_ACCESS_MASK: u16 = 0x0007;

bitflags! {
    /// `TypeAttributes` of a `TypeDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TypeAttributes: u32 {
        /// Nested, visible to family or assembly
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Nested, visible to family and assembly
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, visible within the assembly
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, visible to the enclosing type and derived types
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, visible to the enclosing type only
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, visible everywhere the enclosing type is
        const NESTED_PUBLIC = 0x0000_0002;
        /// Top level, visible outside the assembly
        const PUBLIC = 0x0000_0001;
        /// Fields are laid out as given
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Fields are laid out sequentially
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Type is an interface
        const INTERFACE = 0x0000_0020;
        /// Type cannot be instantiated
        const ABSTRACT = 0x0000_0080;
        /// Type cannot be derived from
        const SEALED = 0x0000_0100;
        /// Name is special
        const SPECIAL_NAME = 0x0000_0400;
        /// Runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Type is imported
        const IMPORT = 0x0000_1000;
        /// Type is serializable
        const SERIALIZABLE = 0x0000_2000;
        /// Type is a Windows Runtime type
        const WINDOWS_RUNTIME = 0x0000_4000;
        /// Strings are marshalled as unicode
        const UNICODE_CLASS = 0x0001_0000;
        /// Strings are marshalled automatically
        const AUTO_CLASS = 0x0002_0000;
        /// Type has security information
        const HAS_SECURITY = 0x0004_0000;
        /// Static fields may be initialized lazily
        const BEFORE_FIELD_INIT = 0x0010_0000;
    }
}

impl TypeAttributes {
    /// Returns the raw visibility value (`0` = not public, `1` = public, `2..=7` nested).
    #[must_use]
    pub fn visibility(self) -> u32 {
        self.bits() & TYPE_VISIBILITY_MASK
    }

    /// Returns a copy with the visibility field replaced by `visibility`'s.
    #[must_use]
    pub fn with_visibility(self, visibility: TypeAttributes) -> Self {
        Self::from_bits_retain(
            (self.bits() & !TYPE_VISIBILITY_MASK) | (visibility.bits() & TYPE_VISIBILITY_MASK),
        )
    }

    /// Returns true for any of the nested visibilities.
    #[must_use]
    pub fn is_nested(self) -> bool {
        self.visibility() >= Self::NESTED_PUBLIC.bits()
    }

    /// Returns true for an interface.
    #[must_use]
    pub fn is_interface(self) -> bool {
        self.contains(Self::INTERFACE)
    }
}

bitflags! {
    /// `FieldAttributes` of a `Field` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct FieldAttributes: u16 {
        /// Accessible by anyone who can see the declaring type
        const PUBLIC = 0x0006;
        /// Accessible by derived types and anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by derived types only
        const FAMILY = 0x0004;
        /// Accessible by anyone in the assembly
        const ASSEMBLY = 0x0003;
        /// Accessible by derived types in the assembly only
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by the declaring type only
        const PRIVATE = 0x0001;
        /// Defined on the type, else per instance
        const STATIC = 0x0010;
        /// Can only be set during initialization
        const INIT_ONLY = 0x0020;
        /// Value is a compile time constant
        const LITERAL = 0x0040;
        /// Not serialized when the type is remoted
        const NOT_SERIALIZED = 0x0080;
        /// Field has an RVA
        const HAS_FIELD_RVA = 0x0100;
        /// Name is special
        const SPECIAL_NAME = 0x0200;
        /// Runtime should check the name encoding
        const RT_SPECIAL_NAME = 0x0400;
        /// Field has marshalling information
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Field has a default value
        const HAS_DEFAULT = 0x8000;
    }
}

impl FieldAttributes {
    /// Returns the raw member access value (`1` private up to `6` public).
    #[must_use]
    pub fn access(self) -> u16 {
        self.bits() & MEMBER_ACCESS_MASK
    }

    /// Returns a copy with the access field replaced by `access`'s.
    #[must_use]
    pub fn with_access(self, access: FieldAttributes) -> Self {
        Self::from_bits_retain(
            (self.bits() & !MEMBER_ACCESS_MASK) | (access.bits() & MEMBER_ACCESS_MASK),
        )
    }
}

bitflags! {
    /// `MethodAttributes` of a `MethodDef` row
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MethodAttributes: u16 {
        /// Accessible by anyone who can see the declaring type
        const PUBLIC = 0x0006;
        /// Accessible by derived types and anyone in the assembly
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by derived types only
        const FAMILY = 0x0004;
        /// Accessible by anyone in the assembly
        const ASSEM = 0x0003;
        /// Accessible by derived types in the assembly only
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by the declaring type only
        const PRIVATE = 0x0001;
        /// Reserved: shall be zero for conforming implementations
        const UNMANAGED_EXPORT = 0x0008;
        /// Defined on the type, else per instance
        const STATIC = 0x0010;
        /// Method cannot be overridden
        const FINAL = 0x0020;
        /// Method is virtual
        const VIRTUAL = 0x0040;
        /// Method hides by name and signature, else just by name
        const HIDE_BY_SIG = 0x0080;
        /// Method always gets a new slot in the vtable
        const NEW_SLOT = 0x0100;
        /// Method can only be overridden if also accessible
        const STRICT = 0x0200;
        /// Method does not provide an implementation
        const ABSTRACT = 0x0400;
        /// Name is special
        const SPECIAL_NAME = 0x0800;
        /// Runtime provides special behavior depending on the name
        const RT_SPECIAL_NAME = 0x1000;
        /// Implementation is forwarded through PInvoke
        const PINVOKE_IMPL = 0x2000;
        /// Method has security associated with it
        const HAS_SECURITY = 0x4000;
        /// Method calls another method containing security code
        const REQUIRE_SEC_OBJECT = 0x8000;
    }
}

impl MethodAttributes {
    /// Returns the raw member access value (`1` private up to `6` public).
    #[must_use]
    pub fn access(self) -> u16 {
        self.bits() & MEMBER_ACCESS_MASK
    }

    /// Returns a copy with the access field replaced by `access`'s.
    #[must_use]
    pub fn with_access(self, access: MethodAttributes) -> Self {
        Self::from_bits_retain(
            (self.bits() & !MEMBER_ACCESS_MASK) | (access.bits() & MEMBER_ACCESS_MASK),
        )
    }
}
