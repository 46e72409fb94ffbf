//! Factories for module definitions and an in-memory [`Module`].

use crate::{
    metadata::{
        attributes::{FieldAttributes, MethodAttributes, TypeAttributes},
        token::Token,
    },
    module::{FieldDefinition, MethodDefinition, Module, TypeDefinition},
};

// Helper function to create a top-level TypeDefinition
pub fn create_type(
    rid: u32,
    namespace: &str,
    name: &str,
    flags: u32,
    base_type: Option<&str>,
) -> TypeDefinition {
    TypeDefinition {
        token: Token::new(0x0200_0000 + rid),
        namespace: namespace.to_string(),
        name: name.to_string(),
        flags: TypeAttributes::from_bits_retain(flags),
        base_type: base_type.map(str::to_string),
        declaring_type: None,
        fields: Vec::new(),
        methods: Vec::new(),
    }
}

// Helper function to create a nested TypeDefinition
pub fn create_nested_type(rid: u32, name: &str, flags: u32, declaring_type: Token) -> TypeDefinition {
    TypeDefinition {
        declaring_type: Some(declaring_type),
        ..create_type(rid, "", name, flags, Some("System.Object"))
    }
}

// Helper function to create a FieldDefinition
pub fn create_field(rid: u32, name: &str, flags: u16) -> FieldDefinition {
    FieldDefinition {
        token: Token::new(0x0400_0000 + rid),
        name: name.to_string(),
        flags: FieldAttributes::from_bits_retain(flags),
    }
}

// Helper function to create a MethodDefinition
pub fn create_method(rid: u32, name: &str, flags: u16) -> MethodDefinition {
    MethodDefinition {
        token: Token::new(0x0600_0000 + rid),
        name: name.to_string(),
        flags: MethodAttributes::from_bits_retain(flags),
    }
}

/// A module that only lives in memory.
#[derive(Debug, Clone, Default)]
pub struct TestModule {
    pub types: Vec<TypeDefinition>,
}

impl TestModule {
    pub fn new(types: Vec<TypeDefinition>) -> Self {
        TestModule { types }
    }
}

impl Module for TestModule {
    fn name(&self) -> &str {
        "test.dll"
    }

    fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    fn types_mut(&mut self) -> &mut [TypeDefinition] {
        &mut self.types
    }
}
