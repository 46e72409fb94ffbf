//! The backend for JSON module manifests.
//!
//! A manifest is the serialized form of a [`ManifestModule`]:
//!
//! ```json
//! {
//!   "name": "Widgets.dll",
//!   "types": [
//!     {
//!       "token": 33554434,
//!       "namespace": "Acme",
//!       "name": "Widget",
//!       "flags": "PUBLIC | SEALED",
//!       "base_type": "System.Object",
//!       "fields": [{ "token": 67108865, "name": "count", "flags": "PRIVATE" }],
//!       "methods": []
//!     }
//!   ]
//! }
//! ```
//!
//! Attribute sets are stored by flag name, so manifests stay readable and diff well.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    backend::MetadataBackend,
    module::{Module, TypeDefinition},
    Error, Result,
};

/// Backend reading and writing [`ManifestModule`] JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestBackend;

impl MetadataBackend for ManifestBackend {
    type Module = ManifestModule;

    fn name(&self) -> &'static str {
        "manifest"
    }

    fn load_module(&self, path: &Path) -> Result<ManifestModule> {
        let text = fs::read_to_string(path)?;
        let module: ManifestModule = serde_json::from_str(&text)?;

        log::debug!("{}: {} types from manifest", module.name, module.types.len());
        Ok(module)
    }

    fn write_module(&self, module: ManifestModule, path: &Path) -> Result<()> {
        let write_failed = |message: String| Error::WriteFailed {
            path: path.to_path_buf(),
            message,
        };

        let mut text =
            serde_json::to_string_pretty(&module).map_err(|error| write_failed(error.to_string()))?;
        text.push('\n');

        fs::write(path, text).map_err(|error| write_failed(error.to_string()))
    }
}

/// A module described by a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestModule {
    /// Module name
    pub name: String,
    /// Type definitions in enumeration order
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl ManifestModule {
    /// Create a manifest module.
    #[must_use]
    pub fn new(name: impl Into<String>, types: Vec<TypeDefinition>) -> Self {
        ManifestModule {
            name: name.into(),
            types,
        }
    }

    /// Capture the types of any module, e.g. to export a [`crate::backend::CilModule`].
    #[must_use]
    pub fn from_module<M: Module + ?Sized>(module: &M) -> Self {
        ManifestModule::new(module.name(), module.types().to_vec())
    }
}

impl Module for ManifestModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    fn types_mut(&mut self) -> &mut [TypeDefinition] {
        &mut self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::CilModule,
        metadata::attributes::TypeAttributes,
        test::{
            factories::{create_field, create_method, create_type},
            CilImageBuilder, TypeBuilder,
        },
    };

    #[test]
    fn export_cil_module() {
        let image = CilImageBuilder::new()
            .type_def(
                TypeBuilder::class("Acme", "Widget")
                    .flags(0x0010_0101)
                    .field("count", 0x0001)
                    .method("Spin", 0x0081),
            )
            .build();
        let cil = CilModule::from_bytes("Widgets.dll", image).unwrap();

        let exported = ManifestModule::from_module(&cil);
        assert_eq!(exported.name(), "Widgets.dll");
        assert_eq!(exported.types(), cil.types());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.json");
        ManifestBackend.write_module(exported.clone(), &path).unwrap();

        let loaded = ManifestBackend.load_module(&path).unwrap();
        assert_eq!(loaded, exported);
        assert_eq!(loaded.qualified_name(&loaded.types()[1]), "Acme.Widget");
    }

    #[test]
    fn load_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widgets.json");

        let mut widget = create_type(2, "Acme", "Widget", 0x0010_0101, Some("System.Object"));
        widget.fields.push(create_field(1, "count", 0x0001));
        widget.methods.push(create_method(1, ".ctor", 0x1886));
        let module = ManifestModule::new("Widgets.dll", vec![widget]);

        let backend = ManifestBackend;
        backend.write_module(module.clone(), &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"PUBLIC | SEALED | BEFORE_FIELD_INIT\""));

        let loaded = backend.load_module(&path).unwrap();
        assert_eq!(loaded, module);
        assert_eq!(loaded.types()[0].flags, TypeAttributes::from_bits_retain(0x0010_0101));
    }

    #[test]
    fn minimal_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        fs::write(
            &path,
            r#"{ "name": "Tiny.dll", "types": [ { "token": 33554433, "name": "<Module>", "flags": "" } ] }"#,
        )
        .unwrap();

        let module = ManifestBackend.load_module(&path).unwrap();
        assert_eq!(module.name(), "Tiny.dll");
        assert_eq!(module.types()[0].namespace, "");
        assert!(module.types()[0].fields.is_empty());
        assert!(module.types()[0].base_type.is_none());
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");

        assert!(matches!(
            ManifestBackend.load_module(&path),
            Err(Error::FileError(_))
        ));

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ManifestBackend.load_module(&path),
            Err(Error::Manifest(_))
        ));
    }
}
