//! The backend for PE images carrying .NET metadata.
//!
//! Loading maps the file, locates the metadata through [`MetadataLayout`] and decodes the
//! `TypeDef`, `TypeRef`, `Field`, `MethodDef` and `NestedClass` tables (plus the `FieldPtr` /
//! `MethodPtr` indirections of unoptimized metadata) into [`TypeDefinition`]s.
//!
//! Writing never re-serializes the metadata. Attribute columns have a fixed width, so the
//! new flags are stored over the old ones in a copy of the original image and every other
//! byte, heaps and row sizes included, stays as it was.

use std::{fs, ops::Range, path::Path};

use crate::{
    backend::MetadataBackend,
    file::{io::write_le_at, File},
    metadata::{
        attributes::{FieldAttributes, MethodAttributes, TypeAttributes},
        layout::MetadataLayout,
        streams::Strings,
        tables::{
            CodedIndex, FieldPtrRaw, FieldRaw, MethodDefRaw, MethodPtrRaw, NestedClassRaw,
            TableId, TypeDefRaw, TypeRefRaw, FIELD_FLAGS_OFFSET, METHODDEF_FLAGS_OFFSET,
            TYPEDEF_FLAGS_OFFSET,
        },
        token::Token,
    },
    module::{FieldDefinition, MethodDefinition, Module, TypeDefinition},
    Error, Result,
};

/// Backend for .NET PE images.
#[derive(Debug, Clone, Copy, Default)]
pub struct CilBackend;

impl MetadataBackend for CilBackend {
    type Module = CilModule;

    fn name(&self) -> &'static str {
        "cil"
    }

    fn load_module(&self, path: &Path) -> Result<CilModule> {
        let file = File::from_file(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        CilModule::from_file(name, file)
    }

    fn write_module(&self, module: CilModule, path: &Path) -> Result<()> {
        let image = module.into_bytes().map_err(|error| Error::WriteFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

        fs::write(path, image).map_err(|error| Error::WriteFailed {
            path: path.to_path_buf(),
            message: error.to_string(),
        })
    }
}

/// A module loaded from a .NET PE image.
pub struct CilModule {
    name: String,
    file: File,
    layout: MetadataLayout,
    types: Vec<TypeDefinition>,
    nested: Vec<bool>,
}

impl CilModule {
    /// Load a module from the bytes of a PE image.
    ///
    /// # Errors
    /// Returns an error if `data` is not a PE image with intact .NET metadata.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<CilModule> {
        Self::from_file(name.into(), File::from_mem(data)?)
    }

    fn from_file(name: String, file: File) -> Result<CilModule> {
        let layout = MetadataLayout::locate(&file)?;
        if layout.cor20.is_strong_name_signed() {
            log::warn!("{name} is strong name signed, patching invalidates the signature");
        }

        let (types, nested) = read_types(&file, &layout)?;
        log::debug!(
            "{name}: metadata {}, {} types, {} fields, {} methods",
            layout.version,
            types.len(),
            layout.header.rows(TableId::Field),
            layout.header.rows(TableId::MethodDef)
        );

        Ok(CilModule {
            name,
            file,
            layout,
            types,
            nested,
        })
    }

    /// Returns the located metadata.
    #[must_use]
    pub fn layout(&self) -> &MetadataLayout {
        &self.layout
    }

    /// Returns the runtime version string of the metadata root.
    #[must_use]
    pub fn runtime_version(&self) -> &str {
        &self.layout.version
    }

    /// Check that every definition still refers to an existing row and that type
    /// visibilities match the nesting recorded in the image.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] describing the first inconsistency.
    pub fn validate(&self) -> Result<()> {
        let header = &self.layout.header;

        for ty in &self.types {
            let rid = checked_rid(ty.token, TableId::TypeDef, header.rows(TableId::TypeDef))?;

            let was_nested = self.nested.get(rid as usize).copied().unwrap_or(false);
            if ty.is_nested() != was_nested {
                return Err(malformed_error!(
                    "Type {} changed its nesting",
                    ty.token
                ));
            }

            if ty.flags.is_nested() != was_nested {
                return Err(malformed_error!(
                    "Type {} has visibility {} but is {}nested",
                    ty.token,
                    ty.flags.visibility(),
                    if was_nested { "" } else { "not " }
                ));
            }

            for field in &ty.fields {
                checked_rid(field.token, TableId::Field, header.rows(TableId::Field))?;
            }
            for method in &ty.methods {
                checked_rid(method.token, TableId::MethodDef, header.rows(TableId::MethodDef))?;
            }
        }

        Ok(())
    }

    /// Validate the module and return a copy of the image with all attribute columns
    /// replaced by the module's current flags.
    ///
    /// # Errors
    /// Returns an error if [`CilModule::validate`] fails.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        self.validate()?;

        let CilModule {
            name,
            file,
            layout,
            types,
            ..
        } = self;
        let mut image = file.into_data();
        let mut changed = 0_usize;

        let mut store = |table: TableId,
                         rid: u32,
                         column: usize,
                         bits: u32,
                         wide: bool|
         -> Result<()> {
            let Some(row) = layout.row_file_offset(table, rid) else {
                return Err(malformed_error!("{} row {} does not exist", table, rid));
            };

            let mut encoded = [0_u8; 4];
            let mut len = 0;
            if wide {
                write_le_at(&mut encoded, &mut len, bits)?;
            } else {
                #[allow(clippy::cast_possible_truncation)]
                write_le_at(&mut encoded, &mut len, bits as u16)?;
            }

            let start = row + column;
            let Some(cell) = image.get_mut(start..start + len) else {
                return Err(Error::OutOfBounds);
            };
            if cell != &encoded[..len] {
                cell.copy_from_slice(&encoded[..len]);
                changed += 1;
            }

            Ok(())
        };

        for ty in &types {
            store(TableId::TypeDef, ty.token.row(), TYPEDEF_FLAGS_OFFSET, ty.flags.bits(), true)?;

            for field in &ty.fields {
                store(
                    TableId::Field,
                    field.token.row(),
                    FIELD_FLAGS_OFFSET,
                    u32::from(field.flags.bits()),
                    false,
                )?;
            }

            for method in &ty.methods {
                store(
                    TableId::MethodDef,
                    method.token.row(),
                    METHODDEF_FLAGS_OFFSET,
                    u32::from(method.flags.bits()),
                    false,
                )?;
            }
        }

        log::debug!("{name}: rewrote {changed} attribute columns");
        Ok(image)
    }
}

impl Module for CilModule {
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

fn checked_rid(token: Token, table: TableId, rows: u32) -> Result<u32> {
    if token.table() != table as u8 || token.row() == 0 || token.row() > rows {
        return Err(malformed_error!(
            "Token {} is not a valid {} row",
            token,
            table
        ));
    }

    Ok(token.row())
}

/// The rows a `field_list` / `method_list` run covers, clamped to the table.
fn member_range(start: u32, next_start: Option<u32>, count: u32) -> Range<u32> {
    let end = next_start.unwrap_or(count + 1).min(count + 1);
    let start = start.max(1);

    if start >= end {
        start..start
    } else {
        start..end
    }
}

/// Resolve run entries through a pointer table, if the image has one.
fn resolve_runs(range: Range<u32>, pointers: &[u32]) -> Vec<u32> {
    if pointers.is_empty() {
        range.collect()
    } else {
        range
            .filter_map(|index| pointers.get(index as usize - 1).copied())
            .collect()
    }
}

/// Names of the rows of a table with nesting, `Outer/Inner` style.
fn nested_name(names: &[String], parents: &[Option<u32>], rid: u32) -> String {
    let mut name = names[rid as usize - 1].clone();
    let mut current = parents[rid as usize - 1];
    let mut depth = 0;

    while let Some(parent) = current {
        depth += 1;
        if depth > names.len() || parent == 0 || parent as usize > names.len() {
            break;
        }

        name = format!("{}/{}", names[parent as usize - 1], name);
        current = parents[parent as usize - 1];
    }

    name
}

fn joined_name(strings: &Strings, namespace: u32, name: u32) -> Result<String> {
    let namespace = strings.get(namespace as usize)?;
    let name = strings.get(name as usize)?;

    Ok(if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    })
}

fn read_types(file: &File, layout: &MetadataLayout) -> Result<(Vec<TypeDefinition>, Vec<bool>)> {
    let data = file.data();
    let strings = layout.strings(data)?;
    let tables = layout.tables_data(data)?;
    let header = &layout.header;

    let typedefs = header
        .table::<TypeDefRaw>(tables)?
        .iter()
        .collect::<Result<Vec<_>>>()?;
    let typerefs = header
        .table::<TypeRefRaw>(tables)?
        .iter()
        .collect::<Result<Vec<_>>>()?;
    let fields = header.table::<FieldRaw>(tables)?;
    let methods = header.table::<MethodDefRaw>(tables)?;
    let field_ptrs = header
        .table::<FieldPtrRaw>(tables)?
        .iter()
        .map(|row| row.map(|row| row.field))
        .collect::<Result<Vec<_>>>()?;
    let method_ptrs = header
        .table::<MethodPtrRaw>(tables)?
        .iter()
        .map(|row| row.map(|row| row.method))
        .collect::<Result<Vec<_>>>()?;

    let mut enclosing: Vec<Option<u32>> = vec![None; typedefs.len()];
    for row in header.table::<NestedClassRaw>(tables)?.iter() {
        let row = row?;
        let valid = row.enclosing_class != 0 && row.enclosing_class as usize <= typedefs.len();
        match enclosing.get_mut((row.nested_class as usize).wrapping_sub(1)) {
            Some(slot) if valid => {
                *slot = Some(row.enclosing_class);
            }
            _ => {
                return Err(malformed_error!(
                    "NestedClass row {} links invalid types {} -> {}",
                    row.rid,
                    row.nested_class,
                    row.enclosing_class
                ))
            }
        }
    }

    let typedef_names = typedefs
        .iter()
        .map(|row| joined_name(&strings, row.type_namespace, row.type_name))
        .collect::<Result<Vec<_>>>()?;
    let typeref_names = typerefs
        .iter()
        .map(|row| joined_name(&strings, row.type_namespace, row.type_name))
        .collect::<Result<Vec<_>>>()?;
    let typeref_parents = typerefs
        .iter()
        .map(|row| match row.resolution_scope.tag {
            TableId::TypeRef if !row.resolution_scope.is_null() => Some(row.resolution_scope.row),
            _ => None,
        })
        .collect::<Vec<_>>();

    let base_name = |extends: &CodedIndex| -> Option<String> {
        if extends.is_null() {
            return None;
        }

        match extends.tag {
            TableId::TypeDef if extends.row as usize <= typedef_names.len() => {
                Some(nested_name(&typedef_names, &enclosing, extends.row))
            }
            TableId::TypeRef if extends.row as usize <= typeref_names.len() => {
                Some(nested_name(&typeref_names, &typeref_parents, extends.row))
            }
            _ => Some(format!("{}[{}]", extends.tag, extends.token)),
        }
    };

    let field_count = if field_ptrs.is_empty() {
        fields.row_count()
    } else {
        u32::try_from(field_ptrs.len()).map_err(|_| malformed_error!("FieldPtr too large"))?
    };
    let method_count = if method_ptrs.is_empty() {
        methods.row_count()
    } else {
        u32::try_from(method_ptrs.len()).map_err(|_| malformed_error!("MethodPtr too large"))?
    };

    let mut types = Vec::with_capacity(typedefs.len());
    for (index, row) in typedefs.iter().enumerate() {
        let next = typedefs.get(index + 1);

        let field_rids = resolve_runs(
            member_range(row.field_list, next.map(|next| next.field_list), field_count),
            &field_ptrs,
        );
        let method_rids = resolve_runs(
            member_range(row.method_list, next.map(|next| next.method_list), method_count),
            &method_ptrs,
        );

        let mut type_fields = Vec::with_capacity(field_rids.len());
        for rid in field_rids {
            let field = fields.get(rid)?;
            type_fields.push(FieldDefinition {
                token: field.token,
                name: strings.get(field.name as usize)?.to_string(),
                flags: FieldAttributes::from_bits_retain(field.flags),
            });
        }

        let mut type_methods = Vec::with_capacity(method_rids.len());
        for rid in method_rids {
            let method = methods.get(rid)?;
            type_methods.push(MethodDefinition {
                token: method.token,
                name: strings.get(method.name as usize)?.to_string(),
                flags: MethodAttributes::from_bits_retain(method.flags),
            });
        }

        types.push(TypeDefinition {
            token: row.token,
            namespace: strings.get(row.type_namespace as usize)?.to_string(),
            name: strings.get(row.type_name as usize)?.to_string(),
            flags: TypeAttributes::from_bits_retain(row.flags),
            base_type: base_name(&row.extends),
            declaring_type: enclosing[index]
                .map(|outer| Token::new(TableId::TypeDef.token_type() | outer)),
            fields: type_fields,
            methods: type_methods,
        });
    }

    let mut nested = vec![false; typedefs.len() + 1];
    for (index, outer) in enclosing.iter().enumerate() {
        nested[index + 1] = outer.is_some();
    }

    Ok((types, nested))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        file::io::read_le,
        metadata::tables::TableId,
        test::{CilImageBuilder, TypeBuilder},
    };

    fn widget_image() -> Vec<u8> {
        CilImageBuilder::new()
            .type_def(
                TypeBuilder::class("Acme", "Widget")
                    .flags(0x0010_0101)
                    .field("count", 0x0001)
                    .method(".ctor", 0x1886)
                    .method("Spin", 0x0081),
            )
            .type_def(
                TypeBuilder::class("", "Hidden")
                    .flags(0x0000_0083)
                    .nested_in(2)
                    .method("Run", 0x0401),
            )
            .type_def(
                TypeBuilder::class("Acme", "Callback")
                    .flags(0x0000_0101)
                    .extends_ref("System", "MulticastDelegate")
                    .method("Invoke", 0x01C6),
            )
            .build()
    }

    #[test]
    fn load_types() {
        let module = CilModule::from_bytes("widget.dll", widget_image()).unwrap();
        let types = module.types();

        assert_eq!(module.name(), "widget.dll");
        assert_eq!(module.runtime_version(), "v4.0.30319");
        assert_eq!(types.len(), 4);

        assert_eq!(types[0].name, "<Module>");
        assert_eq!(types[0].base_type, None);

        let widget = &types[1];
        assert_eq!(widget.token, Token::new(0x0200_0002));
        assert_eq!(widget.full_name(), "Acme.Widget");
        assert_eq!(widget.flags.bits(), 0x0010_0101);
        assert_eq!(widget.base_type.as_deref(), Some("System.Object"));
        assert!(!widget.is_nested());
        assert_eq!(widget.fields.len(), 1);
        assert_eq!(widget.fields[0].name, "count");
        assert_eq!(widget.fields[0].token, Token::new(0x0400_0001));
        assert_eq!(widget.methods.len(), 2);
        assert!(widget.methods[0].is_constructor());
        assert_eq!(widget.methods[1].token, Token::new(0x0600_0002));

        let hidden = &types[2];
        assert!(hidden.is_nested());
        assert_eq!(hidden.declaring_type, Some(Token::new(0x0200_0002)));
        assert_eq!(module.qualified_name(hidden), "Acme.Widget/Hidden");
        assert!(hidden.fields.is_empty());
        assert_eq!(hidden.methods.len(), 1);

        assert!(types[3].is_delegate());
    }

    #[test]
    fn typespec_base_is_named_by_token() {
        let image = CilImageBuilder::new()
            .type_def(TypeBuilder::class("Acme", "Items").extends_spec())
            .build();

        let module = CilModule::from_bytes("generic.dll", image).unwrap();
        let items = &module.types()[1];

        assert_eq!(items.base_type.as_deref(), Some("TypeSpec[0x1b000001]"));
        assert!(!items.is_delegate());
    }

    #[test]
    fn rewrites_only_flag_columns() {
        let image = widget_image();
        let mut module = CilModule::from_bytes("widget.dll", image.clone()).unwrap();

        let field_offset = module.layout().row_file_offset(TableId::Field, 1).unwrap();
        let method_offset = module.layout().row_file_offset(TableId::MethodDef, 2).unwrap();
        let type_offset = module.layout().row_file_offset(TableId::TypeDef, 2).unwrap();

        {
            let widget = &mut module.types_mut()[1];
            widget.flags = widget.flags.difference(TypeAttributes::SEALED);
            widget.fields[0].flags = widget.fields[0].flags.with_access(FieldAttributes::PUBLIC);
            widget.methods[1].flags |= MethodAttributes::VIRTUAL;
        }

        let patched = module.into_bytes().unwrap();
        assert_eq!(patched.len(), image.len());

        assert_eq!(read_le::<u32>(&patched[type_offset..]).unwrap(), 0x0010_0001);
        assert_eq!(read_le::<u16>(&patched[field_offset..]).unwrap(), 0x0006);
        assert_eq!(
            read_le::<u16>(&patched[method_offset + METHODDEF_FLAGS_OFFSET..]).unwrap(),
            0x00C1
        );

        let differing: Vec<usize> = image
            .iter()
            .zip(&patched)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(
            differing,
            vec![type_offset + 1, field_offset, method_offset + METHODDEF_FLAGS_OFFSET]
        );

        let reloaded = CilModule::from_bytes("widget.dll", patched).unwrap();
        assert_eq!(reloaded.types()[1].flags.bits(), 0x0010_0001);
        assert!(reloaded.types()[1].fields[0].is_public());
        assert!(reloaded.types()[1].methods[1].is_virtual());
    }

    #[test]
    fn unchanged_module_round_trips() {
        let image = widget_image();
        let module = CilModule::from_bytes("widget.dll", image.clone()).unwrap();
        assert_eq!(module.into_bytes().unwrap(), image);
    }

    #[test]
    fn rejects_visibility_nesting_mismatch() {
        let mut module = CilModule::from_bytes("widget.dll", widget_image()).unwrap();
        let widget = &mut module.types_mut()[1];
        widget.flags = widget.flags.with_visibility(TypeAttributes::NESTED_PUBLIC);

        assert!(module.validate().is_err());
        assert!(module.into_bytes().is_err());
    }

    #[test]
    fn rejects_foreign_tokens() {
        let mut module = CilModule::from_bytes("widget.dll", widget_image()).unwrap();
        module.types_mut()[1].fields[0].token = Token::new(0x0400_0063);

        assert!(module.validate().is_err());
    }

    #[test]
    fn pointer_tables() {
        let image = CilImageBuilder::new()
            .uncompressed()
            .type_def(
                TypeBuilder::class("Acme", "First")
                    .field("a", 0x0001)
                    .field("b", 0x0001)
                    .method("M", 0x0001),
            )
            .type_def(TypeBuilder::class("Acme", "Second").field("c", 0x0011))
            .reverse_pointers()
            .build();

        let module = CilModule::from_bytes("ptr.dll", image).unwrap();
        assert!(module.layout().is_uncompressed);

        let first = &module.types()[1];
        let second = &module.types()[2];
        // FieldPtr lists the three fields in reverse
        assert_eq!(first.fields[0].token, Token::new(0x0400_0003));
        assert_eq!(first.fields[0].name, "c");
        assert_eq!(first.fields[1].name, "b");
        assert_eq!(second.fields[0].name, "a");
        assert_eq!(first.methods[0].name, "M");
    }

    #[test]
    fn write_module_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.dll");
        fs::write(&path, widget_image()).unwrap();

        let backend = CilBackend;
        let mut module = backend.load_module(&path).unwrap();
        module.types_mut()[1].flags.remove(TypeAttributes::SEALED);
        backend.write_module(module, &path).unwrap();

        let reloaded = backend.load_module(&path).unwrap();
        assert!(!reloaded.types()[1].is_sealed());
    }

    #[test]
    fn not_a_module() {
        assert!(CilModule::from_bytes("x", Vec::new()).is_err());
        assert!(CilModule::from_bytes("x", vec![0x4D; 1024]).is_err());
        assert!(CilModule::from_bytes("x", CilImageBuilder::new().without_clr().build()).is_err());
    }
}
