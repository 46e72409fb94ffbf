//! Coded indexes: a table tag and a row id packed into one 2 or 4 byte column.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::{EnumCount, EnumIter};

use crate::{
    file::io::read_le_at,
    metadata::{
        tables::{TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// The kinds of coded index used by the metadata tables.
#[allow(missing_docs)]
#[derive(Debug, Hash, Eq, PartialEq, Clone, Copy, EnumIter, EnumCount)]
#[repr(usize)]
pub enum CodedIndexType {
    TypeDefOrRef,
    HasConstant,
    HasCustomAttribute,
    HasFieldMarshal,
    HasDeclSecurity,
    MemberRefParent,
    HasSemantics,
    MethodDefOrRef,
    MemberForwarded,
    Implementation,
    CustomAttributeType,
    ResolutionScope,
    TypeOrMethodDef,
}

impl CodedIndexType {
    /// Returns the tables this coded index can point to, in tag order.
    #[must_use]
    pub fn tables(&self) -> &'static [TableId] {
        match self {
            CodedIndexType::TypeDefOrRef => {
                &[TableId::TypeDef, TableId::TypeRef, TableId::TypeSpec]
            }
            CodedIndexType::HasConstant => &[TableId::Field, TableId::Param, TableId::Property],
            CodedIndexType::HasCustomAttribute => &[
                TableId::MethodDef,
                TableId::Field,
                TableId::TypeRef,
                TableId::TypeDef,
                TableId::Param,
                TableId::InterfaceImpl,
                TableId::MemberRef,
                TableId::Module,
                TableId::DeclSecurity,
                TableId::Property,
                TableId::Event,
                TableId::StandAloneSig,
                TableId::ModuleRef,
                TableId::TypeSpec,
                TableId::Assembly,
                TableId::AssemblyRef,
                TableId::File,
                TableId::ExportedType,
                TableId::ManifestResource,
                TableId::GenericParam,
                TableId::GenericParamConstraint,
                TableId::MethodSpec,
            ],
            CodedIndexType::HasFieldMarshal => &[TableId::Field, TableId::Param],
            CodedIndexType::HasDeclSecurity => {
                &[TableId::TypeDef, TableId::MethodDef, TableId::Assembly]
            }
            CodedIndexType::MemberRefParent => &[
                TableId::TypeDef,
                TableId::TypeRef,
                TableId::ModuleRef,
                TableId::MethodDef,
                TableId::TypeSpec,
            ],
            CodedIndexType::HasSemantics => &[TableId::Event, TableId::Property],
            CodedIndexType::MethodDefOrRef => &[TableId::MethodDef, TableId::MemberRef],
            CodedIndexType::MemberForwarded => &[TableId::Field, TableId::MethodDef],
            CodedIndexType::Implementation => {
                &[TableId::File, TableId::AssemblyRef, TableId::ExportedType]
            }
            // Tags 0, 1 and 4 are unused; they only count towards the tag width.
            CodedIndexType::CustomAttributeType => &[
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MethodDef,
                TableId::MemberRef,
                TableId::MemberRef,
            ],
            CodedIndexType::ResolutionScope => &[
                TableId::Module,
                TableId::ModuleRef,
                TableId::AssemblyRef,
                TableId::TypeRef,
            ],
            CodedIndexType::TypeOrMethodDef => &[TableId::TypeDef, TableId::MethodDef],
        }
    }

    /// Returns the number of low bits holding the table tag.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn tag_bits(&self) -> u8 {
        let count = self.tables().len() as u32;
        (u32::BITS - (count - 1).leading_zeros()) as u8
    }
}

/// A decoded coded index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedIndex {
    /// The table the index points into
    pub tag: TableId,
    /// The row id within `tag`, 0 for a null reference
    pub row: u32,
    /// `tag` and `row` combined into a token
    pub token: Token,
}

impl CodedIndex {
    /// Read and decode a coded index of kind `ci_type` at `offset`, advancing it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the column does not fit in `data` and
    /// [`crate::Error::Malformed`] for a tag outside of `ci_type`.
    pub fn read(
        data: &[u8],
        offset: &mut usize,
        info: &TableInfo,
        ci_type: CodedIndexType,
    ) -> Result<Self> {
        let coded_index = if info.coded_index_bytes(ci_type) == 4 {
            read_le_at::<u32>(data, offset)?
        } else {
            u32::from(read_le_at::<u16>(data, offset)?)
        };

        let tag_bits = ci_type.tag_bits();
        let tag = (coded_index & ((1 << tag_bits) - 1)) as usize;
        let tables = ci_type.tables();
        let Some(table) = tables.get(tag) else {
            return Err(malformed_error!(
                "Invalid {:?} tag {} in coded index 0x{:x}",
                ci_type,
                tag,
                coded_index
            ));
        };

        Ok(CodedIndex::new(*table, coded_index >> tag_bits))
    }

    /// Creates a coded index from a table and row id.
    #[must_use]
    pub fn new(tag: TableId, row: u32) -> CodedIndex {
        CodedIndex {
            tag,
            row,
            token: Token::new(tag.token_type() | row),
        }
    }

    /// Returns true if the index refers to no row.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row == 0
    }
}
