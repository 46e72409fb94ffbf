//! The `TypeDef` table (0x02).

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Offset of the `Flags` column within a `TypeDef` row
pub const TYPEDEF_FLAGS_OFFSET: usize = 0;

/// A raw `TypeDef` row.
///
/// `field_list` and `method_list` start the runs of fields and methods owned by this type;
/// each run ends where the next row's run begins.
#[derive(Clone, Debug)]
pub struct TypeDefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x02000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// `TypeAttributes` bitmask
    pub flags: u32,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
    /// Base type, a `TypeDefOrRef` coded index
    pub extends: CodedIndex,
    /// First row of this type's fields in `Field` (or `FieldPtr`)
    pub field_list: u32,
    /// First row of this type's methods in `MethodDef` (or `MethodPtr`)
    pub method_list: u32,
}

impl RowReadable for TypeDefRaw {
    const TABLE: TableId = TableId::TypeDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(TypeDefRaw {
            rid,
            token: Token::new(0x0200_0000 + rid),
            offset: *offset,
            flags: read_le_at::<u32>(data, offset)?,
            type_name: read_le_at_dyn(data, offset, info.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, info.is_large_str())?,
            extends: CodedIndex::read(data, offset, info, CodedIndexType::TypeDefOrRef)?,
            field_list: read_le_at_dyn(data, offset, info.is_large(TableId::Field))?,
            method_list: read_le_at_dyn(data, offset, info.is_large(TableId::MethodDef))?,
        })
    }
}
