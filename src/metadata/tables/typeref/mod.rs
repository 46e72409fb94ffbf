//! The `TypeRef` table (0x01).

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{CodedIndex, CodedIndexType, RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `TypeRef` row.
#[derive(Clone, Debug)]
pub struct TypeRefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x01000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// Where the type lives, a `ResolutionScope` coded index
    pub resolution_scope: CodedIndex,
    /// `#Strings` index of the name
    pub type_name: u32,
    /// `#Strings` index of the namespace
    pub type_namespace: u32,
}

impl RowReadable for TypeRefRaw {
    const TABLE: TableId = TableId::TypeRef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(TypeRefRaw {
            rid,
            token: Token::new(0x0100_0000 + rid),
            offset: *offset,
            resolution_scope: CodedIndex::read(
                data,
                offset,
                info,
                CodedIndexType::ResolutionScope,
            )?,
            type_name: read_le_at_dyn(data, offset, info.is_large_str())?,
            type_namespace: read_le_at_dyn(data, offset, info.is_large_str())?,
        })
    }
}
