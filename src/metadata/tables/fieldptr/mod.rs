//! The `FieldPtr` table (0x03), an indirection found in unoptimized (`#-`) metadata.

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `FieldPtr` row.
#[derive(Clone, Debug)]
pub struct FieldPtrRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x03000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// The `Field` row this entry stands for
    pub field: u32,
}

impl RowReadable for FieldPtrRaw {
    const TABLE: TableId = TableId::FieldPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(FieldPtrRaw {
            rid,
            token: Token::new(0x0300_0000 + rid),
            offset: *offset,
            field: read_le_at_dyn(data, offset, info.is_large(TableId::Field))?,
        })
    }
}
