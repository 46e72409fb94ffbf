//! The `Field` table (0x04).

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Offset of the `Flags` column within a `Field` row
pub const FIELD_FLAGS_OFFSET: usize = 0;

/// A raw `Field` row.
#[derive(Clone, Debug)]
pub struct FieldRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x04000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// `FieldAttributes` bitmask
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the signature
    pub signature: u32,
}

impl RowReadable for FieldRaw {
    const TABLE: TableId = TableId::Field;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(FieldRaw {
            rid,
            token: Token::new(0x0400_0000 + rid),
            offset: *offset,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            signature: read_le_at_dyn(data, offset, info.is_large_blob())?,
        })
    }
}
