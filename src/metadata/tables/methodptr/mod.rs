//! The `MethodPtr` table (0x05), an indirection found in unoptimized (`#-`) metadata.

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `MethodPtr` row.
#[derive(Clone, Debug)]
pub struct MethodPtrRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x05000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// The `MethodDef` row this entry stands for
    pub method: u32,
}

impl RowReadable for MethodPtrRaw {
    const TABLE: TableId = TableId::MethodPtr;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(MethodPtrRaw {
            rid,
            token: Token::new(0x0500_0000 + rid),
            offset: *offset,
            method: read_le_at_dyn(data, offset, info.is_large(TableId::MethodDef))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_long() {
        let data = vec![0x03, 0x00, 0x01, 0x00];

        let info = TableInfo::new_test(
            &[(TableId::MethodDef, u16::MAX as u32 + 2)],
            false,
            false,
            false,
        );
        let table = MetadataTable::<MethodPtrRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x0500_0001);
        assert_eq!(row.method, 0x0001_0003);
    }
}
