//! The `NestedClass` table (0x29).

use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// A raw `NestedClass` row, linking a nested `TypeDef` to its enclosing `TypeDef`.
#[derive(Clone, Debug)]
pub struct NestedClassRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x29000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// The nested type
    pub nested_class: u32,
    /// The type it is declared in
    pub enclosing_class: u32,
}

impl RowReadable for NestedClassRaw {
    const TABLE: TableId = TableId::NestedClass;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(NestedClassRaw {
            rid,
            token: Token::new(0x2900_0000 + rid),
            offset: *offset,
            nested_class: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
            enclosing_class: read_le_at_dyn(data, offset, info.is_large(TableId::TypeDef))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tables::MetadataTable;

    #[test]
    fn crafted_short() {
        let data = vec![
            0x03, 0x00, // nested_class
            0x02, 0x00, // enclosing_class
        ];

        let info = TableInfo::new_test(
            &[(TableId::TypeDef, 3), (TableId::NestedClass, 1)],
            false,
            false,
            false,
        );
        let table = MetadataTable::<NestedClassRaw>::new(&data, 1, &info).unwrap();
        let row = table.get(1).unwrap();

        assert_eq!(row.token.value(), 0x2900_0001);
        assert_eq!(row.nested_class, 3);
        assert_eq!(row.enclosing_class, 2);
    }
}
