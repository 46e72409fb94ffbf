//! The `MethodDef` table (0x06).

use crate::{
    file::io::{read_le_at, read_le_at_dyn},
    metadata::{
        tables::{RowReadable, TableId, TableInfo},
        token::Token,
    },
    Result,
};

/// Offset of the `Flags` column within a `MethodDef` row, behind `RVA` and `ImplFlags`
pub const METHODDEF_FLAGS_OFFSET: usize = 6;

/// A raw `MethodDef` row.
#[derive(Clone, Debug)]
pub struct MethodDefRaw {
    /// Row id, 1-based
    pub rid: u32,
    /// `0x06000000 | rid`
    pub token: Token,
    /// Offset of the row within the table
    pub offset: usize,
    /// RVA of the method body, 0 for abstract and runtime methods
    pub rva: u32,
    /// `MethodImplAttributes` bitmask
    pub impl_flags: u16,
    /// `MethodAttributes` bitmask
    pub flags: u16,
    /// `#Strings` index of the name
    pub name: u32,
    /// `#Blob` index of the signature
    pub signature: u32,
    /// First row of this method's parameters in `Param`
    pub param_list: u32,
}

impl RowReadable for MethodDefRaw {
    const TABLE: TableId = TableId::MethodDef;

    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self> {
        Ok(MethodDefRaw {
            rid,
            token: Token::new(0x0600_0000 + rid),
            offset: *offset,
            rva: read_le_at::<u32>(data, offset)?,
            impl_flags: read_le_at::<u16>(data, offset)?,
            flags: read_le_at::<u16>(data, offset)?,
            name: read_le_at_dyn(data, offset, info.is_large_str())?,
            signature: read_le_at_dyn(data, offset, info.is_large_blob())?,
            param_list: read_le_at_dyn(data, offset, info.is_large(TableId::Param))?,
        })
    }
}
