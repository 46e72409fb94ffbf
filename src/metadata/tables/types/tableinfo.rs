//! Row counts, index widths and row sizes of the metadata tables.
//!
//! Every column that refers to a heap or another table is either 2 or 4 bytes wide,
//! depending on the heap size flags and on the row counts of the tables it may point into.
//! [`TableInfo`] derives all of these widths once, so rows can be located without
//! decoding the tables in front of them.

use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::types::{CodedIndexType, TableId};

/// Heap size flag: `#Strings` indexes are 4 bytes
pub const HEAP_LARGE_STRINGS: u8 = 0x01;
/// Heap size flag: `#GUID` indexes are 4 bytes
pub const HEAP_LARGE_GUID: u8 = 0x02;
/// Heap size flag: `#Blob` indexes are 4 bytes
pub const HEAP_LARGE_BLOB: u8 = 0x04;
/// Heap size flag: 4 bytes of extra data follow the row counts
pub const HEAP_EXTRA_DATA: u8 = 0x40;

/// Row count of a single table and the width needed to index it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct TableRowInfo {
    /// Number of rows in the table
    pub rows: u32,
    /// Number of bits needed to store the largest row id
    pub bits: u8,
    /// Whether simple indexes into this table are 4 bytes
    pub is_large: bool,
}

impl TableRowInfo {
    /// Describe a table with `rows` rows.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn new(rows: u32) -> Self {
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: rows > u32::from(u16::MAX),
        }
    }
}

/// Index widths of one `#~` stream.
#[derive(Clone, Debug, Default)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    is_large_index_str: bool,
    is_large_index_guid: bool,
    is_large_index_blob: bool,
}

impl TableInfo {
    /// Build the table info from per-table row counts (indexed by [`TableId`]) and the
    /// heap size flags byte of the tables header.
    #[must_use]
    pub fn new(row_counts: &[u32; TableId::COUNT], heap_sizes: u8) -> Self {
        let mut table_info = TableInfo {
            rows: row_counts.iter().map(|rows| TableRowInfo::new(*rows)).collect(),
            coded_indexes: vec![0; CodedIndexType::COUNT],
            is_large_index_str: heap_sizes & HEAP_LARGE_STRINGS != 0,
            is_large_index_guid: heap_sizes & HEAP_LARGE_GUID != 0,
            is_large_index_blob: heap_sizes & HEAP_LARGE_BLOB != 0,
        };

        table_info.calculate_coded_index_bits();
        table_info
    }

    #[cfg(test)]
    pub(crate) fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut row_counts = [0_u32; TableId::COUNT];
        for (table, rows) in valid_tables {
            row_counts[*table as usize] = *rows;
        }

        let mut heap_sizes = 0;
        if large_str {
            heap_sizes |= HEAP_LARGE_STRINGS;
        }
        if large_guid {
            heap_sizes |= HEAP_LARGE_GUID;
        }
        if large_blob {
            heap_sizes |= HEAP_LARGE_BLOB;
        }

        TableInfo::new(&row_counts, heap_sizes)
    }

    /// Returns the row information of `table`.
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// Returns the number of rows in `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.rows[table as usize].rows
    }

    /// Returns true if simple indexes into `table` are 4 bytes.
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// Returns true if `#Strings` indexes are 4 bytes.
    #[must_use]
    pub fn is_large_str(&self) -> bool {
        self.is_large_index_str
    }

    /// Returns true if `#GUID` indexes are 4 bytes.
    #[must_use]
    pub fn is_large_guid(&self) -> bool {
        self.is_large_index_guid
    }

    /// Returns true if `#Blob` indexes are 4 bytes.
    #[must_use]
    pub fn is_large_blob(&self) -> bool {
        self.is_large_index_blob
    }

    /// Width of a `#Strings` index in bytes.
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.is_large_index_str {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index in bytes.
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.is_large_index_guid {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index in bytes.
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.is_large_index_blob {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table` in bytes.
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Width of a coded index of kind `coded_index_type` in bytes.
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Size in bytes of one row of `table`.
    #[rustfmt::skip]
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        use CodedIndexType as Ci;

        let s = self.str_bytes();
        let g = self.guid_bytes();
        let b = self.blob_bytes();
        let ti = |id: TableId| self.table_index_bytes(id);
        let ci = |kind: CodedIndexType| self.coded_index_bytes(kind);

        u32::from(match table {
            TableId::Module =>                  2 + s + g + g + g,
            TableId::TypeRef =>                 ci(Ci::ResolutionScope) + s + s,
            TableId::TypeDef =>                 4 + s + s + ci(Ci::TypeDefOrRef) + ti(TableId::Field) + ti(TableId::MethodDef),
            TableId::FieldPtr =>                ti(TableId::Field),
            TableId::Field =>                   2 + s + b,
            TableId::MethodPtr =>               ti(TableId::MethodDef),
            TableId::MethodDef =>               4 + 2 + 2 + s + b + ti(TableId::Param),
            TableId::ParamPtr =>                ti(TableId::Param),
            TableId::Param =>                   2 + 2 + s,
            TableId::InterfaceImpl =>           ti(TableId::TypeDef) + ci(Ci::TypeDefOrRef),
            TableId::MemberRef =>               ci(Ci::MemberRefParent) + s + b,
            TableId::Constant =>                2 + ci(Ci::HasConstant) + b,
            TableId::CustomAttribute =>         ci(Ci::HasCustomAttribute) + ci(Ci::CustomAttributeType) + b,
            TableId::FieldMarshal =>            ci(Ci::HasFieldMarshal) + b,
            TableId::DeclSecurity =>            2 + ci(Ci::HasDeclSecurity) + b,
            TableId::ClassLayout =>             2 + 4 + ti(TableId::TypeDef),
            TableId::FieldLayout =>             4 + ti(TableId::Field),
            TableId::StandAloneSig =>           b,
            TableId::EventMap =>                ti(TableId::TypeDef) + ti(TableId::Event),
            TableId::EventPtr =>                ti(TableId::Event),
            TableId::Event =>                   2 + s + ci(Ci::TypeDefOrRef),
            TableId::PropertyMap =>             ti(TableId::TypeDef) + ti(TableId::Property),
            TableId::PropertyPtr =>             ti(TableId::Property),
            TableId::Property =>                2 + s + b,
            TableId::MethodSemantics =>         2 + ti(TableId::MethodDef) + ci(Ci::HasSemantics),
            TableId::MethodImpl =>              ti(TableId::TypeDef) + ci(Ci::MethodDefOrRef) + ci(Ci::MethodDefOrRef),
            TableId::ModuleRef =>               s,
            TableId::TypeSpec =>                b,
            TableId::ImplMap =>                 2 + ci(Ci::MemberForwarded) + s + ti(TableId::ModuleRef),
            TableId::FieldRVA =>                4 + ti(TableId::Field),
            TableId::EncLog =>                  4 + 4,
            TableId::EncMap =>                  4,
            TableId::Assembly =>                4 + 2 + 2 + 2 + 2 + 4 + b + s + s,
            TableId::AssemblyProcessor =>       4,
            TableId::AssemblyOS =>              4 + 4 + 4,
            TableId::AssemblyRef =>             2 + 2 + 2 + 2 + 4 + b + s + s + b,
            TableId::AssemblyRefProcessor =>    4 + ti(TableId::AssemblyRef),
            TableId::AssemblyRefOS =>           4 + 4 + 4 + ti(TableId::AssemblyRef),
            TableId::File =>                    4 + s + b,
            TableId::ExportedType =>            4 + 4 + s + s + ci(Ci::Implementation),
            TableId::ManifestResource =>        4 + 4 + s + ci(Ci::Implementation),
            TableId::NestedClass =>             ti(TableId::TypeDef) + ti(TableId::TypeDef),
            TableId::GenericParam =>            2 + 2 + ci(Ci::TypeOrMethodDef) + s,
            TableId::MethodSpec =>              ci(Ci::MethodDefOrRef) + b,
            TableId::GenericParamConstraint =>  ti(TableId::GenericParam) + ci(Ci::TypeDefOrRef),
        })
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_info() {
        assert_eq!(TableRowInfo::new(0).bits, 1);
        assert_eq!(TableRowInfo::new(1).bits, 1);
        assert_eq!(TableRowInfo::new(0xFFFF).bits, 16);
        assert!(!TableRowInfo::new(0xFFFF).is_large);
        assert_eq!(TableRowInfo::new(0x10000).bits, 17);
        assert!(TableRowInfo::new(0x10000).is_large);
    }

    #[test]
    fn small_sizes() {
        let info = TableInfo::new_test(
            &[(TableId::TypeDef, 3), (TableId::Field, 2), (TableId::MethodDef, 4)],
            false,
            false,
            false,
        );

        assert_eq!(info.row_size(TableId::Module), 10);
        assert_eq!(info.row_size(TableId::TypeRef), 6);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
        assert_eq!(info.row_size(TableId::Field), 6);
        assert_eq!(info.row_size(TableId::MethodDef), 14);
        assert_eq!(info.row_size(TableId::CustomAttribute), 6);
        assert_eq!(info.row_size(TableId::Assembly), 22);
        assert_eq!(info.row_size(TableId::AssemblyRef), 20);
        assert_eq!(info.row_size(TableId::NestedClass), 4);
    }

    #[test]
    fn large_heaps() {
        let info = TableInfo::new_test(&[], true, true, true);

        assert!(info.is_large_str() && info.is_large_guid() && info.is_large_blob());
        assert_eq!(info.str_bytes(), 4);
        assert_eq!(info.guid_bytes(), 4);
        assert_eq!(info.blob_bytes(), 4);
        assert_eq!(info.row_size(TableId::Module), 2 + 4 + 12);
        assert_eq!(info.row_size(TableId::MethodDef), 8 + 4 + 4 + 2);
    }

    #[test]
    fn coded_index_widths() {
        // TypeDefOrRef carries 2 tag bits, so 2^14 rows still fit in 16 bits
        let info = TableInfo::new_test(&[(TableId::TypeRef, 0x3FFF)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

        let info = TableInfo::new_test(&[(TableId::TypeRef, 0x4000)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasConstant), 2);
        assert_eq!(info.row_size(TableId::TypeDef), 4 + 2 + 2 + 4 + 2 + 2);

        // HasCustomAttribute carries 5 tag bits
        let info = TableInfo::new_test(&[(TableId::Param, 0x800)], false, false, false);
        assert_eq!(info.coded_index_bytes(CodedIndexType::HasCustomAttribute), 4);
    }

    #[test]
    fn large_tables() {
        let info = TableInfo::new_test(&[(TableId::Field, 0x10000)], false, false, false);
        assert_eq!(info.table_index_bytes(TableId::Field), 4);
        assert_eq!(info.table_index_bytes(TableId::MethodDef), 2);
        assert_eq!(info.row_size(TableId::FieldPtr), 4);
        assert_eq!(info.rows(TableId::Field), 0x10000);
    }
}
