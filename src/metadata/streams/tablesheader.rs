//! The header of the `#~` (or `#-`) stream and the location of every table behind it.
//!
//! # Reference
//! - [ECMA-335 II.24.2.6](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use strum::{EnumCount, IntoEnumIterator};

use crate::{
    file::io::{read_le, read_le_at},
    metadata::tables::{MetadataTable, RowReadable, TableId, TableInfo, HEAP_EXTRA_DATA},
    Error::OutOfBounds,
    Result,
};

/// Where one table's rows live inside the tables stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TableSpan {
    /// Offset of the first row, relative to the start of the stream
    pub offset: usize,
    /// Number of rows
    pub rows: u32,
    /// Size of one row in bytes
    pub row_size: u32,
}

impl TableSpan {
    /// Returns the size of the whole table in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows as usize * self.row_size as usize
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Returns the stream offset of row `rid`, or `None` if the row does not exist.
    #[must_use]
    pub fn row_offset(&self, rid: u32) -> Option<usize> {
        if rid == 0 || rid > self.rows {
            return None;
        }

        Some(self.offset + (rid as usize - 1) * self.row_size as usize)
    }
}

/// Parsed header of the tables stream.
pub struct TablesHeader {
    /// Major version of the table schema, 2
    pub major_version: u8,
    /// Minor version of the table schema, 0
    pub minor_version: u8,
    /// Heap size flags
    pub heap_sizes: u8,
    /// Bit vector of present tables
    pub valid: u64,
    /// Bit vector of sorted tables
    pub sorted: u64,
    /// Index widths derived from the row counts and heap sizes
    pub info: TableInfo,
    spans: Vec<TableSpan>,
}

impl TablesHeader {
    /// Parse the header at the start of the tables stream `data` and locate all tables.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the header or any table reaches past `data`.
    pub fn read(data: &[u8]) -> Result<TablesHeader> {
        if data.len() < 24 {
            return Err(OutOfBounds);
        }

        let major_version = read_le::<u8>(&data[4..])?;
        let minor_version = read_le::<u8>(&data[5..])?;
        let heap_sizes = read_le::<u8>(&data[6..])?;
        let valid = read_le::<u64>(&data[8..])?;
        let sorted = read_le::<u64>(&data[16..])?;

        let mut row_counts = [0_u32; TableId::COUNT];
        let mut offset = 24;
        for bit in 0..64_u8 {
            if valid & (1 << bit) == 0 {
                continue;
            }

            let rows = read_le_at::<u32>(data, &mut offset)?;
            match TableId::from_u8(bit) {
                Some(table) => row_counts[table as usize] = rows,
                None if rows > 0 => {
                    log::debug!("Ignoring {rows} rows of unknown metadata table 0x{bit:02x}");
                }
                None => {}
            }
        }

        if heap_sizes & HEAP_EXTRA_DATA != 0 {
            offset += 4;
        }

        let info = TableInfo::new(&row_counts, heap_sizes);
        let mut spans = Vec::with_capacity(TableId::COUNT);
        for table in TableId::iter() {
            let span = TableSpan {
                offset,
                rows: row_counts[table as usize],
                row_size: info.row_size(table),
            };

            offset = match offset.checked_add(span.len()) {
                Some(end) if end <= data.len() => end,
                _ => {
                    return Err(malformed_error!(
                        "Table {} with {} rows exceeds the tables stream",
                        table,
                        span.rows
                    ))
                }
            };

            spans.push(span);
        }

        Ok(TablesHeader {
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            info,
            spans,
        })
    }

    /// Returns the location of `table`.
    #[must_use]
    pub fn span(&self, table: TableId) -> &TableSpan {
        &self.spans[table as usize]
    }

    /// Returns the number of rows in `table`.
    #[must_use]
    pub fn rows(&self, table: TableId) -> u32 {
        self.spans[table as usize].rows
    }

    /// Returns a typed view of the table holding `T` rows, `data` being the whole stream.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is not the stream this header was
    /// read from.
    pub fn table<'a, T: RowReadable>(&'a self, data: &'a [u8]) -> Result<MetadataTable<'a, T>> {
        let span = self.span(T::TABLE);
        let Some(table_data) = data.get(span.offset..span.offset + span.len()) else {
            return Err(OutOfBounds);
        };

        MetadataTable::new(table_data, span.rows, &self.info)
    }
}
