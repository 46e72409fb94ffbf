//! Metadata table rows.
//!
//! Each supported table has a raw row type mirroring its on-disk columns, heap and table
//! references are kept as plain indexes. Rows are read lazily through a [`MetadataTable`]
//! view over the table's bytes; nothing is copied out of the image up front.
//!
//! Only the tables needed to rebuild the type hierarchy are decoded. All other tables are
//! merely sized (see [`TableInfo::row_size`]) so the decoded ones can be located.

mod field;
mod fieldptr;
mod methoddef;
mod methodptr;
mod nestedclass;
mod typedef;
mod typeref;
mod types;

use std::marker::PhantomData;

pub use field::{FieldRaw, FIELD_FLAGS_OFFSET};
pub use fieldptr::FieldPtrRaw;
pub use methoddef::{MethodDefRaw, METHODDEF_FLAGS_OFFSET};
pub use methodptr::MethodPtrRaw;
pub use nestedclass::NestedClassRaw;
pub use typedef::{TypeDefRaw, TYPEDEF_FLAGS_OFFSET};
pub use typeref::TypeRefRaw;
pub use types::*;

use crate::{Error::OutOfBounds, Result};

/// A row type that can be decoded from its table.
pub trait RowReadable: Sized {
    /// The table holding rows of this type
    const TABLE: TableId;

    /// Decode the row with id `rid` at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row does not fit in `data`.
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfo) -> Result<Self>;
}

/// A typed view over the rows of one metadata table.
pub struct MetadataTable<'a, T> {
    data: &'a [u8],
    row_count: u32,
    row_size: u32,
    info: &'a TableInfo,
    _phantom: PhantomData<T>,
}

impl<'a, T: RowReadable> MetadataTable<'a, T> {
    /// Create a view over `data`, which must start at the first row of `T::TABLE`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short for `row_count` rows.
    pub fn new(data: &'a [u8], row_count: u32, info: &'a TableInfo) -> Result<Self> {
        let row_size = info.row_size(T::TABLE);
        let size = u64::from(row_count) * u64::from(row_size);
        if size > data.len() as u64 {
            return Err(OutOfBounds);
        }

        Ok(MetadataTable {
            data,
            row_count,
            row_size,
            info,
            _phantom: PhantomData,
        })
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    /// Returns the size of a single row in bytes.
    #[must_use]
    pub fn row_size(&self) -> u32 {
        self.row_size
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Decode the row with the 1-based id `rid`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `rid` is 0 or past the last row.
    pub fn get(&self, rid: u32) -> Result<T> {
        if rid == 0 || rid > self.row_count {
            return Err(OutOfBounds);
        }

        let mut offset = (rid as usize - 1) * self.row_size as usize;
        T::row_read(self.data, &mut offset, rid, self.info)
    }

    /// Decode all rows in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<T>> + '_ {
        (1..=self.row_count).map(move |rid| self.get(rid))
    }
}
