//! Locating the metadata of a loaded image.
//!
//! [`MetadataLayout`] walks CLR header, metadata root and stream directory once and keeps
//! only absolute file offsets. It does not borrow the image, so the same layout can be used
//! to read rows from the mapped file and later to patch an owned copy of the bytes.

use crate::{
    file::File,
    metadata::{
        cor20header::Cor20Header,
        root::Root,
        streams::{Strings, TablesHeader},
        tables::TableId,
    },
    Error::OutOfBounds,
    Result,
};

/// Absolute position and size of a stream within the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamRange {
    /// File offset of the first byte
    pub offset: usize,
    /// Size in bytes
    pub size: usize,
}

impl StreamRange {
    /// Returns the bytes of this stream within the image `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream reaches past `data`.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.offset..self.offset + self.size)
            .ok_or(OutOfBounds)
    }
}

/// The located metadata of one image.
pub struct MetadataLayout {
    /// The CLR header
    pub cor20: Cor20Header,
    /// The runtime version string of the metadata root
    pub version: String,
    /// The tables stream (`#~`, or `#-` for unoptimized metadata)
    pub tables: StreamRange,
    /// Whether the tables stream is the unoptimized `#-` form
    pub is_uncompressed: bool,
    /// The `#Strings` heap
    pub strings: StreamRange,
    /// The parsed tables header
    pub header: TablesHeader,
}

impl MetadataLayout {
    /// Locate the metadata of `file`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] or [`crate::Error::OutOfBounds`] if any of the
    /// headers are damaged, and [`crate::Error::NotSupported`] if the tables stream or the
    /// `#Strings` heap are missing.
    pub fn locate(file: &File) -> Result<MetadataLayout> {
        let (clr_rva, clr_size) = file.clr();
        let clr_offset = file.rva_to_offset(clr_rva)?;
        let cor20 = Cor20Header::read(file.data_slice(clr_offset, clr_size.max(72))?)?;

        let metadata_offset = file.rva_to_offset(cor20.meta_data_rva as usize)?;
        let metadata = file.data_slice(metadata_offset, cor20.meta_data_size as usize)?;
        let root = Root::read(metadata)?;

        let (tables_header, is_uncompressed) = match (root.stream("#~"), root.stream("#-")) {
            (Some(header), _) => (header, false),
            (None, Some(header)) => (header, true),
            (None, None) => {
                log::debug!("Metadata root lists no tables stream");
                return Err(crate::Error::NotSupported);
            }
        };
        let Some(strings_header) = root.stream("#Strings") else {
            log::debug!("Metadata root lists no #Strings heap");
            return Err(crate::Error::NotSupported);
        };

        let tables = StreamRange {
            offset: metadata_offset + tables_header.offset as usize,
            size: tables_header.size as usize,
        };
        let strings = StreamRange {
            offset: metadata_offset + strings_header.offset as usize,
            size: strings_header.size as usize,
        };

        let header = TablesHeader::read(tables.slice(file.data())?)?;

        Ok(MetadataLayout {
            cor20,
            version: root.version,
            tables,
            is_uncompressed,
            strings,
            header,
        })
    }

    /// Returns the tables stream within the image `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the stream reaches past `data`.
    pub fn tables_data<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        self.tables.slice(data)
    }

    /// Returns the `#Strings` heap within the image `data`.
    ///
    /// # Errors
    /// Returns an error if the heap reaches past `data` or is malformed.
    pub fn strings<'a>(&self, data: &'a [u8]) -> Result<Strings<'a>> {
        Strings::from(self.strings.slice(data)?)
    }

    /// Returns the file offset of row `rid` of `table`, or `None` if there is no such row.
    #[must_use]
    pub fn row_file_offset(&self, table: TableId, rid: u32) -> Option<usize> {
        self.header
            .span(table)
            .row_offset(rid)
            .map(|offset| self.tables.offset + offset)
    }
}
