//! PE file abstraction for .NET images.
//!
//! [`crate::file::File`] wraps the raw bytes of an image behind a [`crate::file::Backend`]
//! (memory-mapped file or owned buffer) and keeps the handful of PE facts the metadata layer
//! needs: the section table for RVA translation and the CLR runtime header directory.
//! PE parsing itself is delegated to `goblin`.
//!
//! # Examples
//!
//! ```rust,ignore
//! use publicizer::file::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("de4dotp.exe"))?;
//! let (clr_rva, clr_size) = file.clr();
//! let clr_offset = file.rva_to_offset(clr_rva)?;
//! println!("CLR header at file offset 0x{clr_offset:x}, {clr_size} bytes");
//! # Ok::<(), publicizer::Error>(())
//! ```

pub mod io;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    Error::{Empty, GoblinErr},
    Result,
};
use goblin::pe::{section_table::SectionTable, PE};
use memory::Memory;
use physical::Physical;

/// Source of the raw bytes of an image.
///
/// Implemented by the memory-mapped [`Physical`] backend and the owned [`Memory`] backend.
pub trait Backend {
    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns all bytes.
    fn data(&self) -> &[u8];

    /// Returns the number of bytes.
    fn len(&self) -> usize;

    /// Consumes the backend and returns an owned copy of the bytes.
    fn into_data(self: Box<Self>) -> Vec<u8>;
}

/// A loaded PE image that carries a CLR runtime header.
pub struct File {
    data: Box<dyn Backend>,
    sections: Vec<SectionTable>,
    clr: (u32, u32),
}

impl File {
    /// Memory-map and parse the file at `file`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, is empty, is not a PE image or has
    /// no CLR runtime header.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Parse an image from an owned buffer.
    ///
    /// # Errors
    /// Returns an error if the buffer is empty, is not a PE image or has no CLR runtime
    /// header.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let (sections, clr) = {
            let pe = PE::parse(data.data()).map_err(GoblinErr)?;
            let Some(optional_header) = pe.header.optional_header else {
                return Err(malformed_error!("File does not have an OptionalHeader"));
            };

            let clr = match optional_header.data_directories.get_clr_runtime_header() {
                Some(clr_dir) if clr_dir.virtual_address != 0 && clr_dir.size != 0 => {
                    (clr_dir.virtual_address, clr_dir.size)
                }
                _ => {
                    return Err(malformed_error!(
                        "File does not have a CLR runtime header directory"
                    ))
                }
            };

            (pe.sections.clone(), clr)
        };

        Ok(File {
            data: Box::new(data),
            sections,
            clr,
        })
    }

    /// Returns the size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns RVA and size of the CLR runtime header.
    #[must_use]
    pub fn clr(&self) -> (usize, usize) {
        (self.clr.0 as usize, self.clr.1 as usize)
    }

    /// Returns the section table.
    pub fn sections(&self) -> impl Iterator<Item = &SectionTable> {
        self.sections.iter()
    }

    /// Returns all bytes of the image.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the image.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Consumes the file and returns its bytes, releasing any file mapping.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data.into_data()
    }

    /// Translate a relative virtual address into a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no section contains the address in its raw
    /// data, or a section's bounds overflow.
    pub fn rva_to_offset(&self, rva: usize) -> Result<usize> {
        let rva_u32 =
            u32::try_from(rva).map_err(|_| malformed_error!("RVA too large to fit in u32: {}", rva))?;

        for section in &self.sections {
            let span = section.virtual_size.max(section.size_of_raw_data);
            let Some(section_max) = section.virtual_address.checked_add(span) else {
                return Err(malformed_error!(
                    "Section malformed, causing integer overflow - {} + {}",
                    section.virtual_address,
                    span
                ));
            };

            if section.virtual_address <= rva_u32 && rva_u32 < section_max {
                let delta = rva_u32 - section.virtual_address;
                if delta >= section.size_of_raw_data {
                    return Err(malformed_error!(
                        "RVA 0x{:x} points into uninitialized section data",
                        rva
                    ));
                }

                return Ok(delta as usize + section.pointer_to_raw_data as usize);
            }
        }

        Err(malformed_error!(
            "RVA could not be converted to offset - {}",
            rva
        ))
    }
}
