//! CLR 2.0 (Cor20) header parsing.
//!
//! The header sits at the start of the `IMAGE_DIRECTORY_ENTRY_COM_DESCRIPTOR` data directory
//! and locates the metadata root. Only the fields the patcher consults are kept; the rest of
//! the 72 bytes are skipped.
//!
//! # Reference
//! - [ECMA-335 II.25.3.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{file::io::read_le_at, Error::OutOfBounds, Result};

/// Image is IL only
pub const COMIMAGE_FLAGS_ILONLY: u32 = 0x0000_0001;
/// Image is signed with a strong name
pub const COMIMAGE_FLAGS_STRONGNAMESIGNED: u32 = 0x0000_0008;

/// The parts of the CLR header needed to find and judge the metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of header in bytes
    pub cb: u32,
    /// The minimum version of runtime required to run this program
    pub major_runtime_version: u16,
    /// The minor portion of the version
    pub minor_runtime_version: u16,
    /// RVA of the `MetaData`
    pub meta_data_rva: u32,
    /// Size of the `MetaData`
    pub meta_data_size: u32,
    /// Flags describing this runtime
    pub flags: u32,
    /// Token for the `MethodDef` or File of the entry point for the image
    pub entry_point_token: u32,
    /// RVA of the strong name signature blob
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature blob
    pub strong_name_signature_size: u32,
}

impl Cor20Header {
    /// Parse the header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than 72 bytes and
    /// [`crate::Error::Malformed`] if the size or metadata location are invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < 72 {
            return Err(OutOfBounds);
        }

        let mut offset = 0;
        let cb = read_le_at::<u32>(data, &mut offset)?;
        if cb != 72 {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = read_le_at::<u16>(data, &mut offset)?;
        let minor_runtime_version = read_le_at::<u16>(data, &mut offset)?;

        let meta_data_rva = read_le_at::<u32>(data, &mut offset)?;
        let meta_data_size = read_le_at::<u32>(data, &mut offset)?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!(
                "Metadata directory is empty - rva {}, size {}",
                meta_data_rva,
                meta_data_size
            ));
        }

        let flags = read_le_at::<u32>(data, &mut offset)?;
        let entry_point_token = read_le_at::<u32>(data, &mut offset)?;

        // resources
        offset += 8;
        let strong_name_signature_rva = read_le_at::<u32>(data, &mut offset)?;
        let strong_name_signature_size = read_le_at::<u32>(data, &mut offset)?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            strong_name_signature_rva,
            strong_name_signature_size,
        })
    }

    /// Returns true if the image carries a strong name signature.
    ///
    /// Patching such an image in place invalidates the signature.
    #[must_use]
    pub fn is_strong_name_signed(&self) -> bool {
        self.flags & COMIMAGE_FLAGS_STRONGNAMESIGNED != 0 && self.strong_name_signature_size != 0
    }
}
