//! Stream headers of the metadata root.

use crate::{file::io::read_le, Error::OutOfBounds, Result};

/// Stream names a metadata root may carry
pub const STREAM_NAMES: [&str; 8] = [
    "#~", "#-", "#Strings", "#US", "#Blob", "#GUID", "#Pdb", "#JTD",
];

/// Location and name of one metadata stream.
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Name of the stream
    pub name: String,
}

impl StreamHeader {
    /// Parse a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too short and
    /// [`crate::Error::Malformed`] for an unknown or unterminated name.
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(OutOfBounds);
        }

        let name_area = &data[8..data.len().min(8 + 32)];
        let Some(name_len) = name_area.iter().position(|byte| *byte == 0) else {
            return Err(malformed_error!("Unterminated stream header name"));
        };

        let name = String::from_utf8_lossy(&name_area[..name_len]).into_owned();
        if !STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }

    /// Returns the size of this header in the directory, name padded to 4 bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        8 + ((self.name.len() + 1 + 3) & !3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x23, 0x7E, 0x00,
        ];

        let parsed_header = StreamHeader::from(&header_bytes).unwrap();

        assert_eq!(parsed_header.offset, 0x6C);
        assert_eq!(parsed_header.size, 0x45A4);
        assert_eq!(parsed_header.name, "#~");
        assert_eq!(parsed_header.header_len(), 12);
    }

    #[test]
    fn uncompressed_tables_name() {
        let mut header_bytes = vec![0u8; 8];
        header_bytes.extend_from_slice(b"#-\0\0");
        assert_eq!(StreamHeader::from(&header_bytes).unwrap().name, "#-");
    }

    #[test]
    fn crafted_invalid() {
        #[rustfmt::skip]
        let header_bytes = [
            0x6C, 0x00, 0x00, 0x00,
            0xA4, 0x45, 0x00, 0x00,
            0x24, 0x7E, 0x00,
        ];

        assert!(StreamHeader::from(&header_bytes).is_err());
    }

    #[test]
    fn unterminated() {
        let mut header_bytes = vec![0u8; 8];
        header_bytes.extend_from_slice(b"#Strings");
        assert!(StreamHeader::from(&header_bytes).is_err());
    }
}
