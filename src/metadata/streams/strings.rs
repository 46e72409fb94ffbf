//! The `#Strings` heap: null-terminated UTF-8 identifiers.

use std::ffi::CStr;

use crate::{Error::OutOfBounds, Result};

/// Read-only view of the `#Strings` heap.
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wrap the heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with the
    /// empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// Returns the string starting at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` lies outside the heap and
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(OutOfBounds);
        }

        let Ok(value) = CStr::from_bytes_until_nul(&self.data[index..]) else {
            return Err(malformed_error!("Unterminated string at index - {}", index));
        };

        value
            .to_str()
            .map_err(|_| malformed_error!("Invalid string at index - {}", index))
    }
}
