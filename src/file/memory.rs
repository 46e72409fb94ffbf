//! In-memory file backend.
//!
//! [`crate::file::memory::Memory`] owns a byte buffer and serves it through the
//! [`crate::file::Backend`] trait. It is used when an image is handed over as bytes, for
//! example by [`crate::backend::CilModule::from_bytes`] or the fuzzing target.

use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Backend over an owned byte buffer.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Wrap `data` without copying it.
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn into_data(self: Box<Self>) -> Vec<u8> {
        self.data
    }
}
