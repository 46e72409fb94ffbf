//! Metadata tokens.
//!
//! A token names one row of one metadata table: the high byte is the [`crate::metadata::tables::TableId`],
//! the low 24 bits the 1-based row id (RID). `0x02000003` is the third `TypeDef` row.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A metadata token referring to a row in a metadata table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub u32);

impl Token {
    /// Creates a new token from a raw 32-bit value
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Builds a token from a table id byte and a row id
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Returns the raw token value
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Extracts the table type from the token (high byte)
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Extracts the row index from the token (low 24 bits)
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Returns true if this is a null token (value 0)
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts() {
        let token = Token(0x0600_0001);
        assert_eq!(token.table(), 0x06);
        assert_eq!(token.row(), 1);

        assert_eq!(Token::from_parts(0x02, 5), Token(0x0200_0005));
        assert_eq!(Token::from_parts(0x04, 0x0100_0001).row(), 1);
    }

    #[test]
    fn null() {
        assert!(Token(0).is_null());
        assert!(!Token(0x0100_0000).is_null());
    }

    #[test]
    fn formatting() {
        let token = Token(0x0200_0010);
        assert_eq!(format!("{token}"), "0x02000010");
        assert_eq!(
            format!("{token:?}"),
            "Token(0x02000010, table: 0x02, row: 16)"
        );
    }

    #[test]
    fn serializes_as_number() {
        let json = serde_json::to_string(&Token(0x0400_0002)).unwrap();
        assert_eq!(json, "67108866");
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Token(0x0400_0002));
    }
}
