//! Low-level byte stream parser for method body decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based binary data
//! parser used for the `code_item` header, code units, try items, encoded catch handlers and the
//! debug program. It offers bounds-checked access to little-endian primitives and LEB128
//! variable-length integers.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor-based model that maintains a position within
//! a byte slice:
//!
//! - **Position tracking** - Maintains current offset for sequential parsing operations
//! - **Bounds checking** - All operations validate data availability before reading
//! - **Type-safe reading** - Strongly typed methods for common data types
//!
//! # Usage Examples
//!
//! ```rust
//! use dexscope::Parser;
//!
//! // line_start = 10, parameters_size = 1, parameter name = none (uleb128p1 -1)
//! let data = [0x0A, 0x01, 0x00, 0x34, 0x12];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_uleb128()?, 10);
//! assert_eq!(parser.read_uleb128()?, 1);
//! assert_eq!(parser.read_uleb128p1()?, None);
//! assert_eq!(parser.read_le::<u16>()?, 0x1234);
//! assert!(!parser.has_more_data());
//! # Ok::<(), dexscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, DexIO},
    utils::leb128::{read_sleb128_at, read_uleb128_at, read_uleb128p1_at},
    Result,
};

/// A cursor over a byte slice with bounds-checked, position-advancing reads.
///
/// The parser maintains an internal position cursor and never reads past the end of the
/// slice; every failed read leaves the cursor where it was.
///
/// # Examples
///
/// ```rust
/// use dexscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// parser.seek(6)?;
/// let last_bytes = parser.read_le::<u16>()?;
/// assert_eq!(last_bytes, 0x0807);
/// # Ok::<(), dexscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly the end of the data is allowed; any further read then fails.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: DexIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read an unsigned LEB128 value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input or [`crate::Error::Malformed`]
    /// for an encoding longer than five bytes.
    pub fn read_uleb128(&mut self) -> Result<u32> {
        read_uleb128_at(self.data, &mut self.position)
    }

    /// Read a signed LEB128 value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input or [`crate::Error::Malformed`]
    /// for an encoding longer than five bytes.
    pub fn read_sleb128(&mut self) -> Result<i32> {
        read_sleb128_at(self.data, &mut self.position)
    }

    /// Read a ULEB128p1 value, where the encoded `-1` becomes `None`.
    ///
    /// # Errors
    /// Same as [`Parser::read_uleb128`].
    pub fn read_uleb128p1(&mut self) -> Result<Option<u32>> {
        read_uleb128p1_at(self.data, &mut self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_read_leb128_mix() {
        // uleb 300, sleb -2, uleb128p1 none, uleb128p1 index 6
        let data = [0xAC, 0x02, 0x7E, 0x00, 0x07];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_uleb128().unwrap(), 300);
        assert_eq!(parser.read_sleb128().unwrap(), -2);
        assert_eq!(parser.read_uleb128p1().unwrap(), None);
        assert_eq!(parser.read_uleb128p1().unwrap(), Some(6));
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_error_handling() {
        let mut parser = Parser::new(&[0x08]);
        assert!(matches!(parser.read_uleb128(), Ok(8)));
        assert!(matches!(
            parser.read_uleb128(),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(parser.pos(), 1);
    }

    #[test]
    fn test_seek() {
        let data = [0u8; 8];
        let mut parser = Parser::new(&data);
        parser.seek(6).unwrap();
        assert_eq!(parser.remaining(), 2);
        parser.seek(8).unwrap();
        assert_eq!(parser.remaining(), 0);
        assert!(parser.read_le::<u8>().is_err());
        assert!(parser.seek(9).is_err());
        assert_eq!(parser.pos(), 8);
    }
}
