//! Endian-aware primitive reading and writing.
//!
//! Method bodies are little-endian throughout: the `code_item` header, the code units of every
//! instruction and the payload tables. This module provides the [`crate::file::io::DexIO`] trait
//! over the primitive integer types and a small set of offset-tracking helpers built on it.
//! Variable-length integers live in [`crate::utils::leb128`].
//!
//! # Examples
//!
//! ```rust
//! use dexscope::file::io::{read_le_at, write_le};
//!
//! let mut buffer = Vec::new();
//! write_le(&mut buffer, 0x0012u16);
//! write_le(&mut buffer, 3u32);
//!
//! let mut offset = 0;
//! let first: u16 = read_le_at(&buffer, &mut offset)?;
//! let second: u32 = read_le_at(&buffer, &mut offset)?;
//! assert_eq!((first, second, offset), (0x12, 3, 6));
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! All functions in this module are pure and operate on caller-provided buffers only.

use crate::Result;

/// Conversion between a primitive integer and its fixed-size byte representation.
///
/// Implemented for the integer widths that occur in method bodies. The `Bytes` associated
/// type is the array produced by the standard library's `to_le_bytes` for that width.
pub trait DexIO: Sized + Copy {
    /// Byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_dex_io {
    ($($ty:ty => $n:literal),* $(,)?) => {
        $(
            impl DexIO for $ty {
                type Bytes = [u8; $n];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_dex_io!(u8 => 1, i8 => 1, u16 => 2, i16 => 2, u32 => 4, i32 => 4, u64 => 8, i64 => 8);

/// Reads a value of type `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: DexIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let end = offset
        .checked_add(type_len)
        .ok_or(out_of_bounds_error!())?;
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Appends `value` to `buffer` in little-endian byte order.
pub fn write_le<T: DexIO>(buffer: &mut Vec<u8>, value: T) {
    buffer.extend_from_slice(value.to_le_bytes().as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn read_sequence() {
        let data = [0x01, 0x00, 0xFF, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut offset = 0;
        assert_eq!(read_le_at::<u16>(&data, &mut offset).unwrap(), 1);
        assert_eq!(read_le_at::<i16>(&data, &mut offset).unwrap(), -1);
        assert_eq!(read_le_at::<u32>(&data, &mut offset).unwrap(), 0x1234_5678);
        assert_eq!(offset, 8);
    }

    #[test]
    fn read_past_end() {
        let data = [0x01, 0x02, 0x03];
        let mut offset = 2;
        assert!(matches!(
            read_le_at::<u16>(&data, &mut offset),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(offset, 2);
    }

    #[test]
    fn append() {
        let mut buffer = Vec::new();
        write_le(&mut buffer, 0xBEEFu16);
        assert_eq!(buffer, vec![0xEF, 0xBE]);

        buffer.clear();
        write_le(&mut buffer, -2i32);
        assert_eq!(buffer, vec![0xFE, 0xFF, 0xFF, 0xFF]);
    }
}
