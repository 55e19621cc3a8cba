//! LEB128 variable-length integers.
//!
//! Three flavours appear in method bodies:
//!
//! - **ULEB128**: unsigned, 7 bits per byte, high bit set on every byte but the last. Used
//!   for catch handler counts, type indices, catch addresses and most debug operands.
//! - **SLEB128**: signed two's complement, sign-extended from bit 6 of the last byte. Used
//!   for catch handler sizes and line advances.
//! - **ULEB128p1**: ULEB128 of `value + 1`, so that `-1` (encoded as `0`) means "no index".
//!   Used for optional string and type references in the debug program.
//!
//! All decoders accept at most five bytes, as a 32-bit value never needs more.

use crate::Result;

/// Longest encoding of a 32-bit value.
pub const MAX_LEB128_LEN: usize = 5;

/// Decodes an unsigned LEB128 value at `offset`, advancing it past the encoding.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the input ends mid-value, or
/// [`crate::Error::Malformed`] if the encoding is longer than five bytes or overflows 32 bits.
pub fn read_uleb128_at(data: &[u8], offset: &mut usize) -> Result<u32> {
    let mut value = 0u32;
    let mut position = *offset;

    for index in 0..MAX_LEB128_LEN {
        let Some(&byte) = data.get(position) else {
            return Err(out_of_bounds_error!());
        };
        position += 1;

        let payload = u32::from(byte & 0x7F);
        if index == MAX_LEB128_LEN - 1 && payload > 0x0F {
            return Err(malformed_error!(
                "ULEB128 at offset {} overflows 32 bits",
                *offset
            ));
        }
        value |= payload << (7 * index);

        if byte & 0x80 == 0 {
            *offset = position;
            return Ok(value);
        }
    }

    Err(malformed_error!(
        "ULEB128 at offset {} is longer than {} bytes",
        *offset,
        MAX_LEB128_LEN
    ))
}

/// Decodes a signed LEB128 value at `offset`, advancing it past the encoding.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the input ends mid-value, or
/// [`crate::Error::Malformed`] if the encoding is longer than five bytes.
pub fn read_sleb128_at(data: &[u8], offset: &mut usize) -> Result<i32> {
    let mut value = 0i64;
    let mut position = *offset;

    for index in 0..MAX_LEB128_LEN {
        let Some(&byte) = data.get(position) else {
            return Err(out_of_bounds_error!());
        };
        position += 1;

        let shift = 7 * index;
        value |= i64::from(byte & 0x7F) << shift;

        if byte & 0x80 == 0 {
            if byte & 0x40 != 0 {
                value |= -1i64 << (shift + 7);
            }
            let value = i32::try_from(value)
                .map_err(|_| malformed_error!("SLEB128 at offset {} overflows 32 bits", *offset))?;
            *offset = position;
            return Ok(value);
        }
    }

    Err(malformed_error!(
        "SLEB128 at offset {} is longer than {} bytes",
        *offset,
        MAX_LEB128_LEN
    ))
}

/// Decodes a ULEB128p1 value: `None` for the encoded `-1`, otherwise the index.
///
/// # Errors
/// Same as [`read_uleb128_at`].
pub fn read_uleb128p1_at(data: &[u8], offset: &mut usize) -> Result<Option<u32>> {
    let raw = read_uleb128_at(data, offset)?;
    Ok(raw.checked_sub(1))
}

/// Appends the unsigned LEB128 encoding of `value` to `buffer`.
pub fn write_uleb128(buffer: &mut Vec<u8>, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Appends the signed LEB128 encoding of `value` to `buffer`.
pub fn write_sleb128(buffer: &mut Vec<u8>, mut value: i32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0x80);
    }
}

/// Appends the ULEB128p1 encoding of an optional index to `buffer`.
///
/// # Errors
/// Returns [`crate::Error::ValueRange`] for `Some(u32::MAX)`, which has no `+1` encoding.
pub fn write_uleb128p1(buffer: &mut Vec<u8>, value: Option<u32>) -> Result<()> {
    match value {
        None => write_uleb128(buffer, 0),
        Some(index) => {
            let Some(shifted) = index.checked_add(1) else {
                return Err(value_range_error!(
                    "ULEB128p1 index",
                    index,
                    0u32,
                    u32::MAX - 1
                ));
            };
            write_uleb128(buffer, shifted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn uleb128_known_values() {
        let cases: [(&[u8], u32); 6] = [
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], 127),
            (&[0x80, 0x7F], 16256),
            (&[0xE5, 0x8E, 0x26], 624_485),
            (&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F], u32::MAX),
        ];

        for (bytes, expected) in cases {
            let mut offset = 0;
            assert_eq!(read_uleb128_at(bytes, &mut offset).unwrap(), expected);
            assert_eq!(offset, bytes.len());

            let mut encoded = Vec::new();
            write_uleb128(&mut encoded, expected);
            assert_eq!(encoded, bytes);
        }
    }

    #[test]
    fn sleb128_known_values() {
        let cases: [(&[u8], i32); 6] = [
            (&[0x00], 0),
            (&[0x01], 1),
            (&[0x7F], -1),
            (&[0x80, 0x7F], -128),
            (&[0x3F], 63),
            (&[0xC0, 0x00], 64),
        ];

        for (bytes, expected) in cases {
            let mut offset = 0;
            assert_eq!(read_sleb128_at(bytes, &mut offset).unwrap(), expected);

            let mut encoded = Vec::new();
            write_sleb128(&mut encoded, expected);
            assert_eq!(encoded, bytes);
        }

        for value in [i32::MIN, i32::MAX, -65, 8191, -8192] {
            let mut encoded = Vec::new();
            write_sleb128(&mut encoded, value);
            let mut offset = 0;
            assert_eq!(read_sleb128_at(&encoded, &mut offset).unwrap(), value);
        }
    }

    #[test]
    fn uleb128p1_none_and_index() {
        let mut encoded = Vec::new();
        write_uleb128p1(&mut encoded, None).unwrap();
        write_uleb128p1(&mut encoded, Some(4)).unwrap();
        assert_eq!(encoded, vec![0x00, 0x05]);

        let mut offset = 0;
        assert_eq!(read_uleb128p1_at(&encoded, &mut offset).unwrap(), None);
        assert_eq!(read_uleb128p1_at(&encoded, &mut offset).unwrap(), Some(4));

        assert!(matches!(
            write_uleb128p1(&mut encoded, Some(u32::MAX)),
            Err(Error::ValueRange { .. })
        ));
    }

    #[test]
    fn truncated_and_overlong() {
        let mut offset = 0;
        assert!(matches!(
            read_uleb128_at(&[0x80, 0x80], &mut offset),
            Err(Error::OutOfBounds { .. })
        ));
        assert_eq!(offset, 0);

        assert!(matches!(
            read_uleb128_at(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01], &mut offset),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            read_uleb128_at(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F], &mut offset),
            Err(Error::Malformed { .. })
        ));
    }
}
