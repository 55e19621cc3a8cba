//! Small encoding helpers shared by the codecs.

pub mod leb128;

/// Renders an address the way labels spell it: lowercase hex, no prefix, at least one digit.
#[must_use]
pub fn hex_address(address: u32) -> String {
    format!("{address:x}")
}
