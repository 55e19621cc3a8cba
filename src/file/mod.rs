//! Binary input and output primitives.
//!
//! Everything that touches raw bytes goes through this module:
//!
//! - [`crate::file::parser::Parser`] - cursor with bounds-checked little-endian and LEB128 reads
//! - [`crate::file::io`] - the [`crate::file::io::DexIO`] trait and offset-tracking helpers
//!
//! The method body, try table and debug program codecs are built on top of these and never
//! index into input slices directly.

pub mod io;
pub mod parser;
