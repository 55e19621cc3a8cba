// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
#![deny(unsafe_code)]

//! # dexscope
//!
//! Editing support for Dalvik-style register VM method bodies. `dexscope` decodes a `code_item`
//! together with its try table and debug line program into a structure that can be edited at
//! the instruction level, and keeps everything that refers to instruction addresses in step:
//! branch destinations, switch cases, try ranges, catch handlers and debug rows.
//!
//! ## Features
//!
//! - **📦 Lossless codec** - Unmodified bodies encode back to the exact input bytes
//! - **🔧 Address-stable edits** - Insert, replace and remove instructions; labels follow
//! - **🧭 Debug program repair** - Delta-encoded line rows are re-encoded after edits, with
//!   carrier rows added where a delta no longer fits
//! - **📝 Text form** - Render a body as smali-like assembly and assemble it back
//! - **🛡️ Memory safe** - No unsafe code, bounds-checked parsing everywhere
//!
//! ## Quick Start
//!
//! ```rust
//! use dexscope::prelude::*;
//!
//! // registers 1; nop ; return-void
//! let data = [
//!     1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // header
//!     2, 0, 0, 0, // insns_size
//!     0x00, 0x00, 0x0e, 0x00,
//! ];
//! let mut body = MethodBody::from(&data, None, BodyConfig::default())?;
//! assert_eq!(body.encode()?, data);
//!
//! body.insert(1, Instruction::new(vec![0x0000])?)?;
//! let text = body.render(&Identifiers::new())?;
//! assert!(text.ends_with("    nop\n    nop\n    return-void\n"));
//! # Ok::<(), dexscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`assembly`] - opcode table, instructions, layout, decoder and encoder
//! - [`method`] - the [`method::MethodBody`] facade, the try table and the labels derived
//!   from it
//! - [`debug`] - the debug line program and its two consistency walks
//! - [`smali`] - text rendering and assembling
//! - [`identifiers`] - the type and string pools names are resolved against
//! - [`file`] - bounds-checked binary reading and writing
//! - [`utils`] - LEB128 helpers
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`Result`]. Decoding errors distinguish truncated input
//! ([`Error::OutOfBounds`]) from structural damage ([`Error::Malformed`]); encoding and editing
//! report values that do not fit their fields as [`Error::ValueRange`]; text input reports
//! [`Error::Parse`] with a line and column.
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench --bench method_body
//! cargo +nightly fuzz run decode_body --release
//! ```
#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use dexscope::prelude::*;
///
/// let body = MethodBody::new(2, 1, 0, BodyConfig::default());
/// assert!(body.code().is_empty());
/// ```
pub mod prelude;

/// Instructions, layout and the code unit codec.
pub mod assembly;

/// The debug line program.
pub mod debug;

/// Bounds-checked binary input and output.
pub mod file;

/// Type and string pools.
pub mod identifiers;

/// Method bodies, try items and labels.
pub mod method;

/// Assembly text rendering and parsing.
pub mod smali;

/// Encoding helpers.
pub mod utils;

/// `dexscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust
/// use dexscope::{method::{BodyConfig, MethodBody}, Result};
///
/// fn load(data: &[u8]) -> Result<MethodBody> {
///     MethodBody::from(data, None, BodyConfig::default())
/// }
/// assert!(load(&[0; 4]).is_err());
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `dexscope` Error type
///
/// # Examples
///
/// ```rust
/// use dexscope::{identifiers::Identifiers, method::{BodyConfig, MethodBody}, Error};
///
/// match MethodBody::parse("    bogus\n", &mut Identifiers::new(), BodyConfig::default()) {
///     Err(Error::Parse { line, column, .. }) => assert_eq!((line, column), (1, 5)),
///     other => panic!("unexpected {other:?}"),
/// }
/// ```
pub use error::Error;

/// Low-level bounds-checked reader.
pub use file::parser::Parser;
