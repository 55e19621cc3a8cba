//! Text form of method bodies.
//!
//! The text is a smali-like listing: a header with the register counts and the optional debug
//! preamble, then one line per instruction. Branch targets, try ranges, handlers and debug rows
//! show up as labels and directives in front of the instruction at their address:
//!
//! ```text
//! .registers 2
//! .ins 1
//! .outs 0
//! .debug 10
//! .param "value"
//!
//!     .line 11
//!     :try_start_0
//!     const/4 0x01
//!     :try_end_2
//!     .catchall {:try_start_0 .. :try_end_2} :catchall_2
//!     :catchall_2
//!
//!     return-void
//! ```
//!
//! Operands are written as raw hex fields: the high byte of the first code unit followed by
//! every further code unit, except that the branch field is replaced by its label. Switch and
//! array payloads are written as `.packed-switch`, `.sparse-switch` and `.array-data` blocks.
//!
//! [`SmaliWriter`] renders, [`read_method`] assembles. Rendering a parsed body reproduces the
//! parsed text.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::{identifiers::Identifiers, method::{BodyConfig, MethodBody}};
//!
//! let text = ".registers 1\n.ins 0\n.outs 0\n\n    :goto_0\n    goto :goto_0\n";
//! let mut ids = Identifiers::new();
//! let mut body = MethodBody::parse(text, &mut ids, BodyConfig::default())?;
//! assert_eq!(body.encode()?[16..], [0x28, 0x00]);
//! assert_eq!(body.render(&ids)?, text);
//! # Ok::<(), dexscope::Error>(())
//! ```

mod lexer;
mod reader;
mod writer;

pub use lexer::{tokenize, Token};
pub use reader::read_method;
pub use writer::SmaliWriter;
