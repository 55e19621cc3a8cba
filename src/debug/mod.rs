//! Debug line programs.
//!
//! A method's debug information is a small state machine over `(address, line)` positions.
//! [`DebugProgram`] owns the rows, the starting line and the parameter names; each
//! [`DebugRow`] is one delta-encoded opcode with a cached absolute position.
//!
//! The program is kept consistent by two walks:
//!
//! - the forward walk ([`DebugProgram::cache_values`]) turns deltas into positions, and
//! - the reverse walk ([`DebugProgram::update_values`]) turns positions back into deltas after
//!   instructions moved, inserting address and line carrier rows where a row cannot hold its
//!   delta.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::debug::{DebugProgram, DebugRow};
//!
//! let mut program = DebugProgram::new(10);
//! program.push(DebugRow::special(4, 1)?)?;
//! program.push(DebugRow::special(0, 2)?)?;
//!
//! let positions: Vec<_> = program.rows().iter().map(|r| (r.address(), r.line())).collect();
//! assert_eq!(positions, vec![(4, 11), (4, 13)]);
//! # Ok::<(), dexscope::Error>(())
//! ```

mod program;
mod row;

pub use program::DebugProgram;
pub use row::{
    DebugKind, DebugOperands, DebugRow, FIRST_ADVANCE, LINE_BASE, LINE_RANGE, MAX_PACKED_OFFSET,
};
