//! Method bodies and their exception tables.
//!
//! [`MethodBody`] is the entry point: it decodes a `code_item` together with its debug info,
//! accepts structural edits, keeps try ranges, handlers, debug rows and branch destinations in
//! step with the moved instructions, and encodes or renders the result.
//!
//! # Key Types
//! - [`MethodBody`] - Code, try table and debug program of one method
//! - [`TryItem`] / [`ExceptionHandler`] - The try table with weak handler back-references
//! - [`Label`] - Exception boundary markers derived from a handler
//! - [`TargetLabel`] - Branch destination markers
//! - [`BodyConfig`] - Decode, edit and render knobs

mod body;
mod config;
mod exceptions;
mod label;

pub use body::MethodBody;
pub use config::BodyConfig;
pub use exceptions::{
    read_tries, write_tries, ExceptionHandler, ExceptionHandlerRc, TryItem, TryItemRc,
};
pub use label::{label_name, Label, LabelRole, TargetLabel};
