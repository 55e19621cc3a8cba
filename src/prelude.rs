//! # dexscope Prelude
//!
//! The most commonly used types of the library. Import this module to get quick access to
//! everything needed to decode, edit, render and encode a method body.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dexscope operations
pub use crate::Error;

/// The result type used throughout dexscope
pub use crate::Result;

/// Low-level file parsing utilities
pub use crate::Parser;

// ================================================================================================
// Method Bodies
// ================================================================================================

/// Method body facade and its configuration
pub use crate::method::{BodyConfig, MethodBody};

/// Try table
pub use crate::method::{ExceptionHandler, ExceptionHandlerRc, TryItem, TryItemRc};

/// Labels derived from try items and branch destinations
pub use crate::method::{Label, LabelRole, TargetLabel};

// ================================================================================================
// Instructions
// ================================================================================================

/// Instructions and their layout
pub use crate::assembly::{ExtraLine, Instruction, InstructionSequence, Opcode, TargetRef};

// ================================================================================================
// Debug Information
// ================================================================================================

/// Debug line program
pub use crate::debug::{DebugKind, DebugProgram, DebugRow};

// ================================================================================================
// Names and Text
// ================================================================================================

/// Identifier pools
pub use crate::identifiers::{IdentifierStore, Identifiers};

/// Text form
pub use crate::smali::SmaliWriter;
