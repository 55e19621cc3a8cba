//! Instructions, their layout and their binary encoding.
//!
//! This module holds everything that works on the instruction stream of a method body:
//! the static opcode table, the [`Instruction`] representation with its shared branch
//! destinations, the [`InstructionSequence`] that assigns byte addresses and carries the
//! attached [`ExtraLine`]s, and the decoder and encoder between code units and instructions.
//!
//! # Key Types
//! - [`Instruction`] - One decoded instruction or payload
//! - [`InstructionSequence`] - Ordered instructions with layout and structural edits
//! - [`ExtraLine`] - Label, debug or branch destination line attached to an instruction
//! - [`TargetRef`] - Shared absolute address of a branch destination
//!
//! # Main Functions
//! - [`decode_instructions`] - Decode code units and resolve branch targets
//! - [`encode_instructions`] - Encode laid-out instructions with patched branch offsets
//!
//! # Example
//! ```rust
//! use dexscope::{
//!     assembly::{decode_instructions, encode_instructions, InstructionSequence},
//!     method::BodyConfig,
//! };
//!
//! // goto +2 ; nop ; return-void
//! let units = [0x0228, 0x0000, 0x000e];
//! let mut code = InstructionSequence::from_instructions(
//!     decode_instructions(&units, &BodyConfig::default())?,
//! );
//! code.build_extra_lines(&[], None)?;
//! code.remove(1)?;
//! code.update_label_addresses(None)?;
//!
//! assert_eq!(encode_instructions(code.instructions())?, vec![0x0128, 0x000e]);
//! # Ok::<(), dexscope::Error>(())
//! ```

mod decoder;
mod encoder;
mod extraline;
mod instruction;
mod opcodes;
mod sequence;

pub use decoder::decode_instructions;
pub use encoder::encode_instructions;
pub use extraline::{ExtraLine, CATCH, DEBUG, EXCEPTION_HANDLER, TARGET, TRY_END, TRY_START};
pub use instruction::{expected_size, read_branch, write_branch, Instruction, TargetKind, TargetRef};
pub use opcodes::{
    BranchSlot, Format, Opcode, OpcodeFlags, ARRAY_DATA_IDENT, ARRAY_PAYLOAD, OPCODES,
    PACKED_SWITCH_IDENT, PACKED_SWITCH_PAYLOAD, SPARSE_SWITCH_IDENT, SPARSE_SWITCH_PAYLOAD,
};
pub use sequence::InstructionSequence;
