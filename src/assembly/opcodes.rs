//! Opcode table for the register virtual machine.
//!
//! Every primary opcode occupies the low byte of an instruction's first code unit. The table
//! below maps each of the 256 byte values to its mnemonic, [`Format`] and [`OpcodeFlags`].
//! Unassigned values are present as `unused-XX` entries flagged [`OpcodeFlags::UNUSED`].
//!
//! Three pseudo-instructions share opcode `0x00` (`nop`) and are told apart by the high byte of
//! their first code unit: packed-switch (`0x0100`), sparse-switch (`0x0200`) and
//! fill-array-data (`0x0300`) payloads.

use std::{collections::HashMap, sync::OnceLock};

use bitflags::bitflags;
use strum::{Display, EnumIter};

bitflags! {
    /// Behavioural properties of an opcode relevant to layout and labelling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpcodeFlags: u16 {
        /// The instruction may throw and so may sit inside a try range meaningfully.
        const CAN_THROW = 0x0001;
        /// Execution may fall through to the next instruction.
        const CAN_CONTINUE = 0x0002;
        /// Carries a relative branch offset (`goto*`, `if-*`).
        const BRANCH = 0x0004;
        /// References a switch payload (`packed-switch`, `sparse-switch`).
        const SWITCH = 0x0008;
        /// References an array payload (`fill-array-data`).
        const FILL_ARRAY_DATA = 0x0010;
        /// Produces a value for a following `move-result*`.
        const SETS_RESULT = 0x0020;
        /// Pseudo-instruction holding out-of-line data.
        const PAYLOAD = 0x0040;
        /// No instruction is assigned to this value.
        const UNUSED = 0x0080;
    }
}

const NONE: OpcodeFlags = OpcodeFlags::empty();
const CONTINUE: OpcodeFlags = OpcodeFlags::CAN_CONTINUE;
const THROW: OpcodeFlags = OpcodeFlags::CAN_THROW.union(OpcodeFlags::CAN_CONTINUE);
const INVOKE: OpcodeFlags = THROW.union(OpcodeFlags::SETS_RESULT);
const GOTO: OpcodeFlags = OpcodeFlags::BRANCH;
const IF: OpcodeFlags = OpcodeFlags::BRANCH.union(OpcodeFlags::CAN_CONTINUE);
const SWITCH: OpcodeFlags = OpcodeFlags::SWITCH.union(OpcodeFlags::CAN_CONTINUE);
const UNUSED: OpcodeFlags = OpcodeFlags::UNUSED;

/// Instruction encoding formats.
///
/// The first digit is the size in code units, the second the register count, the letter the
/// kind of extra data (`x` none, `n`/`s`/`i`/`l`/`h` literals, `b` byte literal, `t` branch,
/// `c` constant-pool index, `r` register range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[allow(missing_docs)]
pub enum Format {
    #[strum(serialize = "10x")]
    Format10x,
    #[strum(serialize = "12x")]
    Format12x,
    #[strum(serialize = "11n")]
    Format11n,
    #[strum(serialize = "11x")]
    Format11x,
    #[strum(serialize = "10t")]
    Format10t,
    #[strum(serialize = "20t")]
    Format20t,
    #[strum(serialize = "22x")]
    Format22x,
    #[strum(serialize = "21t")]
    Format21t,
    #[strum(serialize = "21s")]
    Format21s,
    #[strum(serialize = "21h")]
    Format21h,
    #[strum(serialize = "21c")]
    Format21c,
    #[strum(serialize = "23x")]
    Format23x,
    #[strum(serialize = "22b")]
    Format22b,
    #[strum(serialize = "22t")]
    Format22t,
    #[strum(serialize = "22s")]
    Format22s,
    #[strum(serialize = "22c")]
    Format22c,
    #[strum(serialize = "32x")]
    Format32x,
    #[strum(serialize = "30t")]
    Format30t,
    #[strum(serialize = "31t")]
    Format31t,
    #[strum(serialize = "31i")]
    Format31i,
    #[strum(serialize = "31c")]
    Format31c,
    #[strum(serialize = "35c")]
    Format35c,
    #[strum(serialize = "3rc")]
    Format3rc,
    #[strum(serialize = "45cc")]
    Format45cc,
    #[strum(serialize = "4rcc")]
    Format4rcc,
    #[strum(serialize = "51l")]
    Format51l,
    #[strum(serialize = "packed-switch-payload")]
    PackedSwitchPayload,
    #[strum(serialize = "sparse-switch-payload")]
    SparseSwitchPayload,
    #[strum(serialize = "array-payload")]
    ArrayPayload,
}

/// Where a format keeps its relative branch offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSlot {
    /// Signed 8-bit offset in the high byte of the first code unit.
    HighByte,
    /// Signed 16-bit offset in the code unit at this index.
    Unit16(usize),
    /// Signed 32-bit offset in the two code units starting at this index (low unit first).
    Unit32(usize),
}

impl Format {
    /// Size in code units for fixed-size formats, `None` for payloads.
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        match self {
            Format::Format10x
            | Format::Format12x
            | Format::Format11n
            | Format::Format11x
            | Format::Format10t => Some(1),
            Format::Format20t
            | Format::Format22x
            | Format::Format21t
            | Format::Format21s
            | Format::Format21h
            | Format::Format21c
            | Format::Format23x
            | Format::Format22b
            | Format::Format22t
            | Format::Format22s
            | Format::Format22c => Some(2),
            Format::Format32x
            | Format::Format30t
            | Format::Format31t
            | Format::Format31i
            | Format::Format31c
            | Format::Format35c
            | Format::Format3rc => Some(3),
            Format::Format45cc | Format::Format4rcc => Some(4),
            Format::Format51l => Some(5),
            Format::PackedSwitchPayload | Format::SparseSwitchPayload | Format::ArrayPayload => {
                None
            }
        }
    }

    /// Location of the relative branch offset for branch-carrying formats.
    #[must_use]
    pub const fn branch_slot(self) -> Option<BranchSlot> {
        match self {
            Format::Format10t => Some(BranchSlot::HighByte),
            Format::Format20t | Format::Format21t | Format::Format22t => {
                Some(BranchSlot::Unit16(1))
            }
            Format::Format30t | Format::Format31t => Some(BranchSlot::Unit32(1)),
            _ => None,
        }
    }

    /// Returns `true` for the out-of-line data pseudo-formats.
    #[must_use]
    pub const fn is_payload(self) -> bool {
        matches!(
            self,
            Format::PackedSwitchPayload | Format::SparseSwitchPayload | Format::ArrayPayload
        )
    }
}

/// Static description of one opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct Opcode {
    /// Low byte of the first code unit (`0x00` for payloads)
    pub value: u8,
    /// Assembly mnemonic
    pub name: &'static str,
    /// Encoding format
    pub format: Format,
    /// Behavioural flags
    pub flags: OpcodeFlags,
}

impl Opcode {
    /// Looks up an opcode by its mnemonic, including `unused-XX` slots and the payload
    /// pseudo-opcodes.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Opcode> {
        MNEMONIC_TO_OPCODE
            .get_or_init(|| {
                OPCODES
                    .iter()
                    .chain([&PACKED_SWITCH_PAYLOAD, &SPARSE_SWITCH_PAYLOAD, &ARRAY_PAYLOAD])
                    .map(|opcode| (opcode.name, opcode))
                    .collect()
            })
            .get(name)
            .copied()
    }

    /// Returns `true` if no instruction is assigned to this opcode.
    #[must_use]
    pub fn is_unused(&self) -> bool {
        self.flags.contains(OpcodeFlags::UNUSED)
    }

    /// Returns the opcode for a first code unit, recognising payload identifiers.
    #[must_use]
    pub fn for_unit(unit: u16) -> &'static Opcode {
        match unit {
            PACKED_SWITCH_IDENT => &PACKED_SWITCH_PAYLOAD,
            SPARSE_SWITCH_IDENT => &SPARSE_SWITCH_PAYLOAD,
            ARRAY_DATA_IDENT => &ARRAY_PAYLOAD,
            _ => &OPCODES[usize::from(unit & 0xFF)],
        }
    }
}

/// Reverse lookup from mnemonic to opcode, built on first use.
static MNEMONIC_TO_OPCODE: OnceLock<HashMap<&'static str, &'static Opcode>> = OnceLock::new();

/// First code unit of a packed-switch payload.
pub const PACKED_SWITCH_IDENT: u16 = 0x0100;
/// First code unit of a sparse-switch payload.
pub const SPARSE_SWITCH_IDENT: u16 = 0x0200;
/// First code unit of a fill-array-data payload.
pub const ARRAY_DATA_IDENT: u16 = 0x0300;

/// Packed-switch payload pseudo-opcode.
pub static PACKED_SWITCH_PAYLOAD: Opcode = op(0x00, "packed-switch-payload", Format::PackedSwitchPayload, OpcodeFlags::PAYLOAD);
/// Sparse-switch payload pseudo-opcode.
pub static SPARSE_SWITCH_PAYLOAD: Opcode = op(0x00, "sparse-switch-payload", Format::SparseSwitchPayload, OpcodeFlags::PAYLOAD);
/// Fill-array-data payload pseudo-opcode.
pub static ARRAY_PAYLOAD: Opcode = op(0x00, "array-payload", Format::ArrayPayload, OpcodeFlags::PAYLOAD);

const fn op(value: u8, name: &'static str, format: Format, flags: OpcodeFlags) -> Opcode {
    Opcode {
        value,
        name,
        format,
        flags,
    }
}

use Format::*;

/// The primary opcode table, indexed by opcode byte.
#[rustfmt::skip]
pub static OPCODES: [Opcode; 256] = [
    // ── Moves and returns (0x00 – 0x11) ─────────────────────────────────────
    op(0x00, "nop", Format10x, CONTINUE),
    op(0x01, "move", Format12x, CONTINUE),
    op(0x02, "move/from16", Format22x, CONTINUE),
    op(0x03, "move/16", Format32x, CONTINUE),
    op(0x04, "move-wide", Format12x, CONTINUE),
    op(0x05, "move-wide/from16", Format22x, CONTINUE),
    op(0x06, "move-wide/16", Format32x, CONTINUE),
    op(0x07, "move-object", Format12x, CONTINUE),
    op(0x08, "move-object/from16", Format22x, CONTINUE),
    op(0x09, "move-object/16", Format32x, CONTINUE),
    op(0x0a, "move-result", Format11x, CONTINUE),
    op(0x0b, "move-result-wide", Format11x, CONTINUE),
    op(0x0c, "move-result-object", Format11x, CONTINUE),
    op(0x0d, "move-exception", Format11x, CONTINUE),
    op(0x0e, "return-void", Format10x, NONE),
    op(0x0f, "return", Format11x, NONE),
    op(0x10, "return-wide", Format11x, NONE),
    op(0x11, "return-object", Format11x, NONE),
    // ── Constants (0x12 – 0x1c) ─────────────────────────────────────────────
    op(0x12, "const/4", Format11n, CONTINUE),
    op(0x13, "const/16", Format21s, CONTINUE),
    op(0x14, "const", Format31i, CONTINUE),
    op(0x15, "const/high16", Format21h, CONTINUE),
    op(0x16, "const-wide/16", Format21s, CONTINUE),
    op(0x17, "const-wide/32", Format31i, CONTINUE),
    op(0x18, "const-wide", Format51l, CONTINUE),
    op(0x19, "const-wide/high16", Format21h, CONTINUE),
    op(0x1a, "const-string", Format21c, THROW),
    op(0x1b, "const-string/jumbo", Format31c, THROW),
    op(0x1c, "const-class", Format21c, THROW),
    // ── Objects and arrays (0x1d – 0x27) ────────────────────────────────────
    op(0x1d, "monitor-enter", Format11x, THROW),
    op(0x1e, "monitor-exit", Format11x, THROW),
    op(0x1f, "check-cast", Format21c, THROW),
    op(0x20, "instance-of", Format22c, THROW),
    op(0x21, "array-length", Format12x, THROW),
    op(0x22, "new-instance", Format21c, THROW),
    op(0x23, "new-array", Format22c, THROW),
    op(0x24, "filled-new-array", Format35c, INVOKE),
    op(0x25, "filled-new-array/range", Format3rc, INVOKE),
    op(0x26, "fill-array-data", Format31t, THROW.union(OpcodeFlags::FILL_ARRAY_DATA)),
    op(0x27, "throw", Format11x, OpcodeFlags::CAN_THROW),
    // ── Branches (0x28 – 0x2c) ──────────────────────────────────────────────
    op(0x28, "goto", Format10t, GOTO),
    op(0x29, "goto/16", Format20t, GOTO),
    op(0x2a, "goto/32", Format30t, GOTO),
    op(0x2b, "packed-switch", Format31t, SWITCH),
    op(0x2c, "sparse-switch", Format31t, SWITCH),
    // ── Comparisons (0x2d – 0x3d) ───────────────────────────────────────────
    op(0x2d, "cmpl-float", Format23x, CONTINUE),
    op(0x2e, "cmpg-float", Format23x, CONTINUE),
    op(0x2f, "cmpl-double", Format23x, CONTINUE),
    op(0x30, "cmpg-double", Format23x, CONTINUE),
    op(0x31, "cmp-long", Format23x, CONTINUE),
    op(0x32, "if-eq", Format22t, IF),
    op(0x33, "if-ne", Format22t, IF),
    op(0x34, "if-lt", Format22t, IF),
    op(0x35, "if-ge", Format22t, IF),
    op(0x36, "if-gt", Format22t, IF),
    op(0x37, "if-le", Format22t, IF),
    op(0x38, "if-eqz", Format21t, IF),
    op(0x39, "if-nez", Format21t, IF),
    op(0x3a, "if-ltz", Format21t, IF),
    op(0x3b, "if-gez", Format21t, IF),
    op(0x3c, "if-gtz", Format21t, IF),
    op(0x3d, "if-lez", Format21t, IF),
    op(0x3e, "unused-3e", Format10x, UNUSED),
    op(0x3f, "unused-3f", Format10x, UNUSED),
    op(0x40, "unused-40", Format10x, UNUSED),
    op(0x41, "unused-41", Format10x, UNUSED),
    op(0x42, "unused-42", Format10x, UNUSED),
    op(0x43, "unused-43", Format10x, UNUSED),
    // ── Array access (0x44 – 0x51) ──────────────────────────────────────────
    op(0x44, "aget", Format23x, THROW),
    op(0x45, "aget-wide", Format23x, THROW),
    op(0x46, "aget-object", Format23x, THROW),
    op(0x47, "aget-boolean", Format23x, THROW),
    op(0x48, "aget-byte", Format23x, THROW),
    op(0x49, "aget-char", Format23x, THROW),
    op(0x4a, "aget-short", Format23x, THROW),
    op(0x4b, "aput", Format23x, THROW),
    op(0x4c, "aput-wide", Format23x, THROW),
    op(0x4d, "aput-object", Format23x, THROW),
    op(0x4e, "aput-boolean", Format23x, THROW),
    op(0x4f, "aput-byte", Format23x, THROW),
    op(0x50, "aput-char", Format23x, THROW),
    op(0x51, "aput-short", Format23x, THROW),
    // ── Instance fields (0x52 – 0x5f) ───────────────────────────────────────
    op(0x52, "iget", Format22c, THROW),
    op(0x53, "iget-wide", Format22c, THROW),
    op(0x54, "iget-object", Format22c, THROW),
    op(0x55, "iget-boolean", Format22c, THROW),
    op(0x56, "iget-byte", Format22c, THROW),
    op(0x57, "iget-char", Format22c, THROW),
    op(0x58, "iget-short", Format22c, THROW),
    op(0x59, "iput", Format22c, THROW),
    op(0x5a, "iput-wide", Format22c, THROW),
    op(0x5b, "iput-object", Format22c, THROW),
    op(0x5c, "iput-boolean", Format22c, THROW),
    op(0x5d, "iput-byte", Format22c, THROW),
    op(0x5e, "iput-char", Format22c, THROW),
    op(0x5f, "iput-short", Format22c, THROW),
    // ── Static fields (0x60 – 0x6d) ─────────────────────────────────────────
    op(0x60, "sget", Format21c, THROW),
    op(0x61, "sget-wide", Format21c, THROW),
    op(0x62, "sget-object", Format21c, THROW),
    op(0x63, "sget-boolean", Format21c, THROW),
    op(0x64, "sget-byte", Format21c, THROW),
    op(0x65, "sget-char", Format21c, THROW),
    op(0x66, "sget-short", Format21c, THROW),
    op(0x67, "sput", Format21c, THROW),
    op(0x68, "sput-wide", Format21c, THROW),
    op(0x69, "sput-object", Format21c, THROW),
    op(0x6a, "sput-boolean", Format21c, THROW),
    op(0x6b, "sput-byte", Format21c, THROW),
    op(0x6c, "sput-char", Format21c, THROW),
    op(0x6d, "sput-short", Format21c, THROW),
    // ── Invocations (0x6e – 0x7a) ───────────────────────────────────────────
    op(0x6e, "invoke-virtual", Format35c, INVOKE),
    op(0x6f, "invoke-super", Format35c, INVOKE),
    op(0x70, "invoke-direct", Format35c, INVOKE),
    op(0x71, "invoke-static", Format35c, INVOKE),
    op(0x72, "invoke-interface", Format35c, INVOKE),
    op(0x73, "unused-73", Format10x, UNUSED),
    op(0x74, "invoke-virtual/range", Format3rc, INVOKE),
    op(0x75, "invoke-super/range", Format3rc, INVOKE),
    op(0x76, "invoke-direct/range", Format3rc, INVOKE),
    op(0x77, "invoke-static/range", Format3rc, INVOKE),
    op(0x78, "invoke-interface/range", Format3rc, INVOKE),
    op(0x79, "unused-79", Format10x, UNUSED),
    op(0x7a, "unused-7a", Format10x, UNUSED),
    // ── Unary operations (0x7b – 0x8f) ──────────────────────────────────────
    op(0x7b, "neg-int", Format12x, CONTINUE),
    op(0x7c, "not-int", Format12x, CONTINUE),
    op(0x7d, "neg-long", Format12x, CONTINUE),
    op(0x7e, "not-long", Format12x, CONTINUE),
    op(0x7f, "neg-float", Format12x, CONTINUE),
    op(0x80, "neg-double", Format12x, CONTINUE),
    op(0x81, "int-to-long", Format12x, CONTINUE),
    op(0x82, "int-to-float", Format12x, CONTINUE),
    op(0x83, "int-to-double", Format12x, CONTINUE),
    op(0x84, "long-to-int", Format12x, CONTINUE),
    op(0x85, "long-to-float", Format12x, CONTINUE),
    op(0x86, "long-to-double", Format12x, CONTINUE),
    op(0x87, "float-to-int", Format12x, CONTINUE),
    op(0x88, "float-to-long", Format12x, CONTINUE),
    op(0x89, "float-to-double", Format12x, CONTINUE),
    op(0x8a, "double-to-int", Format12x, CONTINUE),
    op(0x8b, "double-to-long", Format12x, CONTINUE),
    op(0x8c, "double-to-float", Format12x, CONTINUE),
    op(0x8d, "int-to-byte", Format12x, CONTINUE),
    op(0x8e, "int-to-char", Format12x, CONTINUE),
    op(0x8f, "int-to-short", Format12x, CONTINUE),
    // ── Binary operations (0x90 – 0xaf) ─────────────────────────────────────
    op(0x90, "add-int", Format23x, CONTINUE),
    op(0x91, "sub-int", Format23x, CONTINUE),
    op(0x92, "mul-int", Format23x, CONTINUE),
    op(0x93, "div-int", Format23x, THROW),
    op(0x94, "rem-int", Format23x, THROW),
    op(0x95, "and-int", Format23x, CONTINUE),
    op(0x96, "or-int", Format23x, CONTINUE),
    op(0x97, "xor-int", Format23x, CONTINUE),
    op(0x98, "shl-int", Format23x, CONTINUE),
    op(0x99, "shr-int", Format23x, CONTINUE),
    op(0x9a, "ushr-int", Format23x, CONTINUE),
    op(0x9b, "add-long", Format23x, CONTINUE),
    op(0x9c, "sub-long", Format23x, CONTINUE),
    op(0x9d, "mul-long", Format23x, CONTINUE),
    op(0x9e, "div-long", Format23x, THROW),
    op(0x9f, "rem-long", Format23x, THROW),
    op(0xa0, "and-long", Format23x, CONTINUE),
    op(0xa1, "or-long", Format23x, CONTINUE),
    op(0xa2, "xor-long", Format23x, CONTINUE),
    op(0xa3, "shl-long", Format23x, CONTINUE),
    op(0xa4, "shr-long", Format23x, CONTINUE),
    op(0xa5, "ushr-long", Format23x, CONTINUE),
    op(0xa6, "add-float", Format23x, CONTINUE),
    op(0xa7, "sub-float", Format23x, CONTINUE),
    op(0xa8, "mul-float", Format23x, CONTINUE),
    op(0xa9, "div-float", Format23x, CONTINUE),
    op(0xaa, "rem-float", Format23x, CONTINUE),
    op(0xab, "add-double", Format23x, CONTINUE),
    op(0xac, "sub-double", Format23x, CONTINUE),
    op(0xad, "mul-double", Format23x, CONTINUE),
    op(0xae, "div-double", Format23x, CONTINUE),
    op(0xaf, "rem-double", Format23x, CONTINUE),
    // ── Binary operations, two-address (0xb0 – 0xcf) ────────────────────────
    op(0xb0, "add-int/2addr", Format12x, CONTINUE),
    op(0xb1, "sub-int/2addr", Format12x, CONTINUE),
    op(0xb2, "mul-int/2addr", Format12x, CONTINUE),
    op(0xb3, "div-int/2addr", Format12x, THROW),
    op(0xb4, "rem-int/2addr", Format12x, THROW),
    op(0xb5, "and-int/2addr", Format12x, CONTINUE),
    op(0xb6, "or-int/2addr", Format12x, CONTINUE),
    op(0xb7, "xor-int/2addr", Format12x, CONTINUE),
    op(0xb8, "shl-int/2addr", Format12x, CONTINUE),
    op(0xb9, "shr-int/2addr", Format12x, CONTINUE),
    op(0xba, "ushr-int/2addr", Format12x, CONTINUE),
    op(0xbb, "add-long/2addr", Format12x, CONTINUE),
    op(0xbc, "sub-long/2addr", Format12x, CONTINUE),
    op(0xbd, "mul-long/2addr", Format12x, CONTINUE),
    op(0xbe, "div-long/2addr", Format12x, THROW),
    op(0xbf, "rem-long/2addr", Format12x, THROW),
    op(0xc0, "and-long/2addr", Format12x, CONTINUE),
    op(0xc1, "or-long/2addr", Format12x, CONTINUE),
    op(0xc2, "xor-long/2addr", Format12x, CONTINUE),
    op(0xc3, "shl-long/2addr", Format12x, CONTINUE),
    op(0xc4, "shr-long/2addr", Format12x, CONTINUE),
    op(0xc5, "ushr-long/2addr", Format12x, CONTINUE),
    op(0xc6, "add-float/2addr", Format12x, CONTINUE),
    op(0xc7, "sub-float/2addr", Format12x, CONTINUE),
    op(0xc8, "mul-float/2addr", Format12x, CONTINUE),
    op(0xc9, "div-float/2addr", Format12x, CONTINUE),
    op(0xca, "rem-float/2addr", Format12x, CONTINUE),
    op(0xcb, "add-double/2addr", Format12x, CONTINUE),
    op(0xcc, "sub-double/2addr", Format12x, CONTINUE),
    op(0xcd, "mul-double/2addr", Format12x, CONTINUE),
    op(0xce, "div-double/2addr", Format12x, CONTINUE),
    op(0xcf, "rem-double/2addr", Format12x, CONTINUE),
    // ── Literal operations (0xd0 – 0xe2) ────────────────────────────────────
    op(0xd0, "add-int/lit16", Format22s, CONTINUE),
    op(0xd1, "rsub-int", Format22s, CONTINUE),
    op(0xd2, "mul-int/lit16", Format22s, CONTINUE),
    op(0xd3, "div-int/lit16", Format22s, THROW),
    op(0xd4, "rem-int/lit16", Format22s, THROW),
    op(0xd5, "and-int/lit16", Format22s, CONTINUE),
    op(0xd6, "or-int/lit16", Format22s, CONTINUE),
    op(0xd7, "xor-int/lit16", Format22s, CONTINUE),
    op(0xd8, "add-int/lit8", Format22b, CONTINUE),
    op(0xd9, "rsub-int/lit8", Format22b, CONTINUE),
    op(0xda, "mul-int/lit8", Format22b, CONTINUE),
    op(0xdb, "div-int/lit8", Format22b, THROW),
    op(0xdc, "rem-int/lit8", Format22b, THROW),
    op(0xdd, "and-int/lit8", Format22b, CONTINUE),
    op(0xde, "or-int/lit8", Format22b, CONTINUE),
    op(0xdf, "xor-int/lit8", Format22b, CONTINUE),
    op(0xe0, "shl-int/lit8", Format22b, CONTINUE),
    op(0xe1, "shr-int/lit8", Format22b, CONTINUE),
    op(0xe2, "ushr-int/lit8", Format22b, CONTINUE),
    // ── Unassigned (0xe3 – 0xf9) ────────────────────────────────────────────
    op(0xe3, "unused-e3", Format10x, UNUSED),
    op(0xe4, "unused-e4", Format10x, UNUSED),
    op(0xe5, "unused-e5", Format10x, UNUSED),
    op(0xe6, "unused-e6", Format10x, UNUSED),
    op(0xe7, "unused-e7", Format10x, UNUSED),
    op(0xe8, "unused-e8", Format10x, UNUSED),
    op(0xe9, "unused-e9", Format10x, UNUSED),
    op(0xea, "unused-ea", Format10x, UNUSED),
    op(0xeb, "unused-eb", Format10x, UNUSED),
    op(0xec, "unused-ec", Format10x, UNUSED),
    op(0xed, "unused-ed", Format10x, UNUSED),
    op(0xee, "unused-ee", Format10x, UNUSED),
    op(0xef, "unused-ef", Format10x, UNUSED),
    op(0xf0, "unused-f0", Format10x, UNUSED),
    op(0xf1, "unused-f1", Format10x, UNUSED),
    op(0xf2, "unused-f2", Format10x, UNUSED),
    op(0xf3, "unused-f3", Format10x, UNUSED),
    op(0xf4, "unused-f4", Format10x, UNUSED),
    op(0xf5, "unused-f5", Format10x, UNUSED),
    op(0xf6, "unused-f6", Format10x, UNUSED),
    op(0xf7, "unused-f7", Format10x, UNUSED),
    op(0xf8, "unused-f8", Format10x, UNUSED),
    op(0xf9, "unused-f9", Format10x, UNUSED),
    // ── Method handles and polymorphic calls (0xfa – 0xff) ──────────────────
    op(0xfa, "invoke-polymorphic", Format45cc, INVOKE),
    op(0xfb, "invoke-polymorphic/range", Format4rcc, INVOKE),
    op(0xfc, "invoke-custom", Format35c, INVOKE),
    op(0xfd, "invoke-custom/range", Format3rc, INVOKE),
    op(0xfe, "const-method-handle", Format21c, THROW),
    op(0xff, "const-method-type", Format21c, THROW),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_value() {
        for (index, opcode) in OPCODES.iter().enumerate() {
            assert_eq!(usize::from(opcode.value), index, "{}", opcode.name);
        }
    }

    #[test]
    fn lookup_by_name_and_unit() {
        let goto = Opcode::by_name("goto/16").unwrap();
        assert_eq!(goto.value, 0x29);
        assert_eq!(goto.format.size(), Some(2));
        assert_eq!(goto.format.branch_slot(), Some(BranchSlot::Unit16(1)));

        assert!(Opcode::by_name("unused-3e").unwrap().is_unused());
        assert!(Opcode::by_name("goto/64").is_none());
        assert_eq!(Opcode::for_unit(0x0100).format, Format::PackedSwitchPayload);
        assert_eq!(Opcode::for_unit(0x0300).name, "array-payload");
        assert_eq!(Opcode::for_unit(0x1012).name, "const/4");
        // A nop with a non-payload high byte stays a nop
        assert_eq!(Opcode::for_unit(0x0400).name, "nop");
    }

    #[test]
    fn format_display() {
        assert_eq!(Format::Format4rcc.to_string(), "4rcc");
        assert_eq!(Format::ArrayPayload.to_string(), "array-payload");
        assert!(Format::SparseSwitchPayload.is_payload());
        assert_eq!(Format::ArrayPayload.size(), None);
    }
}
