//! Instruction representation, branch target cells and payload accessors.
//!
//! An [`Instruction`] is stored as its raw code units plus a reference into the static opcode
//! table. Branch destinations are kept outside of the units in shared [`TargetRef`] cells that
//! hold absolute byte addresses; the relative offsets inside the units are only meaningful after
//! [`Instruction::encode_units`] patched them against the current layout.
//!
//! # Addresses
//!
//! All addresses handed out by this module are byte offsets from the start of the method. The
//! binary format counts in 16-bit code units, so every address is even and every size is twice
//! the number of units.
//!
//! # Payloads
//!
//! `packed-switch`, `sparse-switch` and `fill-array-data` point at out-of-line payload
//! pseudo-instructions. Switch payload targets are relative to the switch instruction that
//! references the payload, not to the payload itself, so encoding them needs the address of
//! that switch (see [`crate::assembly::encode_instructions`]).

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use strum::{Display, EnumIter};

use crate::{
    assembly::{
        extraline::ExtraLine,
        opcodes::{
            BranchSlot, Format, Opcode, OpcodeFlags, ARRAY_DATA_IDENT, ARRAY_PAYLOAD,
            PACKED_SWITCH_IDENT, PACKED_SWITCH_PAYLOAD, SPARSE_SWITCH_IDENT,
            SPARSE_SWITCH_PAYLOAD,
        },
    },
    Result,
};

/// Shared, mutable absolute address of a branch destination.
///
/// The same cell is held by the branching instruction and by the target label attached to the
/// destination, so relocating the label moves the branch.
#[derive(Debug, Clone)]
pub struct TargetRef(Arc<AtomicU32>);

impl TargetRef {
    /// Creates a new cell pointing at `address`.
    #[must_use]
    pub fn new(address: u32) -> Self {
        TargetRef(Arc::new(AtomicU32::new(address)))
    }

    /// Current destination address in bytes.
    #[must_use]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    /// Moves the destination.
    pub fn set(&self, address: u32) {
        self.0.store(address, Ordering::Relaxed);
    }

    /// Returns `true` if both handles refer to the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &TargetRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// What kind of reference leads to a branch destination. Decides the label prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum TargetKind {
    /// Destination of `goto`, `goto/16` or `goto/32`
    #[strum(serialize = "goto")]
    Goto,
    /// Destination of a conditional `if-*`
    #[strum(serialize = "cond")]
    Cond,
    /// A case of a packed switch
    #[strum(serialize = "pswitch")]
    PackedSwitch,
    /// A case of a sparse switch
    #[strum(serialize = "sswitch")]
    SparseSwitch,
    /// The payload of `fill-array-data`
    #[strum(serialize = "array")]
    Array,
    /// The payload of `packed-switch`
    #[strum(serialize = "pswitch_data")]
    PackedSwitchData,
    /// The payload of `sparse-switch`
    #[strum(serialize = "sswitch_data")]
    SparseSwitchData,
}

impl TargetKind {
    /// Parses a label prefix such as `cond` or `pswitch_data`.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Option<TargetKind> {
        match prefix {
            "goto" => Some(TargetKind::Goto),
            "cond" => Some(TargetKind::Cond),
            "pswitch" => Some(TargetKind::PackedSwitch),
            "sswitch" => Some(TargetKind::SparseSwitch),
            "array" => Some(TargetKind::Array),
            "pswitch_data" => Some(TargetKind::PackedSwitchData),
            "sswitch_data" => Some(TargetKind::SparseSwitchData),
            _ => None,
        }
    }
}

/// One decoded instruction or payload.
#[derive(Debug)]
pub struct Instruction {
    /// Static opcode description
    pub opcode: &'static Opcode,
    pub(crate) units: Vec<u16>,
    pub(crate) address: u32,
    pub(crate) targets: Vec<TargetRef>,
    pub(crate) extra_lines: Vec<ExtraLine>,
}

impl Instruction {
    /// Creates an instruction without branch targets from its code units.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if `units` is empty, has the wrong length for
    /// the opcode's format, or belongs to an opcode that needs branch targets
    /// (use [`Instruction::with_targets`] for those).
    pub fn new(units: Vec<u16>) -> Result<Self> {
        Self::with_targets(units, Vec::new())
    }

    /// Creates an instruction together with its branch destinations.
    ///
    /// Branch offset fields inside `units` are ignored; they are rewritten from `targets` on
    /// encode.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if the unit count does not match the format or
    /// the number of targets does not match what the opcode references, and
    /// [`crate::Error::ValueRange`] for an array payload with an illegal element width.
    pub fn with_targets(units: Vec<u16>, targets: Vec<TargetRef>) -> Result<Self> {
        let Some(&first) = units.first() else {
            return Err(invalid_operation_error!("An instruction needs at least one code unit"));
        };

        let opcode = Opcode::for_unit(first);
        let expected = expected_size(opcode, &units)?;
        if expected != units.len() {
            return Err(invalid_operation_error!(
                "{} takes {} code units, got {}",
                opcode.name,
                expected,
                units.len()
            ));
        }

        let expected_targets = expected_target_count(opcode, &units);
        if expected_targets != targets.len() {
            return Err(invalid_operation_error!(
                "{} references {} targets, got {}",
                opcode.name,
                expected_targets,
                targets.len()
            ));
        }

        Ok(Instruction {
            opcode,
            units,
            address: 0,
            targets,
            extra_lines: Vec::new(),
        })
    }

    /// Builds a `packed-switch` payload for consecutive keys starting at `first_key`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if there are more than `u16::MAX` cases.
    pub fn packed_switch_payload(first_key: i32, targets: Vec<TargetRef>) -> Result<Self> {
        let count = u16::try_from(targets.len())
            .map_err(|_| value_range_error!("switch case count", targets.len() as u32, 0u32, u16::MAX))?;
        let key = first_key as u32;

        let mut units = Vec::with_capacity(4 + targets.len() * 2);
        units.extend([PACKED_SWITCH_IDENT, count, key as u16, (key >> 16) as u16]);
        units.resize(4 + targets.len() * 2, 0);

        Ok(Instruction {
            opcode: &PACKED_SWITCH_PAYLOAD,
            units,
            address: 0,
            targets,
            extra_lines: Vec::new(),
        })
    }

    /// Builds a `sparse-switch` payload. `keys` and `targets` pair up by position.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if the lengths differ and
    /// [`crate::Error::ValueRange`] if there are more than `u16::MAX` cases.
    pub fn sparse_switch_payload(keys: &[i32], targets: Vec<TargetRef>) -> Result<Self> {
        if keys.len() != targets.len() {
            return Err(invalid_operation_error!(
                "sparse-switch has {} keys but {} targets",
                keys.len(),
                targets.len()
            ));
        }
        let count = u16::try_from(keys.len())
            .map_err(|_| value_range_error!("switch case count", keys.len() as u32, 0u32, u16::MAX))?;

        let mut units = Vec::with_capacity(2 + keys.len() * 4);
        units.extend([SPARSE_SWITCH_IDENT, count]);
        for &key in keys {
            let key = key as u32;
            units.extend([key as u16, (key >> 16) as u16]);
        }
        units.resize(2 + keys.len() * 4, 0);

        Ok(Instruction {
            opcode: &SPARSE_SWITCH_PAYLOAD,
            units,
            address: 0,
            targets,
            extra_lines: Vec::new(),
        })
    }

    /// Builds a `fill-array-data` payload of `width`-byte elements.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if `width` is outside `[0, 8]`.
    pub fn array_payload(width: u16, elements: &[u64]) -> Result<Self> {
        if width > 8 {
            return Err(value_range_error!("array element width", width, 0u16, 8u16));
        }
        let count = u32::try_from(elements.len()).map_err(|_| {
            value_range_error!(
                "array element count",
                i64::try_from(elements.len()).unwrap_or(i64::MAX),
                0u32,
                u32::MAX
            )
        })?;

        let mut bytes = Vec::with_capacity(usize::from(width) * elements.len() + 1);
        for element in elements {
            bytes.extend_from_slice(&element.to_le_bytes()[..usize::from(width)]);
        }
        if bytes.len() % 2 != 0 {
            bytes.push(0);
        }

        let mut units = vec![ARRAY_DATA_IDENT, width, count as u16, (count >> 16) as u16];
        units.extend(bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])));

        Ok(Instruction {
            opcode: &ARRAY_PAYLOAD,
            units,
            address: 0,
            targets: Vec::new(),
            extra_lines: Vec::new(),
        })
    }

    /// Raw code units as stored. Branch fields may be stale until encode.
    #[must_use]
    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Absolute byte address assigned by the last layout.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Size in code units.
    #[must_use]
    pub fn size(&self) -> usize {
        self.units.len()
    }

    /// Size in bytes.
    #[must_use]
    pub fn byte_size(&self) -> u32 {
        (self.units.len() * 2) as u32
    }

    /// Mnemonic of the opcode.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    /// Shared destination cells, in the order the instruction references them.
    #[must_use]
    pub fn targets(&self) -> &[TargetRef] {
        &self.targets
    }

    /// Extra lines currently attached to this instruction.
    #[must_use]
    pub fn extra_lines(&self) -> &[ExtraLine] {
        &self.extra_lines
    }

    /// High byte of the first code unit, holding the first register operand for most formats.
    #[must_use]
    pub fn high_byte(&self) -> u8 {
        (self.units[0] >> 8) as u8
    }

    /// Returns `true` for payload pseudo-instructions.
    #[must_use]
    pub fn is_payload(&self) -> bool {
        self.opcode.flags.contains(OpcodeFlags::PAYLOAD)
    }

    /// Label prefix for this instruction's destinations, if it has any.
    #[must_use]
    pub fn target_kind(&self) -> Option<TargetKind> {
        let flags = self.opcode.flags;
        if flags.contains(OpcodeFlags::BRANCH) {
            if flags.contains(OpcodeFlags::CAN_CONTINUE) {
                Some(TargetKind::Cond)
            } else {
                Some(TargetKind::Goto)
            }
        } else if flags.contains(OpcodeFlags::FILL_ARRAY_DATA) {
            Some(TargetKind::Array)
        } else if flags.contains(OpcodeFlags::SWITCH) {
            match self.opcode.value {
                0x2b => Some(TargetKind::PackedSwitchData),
                _ => Some(TargetKind::SparseSwitchData),
            }
        } else {
            match self.opcode.format {
                Format::PackedSwitchPayload => Some(TargetKind::PackedSwitch),
                Format::SparseSwitchPayload => Some(TargetKind::SparseSwitch),
                _ => None,
            }
        }
    }

    /// Relative offsets stored in the units, in code units, matching [`Instruction::targets`].
    ///
    /// For switch payloads the offsets are relative to the referencing switch.
    #[must_use]
    pub fn relative_offsets(&self) -> Vec<i32> {
        match self.opcode.format {
            Format::PackedSwitchPayload => {
                let count = usize::from(self.units[1]);
                (0..count).map(|i| read_i32(&self.units, 4 + i * 2)).collect()
            }
            Format::SparseSwitchPayload => {
                let count = usize::from(self.units[1]);
                (0..count)
                    .map(|i| read_i32(&self.units, 2 + count * 2 + i * 2))
                    .collect()
            }
            format => match format.branch_slot() {
                Some(slot) => vec![read_branch(&self.units, slot)],
                None => Vec::new(),
            },
        }
    }

    /// Keys of a switch payload, in case order.
    #[must_use]
    pub fn switch_keys(&self) -> Vec<i32> {
        match self.opcode.format {
            Format::PackedSwitchPayload => {
                let first = read_i32(&self.units, 2);
                (0..i32::from(self.units[1]))
                    .map(|i| first.wrapping_add(i))
                    .collect()
            }
            Format::SparseSwitchPayload => (0..usize::from(self.units[1]))
                .map(|i| read_i32(&self.units, 2 + i * 2))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Element width in bytes of an array payload.
    #[must_use]
    pub fn array_width(&self) -> Option<u16> {
        (self.opcode.format == Format::ArrayPayload).then(|| self.units[1])
    }

    /// Elements of an array payload, zero-extended to 64 bits.
    #[must_use]
    pub fn array_elements(&self) -> Vec<u64> {
        let Some(width) = self.array_width() else {
            return Vec::new();
        };
        let width = usize::from(width);
        let count = read_i32(&self.units, 2) as u32 as usize;
        let bytes: Vec<u8> = self.units[4..]
            .iter()
            .flat_map(|unit| unit.to_le_bytes())
            .collect();

        (0..count)
            .map(|i| {
                let mut element = [0u8; 8];
                element[..width].copy_from_slice(&bytes[i * width..(i + 1) * width]);
                u64::from_le_bytes(element)
            })
            .collect()
    }

    /// Returns the units with every branch field rewritten from the current targets.
    ///
    /// `base` is the address offsets are relative to: the instruction's own address for
    /// branches, or the address of the referencing switch for switch payloads.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if an offset does not fit its field.
    pub fn encode_units(&self, base: u32) -> Result<Vec<u16>> {
        let mut units = self.units.clone();
        let offsets = self
            .targets
            .iter()
            .map(|target| (i64::from(target.get()) - i64::from(base)) / 2);

        match self.opcode.format {
            Format::PackedSwitchPayload => {
                for (i, offset) in offsets.enumerate() {
                    write_i32(&mut units, 4 + i * 2, to_i32(offset)?);
                }
            }
            Format::SparseSwitchPayload => {
                let count = usize::from(units[1]);
                for (i, offset) in offsets.enumerate() {
                    write_i32(&mut units, 2 + count * 2 + i * 2, to_i32(offset)?);
                }
            }
            format => {
                let mut offsets = offsets;
                if let (Some(slot), Some(offset)) = (format.branch_slot(), offsets.next()) {
                    write_branch(&mut units, slot, offset)?;
                }
            }
        }

        Ok(units)
    }

    pub(crate) fn take_extra_lines(&mut self) -> Vec<ExtraLine> {
        std::mem::take(&mut self.extra_lines)
    }
}

/// Number of code units an instruction occupies, reading payload headers from `units`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if a payload header is truncated and
/// [`crate::Error::ValueRange`] for an array payload element width outside `[0, 8]`.
pub fn expected_size(opcode: &Opcode, units: &[u16]) -> Result<usize> {
    let header = |index: usize| units.get(index).copied().ok_or(out_of_bounds_error!());

    match opcode.format {
        Format::PackedSwitchPayload => Ok(4 + usize::from(header(1)?) * 2),
        Format::SparseSwitchPayload => Ok(2 + usize::from(header(1)?) * 4),
        Format::ArrayPayload => {
            let width = header(1)?;
            if width > 8 {
                return Err(value_range_error!("array element width", width, 0u16, 8u16));
            }
            let count = u64::from(header(2)?) | (u64::from(header(3)?) << 16);
            let data_units = (u64::from(width) * count + 1) / 2;
            usize::try_from(4 + data_units).map_err(|_| out_of_bounds_error!())
        }
        format => Ok(format.size().unwrap_or(1)),
    }
}

fn expected_target_count(opcode: &Opcode, units: &[u16]) -> usize {
    let flags = opcode.flags;
    if flags.intersects(OpcodeFlags::BRANCH | OpcodeFlags::SWITCH | OpcodeFlags::FILL_ARRAY_DATA) {
        1
    } else if matches!(
        opcode.format,
        Format::PackedSwitchPayload | Format::SparseSwitchPayload
    ) {
        usize::from(units[1])
    } else {
        0
    }
}

fn read_i32(units: &[u16], index: usize) -> i32 {
    (u32::from(units[index]) | (u32::from(units[index + 1]) << 16)) as i32
}

fn write_i32(units: &mut [u16], index: usize, value: i32) {
    let value = value as u32;
    units[index] = value as u16;
    units[index + 1] = (value >> 16) as u16;
}

fn to_i32(offset: i64) -> Result<i32> {
    i32::try_from(offset).map_err(|_| value_range_error!("branch offset", offset, i32::MIN, i32::MAX))
}

/// Reads the signed branch offset stored at `slot`, in code units.
#[must_use]
pub fn read_branch(units: &[u16], slot: BranchSlot) -> i32 {
    match slot {
        BranchSlot::HighByte => i32::from((units[0] >> 8) as u8 as i8),
        BranchSlot::Unit16(index) => i32::from(units[index] as i16),
        BranchSlot::Unit32(index) => read_i32(units, index),
    }
}

/// Stores a signed branch offset at `slot`.
///
/// # Errors
/// Returns [`crate::Error::ValueRange`] if `offset` does not fit the slot's width.
pub fn write_branch(units: &mut [u16], slot: BranchSlot, offset: i64) -> Result<()> {
    match slot {
        BranchSlot::HighByte => {
            let value = i8::try_from(offset)
                .map_err(|_| value_range_error!("8-bit branch offset", offset, i8::MIN, i8::MAX))?;
            units[0] = (units[0] & 0x00FF) | (u16::from(value as u8) << 8);
        }
        BranchSlot::Unit16(index) => {
            let value = i16::try_from(offset)
                .map_err(|_| value_range_error!("16-bit branch offset", offset, i16::MIN, i16::MAX))?;
            units[index] = value as u16;
        }
        BranchSlot::Unit32(index) => write_i32(units, index, to_i32(offset)?),
    }
    Ok(())
}
