//! Decoding of raw code units into instructions.
//!
//! Decoding runs in two passes. The first pass splits the code units into instructions and
//! payloads and assigns their addresses. The second pass resolves every relative branch offset
//! into an absolute [`TargetRef`]: ordinary branches are relative to the branching instruction,
//! switch payload cases are relative to the switch that references the payload. A payload that
//! no instruction references cannot be resolved and is rejected.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::{assembly::decode_instructions, method::BodyConfig};
//!
//! // const/4 v0, 0 ; if-eqz v0, +2 ; return-void
//! let units = [0x0012, 0x0038, 0x0002, 0x000e];
//! let instructions = decode_instructions(&units, &BodyConfig::default())?;
//!
//! assert_eq!(instructions.len(), 3);
//! assert_eq!(instructions[1].name(), "if-eqz");
//! assert_eq!(instructions[1].targets()[0].get(), 6);
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::{
    assembly::{
        instruction::{expected_size, Instruction, TargetRef},
        opcodes::{Format, Opcode, OpcodeFlags},
    },
    method::BodyConfig,
    Result,
};

/// Decodes `units` into instructions with absolute addresses and resolved branch targets.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for unassigned opcodes (with `strict_opcodes`), branch
/// targets outside the address space, switches that do not point at a matching payload,
/// unreferenced switch payloads, or more than `max_instructions` instructions.
/// Returns [`crate::Error::OutOfBounds`] if the last instruction is truncated.
pub fn decode_instructions(units: &[u16], config: &BodyConfig) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut position = 0usize;

    while position < units.len() {
        if instructions.len() >= config.max_instructions {
            return Err(malformed_error!(
                "Method exceeds {} instructions",
                config.max_instructions
            ));
        }

        let first = units[position];
        let opcode = Opcode::for_unit(first);
        if opcode.is_unused() {
            if config.strict_opcodes {
                return Err(malformed_error!(
                    "Invalid opcode: {:02X} at 0x{:x}",
                    first & 0xFF,
                    position * 2
                ));
            }
            warn!(
                "Keeping unassigned opcode {:02X} at 0x{:x} as a raw unit",
                first & 0xFF,
                position * 2
            );
        }

        let size = expected_size(opcode, &units[position..])?;
        let end = position.checked_add(size).ok_or(out_of_bounds_error!())?;
        if end > units.len() {
            return Err(out_of_bounds_error!());
        }

        let address = u32::try_from(position * 2)
            .map_err(|_| malformed_error!("Code exceeds the 32-bit address space"))?;
        trace!("0x{:04x}: {} ({} units)", address, opcode.name, size);

        instructions.push(Instruction {
            opcode,
            units: units[position..end].to_vec(),
            address,
            targets: Vec::new(),
            extra_lines: Vec::new(),
        });
        position = end;
    }

    resolve_targets(&mut instructions)?;
    debug!(
        "Decoded {} instructions from {} code units",
        instructions.len(),
        units.len()
    );
    Ok(instructions)
}

fn resolve_targets(instructions: &mut [Instruction]) -> Result<()> {
    let by_address: HashMap<u32, usize> = instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| (instruction.address, index))
        .collect();
    let mut payload_base: HashMap<usize, u32> = HashMap::new();

    for instruction in instructions.iter_mut() {
        if instruction.is_payload() {
            continue;
        }
        let Some(&offset) = instruction.relative_offsets().first() else {
            continue;
        };

        let target = absolute(instruction.address, offset)?;
        instruction.targets = vec![TargetRef::new(target)];

        if instruction.opcode.flags.contains(OpcodeFlags::SWITCH) {
            let Some(&payload) = by_address.get(&target) else {
                return Err(malformed_error!(
                    "{} at 0x{:x} points at 0x{:x}, which is not an instruction",
                    instruction.name(),
                    instruction.address,
                    target
                ));
            };
            payload_base.entry(payload).or_insert(instruction.address);
        }
    }

    for (index, instruction) in instructions.iter_mut().enumerate() {
        let format = instruction.opcode.format;
        if !matches!(
            format,
            Format::PackedSwitchPayload | Format::SparseSwitchPayload
        ) {
            continue;
        }

        let Some(&base) = payload_base.get(&index) else {
            return Err(malformed_error!(
                "{} at 0x{:x} is not referenced by any switch",
                instruction.name(),
                instruction.address
            ));
        };

        instruction.targets = instruction
            .relative_offsets()
            .into_iter()
            .map(|offset| absolute(base, offset).map(TargetRef::new))
            .collect::<Result<_>>()?;
    }

    for instruction in instructions.iter() {
        let flags = instruction.opcode.flags;
        if !flags.intersects(OpcodeFlags::SWITCH | OpcodeFlags::FILL_ARRAY_DATA) {
            continue;
        }

        let target = instruction.targets[0].get();
        let expected = match instruction.opcode.value {
            0x2b => Format::PackedSwitchPayload,
            0x2c => Format::SparseSwitchPayload,
            _ => Format::ArrayPayload,
        };
        let matches = by_address
            .get(&target)
            .is_some_and(|&index| instructions[index].opcode.format == expected);
        if !matches {
            return Err(malformed_error!(
                "{} at 0x{:x} expects a {} at 0x{:x}",
                instruction.name(),
                instruction.address,
                expected,
                target
            ));
        }
    }

    Ok(())
}

fn absolute(base: u32, offset: i32) -> Result<u32> {
    let target = i64::from(base) + i64::from(offset) * 2;
    u32::try_from(target).map_err(|_| {
        malformed_error!(
            "Branch from 0x{:x} by {} code units leaves the method",
            base,
            offset
        )
    })
}
