//! Encoding of instructions back into code units.
//!
//! Branch fields are patched from the current [`crate::assembly::TargetRef`] values against the
//! current layout, so instructions must have been laid out first (see
//! [`crate::assembly::InstructionSequence::layout`]).

use std::collections::HashMap;

use log::debug;

use crate::{
    assembly::{
        instruction::Instruction,
        opcodes::{Format, OpcodeFlags},
    },
    Result,
};

/// Encodes laid-out instructions into code units.
///
/// # Errors
/// Returns [`crate::Error::ValueRange`] if a branch offset does not fit its field and
/// [`crate::Error::InvalidOperation`] for a switch payload that no switch references.
pub fn encode_instructions(instructions: &[Instruction]) -> Result<Vec<u16>> {
    let mut switch_at: HashMap<u32, u32> = HashMap::new();
    for instruction in instructions {
        if instruction.opcode.flags.contains(OpcodeFlags::SWITCH) {
            if let Some(target) = instruction.targets.first() {
                switch_at.entry(target.get()).or_insert(instruction.address);
            }
        }
    }

    let mut units = Vec::with_capacity(instructions.iter().map(Instruction::size).sum());
    for instruction in instructions {
        let base = match instruction.opcode.format {
            Format::PackedSwitchPayload | Format::SparseSwitchPayload => {
                let Some(&base) = switch_at.get(&instruction.address) else {
                    return Err(invalid_operation_error!(
                        "{} at 0x{:x} is not referenced by any switch",
                        instruction.name(),
                        instruction.address
                    ));
                };
                base
            }
            _ => instruction.address,
        };

        units.extend(instruction.encode_units(base)?);
    }

    debug!(
        "Encoded {} instructions into {} code units",
        instructions.len(),
        units.len()
    );
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{decode_instructions, TargetRef},
        method::BodyConfig,
        Error,
    };

    #[test]
    fn decode_encode_preserves_units() {
        let units = [
            0x0012, // const/4 v0, 0
            0x0038, 0x0004, // if-eqz v0, +4
            0x002b, 0x0004, 0x0000, // packed-switch v0, +4
            0x000e, // return-void
            0x0100, 0x0001, 0x0005, 0x0000, 0xfffd, 0xffff, // payload, key 5, case -3
        ];
        let instructions = decode_instructions(&units, &BodyConfig::default()).unwrap();
        assert_eq!(encode_instructions(&instructions).unwrap(), units);
    }

    #[test]
    fn moved_targets_are_patched() {
        let mut instructions = decode_instructions(&[0x0128, 0x000e], &BodyConfig::default()).unwrap();
        instructions[0].targets[0].set(0);
        assert_eq!(encode_instructions(&instructions).unwrap(), vec![0x0028, 0x000e]);
    }

    #[test]
    fn unreferenced_switch_payload() {
        let payload = Instruction::packed_switch_payload(0, vec![TargetRef::new(0)]).unwrap();
        assert!(matches!(
            encode_instructions(&[payload]),
            Err(Error::InvalidOperation(_))
        ));
    }
}
