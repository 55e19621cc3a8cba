//! Assembly text output.
//!
//! The writer walks the instructions in address order. In front of every instruction it emits
//! the attached extra lines sorted by their fixed order, dropping a line that renders the same
//! as the line emitted right before it. Two handlers sharing a try start therefore produce one
//! `:try_start_` label. Debug rows without a text form are skipped without ending such a run.
//! A run that contained a `.catch` directive is followed by a blank line.

use std::fmt::{self, Write};

use crate::{
    assembly::{BranchSlot, ExtraLine, Format, Instruction, TargetKind},
    debug::DebugProgram,
    identifiers::{display_string, IdentifierStore},
    method::{label_name, MethodBody},
    Result,
};

/// Renders method bodies into any [`fmt::Write`] sink.
pub struct SmaliWriter<'a, W: Write> {
    out: W,
    ids: &'a dyn IdentifierStore,
    indent: usize,
}

impl<'a, W: Write> SmaliWriter<'a, W> {
    /// Creates a writer indenting code lines by `indent` spaces.
    pub fn new(out: W, ids: &'a dyn IdentifierStore, indent: usize) -> Self {
        SmaliWriter { out, ids, indent }
    }

    /// Consumes the writer and returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Writes the header and code of `body`.
    ///
    /// The extra-line cache of the body must be built; [`MethodBody::write_text`] takes care
    /// of that.
    ///
    /// # Errors
    /// Returns [`crate::Error::Format`] if the sink fails.
    pub fn write_method(&mut self, body: &MethodBody) -> Result<()> {
        writeln!(self.out, ".registers {}", body.registers)?;
        writeln!(self.out, ".ins {}", body.ins)?;
        writeln!(self.out, ".outs {}", body.outs)?;

        let debug = body.debug();
        if let Some(program) = debug {
            writeln!(self.out, ".debug {}", program.line_start)?;
            for name in &program.parameter_names {
                writeln!(self.out, ".param {}", display_string(self.ids, *name))?;
            }
        }
        writeln!(self.out)?;

        for instruction in body.code() {
            self.write_lines(instruction.extra_lines(), debug)?;
            self.write_instruction(instruction)?;
        }
        self.write_lines(body.code().trailing_lines(), debug)?;
        Ok(())
    }

    fn write_lines(&mut self, lines: &[ExtraLine], debug: Option<&DebugProgram>) -> Result<()> {
        let mut sorted: Vec<&ExtraLine> = lines.iter().collect();
        sorted.sort_by_key(|line| line.sort_order());

        let mut previous: Option<&ExtraLine> = None;
        let mut handler = false;
        for line in sorted {
            if previous.is_some_and(|emitted| emitted.equals_as_line(line)) {
                continue;
            }

            let text = match line {
                ExtraLine::Label(label) => Some(label.render(self.ids)),
                ExtraLine::Debug(index) => debug
                    .and_then(|program| program.row(*index))
                    .and_then(|row| row.directive(self.ids)),
                ExtraLine::Target(label) => Some(format!(":{}", label.name())),
            };
            let Some(text) = text else {
                continue;
            };

            self.line(1, &text)?;
            handler |= line.is_handler();
            previous = Some(line);
        }

        if handler {
            writeln!(self.out)?;
        }
        Ok(())
    }

    fn write_instruction(&mut self, instruction: &Instruction) -> Result<()> {
        match instruction.opcode.format {
            Format::PackedSwitchPayload => {
                let first = instruction.switch_keys().first().copied().unwrap_or(0);
                self.line(1, &format!(".packed-switch {}", signed_hex(i64::from(first))))?;
                for target in instruction.targets() {
                    let label = label_name(payload_kind(instruction), target.get());
                    self.line(2, &format!(":{label}"))?;
                }
                self.line(1, ".end packed-switch")
            }
            Format::SparseSwitchPayload => {
                self.line(1, ".sparse-switch")?;
                for (key, target) in instruction.switch_keys().iter().zip(instruction.targets()) {
                    let label = label_name(payload_kind(instruction), target.get());
                    self.line(2, &format!("{} -> :{label}", signed_hex(i64::from(*key))))?;
                }
                self.line(1, ".end sparse-switch")
            }
            Format::ArrayPayload => {
                let width = instruction.array_width().unwrap_or(0);
                self.line(1, &format!(".array-data {width}"))?;
                for element in instruction.array_elements() {
                    self.line(2, &format!("0x{element:x}"))?;
                }
                self.line(1, ".end array-data")
            }
            format => {
                let text = operands(instruction, format);
                if text.is_empty() {
                    self.line(1, instruction.name())
                } else {
                    self.line(1, &format!("{} {}", instruction.name(), text.join(", ")))
                }
            }
        }
    }

    fn line(&mut self, depth: usize, text: &str) -> Result<()> {
        writeln!(self.out, "{:width$}{text}", "", width = self.indent * depth)?;
        Ok(())
    }
}

fn payload_kind(instruction: &Instruction) -> TargetKind {
    instruction.target_kind().unwrap_or(TargetKind::PackedSwitch)
}

/// Generic operand list: the high byte, then every further code unit, with the branch field
/// replaced by its destination label.
fn operands(instruction: &Instruction, format: Format) -> Vec<String> {
    let units = instruction.units();
    let slot = format.branch_slot();
    let label = || {
        let kind = instruction.target_kind();
        match (kind, instruction.targets().first()) {
            (Some(kind), Some(target)) => format!(":{}", label_name(kind, target.get())),
            _ => String::new(),
        }
    };

    let mut text = Vec::new();
    match slot {
        Some(BranchSlot::HighByte) => text.push(label()),
        _ if format == Format::Format10x && instruction.high_byte() == 0 => {}
        _ => text.push(format!("0x{:02x}", instruction.high_byte())),
    }

    let mut index = 1;
    while index < units.len() {
        match slot {
            Some(BranchSlot::Unit16(at)) if at == index => {
                text.push(label());
                index += 1;
            }
            Some(BranchSlot::Unit32(at)) if at == index => {
                text.push(label());
                index += 2;
            }
            _ => {
                text.push(format!("0x{:04x}", units[index]));
                index += 1;
            }
        }
    }
    text
}

/// Hex with an explicit sign for negative values, e.g. `-0x5`.
pub(crate) fn signed_hex(value: i64) -> String {
    if value < 0 {
        format!("-0x{:x}", value.unsigned_abs())
    } else {
        format!("0x{value:x}")
    }
}

impl<W: Write> fmt::Debug for SmaliWriter<'_, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmaliWriter")
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        identifiers::Identifiers,
        method::{BodyConfig, TryItem},
    };

    fn body(units: &[u16]) -> MethodBody {
        let mut data = vec![1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        data.extend((units.len() as u32).to_le_bytes());
        for unit in units {
            data.extend(unit.to_le_bytes());
        }
        MethodBody::from(&data, None, BodyConfig::default()).unwrap()
    }

    #[test]
    fn operand_forms() {
        // const/4 v1, 0 ; if-eqz v1, +4 ; const/16 v0, 7 ; goto -4 ; return-void
        let mut body = body(&[0x0112, 0x0138, 0x0004, 0x0013, 0x0007, 0xfc28, 0x000e]);
        let text = body.render(&Identifiers::new()).unwrap();
        assert_eq!(
            text,
            ".registers 1\n.ins 0\n.outs 0\n\n\
             \x20   const/4 0x01\n\
             \x20   :goto_2\n\
             \x20   if-eqz 0x01, :cond_a\n\
             \x20   const/16 0x00, 0x0007\n\
             \x20   :cond_a\n\
             \x20   goto :goto_2\n\
             \x20   return-void\n"
        );
    }

    #[test]
    fn shared_try_start_collapses() {
        let mut ids = Identifiers::new();
        let io = ids.intern_type("Ljava/io/IOException;");
        let mut body = body(&[0x0000; 0x14]);
        let tries = body.tries_mut().unwrap();
        tries.push(TryItem::new(0x20, 0x04, [(Some(io), 0x24)]));
        tries.push(TryItem::new(0x20, 0x06, [(None, 0x26)]));

        let text = body.render(&ids).unwrap();
        assert_eq!(text.matches(":try_start_20").count(), 3);
        assert_eq!(text.matches("\n    :try_start_20\n").count(), 1);
        assert!(text.contains(
            "    :try_end_24\n    .catch Ljava/io/IOException; {:try_start_20 .. :try_end_24} :catch_24\n    :catch_24\n\n    nop\n"
        ));
        assert!(text.contains(
            "    :try_end_26\n    .catchall {:try_start_20 .. :try_end_26} :catchall_26\n    :catchall_26\n\n    nop\n"
        ));
    }

    #[test]
    fn payload_blocks() {
        // packed-switch v0, +4 ; return-void ; payload { first key -1, case +3 }
        let mut body = body(&[
            0x002b, 0x0004, 0x0000, 0x000e, 0x0100, 0x0001, 0xffff, 0xffff, 0x0003, 0x0000,
        ]);
        let text = body.render(&Identifiers::new()).unwrap();
        assert!(text.contains("    packed-switch 0x00, :pswitch_data_8\n"));
        assert!(text.contains("    :pswitch_6\n    return-void\n"));
        assert!(text.contains(
            "    :pswitch_data_8\n    .packed-switch -0x1\n        :pswitch_6\n    .end packed-switch\n"
        ));
    }

    #[test]
    fn signed_hex_forms() {
        assert_eq!(signed_hex(0), "0x0");
        assert_eq!(signed_hex(-16), "-0x10");
        assert_eq!(signed_hex(i64::from(i32::MIN)), "-0x80000000");
    }
}
