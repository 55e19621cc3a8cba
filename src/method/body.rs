//! The method body facade.
//!
//! [`MethodBody`] bundles the instruction sequence, the try table and the debug program of one
//! method and keeps them consistent across edits. Edits go through the body so that the
//! extra-line cache is in place before the first instruction moves; [`MethodBody::refresh`]
//! then writes the new layout back into try items, handlers, debug rows and branch targets.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::{assembly::Instruction, method::{BodyConfig, MethodBody}};
//!
//! // registers 1, ins 0, outs 0, no tries; nop ; return-void
//! let data = [
//!     1, 0, 0, 0, 0, 0, 0, 0, // registers, ins, outs, tries
//!     0, 0, 0, 0, // debug_info_off
//!     2, 0, 0, 0, // insns_size
//!     0x00, 0x00, 0x0e, 0x00,
//! ];
//! let mut body = MethodBody::from(&data, None, BodyConfig::default())?;
//! body.insert(0, Instruction::new(vec![0x0000])?)?;
//!
//! let encoded = body.encode()?;
//! assert_eq!(&encoded[12..16], &[3, 0, 0, 0]);
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::fmt;

use log::debug;

use crate::{
    assembly::{decode_instructions, encode_instructions, Instruction, InstructionSequence},
    debug::{DebugKind, DebugProgram, DebugRow},
    file::{io::write_le, parser::Parser},
    identifiers::IdentifierStore,
    method::{
        exceptions::{read_tries, write_tries},
        BodyConfig, TryItemRc,
    },
    smali::{read_method, SmaliWriter},
    Result,
};

/// One method's code, try table and debug program.
#[derive(Debug)]
pub struct MethodBody {
    /// Number of registers used by the method
    pub registers: u16,
    /// Number of words of incoming arguments
    pub ins: u16,
    /// Number of words of outgoing argument space for invocations
    pub outs: u16,
    /// Offset of the debug info item in the enclosing file, preserved as read
    pub debug_info_off: u32,
    code: InstructionSequence,
    tries: Vec<TryItemRc>,
    debug: Option<DebugProgram>,
    config: BodyConfig,
}

impl MethodBody {
    /// Creates an empty body.
    #[must_use]
    pub fn new(registers: u16, ins: u16, outs: u16, config: BodyConfig) -> Self {
        MethodBody {
            registers,
            ins,
            outs,
            debug_info_off: 0,
            code: InstructionSequence::new(),
            tries: Vec::new(),
            debug: None,
            config,
        }
    }

    pub(crate) fn from_parts(
        header: (u16, u16, u16),
        code: InstructionSequence,
        tries: Vec<TryItemRc>,
        debug: Option<DebugProgram>,
        config: BodyConfig,
    ) -> Self {
        let (registers, ins, outs) = header;
        MethodBody {
            registers,
            ins,
            outs,
            debug_info_off: 0,
            code,
            tries,
            debug,
            config,
        }
    }

    /// Decodes a `code_item` and, if given, its `debug_info_item`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for truncated input, [`crate::Error::Malformed`]
    /// for structural damage, [`crate::Error::ValueRange`] for an advance byte of 255 and, with
    /// `verify_try_ranges`, [`crate::Error::AddressNotFound`] for try or catch addresses that
    /// are not instruction boundaries.
    pub fn from(data: &[u8], debug_info: Option<&[u8]>, config: BodyConfig) -> Result<Self> {
        let mut parser = Parser::new(data);
        let registers = parser.read_le::<u16>()?;
        let ins = parser.read_le::<u16>()?;
        let outs = parser.read_le::<u16>()?;
        let tries_size = parser.read_le::<u16>()?;
        let debug_info_off = parser.read_le::<u32>()?;
        let insns_size = parser.read_le::<u32>()? as usize;

        if insns_size > parser.remaining() / 2 {
            return Err(out_of_bounds_error!());
        }
        let mut units = Vec::with_capacity(insns_size);
        for _ in 0..insns_size {
            units.push(parser.read_le::<u16>()?);
        }

        let code = InstructionSequence::from_instructions(decode_instructions(&units, &config)?);

        if tries_size != 0 && insns_size % 2 != 0 {
            parser.read_le::<u16>()?;
        }
        let tries = read_tries(&mut parser, tries_size)?;

        if config.verify_try_ranges {
            for item in &tries {
                code.iter_by_address(item.start_address(), item.try_length())?;
                for handler in item.handlers() {
                    code.lookup_by_address(handler.catch_address(), code.end_address())?;
                }
            }
        }

        let debug = debug_info
            .map(|data| DebugProgram::from(data, &config))
            .transpose()?;

        debug!(
            "Decoded method body: {} registers, {} instructions, {} tries, {} debug rows",
            registers,
            code.len(),
            tries.len(),
            debug.as_ref().map_or(0, DebugProgram::len)
        );

        Ok(MethodBody {
            registers,
            ins,
            outs,
            debug_info_off,
            code,
            tries,
            debug,
            config,
        })
    }

    /// Encodes the `code_item`, applying pending edits first.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for branch offsets or try ranges that do not fit
    /// their fields and [`crate::Error::InvalidOperation`] for try items that cannot be encoded.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        self.refresh()?;

        let units = encode_instructions(self.code.instructions())?;
        let tries_size = u16::try_from(self.tries.len()).map_err(|_| {
            value_range_error!("try item count", self.tries.len() as u32, 0u16, u16::MAX)
        })?;
        let insns_size = u32::try_from(units.len()).map_err(|_| {
            value_range_error!(
                "code unit count",
                i64::try_from(units.len()).unwrap_or(i64::MAX),
                0u32,
                u32::MAX
            )
        })?;

        let mut buffer = Vec::with_capacity(16 + units.len() * 2);
        write_le(&mut buffer, self.registers);
        write_le(&mut buffer, self.ins);
        write_le(&mut buffer, self.outs);
        write_le(&mut buffer, tries_size);
        write_le(&mut buffer, self.debug_info_off);
        write_le(&mut buffer, insns_size);
        for unit in &units {
            write_le(&mut buffer, *unit);
        }

        if tries_size != 0 && units.len() % 2 != 0 {
            write_le(&mut buffer, 0u16);
        }
        write_tries(&mut buffer, &self.tries)?;

        debug!(
            "Encoded method body: {} code units, {} bytes",
            units.len(),
            buffer.len()
        );
        Ok(buffer)
    }

    /// Encodes the `debug_info_item`, applying pending edits first. `None` without debug info.
    ///
    /// # Errors
    /// Errors of [`MethodBody::refresh`] and [`DebugProgram::encode`].
    pub fn encode_debug_info(&mut self) -> Result<Option<Vec<u8>>> {
        self.refresh()?;
        self.debug.as_ref().map(DebugProgram::encode).transpose()
    }

    /// Applies pending edits: lays out the code, moves every attached label, debug row and
    /// branch destination to its instruction's new address, re-encodes the debug deltas and
    /// drops the extra-line cache.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if a try end ends up before its start or, without
    /// `normalize_debug`, if a debug row cannot hold its new deltas.
    pub fn refresh(&mut self) -> Result<()> {
        if !self.code.lines_built() {
            self.code.layout();
            return Ok(());
        }

        self.code.update_label_addresses(self.debug.as_mut())?;
        if let Some(program) = self.debug.as_mut() {
            if self.config.normalize_debug {
                program.update_values()?;
            } else {
                program.update_values_exact()?;
            }
        }
        self.code.clear_extra_lines();
        Ok(())
    }

    fn ensure_lines(&mut self) -> Result<()> {
        if !self.code.lines_built() {
            self.code.build_extra_lines(&self.tries, self.debug.as_ref())?;
        }
        Ok(())
    }

    /// Inserts `instruction` before the one at `index`.
    ///
    /// # Errors
    /// See [`InstructionSequence::insert`].
    pub fn insert(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        self.ensure_lines()?;
        self.code.insert(index, instruction)
    }

    /// Inserts `instruction` after the one at `index`.
    ///
    /// # Errors
    /// See [`InstructionSequence::insert_after`].
    pub fn insert_after(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        self.ensure_lines()?;
        self.code.insert_after(index, instruction)
    }

    /// Appends `instruction`.
    ///
    /// # Errors
    /// Fails if the extra-line cache cannot be built.
    pub fn push(&mut self, instruction: Instruction) -> Result<()> {
        self.ensure_lines()?;
        self.code.push(instruction);
        Ok(())
    }

    /// Replaces the instruction at `index`, moving its labels to the replacement.
    ///
    /// # Errors
    /// See [`InstructionSequence::replace`].
    pub fn replace(&mut self, index: usize, instruction: Instruction) -> Result<Instruction> {
        self.ensure_lines()?;
        self.code.replace(index, instruction)
    }

    /// Removes the instruction at `index`, moving its labels to the following instruction.
    ///
    /// # Errors
    /// See [`InstructionSequence::remove`].
    pub fn remove(&mut self, index: usize) -> Result<Instruction> {
        self.ensure_lines()?;
        self.code.remove(index)
    }

    /// Returns `true` if some try item covers the instruction at `index` and no other.
    /// Removing such an instruction leaves a try item that cannot be encoded.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if there is no instruction at `index`, and
    /// the errors of [`MethodBody::refresh`].
    pub fn is_lonely_in_try(&mut self, index: usize) -> Result<bool> {
        let (start, end) = self.span(index)?;
        Ok(self
            .tries
            .iter()
            .any(|item| item.start_address() == start && item.end_address() == end))
    }

    /// Lines of the `.line` rows positioned at the instruction at `index`, in program order.
    ///
    /// # Errors
    /// See [`MethodBody::is_lonely_in_try`].
    pub fn debug_lines(&mut self, index: usize) -> Result<Vec<u32>> {
        let (address, _) = self.span(index)?;
        Ok(self
            .debug
            .iter()
            .flat_map(DebugProgram::rows)
            .filter(|row| row.kind() == DebugKind::Advance && row.address() == address)
            .map(DebugRow::line)
            .collect())
    }

    fn span(&mut self, index: usize) -> Result<(u32, u32)> {
        self.refresh()?;
        let instruction = self.code.get(index).ok_or_else(|| {
            invalid_operation_error!("No instruction {} in a body of {}", index, self.code.len())
        })?;
        Ok((
            instruction.address(),
            instruction.address() + instruction.byte_size(),
        ))
    }

    /// The instruction sequence. Addresses reflect the last layout.
    #[must_use]
    pub fn code(&self) -> &InstructionSequence {
        &self.code
    }

    /// The try table.
    #[must_use]
    pub fn tries(&self) -> &[TryItemRc] {
        &self.tries
    }

    /// Mutable access to the try table. Pending edits are applied first.
    ///
    /// # Errors
    /// Errors of [`MethodBody::refresh`].
    pub fn tries_mut(&mut self) -> Result<&mut Vec<TryItemRc>> {
        self.refresh()?;
        Ok(&mut self.tries)
    }

    /// The debug program, if the method has one.
    #[must_use]
    pub fn debug(&self) -> Option<&DebugProgram> {
        self.debug.as_ref()
    }

    /// Mutable access to the debug program, creating an empty one starting at line 1 if the
    /// method had none. Pending edits are applied first.
    ///
    /// # Errors
    /// Errors of [`MethodBody::refresh`].
    pub fn debug_mut(&mut self) -> Result<&mut DebugProgram> {
        self.refresh()?;
        Ok(self.debug.get_or_insert_with(|| DebugProgram::new(1)))
    }

    /// Removes and returns the debug program.
    ///
    /// # Errors
    /// Errors of [`MethodBody::refresh`].
    pub fn strip_debug(&mut self) -> Result<Option<DebugProgram>> {
        self.refresh()?;
        Ok(self.debug.take())
    }

    /// The configuration the body was created with.
    #[must_use]
    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    /// Renders the body as assembly text.
    ///
    /// # Errors
    /// Fails if pending edits cannot be applied or a line points between instructions.
    pub fn render(&mut self, ids: &dyn IdentifierStore) -> Result<String> {
        let mut text = String::new();
        self.write_text(&mut text, ids)?;
        Ok(text)
    }

    /// Renders the body as assembly text into `out`.
    ///
    /// # Errors
    /// See [`MethodBody::render`]; [`crate::Error::Format`] if the sink fails.
    pub fn write_text<W: fmt::Write>(&mut self, out: W, ids: &dyn IdentifierStore) -> Result<()> {
        self.refresh()?;
        self.ensure_lines()?;
        SmaliWriter::new(out, ids, self.config.indent).write_method(self)
    }

    /// Assembles a body from text, interning names into `ids`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Parse`] with the position of the first offending token.
    pub fn parse(text: &str, ids: &mut dyn IdentifierStore, config: BodyConfig) -> Result<Self> {
        read_method(text, ids, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{debug::DebugRow, method::TryItem, Error};

    fn assert_send_sync<T: Send + Sync>() {}

    /// registers 2, no tries: const/4 v0, 0 ; if-eqz v0, +2 ; return-void
    fn simple() -> Vec<u8> {
        vec![
            2, 0, 1, 0, 0, 0, 0, 0, //
            0x10, 0, 0, 0, //
            4, 0, 0, 0, //
            0x12, 0x00, 0x38, 0x00, 0x02, 0x00, 0x0e, 0x00,
        ]
    }

    #[test]
    fn body_is_send_and_sync() {
        assert_send_sync::<MethodBody>();
    }

    #[test]
    fn decode_encode_is_identity() {
        let data = simple();
        let mut body = MethodBody::from(&data, None, BodyConfig::default()).unwrap();
        assert_eq!((body.registers, body.ins, body.outs), (2, 1, 0));
        assert_eq!(body.debug_info_off, 0x10);
        assert_eq!(body.code().len(), 3);
        assert_eq!(body.encode().unwrap(), data);
    }

    #[test]
    fn truncated_code() {
        let data = simple();
        assert!(matches!(
            MethodBody::from(&data[..20], None, BodyConfig::default()),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn edits_move_tries_and_debug_rows() {
        // nop ; nop ; return-void with a try over the second nop caught at return-void
        let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
        body.push(Instruction::new(vec![0x0000]).unwrap()).unwrap();
        body.push(Instruction::new(vec![0x0000]).unwrap()).unwrap();
        body.push(Instruction::new(vec![0x000e]).unwrap()).unwrap();
        body.refresh().unwrap();

        body.tries_mut().unwrap().push(TryItem::new(2, 2, [(None, 4)]));
        let program = body.debug_mut().unwrap();
        program.push(DebugRow::special(2, 4).unwrap()).unwrap();

        body.insert(0, Instruction::new(vec![0x0013, 0x0007]).unwrap()).unwrap();
        body.refresh().unwrap();

        let item = &body.tries()[0];
        assert_eq!((item.start_address(), item.end_address()), (6, 8));
        assert_eq!(item.handlers()[0].catch_address(), 8);
        let row = &body.debug().unwrap().rows()[0];
        assert_eq!((row.address(), row.line()), (6, 5));
        assert_eq!(row.address_diff(), 6);
    }

    #[test]
    fn odd_code_is_padded_before_tries() {
        // return-void covered by a catch-all at itself
        let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
        body.push(Instruction::new(vec![0x000e]).unwrap()).unwrap();
        body.tries_mut().unwrap().push(TryItem::new(0, 2, [(None, 0)]));

        let data = body.encode().unwrap();
        assert_eq!(data.len(), 16 + 2 + 2 + 8 + 1 + 2);
        assert_eq!(&data[18..20], &[0, 0]);

        let decoded = MethodBody::from(&data, None, BodyConfig::default()).unwrap();
        assert_eq!(decoded.tries().len(), 1);
        assert!(decoded.tries()[0].handlers()[0].is_catch_all());
    }

    #[test]
    fn unaligned_try_is_rejected() {
        // const/16 v0, 1 ; return-void, try starting inside const/16
        let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
        body.push(Instruction::new(vec![0x0013, 0x0001]).unwrap()).unwrap();
        body.push(Instruction::new(vec![0x000e]).unwrap()).unwrap();
        body.tries_mut().unwrap().push(TryItem::new(2, 4, [(None, 4)]));
        let data = body.encode().unwrap();

        assert!(matches!(
            MethodBody::from(&data, None, BodyConfig::default()),
            Err(Error::AddressNotFound(2))
        ));
        assert!(MethodBody::from(&data, None, BodyConfig::lenient()).is_ok());
    }
}
