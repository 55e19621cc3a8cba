//! The ordered instruction list of a method.
//!
//! [`InstructionSequence`] owns the instructions, assigns their byte addresses and keeps the
//! lazily built cache of extra lines (labels, debug rows, branch destinations) attached to
//! them. Structural edits only mark the layout dirty; the next [`InstructionSequence::layout`]
//! assigns fresh addresses and [`InstructionSequence::update_label_addresses`] writes them back
//! through every attached line, which moves try ranges, handlers, debug rows and branch
//! destinations along with the instructions they were attached to.
//!
//! # Examples
//!
//! ```rust
//! use dexscope::assembly::{Instruction, InstructionSequence};
//!
//! let mut code = InstructionSequence::new();
//! code.push(Instruction::new(vec![0x0000])?); // nop
//! code.push(Instruction::new(vec![0x0513, 0x0001])?); // const/16 v5, 1
//! code.push(Instruction::new(vec![0x000e])?); // return-void
//!
//! assert_eq!(code.layout(), 8);
//! assert_eq!(code.lookup_by_address(6, 8)?, 2);
//! # Ok::<(), dexscope::Error>(())
//! ```

use std::ops::Range;

use log::{debug, trace};

use crate::{
    assembly::{extraline::ExtraLine, instruction::Instruction},
    debug::DebugProgram,
    method::{Label, LabelRole, TargetLabel, TryItemRc},
    Error, Result,
};

/// Instructions in address order with their cached extra lines.
#[derive(Debug, Default)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
    trailing_lines: Vec<ExtraLine>,
    end_address: u32,
    dirty: bool,
    lines_built: bool,
}

impl InstructionSequence {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `instructions` and lays them out.
    #[must_use]
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        let mut sequence = InstructionSequence {
            instructions,
            ..Self::default()
        };
        sequence.layout();
        sequence
    }

    /// Number of instructions, payloads included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if there are no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Iterates the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// The instructions as a slice.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Lines attached to the end of the code, past the last instruction.
    #[must_use]
    pub fn trailing_lines(&self) -> &[ExtraLine] {
        &self.trailing_lines
    }

    /// Returns `true` if an edit happened since the last layout.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns `true` while the extra-line cache is populated.
    #[must_use]
    pub fn lines_built(&self) -> bool {
        self.lines_built
    }

    /// Byte address one past the last instruction, as of the last layout.
    #[must_use]
    pub fn end_address(&self) -> u32 {
        self.end_address
    }

    /// Assigns every instruction its byte address and returns the end address.
    ///
    /// Addresses only depend on the instruction sizes, so calling this repeatedly yields the
    /// same result.
    pub fn layout(&mut self) -> u32 {
        let mut address = 0u32;
        for instruction in &mut self.instructions {
            instruction.address = address;
            address = address.saturating_add(instruction.byte_size());
        }

        self.end_address = address;
        self.dirty = false;
        address
    }

    /// Index of the instruction starting exactly at `address`, searching `[0, scope_end)`.
    ///
    /// # Errors
    /// Returns [`Error::AddressNotFound`] if no instruction starts there and
    /// [`Error::InvalidOperation`] if the layout is stale.
    pub fn lookup_by_address(&self, address: u32, scope_end: u32) -> Result<usize> {
        if self.dirty {
            return Err(invalid_operation_error!(
                "Address lookup on a sequence that needs a layout"
            ));
        }
        if address >= scope_end {
            return Err(Error::AddressNotFound(address));
        }

        self.instructions
            .binary_search_by_key(&address, Instruction::address)
            .map_err(|_| Error::AddressNotFound(address))
    }

    /// Index range of the instructions covering `[start, start + length)`.
    ///
    /// Both ends have to be instruction boundaries; the end may also be the end of the code.
    ///
    /// # Errors
    /// Returns [`Error::AddressNotFound`] for a boundary miss and [`Error::InvalidOperation`]
    /// if the layout is stale.
    pub fn iter_by_address(&self, start: u32, length: u32) -> Result<Range<usize>> {
        let first = self.lookup_by_address(start, self.end_address)?;
        let end = start
            .checked_add(length)
            .ok_or(Error::AddressNotFound(u32::MAX))?;
        let last = if end == self.end_address {
            self.instructions.len()
        } else {
            self.lookup_by_address(end, self.end_address)?
        };
        Ok(first..last)
    }

    /// Inserts `instruction` before the one at `index`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperation`] if `index` is past the end.
    pub fn insert(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        if index > self.instructions.len() {
            return Err(invalid_operation_error!(
                "Cannot insert at {} into {} instructions",
                index,
                self.instructions.len()
            ));
        }

        self.instructions.insert(index, instruction);
        self.dirty = true;
        Ok(())
    }

    /// Inserts `instruction` after the one at `index`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperation`] if there is no instruction at `index`.
    pub fn insert_after(&mut self, index: usize, instruction: Instruction) -> Result<()> {
        self.check_index(index)?;
        self.insert(index + 1, instruction)
    }

    /// Appends `instruction`.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.dirty = true;
    }

    /// Swaps in `instruction` for the one at `index` and returns the old one. The extra lines
    /// move to the new instruction.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperation`] if there is no instruction at `index`.
    pub fn replace(&mut self, index: usize, mut instruction: Instruction) -> Result<Instruction> {
        self.check_index(index)?;

        let current = &mut self.instructions[index];
        instruction.extra_lines = current.take_extra_lines();
        self.dirty |= instruction.size() != current.size();
        instruction.address = current.address;
        Ok(std::mem::replace(current, instruction))
    }

    /// Removes and returns the instruction at `index`. Its extra lines move to the following
    /// instruction, or to the end of the code if it was the last one.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOperation`] if there is no instruction at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Instruction> {
        self.check_index(index)?;

        let mut removed = self.instructions.remove(index);
        let lines = removed.take_extra_lines();
        match self.instructions.get_mut(index) {
            Some(next) => {
                let mut moved = lines;
                moved.append(&mut next.extra_lines);
                next.extra_lines = moved;
            }
            None => {
                let mut moved = lines;
                moved.append(&mut self.trailing_lines);
                self.trailing_lines = moved;
            }
        }

        self.dirty = true;
        Ok(removed)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.instructions.len() {
            return Err(invalid_operation_error!(
                "No instruction at {} in {} instructions",
                index,
                self.instructions.len()
            ));
        }
        Ok(())
    }

    /// Drops the extra-line cache.
    pub fn clear_extra_lines(&mut self) {
        for instruction in &mut self.instructions {
            instruction.extra_lines.clear();
        }
        self.trailing_lines.clear();
        self.lines_built = false;
    }

    /// Rebuilds the extra-line cache from the try table, the debug rows and the branch targets.
    ///
    /// Every line attaches to the instruction starting at its current address, or to the end of
    /// the code if it points there.
    ///
    /// # Errors
    /// Returns [`Error::AddressNotFound`] if a line points between instructions or past the end.
    pub fn build_extra_lines(
        &mut self,
        tries: &[TryItemRc],
        debug: Option<&DebugProgram>,
    ) -> Result<()> {
        self.clear_extra_lines();
        self.layout();

        let mut lines = Vec::new();
        for item in tries {
            for handler in item.handlers() {
                for label in Label::all(handler) {
                    lines.push((label.address(), ExtraLine::Label(label)));
                }
            }
        }

        if let Some(program) = debug {
            for (index, row) in program.rows().iter().enumerate() {
                lines.push((row.address(), ExtraLine::Debug(index)));
            }
        }

        for instruction in &self.instructions {
            let Some(kind) = instruction.target_kind() else {
                continue;
            };
            for target in &instruction.targets {
                let label = TargetLabel::new(kind, target.clone());
                lines.push((label.address(), ExtraLine::Target(label)));
            }
        }

        let count = lines.len();
        for (address, line) in lines {
            self.attach(address, line)?;
        }

        self.lines_built = true;
        debug!(
            "Attached {} extra lines to {} instructions",
            count,
            self.instructions.len()
        );
        Ok(())
    }

    fn attach(&mut self, address: u32, line: ExtraLine) -> Result<()> {
        if address == self.end_address {
            self.trailing_lines.push(line);
            return Ok(());
        }

        let index = self.lookup_by_address(address, self.end_address)?;
        self.instructions[index].extra_lines.push(line);
        Ok(())
    }

    /// Lays out the code and writes each instruction's address through the lines attached to
    /// it.
    ///
    /// Try start labels are written first. Every other line is then compared against its
    /// instruction in code order, after those writes, since moving a try start also moves the
    /// end derived from it.
    ///
    /// # Errors
    /// Returns [`Error::ValueRange`] if a try end would end up before its start.
    pub fn update_label_addresses(&mut self, mut debug: Option<&mut DebugProgram>) -> Result<()> {
        self.layout();

        let (starts, rest): (Vec<_>, Vec<_>) = self
            .instructions
            .iter()
            .flat_map(|instruction| {
                instruction
                    .extra_lines
                    .iter()
                    .map(move |line| (line.clone(), instruction.address))
            })
            .chain(
                self.trailing_lines
                    .iter()
                    .map(|line| (line.clone(), self.end_address)),
            )
            .partition(|(line, _)| {
                matches!(line, ExtraLine::Label(label) if label.role == LabelRole::TryStart)
            });

        let mut moved = 0;
        for (line, address) in starts.iter().chain(&rest) {
            if line.target_address(debug.as_deref()) != *address {
                trace!("Moving {:?} line to 0x{:x}", line.sort_order(), address);
                line.set_target_address(*address, debug.as_deref_mut())?;
                moved += 1;
            }
        }

        if moved != 0 {
            debug!("Relocated {} extra lines", moved);
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a InstructionSequence {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
