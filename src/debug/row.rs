//! A single entry of the debug line program.
//!
//! Each row is one opcode of the delta-encoded state machine. Besides its operands a row caches
//! the absolute `(address, line)` the machine is in after executing it. The cache is filled by
//! the forward pass ([`DebugRow::cache_values`]) and, after code edits moved the row,
//! written back into the operands by the reverse pass ([`DebugRow::update_values`]).
//!
//! # Encoding
//!
//! The first byte of a row selects its kind:
//!
//! | byte | kind | operands |
//! |------|------|----------|
//! | 1 | [`DebugKind::AdvancePc`] | ULEB128 code units |
//! | 2 | [`DebugKind::AdvanceLine`] | SLEB128 lines |
//! | 3 | [`DebugKind::StartLocal`] | ULEB128 register, ULEB128p1 name, type, signature |
//! | 4 | [`DebugKind::EndLocal`] | ULEB128 register |
//! | 5 | [`DebugKind::RestartLocal`] | ULEB128 register |
//! | 6 | [`DebugKind::PrologueEnd`] | - |
//! | 7 | [`DebugKind::EpilogueBegin`] | - |
//! | 8 | [`DebugKind::SetSourceFile`] | ULEB128p1 string |
//! | 9..=254 | [`DebugKind::Advance`] | - |
//!
//! Byte `0` ends the program and is never stored as a row. An advance row packs both an
//! address and a line delta into the packed offset `byte - 9`:
//!
//! ```text
//! offset = (line_diff - LINE_BASE) + LINE_RANGE * address_diff_in_code_units
//! ```

use strum::{Display, EnumIter};

use crate::{
    identifiers::{display_string, display_type, IdentifierStore},
    Result,
};

/// Smallest line delta an advance row can encode.
pub const LINE_BASE: i32 = -4;
/// Number of distinct line deltas an advance row can encode.
pub const LINE_RANGE: i32 = 15;
/// First byte value of an advance row.
pub const FIRST_ADVANCE: u8 = 9;
/// Largest legal packed offset.
pub const MAX_PACKED_OFFSET: i32 = 245;

/// The kind of a debug row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u8)]
pub enum DebugKind {
    /// Terminates the program. Implicit, never stored as a row.
    EndSequence = 0,
    /// Advances the address without emitting a position.
    AdvancePc = 1,
    /// Advances the line without emitting a position.
    AdvanceLine = 2,
    /// Introduces a local variable in a register.
    StartLocal = 3,
    /// Marks a local variable as out of scope.
    EndLocal = 4,
    /// Re-introduces a previously ended local variable.
    RestartLocal = 5,
    /// Marks the end of the method prologue.
    PrologueEnd = 6,
    /// Marks the start of the method epilogue.
    EpilogueBegin = 7,
    /// Changes the source file name.
    SetSourceFile = 8,
    /// Packed address and line advance that emits a position.
    Advance = 9,
}

impl DebugKind {
    /// Maps a raw kind selector to its kind, clamping every value from 9 upwards to
    /// [`DebugKind::Advance`].
    #[must_use]
    pub fn from_raw(raw: u8) -> DebugKind {
        match raw {
            0 => DebugKind::EndSequence,
            1 => DebugKind::AdvancePc,
            2 => DebugKind::AdvanceLine,
            3 => DebugKind::StartLocal,
            4 => DebugKind::EndLocal,
            5 => DebugKind::RestartLocal,
            6 => DebugKind::PrologueEnd,
            7 => DebugKind::EpilogueBegin,
            8 => DebugKind::SetSourceFile,
            _ => DebugKind::Advance,
        }
    }

    fn default_operands(self) -> DebugOperands {
        match self {
            DebugKind::AdvancePc => DebugOperands::AdvancePc { address_diff: 0 },
            DebugKind::AdvanceLine => DebugOperands::AdvanceLine { line_diff: 0 },
            DebugKind::StartLocal => DebugOperands::StartLocal {
                register: 0,
                name: None,
                type_ref: None,
                signature: None,
            },
            DebugKind::EndLocal | DebugKind::RestartLocal => DebugOperands::Register(0),
            DebugKind::SetSourceFile => DebugOperands::SourceFile(None),
            _ => DebugOperands::None,
        }
    }
}

/// Kind-specific operands of a debug row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOperands {
    /// No operands
    None,
    /// Address delta in bytes (stored as code units)
    AdvancePc {
        /// Address delta in bytes
        address_diff: u32,
    },
    /// Line delta
    AdvanceLine {
        /// Signed line delta
        line_diff: i32,
    },
    /// A local variable declaration
    StartLocal {
        /// Register holding the local
        register: u32,
        /// String key of the name
        name: Option<u32>,
        /// Type key of the declared type
        type_ref: Option<u32>,
        /// String key of the generic signature
        signature: Option<u32>,
    },
    /// Register of an end-local or restart-local row
    Register(u32),
    /// String key of the new source file
    SourceFile(Option<u32>),
}

/// One row of a [`crate::debug::DebugProgram`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugRow {
    flag: u8,
    operands: DebugOperands,
    pub(crate) address: u32,
    pub(crate) line: u32,
    pub(crate) attached: bool,
}

impl DebugRow {
    fn with(kind: DebugKind, operands: DebugOperands) -> Self {
        DebugRow {
            flag: kind as u8,
            operands,
            address: 0,
            line: 0,
            attached: false,
        }
    }

    /// Creates an advance row for the given byte address delta and line delta.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if the deltas cannot be packed.
    pub fn special(address_diff: u32, line_diff: i32) -> Result<Self> {
        let mut row = Self::with(DebugKind::Advance, DebugOperands::None);
        row.store_diffs(i64::from(address_diff), i64::from(line_diff))?;
        Ok(row)
    }

    /// Creates an address advance row. `address_diff` is in bytes and must be even.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for an odd delta.
    pub fn advance_pc(address_diff: u32) -> Result<Self> {
        let mut row = Self::with(DebugKind::AdvancePc, DebugKind::AdvancePc.default_operands());
        row.store_diffs(i64::from(address_diff), 0)?;
        Ok(row)
    }

    /// Creates a line advance row.
    #[must_use]
    pub fn advance_line(line_diff: i32) -> Self {
        Self::with(DebugKind::AdvanceLine, DebugOperands::AdvanceLine { line_diff })
    }

    /// Creates a local variable declaration.
    #[must_use]
    pub fn start_local(
        register: u32,
        name: Option<u32>,
        type_ref: Option<u32>,
        signature: Option<u32>,
    ) -> Self {
        Self::with(
            DebugKind::StartLocal,
            DebugOperands::StartLocal {
                register,
                name,
                type_ref,
                signature,
            },
        )
    }

    /// Ends the local in `register`.
    #[must_use]
    pub fn end_local(register: u32) -> Self {
        Self::with(DebugKind::EndLocal, DebugOperands::Register(register))
    }

    /// Restarts the local in `register`.
    #[must_use]
    pub fn restart_local(register: u32) -> Self {
        Self::with(DebugKind::RestartLocal, DebugOperands::Register(register))
    }

    /// Marks the end of the prologue.
    #[must_use]
    pub fn prologue_end() -> Self {
        Self::with(DebugKind::PrologueEnd, DebugOperands::None)
    }

    /// Marks the start of the epilogue.
    #[must_use]
    pub fn epilogue_begin() -> Self {
        Self::with(DebugKind::EpilogueBegin, DebugOperands::None)
    }

    /// Switches the source file.
    #[must_use]
    pub fn set_source_file(name: Option<u32>) -> Self {
        Self::with(DebugKind::SetSourceFile, DebugOperands::SourceFile(name))
    }

    /// Creates a row from its raw first byte and operands, as read from the binary form.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for `255` (a packed offset of 246) and
    /// [`crate::Error::InvalidOperation`] for `0` or operands that do not match the kind.
    pub fn from_raw(flag: u8, operands: DebugOperands) -> Result<Self> {
        if flag == 0 {
            return Err(invalid_operation_error!("END_SEQUENCE is not stored as a row"));
        }
        if i32::from(flag) - i32::from(FIRST_ADVANCE) > MAX_PACKED_OFFSET {
            return Err(value_range_error!(
                "packed offset",
                i32::from(flag) - i32::from(FIRST_ADVANCE),
                0,
                MAX_PACKED_OFFSET
            ));
        }

        let kind = DebugKind::from_raw(flag);
        if std::mem::discriminant(&kind.default_operands()) != std::mem::discriminant(&operands) {
            return Err(invalid_operation_error!(
                "Operands {:?} do not belong to a {} row",
                operands,
                kind
            ));
        }

        Ok(DebugRow {
            flag,
            ..Self::with(kind, operands)
        })
    }

    /// Raw first byte of the row.
    #[must_use]
    pub fn flag(&self) -> u8 {
        self.flag
    }

    /// Kind of the row.
    #[must_use]
    pub fn kind(&self) -> DebugKind {
        DebugKind::from_raw(self.flag)
    }

    /// Changes the kind selector.
    ///
    /// Switching to [`DebugKind::Advance`] keeps the packed offset of an advance row (zero
    /// otherwise). Operands are reset to the new kind's zero values.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for a kind above 9 or
    /// [`crate::Error::InvalidOperation`] for 0; the row is not modified.
    pub fn set_kind(&mut self, kind: u8) -> Result<()> {
        if kind > FIRST_ADVANCE {
            return Err(value_range_error!("debug row kind", kind, 1u8, FIRST_ADVANCE));
        }
        if kind == 0 {
            return Err(invalid_operation_error!("END_SEQUENCE is not stored as a row"));
        }

        let new_kind = DebugKind::from_raw(kind);
        if new_kind != self.kind() {
            self.operands = new_kind.default_operands();
            self.flag = kind;
        }
        Ok(())
    }

    /// Kind-specific operands.
    #[must_use]
    pub fn operands(&self) -> &DebugOperands {
        &self.operands
    }

    /// Replaces the operands of a non-advance row.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if the operands belong to another kind.
    pub fn set_operands(&mut self, operands: DebugOperands) -> Result<()> {
        if std::mem::discriminant(&self.kind().default_operands())
            != std::mem::discriminant(&operands)
        {
            return Err(invalid_operation_error!(
                "Operands {:?} do not belong to a {} row",
                operands,
                self.kind()
            ));
        }
        self.operands = operands;
        Ok(())
    }

    /// Packed offset of an advance row; 0 for every other kind.
    #[must_use]
    pub fn packed_offset(&self) -> i32 {
        if self.flag >= FIRST_ADVANCE {
            i32::from(self.flag - FIRST_ADVANCE)
        } else {
            0
        }
    }

    /// Sets the packed offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for an offset outside `[0, 245]` and
    /// [`crate::Error::InvalidOperation`] for a non-zero offset on a row that is not an advance
    /// row. The row is not modified on error.
    pub fn set_packed_offset(&mut self, offset: i32) -> Result<()> {
        if !(0..=MAX_PACKED_OFFSET).contains(&offset) {
            return Err(value_range_error!(
                "packed offset",
                offset,
                0,
                MAX_PACKED_OFFSET
            ));
        }

        if self.flag < FIRST_ADVANCE {
            if offset == 0 {
                return Ok(());
            }
            return Err(invalid_operation_error!(
                "A {} row has no packed offset",
                self.kind()
            ));
        }

        self.flag = FIRST_ADVANCE + offset as u8;
        Ok(())
    }

    /// Address delta in bytes this row applies.
    #[must_use]
    pub fn address_diff(&self) -> u32 {
        match (&self.operands, self.kind()) {
            (_, DebugKind::Advance) => (self.packed_offset() / LINE_RANGE) as u32 * 2,
            (DebugOperands::AdvancePc { address_diff }, _) => *address_diff,
            _ => 0,
        }
    }

    /// Line delta this row applies.
    #[must_use]
    pub fn line_diff(&self) -> i32 {
        match (&self.operands, self.kind()) {
            (_, DebugKind::Advance) => self.packed_offset() % LINE_RANGE + LINE_BASE,
            (DebugOperands::AdvanceLine { line_diff }, _) => *line_diff,
            _ => 0,
        }
    }

    /// Cached absolute address in bytes.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Cached absolute line.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns `true` while the row belongs to a program.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns `true` if a row of `kind` can represent the given deltas.
    #[must_use]
    pub fn can_store(kind: DebugKind, address_diff: i64, line_diff: i64) -> bool {
        if address_diff < 0 || address_diff % 2 != 0 {
            return false;
        }
        let units = address_diff / 2;

        match kind {
            DebugKind::Advance => {
                (i64::from(LINE_BASE)..i64::from(LINE_BASE + LINE_RANGE)).contains(&line_diff)
                    && line_diff - i64::from(LINE_BASE) + i64::from(LINE_RANGE) * units
                        <= i64::from(MAX_PACKED_OFFSET)
            }
            DebugKind::AdvancePc => line_diff == 0 && units <= i64::from(u32::MAX / 2),
            DebugKind::AdvanceLine => {
                address_diff == 0 && i32::try_from(line_diff).is_ok()
            }
            _ => address_diff == 0 && line_diff == 0,
        }
    }

    /// Rewrites the operands so the row applies exactly the given deltas.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if the row's kind cannot represent them; the row is
    /// not modified.
    pub fn store_diffs(&mut self, address_diff: i64, line_diff: i64) -> Result<()> {
        let kind = self.kind();
        if !Self::can_store(kind, address_diff, line_diff) {
            return Err(Self::range_error(kind, address_diff, line_diff));
        }

        match kind {
            DebugKind::Advance => {
                let offset = (line_diff - i64::from(LINE_BASE))
                    + i64::from(LINE_RANGE) * (address_diff / 2);
                self.flag = FIRST_ADVANCE + offset as u8;
            }
            DebugKind::AdvancePc => {
                self.operands = DebugOperands::AdvancePc {
                    address_diff: address_diff as u32,
                };
            }
            DebugKind::AdvanceLine => {
                self.operands = DebugOperands::AdvanceLine {
                    line_diff: line_diff as i32,
                };
            }
            _ => {}
        }
        Ok(())
    }

    fn range_error(kind: DebugKind, address_diff: i64, line_diff: i64) -> crate::Error {
        if address_diff < 0 || address_diff % 2 != 0 {
            return value_range_error!("debug address advance", address_diff, 0, u32::MAX - 1);
        }

        match kind {
            DebugKind::Advance => {
                if (i64::from(LINE_BASE)..i64::from(LINE_BASE + LINE_RANGE)).contains(&line_diff) {
                    let offset = line_diff - i64::from(LINE_BASE)
                        + i64::from(LINE_RANGE) * (address_diff / 2);
                    value_range_error!("packed offset", offset, 0, MAX_PACKED_OFFSET)
                } else {
                    value_range_error!(
                        "packed line advance",
                        line_diff,
                        LINE_BASE,
                        LINE_BASE + LINE_RANGE - 1
                    )
                }
            }
            DebugKind::AdvancePc if line_diff != 0 => {
                value_range_error!("debug line advance", line_diff, 0, 0)
            }
            DebugKind::AdvancePc => {
                value_range_error!("debug address advance", address_diff, 0, u32::MAX - 1)
            }
            DebugKind::AdvanceLine if address_diff != 0 => {
                value_range_error!("debug address advance", address_diff, 0, 0)
            }
            DebugKind::AdvanceLine => {
                value_range_error!("debug line advance", line_diff, i32::MIN, i32::MAX)
            }
            _ if address_diff != 0 => value_range_error!("debug address advance", address_diff, 0, 0),
            _ => value_range_error!("debug line advance", line_diff, 0, 0),
        }
    }

    /// Forward pass: computes the cached position from the predecessor's position and this
    /// row's deltas. Without a predecessor the machine starts at `(0, line_start)`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if the line would drop below 0 or either position
    /// overflows `u32`; the row is not modified.
    pub fn cache_values(&mut self, previous: Option<&DebugRow>, line_start: u32) -> Result<()> {
        let (address, line) = previous.map_or((0, line_start), |row| (row.address, row.line));
        let next_address = address.checked_add(self.address_diff()).ok_or_else(|| {
            value_range_error!(
                "debug address",
                i64::from(address) + i64::from(self.address_diff()),
                0,
                u32::MAX
            )
        })?;
        let next_line = line.checked_add_signed(self.line_diff()).ok_or_else(|| {
            value_range_error!(
                "debug line",
                i64::from(line) + i64::from(self.line_diff()),
                0,
                u32::MAX
            )
        })?;

        self.address = next_address;
        self.line = next_line;
        Ok(())
    }

    /// Reverse pass: recomputes this row's deltas from its cached position and the
    /// predecessor's. Nothing happens when the predecessor is detached.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if the deltas cannot be stored in this kind of row;
    /// the row is not modified.
    pub fn update_values(&mut self, previous: Option<&DebugRow>, line_start: u32) -> Result<()> {
        if previous.is_some_and(|row| !row.attached) {
            return Ok(());
        }

        let (address, line) = previous.map_or((0, line_start), |row| (row.address, row.line));
        self.store_diffs(
            i64::from(self.address) - i64::from(address),
            i64::from(self.line) - i64::from(line),
        )
    }

    /// Text directive for this row, or `None` for rows without a text form.
    #[must_use]
    pub fn directive(&self, ids: &dyn IdentifierStore) -> Option<String> {
        match (&self.operands, self.kind()) {
            (_, DebugKind::Advance) => Some(format!(".line {}", self.line)),
            (
                DebugOperands::StartLocal {
                    register,
                    name,
                    type_ref,
                    signature,
                },
                _,
            ) => {
                let mut text = format!(".local v{register}, {}", display_string(ids, *name));
                if type_ref.is_some() {
                    text.push(':');
                    text.push_str(&display_type(ids, *type_ref));
                }
                if signature.is_some() {
                    text.push_str(", ");
                    text.push_str(&display_string(ids, *signature));
                }
                Some(text)
            }
            (DebugOperands::Register(register), DebugKind::EndLocal) => {
                Some(format!(".end local v{register}"))
            }
            (DebugOperands::Register(register), _) => Some(format!(".restart local v{register}")),
            (DebugOperands::SourceFile(name), _) => {
                Some(format!(".source {}", display_string(ids, *name)))
            }
            (_, DebugKind::PrologueEnd) => Some(".prologue".to_string()),
            (_, DebugKind::EpilogueBegin) => Some(".epilogue".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identifiers::Identifiers, Error};

    #[test]
    fn packed_offset_bounds() {
        let mut row = DebugRow::special(2, 1).unwrap();
        let before = row.clone();

        for offset in [-1, 246, i32::MIN, i32::MAX, 1000] {
            assert!(matches!(
                row.set_packed_offset(offset),
                Err(Error::ValueRange { min: 0, max: 245, .. })
            ));
            assert_eq!(row, before);
        }

        row.set_packed_offset(245).unwrap();
        assert_eq!(row.flag(), 254);
        assert_eq!(row.kind(), DebugKind::Advance);
    }

    #[test]
    fn packed_offset_on_fixed_kinds() {
        let mut row = DebugRow::prologue_end();
        row.set_packed_offset(0).unwrap();
        assert_eq!(row.flag(), 6);
        assert!(matches!(
            row.set_packed_offset(3),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            row.set_packed_offset(-1),
            Err(Error::ValueRange { .. })
        ));
    }

    #[test]
    fn special_packing() {
        let row = DebugRow::special(4, 1).unwrap();
        assert_eq!(row.packed_offset(), (1 + 4) + 15 * 2);
        assert_eq!(row.address_diff(), 4);
        assert_eq!(row.line_diff(), 1);

        let row = DebugRow::special(0, -4).unwrap();
        assert_eq!(row.flag(), 9);

        assert!(DebugRow::special(0, 11).is_err());
        assert!(DebugRow::special(3, 0).is_err());
        assert!(DebugRow::special(34, 0).is_err());
        assert!(DebugRow::special(32, 0).is_ok());
    }

    #[test]
    fn kind_clamps_and_rejects() {
        assert_eq!(DebugKind::from_raw(200), DebugKind::Advance);
        assert!(DebugRow::from_raw(255, DebugOperands::None).is_err());
        assert!(DebugRow::from_raw(254, DebugOperands::None).is_ok());
        assert!(DebugRow::from_raw(4, DebugOperands::None).is_err());

        let mut row = DebugRow::end_local(2);
        assert!(matches!(row.set_kind(10), Err(Error::ValueRange { .. })));
        assert_eq!(row.kind(), DebugKind::EndLocal);
        row.set_kind(9).unwrap();
        assert_eq!(row.kind(), DebugKind::Advance);
        assert_eq!(row.packed_offset(), 0);
    }

    #[test]
    fn forward_and_reverse_pass() {
        let mut first = DebugRow::special(4, 1).unwrap();
        first.attached = true;
        first.cache_values(None, 10).unwrap();
        assert_eq!((first.address(), first.line()), (4, 11));

        let mut second = DebugRow::special(0, 2).unwrap();
        second.cache_values(Some(&first), 10).unwrap();
        assert_eq!((second.address(), second.line()), (4, 13));

        second.address = 8;
        second.update_values(Some(&first), 10).unwrap();
        assert_eq!((second.address_diff(), second.line_diff()), (4, 2));

        second.line = 100;
        let before = second.clone();
        assert!(second.update_values(Some(&first), 10).is_err());
        assert_eq!(second, before);

        first.attached = false;
        second.update_values(Some(&first), 10).unwrap();
        assert_eq!(second, before);
    }

    #[test]
    fn line_below_zero_is_rejected() {
        let mut row = DebugRow::advance_line(-5);
        let before = row.clone();
        assert!(matches!(
            row.cache_values(None, 1),
            Err(Error::ValueRange { value: -4, .. })
        ));
        assert_eq!(row, before);
        assert_eq!(row.line_diff(), -5);

        row.cache_values(None, 5).unwrap();
        assert_eq!(row.line(), 0);
    }

    #[test]
    fn directives() {
        let mut ids = Identifiers::new();
        let name = ids.intern_string("count");
        let ty = ids.intern_type("I");

        let local = DebugRow::start_local(1, Some(name), Some(ty), None);
        assert_eq!(local.directive(&ids).unwrap(), r#".local v1, "count":I"#);
        assert_eq!(
            DebugRow::start_local(0, None, Some(5), Some(9)).directive(&ids).unwrap(),
            ".local v0, null:type@5, string@9"
        );
        assert_eq!(DebugRow::end_local(3).directive(&ids).unwrap(), ".end local v3");
        assert_eq!(DebugRow::set_source_file(None).directive(&ids).unwrap(), ".source null");
        assert!(DebugRow::advance_line(3).directive(&ids).is_none());
        assert!(DebugRow::advance_pc(8).unwrap().directive(&ids).is_none());
    }
}
