use log::{debug, trace};

use crate::{
    debug::row::{DebugKind, DebugOperands, DebugRow, FIRST_ADVANCE},
    file::{io::write_le, parser::Parser},
    method::BodyConfig,
    utils::leb128::{write_sleb128, write_uleb128, write_uleb128p1},
    Result,
};

/// The debug line program of one method.
///
/// Rows live in a plain vector; a row's predecessor is the row before it. After any change to
/// a row's deltas the cached positions of the following rows are stale until
/// [`DebugProgram::cache_values_from`] runs, and after a change to a row's cached position its
/// deltas and those of its successor are stale until [`DebugProgram::update_values_from`] runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugProgram {
    /// Line number the state machine starts at
    pub line_start: u32,
    /// String keys of the parameter names, `None` for unnamed parameters
    pub parameter_names: Vec<Option<u32>>,
    rows: Vec<DebugRow>,
}

impl DebugProgram {
    /// Creates an empty program starting at `line_start`.
    #[must_use]
    pub fn new(line_start: u32) -> Self {
        DebugProgram {
            line_start,
            parameter_names: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Decodes a `debug_info_item` and fills the position cache.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated data, [`crate::Error::ValueRange`]
    /// for an advance byte of 255 and [`crate::Error::Malformed`] for a program longer than
    /// `config.max_debug_rows` or an address advance that overflows.
    pub fn from(data: &[u8], config: &BodyConfig) -> Result<Self> {
        let mut parser = Parser::new(data);
        let line_start = parser.read_uleb128()?;
        let parameter_count = parser.read_uleb128()?;
        if parameter_count as usize > parser.remaining() {
            return Err(malformed_error!(
                "Debug info declares {} parameters but only {} bytes remain",
                parameter_count,
                parser.remaining()
            ));
        }

        let mut parameter_names = Vec::with_capacity(parameter_count as usize);
        for _ in 0..parameter_count {
            parameter_names.push(parser.read_uleb128p1()?);
        }

        let mut rows = Vec::new();
        loop {
            let flag = parser.read_le::<u8>()?;
            if flag == DebugKind::EndSequence as u8 {
                break;
            }
            if rows.len() >= config.max_debug_rows {
                return Err(malformed_error!(
                    "Debug program exceeds {} rows",
                    config.max_debug_rows
                ));
            }

            let operands = match DebugKind::from_raw(flag) {
                DebugKind::AdvancePc => {
                    let units = parser.read_uleb128()?;
                    let address_diff = units.checked_mul(2).ok_or_else(|| {
                        malformed_error!("Address advance of {} code units overflows", units)
                    })?;
                    DebugOperands::AdvancePc { address_diff }
                }
                DebugKind::AdvanceLine => DebugOperands::AdvanceLine {
                    line_diff: parser.read_sleb128()?,
                },
                DebugKind::StartLocal => DebugOperands::StartLocal {
                    register: parser.read_uleb128()?,
                    name: parser.read_uleb128p1()?,
                    type_ref: parser.read_uleb128p1()?,
                    signature: parser.read_uleb128p1()?,
                },
                DebugKind::EndLocal | DebugKind::RestartLocal => {
                    DebugOperands::Register(parser.read_uleb128()?)
                }
                DebugKind::SetSourceFile => DebugOperands::SourceFile(parser.read_uleb128p1()?),
                _ => DebugOperands::None,
            };

            let mut row = DebugRow::from_raw(flag, operands)?;
            row.attached = true;
            trace!("debug row {}: {:?}", rows.len(), row);
            rows.push(row);
        }

        let mut program = DebugProgram {
            line_start,
            parameter_names,
            rows,
        };
        program.cache_values()?;

        debug!(
            "Decoded debug program: line_start {}, {} parameters, {} rows",
            program.line_start,
            program.parameter_names.len(),
            program.rows.len()
        );
        Ok(program)
    }

    /// Encodes the program as a `debug_info_item`, including the terminating END_SEQUENCE.
    ///
    /// The stored deltas are written as they are; run [`DebugProgram::update_values`] first if
    /// cached positions were edited.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] for a string key of `u32::MAX`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        write_uleb128(&mut buffer, self.line_start);
        write_uleb128(&mut buffer, self.parameter_names.len() as u32);
        for name in &self.parameter_names {
            write_uleb128p1(&mut buffer, *name)?;
        }

        for row in &self.rows {
            write_le(&mut buffer, row.flag());
            match row.operands() {
                DebugOperands::AdvancePc { address_diff } => {
                    write_uleb128(&mut buffer, address_diff / 2);
                }
                DebugOperands::AdvanceLine { line_diff } => write_sleb128(&mut buffer, *line_diff),
                DebugOperands::StartLocal {
                    register,
                    name,
                    type_ref,
                    signature,
                } => {
                    write_uleb128(&mut buffer, *register);
                    write_uleb128p1(&mut buffer, *name)?;
                    write_uleb128p1(&mut buffer, *type_ref)?;
                    write_uleb128p1(&mut buffer, *signature)?;
                }
                DebugOperands::Register(register) => write_uleb128(&mut buffer, *register),
                DebugOperands::SourceFile(name) => write_uleb128p1(&mut buffer, *name)?,
                DebugOperands::None => {}
            }
        }

        write_le(&mut buffer, DebugKind::EndSequence as u8);
        Ok(buffer)
    }

    /// The rows in program order.
    #[must_use]
    pub fn rows(&self) -> &[DebugRow] {
        &self.rows
    }

    /// The row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&DebugRow> {
        self.rows.get(index)
    }

    /// Mutable access to the row at `index`. Follow up with the matching recompute call.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut DebugRow> {
        self.rows.get_mut(index)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the program has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Recomputes every cached position from the deltas.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if the line drops below 0 or a position overflows.
    /// Rows before the failing one have already been recomputed.
    pub fn cache_values(&mut self) -> Result<()> {
        self.cache_values_from(0)
    }

    /// Recomputes cached positions from row `start` onwards.
    ///
    /// # Errors
    /// See [`DebugProgram::cache_values`].
    pub fn cache_values_from(&mut self, start: usize) -> Result<()> {
        for index in start..self.rows.len() {
            let (before, rest) = self.rows.split_at_mut(index);
            rest[0].cache_values(before.last(), self.line_start)?;
        }
        Ok(())
    }

    /// Recomputes every row's deltas from the cached positions, inserting carrier rows
    /// where a row cannot represent its deltas.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if positions go backwards in address or land on an
    /// odd byte.
    pub fn update_values(&mut self) -> Result<()> {
        self.update_values_from(0)
    }

    /// Same as [`DebugProgram::update_values`], starting at row `start`.
    ///
    /// # Errors
    /// See [`DebugProgram::update_values`].
    pub fn update_values_from(&mut self, start: usize) -> Result<()> {
        self.reencode_from(start, true)
    }

    /// Recomputes deltas without inserting carrier rows.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] at the first row whose deltas cannot be stored.
    /// Rows before it have already been rewritten.
    pub fn update_values_exact(&mut self) -> Result<()> {
        self.reencode_from(0, false)
    }

    fn reencode_from(&mut self, start: usize, normalize: bool) -> Result<()> {
        let mut index = start;
        while index < self.rows.len() {
            let (address, line) = match index.checked_sub(1) {
                Some(previous) => (self.rows[previous].address, self.rows[previous].line),
                None => (0, self.line_start),
            };
            let row = &self.rows[index];
            let address_diff = i64::from(row.address) - i64::from(address);
            let line_diff = i64::from(row.line) - i64::from(line);

            if address_diff < 0 || address_diff % 2 != 0 || !normalize {
                let (before, rest) = self.rows.split_at_mut(index);
                rest[0].update_values(before.last(), self.line_start)?;
                index += 1;
                continue;
            }

            let kind = row.kind();
            let (stored_address, stored_line) = if DebugRow::can_store(kind, address_diff, line_diff) {
                (address_diff, line_diff)
            } else if DebugRow::can_store(kind, address_diff, 0) {
                (address_diff, 0)
            } else if DebugRow::can_store(kind, 0, line_diff) {
                (0, line_diff)
            } else {
                (0, 0)
            };

            let mut carriers = Vec::new();
            let mut carried_line = line;
            if stored_line != line_diff {
                let mut carrier = DebugRow::advance_line((line_diff - stored_line) as i32);
                carried_line = (i64::from(line) + line_diff - stored_line) as u32;
                carrier.address = address;
                carrier.line = carried_line;
                carriers.push(carrier);
            }
            if stored_address != address_diff {
                let mut carrier = DebugRow::advance_pc((address_diff - stored_address) as u32)?;
                carrier.address = (i64::from(address) + address_diff - stored_address) as u32;
                carrier.line = carried_line;
                carriers.push(carrier);
            }

            if !carriers.is_empty() {
                debug!(
                    "Inserting {} carrier row(s) before debug row {} ({} at 0x{:x})",
                    carriers.len(),
                    index,
                    kind,
                    row.address
                );
                let inserted = carriers.len();
                for (offset, mut carrier) in carriers.into_iter().enumerate() {
                    carrier.attached = true;
                    self.rows.insert(index + offset, carrier);
                }
                for carrier in index..index + inserted {
                    let (before, rest) = self.rows.split_at_mut(carrier);
                    rest[0].update_values(before.last(), self.line_start)?;
                }
                index += inserted;
            }

            let (before, rest) = self.rows.split_at_mut(index);
            rest[0].update_values(before.last(), self.line_start)?;
            index += 1;
        }
        Ok(())
    }

    /// Inserts `row` at `index`, applying its deltas to the predecessor's position. Rows after
    /// it keep their positions and have their deltas repaired.
    ///
    /// On error the program is left as it was.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] if `index` is past the end,
    /// [`crate::Error::ValueRange`] if the row's position lies past its successor's or its
    /// line drops below 0, and the errors of [`DebugProgram::update_values_from`].
    pub fn insert(&mut self, index: usize, mut row: DebugRow) -> Result<()> {
        if index > self.rows.len() {
            return Err(invalid_operation_error!(
                "Cannot insert debug row at {} into a program of {} rows",
                index,
                self.rows.len()
            ));
        }

        row.cache_values(index.checked_sub(1).map(|i| &self.rows[i]), self.line_start)?;
        if let Some(next) = self.rows.get(index) {
            let address_diff = i64::from(next.address) - i64::from(row.address);
            if address_diff < 0 || address_diff % 2 != 0 {
                return Err(value_range_error!(
                    "debug address advance",
                    address_diff,
                    0,
                    u32::MAX - 1
                ));
            }
        }

        // successors keep their positions, so their deltas are the only thing rewritten
        let following = self.rows[index..].to_vec();
        row.attached = true;
        self.rows.insert(index, row);
        if let Err(error) = self.update_values_from(index + 1) {
            self.rows.truncate(index);
            self.rows.extend(following);
            return Err(error);
        }
        Ok(())
    }

    /// Appends `row`, applying its deltas to the last position.
    ///
    /// # Errors
    /// See [`DebugProgram::insert`].
    pub fn push(&mut self, row: DebugRow) -> Result<()> {
        self.insert(self.rows.len(), row)
    }

    /// Appends a row whose cached position is already set, then encodes its deltas.
    ///
    /// # Errors
    /// See [`DebugProgram::update_values_from`].
    pub fn push_at(&mut self, mut row: DebugRow, address: u32, line: u32) -> Result<()> {
        row.attached = true;
        row.address = address;
        row.line = line;
        self.rows.push(row);
        self.update_values_from(self.rows.len() - 1)
    }

    /// Removes and returns the row at `index`. Following rows keep their positions.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] for an index past the end, and the errors of
    /// [`DebugProgram::update_values_from`].
    pub fn remove(&mut self, index: usize) -> Result<DebugRow> {
        if index >= self.rows.len() {
            return Err(invalid_operation_error!(
                "No debug row {} in a program of {} rows",
                index,
                self.rows.len()
            ));
        }

        let mut row = self.rows.remove(index);
        row.attached = false;
        self.update_values_from(index)?;
        Ok(row)
    }

    /// Moves the cached address of row `index`. Deltas are stale until the next update walk.
    pub fn set_target_address(&mut self, index: usize, address: u32) {
        if let Some(row) = self.rows.get_mut(index) {
            row.address = address;
        }
    }

    /// Number of rows whose raw kind byte marks them as packed advances.
    #[must_use]
    pub fn advance_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| row.flag() >= FIRST_ADVANCE)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn program(line_start: u32, rows: Vec<DebugRow>) -> DebugProgram {
        let mut program = DebugProgram::new(line_start);
        for row in rows {
            program.push(row).unwrap();
        }
        program
    }

    #[test]
    fn cache_scenario() {
        let program = program(
            10,
            vec![DebugRow::special(4, 1).unwrap(), DebugRow::special(0, 2).unwrap()],
        );
        let positions: Vec<_> = program.rows().iter().map(|r| (r.address(), r.line())).collect();
        assert_eq!(positions, vec![(4, 11), (4, 13)]);
    }

    #[test]
    fn cache_then_update_is_identity() {
        let mut program = program(
            3,
            vec![
                DebugRow::special(0, 0).unwrap(),
                DebugRow::start_local(0, Some(1), Some(2), None),
                DebugRow::advance_pc(40).unwrap(),
                DebugRow::special(2, -3).unwrap(),
                DebugRow::advance_line(100),
                DebugRow::special(6, 7).unwrap(),
                DebugRow::end_local(0),
            ],
        );
        let before = program.clone();
        program.cache_values().unwrap();
        program.update_values().unwrap();
        assert_eq!(program, before);
    }

    #[test]
    fn remove_keeps_absolute_targets() {
        let mut program = program(
            1,
            vec![
                DebugRow::special(2, 1).unwrap(),
                DebugRow::special(2, 1).unwrap(),
                DebugRow::special(2, 1).unwrap(),
            ],
        );
        let removed = program.remove(1).unwrap();
        assert!(!removed.is_attached());

        assert_eq!(program.len(), 2);
        let last = &program.rows()[1];
        assert_eq!((last.address(), last.line()), (6, 4));
        assert_eq!((last.address_diff(), last.line_diff()), (4, 2));
    }

    #[test]
    fn update_inserts_carriers() {
        let mut program = program(1, vec![DebugRow::special(0, 0).unwrap(), DebugRow::special(2, 1).unwrap()]);

        program.set_target_address(1, 0x200);
        program.row_mut(1).unwrap().line = 50;
        program.update_values().unwrap();

        let kinds: Vec<_> = program.rows().iter().map(DebugRow::kind).collect();
        assert_eq!(
            kinds,
            vec![DebugKind::Advance, DebugKind::AdvanceLine, DebugKind::AdvancePc, DebugKind::Advance]
        );
        let last = program.rows().last().unwrap();
        assert_eq!((last.address(), last.line()), (0x200, 50));

        let before = program.clone();
        program.cache_values().unwrap();
        assert_eq!(program, before);
    }

    #[test]
    fn update_rejects_backwards_and_odd() {
        let mut program = program(1, vec![DebugRow::special(4, 0).unwrap(), DebugRow::special(2, 0).unwrap()]);
        program.set_target_address(1, 2);
        assert!(matches!(program.update_values(), Err(Error::ValueRange { .. })));

        program.set_target_address(1, 7);
        assert!(matches!(program.update_values(), Err(Error::ValueRange { .. })));
    }

    #[test]
    fn exact_update_fails_instead_of_normalizing() {
        let mut program = program(1, vec![DebugRow::prologue_end()]);
        program.row_mut(0).unwrap().line = 9;
        assert!(matches!(
            program.update_values_exact(),
            Err(Error::ValueRange { .. })
        ));
    }

    #[test]
    fn failed_insert_leaves_program_untouched() {
        let mut program = program(1, vec![DebugRow::special(2, 1).unwrap()]);
        let before = program.clone();

        // a row at address 4 cannot precede the row at address 2
        assert!(matches!(
            program.insert(0, DebugRow::special(4, 0).unwrap()),
            Err(Error::ValueRange { .. })
        ));
        assert_eq!(program, before);

        // a line below 0 is refused before the row is spliced in
        assert!(matches!(
            program.insert(1, DebugRow::advance_line(-5)),
            Err(Error::ValueRange { .. })
        ));
        assert_eq!(program, before);

        program.insert(0, DebugRow::special(2, 0).unwrap()).unwrap();
        assert_eq!(program.len(), 2);
        let last = &program.rows()[1];
        assert_eq!((last.address(), last.line()), (2, 2));
        assert_eq!((last.address_diff(), last.line_diff()), (0, 1));
    }

    #[test]
    fn binary_round_trip() {
        // line_start 7, one unnamed parameter, one named (string 2)
        let data = [
            0x07, 0x02, 0x00, 0x03, // header
            0x06, // prologue end
            0x0E, // advance: line +1, address +0
            0x01, 0x03, // advance pc 3 code units
            0x02, 0x7C, // advance line -4
            0x03, 0x01, 0x05, 0x00, 0x00, // start local v1, name 4, no type, no signature
            0x08, 0x01, // set file string 0
            0x00,
        ];
        let program = DebugProgram::from(&data, &BodyConfig::default()).unwrap();
        assert_eq!(program.line_start, 7);
        assert_eq!(program.parameter_names, vec![None, Some(2)]);
        assert_eq!(program.len(), 6);
        assert_eq!(program.rows()[1].line(), 8);
        assert_eq!(program.rows()[2].address(), 6);
        assert_eq!(program.rows()[3].line(), 4);
        assert_eq!(program.encode().unwrap(), data);
    }

    #[test]
    fn decode_errors() {
        let config = BodyConfig::default();
        assert!(matches!(
            DebugProgram::from(&[0x01, 0x00, 0xFF, 0x00], &config),
            Err(Error::ValueRange { .. })
        ));
        assert!(matches!(
            DebugProgram::from(&[0x01, 0x00, 0x06], &config),
            Err(Error::OutOfBounds { .. })
        ));

        let tight = BodyConfig {
            max_debug_rows: 1,
            ..BodyConfig::default()
        };
        assert!(matches!(
            DebugProgram::from(&[0x01, 0x00, 0x06, 0x07, 0x00], &tight),
            Err(Error::Malformed { .. })
        ));
    }
}
