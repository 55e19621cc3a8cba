//! Assembly text input.
//!
//! The reader consumes the text line by line. Label definitions bind to the address of the next
//! instruction, debug directives become rows targeted at that address, and `.catch` directives
//! are collected and grouped into try items by their range once every label is known. Branch
//! operands are resolved the same way after the last line.

use std::collections::HashMap;

use log::debug;

use crate::{
    assembly::{BranchSlot, Instruction, InstructionSequence, Opcode, TargetRef},
    debug::{DebugProgram, DebugRow},
    identifiers::IdentifierStore,
    method::{BodyConfig, MethodBody, TryItem},
    smali::lexer::{tokenize, Token},
    Error, Result,
};

/// Assembles a method body from its text form.
///
/// # Errors
/// Returns [`Error::Parse`] with the line and column of the first offending token.
pub fn read_method(
    text: &str,
    ids: &mut dyn IdentifierStore,
    config: BodyConfig,
) -> Result<MethodBody> {
    let mut reader = Reader::new(ids, config);
    let mut lines = 0;

    for (index, line) in text.lines().enumerate() {
        lines = index + 1;
        let tokens = tokenize(line, lines)?;
        if tokens.is_empty() {
            continue;
        }
        reader.line(Cursor {
            tokens: &tokens,
            position: 0,
            line: lines,
            end: line.len() + 1,
        })?;
    }

    reader.finish(lines.max(1))
}

/// A label reference waiting for resolution.
#[derive(Debug)]
struct LabelRef {
    name: String,
    line: usize,
    column: usize,
}

#[derive(Debug)]
struct Catch {
    type_ref: Option<u32>,
    start: LabelRef,
    end: LabelRef,
    handler: LabelRef,
}

#[derive(Debug)]
enum Block {
    PackedSwitch { first_key: i32, targets: Vec<LabelRef> },
    SparseSwitch { keys: Vec<i32>, targets: Vec<LabelRef> },
    Array { width: u16, elements: Vec<u64> },
}

impl Block {
    fn name(&self) -> &'static str {
        match self {
            Block::PackedSwitch { .. } => "packed-switch",
            Block::SparseSwitch { .. } => "sparse-switch",
            Block::Array { .. } => "array-data",
        }
    }
}

struct Cursor<'t> {
    tokens: &'t [(Token, usize)],
    position: usize,
    line: usize,
    end: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn next(&mut self) -> Result<(&'t Token, usize)> {
        let Some((token, column)) = self.tokens.get(self.position) else {
            return Err(self.error_at(self.end, "Unexpected end of line"));
        };
        self.position += 1;
        Ok((token, *column))
    }

    fn error_at(&self, column: usize, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<()> {
        let (token, column) = self.next()?;
        if token != expected {
            return Err(self.error_at(column, format!("Expected {what}")));
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        match self.tokens.get(self.position) {
            Some((_, column)) => Err(self.error_at(*column, "Unexpected trailing input")),
            None => Ok(()),
        }
    }

    fn label(&mut self) -> Result<LabelRef> {
        match self.next()? {
            (Token::Label(name), column) => Ok(LabelRef {
                name: name.clone(),
                line: self.line,
                column,
            }),
            (_, column) => Err(self.error_at(column, "Expected a label")),
        }
    }

    fn number(&mut self) -> Result<(i128, usize)> {
        match self.next()? {
            (Token::Int(value), column) => Ok((i128::from(*value), column)),
            (Token::Hex(value), column) => Ok((*value, column)),
            (_, column) => Err(self.error_at(column, "Expected a number")),
        }
    }

    fn register(&mut self) -> Result<u32> {
        let (token, column) = self.next()?;
        match token {
            Token::Ident(name) => name
                .strip_prefix('v')
                .and_then(|number| number.parse().ok())
                .ok_or_else(|| self.error_at(column, format!("Expected a register, got {name}"))),
            _ => Err(self.error_at(column, "Expected a register")),
        }
    }
}

struct Reader<'a> {
    ids: &'a mut dyn IdentifierStore,
    config: BodyConfig,
    header: [u16; 3],
    instructions: Vec<Instruction>,
    address: u32,
    labels: HashMap<String, u32>,
    references: Vec<(TargetRef, LabelRef)>,
    catches: Vec<Catch>,
    debug: Option<DebugProgram>,
    block: Option<(Block, usize)>,
}

impl<'a> Reader<'a> {
    fn new(ids: &'a mut dyn IdentifierStore, config: BodyConfig) -> Self {
        Reader {
            ids,
            config,
            header: [0; 3],
            instructions: Vec::new(),
            address: 0,
            labels: HashMap::new(),
            references: Vec::new(),
            catches: Vec::new(),
            debug: None,
            block: None,
        }
    }

    fn line(&mut self, mut cursor: Cursor) -> Result<()> {
        if self.block.is_some() {
            return self.block_line(&mut cursor);
        }

        let (token, column) = cursor.next()?;
        match token {
            Token::Label(name) => {
                self.define_label(name, &cursor, column)?;
                cursor.finish()
            }
            Token::Directive(name) => self.directive(name, column, &mut cursor),
            Token::Ident(mnemonic) => self.instruction(mnemonic, column, &mut cursor),
            _ => Err(cursor.error_at(column, "Expected a label, directive or instruction")),
        }
    }

    fn define_label(&mut self, name: &str, cursor: &Cursor, column: usize) -> Result<()> {
        match self.labels.get(name) {
            Some(&address) if address != self.address => Err(cursor.error_at(
                column,
                format!(":{name} is already defined at 0x{address:x}"),
            )),
            Some(_) => Ok(()),
            None => {
                self.labels.insert(name.to_string(), self.address);
                Ok(())
            }
        }
    }

    fn directive(&mut self, name: &str, column: usize, cursor: &mut Cursor) -> Result<()> {
        match name {
            "registers" | "ins" | "outs" => {
                let (value, at) = cursor.number()?;
                let value = u16::try_from(value)
                    .map_err(|_| cursor.error_at(at, format!(".{name} must fit 16 bits")))?;
                let slot = match name {
                    "registers" => 0,
                    "ins" => 1,
                    _ => 2,
                };
                self.header[slot] = value;
            }
            "debug" => {
                let (value, at) = cursor.number()?;
                if self.debug.is_some() {
                    return Err(cursor.error_at(column, "Duplicate .debug"));
                }
                let line_start = u32::try_from(value)
                    .map_err(|_| cursor.error_at(at, "Line numbers must fit 32 bits"))?;
                self.debug = Some(DebugProgram::new(line_start));
            }
            "param" => {
                let name = self.string_operand(cursor)?;
                let Some(program) = self.debug.as_mut() else {
                    return Err(cursor.error_at(column, ".param needs a preceding .debug"));
                };
                program.parameter_names.push(name);
            }
            "line" => {
                let (value, at) = cursor.number()?;
                let line = u32::try_from(value)
                    .map_err(|_| cursor.error_at(at, "Line numbers must fit 32 bits"))?;
                let row = DebugRow::special(0, 0).map_err(|e| e.at(cursor.line, column))?;
                self.push_debug(row, Some(line), cursor.line, column)?;
            }
            "local" => {
                let register = cursor.register()?;
                cursor.expect(&Token::Comma, "','")?;
                let name = self.string_operand(cursor)?;
                let type_ref = match cursor.peek() {
                    Some(Token::TypeAnnotation(_)) => {
                        let (token, _) = cursor.next()?;
                        match token {
                            Token::TypeAnnotation(descriptor) => Some(self.type_key(descriptor)),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                let signature = match cursor.peek() {
                    Some(Token::Comma) => {
                        cursor.next()?;
                        self.string_operand(cursor)?
                    }
                    _ => None,
                };
                let row = DebugRow::start_local(register, name, type_ref, signature);
                self.push_debug(row, None, cursor.line, column)?;
            }
            "end" => {
                cursor.expect(&Token::Ident("local".to_string()), "'local'")?;
                let register = cursor.register()?;
                self.push_debug(DebugRow::end_local(register), None, cursor.line, column)?;
            }
            "restart" => {
                cursor.expect(&Token::Ident("local".to_string()), "'local'")?;
                let register = cursor.register()?;
                self.push_debug(DebugRow::restart_local(register), None, cursor.line, column)?;
            }
            "prologue" => self.push_debug(DebugRow::prologue_end(), None, cursor.line, column)?,
            "epilogue" => self.push_debug(DebugRow::epilogue_begin(), None, cursor.line, column)?,
            "source" => {
                let name = self.string_operand(cursor)?;
                self.push_debug(DebugRow::set_source_file(name), None, cursor.line, column)?;
            }
            "catch" | "catchall" => {
                let type_ref = if name == "catch" {
                    match cursor.next()? {
                        (Token::Type(descriptor), _) => Some(self.ids.intern_type(descriptor)),
                        (Token::TypeId(key), _) => Some(*key),
                        (_, at) => return Err(cursor.error_at(at, "Expected an exception type")),
                    }
                } else {
                    None
                };
                cursor.expect(&Token::LBrace, "'{'")?;
                let start = cursor.label()?;
                cursor.expect(&Token::Range, "'..'")?;
                let end = cursor.label()?;
                cursor.expect(&Token::RBrace, "'}'")?;
                let handler = cursor.label()?;
                self.catches.push(Catch {
                    type_ref,
                    start,
                    end,
                    handler,
                });
            }
            "packed-switch" => {
                let (value, at) = cursor.number()?;
                let first_key = i32::try_from(value)
                    .map_err(|_| cursor.error_at(at, "Switch keys must fit 32 bits"))?;
                self.block = Some((
                    Block::PackedSwitch {
                        first_key,
                        targets: Vec::new(),
                    },
                    column,
                ));
            }
            "sparse-switch" => {
                self.block = Some((
                    Block::SparseSwitch {
                        keys: Vec::new(),
                        targets: Vec::new(),
                    },
                    column,
                ));
            }
            "array-data" => {
                let (value, at) = cursor.number()?;
                let width = u16::try_from(value)
                    .ok()
                    .filter(|width| *width <= 8)
                    .ok_or_else(|| {
                        value_range_error!(
                            "array element width",
                            i64::try_from(value).unwrap_or(i64::MAX),
                            0,
                            8
                        )
                        .at(cursor.line, at)
                    })?;
                self.block = Some((
                    Block::Array {
                        width,
                        elements: Vec::new(),
                    },
                    column,
                ));
            }
            _ => return Err(cursor.error_at(column, format!("Unknown directive .{name}"))),
        }
        cursor.finish()
    }

    fn block_line(&mut self, cursor: &mut Cursor) -> Result<()> {
        let Some((block, _)) = self.block.as_mut() else {
            return Ok(());
        };

        let (token, column) = cursor.next()?;
        match (block, token) {
            (block, Token::Directive(directive)) if directive == "end" => {
                let name = block.name();
                cursor.expect(&Token::Ident(name.to_string()), name)?;
                cursor.finish()?;
                self.close_block(cursor.line, column)
            }
            (Block::PackedSwitch { targets, .. }, Token::Label(name)) => {
                targets.push(LabelRef {
                    name: name.clone(),
                    line: cursor.line,
                    column,
                });
                cursor.finish()
            }
            (Block::SparseSwitch { keys, targets }, Token::Hex(_) | Token::Int(_)) => {
                let key = i32::try_from(literal(token))
                    .map_err(|_| cursor.error_at(column, "Switch keys must fit 32 bits"))?;
                cursor.expect(&Token::Arrow, "'->'")?;
                let target = cursor.label()?;
                keys.push(key);
                targets.push(target);
                cursor.finish()
            }
            (Block::Array { width, elements }, Token::Hex(_) | Token::Int(_)) => {
                let element = array_element(literal(token), *width)
                    .ok_or_else(|| cursor.error_at(column, format!("Element does not fit {width} bytes")))?;
                elements.push(element);
                cursor.finish()
            }
            (block, _) => Err(cursor.error_at(
                column,
                format!("Unexpected line inside .{}", block.name()),
            )),
        }
    }

    fn close_block(&mut self, line: usize, column: usize) -> Result<()> {
        let Some((block, _)) = self.block.take() else {
            return Ok(());
        };

        let instruction = match block {
            Block::PackedSwitch { first_key, targets } => {
                let targets = self.reference_all(targets);
                Instruction::packed_switch_payload(first_key, targets)
            }
            Block::SparseSwitch { keys, targets } => {
                let targets = self.reference_all(targets);
                Instruction::sparse_switch_payload(&keys, targets)
            }
            Block::Array { width, elements } => Instruction::array_payload(width, &elements),
        }
        .map_err(|e| e.at(line, column))?;

        self.push_instruction(instruction, line, column)
    }

    fn reference_all(&mut self, labels: Vec<LabelRef>) -> Vec<TargetRef> {
        labels
            .into_iter()
            .map(|label| {
                let target = TargetRef::new(0);
                self.references.push((target.clone(), label));
                target
            })
            .collect()
    }

    fn instruction(&mut self, mnemonic: &str, column: usize, cursor: &mut Cursor) -> Result<()> {
        let Some(opcode) = Opcode::by_name(mnemonic) else {
            return Err(cursor.error_at(column, format!("Unknown instruction {mnemonic}")));
        };
        if opcode.format.is_payload() {
            return Err(cursor.error_at(
                column,
                format!("{mnemonic} is written as a data block"),
            ));
        }
        if opcode.is_unused() && self.config.strict_opcodes {
            return Err(cursor.error_at(column, format!("Unassigned opcode {mnemonic}")));
        }

        let slot = opcode.format.branch_slot();
        let mut units = vec![u16::from(opcode.value)];
        let mut labels = Vec::new();
        let mut first = true;

        while cursor.peek().is_some() {
            if !first {
                cursor.expect(&Token::Comma, "','")?;
            }
            let (token, at) = cursor.next()?;
            match token {
                Token::Hex(value) if first && slot != Some(BranchSlot::HighByte) => {
                    let high = to_bits(*value, 8)
                        .ok_or_else(|| cursor.error_at(at, "Expected a byte"))?;
                    units[0] |= (high as u16) << 8;
                }
                Token::Hex(value) => {
                    let unit = to_bits(*value, 16)
                        .ok_or_else(|| cursor.error_at(at, "Expected a 16-bit code unit"))?;
                    units.push(unit as u16);
                }
                Token::Label(name) => {
                    match slot {
                        _ if !labels.is_empty() => {
                            return Err(cursor.error_at(at, format!("{mnemonic} takes one label")))
                        }
                        Some(BranchSlot::HighByte) => {}
                        Some(BranchSlot::Unit16(_)) => units.push(0),
                        Some(BranchSlot::Unit32(_)) => units.extend([0, 0]),
                        None => {
                            return Err(cursor.error_at(at, format!("{mnemonic} takes no label")))
                        }
                    }
                    labels.push(LabelRef {
                        name: name.clone(),
                        line: cursor.line,
                        column: at,
                    });
                }
                _ => return Err(cursor.error_at(at, "Expected a hex operand or a label")),
            }
            first = false;
        }

        let targets = self.reference_all(labels);
        let instruction =
            Instruction::with_targets(units, targets).map_err(|e| e.at(cursor.line, column))?;
        self.push_instruction(instruction, cursor.line, column)
    }

    fn push_instruction(&mut self, instruction: Instruction, line: usize, column: usize) -> Result<()> {
        if self.instructions.len() >= self.config.max_instructions {
            return Err(Error::Parse {
                line,
                column,
                message: format!("More than {} instructions", self.config.max_instructions),
            });
        }

        self.address = self
            .address
            .checked_add(instruction.byte_size())
            .ok_or_else(|| Error::Parse {
                line,
                column,
                message: "Code exceeds the 32-bit address space".to_string(),
            })?;
        self.instructions.push(instruction);
        Ok(())
    }

    fn push_debug(
        &mut self,
        row: DebugRow,
        line: Option<u32>,
        source_line: usize,
        column: usize,
    ) -> Result<()> {
        let program = self
            .debug
            .get_or_insert_with(|| DebugProgram::new(line.unwrap_or(0)));
        let current = program
            .rows()
            .last()
            .map_or(program.line_start, DebugRow::line);

        program
            .push_at(row, self.address, line.unwrap_or(current))
            .map_err(|e| e.at(source_line, column))
    }

    fn string_operand(&mut self, cursor: &mut Cursor) -> Result<Option<u32>> {
        match cursor.next()? {
            (Token::Str(value), _) => Ok(Some(self.ids.intern_string(value))),
            (Token::StringId(key), _) => Ok(Some(*key)),
            (Token::Ident(word), _) if word == "null" => Ok(None),
            (_, column) => Err(cursor.error_at(column, "Expected a string or null")),
        }
    }

    fn type_key(&mut self, descriptor: &str) -> u32 {
        match descriptor
            .strip_prefix("type@")
            .and_then(|key| key.parse().ok())
        {
            Some(key) => key,
            None => self.ids.intern_type(descriptor),
        }
    }

    fn resolve(&self, label: &LabelRef) -> Result<u32> {
        self.labels.get(&label.name).copied().ok_or_else(|| Error::Parse {
            line: label.line,
            column: label.column,
            message: format!("Undefined label :{}", label.name),
        })
    }

    fn finish(self, lines: usize) -> Result<MethodBody> {
        if let Some((block, column)) = &self.block {
            return Err(Error::Parse {
                line: lines,
                column: *column,
                message: format!("Unterminated .{}", block.name()),
            });
        }

        for (target, label) in &self.references {
            target.set(self.resolve(label)?);
        }

        let mut groups: Vec<((u32, u32), Vec<(Option<u32>, u32)>)> = Vec::new();
        for catch in &self.catches {
            let start = self.resolve(&catch.start)?;
            let end = self.resolve(&catch.end)?;
            let handler = self.resolve(&catch.handler)?;
            if end < start {
                return Err(value_range_error!("try end address", end, start, u32::MAX)
                    .at(catch.end.line, catch.end.column));
            }
            if self.config.verify_try_ranges && handler == self.address {
                return Err(Error::AddressNotFound(handler)
                    .at(catch.handler.line, catch.handler.column));
            }

            match groups.iter_mut().find(|(range, _)| *range == (start, end)) {
                Some((_, handlers)) => handlers.push((catch.type_ref, handler)),
                None => groups.push(((start, end), vec![(catch.type_ref, handler)])),
            }
        }
        groups.sort_by_key(|((start, _), _)| *start);

        let tries = groups
            .into_iter()
            .map(|((start, end), handlers)| TryItem::new(start, end - start, handlers))
            .collect::<Vec<_>>();
        let code = InstructionSequence::from_instructions(self.instructions);

        debug!(
            "Assembled {} instructions, {} tries, {} debug rows from {} lines",
            code.len(),
            tries.len(),
            self.debug.as_ref().map_or(0, DebugProgram::len),
            lines
        );

        let [registers, ins, outs] = self.header;
        Ok(MethodBody::from_parts(
            (registers, ins, outs),
            code,
            tries,
            self.debug,
            self.config,
        ))
    }
}

fn literal(token: &Token) -> i128 {
    match token {
        Token::Hex(value) => *value,
        Token::Int(value) => i128::from(*value),
        _ => 0,
    }
}

/// Accepts `value` as a `bits`-wide field, either unsigned or as a negative two's complement.
fn to_bits(value: i128, bits: u32) -> Option<u64> {
    let limit = 1i128 << bits;
    if (0..limit).contains(&value) {
        Some(value as u64)
    } else if (-(limit / 2)..0).contains(&value) {
        Some((value + limit) as u64)
    } else {
        None
    }
}

fn array_element(value: i128, width: u16) -> Option<u64> {
    match width {
        0 => (value == 0).then_some(0),
        8 => {
            if (0..=i128::from(u64::MAX)).contains(&value) {
                Some(value as u64)
            } else {
                i64::try_from(value).ok().map(|v| v as u64)
            }
        }
        width => to_bits(value, u32::from(width) * 8),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::Identifiers;

    fn parse(text: &str) -> Result<MethodBody> {
        read_method(text, &mut Identifiers::new(), BodyConfig::default())
    }

    fn position(result: Result<MethodBody>) -> (usize, usize) {
        match result {
            Err(Error::Parse { line, column, .. }) => (line, column),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn labels_bind_to_next_instruction() {
        let body = parse(
            ".registers 1\n\n    :goto_2\n    nop\n    if-eqz 0x00, :goto_2\n    return-void\n",
        )
        .unwrap();
        assert_eq!(body.registers, 1);
        let code = body.code();
        assert_eq!(code.len(), 3);
        assert_eq!(code.get(1).unwrap().targets()[0].get(), 0);
        assert_eq!(code.get(2).unwrap().address(), 6);
    }

    #[test]
    fn catches_group_by_range() {
        let text = "\
.registers 1

    :try_start_0
    nop
    :try_end_2
    .catch Ljava/io/IOException; {:try_start_0 .. :try_end_2} :handler
    .catchall {:try_start_0 .. :try_end_2} :handler

    :handler
    return-void
";
        let mut ids = Identifiers::new();
        let body = read_method(text, &mut ids, BodyConfig::default()).unwrap();
        assert_eq!(body.tries().len(), 1);
        let item = &body.tries()[0];
        assert_eq!((item.start_address(), item.try_length()), (0, 2));
        assert_eq!(item.handlers().len(), 2);
        assert_eq!(ids.type_name(item.handlers()[0].type_ref.unwrap()), Some("Ljava/io/IOException;"));
        assert!(item.handlers()[1].is_catch_all());
    }

    #[test]
    fn debug_directives() {
        let text = "\
.registers 2
.debug 10
.param \"self\"
.param null

    .line 12
    .local v1, \"count\":I
    const/4 0x01
    .end local v1
    return-void
";
        let mut ids = Identifiers::new();
        let body = read_method(text, &mut ids, BodyConfig::default()).unwrap();
        let program = body.debug().unwrap();
        assert_eq!(program.line_start, 10);
        assert_eq!(program.parameter_names, vec![Some(0), None]);

        let rows: Vec<_> = program
            .rows()
            .iter()
            .map(|row| (row.kind(), row.address(), row.line()))
            .collect();
        use crate::debug::DebugKind;
        assert_eq!(
            rows,
            vec![
                (DebugKind::Advance, 0, 12),
                (DebugKind::StartLocal, 0, 12),
                (DebugKind::AdvancePc, 2, 12),
                (DebugKind::EndLocal, 2, 12),
            ]
        );
    }

    #[test]
    fn payload_blocks() {
        let text = "\
    packed-switch 0x00, :pswitch_data_8
    :pswitch_6
    return-void
    :pswitch_data_8
    .packed-switch -0x1
        :pswitch_6
    .end packed-switch
    .array-data 2
        0x1
        -0x1
    .end array-data
";
        let body = parse(text).unwrap();
        let code = body.code();
        assert_eq!(code.len(), 3);
        assert_eq!(code.get(0).unwrap().targets()[0].get(), 8);
        assert_eq!(code.get(1).unwrap().switch_keys(), vec![-1]);
        assert_eq!(code.get(2).unwrap().array_elements(), vec![1, 0xffff]);
    }

    #[test]
    fn errors_carry_positions() {
        assert_eq!(position(parse("    frobnicate 0x00\n")), (1, 5));
        assert_eq!(position(parse("nop\n    goto :missing\n")), (2, 10));
        assert_eq!(position(parse("nop\n.array-data 9\n")), (2, 13));
        assert_eq!(position(parse(".packed-switch 0x0\n    :a\n")), (2, 1));
        assert_eq!(position(parse("    const/16 0x00\n")), (1, 5));
        assert_eq!(
            position(parse("    :a\n    nop\n    :a\n    nop\n")),
            (3, 5)
        );
        assert_eq!(
            position(parse(":end\nnop\n:start\nnop\n.catchall {:start .. :end} :end\n")),
            (5, 22)
        );
    }

    #[test]
    fn unused_opcodes_need_lenient_config() {
        assert_eq!(position(parse("    unused-3e\n")), (1, 5));
        let body = read_method("    unused-3e\n", &mut Identifiers::new(), BodyConfig::lenient());
        assert_eq!(body.unwrap().code().len(), 1);
    }

    #[test]
    fn operand_fields() {
        assert_eq!(to_bits(0xff, 8), Some(0xff));
        assert_eq!(to_bits(-1, 8), Some(0xff));
        assert_eq!(to_bits(0x100, 8), None);
        assert_eq!(to_bits(-0x81, 8), None);
        assert_eq!(array_element(-1, 8), Some(u64::MAX));
        assert_eq!(array_element(1, 0), None);
    }
}
