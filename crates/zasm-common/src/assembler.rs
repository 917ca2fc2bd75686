use crate::{
    bundler::{bundle, Image},
    encoder::{byte, encode, word, Context, Operand},
    lexer::tokenize,
    opcodes::{Keyword, Mnemonic},
    parser::Parser,
    types::*,
};
use std::collections::{BTreeMap, HashMap};

/// Output of one `Assembler::assemble` run. A run is failed whenever
/// `diagnostics` is non-empty, even if some ranges were produced.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub ranges: Vec<ByteRange>,
    pub symbols: BTreeMap<String, u16>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A successfully assembled source.
#[derive(Debug, Clone)]
pub struct Program {
    pub ranges: Vec<ByteRange>,
    pub images: Vec<Image>,
    pub symbols: BTreeMap<String, u16>,
}

pub struct Assembler {
    origin: u16,
}

impl Assembler {
    pub fn new() -> Self {
        Self { origin: 0 }
    }

    /// Address the counter starts at before any `ORG`.
    pub fn with_origin(origin: u16) -> Self {
        Self { origin }
    }

    pub fn assemble(&self, items: &[Item]) -> Assembly {
        tracing::debug!(items = items.len(), "starting pass 1");
        let sizing = Pass::new(items, self.origin, None).run();

        tracing::debug!(symbols = sizing.symbols.len(), "starting pass 2");
        let output = Pass::new(items, self.origin, Some(&sizing.symbols)).run();

        Assembly {
            ranges: output.ranges,
            symbols: output.symbols.into_iter().collect(),
            diagnostics: output.diagnostics,
        }
    }

    /// Runs the whole pipeline: lex, parse, assemble, bundle.
    pub fn assemble_source(&self, source: &str) -> Result<Program, Vec<Diagnostic>> {
        let tokens = tokenize(source);
        let (items, mut diagnostics) = Parser::new().parse(&tokens);
        let assembly = self.assemble(&items);
        diagnostics.extend(assembly.diagnostics);

        if !diagnostics.is_empty() {
            tracing::debug!(errors = diagnostics.len(), "assembly failed");
            return Err(diagnostics);
        }

        let images = bundle(&assembly.ranges);
        Ok(Program {
            ranges: assembly.ranges,
            images,
            symbols: assembly.symbols,
        })
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn assemble_source(source: &str) -> Result<Program, Vec<Diagnostic>> {
    Assembler::new().assemble_source(source)
}

/// Why a statement produced no bytes. `Dropped` means an operand was already
/// rejected and reported by the parser.
enum Rejected {
    Error(AssemblerError),
    Dropped,
}

impl From<AssemblerError> for Rejected {
    fn from(error: AssemblerError) -> Self {
        Rejected::Error(error)
    }
}

struct PassOutput {
    ranges: Vec<ByteRange>,
    symbols: HashMap<String, u16>,
    diagnostics: Vec<Diagnostic>,
}

/// One walk over the item stream. The sizing pass has no `known` table: it
/// resolves unknown symbols to 0 and its diagnostics are thrown away.
struct Pass<'a> {
    items: &'a [Item],
    pos: usize,
    known: Option<&'a HashMap<String, u16>>,
    address: u16,
    cpu: Cpu,
    symbols: HashMap<String, u16>,
    pending_label: Option<String>,
    ranges: Vec<ByteRange>,
    diagnostics: Vec<Diagnostic>,
    phase_error: bool,
}

impl<'a> Pass<'a> {
    fn new(items: &'a [Item], origin: u16, known: Option<&'a HashMap<String, u16>>) -> Self {
        Self {
            items,
            pos: 0,
            known,
            address: origin,
            cpu: Cpu::Z80,
            symbols: HashMap::new(),
            pending_label: None,
            ranges: Vec::new(),
            diagnostics: Vec::new(),
            phase_error: false,
        }
    }

    fn sizing(&self) -> bool {
        self.known.is_none()
    }

    fn run(mut self) -> PassOutput {
        while let Some(item) = self.next() {
            let line = item.line;
            match &item.kind {
                ItemKind::Label(name) => {
                    self.define(name, self.address, line);
                    self.pending_label = Some(name.clone());
                }
                ItemKind::Keyword(Keyword::End) => break,
                ItemKind::Keyword(keyword) => {
                    let result = self.directive(*keyword, line);
                    self.reject(line, result);
                }
                ItemKind::Mnemonic(mnemonic) => {
                    let result = self.instruction(*mnemonic, line);
                    self.reject(line, result);
                }
                ItemKind::Invalid => self.skip_line(line),
                other => {
                    self.error(line, AssemblerError::UnexpectedItem(other.to_string()));
                    self.skip_line(line);
                }
            }
        }

        PassOutput {
            ranges: self.ranges,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
        }
    }

    fn next(&mut self) -> Option<&'a Item> {
        let item = self.items.get(self.pos)?;
        self.pos += 1;
        Some(item)
    }

    fn peek_on_line(&self, line: usize) -> Option<&'a Item> {
        self.items.get(self.pos).filter(|item| item.line == line)
    }

    fn skip_line(&mut self, line: usize) {
        while self.peek_on_line(line).is_some() {
            self.pos += 1;
        }
    }

    fn error(&mut self, line: usize, error: AssemblerError) {
        self.diagnostics.push(Diagnostic::new(line, error));
    }

    fn reject(&mut self, line: usize, result: Result<(), Rejected>) {
        if let Err(Rejected::Error(error)) = result {
            self.error(line, error);
            // a statement that failed only in this pass shifts later labels
            self.phase_error = true;
        }
    }

    /// Binds `name`. In the final pass the value must match the sizing
    /// pass, otherwise code already encoded against the old value is wrong.
    /// Only the first mismatch is reported; later ones follow from it.
    fn define(&mut self, name: &str, value: u16, line: usize) {
        if self.symbols.contains_key(name) {
            self.error(line, AssemblerError::DuplicateSymbol(name.to_string()));
            return;
        }
        self.symbols.insert(name.to_string(), value);

        let sized = self.known.and_then(|known| known.get(name)).copied();
        if let Some(sized) = sized {
            if sized != value && !self.phase_error {
                self.phase_error = true;
                self.error(
                    line,
                    AssemblerError::PhaseError {
                        name: name.to_string(),
                        sized,
                        actual: value,
                    },
                );
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<u16, AssemblerError> {
        match self.known {
            Some(known) => known
                .get(name)
                .copied()
                .ok_or_else(|| AssemblerError::UndefinedSymbol(name.to_string())),
            None => Ok(self.symbols.get(name).copied().unwrap_or(0)),
        }
    }

    fn starts_operand(&self, line: usize) -> bool {
        matches!(
            self.peek_on_line(line).map(|item| &item.kind),
            Some(kind) if !matches!(
                kind,
                ItemKind::Comma | ItemKind::Label(_) | ItemKind::Keyword(_) | ItemKind::Mnemonic(_)
            )
        )
    }

    /// Collects the comma-separated operands following a mnemonic or
    /// directive on its own line. On a malformed list the rest of the line
    /// is dropped.
    fn operands(&mut self, line: usize) -> Result<Vec<&'a Item>, Rejected> {
        match self.operand_list(line) {
            Ok(items) if items.iter().any(|item| item.kind == ItemKind::Invalid) => {
                Err(Rejected::Dropped)
            }
            Ok(items) => Ok(items),
            Err(error) => {
                self.skip_line(line);
                Err(error.into())
            }
        }
    }

    fn operand_list(&mut self, line: usize) -> Result<Vec<&'a Item>, AssemblerError> {
        let mut operands = Vec::new();
        if !self.starts_operand(line) {
            return Ok(operands);
        }
        while let Some(item) = self.next() {
            operands.push(item);
            match self.peek_on_line(line).map(|item| &item.kind) {
                Some(ItemKind::Comma) => {
                    self.pos += 1;
                    if !self.starts_operand(line) {
                        return Err(AssemblerError::ExpectedOperand);
                    }
                }
                None
                | Some(ItemKind::Label(_))
                | Some(ItemKind::Keyword(_))
                | Some(ItemKind::Mnemonic(_)) => break,
                Some(other) => return Err(AssemblerError::ExpectedComma(other.to_string())),
            }
        }
        Ok(operands)
    }

    fn operand(&self, mnemonic: Mnemonic, item: &Item) -> Result<Operand, AssemblerError> {
        Ok(match &item.kind {
            ItemKind::Register8(reg) => Operand::Reg8(*reg),
            ItemKind::RegisterI => Operand::I,
            ItemKind::RegisterR => Operand::R,
            ItemKind::Register16(reg) => Operand::Reg16(*reg),
            ItemKind::IndirectRegister16(reg) => Operand::Indirect(*reg),
            ItemKind::IndirectIndexed {
                index,
                displacement,
            } => Operand::Indexed(*index, *displacement),
            ItemKind::IndirectC => Operand::IndirectC,
            ItemKind::IndirectImmediate(address) => Operand::Address(*address),
            ItemKind::IndirectSymbol(name) => Operand::Address(self.lookup(name)?),
            ItemKind::Condition(cc) => Operand::Condition(*cc),
            ItemKind::Number(number) => Operand::Immediate(*number),
            ItemKind::Name(name) => Operand::Immediate(Number::new(self.lookup(name)? as i64)),
            ItemKind::Str(_)
            | ItemKind::Label(_)
            | ItemKind::Keyword(_)
            | ItemKind::Mnemonic(_)
            | ItemKind::Comma
            | ItemKind::Invalid => {
                return Err(AssemblerError::InvalidOperands {
                    mnemonic,
                    operands: item.kind.to_string(),
                })
            }
        })
    }

    fn instruction(&mut self, mnemonic: Mnemonic, line: usize) -> Result<(), Rejected> {
        let items = self.operands(line)?;
        if self.cpu != Cpu::Z80 {
            return Err(AssemblerError::CpuNotImplemented(self.cpu).into());
        }
        let operands = items
            .iter()
            .map(|item| self.operand(mnemonic, item))
            .collect::<Result<Vec<_>, _>>()?;
        let ctx = Context {
            address: self.address,
            sizing: self.sizing(),
        };
        let bytes = encode(mnemonic, &operands, ctx)?;
        self.emit(bytes, line);
        Ok(())
    }

    fn emit(&mut self, bytes: Vec<u8>, line: usize) {
        let range = ByteRange {
            address: self.address,
            bytes,
            line,
            label: self.pending_label.take(),
        };
        if !self.sizing() {
            tracing::trace!(line, address = range.address, len = range.bytes.len(), "emit");
        }
        self.address = self.address.wrapping_add(range.bytes.len() as u16);
        self.ranges.push(range);
    }

    fn directive(&mut self, keyword: Keyword, line: usize) -> Result<(), Rejected> {
        match keyword {
            Keyword::Org => {
                let value = self.single_value(keyword, line)?;
                let [lo, hi] = word(&value)?;
                self.address = u16::from_le_bytes([lo, hi]);
                if !self.sizing() {
                    tracing::debug!(line, origin = self.address, "origin set");
                }
                Ok(())
            }
            Keyword::Z80 => {
                self.cpu = Cpu::Z80;
                Ok(())
            }
            Keyword::M6502 => {
                self.cpu = Cpu::M6502;
                Ok(())
            }
            Keyword::Db | Keyword::Dw => self.data(keyword, line),
            Keyword::Const => self.constant(line),
            // END is handled by the caller, it stops the pass.
            Keyword::End => Ok(()),
            Keyword::Include | Keyword::Incbin | Keyword::Macro | Keyword::Endm => {
                self.skip_line(line);
                Err(AssemblerError::NotImplemented(keyword).into())
            }
        }
    }

    fn invalid_directive(keyword: Keyword, items: &[&Item]) -> AssemblerError {
        AssemblerError::InvalidDirective {
            keyword,
            operands: items
                .iter()
                .map(|item| item.kind.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn value(&self, keyword: Keyword, item: &Item) -> Result<Number, AssemblerError> {
        match &item.kind {
            ItemKind::Number(number) => Ok(*number),
            ItemKind::Name(name) => Ok(Number::new(self.lookup(name)? as i64)),
            _ => Err(Self::invalid_directive(keyword, &[item])),
        }
    }

    fn single_value(&mut self, keyword: Keyword, line: usize) -> Result<Number, Rejected> {
        match self.operands(line)?.as_slice() {
            [] => Err(AssemblerError::MissingOperand(keyword.to_string()).into()),
            [item] => Ok(self.value(keyword, item)?),
            items => Err(Self::invalid_directive(keyword, items).into()),
        }
    }

    fn data(&mut self, keyword: Keyword, line: usize) -> Result<(), Rejected> {
        let items = self.operands(line)?;
        if items.is_empty() {
            return Err(AssemblerError::MissingOperand(keyword.to_string()).into());
        }
        let mut bytes = Vec::new();
        for item in items {
            match (&item.kind, keyword) {
                (ItemKind::Str(text), Keyword::Db) => bytes.extend(text.bytes()),
                (_, Keyword::Db) => bytes.push(byte(&self.value(keyword, item)?)?),
                _ => bytes.extend(word(&self.value(keyword, item)?)?),
            }
        }
        self.emit(bytes, line);
        Ok(())
    }

    /// `CONST NAME, value`
    fn constant(&mut self, line: usize) -> Result<(), Rejected> {
        let items = self.operands(line)?;
        match items.as_slice() {
            [Item {
                kind: ItemKind::Name(name),
                ..
            }, value] => {
                let [lo, hi] = word(&self.value(Keyword::Const, value)?)?;
                self.define(name, u16::from_le_bytes([lo, hi]), line);
                Ok(())
            }
            [] => Err(AssemblerError::MissingOperand(Keyword::Const.to_string()).into()),
            items => Err(Self::invalid_directive(Keyword::Const, items).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(source: &str) -> Vec<Item> {
        let (items, errors) = Parser::new().parse(&tokenize(source));
        assert!(errors.is_empty(), "{:?}", errors);
        items
    }

    #[test]
    fn sizing_pass_tolerates_forward_references() {
        let items = items("jr later\nld a,(later)\nlater: nop");
        let sizing = Pass::new(&items, 0, None).run();
        assert!(sizing.diagnostics.is_empty());
        assert_eq!(sizing.symbols["LATER"], 5);
        let sizes: Vec<usize> = sizing.ranges.iter().map(|r| r.bytes.len()).collect();
        assert_eq!(sizes, vec![2, 3, 1]);
    }

    #[test]
    fn final_pass_uses_sizing_table() {
        let assembly = Assembler::new().assemble(&items("jr later\nld a,(later)\nlater: nop"));
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.ranges[0].bytes, vec![0x18, 0x03]);
        assert_eq!(assembly.ranges[1].bytes, vec![0x3A, 0x05, 0x00]);
    }

    #[test]
    fn pending_label_goes_to_next_range() {
        let assembly = Assembler::new().assemble(&items("first:\nsecond: nop\nhalt"));
        assert_eq!(assembly.ranges[0].label.as_deref(), Some("SECOND"));
        assert_eq!(assembly.ranges[1].label, None);
        assert_eq!(assembly.symbols["FIRST"], 0);
    }

    #[test]
    fn statement_after_operands_on_same_line() {
        let assembly = Assembler::new().assemble(&items("ld a,1 out ($10),a"));
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.ranges.len(), 2);
        assert_eq!(assembly.ranges[1].address, 2);
    }

    #[test]
    fn dropped_operand_discards_statement() {
        let (items, errors) = Parser::new().parse(&tokenize("ret (ix+300)\nnop"));
        assert_eq!(errors.len(), 1);
        let assembly = Assembler::new().assemble(&items);
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.ranges.len(), 1);
        assert_eq!(assembly.ranges[0].address, 0);
        assert_eq!(assembly.ranges[0].bytes, vec![0x00]);
    }

    #[test]
    fn dropped_operand_discards_directive() {
        let (items, errors) = Parser::new().parse(&tokenize("db 1,@\nhalt"));
        assert_eq!(errors.len(), 1);
        let assembly = Assembler::new().assemble(&items);
        assert!(assembly.diagnostics.is_empty());
        assert_eq!(assembly.ranges[0].address, 0);
        assert_eq!(assembly.ranges[0].bytes, vec![0x76]);
    }

    #[test]
    fn failed_statement_does_not_report_phase() {
        let assembly =
            Assembler::new().assemble(&items("ld a,big\nhere: nop\nconst big,$1234"));
        assert_eq!(
            assembly.diagnostics,
            vec![Diagnostic::new(
                1,
                AssemblerError::ValueOutOfRange {
                    value: 0x1234,
                    bits: 8,
                }
            )]
        );
        assert_eq!(assembly.ranges[0].address, 0);
        assert_eq!(assembly.ranges[0].bytes, vec![0x00]);
    }

    #[test]
    fn label_moved_between_passes_is_reported() {
        let assembly =
            Assembler::new().assemble(&items("org start\nhere: jp here\nconst start,$100"));
        assert_eq!(
            assembly.diagnostics,
            vec![Diagnostic::new(
                2,
                AssemblerError::PhaseError {
                    name: "HERE".to_string(),
                    sized: 0,
                    actual: 0x100,
                }
            )]
        );
    }

    #[test]
    fn operands_stay_on_their_line() {
        let assembly = Assembler::new().assemble(&items("ret\nnz"));
        assert_eq!(assembly.ranges[0].bytes, vec![0xC9]);
        assert_eq!(assembly.diagnostics.len(), 1);
        assert_eq!(assembly.diagnostics[0].line, 2);
    }
}
