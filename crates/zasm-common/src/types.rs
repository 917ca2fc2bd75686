use crate::opcodes::{Condition, IndexReg, Keyword, Mnemonic, Reg16, Reg8};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Renders a value the way diagnostics show numbers: `$1F`, `-$80`.
pub fn signed_hex(value: &i64) -> String {
    if *value < 0 {
        format!("-${:X}", value.unsigned_abs())
    } else {
        format!("${:X}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("unrecognized character {0:?}")]
    UnknownCharacter(char),

    #[error("{0}")]
    Lexical(String),

    #[error("unhandled token {0}")]
    UnhandledToken(String),

    #[error("expected indirection register, found {0}")]
    ExpectedIndirectionRegister(String),

    #[error("expected ')' after {0}")]
    MissingCloseBracket(String),

    #[error("expected number after {0}")]
    ExpectedNumber(String),

    #[error("displacement {} is outside -128..127", signed_hex(.0))]
    DisplacementOutOfRange(i64),

    #[error("address {} does not fit in 16 bits", signed_hex(.0))]
    AddressOutOfRange(i64),

    #[error("unexpected {0} at start of statement")]
    UnexpectedItem(String),

    #[error("expected ',' before {0}")]
    ExpectedComma(String),

    #[error("expected operand after ','")]
    ExpectedOperand,

    #[error("missing operand for {0}")]
    MissingOperand(String),

    #[error("invalid operands for {mnemonic}: {operands}")]
    InvalidOperands { mnemonic: Mnemonic, operands: String },

    #[error("{mnemonic} with {operand} only accepts register A, found {found}")]
    AccumulatorOnly {
        mnemonic: Mnemonic,
        operand: String,
        found: String,
    },

    #[error("value {} does not fit in {bits} bits", signed_hex(.value))]
    ValueOutOfRange { value: i64, bits: u8 },

    #[error("relative jump to {} is out of range (offset {offset})", signed_hex(.target))]
    RelativeOutOfRange { target: i64, offset: i64 },

    #[error("bit number {0} is outside 0..7")]
    InvalidBit(i64),

    #[error("invalid restart vector {}", signed_hex(.0))]
    InvalidRestart(i64),

    #[error("invalid interrupt mode {0}")]
    InvalidInterruptMode(i64),

    #[error("undefined symbol {0}")]
    UndefinedSymbol(String),

    #[error("symbol {0} is already defined")]
    DuplicateSymbol(String),

    #[error("{name} moved between passes (${sized:04X}, then ${actual:04X})")]
    PhaseError { name: String, sized: u16, actual: u16 },

    #[error("invalid operands for {keyword}: {operands}")]
    InvalidDirective { keyword: Keyword, operands: String },

    #[error("directive {0} is not implemented")]
    NotImplemented(Keyword),

    #[error("{0} instruction set is not implemented")]
    CpuNotImplemented(Cpu),
}

/// An error tied to the source line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {error}")]
pub struct Diagnostic {
    pub line: usize,
    pub error: AssemblerError,
}

impl Diagnostic {
    pub fn new(line: usize, error: AssemblerError) -> Self {
        Self { line, error }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cpu {
    #[default]
    Z80,
    M6502,
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cpu::Z80 => write!(f, "Z80"),
            Cpu::M6502 => write!(f, "6502"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number(u32),
    Str(String),
    Comma,
    Colon,
    Plus,
    Minus,
    Pound,
    LeftBracket,
    RightBracket,
    Unknown(char),
    Error(String),
    End,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Name(name) => write!(f, "{}", name),
            TokenKind::Number(value) => write!(f, "${:X}", value),
            TokenKind::Str(text) => write!(f, "{:?}", text),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Pound => write!(f, "'#'"),
            TokenKind::LeftBracket => write!(f, "'('"),
            TokenKind::RightBracket => write!(f, "')'"),
            TokenKind::Unknown(ch) => write!(f, "{:?}", ch),
            TokenKind::Error(message) => write!(f, "{}", message),
            TokenKind::End => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// A numeric operand, split into bytes and range flags when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Number {
    pub value: i64,
    pub low: u8,
    pub high: u8,
    pub fits8: bool,
    pub fits16: bool,
}

impl Number {
    pub fn new(value: i64) -> Self {
        Self {
            value,
            low: (value & 0xFF) as u8,
            high: ((value >> 8) & 0xFF) as u8,
            fits8: (-128..=255).contains(&value),
            fits16: (-32768..=65535).contains(&value),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", signed_hex(&self.value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Label(String),
    Keyword(Keyword),
    Mnemonic(Mnemonic),
    Register8(Reg8),
    RegisterI,
    RegisterR,
    Register16(Reg16),
    IndirectRegister16(Reg16),
    IndirectIndexed { index: IndexReg, displacement: i8 },
    IndirectC,
    IndirectImmediate(u16),
    IndirectSymbol(String),
    Condition(Condition),
    Number(Number),
    Comma,
    Name(String),
    Str(String),
    /// Stands in for an operand the parser rejected, so the statement
    /// around it is dropped instead of encoded short.
    Invalid,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemKind::Label(name) => write!(f, "{}:", name),
            ItemKind::Keyword(keyword) => write!(f, "{}", keyword),
            ItemKind::Mnemonic(mnemonic) => write!(f, "{}", mnemonic),
            ItemKind::Register8(reg) => write!(f, "{}", reg),
            ItemKind::RegisterI => write!(f, "I"),
            ItemKind::RegisterR => write!(f, "R"),
            ItemKind::Register16(reg) => write!(f, "{}", reg),
            ItemKind::IndirectRegister16(reg) => write!(f, "({})", reg),
            ItemKind::IndirectIndexed {
                index,
                displacement,
            } => {
                if *displacement < 0 {
                    write!(f, "({}-{})", index, displacement.unsigned_abs())
                } else {
                    write!(f, "({}+{})", index, displacement)
                }
            }
            ItemKind::IndirectC => write!(f, "(C)"),
            ItemKind::IndirectImmediate(address) => write!(f, "(${:X})", address),
            ItemKind::IndirectSymbol(name) => write!(f, "({})", name),
            ItemKind::Condition(cc) => write!(f, "{}", cc),
            ItemKind::Number(number) => write!(f, "{}", number),
            ItemKind::Comma => write!(f, "','"),
            ItemKind::Name(name) => write!(f, "{}", name),
            ItemKind::Str(text) => write!(f, "{:?}", text),
            ItemKind::Invalid => write!(f, "invalid operand"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub kind: ItemKind,
    pub line: usize,
}

impl Item {
    pub fn new(kind: ItemKind, line: usize) -> Self {
        Self { kind, line }
    }
}

/// Encoded bytes of one statement, tagged with their load address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub address: u16,
    #[serde(serialize_with = "hex::serde::serialize")]
    pub bytes: Vec<u8>,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ByteRange {
    /// One past the last address covered, without wrapping.
    pub fn end(&self) -> u32 {
        self.address as u32 + self.bytes.len() as u32
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}  {}", self.address, hex::encode_upper(&self.bytes))?;
        if let Some(label) = &self.label {
            write!(f, "  {}:", label)?;
        }
        Ok(())
    }
}
