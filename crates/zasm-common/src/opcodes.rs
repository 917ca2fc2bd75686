//! Static name and bit-code tables for the Z80 instruction set.
//!
//! Every table is an exhaustive `match`, so adding a variant without
//! wiring its name or encoding is a compile error.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Org,
    Z80,
    M6502,
    Include,
    Incbin,
    Db,
    Dw,
    Const,
    Macro,
    Endm,
    End,
}

impl Keyword {
    pub const ALL: [Keyword; 11] = [
        Keyword::Org,
        Keyword::Z80,
        Keyword::M6502,
        Keyword::Include,
        Keyword::Incbin,
        Keyword::Db,
        Keyword::Dw,
        Keyword::Const,
        Keyword::Macro,
        Keyword::Endm,
        Keyword::End,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::Org => "ORG",
            Keyword::Z80 => "Z80",
            Keyword::M6502 => "M6502",
            Keyword::Include => "INCLUDE",
            Keyword::Incbin => "INCBIN",
            Keyword::Db => "DB",
            Keyword::Dw => "DW",
            Keyword::Const => "CONST",
            Keyword::Macro => "MACRO",
            Keyword::Endm => "ENDM",
            Keyword::End => "END",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc,
    Add,
    And,
    Bit,
    Call,
    Ccf,
    Cp,
    Cpd,
    Cpdr,
    Cpi,
    Cpir,
    Cpl,
    Daa,
    Dec,
    Di,
    Djnz,
    Ei,
    Ex,
    Exx,
    Halt,
    Im,
    In,
    Inc,
    Ind,
    Indr,
    Ini,
    Inir,
    Jp,
    Jr,
    Ld,
    Ldd,
    Lddr,
    Ldi,
    Ldir,
    Neg,
    Nop,
    Or,
    Otdr,
    Otir,
    Out,
    Outd,
    Outi,
    Pop,
    Push,
    Res,
    Ret,
    Reti,
    Retn,
    Rl,
    Rla,
    Rlc,
    Rlca,
    Rld,
    Rr,
    Rra,
    Rrc,
    Rrca,
    Rrd,
    Rst,
    Sbc,
    Scf,
    Set,
    Sla,
    Sra,
    Srl,
    Sub,
    Xor,
}

impl Mnemonic {
    pub const ALL: [Mnemonic; 67] = [
        Mnemonic::Adc,
        Mnemonic::Add,
        Mnemonic::And,
        Mnemonic::Bit,
        Mnemonic::Call,
        Mnemonic::Ccf,
        Mnemonic::Cp,
        Mnemonic::Cpd,
        Mnemonic::Cpdr,
        Mnemonic::Cpi,
        Mnemonic::Cpir,
        Mnemonic::Cpl,
        Mnemonic::Daa,
        Mnemonic::Dec,
        Mnemonic::Di,
        Mnemonic::Djnz,
        Mnemonic::Ei,
        Mnemonic::Ex,
        Mnemonic::Exx,
        Mnemonic::Halt,
        Mnemonic::Im,
        Mnemonic::In,
        Mnemonic::Inc,
        Mnemonic::Ind,
        Mnemonic::Indr,
        Mnemonic::Ini,
        Mnemonic::Inir,
        Mnemonic::Jp,
        Mnemonic::Jr,
        Mnemonic::Ld,
        Mnemonic::Ldd,
        Mnemonic::Lddr,
        Mnemonic::Ldi,
        Mnemonic::Ldir,
        Mnemonic::Neg,
        Mnemonic::Nop,
        Mnemonic::Or,
        Mnemonic::Otdr,
        Mnemonic::Otir,
        Mnemonic::Out,
        Mnemonic::Outd,
        Mnemonic::Outi,
        Mnemonic::Pop,
        Mnemonic::Push,
        Mnemonic::Res,
        Mnemonic::Ret,
        Mnemonic::Reti,
        Mnemonic::Retn,
        Mnemonic::Rl,
        Mnemonic::Rla,
        Mnemonic::Rlc,
        Mnemonic::Rlca,
        Mnemonic::Rld,
        Mnemonic::Rr,
        Mnemonic::Rra,
        Mnemonic::Rrc,
        Mnemonic::Rrca,
        Mnemonic::Rrd,
        Mnemonic::Rst,
        Mnemonic::Sbc,
        Mnemonic::Scf,
        Mnemonic::Set,
        Mnemonic::Sla,
        Mnemonic::Sra,
        Mnemonic::Srl,
        Mnemonic::Sub,
        Mnemonic::Xor,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mnemonic::Adc => "ADC",
            Mnemonic::Add => "ADD",
            Mnemonic::And => "AND",
            Mnemonic::Bit => "BIT",
            Mnemonic::Call => "CALL",
            Mnemonic::Ccf => "CCF",
            Mnemonic::Cp => "CP",
            Mnemonic::Cpd => "CPD",
            Mnemonic::Cpdr => "CPDR",
            Mnemonic::Cpi => "CPI",
            Mnemonic::Cpir => "CPIR",
            Mnemonic::Cpl => "CPL",
            Mnemonic::Daa => "DAA",
            Mnemonic::Dec => "DEC",
            Mnemonic::Di => "DI",
            Mnemonic::Djnz => "DJNZ",
            Mnemonic::Ei => "EI",
            Mnemonic::Ex => "EX",
            Mnemonic::Exx => "EXX",
            Mnemonic::Halt => "HALT",
            Mnemonic::Im => "IM",
            Mnemonic::In => "IN",
            Mnemonic::Inc => "INC",
            Mnemonic::Ind => "IND",
            Mnemonic::Indr => "INDR",
            Mnemonic::Ini => "INI",
            Mnemonic::Inir => "INIR",
            Mnemonic::Jp => "JP",
            Mnemonic::Jr => "JR",
            Mnemonic::Ld => "LD",
            Mnemonic::Ldd => "LDD",
            Mnemonic::Lddr => "LDDR",
            Mnemonic::Ldi => "LDI",
            Mnemonic::Ldir => "LDIR",
            Mnemonic::Neg => "NEG",
            Mnemonic::Nop => "NOP",
            Mnemonic::Or => "OR",
            Mnemonic::Otdr => "OTDR",
            Mnemonic::Otir => "OTIR",
            Mnemonic::Out => "OUT",
            Mnemonic::Outd => "OUTD",
            Mnemonic::Outi => "OUTI",
            Mnemonic::Pop => "POP",
            Mnemonic::Push => "PUSH",
            Mnemonic::Res => "RES",
            Mnemonic::Ret => "RET",
            Mnemonic::Reti => "RETI",
            Mnemonic::Retn => "RETN",
            Mnemonic::Rl => "RL",
            Mnemonic::Rla => "RLA",
            Mnemonic::Rlc => "RLC",
            Mnemonic::Rlca => "RLCA",
            Mnemonic::Rld => "RLD",
            Mnemonic::Rr => "RR",
            Mnemonic::Rra => "RRA",
            Mnemonic::Rrc => "RRC",
            Mnemonic::Rrca => "RRCA",
            Mnemonic::Rrd => "RRD",
            Mnemonic::Rst => "RST",
            Mnemonic::Sbc => "SBC",
            Mnemonic::Scf => "SCF",
            Mnemonic::Set => "SET",
            Mnemonic::Sla => "SLA",
            Mnemonic::Sra => "SRA",
            Mnemonic::Srl => "SRL",
            Mnemonic::Sub => "SUB",
            Mnemonic::Xor => "XOR",
        }
    }

    /// Encoding of the operand-less form, if the instruction has one.
    pub fn fixed(self) -> Option<&'static [u8]> {
        match self {
            Mnemonic::Nop => Some(&[0x00]),
            Mnemonic::Exx => Some(&[0xD9]),
            Mnemonic::Daa => Some(&[0x27]),
            Mnemonic::Cpl => Some(&[0x2F]),
            Mnemonic::Neg => Some(&[0xED, 0x44]),
            Mnemonic::Ccf => Some(&[0x3F]),
            Mnemonic::Scf => Some(&[0x37]),
            Mnemonic::Halt => Some(&[0x76]),
            Mnemonic::Di => Some(&[0xF3]),
            Mnemonic::Ei => Some(&[0xFB]),
            Mnemonic::Ldi => Some(&[0xED, 0xA0]),
            Mnemonic::Ldir => Some(&[0xED, 0xB0]),
            Mnemonic::Ldd => Some(&[0xED, 0xA8]),
            Mnemonic::Lddr => Some(&[0xED, 0xB8]),
            Mnemonic::Cpi => Some(&[0xED, 0xA1]),
            Mnemonic::Cpir => Some(&[0xED, 0xB1]),
            Mnemonic::Cpd => Some(&[0xED, 0xA9]),
            Mnemonic::Cpdr => Some(&[0xED, 0xB9]),
            Mnemonic::Ini => Some(&[0xED, 0xA2]),
            Mnemonic::Inir => Some(&[0xED, 0xB2]),
            Mnemonic::Ind => Some(&[0xED, 0xAA]),
            Mnemonic::Indr => Some(&[0xED, 0xBA]),
            Mnemonic::Outi => Some(&[0xED, 0xA3]),
            Mnemonic::Otir => Some(&[0xED, 0xB3]),
            Mnemonic::Outd => Some(&[0xED, 0xAB]),
            Mnemonic::Otdr => Some(&[0xED, 0xBB]),
            Mnemonic::Ret => Some(&[0xC9]),
            Mnemonic::Reti => Some(&[0xED, 0x4D]),
            Mnemonic::Retn => Some(&[0xED, 0x45]),
            Mnemonic::Rlca => Some(&[0x07]),
            Mnemonic::Rrca => Some(&[0x0F]),
            Mnemonic::Rla => Some(&[0x17]),
            Mnemonic::Rra => Some(&[0x1F]),
            Mnemonic::Rld => Some(&[0xED, 0x6F]),
            Mnemonic::Rrd => Some(&[0xED, 0x67]),
            Mnemonic::Adc
            | Mnemonic::Add
            | Mnemonic::And
            | Mnemonic::Bit
            | Mnemonic::Call
            | Mnemonic::Cp
            | Mnemonic::Dec
            | Mnemonic::Djnz
            | Mnemonic::Ex
            | Mnemonic::Im
            | Mnemonic::In
            | Mnemonic::Inc
            | Mnemonic::Jp
            | Mnemonic::Jr
            | Mnemonic::Ld
            | Mnemonic::Or
            | Mnemonic::Out
            | Mnemonic::Pop
            | Mnemonic::Push
            | Mnemonic::Res
            | Mnemonic::Rl
            | Mnemonic::Rlc
            | Mnemonic::Rr
            | Mnemonic::Rrc
            | Mnemonic::Rst
            | Mnemonic::Sbc
            | Mnemonic::Set
            | Mnemonic::Sla
            | Mnemonic::Sra
            | Mnemonic::Srl
            | Mnemonic::Sub
            | Mnemonic::Xor => None,
        }
    }

    /// The `ooo` field of the 8-bit arithmetic/logic group.
    pub fn alu_op(self) -> Option<u8> {
        match self {
            Mnemonic::Add => Some(0b000),
            Mnemonic::Adc => Some(0b001),
            Mnemonic::Sub => Some(0b010),
            Mnemonic::Sbc => Some(0b011),
            Mnemonic::And => Some(0b100),
            Mnemonic::Xor => Some(0b101),
            Mnemonic::Or => Some(0b110),
            Mnemonic::Cp => Some(0b111),
            _ => None,
        }
    }

    /// The operation field of the CB-prefixed rotate/shift group.
    pub fn shift_op(self) -> Option<u8> {
        match self {
            Mnemonic::Rlc => Some(0b000),
            Mnemonic::Rrc => Some(0b001),
            Mnemonic::Rl => Some(0b010),
            Mnemonic::Rr => Some(0b011),
            Mnemonic::Sla => Some(0b100),
            Mnemonic::Sra => Some(0b101),
            Mnemonic::Srl => Some(0b111),
            _ => None,
        }
    }

    /// The top two bits of the CB-prefixed bit group.
    pub fn bit_op(self) -> Option<u8> {
        match self {
            Mnemonic::Bit => Some(0x40),
            Mnemonic::Res => Some(0x80),
            Mnemonic::Set => Some(0xC0),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    A,
}

impl Reg8 {
    pub const ALL: [Reg8; 7] = [Reg8::B, Reg8::C, Reg8::D, Reg8::E, Reg8::H, Reg8::L, Reg8::A];

    /// Register field code; 0b110 is never returned, it selects (HL).
    pub fn code(self) -> u8 {
        match self {
            Reg8::B => 0b000,
            Reg8::C => 0b001,
            Reg8::D => 0b010,
            Reg8::E => 0b011,
            Reg8::H => 0b100,
            Reg8::L => 0b101,
            Reg8::A => 0b111,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg8::B => "B",
            Reg8::C => "C",
            Reg8::D => "D",
            Reg8::E => "E",
            Reg8::H => "H",
            Reg8::L => "L",
            Reg8::A => "A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexReg {
    Ix,
    Iy,
}

impl IndexReg {
    pub fn prefix(self) -> u8 {
        match self {
            IndexReg::Ix => 0xDD,
            IndexReg::Iy => 0xFD,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IndexReg::Ix => "IX",
            IndexReg::Iy => "IY",
        }
    }

    pub fn register(self) -> Reg16 {
        match self {
            IndexReg::Ix => Reg16::Ix,
            IndexReg::Iy => Reg16::Iy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg16 {
    Bc,
    De,
    Hl,
    Sp,
    Af,
    AfAlt,
    Ix,
    Iy,
}

impl Reg16 {
    pub const ALL: [Reg16; 8] = [
        Reg16::Bc,
        Reg16::De,
        Reg16::Hl,
        Reg16::Sp,
        Reg16::Af,
        Reg16::AfAlt,
        Reg16::Ix,
        Reg16::Iy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Reg16::Bc => "BC",
            Reg16::De => "DE",
            Reg16::Hl => "HL",
            Reg16::Sp => "SP",
            Reg16::Af => "AF",
            Reg16::AfAlt => "AF'",
            Reg16::Ix => "IX",
            Reg16::Iy => "IY",
        }
    }

    pub fn index(self) -> Option<IndexReg> {
        match self {
            Reg16::Ix => Some(IndexReg::Ix),
            Reg16::Iy => Some(IndexReg::Iy),
            _ => None,
        }
    }

    /// Index-register prefix byte (0xDD / 0xFD) for IX and IY.
    pub fn prefix(self) -> Option<u8> {
        self.index().map(IndexReg::prefix)
    }

    /// `dd`/`ss` pair code used by `LD dd,nn`, `INC ss`, `ADD HL,ss`.
    pub fn pair_code(self) -> Option<u8> {
        match self {
            Reg16::Bc => Some(0b00),
            Reg16::De => Some(0b01),
            Reg16::Hl => Some(0b10),
            Reg16::Sp => Some(0b11),
            _ => None,
        }
    }

    /// `qq` pair code used by `PUSH`/`POP`, where AF takes the SP slot.
    pub fn stack_code(self) -> Option<u8> {
        match self {
            Reg16::Bc => Some(0b00),
            Reg16::De => Some(0b01),
            Reg16::Hl => Some(0b10),
            Reg16::Af => Some(0b11),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Nz,
    Z,
    Nc,
    C,
    Po,
    Pe,
    P,
    M,
}

impl Condition {
    pub const ALL: [Condition; 8] = [
        Condition::Nz,
        Condition::Z,
        Condition::Nc,
        Condition::C,
        Condition::Po,
        Condition::Pe,
        Condition::P,
        Condition::M,
    ];

    pub fn code(self) -> u8 {
        match self {
            Condition::Nz => 0b000,
            Condition::Z => 0b001,
            Condition::Nc => 0b010,
            Condition::C => 0b011,
            Condition::Po => 0b100,
            Condition::Pe => 0b101,
            Condition::P => 0b110,
            Condition::M => 0b111,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Condition::Nz => "NZ",
            Condition::Z => "Z",
            Condition::Nc => "NC",
            Condition::C => "C",
            Condition::Po => "PO",
            Condition::Pe => "PE",
            Condition::P => "P",
            Condition::M => "M",
        }
    }
}

macro_rules! display_by_name {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

display_by_name!(Keyword, Mnemonic, Reg8, IndexReg, Reg16, Condition);

/// Classification of a reserved word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Word {
    Keyword(Keyword),
    Mnemonic(Mnemonic),
    Register8(Reg8),
    RegisterI,
    RegisterR,
    Register16(Reg16),
    Condition(Condition),
}

pub fn word_map() -> HashMap<&'static str, Word> {
    let mut map = HashMap::new();
    for keyword in Keyword::ALL {
        map.insert(keyword.name(), Word::Keyword(keyword));
    }
    for mnemonic in Mnemonic::ALL {
        map.insert(mnemonic.name(), Word::Mnemonic(mnemonic));
    }
    // C is spelled as the register; branch encoding reads it as the carry condition.
    for cc in Condition::ALL.into_iter().filter(|cc| *cc != Condition::C) {
        map.insert(cc.name(), Word::Condition(cc));
    }
    for reg in Reg8::ALL {
        map.insert(reg.name(), Word::Register8(reg));
    }
    for reg in Reg16::ALL {
        map.insert(reg.name(), Word::Register16(reg));
    }
    map.insert("I", Word::RegisterI);
    map.insert("R", Word::RegisterR);
    map
}
