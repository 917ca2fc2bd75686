//! Opcode construction, keyed by operand-kind signature.
//!
//! Operands arrive fully classified and with symbols already resolved, so
//! every function here is a pure mapping from `(mnemonic, operands)` to bytes.

use crate::opcodes::{Condition, IndexReg, Mnemonic, Reg16, Reg8};
use crate::types::{AssemblerError, Number};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Reg8(Reg8),
    I,
    R,
    Reg16(Reg16),
    Indirect(Reg16),
    Indexed(IndexReg, i8),
    IndirectC,
    Address(u16),
    Immediate(Number),
    Condition(Condition),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg8(reg) => write!(f, "{}", reg),
            Operand::I => write!(f, "I"),
            Operand::R => write!(f, "R"),
            Operand::Reg16(reg) => write!(f, "{}", reg),
            Operand::Indirect(reg) => write!(f, "({})", reg),
            Operand::Indexed(index, d) if *d < 0 => write!(f, "({}-{})", index, d.unsigned_abs()),
            Operand::Indexed(index, d) => write!(f, "({}+{})", index, d),
            Operand::IndirectC => write!(f, "(C)"),
            Operand::Address(address) => write!(f, "(${:X})", address),
            Operand::Immediate(number) => write!(f, "{}", number),
            Operand::Condition(cc) => write!(f, "{}", cc),
        }
    }
}

/// Where the instruction lands, and whether symbol values are final yet.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub address: u16,
    pub sizing: bool,
}

pub fn encode(
    mnemonic: Mnemonic,
    operands: &[Operand],
    ctx: Context,
) -> Result<Vec<u8>, AssemblerError> {
    Encoder {
        mnemonic,
        operands,
        ctx,
    }
    .encode()
}

/// A register-field position: a plain register, `(HL)`, or `(IX/IY+d)`.
#[derive(Debug, Clone, Copy)]
struct Slot {
    code: u8,
    index: Option<(u8, i8)>,
}

const HL_CODE: u8 = 0b110;

impl Slot {
    fn of(operand: &Operand) -> Option<Slot> {
        match operand {
            Operand::Reg8(reg) => Some(Slot {
                code: reg.code(),
                index: None,
            }),
            Operand::Indirect(Reg16::Hl) => Some(Slot {
                code: HL_CODE,
                index: None,
            }),
            Operand::Indirect(reg) => reg.prefix().map(|prefix| Slot {
                code: HL_CODE,
                index: Some((prefix, 0)),
            }),
            Operand::Indexed(index, d) => Some(Slot {
                code: HL_CODE,
                index: Some((index.prefix(), *d)),
            }),
            _ => None,
        }
    }

    fn is_memory(&self) -> bool {
        self.code == HL_CODE
    }
}

/// prefix, opcode, displacement: the layout shared by every indexed form.
fn with_index(index: Option<(u8, i8)>, opcode: u8) -> Vec<u8> {
    match index {
        Some((prefix, d)) => vec![prefix, opcode, d as u8],
        None => vec![opcode],
    }
}

/// CB-prefixed forms; the indexed layout puts the displacement before the
/// final opcode byte.
fn with_cb(slot: Slot, opcode: u8) -> Vec<u8> {
    match slot.index {
        Some((prefix, d)) => vec![prefix, 0xCB, d as u8, opcode],
        None => vec![0xCB, opcode],
    }
}

pub(crate) fn byte(number: &Number) -> Result<u8, AssemblerError> {
    if number.fits8 {
        Ok(number.low)
    } else {
        Err(AssemblerError::ValueOutOfRange {
            value: number.value,
            bits: 8,
        })
    }
}

pub(crate) fn word(number: &Number) -> Result<[u8; 2], AssemblerError> {
    if number.fits16 {
        Ok([number.low, number.high])
    } else {
        Err(AssemblerError::ValueOutOfRange {
            value: number.value,
            bits: 16,
        })
    }
}

fn condition(operand: &Operand) -> Option<Condition> {
    match operand {
        Operand::Condition(cc) => Some(*cc),
        Operand::Reg8(Reg8::C) => Some(Condition::C),
        _ => None,
    }
}

struct Encoder<'a> {
    mnemonic: Mnemonic,
    operands: &'a [Operand],
    ctx: Context,
}

impl<'a> Encoder<'a> {
    fn invalid(&self) -> AssemblerError {
        AssemblerError::InvalidOperands {
            mnemonic: self.mnemonic,
            operands: self
                .operands
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn accumulator_only(&self, operand: &Operand, found: &Operand) -> AssemblerError {
        AssemblerError::AccumulatorOnly {
            mnemonic: self.mnemonic,
            operand: operand.to_string(),
            found: found.to_string(),
        }
    }

    fn encode(&self) -> Result<Vec<u8>, AssemblerError> {
        if self.operands.is_empty() {
            return self
                .mnemonic
                .fixed()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| AssemblerError::MissingOperand(self.mnemonic.to_string()));
        }

        match self.mnemonic {
            Mnemonic::Add | Mnemonic::Adc | Mnemonic::Sbc
                if matches!(self.operands, [Operand::Reg16(_), _]) =>
            {
                self.add16()
            }
            Mnemonic::Add
            | Mnemonic::Adc
            | Mnemonic::Sub
            | Mnemonic::Sbc
            | Mnemonic::And
            | Mnemonic::Xor
            | Mnemonic::Or
            | Mnemonic::Cp => self.alu(),
            Mnemonic::Rlc
            | Mnemonic::Rrc
            | Mnemonic::Rl
            | Mnemonic::Rr
            | Mnemonic::Sla
            | Mnemonic::Sra
            | Mnemonic::Srl => self.shift(),
            Mnemonic::Bit | Mnemonic::Res | Mnemonic::Set => self.bit(),
            Mnemonic::Ld => self.load(),
            Mnemonic::Inc | Mnemonic::Dec => self.inc_dec(),
            Mnemonic::Push | Mnemonic::Pop => self.stack(),
            Mnemonic::Ex => self.exchange(),
            Mnemonic::Jp => self.jump(),
            Mnemonic::Jr | Mnemonic::Djnz => self.relative_jump(),
            Mnemonic::Call => self.call(),
            Mnemonic::Ret => self.ret(),
            Mnemonic::Rst => self.restart(),
            Mnemonic::Im => self.interrupt_mode(),
            Mnemonic::In => self.input(),
            Mnemonic::Out => self.output(),
            Mnemonic::Ccf
            | Mnemonic::Cpd
            | Mnemonic::Cpdr
            | Mnemonic::Cpi
            | Mnemonic::Cpir
            | Mnemonic::Cpl
            | Mnemonic::Daa
            | Mnemonic::Di
            | Mnemonic::Ei
            | Mnemonic::Exx
            | Mnemonic::Halt
            | Mnemonic::Ind
            | Mnemonic::Indr
            | Mnemonic::Ini
            | Mnemonic::Inir
            | Mnemonic::Ldd
            | Mnemonic::Lddr
            | Mnemonic::Ldi
            | Mnemonic::Ldir
            | Mnemonic::Neg
            | Mnemonic::Nop
            | Mnemonic::Otdr
            | Mnemonic::Otir
            | Mnemonic::Outd
            | Mnemonic::Outi
            | Mnemonic::Reti
            | Mnemonic::Retn
            | Mnemonic::Rla
            | Mnemonic::Rlca
            | Mnemonic::Rld
            | Mnemonic::Rra
            | Mnemonic::Rrca
            | Mnemonic::Rrd
            | Mnemonic::Scf => Err(self.invalid()),
        }
    }

    fn load(&self) -> Result<Vec<u8>, AssemblerError> {
        let (dst, src) = match self.operands {
            [dst, src] => (dst, src),
            _ => return Err(self.invalid()),
        };
        let a = Operand::Reg8(Reg8::A);

        match (dst, src) {
            (Operand::I, src) if *src == a => Ok(vec![0xED, 0x47]),
            (Operand::R, src) if *src == a => Ok(vec![0xED, 0x4F]),
            (dst, Operand::I) if *dst == a => Ok(vec![0xED, 0x57]),
            (dst, Operand::R) if *dst == a => Ok(vec![0xED, 0x5F]),
            (Operand::I | Operand::R, other) => Err(self.accumulator_only(dst, other)),
            (other, Operand::I | Operand::R) => Err(self.accumulator_only(src, other)),

            (Operand::Reg8(Reg8::A), Operand::Indirect(Reg16::Bc)) => Ok(vec![0x0A]),
            (Operand::Reg8(Reg8::A), Operand::Indirect(Reg16::De)) => Ok(vec![0x1A]),
            (Operand::Indirect(Reg16::Bc), Operand::Reg8(Reg8::A)) => Ok(vec![0x02]),
            (Operand::Indirect(Reg16::De), Operand::Reg8(Reg8::A)) => Ok(vec![0x12]),
            (Operand::Reg8(Reg8::A), Operand::Address(nn)) => {
                let [lo, hi] = nn.to_le_bytes();
                Ok(vec![0x3A, lo, hi])
            }
            (Operand::Address(nn), Operand::Reg8(Reg8::A)) => {
                let [lo, hi] = nn.to_le_bytes();
                Ok(vec![0x32, lo, hi])
            }
            (Operand::Reg8(_), Operand::Indirect(Reg16::Bc | Reg16::De) | Operand::Address(_)) => {
                Err(self.accumulator_only(src, dst))
            }
            (Operand::Indirect(Reg16::Bc | Reg16::De) | Operand::Address(_), Operand::Reg8(_)) => {
                Err(self.accumulator_only(dst, src))
            }

            (Operand::Reg16(Reg16::Sp), Operand::Reg16(Reg16::Hl)) => Ok(vec![0xF9]),
            (Operand::Reg16(Reg16::Sp), Operand::Reg16(Reg16::Ix)) => {
                Ok(vec![IndexReg::Ix.prefix(), 0xF9])
            }
            (Operand::Reg16(Reg16::Sp), Operand::Reg16(Reg16::Iy)) => {
                Ok(vec![IndexReg::Iy.prefix(), 0xF9])
            }
            (Operand::Reg16(reg), Operand::Immediate(nn)) => {
                let [lo, hi] = word(nn)?;
                match (reg.prefix(), reg.pair_code()) {
                    (Some(prefix), _) => Ok(vec![prefix, 0x21, lo, hi]),
                    (None, Some(dd)) => Ok(vec![0x01 | dd << 4, lo, hi]),
                    (None, None) => Err(self.invalid()),
                }
            }
            (Operand::Reg16(reg), Operand::Address(nn)) => {
                let [lo, hi] = nn.to_le_bytes();
                match (reg, reg.prefix(), reg.pair_code()) {
                    (Reg16::Hl, _, _) => Ok(vec![0x2A, lo, hi]),
                    (_, Some(prefix), _) => Ok(vec![prefix, 0x2A, lo, hi]),
                    (_, None, Some(dd)) => Ok(vec![0xED, 0x4B | dd << 4, lo, hi]),
                    _ => Err(self.invalid()),
                }
            }
            (Operand::Address(nn), Operand::Reg16(reg)) => {
                let [lo, hi] = nn.to_le_bytes();
                match (reg, reg.prefix(), reg.pair_code()) {
                    (Reg16::Hl, _, _) => Ok(vec![0x22, lo, hi]),
                    (_, Some(prefix), _) => Ok(vec![prefix, 0x22, lo, hi]),
                    (_, None, Some(dd)) => Ok(vec![0xED, 0x43 | dd << 4, lo, hi]),
                    _ => Err(self.invalid()),
                }
            }

            (dst, Operand::Immediate(n)) => {
                let d = Slot::of(dst).ok_or_else(|| self.invalid())?;
                let mut bytes = with_index(d.index, 0x06 | d.code << 3);
                bytes.push(byte(n)?);
                Ok(bytes)
            }
            (dst, src) => match (Slot::of(dst), Slot::of(src)) {
                (Some(d), Some(s)) if !(d.is_memory() && s.is_memory()) => {
                    Ok(with_index(d.index.or(s.index), 0x40 | d.code << 3 | s.code))
                }
                _ => Err(self.invalid()),
            },
        }
    }

    fn alu(&self) -> Result<Vec<u8>, AssemblerError> {
        let op = self.mnemonic.alu_op().ok_or_else(|| self.invalid())?;
        let src = match self.operands {
            [Operand::Reg8(Reg8::A), src] => src,
            [src] => src,
            _ => return Err(self.invalid()),
        };
        match src {
            Operand::Immediate(n) => Ok(vec![0xC6 | op << 3, byte(n)?]),
            other => {
                let s = Slot::of(other).ok_or_else(|| self.invalid())?;
                Ok(with_index(s.index, 0x80 | op << 3 | s.code))
            }
        }
    }

    fn add16(&self) -> Result<Vec<u8>, AssemblerError> {
        let (dst, src) = match self.operands {
            [Operand::Reg16(dst), Operand::Reg16(src)] => (*dst, *src),
            _ => return Err(self.invalid()),
        };
        match (self.mnemonic, dst, dst.prefix()) {
            (Mnemonic::Add, Reg16::Hl, _) => {
                let ss = src.pair_code().ok_or_else(|| self.invalid())?;
                Ok(vec![0x09 | ss << 4])
            }
            (Mnemonic::Add, _, Some(prefix)) => {
                // the index register itself takes the HL slot
                let pp = match src {
                    _ if src == dst => 0b10,
                    Reg16::Bc => 0b00,
                    Reg16::De => 0b01,
                    Reg16::Sp => 0b11,
                    _ => return Err(self.invalid()),
                };
                Ok(vec![prefix, 0x09 | pp << 4])
            }
            (Mnemonic::Adc, Reg16::Hl, _) => {
                let ss = src.pair_code().ok_or_else(|| self.invalid())?;
                Ok(vec![0xED, 0x4A | ss << 4])
            }
            (Mnemonic::Sbc, Reg16::Hl, _) => {
                let ss = src.pair_code().ok_or_else(|| self.invalid())?;
                Ok(vec![0xED, 0x42 | ss << 4])
            }
            _ => Err(self.invalid()),
        }
    }

    fn inc_dec(&self) -> Result<Vec<u8>, AssemblerError> {
        let dec = self.mnemonic == Mnemonic::Dec;
        match self.operands {
            [Operand::Reg16(reg)] => {
                if let Some(prefix) = reg.prefix() {
                    Ok(vec![prefix, if dec { 0x2B } else { 0x23 }])
                } else {
                    let ss = reg.pair_code().ok_or_else(|| self.invalid())?;
                    let base = if dec { 0x0B } else { 0x03 };
                    Ok(vec![base | ss << 4])
                }
            }
            [operand] => {
                let s = Slot::of(operand).ok_or_else(|| self.invalid())?;
                let base = if dec { 0x05 } else { 0x04 };
                Ok(with_index(s.index, base | s.code << 3))
            }
            _ => Err(self.invalid()),
        }
    }

    fn stack(&self) -> Result<Vec<u8>, AssemblerError> {
        let base = if self.mnemonic == Mnemonic::Push { 0xC5 } else { 0xC1 };
        match self.operands {
            [Operand::Reg16(reg)] => {
                if let Some(prefix) = reg.prefix() {
                    Ok(vec![prefix, base | 0b10 << 4])
                } else {
                    let qq = reg.stack_code().ok_or_else(|| self.invalid())?;
                    Ok(vec![base | qq << 4])
                }
            }
            _ => Err(self.invalid()),
        }
    }

    fn exchange(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Reg16(Reg16::De), Operand::Reg16(Reg16::Hl)] => Ok(vec![0xEB]),
            [Operand::Reg16(Reg16::Af), Operand::Reg16(Reg16::AfAlt)] => Ok(vec![0x08]),
            [Operand::Indirect(Reg16::Sp), Operand::Reg16(Reg16::Hl)] => Ok(vec![0xE3]),
            [Operand::Indirect(Reg16::Sp), Operand::Reg16(reg)] => match reg.prefix() {
                Some(prefix) => Ok(vec![prefix, 0xE3]),
                None => Err(self.invalid()),
            },
            _ => Err(self.invalid()),
        }
    }

    fn jump(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Immediate(nn)] => {
                let [lo, hi] = word(nn)?;
                Ok(vec![0xC3, lo, hi])
            }
            [Operand::Indirect(Reg16::Hl)] => Ok(vec![0xE9]),
            [Operand::Indirect(reg)] => match reg.prefix() {
                Some(prefix) => Ok(vec![prefix, 0xE9]),
                None => Err(self.invalid()),
            },
            [cc, Operand::Immediate(nn)] => {
                let cc = condition(cc).ok_or_else(|| self.invalid())?;
                let [lo, hi] = word(nn)?;
                Ok(vec![0xC2 | cc.code() << 3, lo, hi])
            }
            _ => Err(self.invalid()),
        }
    }

    /// Displacement from the byte after the two-byte instruction.
    fn displacement(&self, target: &Number) -> Result<u8, AssemblerError> {
        if self.ctx.sizing {
            return Ok(0);
        }
        word(target)?;
        let offset = target.value - (self.ctx.address as i64 + 2);
        match i8::try_from(offset) {
            Ok(offset) => Ok(offset as u8),
            Err(_) => Err(AssemblerError::RelativeOutOfRange {
                target: target.value,
                offset,
            }),
        }
    }

    fn relative_jump(&self) -> Result<Vec<u8>, AssemblerError> {
        match (self.mnemonic, self.operands) {
            (Mnemonic::Djnz, [Operand::Immediate(target)]) => {
                Ok(vec![0x10, self.displacement(target)?])
            }
            (Mnemonic::Jr, [Operand::Immediate(target)]) => {
                Ok(vec![0x18, self.displacement(target)?])
            }
            (Mnemonic::Jr, [cc, Operand::Immediate(target)]) => match condition(cc) {
                Some(cc @ (Condition::Nz | Condition::Z | Condition::Nc | Condition::C)) => {
                    Ok(vec![0x20 | cc.code() << 3, self.displacement(target)?])
                }
                _ => Err(self.invalid()),
            },
            _ => Err(self.invalid()),
        }
    }

    fn call(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Immediate(nn)] => {
                let [lo, hi] = word(nn)?;
                Ok(vec![0xCD, lo, hi])
            }
            [cc, Operand::Immediate(nn)] => {
                let cc = condition(cc).ok_or_else(|| self.invalid())?;
                let [lo, hi] = word(nn)?;
                Ok(vec![0xC4 | cc.code() << 3, lo, hi])
            }
            _ => Err(self.invalid()),
        }
    }

    fn ret(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [cc] => {
                let cc = condition(cc).ok_or_else(|| self.invalid())?;
                Ok(vec![0xC0 | cc.code() << 3])
            }
            _ => Err(self.invalid()),
        }
    }

    fn restart(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Immediate(n)] => match n.value {
                0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => {
                    Ok(vec![0xC7 | n.low])
                }
                value => Err(AssemblerError::InvalidRestart(value)),
            },
            _ => Err(self.invalid()),
        }
    }

    fn interrupt_mode(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Immediate(n)] => match n.value {
                0 => Ok(vec![0xED, 0x46]),
                1 => Ok(vec![0xED, 0x56]),
                2 => Ok(vec![0xED, 0x5E]),
                value => Err(AssemblerError::InvalidInterruptMode(value)),
            },
            _ => Err(self.invalid()),
        }
    }

    fn port(&self, address: u16) -> Result<u8, AssemblerError> {
        u8::try_from(address).map_err(|_| AssemblerError::ValueOutOfRange {
            value: address as i64,
            bits: 8,
        })
    }

    fn input(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Reg8(Reg8::A), Operand::Address(port)] => Ok(vec![0xDB, self.port(*port)?]),
            [reg @ Operand::Reg8(_), port @ Operand::Address(_)] => {
                Err(self.accumulator_only(port, reg))
            }
            [Operand::Reg8(reg), Operand::IndirectC] => Ok(vec![0xED, 0x40 | reg.code() << 3]),
            _ => Err(self.invalid()),
        }
    }

    fn output(&self) -> Result<Vec<u8>, AssemblerError> {
        match self.operands {
            [Operand::Address(port), Operand::Reg8(Reg8::A)] => Ok(vec![0xD3, self.port(*port)?]),
            [port @ Operand::Address(_), reg @ Operand::Reg8(_)] => {
                Err(self.accumulator_only(port, reg))
            }
            [Operand::IndirectC, Operand::Reg8(reg)] => Ok(vec![0xED, 0x41 | reg.code() << 3]),
            _ => Err(self.invalid()),
        }
    }

    fn shift(&self) -> Result<Vec<u8>, AssemblerError> {
        let op = self.mnemonic.shift_op().ok_or_else(|| self.invalid())?;
        match self.operands {
            [operand] => {
                let s = Slot::of(operand).ok_or_else(|| self.invalid())?;
                Ok(with_cb(s, op << 3 | s.code))
            }
            _ => Err(self.invalid()),
        }
    }

    fn bit(&self) -> Result<Vec<u8>, AssemblerError> {
        let base = self.mnemonic.bit_op().ok_or_else(|| self.invalid())?;
        match self.operands {
            [Operand::Immediate(b), operand] => {
                if !(0..=7).contains(&b.value) {
                    return Err(AssemblerError::InvalidBit(b.value));
                }
                let s = Slot::of(operand).ok_or_else(|| self.invalid())?;
                Ok(with_cb(s, base | b.low << 3 | s.code))
            }
            _ => Err(self.invalid()),
        }
    }
}
