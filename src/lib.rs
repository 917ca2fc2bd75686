//! Two-pass Z80 assembler.
//!
//! Source text flows through [`tokenize`], [`Parser`], [`Assembler`] and
//! [`bundle`]; [`assemble_source`] runs all four. [`z80_asm!`] does the same
//! at compile time.

pub use zasm_common::*;
pub use zasm_macros::*;

#[cfg(test)]
mod tests;
