pub mod assembler;
pub mod bundler;
pub mod encoder;
pub mod lexer;
pub mod opcodes;
pub mod parser;
pub mod types;

pub use assembler::{assemble_source, Assembler, Assembly, Program};
pub use bundler::{bundle, flatten, Image};
pub use encoder::{encode, Context, Operand};
pub use lexer::tokenize;
pub use opcodes::{Condition, IndexReg, Keyword, Mnemonic, Reg16, Reg8};
pub use parser::Parser;
pub use types::*;
