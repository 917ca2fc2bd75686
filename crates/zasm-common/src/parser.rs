//! Classifies tokens into items with fully disambiguated operand kinds.

use crate::opcodes::{word_map, IndexReg, Reg16, Reg8, Word};
use crate::types::*;
use std::collections::HashMap;

pub struct Parser {
    word_map: HashMap<&'static str, Word>,
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next_if(&mut self, pred: impl FnOnce(&TokenKind) -> bool) -> Option<&'a Token> {
        match self.peek() {
            Some(token) if pred(&token.kind) => self.next(),
            _ => None,
        }
    }

    /// Like `next_if`, but never crosses into the next line.
    fn next_on_line(
        &mut self,
        line: usize,
        pred: impl FnOnce(&TokenKind) -> bool,
    ) -> Option<&'a Token> {
        match self.peek() {
            Some(token)
                if token.line == line && token.kind != TokenKind::End && pred(&token.kind) =>
            {
                self.next()
            }
            _ => None,
        }
    }

    /// Skips the remains of a broken indirection: up to and including `)`
    /// on the same line.
    fn recover(&mut self, line: usize) {
        while let Some(token) = self.next_if(|kind| *kind != TokenKind::End) {
            if token.line != line {
                self.pos -= 1;
                return;
            }
            if token.kind == TokenKind::RightBracket {
                return;
            }
        }
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            word_map: word_map(),
        }
    }

    pub fn parse(&self, tokens: &[Token]) -> (Vec<Item>, Vec<Diagnostic>) {
        let mut items = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = Cursor { tokens, pos: 0 };

        while let Some(token) = cursor.next() {
            let line = token.line;
            let result = match &token.kind {
                TokenKind::End => break,
                TokenKind::Comma => Ok(ItemKind::Comma),
                TokenKind::Number(value) => Ok(ItemKind::Number(Number::new(*value as i64))),
                TokenKind::Str(text) => Ok(ItemKind::Str(text.clone())),
                TokenKind::Name(name) => {
                    if cursor
                        .next_on_line(line, |kind| *kind == TokenKind::Colon)
                        .is_some()
                    {
                        Ok(ItemKind::Label(name.clone()))
                    } else {
                        Ok(self.classify(name))
                    }
                }
                TokenKind::LeftBracket => {
                    let result = self.indirection(&mut cursor, line);
                    if result.is_err() {
                        cursor.recover(line);
                    }
                    result
                }
                TokenKind::Pound | TokenKind::Plus | TokenKind::Minus => {
                    Self::immediate(&token.kind, &mut cursor, line)
                }
                TokenKind::Unknown(ch) => Err(AssemblerError::UnknownCharacter(*ch)),
                TokenKind::Error(message) => Err(AssemblerError::Lexical(message.clone())),
                TokenKind::Colon | TokenKind::RightBracket => {
                    Err(AssemblerError::UnhandledToken(token.kind.to_string()))
                }
            };
            match result {
                Ok(kind) => items.push(Item::new(kind, line)),
                Err(error) => {
                    errors.push(Diagnostic::new(line, error));
                    items.push(Item::new(ItemKind::Invalid, line));
                }
            }
        }

        (items, errors)
    }

    fn classify(&self, name: &str) -> ItemKind {
        match self.word_map.get(name) {
            Some(Word::Keyword(keyword)) => ItemKind::Keyword(*keyword),
            Some(Word::Mnemonic(mnemonic)) => ItemKind::Mnemonic(*mnemonic),
            Some(Word::Register8(reg)) => ItemKind::Register8(*reg),
            Some(Word::RegisterI) => ItemKind::RegisterI,
            Some(Word::RegisterR) => ItemKind::RegisterR,
            Some(Word::Register16(reg)) => ItemKind::Register16(*reg),
            Some(Word::Condition(cc)) => ItemKind::Condition(*cc),
            None => ItemKind::Name(name.to_string()),
        }
    }

    /// `#n`, `+n` and `-n` immediates.
    fn immediate(
        sign: &TokenKind,
        cursor: &mut Cursor,
        line: usize,
    ) -> Result<ItemKind, AssemblerError> {
        let value = match cursor.next_on_line(line, |kind| matches!(kind, TokenKind::Number(_))) {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => *value as i64,
            _ if *sign == TokenKind::Pound => {
                return Err(AssemblerError::ExpectedNumber(sign.to_string()))
            }
            _ => return Err(AssemblerError::UnhandledToken(sign.to_string())),
        };
        let value = if *sign == TokenKind::Minus { -value } else { value };
        Ok(ItemKind::Number(Number::new(value)))
    }

    /// Called after `(`; consumes through the matching `)`, which must be on
    /// the same line.
    fn indirection(&self, cursor: &mut Cursor, line: usize) -> Result<ItemKind, AssemblerError> {
        let inner = match cursor.next_on_line(line, |_| true) {
            Some(token) => token,
            None => {
                return Err(AssemblerError::ExpectedIndirectionRegister(
                    "end of line".to_string(),
                ))
            }
        };

        let kind = match &inner.kind {
            TokenKind::Number(value) => {
                let value = *value as i64;
                if value > 0xFFFF {
                    return Err(AssemblerError::AddressOutOfRange(value));
                }
                ItemKind::IndirectImmediate(value as u16)
            }
            TokenKind::Name(name) => match self.classify(name) {
                ItemKind::Register16(reg) => match (reg, reg.index()) {
                    (_, Some(index)) => Self::indexed(index, cursor, line)?,
                    (Reg16::Hl | Reg16::Bc | Reg16::De | Reg16::Sp, None) => {
                        ItemKind::IndirectRegister16(reg)
                    }
                    _ => return Err(AssemblerError::ExpectedIndirectionRegister(reg.to_string())),
                },
                ItemKind::Register8(Reg8::C) => ItemKind::IndirectC,
                ItemKind::Name(name) => ItemKind::IndirectSymbol(name),
                other => {
                    return Err(AssemblerError::ExpectedIndirectionRegister(
                        other.to_string(),
                    ))
                }
            },
            other => {
                return Err(AssemblerError::ExpectedIndirectionRegister(
                    other.to_string(),
                ))
            }
        };

        if cursor
            .next_on_line(line, |kind| *kind == TokenKind::RightBracket)
            .is_none()
        {
            return Err(AssemblerError::MissingCloseBracket(kind.to_string()));
        }
        Ok(kind)
    }

    /// `(IX` / `(IY` followed by an optional signed displacement.
    fn indexed(
        index: IndexReg,
        cursor: &mut Cursor,
        line: usize,
    ) -> Result<ItemKind, AssemblerError> {
        let signed = cursor.next_on_line(line, |kind| {
            matches!(kind, TokenKind::Plus | TokenKind::Minus)
        });
        let negative = match signed {
            Some(sign) => sign.kind == TokenKind::Minus,
            None => return Ok(ItemKind::IndirectRegister16(index.register())),
        };
        let magnitude = match cursor.next_on_line(line, |kind| matches!(kind, TokenKind::Number(_))) {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => *value as i64,
            _ => {
                let sign = if negative { "-" } else { "+" };
                return Err(AssemblerError::ExpectedNumber(format!("{}{}", index, sign)));
            }
        };
        let displacement = if negative { -magnitude } else { magnitude };
        let displacement = i8::try_from(displacement)
            .map_err(|_| AssemblerError::DisplacementOutOfRange(displacement))?;
        Ok(ItemKind::IndirectIndexed {
            index,
            displacement,
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
