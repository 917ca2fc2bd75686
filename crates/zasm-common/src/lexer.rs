//! Turns source text into a flat token stream.
//!
//! Malformed input never stops the lexer: bad characters become
//! [`TokenKind::Unknown`] and bad literals become [`TokenKind::Error`], both
//! reported by the parser.

use crate::types::{Token, TokenKind};
use std::iter::Peekable;
use std::str::Chars;

pub fn tokenize(text: &str) -> Vec<Token> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(ch) = self.chars.next() {
            match ch {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => {}
                ';' => self.skip_comment(),
                ',' => self.push(TokenKind::Comma),
                ':' => self.push(TokenKind::Colon),
                '+' => self.push(TokenKind::Plus),
                '-' => self.push(TokenKind::Minus),
                '#' => self.push(TokenKind::Pound),
                '(' => self.push(TokenKind::LeftBracket),
                ')' => self.push(TokenKind::RightBracket),
                '"' => self.string(),
                '$' => self.number(ch.to_string(), 16),
                '%' => self.number(ch.to_string(), 2),
                '0'..='9' => self.number(ch.to_string(), 10),
                c if c.is_ascii_alphabetic() || c == '_' => self.name(c),
                c => self.push(TokenKind::Unknown(c)),
            }
        }
        self.push(TokenKind::End);
        self.tokens
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    fn skip_comment(&mut self) {
        while self.chars.next_if(|c| *c != '\n').is_some() {}
    }

    fn take_word(&mut self, word: &mut String) {
        while let Some(c) = self.chars.next_if(|c| c.is_ascii_alphanumeric() || *c == '_') {
            word.push(c);
        }
    }

    fn name(&mut self, first: char) {
        let mut word = first.to_string();
        self.take_word(&mut word);
        word.make_ascii_uppercase();
        if word == "AF" && self.chars.next_if_eq(&'\'').is_some() {
            word.push('\'');
        }
        self.push(TokenKind::Name(word));
    }

    /// `literal` holds what was consumed so far: the prefix, or the first
    /// decimal digit.
    fn number(&mut self, mut literal: String, radix: u32) {
        self.take_word(&mut literal);
        let digits = if radix == 10 { &literal[..] } else { &literal[1..] };
        let kind = if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            TokenKind::Error(format!("malformed numeric literal {}", literal))
        } else {
            match u32::from_str_radix(digits, radix) {
                Ok(value) => TokenKind::Number(value),
                Err(_) => TokenKind::Error(format!("numeric literal {} is too large", literal)),
            }
        };
        self.push(kind);
    }

    fn string(&mut self) {
        let mut text = String::new();
        loop {
            match self.chars.next_if(|c| *c != '\n') {
                Some('"') => {
                    self.push(TokenKind::Str(text));
                    return;
                }
                Some('\\') => {
                    if let Some(c) = self.chars.next_if(|c| *c != '\n') {
                        text.push(c);
                    }
                }
                Some(c) => text.push(c),
                None => {
                    self.push(TokenKind::Error("unterminated string".to_string()));
                    return;
                }
            }
        }
    }
}
