// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tokenizer for condition expressions.

use super::ConditionError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    And,
    Or,
    Not,
    In,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    LParen,
    RParen,
    Comma,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn tokenize(input: &'a str) -> Result<Vec<Token>, ConditionError> {
        let mut lexer = Lexer { input, pos: 0 };
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> ConditionError {
        ConditionError::Syntax {
            pos,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ConditionError> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '%' => TokenKind::Percent,
            '*' if self.peek() == Some('*') => {
                self.bump();
                TokenKind::StarStar
            }
            '*' => TokenKind::Star,
            '/' if self.peek() == Some('/') => {
                self.bump();
                TokenKind::SlashSlash
            }
            '/' => TokenKind::Slash,
            '=' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::EqEq
            }
            '!' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::NotEq
            }
            '<' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Le
            }
            '<' => TokenKind::Lt,
            '>' if self.peek() == Some('=') => {
                self.bump();
                TokenKind::Ge
            }
            '>' => TokenKind::Gt,
            '"' | '\'' => self.string(c, start)?,
            c if c.is_ascii_digit() => self.number(start)?,
            '.' if self.peek().is_some_and(|d| d.is_ascii_digit()) => self.number(start)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.word(start),
            other => return Err(self.error(start, format!("unexpected character '{other}'"))),
        };

        Ok(Some(Token { kind, pos: start }))
    }

    fn string(&mut self, quote: char, start: usize) -> Result<TokenKind, ConditionError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(start, "unterminated string")),
                Some(c) if c == quote => return Ok(TokenKind::Str(value)),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err(self.error(start, "unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, ConditionError> {
        let mut is_float = self.input[start..].starts_with('.');
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else if c == '.' && !is_float {
                is_float = true;
                self.bump();
            } else if (c == 'e' || c == 'E')
                && (self.peek_at(1).is_some_and(|d| d.is_ascii_digit())
                    || (matches!(self.peek_at(1), Some('+' | '-'))
                        && self.peek_at(2).is_some_and(|d| d.is_ascii_digit())))
            {
                is_float = true;
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        if is_float {
            text.parse()
                .map(TokenKind::Float)
                .map_err(|_| self.error(start, format!("invalid number '{text}'")))
        } else {
            text.parse()
                .map(TokenKind::Int)
                .map_err(|_| self.error(start, format!("integer literal '{text}' out of range")))
        }
    }

    fn word(&mut self, start: usize) -> TokenKind {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        match &self.input[start..self.pos] {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "True" | "true" => TokenKind::True,
            "False" | "false" => TokenKind::False,
            ident => TokenKind::Ident(ident.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
