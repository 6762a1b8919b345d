// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

/// A span of an expression's source. Cloning only bumps a reference count.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    /// Zero-width span just past the end of the source, for errors about
    /// missing input.
    #[inline]
    pub fn end(src: Arc<String>) -> Self {
        let start = src.len();
        Self::new(src, start, 0)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    /// Splits into `[start, start + idx)` and the remainder.
    pub fn split_at(self, idx: usize) -> (Self, Self) {
        let head = Self::new(Arc::clone(&self.src), self.start, idx);
        let tail = Self::new(self.src, self.start + idx, self.len - idx);
        (head, tail)
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    OpenParen,
    CloseParen,

    // recognised so errors can explain them, never accepted
    XComma,
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    /// Token type of a character that is a whole token by itself.
    pub const fn symbol(chr: char) -> Option<Self> {
        Some(match chr {
            '+' => Self::Op(OperatorTyp::Add),
            // unary or binary is decided by the parser
            '-' => Self::Op(OperatorTyp::Sub),
            '*' => Self::Op(OperatorTyp::Mul),
            '/' => Self::Op(OperatorTyp::Div),
            '^' => Self::Op(OperatorTyp::Pow),
            '(' => Self::OpenParen,
            ')' => Self::CloseParen,

            ',' => Self::XComma,
            '>' => Self::XGreater,
            '<' => Self::XLess,
            '=' => Self::XEqual,
            '|' => Self::XPipe,
            '[' => Self::XOpenSquareBracket,
            ']' => Self::XCloseSquareBracket,
            '{' => Self::XOpenCurly,
            '}' => Self::XCloseCurly,
            _ => return None,
        })
    }

    pub const fn is_unsupported(&self) -> bool {
        !matches!(
            self,
            Self::Ident | Self::Number | Self::Op(_) | Self::OpenParen | Self::CloseParen
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LexErrTyp {
    #[error("invalid character")]
    InvalidChar,
    #[error("unsupported character")]
    Unsupported(TokTyp),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

/// Splits an expression into tokens. Stops after the first error.
#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    chars: Peekable<CharIndices<'src>>,
    done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            chars: src.char_indices().peekable(),
            done: false,
        }
    }

    pub const fn src(&self) -> &'src Arc<String> {
        self.src
    }

    fn span(&self, start: usize, len: usize) -> SubStr {
        SubStr::new(Arc::clone(self.src), start, len)
    }

    /// Consumes characters while they satisfy `accept`, returning the byte
    /// length consumed.
    fn run(&mut self, accept: impl Fn(char) -> bool) -> usize {
        let mut len = 0;
        while let Some(&(_, chr)) = self.chars.peek() {
            if !accept(chr) {
                break;
            }
            // accepted characters are all ascii
            len += 1;
            self.chars.next();
        }
        len
    }

    fn fail(&mut self, typ: LexErrTyp, loc: SubStr) -> Option<Result<Tok, LexErr>> {
        self.done = true;
        Some(Err(LexErr { typ, loc }))
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.run(|chr| chr.is_ascii_whitespace());
        let (start, chr) = self.chars.peek().copied()?;

        let (typ, len) = if let Some(typ) = TokTyp::symbol(chr) {
            self.chars.next();
            (typ, 1)
        } else if chr.is_ascii_alphabetic() {
            (TokTyp::Ident, self.run(|c| c.is_ascii_alphabetic()))
        } else if chr.is_ascii_digit() || chr == '.' {
            (TokTyp::Number, self.run(|c| c.is_ascii_digit() || c == '.'))
        } else {
            let loc = self.span(start, chr.len_utf8());
            return self.fail(LexErrTyp::InvalidChar, loc);
        };

        let loc = self.span(start, len);
        if typ.is_unsupported() {
            return self.fail(LexErrTyp::Unsupported(typ), loc);
        }
        Some(Ok(Tok { typ, loc }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Result<Tok, LexErr>> {
        let src = Arc::new(String::from(src));
        Lexer::new(&src).collect()
    }

    fn typs(src: &str) -> Vec<TokTyp> {
        lex(src)
            .into_iter()
            .map(|tok| tok.expect("lex error").typ)
            .collect()
    }

    #[test]
    fn splits_numbers_from_identifiers() {
        assert_eq!(
            typs("2x+3.5"),
            [
                TokTyp::Number,
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Add),
                TokTyp::Number
            ]
        );
    }

    #[test]
    fn whitespace_is_ignored() {
        assert_eq!(typs("  x   -  1 "), typs("x-1"));
    }

    #[test]
    fn token_spans_point_into_source() {
        let toks = lex("sin(x)");
        let tok = toks[0].as_ref().unwrap();
        assert_eq!(tok.loc.get(), "sin");
        assert_eq!(tok.loc.start(), 0);
        let tok = toks[2].as_ref().unwrap();
        assert_eq!(tok.loc.get(), "x");
        assert_eq!(tok.loc.start(), 4);
    }

    #[test]
    fn quotes_are_invalid_and_stop_lexing() {
        let toks = lex("eval('alert(1)')");
        assert_eq!(toks.len(), 3);
        let err = toks[2].as_ref().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::InvalidChar);
        assert_eq!(err.loc.get(), "'");
    }

    #[test]
    fn unsupported_tokens_are_reported() {
        let toks = lex("x = 1");
        let err = toks[1].as_ref().unwrap_err();
        assert_eq!(err.typ, LexErrTyp::Unsupported(TokTyp::XEqual));
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn multibyte_invalid_char_has_full_span() {
        let toks = lex("x·2");
        let err = toks[1].as_ref().unwrap_err();
        assert_eq!(err.loc.get(), "·");
    }
}
