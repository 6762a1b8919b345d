// SPDX: CC0-1.0

use crate::{
    eval::{Ident, Idents, Program},
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    Number,
};
use anyhow::Context;
use core::{fmt, ops::Range};
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    PrintProg,
    Plot,
    SetWin,
    SetLabels,
    SetExclusion,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::Plot,
            Self::SetWin,
            Self::SetLabels,
            Self::SetExclusion,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set expression to visualize",
            Self::PrintProg => "print program compiled from the expression (for debugging)",
            Self::Plot => "plot expression that has been set to an svg file",
            Self::SetWin => "set domain, y bounds and step count",
            Self::SetLabels => "set x-values of points to label",
            Self::SetExclusion => "set a point to cut out of the curve",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::PrintProg => "prog",
            Self::Plot => "plot",
            Self::SetWin => "window",
            Self::SetLabels => "label",
            Self::SetExclusion => "exclude",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

/// Comma or whitespace separated numbers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberList(pub Vec<Number>);

impl core::str::FromStr for NumberList {
    type Err = core::num::ParseFloatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(|c: char| c == ',' || c.is_ascii_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Number>, _>>()
            .map(Self)
    }
}

impl fmt::Display for NumberList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, val) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{val}")?;
        }
        Ok(())
    }
}

/// One y bound as typed at a prompt: a number, or `auto`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound(pub Option<Number>);

impl core::str::FromStr for Bound {
    type Err = core::num::ParseFloatError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            Ok(Self(None))
        } else {
            s.parse().map(|val| Self(Some(val)))
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(val) => write!(f, "{val}"),
            None => f.write_str("auto"),
        }
    }
}

/// Applies the y bounds entered at the prompts to the current ones. A blank
/// entry (`None`) keeps the current bound and `auto` on either side clears
/// both. Fails when only one bound would be known.
pub fn merge_y_bounds(
    current: Option<Range<Number>>,
    entered: [Option<Bound>; 2],
) -> Result<Option<Range<Number>>, ()> {
    if entered.contains(&Some(Bound(None))) {
        return Ok(None);
    }
    let cur = [
        current.as_ref().map(|y| y.start),
        current.as_ref().map(|y| y.end),
    ];
    let [min, max] = [0, 1].map(|i| entered[i].and_then(|b| b.0).or(cur[i]));
    match (min, max) {
        (Some(min), Some(max)) => Ok(Some(min..max)),
        (None, None) => Ok(None),
        _ => Err(()),
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        // zero-width spans still get a caret
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no expression is defined")
}

/// The known name most similar to `text`, if any is similar enough.
pub fn suggest(text: &str, idents: &Idents) -> Option<(&'static str, Ident)> {
    let text = text.to_ascii_lowercase();
    idents
        .iter()
        .map(|(k, v)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &k.to_ascii_lowercase()),
                (*k, *v),
            )
        })
        .reduce(|(acc_sim, acc_kv), (elem_sim, elem_kv)| {
            // ties go to the alphabetically first name, hash order varies
            if elem_sim > acc_sim || (elem_sim == acc_sim && elem_kv.0 < acc_kv.0) {
                (elem_sim, elem_kv)
            } else {
                (acc_sim, acc_kv)
            }
        })
        .filter(|(sim, _)| *sim > 0.3)
        .map(|(_, kv)| kv)
}

/// Prints a compile error with its location and a hint where one helps.
pub fn report_parse_err<W: Write>(mut out: W, err: &ParseErr, idents: &Idents) -> io::Result<()> {
    writeln!(out)?;
    underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match &err.typ {
        ParseErrTyp::LexErr(lex_err) => match lex_err {
            LexErrTyp::InvalidChar => {
                writeln!(
                    out,
                    "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^()"
                )?;
            }
            LexErrTyp::Unsupported(typ) => match typ {
                TokTyp::Ident
                | TokTyp::Number
                | TokTyp::Op(_)
                | TokTyp::OpenParen
                | TokTyp::CloseParen => {}

                TokTyp::XGreater | TokTyp::XLess => {
                    writeln!(out, "note: expected an expression but found an inequality")?;
                }
                TokTyp::XEqual => {
                    writeln!(
                        out,
                        "note: expected an expression but found an equation, write only the right hand side of 'y = ...'"
                    )?;
                }
                TokTyp::XPipe => writeln!(
                    out,
                    "note: use the 'abs' function to compute absolute value"
                )?,
                TokTyp::XComma => {
                    writeln!(out, "note: every function takes a single argument")?;
                }
                TokTyp::XOpenSquareBracket
                | TokTyp::XCloseSquareBracket
                | TokTyp::XOpenCurly
                | TokTyp::XCloseCurly => {
                    writeln!(out, "note: use parentheses for grouping")?;
                }
            },
        },

        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,

        ParseErrTyp::UnknownIdent { text } => {
            if let Some((key, ident)) = suggest(text, idents) {
                writeln!(out, "note: {} '{key}' has a similar name", ident.kind())?;
            }
        }

        ParseErrTyp::ExpectedParen { name } => {
            writeln!(out, "note: write '{name}(x)' rather than '{name} x'")?;
        }

        ParseErrTyp::ParenMismatch | ParseErrTyp::Empty | ParseErrTyp::MissingOperand => {}
    }
    Ok(())
}
