// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Fun, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::num::ParseFloatError;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrTyp {
    #[error("{0}")]
    LexErr(LexErrTyp),
    #[error("invalid number: {0}")]
    ParseNum(ParseFloatError),
    #[error("mismatched parentheses")]
    ParenMismatch,
    #[error("expression is empty")]
    Empty,
    #[error("missing operand")]
    MissingOperand,
    #[error("expected '(' after function '{name}'")]
    ExpectedParen { name: &'static str },
    #[error("unknown identifier '{text}'")]
    UnknownIdent { text: String },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{typ}")]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun(Fun),
    OpenParen,
}

#[derive(Clone, Debug)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

/// One unit of input after identifiers have been resolved and split.
#[derive(Debug)]
enum Item {
    Operand(Operation),
    Fun(Fun, SubStr),
    Op(OperatorTyp, SubStr),
    OpenParen(SubStr),
    CloseParen(SubStr),
}

impl Item {
    fn loc(&self) -> &SubStr {
        match self {
            Self::Operand(op) => &op.loc,
            Self::Fun(_, loc) | Self::Op(_, loc) | Self::OpenParen(loc) | Self::CloseParen(loc) => {
                loc
            }
        }
    }

    const fn starts_operand(&self) -> bool {
        matches!(self, Self::Operand(_) | Self::Fun(..) | Self::OpenParen(_))
    }
}

#[derive(Debug)]
struct Shunt {
    out: Vec<Operation>,    // output
    ops: Vec<ShuntOp>,      // operator stack
    ends_operand: bool,     // last item can be followed by a binary operator
    awaiting: Option<(Fun, SubStr)>, // function name that must see '(' next
}

impl Shunt {
    const fn new() -> Self {
        Self {
            out: Vec::new(),
            ops: Vec::new(),
            ends_operand: false,
            awaiting: None,
        }
    }

    fn feed(&mut self, item: Item) -> Result<(), ParseErr> {
        if let Some((fun, loc)) = self.awaiting.take() {
            if !matches!(item, Item::OpenParen(_)) {
                return Err(ParseErr {
                    typ: ParseErrTyp::ExpectedParen { name: fun.name },
                    loc,
                });
            }
        }

        if self.ends_operand && item.starts_operand() {
            // implicit multiplication, as in `2x` or `(x+1)(x-1)`
            let loc = item.loc();
            self.binary(OperatorTyp::Mul, SubStr::new(loc.src(), loc.start(), 0));
        }

        match item {
            Item::Operand(op) => {
                self.out.push(op);
                self.ends_operand = true;
            }

            Item::Fun(fun, loc) => {
                self.ops.push(ShuntOp {
                    typ: ShuntOpTyp::Fun(fun),
                    loc: loc.clone(),
                });
                self.awaiting = Some((fun, loc));
                self.ends_operand = false;
            }

            Item::OpenParen(loc) => {
                self.ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc,
                });
                self.ends_operand = false;
            }

            Item::CloseParen(loc) => {
                if !self.ends_operand {
                    return Err(ParseErr {
                        typ: ParseErrTyp::MissingOperand,
                        loc,
                    });
                }

                loop {
                    match self.ops.pop() {
                        Some(ShuntOp {
                            typ: ShuntOpTyp::OpenParen,
                            ..
                        }) => break,
                        Some(op) => self.out.extend(op.into_output()),
                        None => {
                            return Err(ParseErr {
                                typ: ParseErrTyp::ParenMismatch,
                                loc,
                            })
                        }
                    }
                }

                // handle functions
                if let Some(ShuntOp {
                    typ: ShuntOpTyp::Fun(_),
                    ..
                }) = self.ops.last()
                {
                    if let Some(op) = self.ops.pop() {
                        self.out.extend(op.into_output());
                    }
                }
                self.ends_operand = true;
            }

            Item::Op(typ, loc) => {
                if self.ends_operand {
                    self.binary(typ, loc);
                } else {
                    // prefix position
                    match typ {
                        OperatorTyp::Sub | OperatorTyp::Neg => self.ops.push(ShuntOp {
                            typ: ShuntOpTyp::Operator(OperatorTyp::Neg),
                            loc,
                        }),
                        OperatorTyp::Add => {}
                        OperatorTyp::Mul | OperatorTyp::Div | OperatorTyp::Pow => {
                            return Err(ParseErr {
                                typ: ParseErrTyp::MissingOperand,
                                loc,
                            })
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn binary(&mut self, o1: OperatorTyp, loc: SubStr) {
        while let Some(ShuntOp {
            typ: ShuntOpTyp::Operator(o2),
            ..
        }) = self.ops.last()
        {
            if (o2.precedence() > o1.precedence())
                || ((o1.precedence() == o2.precedence())
                    && (o1.associativity() == Associativity::Left))
            {
                if let Some(op) = self.ops.pop() {
                    self.out.extend(op.into_output());
                }
            } else {
                break;
            }
        }
        self.ops.push(ShuntOp {
            typ: ShuntOpTyp::Operator(o1),
            loc,
        });
        self.ends_operand = false;
    }

    fn finish(mut self, src: &Arc<String>) -> Result<Program, ParseErr> {
        if let Some((fun, loc)) = self.awaiting.take() {
            return Err(ParseErr {
                typ: ParseErrTyp::ExpectedParen { name: fun.name },
                loc,
            });
        }

        if self.out.is_empty() && self.ops.is_empty() {
            return Err(ParseErr {
                typ: ParseErrTyp::Empty,
                loc: SubStr::all(Arc::clone(src)),
            });
        }

        if !self.ends_operand {
            return Err(ParseErr {
                typ: ParseErrTyp::MissingOperand,
                loc: SubStr::end(Arc::clone(src)),
            });
        }

        while let Some(op) = self.ops.pop() {
            if let ShuntOpTyp::OpenParen = op.typ {
                return Err(ParseErr {
                    typ: ParseErrTyp::ParenMismatch,
                    loc: op.loc,
                });
            }
            self.out.extend(op.into_output());
        }

        let depth = checked_depth(&self.out, src)?;
        Ok(Program::new(self.out, depth))
    }
}

impl ShuntOp {
    /// Parentheses never reach the output.
    fn into_output(self) -> Option<Operation> {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Fun(fun) => OperationTyp::Call(fun),
            ShuntOpTyp::OpenParen => return None,
        };
        Some(Operation { typ, loc: self.loc })
    }
}

/// Walks the program's stack effects, returning the maximum depth.
fn checked_depth(ops: &[Operation], src: &Arc<String>) -> Result<usize, ParseErr> {
    let mut depth = 0usize;
    let mut max = 0usize;
    for op in ops {
        let arity = op.arity();
        if depth < arity {
            return Err(ParseErr {
                typ: ParseErrTyp::MissingOperand,
                loc: op.loc.clone(),
            });
        }
        depth = depth - arity + 1;
        max = max.max(depth);
    }
    if depth == 1 {
        Ok(max)
    } else {
        Err(ParseErr {
            typ: ParseErrTyp::MissingOperand,
            loc: SubStr::end(Arc::clone(src)),
        })
    }
}

/// Resolves an alphabetic run against `idents`. Runs that are not a name
/// themselves are split into known names, preferring longer names first,
/// so `xsin` reads as `x` followed by `sin`.
pub fn split_ident(loc: SubStr, idents: &Idents) -> Result<Vec<(SubStr, Ident)>, ParseErr> {
    if let Some(ident) = idents.get(loc.get()) {
        return Ok(vec![(loc, *ident)]);
    }

    let text = loc.get();
    let n = text.len();
    // piece[i] is the length of the name starting at i in some full split
    let mut piece: Vec<Option<usize>> = vec![None; n + 1];
    let mut reachable = vec![false; n + 1];
    reachable[n] = true;
    for i in (0..n).rev() {
        for len in (1..=n - i).rev() {
            if reachable[i + len] && idents.contains_key(&text[i..i + len]) {
                piece[i] = Some(len);
                reachable[i] = true;
                break;
            }
        }
    }

    if !reachable[0] {
        return Err(ParseErr {
            typ: ParseErrTyp::UnknownIdent {
                text: text.to_string(),
            },
            loc,
        });
    }

    let mut ret = Vec::new();
    let mut rest = loc;
    let mut i = 0;
    while let Some(len) = piece[i] {
        let (name, tail) = rest.split_at(len);
        let ident = idents.get(name.get()).copied().ok_or_else(|| ParseErr {
            typ: ParseErrTyp::UnknownIdent {
                text: name.get().to_string(),
            },
            loc: name.clone(),
        })?;
        ret.push((name, ident));
        rest = tail;
        i += len;
    }
    Ok(ret)
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let src = Arc::clone(lex.src());
    let mut shunt = Shunt::new();

    for tok in lex {
        let tok = tok?;
        match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                shunt.feed(Item::Operand(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                }))?;
            }

            TokTyp::Ident => {
                for (loc, ident) in split_ident(tok.loc, idents)? {
                    let item = match ident {
                        Ident::Var => Item::Operand(Operation {
                            typ: OperationTyp::Var,
                            loc,
                        }),
                        Ident::Const(val) => Item::Operand(Operation {
                            typ: OperationTyp::Val(val),
                            loc,
                        }),
                        Ident::Fun(fun) => Item::Fun(fun, loc),
                    };
                    shunt.feed(item)?;
                }
            }

            TokTyp::Op(typ) => shunt.feed(Item::Op(typ, tok.loc))?,
            TokTyp::OpenParen => shunt.feed(Item::OpenParen(tok.loc))?,
            TokTyp::CloseParen => shunt.feed(Item::CloseParen(tok.loc))?,

            TokTyp::XComma
            | TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => {
                return Err(ParseErr {
                    typ: ParseErrTyp::LexErr(LexErrTyp::Unsupported(tok.typ)),
                    loc: tok.loc,
                })
            }
        }
    }

    shunt.finish(&src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, stdlib};

    fn err(src: &str) -> ParseErr {
        compile(src).expect_err("compile should fail")
    }

    fn eval(src: &str, x: Number) -> Option<Number> {
        compile(src).expect("compile failed").eval(x)
    }

    #[test]
    fn code_injection_is_rejected() {
        let e = err("eval('alert(1)')");
        assert_eq!(e.typ, ParseErrTyp::LexErr(LexErrTyp::InvalidChar));
        assert_eq!(e.loc.get(), "'");
    }

    #[test]
    fn disallowed_identifiers_are_rejected() {
        let e = err("alert(1)");
        assert_eq!(
            e.typ,
            ParseErrTyp::UnknownIdent {
                text: String::from("alert")
            }
        );
        assert_eq!(e.loc.get(), "alert");
        assert!(matches!(err("y + 1").typ, ParseErrTyp::UnknownIdent { .. }));
    }

    #[test]
    fn unary_minus_binds_looser_than_pow() {
        assert_eq!(eval("-x^2", 3.0), Some(-9.0));
        assert_eq!(eval("(-x)^2", 3.0), Some(9.0));
        assert_eq!(eval("2^-x", 1.0), Some(0.5));
        assert_eq!(eval("-2*3", 0.0), Some(-6.0));
        assert_eq!(eval("x - -1", 1.0), Some(2.0));
    }

    #[test]
    fn pow_is_right_associative() {
        assert_eq!(eval("2^3^2", 0.0), Some(512.0));
    }

    #[test]
    fn implicit_multiplication() {
        assert_eq!(eval("2x", 3.0), Some(6.0));
        assert_eq!(eval("3sin(x)", 0.0), Some(0.0));
        assert_eq!(eval("(x+1)(x-1)", 3.0), Some(8.0));
        assert_eq!(eval("2x^2", 3.0), Some(18.0));
        assert_eq!(eval("-2x", 3.0), Some(-6.0));
        assert_eq!(eval("2 pi", 0.0), Some(2.0 * core::f64::consts::PI));
    }

    #[test]
    fn glued_names_are_split() {
        assert_eq!(eval("xsin(x)", 0.0), Some(0.0));
        assert_eq!(eval("xx", 3.0), Some(9.0));
        assert_eq!(eval("exp(x)", 0.0), Some(1.0));
        // `ex` is e times x, not a call
        assert_eq!(eval("ex", 1.0), Some(core::f64::consts::E));
    }

    #[test]
    fn split_prefers_longer_names() {
        let src = Arc::new(String::from("xexp"));
        let pieces = split_ident(SubStr::all(Arc::clone(&src)), stdlib::idents()).unwrap();
        let names: Vec<&str> = pieces.iter().map(|(loc, _)| loc.get()).collect();
        assert_eq!(names, ["x", "exp"]);
    }

    #[test]
    fn functions_need_parentheses() {
        let e = err("sin x");
        assert_eq!(e.typ, ParseErrTyp::ExpectedParen { name: "sin" });
        assert_eq!(e.loc.get(), "sin");
        assert!(matches!(err("2 + cos").typ, ParseErrTyp::ExpectedParen { .. }));
    }

    #[test]
    fn structural_errors() {
        assert_eq!(err("").typ, ParseErrTyp::Empty);
        assert_eq!(err("   ").typ, ParseErrTyp::Empty);
        assert_eq!(err("2+").typ, ParseErrTyp::MissingOperand);
        assert_eq!(err("*2").typ, ParseErrTyp::MissingOperand);
        assert_eq!(err("()").typ, ParseErrTyp::MissingOperand);
        assert_eq!(err("(x+1").typ, ParseErrTyp::ParenMismatch);
        assert_eq!(err("x+1)").typ, ParseErrTyp::ParenMismatch);
        assert!(matches!(err("1.2.3").typ, ParseErrTyp::ParseNum(_)));
    }

    #[test]
    fn unsupported_syntax_is_named() {
        assert_eq!(
            err("|x|").typ,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XPipe))
        );
        assert_eq!(
            err("log(x, 2)").typ,
            ParseErrTyp::LexErr(LexErrTyp::Unsupported(TokTyp::XComma))
        );
    }

    #[test]
    fn error_messages() {
        assert_eq!(err("foo").to_string(), "unknown identifier 'foo'");
        assert_eq!(err("(x").to_string(), "mismatched parentheses");
        assert_eq!(err("x;").to_string(), "invalid character");
    }
}
