// SPDX: CC0-1.0

use crate::{lex::SubStr, stdlib, Number};
use core::fmt;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    pub const fn arity(&self) -> usize {
        match self {
            Self::Neg => 1,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Pow => 2,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
        }
    }

    /// Applies a binary operator. `Neg` ignores `lhs`.
    pub fn apply(&self, lhs: Number, rhs: Number) -> Option<Number> {
        match self {
            Self::Neg => stdlib::neg(rhs),
            Self::Add => stdlib::add(lhs, rhs),
            Self::Sub => stdlib::sub(lhs, rhs),
            Self::Mul => stdlib::mul(lhs, rhs),
            Self::Div => stdlib::div(lhs, rhs),
            Self::Pow => stdlib::pow(lhs, rhs),
        }
    }
}

/// A whitelisted single-argument primitive. `None` marks a domain violation.
#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub name: &'static str,
    pub fun: fn(Number) -> Option<Number>,
}

impl Fun {
    pub const fn new(name: &'static str, fun: fn(Number) -> Option<Number>) -> Self {
        Self { name, fun }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Ident {
    Var,
    Const(Number),
    Fun(Fun),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

pub type Idents = HashMap<&'static str, Ident>;

#[derive(Clone, Copy, Debug)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Number),
    Var,
    Call(Fun),
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl Operation {
    pub const fn arity(&self) -> usize {
        match self.typ {
            OperationTyp::Operator(typ) => typ.arity(),
            OperationTyp::Val(_) | OperationTyp::Var => 0,
            OperationTyp::Call(_) => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Var => write!(f, "load '{}'", self.loc.get()),
            OperationTyp::Operator(typ) => write!(f, "call '{}'", typ.name()),
            OperationTyp::Call(fun) => write!(f, "call '{}'", fun.name),
        }
    }
}

/// Postfix program whose stack usage was checked when it was built, so
/// running it can only fail through domain violations.
#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
    pub(crate) depth: usize,
}

impl Program {
    #[inline]
    pub(crate) const fn new(ops: Vec<Operation>, depth: usize) -> Self {
        Self { ops, depth }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Largest number of values live on the stack at once.
    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    pub fn eval(&self, x: Number, stack: &mut Vec<Number>) -> Option<Number> {
        stack.clear();
        for op in &self.ops {
            let val = match op.typ {
                OperationTyp::Val(val) => val,
                OperationTyp::Var => x,
                OperationTyp::Operator(OperatorTyp::Neg) => stdlib::neg(stack.pop()?)?,
                OperationTyp::Operator(typ) => {
                    // stack: ...lhs, rhs
                    let rhs = stack.pop()?;
                    let lhs = stack.pop()?;
                    typ.apply(lhs, rhs)?
                }
                OperationTyp::Call(fun) => (fun.fun)(stack.pop()?)?,
            };
            stack.push(stdlib::defined(val)?);
        }
        stack.pop()
    }
}

/// A compiled formula in one variable, `x`.
#[derive(Clone, Debug)]
pub struct Expression {
    src: Arc<String>,
    prog: Program,
}

/// One evaluation of an [`Expression`]. `y` is `None` where the function is
/// undefined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub x: Number,
    pub y: Option<Number>,
}

impl Expression {
    pub(crate) const fn new(src: Arc<String>, prog: Program) -> Self {
        Self { src, prog }
    }

    pub fn source(&self) -> &str {
        &self.src
    }

    pub const fn program(&self) -> &Program {
        &self.prog
    }

    /// Evaluates at `x`, returning `None` for division by zero, roots and
    /// logarithms outside their domain, and non-finite results.
    pub fn eval(&self, x: Number) -> Option<Number> {
        let mut stack = Vec::with_capacity(self.prog.depth);
        self.prog.eval(x, &mut stack)
    }

    /// Like [`Expression::eval`] but reuses `stack` between calls.
    pub fn eval_with(&self, x: Number, stack: &mut Vec<Number>) -> Option<Number> {
        self.prog.eval(x, stack)
    }

    pub fn sample(&self, x: Number, stack: &mut Vec<Number>) -> Sample {
        Sample {
            x,
            y: self.eval_with(x, stack),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.src)
    }
}

impl core::str::FromStr for Expression {
    type Err = crate::parse::ParseErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::compile(s)
    }
}

#[cfg(test)]
mod tests {
    use crate::compile;

    fn eval(src: &str, x: f64) -> Option<f64> {
        compile(src).expect("compile failed").eval(x)
    }

    #[test]
    fn reciprocal_is_undefined_at_zero() {
        assert_eq!(eval("1/x", 0.0), None);
        assert_eq!(eval("1/x", 2.0), Some(0.5));
    }

    #[test]
    fn log_is_undefined_for_non_positive() {
        assert_eq!(eval("log(x)", -1.0), None);
        assert_eq!(eval("log(x)", 0.0), None);
        assert_eq!(eval("log(x)", 1.0), Some(0.0));
        assert_eq!(eval("ln(x)", 0.0), None);
    }

    #[test]
    fn even_roots_of_negatives_are_undefined() {
        assert_eq!(eval("sqrt(x)", -4.0), None);
        assert_eq!(eval("sqrt(x)", 4.0), Some(2.0));
        assert_eq!(eval("x^0.5", -4.0), None);
    }

    #[test]
    fn overflow_is_undefined() {
        assert_eq!(eval("exp(x)", 1000.0), None);
        assert_eq!(eval("0^x", -1.0), None);
    }

    #[test]
    fn intermediate_gap_poisons_the_result() {
        // 1/(1/0) would be 0 in plain floats
        assert_eq!(eval("1/(1/x)", 0.0), None);
    }

    #[test]
    fn stack_is_reusable() {
        let expr = compile("x^2 - 3*x + 2").unwrap();
        let mut stack = Vec::new();
        assert_eq!(expr.eval_with(1.5, &mut stack), Some(-0.25));
        assert_eq!(expr.eval_with(0.0, &mut stack), Some(2.0));
        assert_eq!(expr.eval_with(f64::NAN, &mut stack), None);
    }

    #[test]
    fn program_dump_lists_operations() {
        let expr = compile("-x^2").unwrap();
        let dump: Vec<String> = expr.program().ops().map(|op| op.to_string()).collect();
        assert_eq!(dump, ["load 'x'", "push 2", "call 'pow'", "call 'neg'"]);
        assert_eq!(expr.program().depth(), 2);
    }
}
