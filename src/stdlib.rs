// SPDX: CC0-1.0

// every primitive returns `None` instead of a non-finite value

use crate::{eval::*, Number};
use core::f64::consts; // assumes Number = f64
use std::{collections::HashMap, sync::OnceLock};

pub const X: &str = "x";

/// The complete set of names an expression can refer to.
pub fn standard_idents() -> Idents {
    let mut ret = HashMap::new();

    ret.insert(X, Ident::Var);

    ret.insert("abs", Ident::Fun(Fun::new("abs", abs)));
    ret.insert("sqrt", Ident::Fun(Fun::new("sqrt", sqrt)));
    ret.insert("exp", Ident::Fun(Fun::new("exp", exp)));
    ret.insert("ln", Ident::Fun(Fun::new("ln", ln)));
    ret.insert("log", Ident::Fun(Fun::new("log", ln)));

    // trig
    ret.insert("sin", Ident::Fun(Fun::new("sin", sin)));
    ret.insert("cos", Ident::Fun(Fun::new("cos", cos)));
    ret.insert("tan", Ident::Fun(Fun::new("tan", tan)));

    ret.insert("pi", Ident::Const(consts::PI));
    ret.insert("e", Ident::Const(consts::E));
    ret
}

/// Shared copy of [`standard_idents`], built on first use.
pub fn idents() -> &'static Idents {
    static IDENTS: OnceLock<Idents> = OnceLock::new();
    IDENTS.get_or_init(standard_idents)
}

#[inline]
pub fn defined(x: Number) -> Option<Number> {
    x.is_finite().then_some(x)
}

pub fn neg(x: Number) -> Option<Number> {
    defined(-x)
}

pub fn add(x: Number, y: Number) -> Option<Number> {
    defined(x + y)
}

pub fn sub(x: Number, y: Number) -> Option<Number> {
    defined(x - y)
}

pub fn mul(x: Number, y: Number) -> Option<Number> {
    defined(x * y)
}

pub fn div(x: Number, y: Number) -> Option<Number> {
    if y == 0.0 {
        None
    } else {
        defined(x / y)
    }
}

pub fn pow(x: Number, exp: Number) -> Option<Number> {
    // negative base with a fractional exponent is NaN, 0^-n is infinite
    defined(x.powf(exp))
}

pub fn abs(x: Number) -> Option<Number> {
    defined(x.abs())
}

pub fn sqrt(x: Number) -> Option<Number> {
    if x < 0.0 {
        None
    } else {
        defined(x.sqrt())
    }
}

pub fn exp(x: Number) -> Option<Number> {
    defined(x.exp())
}

pub fn ln(x: Number) -> Option<Number> {
    if x <= 0.0 {
        None
    } else {
        defined(x.ln())
    }
}

pub fn sin(x: Number) -> Option<Number> {
    defined(x.sin())
}

pub fn cos(x: Number) -> Option<Number> {
    defined(x.cos())
}

pub fn tan(x: Number) -> Option<Number> {
    defined(x.tan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_a_closed_whitelist() {
        let idents = standard_idents();
        let mut names: Vec<&str> = idents.keys().copied().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            ["abs", "cos", "e", "exp", "ln", "log", "pi", "sin", "sqrt", "tan", "x"]
        );
    }

    #[test]
    fn division_by_zero_is_a_gap() {
        assert_eq!(div(1.0, 0.0), None);
        assert_eq!(div(0.0, -0.0), None);
        assert_eq!(div(1.0, 4.0), Some(0.25));
    }

    #[test]
    fn non_finite_inputs_stay_undefined() {
        assert_eq!(add(Number::INFINITY, 1.0), None);
        assert_eq!(sin(Number::NAN), None);
        assert_eq!(mul(Number::MAX, 2.0), None);
    }
}
