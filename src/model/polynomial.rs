//! Laurent polynomials in one and two variables, as produced by the engine's
//! link invariants.

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write;

/// Sparse Laurent polynomial with integer coefficients.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Laurent {
    terms: BTreeMap<i64, i64>,
}

impl Laurent {
    pub fn zero() -> Laurent {
        Laurent::default()
    }

    pub fn monomial(coefficient: i64, exponent: i64) -> Laurent {
        let mut p = Laurent::zero();
        p.add_term(exponent, coefficient);
        p
    }

    pub fn from_terms(terms: impl IntoIterator<Item = (i64, i64)>) -> Laurent {
        let mut p = Laurent::zero();
        for (exponent, coefficient) in terms {
            p.add_term(exponent, coefficient);
        }
        p
    }

    pub fn add_term(&mut self, exponent: i64, coefficient: i64) {
        let entry = self.terms.entry(exponent).or_insert(0);
        *entry+= coefficient;
        if *entry == 0 {
            self.terms.remove(&exponent);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, exponent: i64) -> i64 {
        self.terms.get(&exponent).copied().unwrap_or(0)
    }

    pub fn terms(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        self.terms.iter().map(|(&e, &c)| (e, c))
    }

    pub fn add(&self, other: &Laurent) -> Laurent {
        let mut sum = self.clone();
        for (e, c) in other.terms() {
            sum.add_term(e, c);
        }
        sum
    }

    pub fn mul(&self, other: &Laurent) -> Laurent {
        let mut product = Laurent::zero();
        for (e1, c1) in self.terms() {
            for (e2, c2) in other.terms() {
                product.add_term(e1 + e2, c1 * c2);
            }
        }
        product
    }

    pub fn shift(&self, by: i64) -> Laurent {
        Laurent::from_terms(self.terms().map(|(e, c)| (e + by, c)))
    }

    pub fn scale(&self, factor: i64) -> Laurent {
        Laurent::from_terms(self.terms().map(|(e, c)| (e, c * factor)))
    }

    /// Substitutes `x -> x^(1/divisor)` style rescaling: every exponent is
    /// multiplied by `numerator` and must then divide evenly by `divisor`.
    pub fn rescale_exponents(&self, numerator: i64, divisor: i64) -> Option<Laurent> {
        let mut out = Laurent::zero();
        for (e, c) in self.terms() {
            let scaled = e * numerator;
            if scaled % divisor != 0 {
                return None;
            }
            out.add_term(scaled / divisor, c);
        }
        Some(out)
    }

    pub fn with_variable<'a>(&'a self, variable: &'a str) -> LaurentDisplay<'a> {
        LaurentDisplay { poly: self, variable }
    }
}

pub struct LaurentDisplay<'a> {
    poly: &'a Laurent,
    variable: &'a str,
}

fn write_signed_coefficient(out: &mut String, first: bool, coefficient: i64, has_variable: bool) -> fmt::Result {
    let magnitude = coefficient.abs();
    if first {
        if coefficient < 0 {
            out.push('-');
        }
    } else if coefficient < 0 {
        out.push_str(" - ");
    } else {
        out.push_str(" + ");
    }

    if magnitude != 1 || !has_variable {
        write!(out, "{}", magnitude)?;
    }
    Ok(())
}

fn write_power(out: &mut String, variable: &str, exponent: i64) -> fmt::Result {
    match exponent {
        0 => Ok(()),
        1 => write!(out, "{}", variable),
        e => write!(out, "{}^{}", variable, e),
    }
}

impl<'a> fmt::Display for LaurentDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return write!(f, "0");
        }

        let mut out = String::new();
        for (i, (e, c)) in self.poly.terms.iter().rev().enumerate() {
            write_signed_coefficient(&mut out, i == 0, *c, *e != 0)?;
            write_power(&mut out, self.variable, *e)?;
        }
        f.write_str(&out)
    }
}

/// Sparse Laurent polynomial in two variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Laurent2 {
    terms: BTreeMap<(i64, i64), i64>,
}

impl Laurent2 {
    pub fn from_terms(terms: impl IntoIterator<Item = ((i64, i64), i64)>) -> Laurent2 {
        let mut p = Laurent2::default();
        for (exponents, coefficient) in terms {
            p.add_term(exponents, coefficient);
        }
        p
    }

    pub fn add_term(&mut self, exponents: (i64, i64), coefficient: i64) {
        let entry = self.terms.entry(exponents).or_insert(0);
        *entry+= coefficient;
        if *entry == 0 {
            self.terms.remove(&exponents);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, x: i64, y: i64) -> i64 {
        self.terms.get(&(x, y)).copied().unwrap_or(0)
    }

    pub fn terms(&self) -> impl Iterator<Item = ((i64, i64), i64)> + '_ {
        self.terms.iter().map(|(&e, &c)| (e, c))
    }

    pub fn with_variables<'a>(&'a self, x: &'a str, y: &'a str) -> Laurent2Display<'a> {
        Laurent2Display { poly: self, x, y }
    }
}

pub struct Laurent2Display<'a> {
    poly: &'a Laurent2,
    x: &'a str,
    y: &'a str,
}

impl<'a> fmt::Display for Laurent2Display<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.poly.is_zero() {
            return write!(f, "0");
        }

        let mut out = String::new();
        for (i, ((ex, ey), c)) in self.poly.terms.iter().rev().enumerate() {
            write_signed_coefficient(&mut out, i == 0, *c, *ex != 0 || *ey != 0)?;
            write_power(&mut out, self.x, *ex)?;
            if *ex != 0 && *ey != 0 {
                out.push(' ');
            }
            write_power(&mut out, self.y, *ey)?;
        }
        f.write_str(&out)
    }
}

/// Converts a HOMFLY-PT polynomial from the `(α, z)` variables to `(ℓ, m)`.
///
/// The substitution is `α = ℓi`, `z = -mi`, which sends `α^a z^b` to
/// `i^(a-b) ℓ^a m^b`. For HOMFLY-PT polynomials `a - b` is always even, so
/// each term only changes sign when `a - b ≡ 2 (mod 4)`.
pub fn homfly_az_to_lm(az: &Laurent2) -> Laurent2 {
    Laurent2::from_terms(az.terms().map(|((a, b), c)| {
        if (a - b).rem_euclid(4) == 0 {
            ((a, b), c)
        } else {
            ((a, b), -c)
        }
    }))
}

/// The polynomial invariants offered for links.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Invariant {
    Alexander,
    Jones,
    Homfly,
    Bracket,
    Arrow,
    AffineIndex,
}

impl Invariant {
    pub const ALL: [Invariant; 6] = [
        Invariant::Alexander,
        Invariant::Jones,
        Invariant::Homfly,
        Invariant::Bracket,
        Invariant::Arrow,
        Invariant::AffineIndex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Invariant::Alexander => "Alexander",
            Invariant::Jones => "Jones",
            Invariant::Homfly => "HOMFLY-PT",
            Invariant::Bracket => "Kauffman bracket",
            Invariant::Arrow => "Arrow",
            Invariant::AffineIndex => "Affine index",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Invariant::Alexander => "alexander",
            Invariant::Jones => "jones",
            Invariant::Homfly => "homfly",
            Invariant::Bracket => "bracket",
            Invariant::Arrow => "arrow",
            Invariant::AffineIndex => "affine",
        }
    }

    pub fn from_key(key: &str) -> Option<Invariant> {
        Invariant::ALL.iter().copied().find(|i| i.key() == key)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Polynomial {
    Laurent(Laurent),
    Laurent2(Laurent2),
}

impl Polynomial {
    /// Renders in the variables customary for `invariant`. HOMFLY-PT is
    /// shown in `(α, z)` unless `lm` is set.
    pub fn render(&self, invariant: Invariant, lm: bool, unicode: bool) -> String {
        match self {
            Polynomial::Laurent(p) => {
                let variable = match (invariant, unicode) {
                    (Invariant::Jones, true) => "√t",
                    (Invariant::Jones, false) => "sqrt_t",
                    (Invariant::Bracket, _) => "A",
                    _ => "t",
                };
                p.with_variable(variable).to_string()
            },
            Polynomial::Laurent2(p) if invariant == Invariant::Homfly && lm => {
                homfly_az_to_lm(p).with_variables("l", "m").to_string()
            },
            Polynomial::Laurent2(p) if invariant == Invariant::Homfly => {
                let alpha = if unicode { "α" } else { "a" };
                p.with_variables(alpha, "z").to_string()
            },
            Polynomial::Laurent2(p) => p.with_variables("A", "K").to_string(),
        }
    }

    /// Compact text form used when storing cached invariants.
    pub fn to_storage(&self) -> String {
        match self {
            Polynomial::Laurent(p) => p.terms().map(|(e, c)| format!("{}:{}", e, c)).collect::<Vec<_>>().join(" "),
            Polynomial::Laurent2(p) => p.terms().map(|((x, y), c)| format!("{},{}:{}", x, y, c)).collect::<Vec<_>>().join(" "),
        }
    }

    pub fn from_storage(text: &str, two_variable: bool) -> Option<Polynomial> {
        let mut one = Laurent::zero();
        let mut two = Laurent2::default();
        for token in text.split_whitespace() {
            let (exponents, coefficient) = token.split_once(':')?;
            let coefficient: i64 = coefficient.parse().ok()?;
            if two_variable {
                let (x, y) = exponents.split_once(',')?;
                two.add_term((x.parse().ok()?, y.parse().ok()?), coefficient);
            } else {
                one.add_term(exponents.parse().ok()?, coefficient);
            }
        }
        Some(if two_variable { Polynomial::Laurent2(two) } else { Polynomial::Laurent(one) })
    }
}
