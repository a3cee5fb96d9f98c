//! Sparse multivariate polynomials and rational functions over [`Rational`].
//!
//! Both sides of an equation are reduced to a [`RatFn`] (numerator and
//! denominator polynomials) while parsing, so the solver only ever sees
//! exact coefficients.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::EqError;
use super::rational::Rational;

/// Variable name → exponent. Never holds a zero exponent.
pub type Monomial = BTreeMap<String, u32>;

pub(crate) fn overflow() -> EqError {
    EqError::Unsolvable("coefficient overflow".into())
}

/// Graded lexicographic order: total degree first, then exponents of the
/// alphabetically earlier variables.
fn grlex(a: &Monomial, b: &Monomial) -> Ordering {
    let deg = |m: &Monomial| m.values().map(|&e| u64::from(e)).sum::<u64>();
    deg(a).cmp(&deg(b)).then_with(|| {
        let vars: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
        for var in vars {
            let ea = a.get(var).copied().unwrap_or(0);
            let eb = b.get(var).copied().unwrap_or(0);
            if ea != eb {
                return ea.cmp(&eb);
            }
        }
        Ordering::Equal
    })
}

fn monomial_mul(a: &Monomial, b: &Monomial) -> Result<Monomial, EqError> {
    let mut out = a.clone();
    for (var, exp) in b {
        let entry = out.entry(var.clone()).or_insert(0);
        *entry = entry.checked_add(*exp).ok_or_else(overflow)?;
    }
    Ok(out)
}

/// `a / b` when `b` divides `a`.
fn monomial_div(a: &Monomial, b: &Monomial) -> Option<Monomial> {
    let mut out = a.clone();
    for (var, exp) in b {
        let have = out.get(var).copied().unwrap_or(0);
        match have.cmp(exp) {
            Ordering::Less => return None,
            Ordering::Equal => {
                out.remove(var);
            }
            Ordering::Greater => {
                out.insert(var.clone(), have - exp);
            }
        }
    }
    Some(out)
}

/// A polynomial in any number of named variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Poly {
    terms: BTreeMap<Monomial, Rational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(c: Rational) -> Self {
        let mut terms = BTreeMap::new();
        if !c.is_zero() {
            terms.insert(Monomial::new(), c);
        }
        Self { terms }
    }

    pub fn var(name: &str) -> Self {
        let mut monomial = Monomial::new();
        monomial.insert(name.to_string(), 1);
        let mut terms = BTreeMap::new();
        terms.insert(monomial, Rational::ONE);
        Self { terms }
    }

    fn from_term(monomial: Monomial, coeff: Rational) -> Self {
        let mut terms = BTreeMap::new();
        if !coeff.is_zero() {
            terms.insert(monomial, coeff);
        }
        Self { terms }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The value of a constant polynomial.
    pub fn as_constant(&self) -> Option<Rational> {
        match self.terms.len() {
            0 => Some(Rational::ZERO),
            1 => self.terms.get(&Monomial::new()).copied(),
            _ => None,
        }
    }

    pub fn variables(&self) -> BTreeSet<String> {
        self.terms.keys().flat_map(|m| m.keys().cloned()).collect()
    }

    pub fn degree_in(&self, var: &str) -> u32 {
        self.terms
            .keys()
            .map(|m| m.get(var).copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    fn leading(&self) -> Option<(&Monomial, Rational)> {
        self.terms
            .iter()
            .max_by(|a, b| grlex(a.0, b.0))
            .map(|(m, c)| (m, *c))
    }

    pub fn checked_add(&self, other: &Poly) -> Result<Poly, EqError> {
        let mut terms = self.terms.clone();
        for (monomial, coeff) in &other.terms {
            let sum = match terms.get(monomial) {
                Some(existing) => existing.checked_add(*coeff).ok_or_else(overflow)?,
                None => *coeff,
            };
            if sum.is_zero() {
                terms.remove(monomial);
            } else {
                terms.insert(monomial.clone(), sum);
            }
        }
        Ok(Poly { terms })
    }

    pub fn checked_neg(&self) -> Result<Poly, EqError> {
        let terms = self
            .terms
            .iter()
            .map(|(m, c)| Ok((m.clone(), c.checked_neg().ok_or_else(overflow)?)))
            .collect::<Result<BTreeMap<_, _>, EqError>>()?;
        Ok(Poly { terms })
    }

    pub fn checked_sub(&self, other: &Poly) -> Result<Poly, EqError> {
        self.checked_add(&other.checked_neg()?)
    }

    pub fn checked_mul(&self, other: &Poly) -> Result<Poly, EqError> {
        let mut terms: BTreeMap<Monomial, Rational> = BTreeMap::new();
        for (ma, ca) in &self.terms {
            for (mb, cb) in &other.terms {
                let product = ca.checked_mul(*cb).ok_or_else(overflow)?;
                let coeff = terms.entry(monomial_mul(ma, mb)?).or_insert(Rational::ZERO);
                *coeff = coeff.checked_add(product).ok_or_else(overflow)?;
            }
        }
        terms.retain(|_, c| !c.is_zero());
        Ok(Poly { terms })
    }

    pub fn scale(&self, factor: Rational) -> Result<Poly, EqError> {
        self.checked_mul(&Poly::constant(factor))
    }

    pub fn checked_pow(&self, exp: u32) -> Result<Poly, EqError> {
        let mut result = Poly::constant(Rational::ONE);
        for _ in 0..exp {
            result = result.checked_mul(self)?;
        }
        Ok(result)
    }

    /// Exact multivariate division; `None` when `divisor` does not divide `self`.
    pub fn div_exact(&self, divisor: &Poly) -> Result<Option<Poly>, EqError> {
        let Some((lead_m, lead_c)) = divisor.leading() else {
            return Ok(None);
        };
        let mut remainder = self.clone();
        let mut quotient = Poly::zero();
        while let Some((rm, rc)) = remainder.leading() {
            let Some(m) = monomial_div(rm, lead_m) else {
                return Ok(None);
            };
            let term = Poly::from_term(m, rc.checked_div(lead_c).ok_or_else(overflow)?);
            remainder = remainder.checked_sub(&term.checked_mul(divisor)?)?;
            quotient = quotient.checked_add(&term)?;
        }
        Ok(Some(quotient))
    }

    /// Coefficients of powers of `var`, lowest first. Each coefficient is a
    /// polynomial in the remaining variables.
    pub fn coefficients_in(&self, var: &str) -> Result<Vec<Poly>, EqError> {
        let degree = self.degree_in(var) as usize;
        let mut coeffs = vec![Poly::zero(); degree + 1];
        for (monomial, coeff) in &self.terms {
            let mut rest = monomial.clone();
            let power = rest.remove(var).unwrap_or(0) as usize;
            coeffs[power] = coeffs[power].checked_add(&Poly::from_term(rest, *coeff))?;
        }
        Ok(coeffs)
    }

    /// Rational coefficients (lowest power first) when `var` is the only
    /// variable present.
    pub fn univariate(&self, var: &str) -> Option<Vec<Rational>> {
        self.coefficients_in(var)
            .ok()?
            .iter()
            .map(Poly::as_constant)
            .collect()
    }

    pub fn from_univariate(var: &str, coeffs: &[Rational]) -> Poly {
        let mut terms = BTreeMap::new();
        for (power, coeff) in coeffs.iter().enumerate() {
            if coeff.is_zero() {
                continue;
            }
            let mut monomial = Monomial::new();
            if power > 0 {
                monomial.insert(var.to_string(), power as u32);
            }
            terms.insert(monomial, *coeff);
        }
        Poly { terms }
    }

    /// More than one term, or a single term with a non-unit coefficient.
    pub fn needs_parens(&self) -> bool {
        match self.terms.len() {
            0 => false,
            1 => self
                .terms
                .iter()
                .any(|(m, c)| !m.is_empty() && !c.is_one()),
            _ => true,
        }
    }
}

fn write_monomial(f: &mut fmt::Formatter<'_>, monomial: &Monomial) -> fmt::Result {
    let mut first = true;
    for (var, exp) in monomial {
        if !first {
            f.write_str("*")?;
        }
        first = false;
        if *exp == 1 {
            write!(f, "{var}")?;
        } else {
            write!(f, "{var}**{exp}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Poly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return f.write_str("0");
        }
        let mut ordered: Vec<_> = self.terms.iter().collect();
        ordered.sort_by(|a, b| grlex(b.0, a.0));

        for (i, (monomial, coeff)) in ordered.into_iter().enumerate() {
            let negative = coeff.is_negative();
            match (i, negative) {
                (0, true) => f.write_str("-")?,
                (0, false) => {}
                (_, true) => f.write_str(" - ")?,
                (_, false) => f.write_str(" + ")?,
            }
            let numer = coeff.numer().unsigned_abs();
            let denom = coeff.denom();
            if monomial.is_empty() {
                write!(f, "{numer}")?;
            } else {
                if numer != 1 {
                    write!(f, "{numer}*")?;
                }
                write_monomial(f, monomial)?;
            }
            if denom != 1 {
                write!(f, "/{denom}")?;
            }
        }
        Ok(())
    }
}

/// A quotient of two polynomials. The denominator is never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatFn {
    pub num: Poly,
    pub den: Poly,
}

impl RatFn {
    pub fn from_poly(poly: Poly) -> Self {
        Self {
            num: poly,
            den: Poly::constant(Rational::ONE),
        }
    }

    pub fn constant(c: Rational) -> Self {
        Self::from_poly(Poly::constant(c))
    }

    pub fn var(name: &str) -> Self {
        Self::from_poly(Poly::var(name))
    }

    /// Build `num / den`, cancelling what can be cancelled cheaply.
    pub fn new(num: Poly, den: Poly) -> Result<Self, EqError> {
        if den.is_zero() {
            return Err(EqError::Unsolvable("division by zero".into()));
        }
        if num.is_zero() {
            return Ok(Self::constant(Rational::ZERO));
        }
        if let Some(c) = den.as_constant() {
            let inv = c.recip().ok_or_else(overflow)?;
            return Ok(Self::from_poly(num.scale(inv)?));
        }
        if let Some(q) = num.div_exact(&den)? {
            return Ok(Self::from_poly(q));
        }
        if den.leading().is_some_and(|(_, c)| c.is_negative()) {
            return Ok(Self {
                num: num.checked_neg()?,
                den: den.checked_neg()?,
            });
        }
        Ok(Self { num, den })
    }

    /// The value of a constant rational function.
    pub fn as_constant(&self) -> Option<Rational> {
        let n = self.num.as_constant()?;
        let d = self.den.as_constant()?;
        n.checked_div(d)
    }

    pub fn checked_add(&self, other: &RatFn) -> Result<RatFn, EqError> {
        if self.den == other.den {
            return RatFn::new(self.num.checked_add(&other.num)?, self.den.clone());
        }
        let num = self
            .num
            .checked_mul(&other.den)?
            .checked_add(&other.num.checked_mul(&self.den)?)?;
        RatFn::new(num, self.den.checked_mul(&other.den)?)
    }

    pub fn checked_neg(&self) -> Result<RatFn, EqError> {
        Ok(RatFn {
            num: self.num.checked_neg()?,
            den: self.den.clone(),
        })
    }

    pub fn checked_sub(&self, other: &RatFn) -> Result<RatFn, EqError> {
        self.checked_add(&other.checked_neg()?)
    }

    pub fn checked_mul(&self, other: &RatFn) -> Result<RatFn, EqError> {
        RatFn::new(
            self.num.checked_mul(&other.num)?,
            self.den.checked_mul(&other.den)?,
        )
    }

    pub fn checked_div(&self, other: &RatFn) -> Result<RatFn, EqError> {
        if other.num.is_zero() {
            return Err(EqError::Unsolvable("division by zero".into()));
        }
        RatFn::new(
            self.num.checked_mul(&other.den)?,
            self.den.checked_mul(&other.num)?,
        )
    }

    /// Integer power; negative exponents invert.
    pub fn checked_pow(&self, exp: i64) -> Result<RatFn, EqError> {
        let magnitude = u32::try_from(exp.unsigned_abs()).map_err(|_| overflow())?;
        let raised = RatFn::new(
            self.num.checked_pow(magnitude)?,
            self.den.checked_pow(magnitude)?,
        )?;
        if exp >= 0 {
            Ok(raised)
        } else {
            RatFn::constant(Rational::ONE).checked_div(&raised)
        }
    }
}

impl fmt::Display for RatFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den.as_constant() == Some(Rational::ONE) {
            return write!(f, "{}", self.num);
        }
        if self.num.needs_parens() {
            write!(f, "({})", self.num)?;
        } else {
            write!(f, "{}", self.num)?;
        }
        if self.den.needs_parens() {
            write!(f, "/({})", self.den)
        } else {
            write!(f, "/{}", self.den)
        }
    }
}
