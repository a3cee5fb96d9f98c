//! Root finding for univariate polynomials with rational coefficients.
//!
//! Exact where possible: rational roots via the rational root theorem, a
//! leftover quadratic in closed form with simplified surds. Anything of
//! degree three or more that survives is approximated numerically.

use std::ops::{Add, Div, Mul, Sub};

use super::EqError;
use super::polynomial::overflow;
use super::rational::{Rational, gcd};

/// Divisor enumeration is skipped above this magnitude.
const MAX_DIVISOR_SEARCH: i128 = 1_000_000_000_000;

/// Trial-division bound for square-factor extraction.
const MAX_SQUARE_FACTOR: i128 = 1_000_000;

/// Rational-root search is skipped when it would try more candidates.
const MAX_CANDIDATES: usize = 50_000;

const MAX_ITERATIONS: usize = 2_000;

/// Coefficients, lowest power first, without trailing zeros.
type UniPoly = Vec<Rational>;

fn trimmed(mut p: UniPoly) -> UniPoly {
    while p.last().is_some_and(|c| c.is_zero()) {
        p.pop();
    }
    p
}

fn eval(p: &[Rational], x: Rational) -> Result<Rational, EqError> {
    p.iter().rev().try_fold(Rational::ZERO, |acc, c| {
        acc.checked_mul(x)
            .and_then(|v| v.checked_add(*c))
            .ok_or_else(overflow)
    })
}

/// Divide by `(x - root)`; `root` must be a root of `p`.
fn deflate(p: &[Rational], root: Rational) -> Result<UniPoly, EqError> {
    let n = p.len() - 1;
    let mut q = vec![Rational::ZERO; n];
    q[n - 1] = p[n];
    for i in (0..n - 1).rev() {
        q[i] = q[i + 1]
            .checked_mul(root)
            .and_then(|v| v.checked_add(p[i + 1]))
            .ok_or_else(overflow)?;
    }
    Ok(q)
}

fn div_rem(a: &[Rational], b: &[Rational]) -> Result<(UniPoly, UniPoly), EqError> {
    let mut rem = trimmed(a.to_vec());
    let db = b.len() - 1;
    let lead = b[db];
    if rem.len() < b.len() {
        return Ok((Vec::new(), rem));
    }
    let mut quot = vec![Rational::ZERO; rem.len() - db];
    while rem.len() >= b.len() {
        let shift = rem.len() - b.len();
        let factor = rem[rem.len() - 1].checked_div(lead).ok_or_else(overflow)?;
        quot[shift] = factor;
        for (i, c) in b.iter().enumerate() {
            let product = factor.checked_mul(*c).ok_or_else(overflow)?;
            rem[shift + i] = rem[shift + i].checked_sub(product).ok_or_else(overflow)?;
        }
        rem = trimmed(rem);
    }
    Ok((trimmed(quot), rem))
}

fn monic(p: UniPoly) -> Result<UniPoly, EqError> {
    let Some(&lead) = p.last() else {
        return Ok(p);
    };
    p.into_iter()
        .map(|c| c.checked_div(lead).ok_or_else(overflow))
        .collect()
}

fn poly_gcd(a: &[Rational], b: &[Rational]) -> Result<UniPoly, EqError> {
    let mut a = trimmed(a.to_vec());
    let mut b = trimmed(b.to_vec());
    while !b.is_empty() {
        let (_, r) = div_rem(&a, &b)?;
        a = b;
        b = r;
    }
    monic(a)
}

fn derivative(p: &[Rational]) -> Result<UniPoly, EqError> {
    p.iter()
        .enumerate()
        .skip(1)
        .map(|(i, c)| c.checked_mul(Rational::integer(i as i128)).ok_or_else(overflow))
        .collect()
}

/// `num` with every factor it shares with `den` removed, so roots of the
/// denominator are never reported.
pub fn cancel_common(num: &[Rational], den: &[Rational]) -> Result<Vec<Rational>, EqError> {
    let den = trimmed(den.to_vec());
    if den.len() <= 1 {
        return Ok(trimmed(num.to_vec()));
    }
    let g = poly_gcd(num, &den)?;
    if g.len() <= 1 {
        return Ok(trimmed(num.to_vec()));
    }
    let (quotient, _) = div_rem(num, &g)?;
    Ok(quotient)
}

/// Integer coefficients with no common factor.
fn to_integer_coeffs(p: &[Rational]) -> Result<Vec<i128>, EqError> {
    let mut lcm: i128 = 1;
    for c in p {
        let d = c.denom();
        lcm = (lcm / gcd(lcm, d)).checked_mul(d).ok_or_else(overflow)?;
    }
    let ints = p
        .iter()
        .map(|c| c.numer().checked_mul(lcm / c.denom()).ok_or_else(overflow))
        .collect::<Result<Vec<_>, _>>()?;
    let content = ints.iter().fold(0, |acc, &c| gcd(acc, c)).max(1);
    Ok(ints.into_iter().map(|c| c / content).collect())
}

fn divisors(n: i128) -> Option<Vec<i128>> {
    let n = n.checked_abs()?;
    if n == 0 || n > MAX_DIVISOR_SEARCH {
        return None;
    }
    let mut out = Vec::new();
    let mut i = 1;
    while i * i <= n {
        if n % i == 0 {
            out.push(i);
            if i * i != n {
                out.push(n / i);
            }
        }
        i += 1;
    }
    out.sort_unstable();
    Some(out)
}

/// Find and divide out every rational root of `poly` (constant term non-zero).
fn extract_rational_roots(poly: &mut UniPoly, roots: &mut Vec<Rational>) -> Result<(), EqError> {
    if poly.len() < 2 {
        return Ok(());
    }
    let ints = to_integer_coeffs(poly)?;
    let (Some(ps), Some(qs)) = (divisors(ints[0]), divisors(ints[ints.len() - 1])) else {
        return Ok(());
    };
    if ps.len().saturating_mul(qs.len()).saturating_mul(2) > MAX_CANDIDATES {
        return Ok(());
    }

    for q in &qs {
        for p in &ps {
            for sign in [1, -1] {
                if poly.len() < 2 {
                    return Ok(());
                }
                let Some(candidate) = Rational::new(sign * p, *q) else {
                    continue;
                };
                if roots.contains(&candidate) {
                    continue;
                }
                // A candidate whose evaluation overflows is not treated as a
                // root; whatever is left goes to the numeric solver.
                let mut found = false;
                while poly.len() >= 2 && eval(poly, candidate).is_ok_and(|v| v.is_zero()) {
                    let Ok(quotient) = deflate(poly, candidate) else {
                        break;
                    };
                    *poly = quotient;
                    found = true;
                }
                if found {
                    roots.push(candidate);
                }
            }
        }
    }
    Ok(())
}

fn isqrt(n: i128) -> i128 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as i128;
    while x > 0 && x.checked_mul(x).is_none_or(|sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Split `n` (> 0) into `k² · m` with `m` square-free, returning `(k, m)`.
fn square_free(mut n: i128) -> (i128, i128) {
    let mut k = 1;
    let mut p: i128 = 2;
    while p <= MAX_SQUARE_FACTOR && p * p <= n {
        let square = p * p;
        while n % square == 0 {
            n /= square;
            k *= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    let r = isqrt(n);
    if r > 1 && r * r == n {
        k *= r;
        n = 1;
    }
    (k, n)
}

enum QuadraticRoots {
    Rational(Vec<Rational>),
    Surd([String; 2]),
}

fn surd_term(coeff: Rational, radicand: i128, imaginary: bool) -> String {
    let unit = match (radicand, imaginary) {
        (1, true) => "I".to_string(),
        (m, true) => format!("sqrt({m})*I"),
        (m, false) => format!("sqrt({m})"),
    };
    let scaled = if coeff.numer() == 1 {
        unit
    } else {
        format!("{}*{unit}", coeff.numer())
    };
    if coeff.denom() == 1 {
        scaled
    } else {
        format!("{scaled}/{}", coeff.denom())
    }
}

/// Closed-form roots of `c + b·x + a·x²`.
fn solve_quadratic(p: &[Rational]) -> Result<QuadraticRoots, EqError> {
    let ints = to_integer_coeffs(p)?;
    let (mut c, mut b, mut a) = (ints[0], ints[1], ints[2]);
    if a < 0 {
        (a, b, c) = (-a, -b, -c);
    }
    let disc = b
        .checked_mul(b)
        .zip(a.checked_mul(c).and_then(|ac| ac.checked_mul(4)))
        .and_then(|(bb, four_ac)| bb.checked_sub(four_ac))
        .ok_or_else(overflow)?;
    let two_a = a.checked_mul(2).ok_or_else(overflow)?;

    let root = isqrt(disc.abs());
    if disc >= 0 && root * root == disc {
        let roots = [-root, root]
            .into_iter()
            .map(|s| Rational::new(s - b, two_a).ok_or_else(overflow))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(QuadraticRoots::Rational(roots));
    }

    let (k, m) = square_free(disc.abs());
    let real = Rational::new(-b, two_a).ok_or_else(overflow)?;
    let coeff = Rational::new(k, two_a).ok_or_else(overflow)?;
    let term = surd_term(coeff, m, disc < 0);
    let pair = if real.is_zero() {
        [format!("-{term}"), term]
    } else {
        [format!("{real} - {term}"), format!("{real} + {term}")]
    };
    Ok(QuadraticRoots::Surd(pair))
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    const ZERO: Complex = Complex { re: 0.0, im: 0.0 };

    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }

    fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, o: Complex) -> Complex {
        Complex::new(self.re + o.re, self.im + o.im)
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, o: Complex) -> Complex {
        Complex::new(self.re - o.re, self.im - o.im)
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, o: Complex) -> Complex {
        Complex::new(self.re * o.re - self.im * o.im, self.re * o.im + self.im * o.re)
    }
}

impl Div for Complex {
    type Output = Complex;
    fn div(self, o: Complex) -> Complex {
        let d = o.re * o.re + o.im * o.im;
        Complex::new(
            (self.re * o.re + self.im * o.im) / d,
            (self.im * o.re - self.re * o.im) / d,
        )
    }
}

/// Durand–Kerner simultaneous iteration. Input must be square-free.
fn durand_kerner(p: &[Rational]) -> Vec<Complex> {
    let lead = p[p.len() - 1].to_f64();
    let monic: Vec<f64> = p.iter().map(|c| c.to_f64() / lead).collect();
    let n = monic.len() - 1;
    let eval = |z: Complex| {
        monic
            .iter()
            .rev()
            .fold(Complex::ZERO, |acc, &c| acc * z + Complex::real(c))
    };

    let seed = Complex::new(0.4, 0.9);
    let mut roots: Vec<Complex> = (0..n)
        .scan(Complex::real(1.0), |acc, _| {
            *acc = *acc * seed;
            Some(*acc)
        })
        .collect();

    for _ in 0..MAX_ITERATIONS {
        let mut largest_step = 0.0f64;
        for i in 0..n {
            let denom = (0..n)
                .filter(|&j| j != i)
                .fold(Complex::real(1.0), |acc, j| acc * (roots[i] - roots[j]));
            if denom.norm() == 0.0 {
                roots[i] = roots[i] + Complex::new(1e-6, 1e-6);
                largest_step = f64::INFINITY;
                continue;
            }
            let step = eval(roots[i]) / denom;
            roots[i] = roots[i] - step;
            largest_step = largest_step.max(step.norm() / (1.0 + roots[i].norm()));
        }
        if largest_step < 1e-15 {
            break;
        }
    }

    for z in &mut roots {
        if z.im.abs() <= 1e-9 * z.re.abs().max(1.0) {
            z.im = 0.0;
        }
        if z.re.abs() <= 1e-12 * z.im.abs().max(1.0) {
            z.re = 0.0;
        }
    }
    // Conjugate pairs differ in the last bits of their real parts.
    let key = |z: &Complex| (z.re * 1e9).round();
    roots.sort_by(|a, b| key(a).total_cmp(&key(b)).then(a.im.total_cmp(&b.im)));
    roots
}

fn format_decimal(x: f64) -> String {
    let s = format!("{x:.10}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

fn format_complex(z: &Complex) -> String {
    if z.im == 0.0 {
        return format_decimal(z.re);
    }
    let magnitude = format_decimal(z.im.abs());
    let imag = if magnitude == "1" { "I".to_string() } else { format!("{magnitude}*I") };
    let re = format_decimal(z.re);
    match (re.as_str(), z.im < 0.0) {
        ("0", true) => format!("-{imag}"),
        ("0", false) => imag,
        (_, true) => format!("{re} - {imag}"),
        (_, false) => format!("{re} + {imag}"),
    }
}

/// All distinct roots of a non-constant polynomial, rendered as text.
///
/// Order: rational roots ascending, then a closed-form quadratic pair
/// (minus branch first), then numeric approximations by real then
/// imaginary part.
pub fn solve_univariate(coeffs: &[Rational]) -> Result<Vec<String>, EqError> {
    let mut poly = trimmed(coeffs.to_vec());
    let mut rational = Vec::new();

    let zero_multiplicity = poly.iter().take_while(|c| c.is_zero()).count();
    if poly.len() >= 2 && zero_multiplicity > 0 {
        rational.push(Rational::ZERO);
        poly.drain(..zero_multiplicity);
    }

    extract_rational_roots(&mut poly, &mut rational)?;

    let mut rest = poly;
    if rest.len() > 3 {
        // Exact square-free reduction; skipped if the coefficients overflow.
        let reduced = derivative(&rest)
            .and_then(|d| poly_gcd(&rest, &d))
            .and_then(|g| if g.len() > 1 { div_rem(&rest, &g).map(|(q, _)| Some(q)) } else { Ok(None) });
        if let Ok(Some(quotient)) = reduced {
            rest = quotient;
        }
    }

    let mut closed_form = Vec::new();
    let mut numeric = Vec::new();
    match rest.len() {
        0 | 1 => {}
        2 => rational.push(
            rest[0]
                .checked_neg()
                .and_then(|c| c.checked_div(rest[1]))
                .ok_or_else(overflow)?,
        ),
        3 => match solve_quadratic(&rest) {
            Ok(QuadraticRoots::Rational(roots)) => rational.extend(roots),
            Ok(QuadraticRoots::Surd(pair)) => closed_form.extend(pair),
            Err(_) => numeric = durand_kerner(&rest),
        },
        _ => numeric = durand_kerner(&rest),
    }

    rational.sort();
    rational.dedup();
    let mut out: Vec<String> = rational.iter().map(Rational::to_string).collect();
    out.extend(closed_form);
    out.extend(numeric.iter().map(format_complex));
    Ok(out)
}
