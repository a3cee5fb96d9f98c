//! Equation solver tool: solves one algebraic equation for one variable.
//!
//! Both sides are reduced to exact rational functions, moved to one side,
//! and the numerator is solved:
//! - only the target variable present: every distinct root, exact when the
//!   roots are rational or come from a quadratic, numeric otherwise
//! - other symbols present: closed forms for linear and quadratic equations
//!
//! An identity or contradiction (no target variable left) succeeds with no
//! solutions and an explanatory message.

mod parser;
mod polynomial;
mod rational;
mod roots;

use async_trait::async_trait;
use rustedtutor_core::error::ToolError;
use rustedtutor_core::subject::EQUATION_SOLVER;
use rustedtutor_core::tool::{Tool, ToolResult};
use serde::{Deserialize, Serialize};

use polynomial::{Poly, RatFn};
use rational::Rational;

/// Highest degree the solver will attempt.
const MAX_DEGREE: u32 = 64;

pub const TRIVIAL_MESSAGE: &str = "No solutions found or equation is trivial.";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqError {
    #[error("Missing 'equation' or 'solve_for' in input.")]
    MissingField,

    #[error("{}", no_equals_message(*found))]
    NoEqualsSign { found: usize },

    #[error("Equation solve error: Invalid equation or variable. {0}")]
    ParseFailed(String),

    #[error("Equation solver error: {0}")]
    Unsolvable(String),
}

fn no_equals_message(found: usize) -> String {
    if found == 0 {
        "Equation must contain an '=' sign.".to_string()
    } else {
        format!("Equation must contain exactly one '=' sign, found {found}.")
    }
}

/// An equation and the variable to solve for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquationSpec {
    #[serde(default)]
    pub equation: String,
    #[serde(default)]
    pub solve_for: String,
}

impl EquationSpec {
    pub fn new(equation: impl Into<String>, solve_for: impl Into<String>) -> Self {
        Self {
            equation: equation.into(),
            solve_for: solve_for.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solved {
    /// `"x = 3"` style strings, possibly empty.
    pub solutions: Vec<String>,
    pub message: Option<String>,
}

/// Solve `spec.equation` for `spec.solve_for`.
pub fn solve(spec: &EquationSpec) -> Result<Solved, EqError> {
    let equation = spec.equation.trim();
    let var = spec.solve_for.trim();
    if equation.is_empty() || var.is_empty() {
        return Err(EqError::MissingField);
    }

    let found = equation.matches('=').count();
    let Some((lhs, rhs)) = equation.split_once('=').filter(|_| found == 1) else {
        return Err(EqError::NoEqualsSign { found });
    };
    if !parser::is_identifier(var) {
        return Err(EqError::ParseFailed(format!("'{var}' is not a valid variable name")));
    }

    let lhs = parser::parse_expression(lhs)?;
    let rhs = parser::parse_expression(rhs)?;
    let RatFn { num, den } = lhs.checked_sub(&rhs)?;

    let degree = num.degree_in(var);
    if degree > MAX_DEGREE {
        return Err(EqError::Unsolvable(format!(
            "degree {degree} exceeds the supported maximum of {MAX_DEGREE}"
        )));
    }

    let values = if degree == 0 {
        Vec::new()
    } else if let Some(num_coeffs) = num.univariate(var) {
        let den_coeffs = den.univariate(var).unwrap_or_else(|| vec![Rational::ONE]);
        let reduced = roots::cancel_common(&num_coeffs, &den_coeffs)?;
        if reduced.len() <= 1 {
            Vec::new()
        } else {
            roots::solve_univariate(&reduced)?
        }
    } else {
        solve_symbolic(&num, var)?
    };

    tracing::debug!(equation, var, solutions = values.len(), "Equation solved");

    let solutions: Vec<String> = values.into_iter().map(|v| format!("{var} = {v}")).collect();
    let message = solutions.is_empty().then(|| TRIVIAL_MESSAGE.to_string());
    Ok(Solved { solutions, message })
}

/// Closed forms when symbols other than `var` appear.
fn solve_symbolic(num: &Poly, var: &str) -> Result<Vec<String>, EqError> {
    let coeffs = num.coefficients_in(var)?;
    match coeffs.as_slice() {
        [c0, c1] => {
            let root = RatFn::new(c0.checked_neg()?, c1.clone())?;
            Ok(vec![root.to_string()])
        }
        [c0, c1, c2] => solve_symbolic_quadratic(c0, c1, c2),
        _ => Err(EqError::Unsolvable(format!(
            "cannot solve a degree {} equation in '{var}' when other symbols are present",
            coeffs.len() - 1
        ))),
    }
}

fn solve_symbolic_quadratic(c0: &Poly, c1: &Poly, c2: &Poly) -> Result<Vec<String>, EqError> {
    let paren = |p: &Poly| {
        if p.needs_parens() { format!("({p})") } else { p.to_string() }
    };

    if let Some(lead) = c2.as_constant() {
        // x² + p·x + q = 0  →  x = -p/2 ± sqrt(p²/4 - q)
        let inv = lead.recip().ok_or_else(polynomial::overflow)?;
        let p = c1.scale(inv)?;
        let q = c0.scale(inv)?;
        let half = p.scale(Rational::new(-1, 2).ok_or_else(polynomial::overflow)?)?;
        let radicand = p
            .checked_pow(2)?
            .scale(Rational::new(1, 4).ok_or_else(polynomial::overflow)?)?
            .checked_sub(&q)?;
        if radicand.is_zero() {
            return Ok(vec![half.to_string()]);
        }
        let term = format!("sqrt({radicand})");
        return Ok(if half.is_zero() {
            vec![format!("-{term}"), term]
        } else {
            vec![format!("{half} - {term}"), format!("{half} + {term}")]
        });
    }

    // x = (-b ± sqrt(b² - 4ac)) / (2a)
    let disc = c1
        .checked_pow(2)?
        .checked_sub(&c2.checked_mul(c0)?.scale(Rational::integer(4))?)?;
    let neg_b = c1.checked_neg()?;
    let two_a = c2.scale(Rational::integer(2))?;
    if disc.is_zero() {
        return Ok(vec![RatFn::new(neg_b, two_a)?.to_string()]);
    }
    let root = |sign: &str| {
        let numerator = if neg_b.is_zero() {
            format!("{}sqrt({disc})", if sign == "-" { "-" } else { "" })
        } else {
            format!("{neg_b} {sign} sqrt({disc})")
        };
        format!("({numerator})/{}", paren(&two_a))
    };
    Ok(vec![root("-"), root("+")])
}

/// Solves algebraic equations for one variable.
pub struct EquationSolverTool;

#[async_trait]
impl Tool for EquationSolverTool {
    fn name(&self) -> &str {
        EQUATION_SOLVER
    }

    fn description(&self) -> &str {
        "Solve an algebraic equation (linear, quadratic, polynomial) for one variable. Use '*' for multiplication; '^' and '**' both mean power."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "equation": {
                    "type": "string",
                    "description": "The equation, e.g. '2*x + 5 = 11'"
                },
                "solve_for": {
                    "type": "string",
                    "description": "The variable to solve for, e.g. 'x'"
                }
            },
            "required": ["equation", "solve_for"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args = match arguments.get("expression") {
            Some(nested) if nested.is_object() => nested.clone(),
            _ => arguments,
        };
        let spec: EquationSpec = match args {
            serde_json::Value::Null => EquationSpec::default(),
            args => match serde_json::from_value(args) {
                Ok(spec) => spec,
                Err(e) => {
                    let error = EqError::ParseFailed(format!("Malformed arguments: {e}"));
                    tracing::debug!(error = %error, "Equation arguments rejected");
                    return Ok(ToolResult::failure(error.to_string()));
                }
            },
        };

        match solve(&spec) {
            Ok(Solved { solutions, message }) => {
                let output = match &message {
                    Some(message) => message.clone(),
                    None => solutions.join("; "),
                };
                let mut fields = serde_json::json!({ "solutions": solutions });
                if let Some(message) = message {
                    fields["message"] = message.into();
                }
                Ok(ToolResult::success(output, fields))
            }
            Err(e) => {
                tracing::debug!(equation = %spec.equation, error = %e, "Equation rejected");
                Ok(ToolResult::failure(e.to_string()))
            }
        }
    }
}
