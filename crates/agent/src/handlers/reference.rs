//! Deterministic reference handler.
//!
//! Pulls tool inputs straight out of the query text: equations and
//! arithmetic for mathematics, constant names for physics. It never talks to
//! a model, which makes it the offline mode and the test double for the
//! whole pipeline.

use async_trait::async_trait;
use regex::Regex;
use rustedtutor_core::error::Result;
use rustedtutor_core::handler::{Handler, HandlerRequest, HandlerResponse};
use rustedtutor_core::subject::{CALCULATOR, EQUATION_SOLVER, PHYSICS_CONSTANTS, Route, Specialist};
use rustedtutor_core::tool::{ToolCall, ToolInvocation, ToolRegistry};
use std::sync::LazyLock;
use tracing::debug;

use crate::prompts::FALLBACK_NOTICE;

/// Phrases that name a built-in constant, mapped to the lookup query.
const CONSTANT_ALIASES: &[(&str, &str)] = &[
    ("speed of light", "speed of light"),
    ("gravitational constant", "gravitational constant"),
    ("planck", "planck constant"),
    ("electron charge", "electron charge"),
    ("elementary charge", "electron charge"),
    ("charge of an electron", "electron charge"),
    ("avogadro", "avogadro number"),
    ("boltzmann", "boltzmann constant"),
    ("gas constant", "gas constant"),
    ("acceleration due to gravity", "acceleration due to gravity"),
    ("gravity", "gravity"),
    ("free fall", "gravity"),
];

static SOLVE_FOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfor\s+([A-Za-z_][A-Za-z0-9_]*)").expect("static regex")
});

static ARITHMETIC_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\d(.][\d\s.+\-*/()]*[\d)]").expect("static regex")
});

static HAS_OPERATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d)]\s*(?:\*\*|//|[-+*/])\s*[\d(.]").expect("static regex"));

/// Offline handler for every route.
#[derive(Default)]
pub struct ReferenceHandler {
    /// Extra constant names (canonical form) recognized in physics queries.
    constant_names: Vec<String>,
}

impl ReferenceHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also recognize these canonical constant names in physics queries.
    pub fn with_constant_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.constant_names = names.into_iter().collect();
        self
    }

    async fn respond_math(&self, query: &str, tools: &ToolRegistry) -> HandlerResponse {
        let mut invocations = Vec::new();
        let mut text = String::from("**Mathematics specialist**\n");

        if let Some(equation) = extract_equation(query) {
            let solve_for = solve_target(query, &equation);
            let invocation = invoke(
                tools,
                EQUATION_SOLVER,
                serde_json::json!({ "equation": equation, "solve_for": solve_for }),
                invocations.len(),
            )
            .await;
            let result = &invocation.result;
            if result.success {
                text.push_str(&format!("\nSolving `{equation}` for `{solve_for}`: {}", result.output));
            } else {
                text.push_str(&format!(
                    "\nI could not solve `{equation}`: {}",
                    result.error_message().unwrap_or_default()
                ));
            }
            invocations.push(invocation);
        } else if let Some(expression) = extract_arithmetic(query) {
            let invocation = invoke(
                tools,
                CALCULATOR,
                serde_json::json!({ "expression": expression }),
                invocations.len(),
            )
            .await;
            let result = &invocation.result;
            if result.success {
                text.push_str(&format!("\n`{expression}` = {}", result.output));
            } else {
                text.push_str(&format!(
                    "\nI could not evaluate `{expression}`: {}",
                    result.error_message().unwrap_or_default()
                ));
            }
            invocations.push(invocation);
        } else {
            text.push_str(
                "\nI found no equation or arithmetic expression to compute. \
                 Write equations with an explicit `=` and operators, e.g. `2*x + 5 = 11`.",
            );
        }

        HandlerResponse {
            text,
            invocations,
        }
    }

    async fn respond_physics(&self, query: &str, tools: &ToolRegistry) -> HandlerResponse {
        let mut invocations = Vec::new();
        let mut text = String::from("**Physics specialist**\n");

        for name in self.constant_queries(query) {
            let invocation = invoke(
                tools,
                PHYSICS_CONSTANTS,
                serde_json::json!({ "constant_name": name }),
                invocations.len(),
            )
            .await;
            let result = &invocation.result;
            if result.success {
                let payload = result.payload();
                let display = payload["name"].as_str().unwrap_or(&name).replace('_', " ");
                text.push_str(&format!("\n- {display}: {}", result.output));
            } else {
                text.push_str(&format!("\n- {name}: {}", result.error_message().unwrap_or_default()));
            }
            invocations.push(invocation);
        }

        if invocations.is_empty() {
            text.push_str("\nNo physical constant is named in this question.");
        }

        HandlerResponse {
            text,
            invocations,
        }
    }

    /// Lookup queries for every constant mentioned, in order of appearance.
    fn constant_queries(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let configured: Vec<(String, String)> = self
            .constant_names
            .iter()
            .map(|n| (n.replace('_', " "), n.clone()))
            .collect();

        let mut found: Vec<(usize, String)> = Vec::new();
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let aliases = CONSTANT_ALIASES
            .iter()
            .map(|(phrase, name)| (phrase.to_string(), name.to_string()))
            .chain(configured);

        for (phrase, name) in aliases {
            let Some(start) = lowered.find(&phrase) else {
                continue;
            };
            let end = start + phrase.len();
            // A longer phrase already covers this one.
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            if found.iter().any(|(_, n)| *n == name) {
                continue;
            }
            claimed.push((start, end));
            found.push((start, name));
        }

        found.sort_by_key(|(pos, _)| *pos);
        found.into_iter().map(|(_, name)| name).collect()
    }
}

async fn invoke(
    tools: &ToolRegistry,
    name: &str,
    arguments: serde_json::Value,
    index: usize,
) -> ToolInvocation {
    debug!(tool = name, %arguments, "Reference handler calling tool");
    tools
        .invoke(ToolCall {
            id: format!("ref_{}", index + 1),
            name: name.to_string(),
            arguments,
        })
        .await
}

fn is_math_token(token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    let allowed = token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_.+-*/^()=".contains(c));
    if !allowed {
        return false;
    }
    let has_symbol = token
        .chars()
        .any(|c| c.is_ascii_digit() || "+-*/^()=".contains(c));
    // Bare words only count when they look like variables.
    has_symbol || token.len() == 1 || token.contains('_')
}

fn trim_punctuation(token: &str) -> &str {
    token.trim_end_matches(['?', '!', ',', ';', ':']).trim_end_matches('.')
}

/// The contiguous run of math-looking words around the first `=`.
pub fn extract_equation(query: &str) -> Option<String> {
    let tokens: Vec<&str> = query.split_whitespace().map(trim_punctuation).collect();
    let eq = tokens.iter().position(|t| t.contains('=') && is_math_token(t))?;

    let mut start = eq;
    while start > 0 && is_math_token(tokens[start - 1]) {
        start -= 1;
    }
    let mut end = eq + 1;
    while end < tokens.len() && is_math_token(tokens[end]) {
        end += 1;
    }

    let equation = tokens[start..end].join(" ");
    let (lhs, rhs) = equation.split_once('=')?;
    if lhs.trim().is_empty() || rhs.trim().is_empty() {
        return None;
    }
    Some(equation)
}

/// The variable to solve for: an explicit "for x", else the first
/// variable-like identifier in the equation, else `x`.
pub fn solve_target(query: &str, equation: &str) -> String {
    if let Some(caps) = SOLVE_FOR.captures(query) {
        let candidate = &caps[1];
        if equation.contains(candidate) {
            return candidate.to_string();
        }
    }
    let mut identifiers = equation
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|w| w.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_'));
    let first = identifiers.next();
    if equation.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == "x") {
        return "x".into();
    }
    first.unwrap_or("x").to_string()
}

/// The longest arithmetic-only span that contains an operator.
pub fn extract_arithmetic(query: &str) -> Option<String> {
    ARITHMETIC_SPAN
        .find_iter(query)
        .map(|m| m.as_str().trim().to_string())
        .filter(|span| HAS_OPERATOR.is_match(span))
        .max_by_key(|span| span.len())
}

#[async_trait]
impl Handler for ReferenceHandler {
    fn name(&self) -> &str {
        "reference"
    }

    async fn respond(&self, request: HandlerRequest<'_>) -> Result<HandlerResponse> {
        let query = request.query.text();
        let response = match request.route {
            Route::Specialist(Specialist::Math) => self.respond_math(query, request.tools).await,
            Route::Specialist(Specialist::Physics) => {
                self.respond_physics(query, request.tools).await
            }
            Route::Specialist(Specialist::Cs) => HandlerResponse::text(
                "**Computer Science specialist**\n\nThis question belongs to computer science. \
                 No deterministic tools apply here; a full explanation with code examples \
                 needs the language-model handler.",
            ),
            Route::Fallback => HandlerResponse::text(format!(
                "{FALLBACK_NOTICE}\n\nThe question is outside physics, mathematics and \
                 computer science, and the offline tutor has no general knowledge source \
                 to answer it from."
            )),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustedtutor_core::subject::Query;
    use rustedtutor_tools::{ConstantTable, default_registry};
    use std::sync::Arc;

    fn registry() -> ToolRegistry {
        default_registry(Arc::new(ConstantTable::builtin()))
    }

    async fn respond(handler: &ReferenceHandler, route: Route, text: &str) -> HandlerResponse {
        let query = Query::new(text).unwrap();
        let tools = registry().scoped(route.granted_tools());
        handler
            .respond(HandlerRequest {
                query: &query,
                route,
                tools: &tools,
            })
            .await
            .unwrap()
    }

    #[test]
    fn extracts_equations_from_prose() {
        assert_eq!(extract_equation("Solve 2*x + 5 = 11 for x").unwrap(), "2*x + 5 = 11");
        assert_eq!(extract_equation("what is x if x^2 - 4 = 0?").unwrap(), "x^2 - 4 = 0");
        assert_eq!(extract_equation("v = u + a*t, solve for a").unwrap(), "v = u + a*t");
        assert!(extract_equation("What is 2 + 2?").is_none());
        assert!(extract_equation("x = ").is_none());
    }

    #[test]
    fn picks_solve_target() {
        assert_eq!(solve_target("solve for a", "v = u + a*t"), "a");
        assert_eq!(solve_target("solve it", "2*y = 4"), "y");
        assert_eq!(solve_target("solve it", "a*x = b"), "x");
        // "for" names something absent from the equation
        assert_eq!(solve_target("for me", "3*z = 9"), "z");
    }

    #[test]
    fn extracts_arithmetic() {
        assert_eq!(extract_arithmetic("What is 10 + 5*3?").unwrap(), "10 + 5*3");
        assert_eq!(extract_arithmetic("compute (100-20)/4 please").unwrap(), "(100-20)/4");
        assert!(extract_arithmetic("in 2024 I turned 30").is_none());
    }

    #[tokio::test]
    async fn math_solves_equation() {
        let handler = ReferenceHandler::new();
        let response = respond(&handler, Route::Specialist(Specialist::Math), "Solve 2*x + 5 = 11").await;
        assert_eq!(response.invocations.len(), 1);
        assert_eq!(response.invocations[0].call.name, EQUATION_SOLVER);
        assert_eq!(
            response.invocations[0].result.payload()["solutions"],
            serde_json::json!(["x = 3"])
        );
        assert!(response.text.contains("\nSolving `2*x + 5 = 11` for `x`: "));
        assert!(response.text.contains("x = 3"));
    }

    #[tokio::test]
    async fn math_evaluates_arithmetic() {
        let handler = ReferenceHandler::new();
        let response = respond(&handler, Route::Specialist(Specialist::Math), "What is 10 + 5*3?").await;
        assert_eq!(response.invocations[0].call.name, CALCULATOR);
        assert_eq!(response.invocations[0].result.payload()["value"], 25.0);
        assert!(response.text.contains("= 25"));
    }

    #[tokio::test]
    async fn math_reports_tool_errors() {
        let handler = ReferenceHandler::new();
        let response = respond(&handler, Route::Specialist(Specialist::Math), "What is 1/0 + 2?").await;
        assert!(!response.invocations[0].result.success);
        assert!(response.text.contains("\nI could not evaluate `1/0 + 2`: "));
    }

    #[tokio::test]
    async fn physics_looks_up_mentioned_constants() {
        let handler = ReferenceHandler::new();
        let response = respond(
            &handler,
            Route::Specialist(Specialist::Physics),
            "How do gravity and the speed of light compare?",
        )
        .await;
        let names: Vec<_> = response
            .invocations
            .iter()
            .map(|i| i.result.payload()["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["acceleration_due_to_gravity", "speed_of_light"]);
        assert!(response.text.contains("\n- speed of light: "));
        assert!(response.text.contains("c = 299792458 m/s"));
    }

    #[tokio::test]
    async fn longer_alias_wins() {
        let handler = ReferenceHandler::new();
        let response = respond(
            &handler,
            Route::Specialist(Specialist::Physics),
            "What is the gravitational constant?",
        )
        .await;
        assert_eq!(response.invocations.len(), 1);
        assert_eq!(response.invocations[0].result.payload()["name"], "gravitational_constant");
    }

    #[test]
    fn configured_constant_names_are_recognized() {
        let handler =
            ReferenceHandler::new().with_constant_names(["vacuum_permittivity".to_string()]);
        assert_eq!(
            handler.constant_queries("What is the vacuum permittivity?"),
            vec!["vacuum_permittivity"]
        );
    }

    #[tokio::test]
    async fn fallback_discloses() {
        let handler = ReferenceHandler::new();
        let response = respond(&handler, Route::Fallback, "Who wrote Hamlet?").await;
        assert!(response.text.starts_with(FALLBACK_NOTICE));
        assert!(response.invocations.is_empty());
    }

    #[tokio::test]
    async fn cs_uses_no_tools() {
        let handler = ReferenceHandler::new();
        let response = respond(&handler, Route::Specialist(Specialist::Cs), "What is recursion?").await;
        assert!(response.invocations.is_empty());
        assert!(response.text.contains("Computer Science"));
    }
}
